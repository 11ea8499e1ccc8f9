use std::cell::RefCell;
use std::f64::consts::TAU;
use std::rc::Rc;

use flock_core::{FlockConfig, FlockStd, Surface, Vector2D};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, Window};

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = console)]
    fn log(s: &str);
}

macro_rules! console_log {
    ($($t:tt)*) => (log(&format_args!($($t)*).to_string()))
}

/// Converts a CSS pixel size into a canvas dimension.
fn to_pixels(value: f64) -> u32 {
    if value.is_finite() && value > 0.0 {
        value.round() as u32
    } else {
        0
    }
}

fn viewport_size(window: &Window) -> Result<(f64, f64), JsValue> {
    let width = window
        .inner_width()?
        .as_f64()
        .ok_or("window width is not a number")?;
    let height = window
        .inner_height()?
        .as_f64()
        .ok_or("window height is not a number")?;
    Ok((width, height))
}

/// Canvas 2D context that draws every boid as a filled dot
pub struct CanvasSurface {
    context: CanvasRenderingContext2d,
    radius: f64,
    fill_color: &'static str,
}

impl CanvasSurface {
    pub fn new(context: CanvasRenderingContext2d, config: &FlockConfig) -> Self {
        Self {
            context,
            radius: config.dot_radius as f64,
            fill_color: config.fill_color,
        }
    }
}

impl Surface for CanvasSurface {
    fn clear(&mut self, width: f32, height: f32) {
        self.context.clear_rect(0.0, 0.0, width as f64, height as f64);
    }

    fn draw(&mut self, position: Vector2D) {
        self.context.begin_path();
        if let Err(err) = self.context.arc(
            position.x as f64,
            position.y as f64,
            self.radius,
            0.0,
            TAU,
        ) {
            console_log!("Failed to trace boid at {:?}: {:?}", position, err);
            return;
        }
        self.context.set_fill_style_str(self.fill_color);
        self.context.fill();
    }
}

struct Scene {
    flock: FlockStd,
    canvas: HtmlCanvasElement,
    surface: CanvasSurface,
    running: bool,
}

impl Scene {
    fn frame(&mut self) {
        self.flock.frame(&mut self.surface);
    }

    fn resize(&mut self, width: f64, height: f64) {
        self.canvas.set_width(to_pixels(width));
        self.canvas.set_height(to_pixels(height));
        self.flock
            .resize(self.canvas.width() as f32, self.canvas.height() as f32);
    }
}

fn request_animation_frame(
    window: &Window,
    callback: &Closure<dyn FnMut()>,
) -> Result<i32, JsValue> {
    window.request_animation_frame(callback.as_ref().unchecked_ref())
}

#[wasm_bindgen]
pub struct BoidSimulation {
    scene: Rc<RefCell<Scene>>,
}

#[wasm_bindgen]
impl BoidSimulation {
    /// Binds the simulation to `<canvas id=canvas_id>` sized to the window.
    #[wasm_bindgen(constructor)]
    pub fn new(canvas_id: &str) -> Result<BoidSimulation, JsValue> {
        let window = web_sys::window().ok_or("no global window")?;
        let document = window.document().ok_or("no document")?;
        let canvas = document
            .get_element_by_id(canvas_id)
            .ok_or("canvas not found")?
            .dyn_into::<HtmlCanvasElement>()?;

        let (width, height) = viewport_size(&window)?;
        canvas.set_width(to_pixels(width));
        canvas.set_height(to_pixels(height));

        let context = canvas
            .get_context("2d")?
            .ok_or("no 2d context")?
            .dyn_into::<CanvasRenderingContext2d>()?;

        let flock = FlockStd::new(canvas.width() as f32, canvas.height() as f32);
        console_log!(
            "Initializing boid simulation with {} boids on a {}x{} canvas",
            flock.boids.len(),
            canvas.width(),
            canvas.height()
        );
        let surface = CanvasSurface::new(context, &flock.config);

        Ok(BoidSimulation {
            scene: Rc::new(RefCell::new(Scene {
                flock,
                canvas,
                surface,
                running: false,
            })),
        })
    }

    /// Clears the canvas, advances every boid once and draws it.
    pub fn tick(&self) {
        self.scene.borrow_mut().frame();
    }

    pub fn resize(&self, width: f64, height: f64) {
        self.scene.borrow_mut().resize(width, height);
        console_log!("Resized to {}x{}", width, height);
    }

    pub fn boid_count(&self) -> usize {
        self.scene.borrow().flock.boids.len()
    }

    pub fn width(&self) -> f32 {
        self.scene.borrow().flock.width
    }

    pub fn height(&self) -> f32 {
        self.scene.borrow().flock.height
    }

    /// Follows window resizes and runs a frame on every animation frame
    /// until the page goes away. Calling it twice is a no-op.
    pub fn start(&self) -> Result<(), JsValue> {
        if self.scene.borrow().running {
            return Ok(());
        }

        let window = web_sys::window().ok_or("no global window")?;

        let scene = self.scene.clone();
        let resize_window = window.clone();
        let on_resize = Closure::wrap(Box::new(move || match viewport_size(&resize_window) {
            Ok((width, height)) => {
                scene.borrow_mut().resize(width, height);
                console_log!("Resized to {}x{}", width, height);
            }
            Err(err) => console_log!("Failed to read window size: {:?}", err),
        }) as Box<dyn FnMut()>);
        window.add_event_listener_with_callback("resize", on_resize.as_ref().unchecked_ref())?;
        on_resize.forget();

        let callback: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
        let next = callback.clone();
        let scene = self.scene.clone();
        let frame_window = window.clone();
        *callback.borrow_mut() = Some(Closure::wrap(Box::new(move || {
            scene.borrow_mut().frame();
            if let Some(next) = next.borrow().as_ref() {
                if let Err(err) = request_animation_frame(&frame_window, next) {
                    console_log!("Failed to schedule next frame: {:?}", err);
                }
            }
        }) as Box<dyn FnMut()>));

        if let Some(first) = callback.borrow().as_ref() {
            request_animation_frame(&window, first)?;
        }

        self.scene.borrow_mut().running = true;
        console_log!("Animation loop started");
        Ok(())
    }
}
