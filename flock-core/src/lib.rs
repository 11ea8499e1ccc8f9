#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
use rand::Rng;

fn sqrt(value: f32) -> f32 {
    #[cfg(feature = "std")]
    {
        value.sqrt()
    }
    #[cfg(not(feature = "std"))]
    {
        libm::sqrtf(value)
    }
}

/// A 2D vector used for position, velocity, acceleration and steering
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector2D {
    pub x: f32,
    pub y: f32,
}

impl Vector2D {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn zero() -> Self {
        Self { x: 0.0, y: 0.0 }
    }

    pub fn magnitude(&self) -> f32 {
        sqrt(self.x * self.x + self.y * self.y)
    }

    /// Rescales the vector to magnitude `max` when it is longer than that.
    ///
    /// Shorter vectors (including the zero vector) come back unchanged.
    pub fn limit(&self, max: f32) -> Self {
        let mag = self.magnitude();
        if mag > max {
            Self {
                x: self.x / mag * max,
                y: self.y / mag * max,
            }
        } else {
            *self
        }
    }

    pub fn distance(&self, other: &Vector2D) -> f32 {
        (*self - *other).magnitude()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl core::ops::Add for Vector2D {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }
}

impl core::ops::Sub for Vector2D {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self {
            x: self.x - other.x,
            y: self.y - other.y,
        }
    }
}

impl core::ops::Mul<f32> for Vector2D {
    type Output = Self;

    fn mul(self, scalar: f32) -> Self {
        Self {
            x: self.x * scalar,
            y: self.y * scalar,
        }
    }
}

impl core::ops::Div<f32> for Vector2D {
    type Output = Self;

    fn div(self, scalar: f32) -> Self {
        Self {
            x: self.x / scalar,
            y: self.y / scalar,
        }
    }
}

impl core::ops::AddAssign for Vector2D {
    fn add_assign(&mut self, other: Self) {
        self.x += other.x;
        self.y += other.y;
    }
}

impl core::ops::SubAssign for Vector2D {
    fn sub_assign(&mut self, other: Self) {
        self.x -= other.x;
        self.y -= other.y;
    }
}

/// Neighbor radii for the three steering rules
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Perception {
    pub alignment: f32,
    pub cohesion: f32,
    pub separation: f32,
}

impl Default for Perception {
    fn default() -> Self {
        Self {
            alignment: 50.0,
            cohesion: 50.0,
            separation: 24.0,
        }
    }
}

/// Fixed parameters of the flock and of how it is drawn
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlockConfig {
    pub max_speed: f32,
    pub max_force: f32,
    pub perception: Perception,
    pub boid_count: usize,
    pub dot_radius: f32,
    pub fill_color: &'static str,
}

impl Default for FlockConfig {
    fn default() -> Self {
        Self {
            max_speed: 2.0,
            max_force: 0.03,
            perception: Perception::default(),
            boid_count: 100,
            dot_radius: 2.0,
            fill_color: "#FF4500",
        }
    }
}

/// A single boid entity
#[derive(Debug, Clone, PartialEq)]
pub struct Boid {
    pub position: Vector2D,
    pub velocity: Vector2D,
    pub acceleration: Vector2D,
    pub max_speed: f32,
    pub max_force: f32,
}

impl Boid {
    pub fn new(position: Vector2D, velocity: Vector2D) -> Self {
        Self::with_config(position, velocity, &FlockConfig::default())
    }

    pub fn with_config(position: Vector2D, velocity: Vector2D, config: &FlockConfig) -> Self {
        Self {
            position,
            velocity,
            acceleration: Vector2D::zero(),
            max_speed: config.max_speed,
            max_force: config.max_force,
        }
    }

    /// Random position inside the viewport and a velocity with each
    /// component in `[-1, 1)`.
    #[cfg(feature = "std")]
    pub fn random<R: Rng + ?Sized>(
        width: f32,
        height: f32,
        config: &FlockConfig,
        rng: &mut R,
    ) -> Self {
        let position = Vector2D::new(rng.gen::<f32>() * width, rng.gen::<f32>() * height);
        let velocity = Vector2D::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0));
        Self::with_config(position, velocity, config)
    }

    pub fn apply_force(&mut self, force: Vector2D) {
        self.acceleration += force;
    }

    /// Semi-implicit Euler step with a unit time step.
    pub fn update(&mut self) {
        self.velocity += self.acceleration;
        self.velocity = self.velocity.limit(self.max_speed);
        self.position += self.velocity;
        self.acceleration = Vector2D::zero();
    }

    /// Teleports the boid to the opposite bound once it leaves the viewport.
    pub fn edges(&mut self, width: f32, height: f32) {
        if self.position.x > width {
            self.position.x = 0.0;
        } else if self.position.x < 0.0 {
            self.position.x = width;
        }

        if self.position.y > height {
            self.position.y = 0.0;
        } else if self.position.y < 0.0 {
            self.position.y = height;
        }
    }

    /// Other boids closer than `radius`, paired with their distance.
    /// `index` is this boid's slot in `flock` and is always skipped.
    fn neighbors<'a>(
        &'a self,
        index: usize,
        flock: &'a [Boid],
        radius: f32,
    ) -> impl Iterator<Item = (&'a Boid, f32)> + 'a {
        flock
            .iter()
            .enumerate()
            .filter(move |(i, _)| *i != index)
            .map(move |(_, other)| (other, other.position.distance(&self.position)))
            .filter(move |(_, d)| *d < radius)
    }

    fn steer(&self, desired: Vector2D) -> Vector2D {
        let steering = desired.limit(self.max_speed) - self.velocity;
        steering.limit(self.max_force)
    }

    /// Steers toward the average heading of neighbors.
    pub fn align(&self, index: usize, flock: &[Boid], radius: f32) -> Vector2D {
        let mut sum = Vector2D::zero();
        let mut count = 0;

        for (other, _) in self.neighbors(index, flock, radius) {
            sum += other.velocity;
            count += 1;
        }

        if count > 0 {
            self.steer(sum / count as f32)
        } else {
            Vector2D::zero()
        }
    }

    /// Steers toward the average position of neighbors.
    pub fn cohesion(&self, index: usize, flock: &[Boid], radius: f32) -> Vector2D {
        let mut sum = Vector2D::zero();
        let mut count = 0;

        for (other, _) in self.neighbors(index, flock, radius) {
            sum += other.position;
            count += 1;
        }

        if count > 0 {
            self.steer(sum / count as f32 - self.position)
        } else {
            Vector2D::zero()
        }
    }

    /// Steers away from crowding neighbors.
    pub fn separation(&self, index: usize, flock: &[Boid], radius: f32) -> Vector2D {
        let mut sum = Vector2D::zero();
        let mut count = 0;

        for (other, distance) in self.neighbors(index, flock, radius) {
            // Coincident boids have no direction to flee in.
            if distance > 0.0 {
                sum += (self.position - other.position) / distance;
                count += 1;
            }
        }

        if count > 0 {
            self.steer(sum / count as f32)
        } else {
            Vector2D::zero()
        }
    }
}

/// Computes the three steering forces for `boids[index]` against the whole
/// flock and applies them to it.
pub fn flock(boids: &mut [Boid], index: usize, perception: &Perception) {
    let boid = &boids[index];
    let alignment = boid.align(index, boids, perception.alignment);
    let cohesion = boid.cohesion(index, boids, perception.cohesion);
    let separation = boid.separation(index, boids, perception.separation);

    let boid = &mut boids[index];
    boid.apply_force(alignment);
    boid.apply_force(cohesion);
    boid.apply_force(separation);
}

/// Drawing surface the simulation renders into once per frame
pub trait Surface {
    fn clear(&mut self, width: f32, height: f32);
    fn draw(&mut self, position: Vector2D);
}

/// Runs one frame over `boids` in order, handing every boid to `draw` right
/// after it moved. Later boids see earlier ones in their updated state.
fn advance<F>(boids: &mut [Boid], width: f32, height: f32, perception: &Perception, mut draw: F)
where
    F: FnMut(&Boid),
{
    for index in 0..boids.len() {
        boids[index].edges(width, height);
        flock(boids, index, perception);
        boids[index].update();
        draw(&boids[index]);
    }
}

/// Summary of the flock's current motion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlockStats {
    pub boids: usize,
    pub mean_speed: f32,
    pub top_speed: f32,
    pub all_finite: bool,
}

impl FlockStats {
    pub fn collect(boids: &[Boid]) -> Self {
        let mut total = 0.0;
        let mut top_speed: f32 = 0.0;
        let mut all_finite = true;

        for boid in boids {
            let speed = boid.velocity.magnitude();
            total += speed;
            top_speed = top_speed.max(speed);
            all_finite &= boid.position.is_finite()
                && boid.velocity.is_finite()
                && boid.acceleration.is_finite();
        }

        Self {
            boids: boids.len(),
            mean_speed: if boids.is_empty() {
                0.0
            } else {
                total / boids.len() as f32
            },
            top_speed,
            all_finite,
        }
    }
}

/// A collection of boids for embedded (no_std) environments.
///
/// This is the entry point when the crate is built with
/// `default-features = false`: `FlockStd` and random construction need `std`,
/// so boids are created by the caller and pushed with [`Flock::add_boid`].
/// Frames run the same in-order update as `FlockStd`.
pub struct Flock<const N: usize> {
    pub boids: heapless::Vec<Boid, N>,
    pub config: FlockConfig,
    pub width: f32,
    pub height: f32,
}

impl<const N: usize> Flock<N> {
    pub fn new(width: f32, height: f32, config: FlockConfig) -> Self {
        Self {
            boids: heapless::Vec::new(),
            config,
            width,
            height,
        }
    }

    pub fn add_boid(&mut self, boid: Boid) -> Result<(), Boid> {
        self.boids.push(boid)
    }

    pub fn step(&mut self) {
        advance(
            &mut self.boids,
            self.width,
            self.height,
            &self.config.perception,
            |_| {},
        );
    }

    pub fn frame<S: Surface + ?Sized>(&mut self, surface: &mut S) {
        surface.clear(self.width, self.height);
        advance(
            &mut self.boids,
            self.width,
            self.height,
            &self.config.perception,
            |boid| surface.draw(boid.position),
        );
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.width = width;
        self.height = height;
    }

    pub fn stats(&self) -> FlockStats {
        FlockStats::collect(&self.boids)
    }
}

/// A collection of boids for std environments
#[cfg(feature = "std")]
pub struct FlockStd {
    pub boids: Vec<Boid>,
    pub config: FlockConfig,
    pub width: f32,
    pub height: f32,
}

#[cfg(feature = "std")]
impl FlockStd {
    pub fn new(width: f32, height: f32) -> Self {
        let config = FlockConfig::default();
        Self::from_rng(
            width,
            height,
            config.boid_count,
            config,
            &mut rand::thread_rng(),
        )
    }

    pub fn from_rng<R: Rng + ?Sized>(
        width: f32,
        height: f32,
        count: usize,
        config: FlockConfig,
        rng: &mut R,
    ) -> Self {
        let boids = (0..count)
            .map(|_| Boid::random(width, height, &config, rng))
            .collect();

        Self {
            boids,
            config,
            width,
            height,
        }
    }

    pub fn from_boids(width: f32, height: f32, boids: Vec<Boid>) -> Self {
        Self {
            boids,
            config: FlockConfig::default(),
            width,
            height,
        }
    }

    pub fn step(&mut self) {
        advance(
            &mut self.boids,
            self.width,
            self.height,
            &self.config.perception,
            |_| {},
        );
    }

    pub fn frame<S: Surface + ?Sized>(&mut self, surface: &mut S) {
        surface.clear(self.width, self.height);
        advance(
            &mut self.boids,
            self.width,
            self.height,
            &self.config.perception,
            |boid| surface.draw(boid.position),
        );
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.width = width;
        self.height = height;
    }

    pub fn stats(&self) -> FlockStats {
        FlockStats::collect(&self.boids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn test_vector2d_magnitude() {
        let v = Vector2D::new(3.0, 4.0);
        assert_eq!(v.magnitude(), 5.0);
    }

    #[test]
    fn test_vector2d_operations() {
        let v1 = Vector2D::new(1.0, 2.0);
        let v2 = Vector2D::new(3.0, 4.0);

        assert_eq!(v1 + v2, Vector2D::new(4.0, 6.0));
        assert_eq!(v2 - v1, Vector2D::new(2.0, 2.0));
        assert_eq!(v1 * 2.0, Vector2D::new(2.0, 4.0));
        assert_eq!(v2 / 2.0, Vector2D::new(1.5, 2.0));

        let mut v = v1;
        v += v2;
        v -= v1;
        assert_eq!(v, v2);
    }

    #[test]
    fn test_limit_keeps_short_vectors() {
        let v = Vector2D::new(0.6, -0.8);
        assert_eq!(v.limit(1.0), v);
        assert_eq!(v.limit(2.0), v);
        assert_eq!(Vector2D::zero().limit(0.03), Vector2D::zero());
    }

    #[test]
    fn test_limit_rescales_long_vectors() {
        let v = Vector2D::new(30.0, -40.0);
        let limited = v.limit(2.0);

        assert!(approx(limited.magnitude(), 2.0));
        // Same direction: parallel and pointing the same way.
        assert!(approx(limited.x * v.y - limited.y * v.x, 0.0));
        assert!(limited.x * v.x + limited.y * v.y > 0.0);
        assert!(approx(limited.x, 1.2));
        assert!(approx(limited.y, -1.6));
    }

    #[test]
    fn test_distance() {
        let a = Vector2D::new(1.0, 1.0);
        let b = Vector2D::new(4.0, 5.0);

        assert_eq!(a.distance(&a), 0.0);
        assert_eq!(a.distance(&b), 5.0);
        assert_eq!(a.distance(&b), b.distance(&a));
    }

    #[test]
    fn test_boid_defaults() {
        let boid = Boid::new(Vector2D::new(10.0, 20.0), Vector2D::new(1.0, 1.0));

        assert_eq!(boid.position, Vector2D::new(10.0, 20.0));
        assert_eq!(boid.acceleration, Vector2D::zero());
        assert_eq!(boid.max_speed, 2.0);
        assert_eq!(boid.max_force, 0.03);
    }

    #[test]
    fn test_apply_force_accumulates() {
        let mut boid = Boid::new(Vector2D::zero(), Vector2D::zero());
        boid.apply_force(Vector2D::new(0.01, 0.0));
        boid.apply_force(Vector2D::new(0.02, -0.01));

        assert!(approx(boid.acceleration.x, 0.03));
        assert!(approx(boid.acceleration.y, -0.01));
    }

    #[test]
    fn test_boid_update() {
        let mut boid = Boid::new(Vector2D::zero(), Vector2D::new(1.0, 1.0));
        boid.apply_force(Vector2D::new(0.5, 0.0));
        boid.update();

        assert_eq!(boid.velocity, Vector2D::new(1.5, 1.0));
        assert_eq!(boid.position, Vector2D::new(1.5, 1.0));
        assert_eq!(boid.acceleration, Vector2D::zero());
    }

    #[test]
    fn test_update_limits_speed() {
        let mut boid = Boid::new(Vector2D::zero(), Vector2D::new(1.0, 0.0));
        boid.apply_force(Vector2D::new(1000.0, 250.0));
        boid.update();

        assert!(boid.velocity.magnitude() <= boid.max_speed + 1e-5);
        assert_eq!(boid.acceleration, Vector2D::zero());
        assert_eq!(boid.position, boid.velocity);
    }

    #[test]
    fn test_boid_edges() {
        let mut boid = Boid::new(Vector2D::new(101.0, -1.0), Vector2D::zero());
        boid.edges(100.0, 50.0);
        assert_eq!(boid.position, Vector2D::new(0.0, 50.0));

        let mut boid = Boid::new(Vector2D::new(-1.0, 51.0), Vector2D::zero());
        boid.edges(100.0, 50.0);
        assert_eq!(boid.position, Vector2D::new(100.0, 0.0));

        let mut boid = Boid::new(Vector2D::new(37.5, 12.0), Vector2D::zero());
        boid.edges(100.0, 50.0);
        assert_eq!(boid.position, Vector2D::new(37.5, 12.0));

        // Bounds themselves are inside.
        let mut boid = Boid::new(Vector2D::new(100.0, 0.0), Vector2D::zero());
        boid.edges(100.0, 50.0);
        assert_eq!(boid.position, Vector2D::new(100.0, 0.0));
    }

    #[test]
    fn test_lone_boid_has_no_steering() {
        let flock = [Boid::new(Vector2D::new(5.0, 5.0), Vector2D::new(1.0, 0.0))];

        assert_eq!(flock[0].align(0, &flock, 50.0), Vector2D::zero());
        assert_eq!(flock[0].cohesion(0, &flock, 50.0), Vector2D::zero());
        assert_eq!(flock[0].separation(0, &flock, 24.0), Vector2D::zero());
    }

    #[test]
    fn test_neighbors_outside_radius_are_ignored() {
        let flock = [
            Boid::new(Vector2D::new(0.0, 0.0), Vector2D::new(1.0, 0.0)),
            Boid::new(Vector2D::new(50.0, 0.0), Vector2D::new(-1.0, 0.0)),
        ];

        // Perception is strict: exactly 50 away is not a neighbor.
        assert_eq!(flock[0].align(0, &flock, 50.0), Vector2D::zero());
        assert_eq!(flock[0].cohesion(0, &flock, 50.0), Vector2D::zero());
        assert_eq!(flock[0].separation(0, &flock, 24.0), Vector2D::zero());
    }

    #[test]
    fn test_separation_skips_coincident_boids() {
        let flock = [
            Boid::new(Vector2D::new(10.0, 10.0), Vector2D::zero()),
            Boid::new(Vector2D::new(10.0, 10.0), Vector2D::zero()),
        ];

        let force = flock[0].separation(0, &flock, 24.0);
        assert_eq!(force, Vector2D::zero());
        assert!(force.is_finite());
    }

    #[test]
    fn test_steering_is_bounded_by_max_force() {
        let flock = [
            Boid::new(Vector2D::new(0.0, 0.0), Vector2D::new(2.0, 0.0)),
            Boid::new(Vector2D::new(3.0, 4.0), Vector2D::new(-2.0, 0.0)),
            Boid::new(Vector2D::new(-6.0, 8.0), Vector2D::new(0.0, 2.0)),
        ];

        for force in [
            flock[0].align(0, &flock, 50.0),
            flock[0].cohesion(0, &flock, 50.0),
            flock[0].separation(0, &flock, 24.0),
        ] {
            assert!(force.magnitude() <= 0.03 + 1e-6);
        }
    }

    #[test]
    fn test_flock_applies_all_rules() {
        let mut boids = [
            Boid::new(Vector2D::new(0.0, 0.0), Vector2D::new(0.0, 1.0)),
            Boid::new(Vector2D::new(0.0, 20.0), Vector2D::new(1.0, 0.0)),
        ];
        let perception = Perception::default();

        let expected = boids[0].align(0, &boids, 50.0)
            + boids[0].cohesion(0, &boids, 50.0)
            + boids[0].separation(0, &boids, 24.0);
        flock(&mut boids, 0, &perception);

        assert_eq!(boids[0].acceleration, expected);
        assert_eq!(boids[1].acceleration, Vector2D::zero());
    }

    #[test]
    fn test_flock_creation() {
        let flock = FlockStd::new(800.0, 600.0);
        assert_eq!(flock.boids.len(), 100);
        assert_eq!(flock.width, 800.0);
        assert_eq!(flock.height, 600.0);

        for boid in &flock.boids {
            assert!(boid.position.x >= 0.0 && boid.position.x < 800.0);
            assert!(boid.position.y >= 0.0 && boid.position.y < 600.0);
            assert!(boid.velocity.x >= -1.0 && boid.velocity.x < 1.0);
            assert!(boid.velocity.y >= -1.0 && boid.velocity.y < 1.0);
        }
    }

    #[test]
    fn test_flock_update() {
        let mut flock = FlockStd::new(800.0, 600.0);
        let initial_positions: Vec<_> = flock.boids.iter().map(|b| b.position).collect();

        flock.step();

        let changed = flock
            .boids
            .iter()
            .zip(initial_positions.iter())
            .any(|(b, &initial)| b.position != initial);

        assert!(changed);
        assert!(flock
            .boids
            .iter()
            .all(|b| b.acceleration == Vector2D::zero()));
    }

    #[test]
    fn test_heapless_flock_is_bounded() {
        let mut flock = Flock::<2>::new(100.0, 100.0, FlockConfig::default());
        let boid = Boid::new(Vector2D::zero(), Vector2D::zero());

        assert!(flock.add_boid(boid.clone()).is_ok());
        assert!(flock.add_boid(boid.clone()).is_ok());
        assert_eq!(flock.add_boid(boid.clone()), Err(boid));
        assert_eq!(flock.boids.len(), 2);
    }

    #[test]
    fn test_stats() {
        let flock = FlockStd::from_boids(
            100.0,
            100.0,
            vec![
                Boid::new(Vector2D::zero(), Vector2D::new(3.0, 4.0)),
                Boid::new(Vector2D::zero(), Vector2D::new(1.0, 0.0)),
            ],
        );

        let stats = flock.stats();
        assert_eq!(stats.boids, 2);
        assert_eq!(stats.mean_speed, 3.0);
        assert_eq!(stats.top_speed, 5.0);
        assert!(stats.all_finite);

        let empty = FlockStats::collect(&[]);
        assert_eq!(empty.mean_speed, 0.0);
    }
}
