//! Particle types: CPU simulation state and GPU instance data

use crate::behavior::Behaviors;
use crate::neighbors::Neighbors;
use bytemuck::{Pod, Zeroable};
use ember_core::{Color, NormalizedDuration, Vec2};
use std::f64::consts::TAU;
use std::time::{Duration, Instant};

/// One particle of a [`ParticleSystem`](crate::ParticleSystem).
///
/// Positions are relative to the system's origin. `D` is caller-defined data
/// produced by `data_over_lifetime`; the engine never looks inside it.
pub struct Particle<D = ()> {
    pub(crate) lifetime: Duration,
    pub(crate) birth_time: Instant,
    pub(crate) last_update_time: Instant,
    pub(crate) alive: bool,
    pub(crate) data: Option<D>,
    pub(crate) position: Vec2,
    pub(crate) velocity: Vec2,
    pub(crate) scale: Vec2,
    pub(crate) angle: f64,
    pub(crate) color: Color,
}

impl<D> Particle<D> {
    pub(crate) fn new(now: Instant) -> Self {
        Self {
            lifetime: Duration::ZERO,
            birth_time: now,
            last_update_time: now,
            alive: true,
            data: None,
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            scale: Vec2::ONE,
            angle: 0.0,
            color: Color::WHITE,
        }
    }

    /// Clears every field back to its spawn default. Timing is left to
    /// [`Particle::begin`].
    pub(crate) fn reset(&mut self) {
        self.alive = true;
        self.data = None;
        self.position = Vec2::ZERO;
        self.velocity = Vec2::ZERO;
        self.scale = Vec2::ONE;
        self.angle = 0.0;
        self.color = Color::WHITE;
    }

    pub(crate) fn begin(&mut self, now: Instant, lifetime: Duration) {
        self.lifetime = lifetime;
        self.birth_time = now;
        self.last_update_time = now;
    }

    /// Caller data attached by `data_over_lifetime`
    pub fn data(&self) -> Option<&D> {
        self.data.as_ref()
    }

    pub fn data_mut(&mut self) -> Option<&mut D> {
        self.data.as_mut()
    }

    /// Moves the attached data out, e.g. to hand it back to a caller-side pool
    /// from `death_func`.
    pub fn take_data(&mut self) -> Option<D> {
        self.data.take()
    }

    /// Position in arbitrary units, relative to the system's origin
    pub fn position(&self) -> Vec2 {
        self.position
    }

    /// Velocity in units per second
    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    pub fn scale(&self) -> Vec2 {
        self.scale
    }

    /// Rotation in radians, in `[0, 2π)`
    pub fn angle(&self) -> f64 {
        self.angle
    }

    pub fn color(&self) -> Color {
        self.color
    }

    /// Maximum lifetime assigned at spawn
    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    pub fn birth_time(&self) -> Instant {
        self.birth_time
    }

    /// `None` if the lifetime is too long to be represented as an `Instant`
    pub fn death_time(&self) -> Option<Instant> {
        self.birth_time.checked_add(self.lifetime)
    }

    pub fn last_update_time(&self) -> Instant {
        self.last_update_time
    }

    /// Kills the particle even if its lifetime has not been exceeded.
    /// It is removed on the next reclaim pass.
    pub fn kill(&mut self) {
        self.alive = false;
    }

    /// Whether [`Particle::kill`] has been called
    pub fn is_killed(&self) -> bool {
        !self.alive
    }

    /// Alive if not killed and `now` is before the death time
    pub fn is_alive(&self, now: Instant) -> bool {
        self.alive && self.age(now) < self.lifetime
    }

    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.birth_time)
    }

    pub fn normalized_age(&self, now: Instant) -> NormalizedDuration {
        NormalizedDuration::from_elapsed(self.age(now), self.lifetime)
    }

    pub fn remaining(&self, now: Instant) -> Duration {
        self.lifetime.saturating_sub(self.age(now))
    }

    /// Advances the particle to `now`, applying the behaviors in a fixed order.
    /// Each behavior sees the state left by the previous step.
    pub(crate) fn advance(
        &mut self,
        now: Instant,
        behaviors: &mut Behaviors<D>,
        neighbors: &Neighbors<'_, D>,
    ) {
        let delta = now.saturating_duration_since(self.last_update_time);
        let t = self.normalized_age(now);
        let secs = delta.as_secs_f64();

        if let Some(f) = behaviors.update_func.as_mut() {
            f(self, t, delta, neighbors);
        }

        if let Some(f) = behaviors.data_over_lifetime.as_mut() {
            self.data = f(self.data.take(), t, delta);
        }

        if let Some(f) = behaviors.velocity_over_lifetime.as_mut() {
            self.velocity = f(self, t, delta, neighbors);
        }

        // Semi-implicit Euler: the velocity already includes this frame's forces
        self.position = self.position + self.velocity * secs;

        if let Some(f) = behaviors.scale_over_lifetime.as_mut() {
            self.scale = f(self, t, delta, neighbors);
        }

        if let Some(f) = behaviors.rotation_over_lifetime.as_mut() {
            let angular_velocity = f(self, t, delta, neighbors);
            self.angle = wrap_angle(self.angle + angular_velocity * secs);
        }

        if let Some(f) = behaviors.color_over_lifetime.as_mut() {
            self.color = f(self, t, delta, neighbors);
        }

        self.last_update_time = now;
    }
}

/// Wraps radians into `[0, 2π)`
pub(crate) fn wrap_angle(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(TAU);
    // rem_euclid rounds tiny negative inputs up to exactly TAU
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

/// GPU instance data for one particle.
/// 48 bytes, three rows of vec4.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct ParticleInstance {
    /// xy = position, zw = scale
    pub pos_scale: [f32; 4],
    /// rgba
    pub color: [f32; 4],
    /// x = angle, y = normalized age, zw unused
    pub rotation_age: [f32; 4],
}

impl ParticleInstance {
    pub fn from_particle<D>(p: &Particle<D>, t: NormalizedDuration) -> Self {
        Self {
            pos_scale: [
                p.position.x as f32,
                p.position.y as f32,
                p.scale.x as f32,
                p.scale.y as f32,
            ],
            color: p.color.to_array(),
            rotation_age: [p.angle as f32, t.value() as f32, 0.0, 0.0],
        }
    }
}
