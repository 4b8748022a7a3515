//! Behavior functions that customize a particle system
//!
//! Every function is optional. When one is unset the system falls back to a
//! fixed default (no emission, spawn at the origin, 1 second lifetime, no
//! data, no movement, unit scale, no rotation, opaque white).
//!
//! `age` is how long the system has been running, `t` is a particle's
//! normalized age, and `delta` is the time since the previous update.

use crate::neighbors::Neighbors;
use crate::particle::Particle;
use ember_core::{Color, NormalizedDuration, Vec2};
use std::time::Duration;

/// `(age, delta) -> value`
pub type ValueOverTimeFn = Box<dyn FnMut(Duration, Duration) -> f64>;

/// `(age, delta) -> vector`
pub type VectorOverTimeFn = Box<dyn FnMut(Duration, Duration) -> Vec2>;

/// `(age, delta) -> duration`
pub type DurationOverTimeFn = Box<dyn FnMut(Duration, Duration) -> Duration>;

/// `(previous data, t, delta) -> data`. The previous value is moved in and may
/// be returned as-is.
pub type DataOverLifetimeFn<D> =
    Box<dyn FnMut(Option<D>, NormalizedDuration, Duration) -> Option<D>>;

/// Visits a particle mutably; may [`Particle::kill`] it
pub type ParticleVisitFn<D> =
    Box<dyn FnMut(&mut Particle<D>, NormalizedDuration, Duration, &Neighbors<'_, D>)>;

pub type ParticleValueFn<D> =
    Box<dyn FnMut(&Particle<D>, NormalizedDuration, Duration, &Neighbors<'_, D>) -> f64>;

pub type ParticleVectorFn<D> =
    Box<dyn FnMut(&Particle<D>, NormalizedDuration, Duration, &Neighbors<'_, D>) -> Vec2>;

pub type ParticleColorFn<D> =
    Box<dyn FnMut(&Particle<D>, NormalizedDuration, Duration, &Neighbors<'_, D>) -> Color>;

/// Called once for every particle that died, after it left the live set.
/// The neighbors are the particles still alive.
pub type ParticleDeathFn<D> = Box<dyn FnMut(&mut Particle<D>, &Neighbors<'_, D>)>;

/// The full set of behavior functions of one system.
///
/// Fields may be replaced or cleared between updates. The `set_*` methods
/// box a closure and pin down its argument types, which plain `Box::new`
/// cannot do for the borrowed arguments.
pub struct Behaviors<D = ()> {
    /// Emission rate in particles per second over the system's age.
    /// Unset: nothing is emitted.
    pub emission_rate_over_time: Option<ValueOverTimeFn>,
    /// Spawn position relative to the origin. Unset: the origin.
    pub emission_position_over_time: Option<VectorOverTimeFn>,
    /// Lifetime of a spawning particle. Unset: 1 second.
    pub lifetime_over_time: Option<DurationOverTimeFn>,
    /// Arbitrary data attached to a particle. Unset: no data.
    pub data_over_lifetime: Option<DataOverLifetimeFn<D>>,
    /// Runs first on every advance. Unset: no-op.
    pub update_func: Option<ParticleVisitFn<D>>,
    /// Unset: velocity is left as is (zero after spawn).
    pub velocity_over_lifetime: Option<ParticleVectorFn<D>>,
    /// Unset: `(1, 1)`.
    pub scale_over_lifetime: Option<ParticleVectorFn<D>>,
    /// Unset: opaque white.
    pub color_over_lifetime: Option<ParticleColorFn<D>>,
    /// Angular velocity in radians per second. Unset: no rotation.
    pub rotation_over_lifetime: Option<ParticleValueFn<D>>,
    /// Unset: no-op.
    pub death_func: Option<ParticleDeathFn<D>>,
}

impl<D> Default for Behaviors<D> {
    fn default() -> Self {
        Self {
            emission_rate_over_time: None,
            emission_position_over_time: None,
            lifetime_over_time: None,
            data_over_lifetime: None,
            update_func: None,
            velocity_over_lifetime: None,
            scale_over_lifetime: None,
            color_over_lifetime: None,
            rotation_over_lifetime: None,
            death_func: None,
        }
    }
}

impl<D> Behaviors<D> {
    pub fn set_emission_rate_over_time(
        &mut self,
        f: impl FnMut(Duration, Duration) -> f64 + 'static,
    ) -> &mut Self {
        self.emission_rate_over_time = Some(Box::new(f));
        self
    }

    pub fn set_emission_position_over_time(
        &mut self,
        f: impl FnMut(Duration, Duration) -> Vec2 + 'static,
    ) -> &mut Self {
        self.emission_position_over_time = Some(Box::new(f));
        self
    }

    pub fn set_lifetime_over_time(
        &mut self,
        f: impl FnMut(Duration, Duration) -> Duration + 'static,
    ) -> &mut Self {
        self.lifetime_over_time = Some(Box::new(f));
        self
    }

    pub fn set_data_over_lifetime(
        &mut self,
        f: impl FnMut(Option<D>, NormalizedDuration, Duration) -> Option<D> + 'static,
    ) -> &mut Self {
        self.data_over_lifetime = Some(Box::new(f));
        self
    }

    pub fn set_update_func(
        &mut self,
        f: impl FnMut(&mut Particle<D>, NormalizedDuration, Duration, &Neighbors<'_, D>) + 'static,
    ) -> &mut Self {
        self.update_func = Some(Box::new(f));
        self
    }

    pub fn set_velocity_over_lifetime(
        &mut self,
        f: impl FnMut(&Particle<D>, NormalizedDuration, Duration, &Neighbors<'_, D>) -> Vec2 + 'static,
    ) -> &mut Self {
        self.velocity_over_lifetime = Some(Box::new(f));
        self
    }

    pub fn set_scale_over_lifetime(
        &mut self,
        f: impl FnMut(&Particle<D>, NormalizedDuration, Duration, &Neighbors<'_, D>) -> Vec2 + 'static,
    ) -> &mut Self {
        self.scale_over_lifetime = Some(Box::new(f));
        self
    }

    pub fn set_color_over_lifetime(
        &mut self,
        f: impl FnMut(&Particle<D>, NormalizedDuration, Duration, &Neighbors<'_, D>) -> Color + 'static,
    ) -> &mut Self {
        self.color_over_lifetime = Some(Box::new(f));
        self
    }

    pub fn set_rotation_over_lifetime(
        &mut self,
        f: impl FnMut(&Particle<D>, NormalizedDuration, Duration, &Neighbors<'_, D>) -> f64 + 'static,
    ) -> &mut Self {
        self.rotation_over_lifetime = Some(Box::new(f));
        self
    }

    pub fn set_death_func(
        &mut self,
        f: impl FnMut(&mut Particle<D>, &Neighbors<'_, D>) + 'static,
    ) -> &mut Self {
        self.death_func = Some(Box::new(f));
        self
    }
}

/// Behavior that always returns `value`, for rate and similar functions
pub fn constant(value: f64) -> impl FnMut(Duration, Duration) -> f64 {
    move |_, _| value
}

/// Lifetime behavior that always returns `lifetime`
pub fn constant_duration(lifetime: Duration) -> impl FnMut(Duration, Duration) -> Duration {
    move |_, _| lifetime
}
