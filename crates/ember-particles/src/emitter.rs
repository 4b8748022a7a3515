//! Emitter configuration (parsed from TOML) and the system it builds

use crate::curves::{curve_t, lerp_color, uniform_scale};
use crate::rand::ParticleRng;
use crate::system::ParticleSystem;
use ember_core::{Color, Result, Vec2};
use log::warn;
use serde::Serialize;
use std::path::Path;
use std::time::Duration;

const MAX_PARTICLES_LIMIT: usize = 100_000;

/// Emission shape, centered on the system's origin
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EmissionShape {
    Point,
    Circle { radius: f64 },
    Box { extents: [f64; 2] },
}

impl EmissionShape {
    pub fn sample(&self, rng: &mut ParticleRng) -> Vec2 {
        match *self {
            EmissionShape::Point => Vec2::ZERO,
            EmissionShape::Circle { radius } => rng.point_in_circle(radius),
            EmissionShape::Box { extents } => Vec2::new(
                rng.range(-extents[0] * 0.5, extents[0] * 0.5),
                rng.range(-extents[1] * 0.5, extents[1] * 0.5),
            ),
        }
    }
}

/// Configuration parsed from an emitter TOML table
#[derive(Debug, Clone, Serialize)]
pub struct EmitterConfig {
    pub emission_rate: f64,
    pub burst_count: u32,
    pub max_particles: usize,
    pub lifetime_min: f64,
    pub lifetime_max: f64,
    pub speed_min: f64,
    pub speed_max: f64,
    /// Degrees, 0 = +x, 90 = +y
    pub direction: f64,
    /// Half-angle in degrees
    pub spread: f64,
    pub gravity: [f64; 2],
    pub damping: f64,
    pub angular_velocity_min: f64,
    pub angular_velocity_max: f64,
    pub size_start: f64,
    pub size_end: f64,
    pub color_start: Color,
    pub color_end: Color,
    pub shape: EmissionShape,
    pub seed: u32,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            emission_rate: 10.0,
            burst_count: 0,
            max_particles: 256,
            lifetime_min: 1.0,
            lifetime_max: 2.0,
            speed_min: 50.0,
            speed_max: 100.0,
            direction: 270.0,
            spread: 15.0,
            gravity: [0.0, 98.0],
            damping: 0.0,
            angular_velocity_min: 0.0,
            angular_velocity_max: 0.0,
            size_start: 1.0,
            size_end: 1.0,
            color_start: Color::WHITE,
            color_end: Color::TRANSPARENT,
            shape: EmissionShape::Point,
            seed: 0xDEAD_BEEF,
        }
    }
}

/// Per-particle data rolled once when an emitter particle is first advanced
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmitterParticle {
    pub launch_velocity: Vec2,
    pub angular_velocity: f64,
}

impl EmitterConfig {
    /// Read and parse an emitter TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    pub fn from_toml_str(source: &str) -> Result<Self> {
        let table: toml::value::Table = toml::from_str(source)?;
        Ok(Self::from_toml(&table))
    }

    /// Parse an EmitterConfig from a TOML table. Missing or mistyped keys keep
    /// their defaults.
    pub fn from_toml(table: &toml::value::Table) -> Self {
        let mut config = Self::default();

        if let Some(v) = table.get("emission_rate") {
            config.emission_rate = toml_f64(v, config.emission_rate);
        }
        if let Some(v) = table.get("burst_count") {
            config.burst_count = v.as_integer().unwrap_or(0).max(0) as u32;
        }
        if let Some(v) = table.get("max_particles") {
            let n = v.as_integer().unwrap_or(256).max(0) as usize;
            if n > MAX_PARTICLES_LIMIT {
                warn!("max_particles {n} clamped to {MAX_PARTICLES_LIMIT}");
            }
            config.max_particles = n.min(MAX_PARTICLES_LIMIT);
        }
        if let Some(v) = table.get("lifetime_min") {
            config.lifetime_min = toml_f64(v, config.lifetime_min);
        }
        if let Some(v) = table.get("lifetime_max") {
            config.lifetime_max = toml_f64(v, config.lifetime_max);
        }
        if let Some(v) = table.get("speed_min") {
            config.speed_min = toml_f64(v, config.speed_min);
        }
        if let Some(v) = table.get("speed_max") {
            config.speed_max = toml_f64(v, config.speed_max);
        }
        if let Some(v) = table.get("direction") {
            config.direction = toml_f64(v, config.direction);
        }
        if let Some(v) = table.get("spread") {
            config.spread = toml_f64(v, config.spread);
        }
        if let Some(v) = table.get("gravity") {
            config.gravity = toml_vec2(v, config.gravity);
        }
        if let Some(v) = table.get("damping") {
            config.damping = toml_f64(v, config.damping);
        }
        if let Some(v) = table.get("angular_velocity_min") {
            config.angular_velocity_min = toml_f64(v, config.angular_velocity_min);
        }
        if let Some(v) = table.get("angular_velocity_max") {
            config.angular_velocity_max = toml_f64(v, config.angular_velocity_max);
        }
        if let Some(v) = table.get("size_start") {
            config.size_start = toml_f64(v, config.size_start);
        }
        if let Some(v) = table.get("size_end") {
            config.size_end = toml_f64(v, config.size_end);
        }
        if let Some(v) = table.get("color_start") {
            config.color_start = toml_color(v, config.color_start);
        }
        if let Some(v) = table.get("color_end") {
            config.color_end = toml_color(v, config.color_end);
        }
        if let Some(v) = table.get("seed") {
            config.seed = v.as_integer().map(|i| i as u32).unwrap_or(config.seed);
        }

        // Emission shape
        let shape_str = table
            .get("shape")
            .and_then(|v| v.as_str())
            .unwrap_or("point");
        let shape_radius = table
            .get("shape_radius")
            .map(|v| toml_f64(v, 10.0))
            .unwrap_or(10.0);
        let shape_extents = table
            .get("shape_extents")
            .map(|v| toml_vec2(v, [20.0, 20.0]))
            .unwrap_or([20.0, 20.0]);

        config.shape = match shape_str {
            "circle" => EmissionShape::Circle {
                radius: shape_radius,
            },
            "box" => EmissionShape::Box {
                extents: shape_extents,
            },
            "point" => EmissionShape::Point,
            other => {
                warn!("unknown emission shape '{other}', using point");
                EmissionShape::Point
            }
        };

        config.sanitize();
        config
    }

    fn sanitize(&mut self) {
        if !self.lifetime_min.is_finite() || self.lifetime_min < 0.0 {
            self.lifetime_min = 0.0;
        }
        if !self.lifetime_max.is_finite() {
            self.lifetime_max = self.lifetime_min;
        }
        if self.lifetime_max < self.lifetime_min {
            warn!(
                "lifetime_max {} is below lifetime_min {}, swapping",
                self.lifetime_max, self.lifetime_min
            );
            std::mem::swap(&mut self.lifetime_min, &mut self.lifetime_max);
        }
        if self.speed_max < self.speed_min {
            std::mem::swap(&mut self.speed_min, &mut self.speed_max);
        }
        if self.angular_velocity_max < self.angular_velocity_min {
            std::mem::swap(&mut self.angular_velocity_min, &mut self.angular_velocity_max);
        }
    }

    /// Builds a particle system whose behaviors implement this config.
    /// A non-zero `burst_count` is queued as a direct spawn request.
    pub fn build(&self) -> ParticleSystem<EmitterParticle> {
        let mut system = ParticleSystem::new(self.max_particles);

        // One generator per behavior keeps each stream independent of call order
        let mut seeds = ParticleRng::new(self.seed);
        let mut lifetime_rng = ParticleRng::new(seeds.next_u32());
        let mut shape_rng = ParticleRng::new(seeds.next_u32());
        let mut data_rng = ParticleRng::new(seeds.next_u32());

        let rate = self.emission_rate;
        let (lifetime_min, lifetime_max) = (self.lifetime_min, self.lifetime_max);
        let shape = self.shape;
        let (speed_min, speed_max) = (self.speed_min, self.speed_max);
        let (direction, spread) = (self.direction, self.spread);
        let (spin_min, spin_max) = (self.angular_velocity_min, self.angular_velocity_max);
        let gravity = Vec2::from_array(self.gravity);
        let damping = self.damping;
        let (size_start, size_end) = (self.size_start, self.size_end);
        let (color_start, color_end) = (self.color_start, self.color_end);

        system
            .behaviors
            .set_emission_rate_over_time(move |_, _| rate)
            .set_lifetime_over_time(move |_, _| {
                let secs = lifetime_rng.range(lifetime_min, lifetime_max);
                Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO)
            })
            .set_emission_position_over_time(move |_, _| shape.sample(&mut shape_rng))
            .set_data_over_lifetime(move |old, _, _| {
                old.or_else(|| {
                    let dir = data_rng.arc_direction(direction, spread);
                    let speed = data_rng.range(speed_min, speed_max);
                    Some(EmitterParticle {
                        launch_velocity: dir * speed,
                        angular_velocity: data_rng.range(spin_min, spin_max),
                    })
                })
            })
            .set_velocity_over_lifetime(move |p, t, delta, _| {
                let Some(data) = p.data() else {
                    return p.velocity();
                };
                if t.value() <= 0.0 {
                    return data.launch_velocity;
                }
                let dt = delta.as_secs_f64();
                let v = p.velocity() + gravity * dt;
                v * (1.0 - damping * dt).max(0.0)
            })
            .set_scale_over_lifetime(move |_, t, _, _| uniform_scale(size_start, size_end, t))
            .set_color_over_lifetime(move |_, t, _, _| {
                lerp_color(color_start, color_end, curve_t(t) as f32)
            });

        if spin_min != 0.0 || spin_max != 0.0 {
            system
                .behaviors
                .set_rotation_over_lifetime(|p, _, _, _| {
                    p.data().map_or(0.0, |d| d.angular_velocity)
                });
        }

        if self.burst_count > 0 {
            system.spawn(self.burst_count as usize);
        }

        system
    }
}

// ── TOML helpers (handle integer/float coercion) ──

fn toml_f64(v: &toml::Value, default: f64) -> f64 {
    v.as_float()
        .or_else(|| v.as_integer().map(|i| i as f64))
        .unwrap_or(default)
}

fn toml_vec2(v: &toml::Value, default: [f64; 2]) -> [f64; 2] {
    if let Some(arr) = v.as_array() {
        if arr.len() >= 2 {
            return [toml_f64(&arr[0], default[0]), toml_f64(&arr[1], default[1])];
        }
    }
    default
}

fn toml_color(v: &toml::Value, default: Color) -> Color {
    if let Some(arr) = v.as_array() {
        if arr.len() >= 4 {
            return Color::new(
                toml_f64(&arr[0], default.r as f64) as f32,
                toml_f64(&arr[1], default.g as f64) as f32,
                toml_f64(&arr[2], default.b as f64) as f32,
                toml_f64(&arr[3], default.a as f64) as f32,
            );
        }
    }
    default
}
