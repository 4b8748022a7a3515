//! Lightweight xorshift32 PRNG for data-driven emitters

use ember_core::Vec2;
use std::f64::consts::TAU;

pub struct ParticleRng {
    state: u32,
}

impl ParticleRng {
    pub fn new(seed: u32) -> Self {
        Self {
            state: if seed == 0 { 1 } else { seed },
        }
    }

    pub fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        x
    }

    /// Returns a float in [0, 1)
    pub fn next_f64(&mut self) -> f64 {
        self.next_u32() as f64 / (u32::MAX as f64 + 1.0)
    }

    /// Returns a float in [min, max)
    pub fn range(&mut self, min: f64, max: f64) -> f64 {
        min + self.next_f64() * (max - min)
    }

    /// Returns a random unit direction vector (uniform angle)
    pub fn random_direction(&mut self) -> Vec2 {
        Vec2::from_angle(self.range(0.0, TAU))
    }

    /// Returns a direction within `spread_deg` degrees either side of `base_deg`
    pub fn arc_direction(&mut self, base_deg: f64, spread_deg: f64) -> Vec2 {
        if spread_deg <= 0.0 {
            return Vec2::from_angle(base_deg.to_radians());
        }
        if spread_deg >= 180.0 {
            return self.random_direction();
        }
        let angle = base_deg + self.range(-spread_deg, spread_deg);
        Vec2::from_angle(angle.to_radians())
    }

    /// Returns a point uniformly distributed inside a disc of `radius`
    pub fn point_in_circle(&mut self, radius: f64) -> Vec2 {
        let r = radius * self.next_f64().sqrt();
        self.random_direction() * r
    }
}
