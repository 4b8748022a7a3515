//! Ember Particles - callback-driven 2D particle simulation
//!
//! Provides a rendering-agnostic particle engine with:
//! - Free-list particle pool that resets state on reuse
//! - Multi-pass update that reclaims, spawns and advances particles until no
//!   particle died during the last pass
//! - Behavior functions of normalized lifetime for velocity, scale, rotation,
//!   color and caller-defined per-particle data
//! - GPU instance packing for instanced draw calls
//! - Data-driven emitters configured from TOML

pub mod behavior;
pub mod curves;
pub mod emitter;
pub mod neighbors;
pub mod particle;
pub mod pool;
pub mod rand;
pub mod system;

pub use behavior::Behaviors;
pub use emitter::{EmissionShape, EmitterConfig, EmitterParticle};
pub use neighbors::Neighbors;
pub use particle::{Particle, ParticleInstance};
pub use pool::ParticlePool;
pub use system::{ParticleSystem, DEFAULT_LIFETIME, MAX_PASSES_PER_UPDATE};

pub use ember_core::{Color, NormalizedDuration, Vec2};
