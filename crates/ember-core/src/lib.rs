//! Ember Core - Foundational types for the Ember particle engine
//!
//! This crate provides the types every other Ember crate depends on:
//! - `Vec2` - 2D vector value type
//! - `Color` - RGBA color
//! - `NormalizedDuration` - progress through a longer duration
//! - Error types and Result alias

mod error;
mod time;
mod types;

pub use error::{EmberError, Result};
pub use time::NormalizedDuration;
pub use types::{Color, Vec2};
