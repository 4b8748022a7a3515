//! Simple value-over-lifetime interpolation (start → end linear)

use ember_core::{Color, NormalizedDuration, Vec2};

/// Linear interpolation between two floats
pub fn lerp_f64(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Linear interpolation between two RGBA colors
pub fn lerp_color(a: Color, b: Color, t: f32) -> Color {
    Color::new(
        a.r + (b.r - a.r) * t,
        a.g + (b.g - a.g) * t,
        a.b + (b.b - a.b) * t,
        a.a + (b.a - a.a) * t,
    )
}

/// Normalized age clamped to `[0, 1]` for sampling curves
pub fn curve_t(t: NormalizedDuration) -> f64 {
    t.value().clamp(0.0, 1.0)
}

/// Uniform scale lerped over a particle's lifetime
pub fn uniform_scale(start: f64, end: f64, t: NormalizedDuration) -> Vec2 {
    let s = lerp_f64(start, end, curve_t(t));
    Vec2::new(s, s)
}
