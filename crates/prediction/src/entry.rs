//! Entry point records
//!
//! The proxy is mounted twice. Both mounts run the same dispatcher; they
//! only disagree on the upscale constants, which are kept as they were
//! shipped rather than unified.

use std::ops::RangeInclusive;

/// Per-mount constants for the upscale shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPoint {
    /// Label used in logs and metrics
    pub name: &'static str,
    /// Closed range the rounded upscale factor is clamped to
    pub scale_range: RangeInclusive<i64>,
    /// Fixed `face_enhance` flag sent with every upscale; not client-controllable
    pub face_enhance: bool,
}

impl EntryPoint {
    /// Original upscale-only endpoint: factors 2..=10, no face enhancement.
    pub const LEGACY: EntryPoint = EntryPoint {
        name: "legacy",
        scale_range: 2..=10,
        face_enhance: false,
    };

    /// Effects endpoint: factors 2..=4, face enhancement on.
    pub const V2: EntryPoint = EntryPoint {
        name: "v2",
        scale_range: 2..=4,
        face_enhance: true,
    };

    /// Round to the nearest integer, then clamp into `scale_range`.
    /// Out-of-range factors are clamped, never rejected.
    pub fn clamp_scale(&self, scale: f64) -> i64 {
        let lo = *self.scale_range.start();
        let hi = *self.scale_range.end();
        // `as` saturates for huge values and maps NaN to 0; callers only pass finite values
        (scale.round() as i64).clamp(lo, hi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_clamps_to_two_through_ten() {
        let e = EntryPoint::LEGACY;
        assert_eq!(e.clamp_scale(3.0), 3);
        assert_eq!(e.clamp_scale(15.0), 10);
        assert_eq!(e.clamp_scale(1.0), 2);
        assert_eq!(e.clamp_scale(-4.0), 2);
        assert_eq!(e.clamp_scale(10.0), 10);
    }

    #[test]
    fn v2_clamps_to_two_through_four() {
        let e = EntryPoint::V2;
        assert_eq!(e.clamp_scale(15.0), 4);
        assert_eq!(e.clamp_scale(3.0), 3);
        assert_eq!(e.clamp_scale(0.0), 2);
    }

    #[test]
    fn rounds_before_clamping() {
        assert_eq!(EntryPoint::LEGACY.clamp_scale(3.5), 4);
        assert_eq!(EntryPoint::LEGACY.clamp_scale(3.49), 3);
        assert_eq!(EntryPoint::V2.clamp_scale(4.4), 4);
        assert_eq!(EntryPoint::V2.clamp_scale(1.6), 2);
    }

    #[test]
    fn huge_values_saturate_to_upper_bound() {
        assert_eq!(EntryPoint::LEGACY.clamp_scale(1e300), 10);
        assert_eq!(EntryPoint::V2.clamp_scale(-1e300), 2);
    }

    #[test]
    fn face_enhance_is_fixed_per_entry() {
        assert!(!EntryPoint::LEGACY.face_enhance);
        assert!(EntryPoint::V2.face_enhance);
    }
}
