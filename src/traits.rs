//! Shared trait abstractions for common patterns

use crate::core::constants::SCALE_EPSILON;
use crate::core::geo::Point;

/// Unified interpolation trait used by the animation code
pub trait Lerp {
    fn lerp(&self, other: &Self, t: f64) -> Self;
}

impl Lerp for f64 {
    fn lerp(&self, other: &Self, t: f64) -> Self {
        self + (other - self) * t
    }
}

impl Lerp for Point {
    fn lerp(&self, other: &Self, t: f64) -> Self {
        Point::new(self.x.lerp(&other.x, t), self.y.lerp(&other.y, t))
    }
}

/// Scale comparison with the tolerance used for `same_scale` detection
pub trait ScaleEq {
    fn scale_eq(&self, other: f64) -> bool;
}

impl ScaleEq for f64 {
    fn scale_eq(&self, other: f64) -> bool {
        (self - other).abs() < SCALE_EPSILON
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lerp_points() {
        let a = Point::new(0.0, 10.0);
        let b = Point::new(10.0, 20.0);
        assert_eq!(a.lerp(&b, 0.5), Point::new(5.0, 15.0));
        assert_eq!(a.lerp(&b, 0.0), a);
        assert_eq!(a.lerp(&b, 1.0), b);
    }

    #[test]
    fn test_scale_eq() {
        assert!(0.25_f64.scale_eq(0.25 + 1e-9));
        assert!(!0.25_f64.scale_eq(0.2501));
    }
}
