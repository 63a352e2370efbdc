//! Container transforms and affine matrices.

use crate::core::geo::Point;
use crate::traits::Lerp;
use nalgebra::{Matrix3, Point2, Similarity2, Vector2};

fn to_point2(point: &Point) -> Point2<f64> {
    Point2::new(point.x, point.y)
}

fn from_point2(point: Point2<f64>) -> Point {
    Point::new(point.x, point.y)
}

/// Uniform scale followed by a translation, in view pixels.
///
/// This is what the navigation animation applies to scale containers:
/// a point `p` ends up at `p * scale + translate`. The scale must be
/// non-zero; `new` panics otherwise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform(Similarity2<f64>);

impl Transform {
    pub fn new(scale: f64, translate: Point) -> Self {
        Self(Similarity2::new(Vector2::new(translate.x, translate.y), 0.0, scale))
    }

    pub fn identity() -> Self {
        Self(Similarity2::identity())
    }

    pub fn translation(translate: Point) -> Self {
        Self::new(1.0, translate)
    }

    pub fn scale(&self) -> f64 {
        self.0.scaling()
    }

    pub fn translate(&self) -> Point {
        let vector = self.0.isometry.translation.vector;
        Point::new(vector.x, vector.y)
    }

    pub fn is_identity(&self) -> bool {
        self.scale() == 1.0 && self.translate() == Point::zero()
    }

    pub fn apply(&self, point: &Point) -> Point {
        from_point2(self.0.transform_point(&to_point2(point)))
    }

    /// Applies `self` first, then `next`
    pub fn then(&self, next: &Transform) -> Transform {
        Transform(next.0 * self.0)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Lerp for Transform {
    fn lerp(&self, other: &Self, t: f64) -> Self {
        Transform::new(
            self.scale().lerp(&other.scale(), t),
            self.translate().lerp(&other.translate(), t),
        )
    }
}

/// 2-D affine matrix in homogeneous coordinates.
///
/// `Matrix::new(a, b, c, d, e, f)` maps `(x, y)` to
/// `(a*x + c*y + e, b*x + d*y + f)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix(Matrix3<f64>);

impl Matrix {
    pub fn identity() -> Self {
        Self(Matrix3::identity())
    }

    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self(Matrix3::new(a, c, e, b, d, f, 0.0, 0.0, 1.0))
    }

    pub fn translation(tx: f64, ty: f64) -> Self {
        Self(Matrix3::new_translation(&Vector2::new(tx, ty)))
    }

    pub fn scaling(sx: f64, sy: f64) -> Self {
        Self(Matrix3::new_nonuniform_scaling(&Vector2::new(sx, sy)))
    }

    pub fn apply(&self, point: &Point) -> Point {
        from_point2(self.0.transform_point(&to_point2(point)))
    }

    /// Applies `self` first, then `next`
    pub fn then(&self, next: &Matrix) -> Matrix {
        Matrix(next.0 * self.0)
    }

    /// Inverse matrix, `None` when singular
    pub fn invert(&self) -> Option<Matrix> {
        self.0.try_inverse().map(Matrix)
    }

    pub fn is_identity(&self) -> bool {
        self.0 == Matrix3::identity()
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Point, b: Point) -> bool {
        (a.x - b.x).abs() < 1e-9 && (a.y - b.y).abs() < 1e-9
    }

    #[test]
    fn test_transform_scales_then_translates() {
        let zoom = Transform::new(2.0, Point::new(10.0, -5.0));
        assert!(close(zoom.apply(&Point::new(1.0, 1.0)), Point::new(12.0, -3.0)));
        assert_eq!(zoom.scale(), 2.0);
        assert_eq!(zoom.translate(), Point::new(10.0, -5.0));

        let pan = Transform::translation(Point::new(1.0, 1.0));
        assert!(close(pan.apply(&Point::new(3.0, 4.0)), Point::new(4.0, 5.0)));
        assert!(!pan.is_identity());

        let p = Point::new(3.0, 4.0);
        assert!(close(zoom.then(&pan).apply(&p), pan.apply(&zoom.apply(&p))));
    }

    #[test]
    fn test_transform_lerp() {
        let from = Transform::identity();
        let to = Transform::new(3.0, Point::new(100.0, 50.0));
        let mid = from.lerp(&to, 0.5);
        assert_eq!(mid.scale(), 2.0);
        assert_eq!(mid.translate(), Point::new(50.0, 25.0));
        assert!(Transform::default().is_identity());
    }

    #[test]
    fn test_matrix_invert_round_trip() {
        let m = Matrix::new(2.0, 0.0, 0.0, -2.0, 40.0, 60.0);
        let inv = m.invert().unwrap();
        let p = Point::new(7.0, -3.0);
        assert!(close(inv.apply(&m.apply(&p)), p));
        assert!(Matrix::scaling(0.0, 1.0).invert().is_none());
    }

    #[test]
    fn test_matrix_then_matches_sequential_apply() {
        let scale = Matrix::scaling(4.0, -4.0);
        let translate = Matrix::translation(10.0, 20.0);
        let combined = scale.then(&translate);
        let p = Point::new(1.5, 2.5);
        assert!(close(combined.apply(&p), translate.apply(&scale.apply(&p))));
        assert_eq!(combined, Matrix::new(4.0, 0.0, 0.0, -4.0, 10.0, 20.0));
    }
}
