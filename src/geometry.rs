//! Small linear algebra kernel on top of nalgebra.
//!
//! nalgebra provides storage, arithmetic, dot/cross products and norms. What
//! lives here is the cofactor (Laplace) determinant and the adjugate based
//! inverse, plus helpers for moving in and out of homogeneous coordinates.
//! Determinants are computed recursively on dynamically sized matrices, so the
//! same code serves every square size, though only 3x3 and 4x4 are used by the
//! pipeline.

use nalgebra as na;
use na::{vector, DMatrix, Matrix3, Matrix4, SMatrix, Vector2, Vector3, Vector4};

pub type Vec2i = Vector2<i32>;
pub type Vec3i = Vector3<i32>;
pub type Vec2f = Vector2<f32>;
pub type Vec3f = Vector3<f32>;
pub type Vec4f = Vector4<f32>;
pub type Mat3f = Matrix3<f32>;
pub type Mat4f = Matrix4<f32>;

/// Matrices with a determinant this close to zero are treated as singular.
pub const SINGULAR_EPSILON: f32 = 1e-8;

/// Transformation of a point to homogenous coordinates.
pub fn to_hom_point(v: Vec3f) -> Vec4f {
    return vector![v.x, v.y, v.z, 1.0];
}

/// Transformation of a direction to homogenous coordinates.
pub fn to_hom_vector(v: Vec3f) -> Vec4f {
    return vector![v.x, v.y, v.z, 0.0];
}

/// Transformation of a point from homogenous coordinates (perspective division).
/// `w` must be non-zero.
pub fn from_hom_point(v: Vec4f) -> Vec3f {
    return vector![v.x / v.w, v.y / v.w, v.z / v.w];
}

/// Unit vector in the direction of `v`, or `None` for a zero-length vector.
pub fn normalized(v: Vec3f) -> Option<Vec3f> {
    return v.try_normalize(f32::EPSILON);
}

/// Matrix with `row` and `col` removed.
pub fn minor(m: &DMatrix<f32>, row: usize, col: usize) -> DMatrix<f32> {
    return m.clone().remove_row(row).remove_column(col);
}

/// Signed minor: `det(minor(row, col)) * (-1)^(row + col)`.
pub fn cofactor(m: &DMatrix<f32>, row: usize, col: usize) -> f32 {
    let sign = if (row + col) % 2 == 0 { 1.0 } else { -1.0 };
    return sign * determinant(&minor(m, row, col));
}

/// Determinant by cofactor expansion along the first row.
///
/// O(n!) in the matrix size. Fine for the 3x3 and 4x4 matrices the renderer
/// deals with, not meant for anything large.
pub fn determinant(m: &DMatrix<f32>) -> f32 {
    debug_assert!(m.is_square(), "determinant of a non-square matrix");
    match m.nrows() {
        0 => 1.0,
        1 => m[(0, 0)],
        n => (0..n).map(|col| m[(0, col)] * cofactor(m, 0, col)).sum(),
    }
}

/// Matrix of cofactors. Its transpose is the adjugate.
pub fn cofactor_matrix(m: &DMatrix<f32>) -> DMatrix<f32> {
    let n = m.nrows();
    return DMatrix::from_fn(n, n, |row, col| cofactor(m, row, col));
}

/// Transposed inverse, `cofactors / det`.
///
/// Filling every cell with its own cofactor gives the adjugate already
/// transposed, so this is the cheaper of the two inverses to get at.
/// Returns `None` for singular matrices.
pub fn inverse_transpose(m: &DMatrix<f32>) -> Option<DMatrix<f32>> {
    let cofactors = cofactor_matrix(m);
    // Expansion along the first row, reusing cofactors that are already computed.
    let det: f32 = (0..m.ncols()).map(|col| m[(0, col)] * cofactors[(0, col)]).sum();
    if !det.is_finite() || det.abs() < SINGULAR_EPSILON {
        return None;
    }
    return Some(cofactors / det);
}

/// Inverse via the adjugate. Returns `None` for singular matrices.
pub fn inverse(m: &DMatrix<f32>) -> Option<DMatrix<f32>> {
    return inverse_transpose(m).map(|m| m.transpose());
}

/// Cofactor based determinant and inverse for fixed size square matrices.
pub trait Cofactor: Sized {
    fn cofactor_det(&self) -> f32;
    fn cofactor_inverse(&self) -> Option<Self>;
    fn cofactor_inverse_transpose(&self) -> Option<Self>;
}

impl<const N: usize> Cofactor for SMatrix<f32, N, N> {
    fn cofactor_det(&self) -> f32 {
        return determinant(&to_dynamic(self));
    }

    fn cofactor_inverse(&self) -> Option<Self> {
        return inverse(&to_dynamic(self)).map(|m| from_dynamic(&m));
    }

    fn cofactor_inverse_transpose(&self) -> Option<Self> {
        return inverse_transpose(&to_dynamic(self)).map(|m| from_dynamic(&m));
    }
}

fn to_dynamic<const N: usize>(m: &SMatrix<f32, N, N>) -> DMatrix<f32> {
    return DMatrix::from_fn(N, N, |row, col| m[(row, col)]);
}

fn from_dynamic<const N: usize>(m: &DMatrix<f32>) -> SMatrix<f32, N, N> {
    return SMatrix::<f32, N, N>::from_fn(|row, col| m[(row, col)]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use na::matrix;

    #[test]
    fn cross_is_orthogonal_to_both_operands() {
        let a = vector![1.0, 2.0, 3.0];
        let b = vector![-4.0, 0.5, 2.0];
        let c: Vec3f = a.cross(&b);
        assert_relative_eq!(c.dot(&a), 0.0, epsilon = 1e-5);
        assert_relative_eq!(c.dot(&b), 0.0, epsilon = 1e-5);
        // Right handed.
        let z = Vec3f::x().cross(&Vec3f::y());
        assert_relative_eq!(z, Vec3f::z());
    }

    #[test]
    fn normalized_has_unit_norm() {
        let v = normalized(vector![3.0, -4.0, 12.0]).unwrap();
        assert_relative_eq!(v.norm(), 1.0, epsilon = 1e-6);
        assert_relative_eq!(v, Vec3f::new(3.0, -4.0, 12.0) / 13.0, epsilon = 1e-6);
    }

    #[test]
    fn normalized_rejects_zero_vector() {
        assert!(normalized(Vec3f::zeros()).is_none());
    }

    #[test]
    fn homogeneous_round_trip() {
        let p = vector![1.0, 2.0, 3.0];
        assert_relative_eq!(from_hom_point(to_hom_point(p)), p);
        assert_relative_eq!(from_hom_point(vector![2.0, 4.0, 6.0, 2.0]), p);
        assert_eq!(to_hom_vector(p).w, 0.0);
    }

    #[test]
    fn determinant_small_cases() {
        assert_eq!(determinant(&DMatrix::from_row_slice(1, 1, &[7.0])), 7.0);
        let m2 = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        assert_relative_eq!(determinant(&m2), -2.0);
        let m3 = DMatrix::from_row_slice(3, 3, &[2.0, 0.0, 1.0, 1.0, 3.0, 2.0, 1.0, 1.0, 2.0]);
        assert_relative_eq!(determinant(&m3), 6.0, epsilon = 1e-5);
    }

    #[test]
    fn cofactor_det_matches_nalgebra() {
        let m: Mat4f = matrix![2.0, -1.0, 0.0, 3.0;
                               1.0,  4.0, 2.0, 0.5;
                               0.0,  1.0, 5.0, 1.0;
                               3.0,  0.0, 1.0, 2.0];
        assert_relative_eq!(m.cofactor_det(), m.determinant(), epsilon = 1e-3);
    }

    #[test]
    fn inverse_round_trip_3x3() {
        let m: Mat3f = matrix![4.0, 7.0, 2.0;
                               3.0, 6.0, 1.0;
                               2.0, 5.0, 3.0];
        let inv = m.cofactor_inverse().unwrap();
        assert_relative_eq!(m * inv, Mat3f::identity(), epsilon = 1e-5);
        assert_relative_eq!(inv * m, Mat3f::identity(), epsilon = 1e-5);
    }

    #[test]
    fn inverse_round_trip_4x4() {
        let m: Mat4f = matrix![1.0, 2.0, 0.0, -1.0;
                               0.0, 1.0, 3.0,  2.0;
                               2.0, 0.0, 1.0,  0.0;
                               1.0, 1.0, 1.0,  4.0];
        let inv = m.cofactor_inverse().unwrap();
        assert_relative_eq!(m * inv, Mat4f::identity(), epsilon = 1e-5);
    }

    #[test]
    fn inverse_transpose_is_transposed_inverse() {
        let m: Mat3f = matrix![1.0, 2.0, 3.0;
                               0.0, 1.0, 4.0;
                               5.0, 6.0, 0.0];
        let it = m.cofactor_inverse_transpose().unwrap();
        let inv = m.try_inverse().unwrap();
        assert_relative_eq!(it, inv.transpose(), epsilon = 1e-5);
    }

    #[test]
    fn singular_matrix_has_no_inverse() {
        // Collinear rows, like a degenerate triangle in screen space.
        let m: Mat3f = matrix![0.0, 0.0, 1.0;
                               1.0, 1.0, 1.0;
                               2.0, 2.0, 1.0];
        assert_relative_eq!(m.cofactor_det(), 0.0);
        assert!(m.cofactor_inverse().is_none());
        assert!(m.cofactor_inverse_transpose().is_none());
    }
}
