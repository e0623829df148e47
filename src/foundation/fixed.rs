//! 16.16 fixed-point scalars and 3x3 transforms mapping destination space into source space.

use serde::{Deserialize, Serialize};

pub type Fixed = i32;

pub const FIXED_ONE: Fixed = 1 << 16;
pub const FIXED_HALF: Fixed = 1 << 15;
/// Smallest representable step.
pub const FIXED_E: Fixed = 1;
pub const FIXED_FRAC_MASK: Fixed = FIXED_ONE - 1;

#[inline]
pub const fn int_to_fixed(i: i32) -> Fixed {
    i << 16
}

/// Floor to integer.
#[inline]
pub const fn fixed_to_int(f: Fixed) -> i32 {
    f >> 16
}

#[inline]
pub const fn fixed_frac(f: Fixed) -> Fixed {
    f & FIXED_FRAC_MASK
}

#[inline]
pub fn double_to_fixed(d: f64) -> Fixed {
    (d * 65536.0) as Fixed
}

#[inline]
pub fn fixed_to_double(f: Fixed) -> f64 {
    f64::from(f) / 65536.0
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transform {
    pub matrix: [[Fixed; 3]; 3],
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        matrix: [
            [FIXED_ONE, 0, 0],
            [0, FIXED_ONE, 0],
            [0, 0, FIXED_ONE],
        ],
    };

    pub const fn from_matrix(matrix: [[Fixed; 3]; 3]) -> Self {
        Self { matrix }
    }

    pub fn scale(sx: f64, sy: f64) -> Self {
        let mut t = Self::IDENTITY;
        t.matrix[0][0] = double_to_fixed(sx);
        t.matrix[1][1] = double_to_fixed(sy);
        t
    }

    pub fn translate(tx: f64, ty: f64) -> Self {
        let mut t = Self::IDENTITY;
        t.matrix[0][2] = double_to_fixed(tx);
        t.matrix[1][2] = double_to_fixed(ty);
        t
    }

    /// Rotation about the origin. Quarter turns produce exact 0/±1 entries.
    pub fn rotate_degrees(deg: f64) -> Self {
        let (s, c) = deg.to_radians().sin_cos();
        Self::from_matrix([
            [double_to_fixed(c), double_to_fixed(-s), 0],
            [double_to_fixed(s), double_to_fixed(c), 0],
            [0, 0, FIXED_ONE],
        ])
    }

    /// Converts a `kurbo` affine (`[a b c d e f]`, column-major) into fixed point.
    pub fn from_affine(a: kurbo::Affine) -> Self {
        let [a, b, c, d, e, f] = a.as_coeffs();
        Self::from_matrix([
            [double_to_fixed(a), double_to_fixed(c), double_to_fixed(e)],
            [double_to_fixed(b), double_to_fixed(d), double_to_fixed(f)],
            [0, 0, FIXED_ONE],
        ])
    }

    /// `self * rhs`, i.e. `rhs` is applied to a point first. `None` when an entry overflows.
    pub fn multiply(&self, rhs: &Transform) -> Option<Transform> {
        let mut out = [[0; 3]; 3];
        for (dy, row) in out.iter_mut().enumerate() {
            for (dx, cell) in row.iter_mut().enumerate() {
                let mut v: i64 = 0;
                for o in 0..3 {
                    let partial = i64::from(self.matrix[dy][o]) * i64::from(rhs.matrix[o][dx]);
                    v += (partial + 0x8000) >> 16;
                }
                *cell = Fixed::try_from(v).ok()?;
            }
        }
        Some(Transform::from_matrix(out))
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Bottom row is `0 0 1`.
    pub fn is_affine(&self) -> bool {
        self.matrix[2][0] == 0 && self.matrix[2][1] == 0 && self.matrix[2][2] == FIXED_ONE
    }

    /// Applies the full 3x3 matrix to a homogeneous 16.16 vector.
    ///
    /// Returns `None` when a component does not fit back into 16.16.
    pub fn transform_point_3d(&self, v: [Fixed; 3]) -> Option<[Fixed; 3]> {
        let mut out = [0; 3];
        for (i, cell) in out.iter_mut().enumerate() {
            let mut hi: i64 = 0;
            let mut lo: i64 = 0;
            for (j, &c) in v.iter().enumerate() {
                let m = i64::from(self.matrix[i][j]);
                hi += m * i64::from(c >> 16);
                lo += m * i64::from(c & 0xffff);
            }
            *cell = Fixed::try_from(hi + ((lo + 0x8000) >> 16)).ok()?;
        }
        Some(out)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/fixed.rs"]
mod tests;
