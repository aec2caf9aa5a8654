//! Conversion between the importer's column-vector matrices and the row-vector
//! numerics convention used by shader constants.
//!
//! `ImportMatrix4x4` stores rows `a..d` and columns `1..4`; points are transformed
//! as `M * p`, so the basis axes are columns 1-3 and translation is column 4.
//! `Matrix4x4` transforms as `p * M`: axes are rows 1-3, translation is row 4.

use glam::{Mat4, Vec3, Vec4};

/// 4x4 matrix in the asset importer's layout (column-vector convention).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ImportMatrix4x4 {
    pub a1: f32,
    pub a2: f32,
    pub a3: f32,
    pub a4: f32,
    pub b1: f32,
    pub b2: f32,
    pub b3: f32,
    pub b4: f32,
    pub c1: f32,
    pub c2: f32,
    pub c3: f32,
    pub c4: f32,
    pub d1: f32,
    pub d2: f32,
    pub d3: f32,
    pub d4: f32,
}

/// 4x4 matrix in the row-vector numerics layout.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Matrix4x4 {
    pub m11: f32,
    pub m12: f32,
    pub m13: f32,
    pub m14: f32,
    pub m21: f32,
    pub m22: f32,
    pub m23: f32,
    pub m24: f32,
    pub m31: f32,
    pub m32: f32,
    pub m33: f32,
    pub m34: f32,
    pub m41: f32,
    pub m42: f32,
    pub m43: f32,
    pub m44: f32,
}

/// Importer 3-vector. Same layout as `glam::Vec3`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ImportVector3D {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl ImportMatrix4x4 {
    pub const IDENTITY: Self = Self::from_rows([
        [1.0, 0.0, 0.0, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ]);

    /// Build from rows `a`, `b`, `c`, `d`.
    pub const fn from_rows(rows: [[f32; 4]; 4]) -> Self {
        let [a, b, c, d] = rows;
        Self {
            a1: a[0],
            a2: a[1],
            a3: a[2],
            a4: a[3],
            b1: b[0],
            b2: b[1],
            b3: b[2],
            b4: b[3],
            c1: c[0],
            c2: c[1],
            c3: c[2],
            c4: c[3],
            d1: d[0],
            d2: d[1],
            d3: d[2],
            d4: d[3],
        }
    }

    pub fn rows(&self) -> [[f32; 4]; 4] {
        [
            [self.a1, self.a2, self.a3, self.a4],
            [self.b1, self.b2, self.b3, self.b4],
            [self.c1, self.c2, self.c3, self.c4],
            [self.d1, self.d2, self.d3, self.d4],
        ]
    }

    #[inline]
    pub fn translation(&self) -> Vec3 {
        Vec3::new(self.a4, self.b4, self.c4)
    }
}

impl Default for ImportMatrix4x4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Matrix4x4 {
    pub const IDENTITY: Self = Self::from_rows([
        [1.0, 0.0, 0.0, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ]);

    pub const fn from_rows(rows: [[f32; 4]; 4]) -> Self {
        let [r1, r2, r3, r4] = rows;
        Self {
            m11: r1[0],
            m12: r1[1],
            m13: r1[2],
            m14: r1[3],
            m21: r2[0],
            m22: r2[1],
            m23: r2[2],
            m24: r2[3],
            m31: r3[0],
            m32: r3[1],
            m33: r3[2],
            m34: r3[3],
            m41: r4[0],
            m42: r4[1],
            m43: r4[2],
            m44: r4[3],
        }
    }

    pub fn rows(&self) -> [[f32; 4]; 4] {
        [
            [self.m11, self.m12, self.m13, self.m14],
            [self.m21, self.m22, self.m23, self.m24],
            [self.m31, self.m32, self.m33, self.m34],
            [self.m41, self.m42, self.m43, self.m44],
        ]
    }

    #[inline]
    pub fn translation(&self) -> Vec3 {
        Vec3::new(self.m41, self.m42, self.m43)
    }

    /// Row `n` of a row-vector matrix is column `n` of the equivalent glam matrix.
    pub fn to_glam(&self) -> Mat4 {
        let [r1, r2, r3, r4] = self.rows();
        Mat4::from_cols(
            Vec4::from_array(r1),
            Vec4::from_array(r2),
            Vec4::from_array(r3),
            Vec4::from_array(r4),
        )
    }

    pub fn from_glam(m: Mat4) -> Self {
        Self::from_rows(m.to_cols_array_2d())
    }
}

impl Default for Matrix4x4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Importer matrix to row-vector numerics matrix.
pub fn to_numerics(m: &ImportMatrix4x4) -> Matrix4x4 {
    Matrix4x4 {
        m11: m.a1,
        m12: m.b1,
        m13: m.c1,
        m14: m.d1,

        m21: m.a2,
        m22: m.b2,
        m23: m.c2,
        m24: m.d2,

        m31: m.a3,
        m32: m.b3,
        m33: m.c3,
        m34: m.d3,

        // translation: last column -> last row
        m41: m.a4,
        m42: m.b4,
        m43: m.c4,
        m44: m.d4,
    }
}

/// Row-vector numerics matrix back to the importer layout.
pub fn from_numerics(m: &Matrix4x4) -> ImportMatrix4x4 {
    ImportMatrix4x4 {
        a1: m.m11,
        a2: m.m21,
        a3: m.m31,
        a4: m.m41,

        b1: m.m12,
        b2: m.m22,
        b3: m.m32,
        b4: m.m42,

        c1: m.m13,
        c2: m.m23,
        c3: m.m33,
        c4: m.m43,

        d1: m.m14,
        d2: m.m24,
        d3: m.m34,
        d4: m.m44,
    }
}

#[inline]
pub fn vector_to_numerics(v: &ImportVector3D) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

#[inline]
pub fn vector_from_numerics(v: Vec3) -> ImportVector3D {
    ImportVector3D {
        x: v.x,
        y: v.y,
        z: v.z,
    }
}

impl From<ImportMatrix4x4> for Matrix4x4 {
    fn from(m: ImportMatrix4x4) -> Self {
        to_numerics(&m)
    }
}

impl From<Matrix4x4> for ImportMatrix4x4 {
    fn from(m: Matrix4x4) -> Self {
        from_numerics(&m)
    }
}

impl From<ImportVector3D> for Vec3 {
    fn from(v: ImportVector3D) -> Self {
        vector_to_numerics(&v)
    }
}

impl From<Vec3> for ImportVector3D {
    fn from(v: Vec3) -> Self {
        vector_from_numerics(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{EulerRot, Quat};

    fn sequential() -> ImportMatrix4x4 {
        ImportMatrix4x4::from_rows([
            [1.0, 2.0, 3.0, 4.0],
            [5.0, 6.0, 7.0, 8.0],
            [9.0, 10.0, 11.0, 12.0],
            [13.0, 14.0, 15.0, 16.0],
        ])
    }

    #[test]
    fn element_table_matches_convention() {
        let n = to_numerics(&sequential());
        assert_eq!(
            n.rows(),
            [
                [1.0, 5.0, 9.0, 13.0],
                [2.0, 6.0, 10.0, 14.0],
                [3.0, 7.0, 11.0, 15.0],
                [4.0, 8.0, 12.0, 16.0],
            ]
        );
    }

    #[test]
    fn round_trip_is_identity() {
        let m = sequential();
        assert_eq!(from_numerics(&to_numerics(&m)), m);

        let n = Matrix4x4::from_rows([
            [0.5, -1.0, 2.5, 0.0],
            [3.0, 0.25, -7.0, 0.0],
            [1.5, 8.0, 9.75, 0.0],
            [-4.0, 6.0, 12.0, 1.0],
        ]);
        assert_eq!(to_numerics(&from_numerics(&n)), n);
    }

    #[test]
    fn translation_moves_from_last_column_to_last_row() {
        let mut m = ImportMatrix4x4::IDENTITY;
        m.a4 = 3.0;
        m.b4 = -2.0;
        m.c4 = 7.5;

        let n: Matrix4x4 = m.into();
        assert_eq!(n.translation(), Vec3::new(3.0, -2.0, 7.5));
        assert_eq!((n.m14, n.m24, n.m34), (0.0, 0.0, 0.0));
        assert_eq!(ImportMatrix4x4::from(n).translation(), m.translation());
    }

    #[test]
    fn numerics_matrix_agrees_with_glam() {
        let q = Quat::from_euler(EulerRot::XYZ, 0.3, -1.1, 0.7);
        let g = Mat4::from_scale_rotation_translation(Vec3::new(2.0, 1.0, 0.5), q, Vec3::new(1.0, 2.0, 3.0));
        // glam and the importer share the column-vector convention, so the importer's
        // rows are glam's rows.
        let import = ImportMatrix4x4::from_rows(g.transpose().to_cols_array_2d());

        let n = to_numerics(&import);
        assert_eq!(n.to_glam(), g);
        assert_eq!(Matrix4x4::from_glam(g), n);
        assert_eq!(n.translation(), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn vector_conversion_is_identity() {
        for (x, y, z) in [(0.0, 0.0, 0.0), (1.0, -2.0, 3.5), (f32::MAX, f32::MIN, 1e-9)] {
            let v = ImportVector3D { x, y, z };
            let n = vector_to_numerics(&v);
            assert_eq!(n, Vec3::new(x, y, z));
            assert_eq!(vector_from_numerics(n), v);
        }
    }
}
