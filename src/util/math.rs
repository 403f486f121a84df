//! Math type re-exports and transform utilities.
//!
//! Local-to-world transforms are stored as column-major `Mat4` (translation in
//! `w_axis`). Decomposition assumes an affine matrix without shear.

pub use glam::{Mat4, Quat, Vec3, Vec4};

/// A point in world space.
pub type Point3 = Vec3;

/// Tolerance used when comparing decomposed components.
pub const TRANSFORM_EPSILON: f32 = 1e-4;

/// Translation, rotation and scale parts of an affine transform.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Decomposed {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Decomposed {
    /// Identity components.
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    /// Recompose into a matrix.
    #[inline]
    pub fn compose(&self) -> Mat4 {
        compose(self.translation, self.rotation, self.scale)
    }
}

impl Default for Decomposed {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Split a local-to-world transform into translation, rotation and scale.
#[inline]
pub fn decompose(m: &Mat4) -> Decomposed {
    let (scale, rotation, translation) = m.to_scale_rotation_translation();
    Decomposed {
        translation,
        rotation: rotation.normalize(),
        scale,
    }
}

/// Build a local-to-world transform from its parts (scale, then rotate, then translate).
#[inline]
pub fn compose(translation: Vec3, rotation: Quat, scale: Vec3) -> Mat4 {
    Mat4::from_scale_rotation_translation(scale, rotation, translation)
}

/// Translation part of a transform, read directly from the last column.
#[inline]
pub fn translation_of(m: &Mat4) -> Vec3 {
    m.w_axis.truncate()
}

/// Replace only the translation of a transform, leaving the 3x3 part untouched.
#[inline]
pub fn with_translation(m: &Mat4, translation: Vec3) -> Mat4 {
    let mut out = *m;
    out.w_axis = translation.extend(m.w_axis.w);
    out
}

/// Replace only the scale of a transform via decompose + recompose.
#[inline]
pub fn with_scale(m: &Mat4, scale: Vec3) -> Mat4 {
    let d = decompose(m);
    compose(d.translation, d.rotation, scale)
}

/// Two rotations describe the same orientation (q and -q are equivalent).
#[inline]
pub fn same_rotation(a: Quat, b: Quat, eps: f32) -> bool {
    a.dot(b).abs() >= 1.0 - eps
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).abs().max_element() < TRANSFORM_EPSILON
    }

    #[test]
    fn test_identity_decompose() {
        let d = decompose(&Mat4::IDENTITY);
        assert_eq!(d, Decomposed::IDENTITY);
        assert_eq!(d.compose(), Mat4::IDENTITY);
    }

    #[test]
    fn test_round_trip() {
        let samples = [
            (Vec3::new(10.0, -4.0, 3.5), Quat::from_rotation_z(0.7), Vec3::new(1.0, 2.0, 3.0)),
            (Vec3::new(-15131.0, -4366.0, -1208.0), Quat::from_euler(glam::EulerRot::XYZ, 0.3, -1.1, 2.0), Vec3::splat(0.5)),
            (Vec3::ZERO, Quat::from_rotation_y(std::f32::consts::PI), Vec3::new(4.0, 1.0, 0.25)),
        ];

        for (t, r, s) in samples {
            let m = compose(t, r, s);
            let d = decompose(&m);
            assert!(approx(d.translation, t), "translation {:?} vs {:?}", d.translation, t);
            assert!(approx(d.scale, s), "scale {:?} vs {:?}", d.scale, s);
            assert!(same_rotation(d.rotation, r, TRANSFORM_EPSILON));

            let back = d.compose();
            assert!(back.abs_diff_eq(m, 1e-2));
        }
    }

    #[test]
    fn test_with_translation_keeps_basis() {
        let m = compose(Vec3::new(1.0, 2.0, 3.0), Quat::from_rotation_x(0.5), Vec3::splat(2.0));
        let moved = with_translation(&m, Vec3::new(-7.0, 8.0, 9.0));
        assert_eq!(translation_of(&moved), Vec3::new(-7.0, 8.0, 9.0));
        assert_eq!(moved.x_axis, m.x_axis);
        assert_eq!(moved.y_axis, m.y_axis);
        assert_eq!(moved.z_axis, m.z_axis);
    }

    #[test]
    fn test_with_scale_keeps_translation_and_rotation() {
        let r = Quat::from_rotation_z(1.2);
        let m = compose(Vec3::new(5.0, 6.0, 7.0), r, Vec3::ONE);
        let scaled = with_scale(&m, Vec3::new(2.0, 3.0, 4.0));
        let d = decompose(&scaled);
        assert!(approx(d.translation, Vec3::new(5.0, 6.0, 7.0)));
        assert!(approx(d.scale, Vec3::new(2.0, 3.0, 4.0)));
        assert!(same_rotation(d.rotation, r, TRANSFORM_EPSILON));
    }
}
