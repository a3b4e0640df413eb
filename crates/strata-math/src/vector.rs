use glam::DVec3;

/// Vectors shorter than this normalize to zero.
const NORMALIZE_THRESHOLD: f64 = 1.0e-4;

/// Unit vector in the direction of `v`, or zero when `v` is too short to
/// have a meaningful direction.
pub fn normalize_or_zero(v: DVec3) -> DVec3 {
    let len = v.length();
    if len < NORMALIZE_THRESHOLD {
        DVec3::ZERO
    } else {
        v / len
    }
}

/// Squared length of the horizontal (XZ) part of `v`.
pub fn horizontal_distance_sqr(v: DVec3) -> f64 {
    v.x * v.x + v.z * v.z
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_vector_normalizes_to_zero() {
        assert_eq!(normalize_or_zero(DVec3::new(1.0e-5, 0.0, 0.0)), DVec3::ZERO);
    }

    #[test]
    fn test_normalize_unit_length() {
        let n = normalize_or_zero(DVec3::new(3.0, 0.0, 4.0));
        assert!((n.length() - 1.0).abs() < 1e-12);
        assert!((n.x - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_horizontal_distance_ignores_y() {
        assert_eq!(horizontal_distance_sqr(DVec3::new(3.0, 100.0, 4.0)), 25.0);
    }
}
