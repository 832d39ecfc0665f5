//! Circular location arithmetic.
//!
//! Node locations live on a ring of circumference 1.0; the routing
//! distance between two locations is the shorter way around.

/// Circular (wraparound) distance between two locations on [0,1).
pub fn distance(a: f64, b: f64) -> f64 {
    debug_assert!((0.0..1.0).contains(&a), "location {} out of range", a);
    debug_assert!((0.0..1.0).contains(&b), "location {} out of range", b);
    let d = (a - b).abs();
    d.min(1.0 - d)
}

/// Truncate a location to the given number of decimal digits.
///
/// Used to simulate imprecise knowledge of distant nodes' locations:
/// a node knows its direct neighbors exactly, but locations reported
/// from further away have lost precision in transit.
pub fn truncate(location: f64, digits: u32) -> f64 {
    if digits == 0 {
        return 0.0;
    }
    let scale = 10f64.powi(digits as i32);
    (location * scale).trunc() / scale
}

/// Wrap an arbitrary offset back onto the [0,1) ring.
pub fn wrap(location: f64) -> f64 {
    let wrapped = location.rem_euclid(1.0);
    // rem_euclid can return exactly 1.0 for tiny negative inputs.
    if wrapped >= 1.0 {
        0.0
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_is_symmetric_and_wraps() {
        assert_eq!(distance(0.1, 0.3), distance(0.3, 0.1));
        assert!((distance(0.1, 0.3) - 0.2).abs() < 1e-12);
        // Shorter way around the ring.
        assert!((distance(0.95, 0.05) - 0.1).abs() < 1e-12);
        assert_eq!(distance(0.4, 0.4), 0.0);
    }

    #[test]
    fn distance_never_exceeds_half() {
        for i in 0..100 {
            for j in 0..100 {
                let d = distance(i as f64 / 100.0, j as f64 / 100.0);
                assert!(d <= 0.5 + 1e-12);
            }
        }
    }

    #[test]
    fn truncate_drops_digits() {
        assert!((truncate(0.123456, 2) - 0.12).abs() < 1e-12);
        assert!((truncate(0.999999, 3) - 0.999).abs() < 1e-12);
        assert_eq!(truncate(0.123456, 0), 0.0);
    }

    #[test]
    fn wrap_keeps_range() {
        assert!((wrap(1.25) - 0.25).abs() < 1e-12);
        assert!((wrap(-0.25) - 0.75).abs() < 1e-12);
        let w = wrap(0.5);
        assert!((0.0..1.0).contains(&w));
    }
}
