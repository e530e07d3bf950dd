//! Shrinking arena boundary.
//!
//! The radius is a pure function of elapsed simulation time: a linear shrink
//! from `initial_radius` to `min_radius` over `shrink_duration_ms`, then one
//! halving per `halving_interval_ms`, never dropping below `floor_radius`.

use crate::config::BoundaryConfig;
use glam::DVec2;

/// The circular playable region.
#[derive(Debug, Clone)]
pub struct Boundary {
    center: DVec2,
    initial_radius: f64,
    min_radius: f64,
    shrink_duration_ms: f64,
    halving_interval_ms: f64,
    floor_radius: f64,
}

impl Boundary {
    /// Create a boundary centered at `center`.
    pub fn new(center: DVec2, config: &BoundaryConfig) -> Self {
        Self {
            center,
            initial_radius: config.initial_radius,
            min_radius: config.min_radius,
            shrink_duration_ms: config.shrink_duration_ms,
            halving_interval_ms: config.halving_interval_ms,
            floor_radius: config.floor_radius,
        }
    }

    pub fn center(&self) -> DVec2 {
        self.center
    }

    /// Radius after `elapsed_ms` milliseconds of simulation.
    pub fn radius(&self, elapsed_ms: f64) -> f64 {
        let elapsed = if elapsed_ms.is_finite() {
            elapsed_ms.max(0.0)
        } else if elapsed_ms > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        if elapsed < self.shrink_duration_ms {
            let shrink = (self.initial_radius - self.min_radius) * (elapsed / self.shrink_duration_ms);
            return (self.initial_radius - shrink).max(self.floor_radius);
        }

        if self.halving_interval_ms <= 0.0 {
            return self.floor_radius;
        }

        let halvings = ((elapsed - self.shrink_duration_ms) / self.halving_interval_ms).floor();
        // Saturating cast: past ~1075 halvings the radius is already 0.
        let radius = self.min_radius * 0.5f64.powi(halvings.min(i32::MAX as f64) as i32);
        radius.max(self.floor_radius)
    }

    /// Whether `point` is inside (or on) a circle of `radius` around the center.
    ///
    /// Callers pass a radius from [`Boundary::radius`] so it is computed once per tick.
    pub fn contains(&self, point: DVec2, radius: f64) -> bool {
        point.distance(self.center) <= radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boundary() -> Boundary {
        Boundary::new(DVec2::new(2000.0, 2000.0), &BoundaryConfig::default())
    }

    #[test]
    fn test_schedule_key_points() {
        let b = boundary();
        assert_eq!(b.radius(0.0), 2000.0);
        assert_eq!(b.radius(90_000.0), 1100.0);
        assert!((b.radius(180_000.0) - 200.0).abs() < 1e-9);
        assert!((b.radius(209_999.0) - 200.0).abs() < 1e-9);
        assert!((b.radius(210_000.0) - 100.0).abs() < 1e-9);
        assert!((b.radius(240_000.0) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_radius_floor() {
        let b = boundary();
        // 200 / 2^8 < 1
        assert_eq!(b.radius(180_000.0 + 8.0 * 30_000.0), 1.0);
        assert_eq!(b.radius(1e12), 1.0);
        assert_eq!(b.radius(f64::INFINITY), 1.0);
    }

    #[test]
    fn test_radius_non_increasing() {
        let b = boundary();
        let mut previous = b.radius(0.0);
        let mut t = 0.0;
        while t < 600_000.0 {
            t += 997.0;
            let r = b.radius(t);
            assert!(r <= previous, "radius grew at t={t}: {previous} -> {r}");
            assert!(r >= 1.0);
            previous = r;
        }
    }

    #[test]
    fn test_negative_or_nan_elapsed_is_start() {
        let b = boundary();
        assert_eq!(b.radius(-5_000.0), 2000.0);
        assert_eq!(b.radius(f64::NAN), 2000.0);
    }

    #[test]
    fn test_contains() {
        let b = boundary();
        let start = b.radius(0.0);
        assert!(b.contains(DVec2::new(2000.0, 2000.0), start));
        assert!(b.contains(DVec2::new(3999.0, 2000.0), start));
        assert!(b.contains(DVec2::new(4000.0, 2000.0), start));
        assert!(!b.contains(DVec2::new(10.0, 10.0), start));
        assert!(!b.contains(DVec2::new(2300.0, 2000.0), b.radius(180_000.0)));
    }
}
