//! Physical measurements of stock items and parcels.

use serde::{Deserialize, Serialize};

/// Outer dimensions of a unit, in centimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub height_cm: f64,
    pub width_cm: f64,
    pub depth_cm: f64,
}

impl Dimensions {
    pub fn new(height_cm: f64, width_cm: f64, depth_cm: f64) -> Self {
        Self {
            height_cm,
            width_cm,
            depth_cm,
        }
    }

    /// Returns the sides ordered longest first.
    pub fn sorted_sides(&self) -> [f64; 3] {
        let mut sides = [self.height_cm, self.width_cm, self.depth_cm];
        sides.sort_by(|a, b| b.total_cmp(a));
        sides
    }

    pub fn longest_side(&self) -> f64 {
        self.sorted_sides()[0]
    }

    pub fn sum_of_sides(&self) -> f64 {
        self.height_cm + self.width_cm + self.depth_cm
    }

    /// True when every side is a finite, non-negative number.
    pub fn is_valid(&self) -> bool {
        [self.height_cm, self.width_cm, self.depth_cm]
            .iter()
            .all(|s| s.is_finite() && *s >= 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorted_sides_longest_first() {
        let dims = Dimensions::new(10.0, 40.0, 25.0);
        assert_eq!(dims.sorted_sides(), [40.0, 25.0, 10.0]);
        assert_eq!(dims.longest_side(), 40.0);
        assert_eq!(dims.sum_of_sides(), 75.0);
    }

    #[test]
    fn rejects_negative_or_nan_sides() {
        assert!(!Dimensions::new(-1.0, 1.0, 1.0).is_valid());
        assert!(!Dimensions::new(f64::NAN, 1.0, 1.0).is_valid());
        assert!(Dimensions::new(0.0, 1.0, 1.0).is_valid());
    }
}
