use serde::{Deserialize, Serialize};

/// Inclusive HSV bounds (H in [0, 180), S and V in [0, 255]).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HsvRange {
    pub lower: [u8; 3],
    pub upper: [u8; 3],
}

impl HsvRange {
    pub fn contains(&self, hsv: [u8; 3]) -> bool {
        (0..3).all(|c| hsv[c] >= self.lower[c] && hsv[c] <= self.upper[c])
    }
}

impl Default for HsvRange {
    /// Saturated red.
    fn default() -> Self {
        Self {
            lower: [0, 120, 120],
            upper: [10, 255, 255],
        }
    }
}

/// Parameters for marker extraction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarkerParams {
    /// Color range handed to the segmenter.
    #[serde(default)]
    pub hsv_range: HsvRange,
    /// Regions whose bounding box covers fewer pixels are ignored.
    #[serde(default = "default_min_region_area")]
    pub min_region_area: u64,
}

fn default_min_region_area() -> u64 {
    1
}

impl Default for MarkerParams {
    fn default() -> Self {
        Self {
            hsv_range: HsvRange::default(),
            min_region_area: default_min_region_area(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_bounds_are_inclusive() {
        let r = HsvRange::default();
        assert!(r.contains([0, 120, 120]));
        assert!(r.contains([10, 255, 255]));
        assert!(!r.contains([11, 200, 200]));
        assert!(!r.contains([5, 119, 200]));
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let p: MarkerParams = serde_json::from_str(r#"{"min_region_area": 4}"#).expect("parse");
        assert_eq!(p.min_region_area, 4);
        assert_eq!(p.hsv_range, HsvRange::default());
    }
}
