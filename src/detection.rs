use geo_types::{coord, Rect};

use crate::utils::round_to;

/// One object reported by a detector, in pixel coordinates of the source image.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub bbox: Rect<f32>,
    pub label: String,
    pub confidence: f32,
}

impl Detection {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32, label: &str, confidence: f32) -> Self {
        // Rect::new orders the corners, so min <= max holds on both axes.
        let bbox = Rect::new(coord! { x: x1, y: y1 }, coord! { x: x2, y: y2 });

        Self {
            bbox,
            label: label.to_string(),
            confidence,
        }
    }

    /// Box as `[x1, y1, x2, y2]`.
    pub fn corners(&self) -> [f32; 4] {
        let (min, max) = (self.bbox.min(), self.bbox.max());
        [min.x, min.y, max.x, max.y]
    }

    /// Confidence as printed in the run log and summary.
    pub fn rounded_confidence(&self) -> f64 {
        round_to(self.confidence, 3)
    }

    /// Confidence percentage as printed on the annotated image.
    pub fn confidence_percent(&self) -> f64 {
        round_to(self.confidence * 100.0, 1)
    }

    /// `"{label} ({confidence})"`, the form used in the detailed results.
    pub fn short_description(&self) -> String {
        format!("{} ({:.3})", self.label, self.rounded_confidence())
    }

    /// `"[x1, y1, x2, y2]"` with two decimals per coordinate.
    pub fn location(&self) -> String {
        let [x1, y1, x2, y2] = self.corners().map(|c| round_to(c, 2));
        format!("[{x1:.2}, {y1:.2}, {x2:.2}, {y2:.2}]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corners_are_normalised() {
        let det = Detection::new(40.0, 30.0, 10.0, 5.0, "cat", 0.95);
        assert_eq!(det.corners(), [10.0, 5.0, 40.0, 30.0]);
    }

    #[test]
    fn formats_with_fixed_precision() {
        let det = Detection::new(12.3456, 7.0, 100.004, 50.5, "dog", 0.95);
        assert_eq!(det.short_description(), "dog (0.950)");
        assert_eq!(det.location(), "[12.35, 7.00, 100.00, 50.50]");
    }

    #[test]
    fn percent_has_one_decimal() {
        let det = Detection::new(0.0, 0.0, 1.0, 1.0, "bird", 0.9987);
        assert_eq!(det.confidence_percent(), 99.9);
        assert_eq!(format!("{:.1}", det.confidence_percent()), "99.9");
    }
}
