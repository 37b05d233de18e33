//! Geometric value types: bounding boxes and points.

use serde::{Deserialize, Serialize};

/// An axis-aligned bounding box with optional label and detection score.
///
/// Coordinates are stored in corner form (x1,y1)-(x2,y2). The record is
/// immutable after construction; derived accessors are pure functions of
/// the stored fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Detection probability in [0, 1].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probability: Option<f64>,
}

impl BoundingBox {
    /// Create a bounding box from corner coordinates.
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self {
            x1,
            y1,
            x2,
            y2,
            label: None,
            probability: None,
        }
    }

    /// Create a bounding box from center coordinates and extent.
    pub fn from_center(cx: f64, cy: f64, width: f64, height: f64) -> Self {
        Self::new(
            cx - width / 2.0,
            cy - height / 2.0,
            cx + width / 2.0,
            cy + height / 2.0,
        )
    }

    /// Set the label.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the detection probability.
    pub fn probability(mut self, probability: f64) -> Self {
        self.probability = Some(probability);
        self
    }

    pub fn cx(&self) -> f64 {
        (self.x1 + self.x2) / 2.0
    }

    pub fn cy(&self) -> f64 {
        (self.y1 + self.y2) / 2.0
    }

    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }
}

/// A 2-D point with optional label and score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probability: Option<f64>,
}

impl Point {
    /// Create a point.
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            label: None,
            probability: None,
        }
    }

    /// Set the label.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the probability.
    pub fn probability(mut self, probability: f64) -> Self {
        self.probability = Some(probability);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_accessors() {
        let bbox = BoundingBox::new(1.0, 2.0, 4.0, 6.0);

        assert_eq!(bbox.width(), 3.0);
        assert_eq!(bbox.height(), 4.0);
        assert_eq!(bbox.cx(), 2.5);
        assert_eq!(bbox.cy(), 4.0);
    }

    #[test]
    fn test_from_center() {
        let bbox = BoundingBox::from_center(2.5, 4.0, 3.0, 4.0);

        assert_eq!(bbox, BoundingBox::new(1.0, 2.0, 4.0, 6.0));
    }

    #[test]
    fn test_builder_fields() {
        let bbox = BoundingBox::new(0.0, 0.0, 1.0, 1.0)
            .label("cat")
            .probability(0.9);

        assert_eq!(bbox.label.as_deref(), Some("cat"));
        assert_eq!(bbox.probability, Some(0.9));
    }

    #[test]
    fn test_point_json_roundtrip() {
        let point = Point::new(1.0, 2.0).label("foo").probability(0.5);

        let json = serde_json::to_string(&point).unwrap();
        let parsed: Point = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed, point);
    }

    #[test]
    fn test_optional_fields_omitted() {
        let json = serde_json::to_string(&Point::new(1.0, 2.0)).unwrap();

        assert!(!json.contains("label"));
        assert!(!json.contains("probability"));
    }
}
