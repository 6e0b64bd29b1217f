//! Plain visualization markers for the scan graph.
//!
//! Markers carry only geometry and style; they serialize to JSON for any
//! external viewer.

use serde::{Deserialize, Serialize};

use crate::core::types::Point2D;

/// RGBA color with components in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const RED: Color = Color::rgb(1.0, 0.0, 0.0);
    pub const GREEN: Color = Color::rgb(0.0, 1.0, 0.0);
    pub const BLUE: Color = Color::rgb(0.0, 0.0, 1.0);

    /// Opaque color.
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }
}

/// Marker geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    /// Sphere centered on `position`.
    Sphere,
    /// Polyline through `points`.
    LineStrip,
}

/// A single marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    /// Namespace; ids are unique within it.
    pub ns: String,
    pub id: usize,
    pub kind: MarkerKind,
    /// Sphere center (unused by line strips).
    pub position: Point2D,
    /// Line strip vertices (empty for spheres).
    pub points: Vec<Point2D>,
    /// Sphere diameter or line width in meters.
    pub scale: f64,
    pub color: Color,
}

impl Marker {
    /// Sphere marker.
    pub fn sphere(ns: &str, id: usize, position: Point2D, scale: f64, color: Color) -> Self {
        Self {
            ns: ns.to_string(),
            id,
            kind: MarkerKind::Sphere,
            position,
            points: Vec::new(),
            scale,
            color,
        }
    }

    /// Two-point line strip.
    pub fn line(ns: &str, id: usize, from: Point2D, to: Point2D, scale: f64, color: Color) -> Self {
        Self {
            ns: ns.to_string(),
            id,
            kind: MarkerKind::LineStrip,
            position: Point2D::default(),
            points: vec![from, to],
            scale,
            color,
        }
    }
}

/// Collection of markers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarkerArray {
    pub markers: Vec<Marker>,
}

impl MarkerArray {
    /// Number of markers.
    pub fn len(&self) -> usize {
        self.markers.len()
    }

    /// Check if there are no markers.
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Markers in namespace `ns`.
    pub fn in_namespace<'a>(&'a self, ns: &'a str) -> impl Iterator<Item = &'a Marker> + 'a {
        self.markers.iter().filter(move |m| m.ns == ns)
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_shape() {
        let array = MarkerArray {
            markers: vec![Marker::sphere("nodes", 3, Point2D::new(1.0, 2.0), 0.1, Color::RED)],
        };

        let json = array.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        let marker = &value["markers"][0];
        assert_eq!(marker["ns"], "nodes");
        assert_eq!(marker["id"], 3);
        assert_eq!(marker["kind"], "sphere");
        assert_eq!(marker["position"]["x"], 1.0);
        assert_eq!(marker["color"]["r"], 1.0);
    }
}
