//! Shared background scene for dichoptic trials.
//!
//! Every dichoptic trial shows the same two square frames with a fixation
//! cross in each. The template is built once per session and shared
//! read-only between trials.

use std::sync::Arc;

use crate::config::{ScreenConfig, VisualConfig};

use super::{Point, Renderer, Shape, Side, Stroke, TextStim, Visual};

/// Pixel geometry of the two dichoptic squares.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SquareLayout {
    pub left: Point,
    pub right: Point,
    pub square_size: f64,
}

impl SquareLayout {
    pub fn from_config(screen: &ScreenConfig, visual: &VisualConfig) -> Self {
        let px_per_deg = screen.px_per_deg();
        let square_size = visual.square_size_deg * px_per_deg;
        let inter_square_distance = visual.inter_square_distance_deg * px_per_deg;
        let offset = (inter_square_distance / 2.0 + square_size / 2.0).trunc();
        Self {
            left: (-offset, 0.0),
            right: (offset, 0.0),
            square_size,
        }
    }

    pub fn center(&self, side: Side) -> Point {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    /// Anchor a quarter square above (positive) or below (negative) the centre.
    pub fn lining(&self, side: Side, upper: bool) -> Point {
        let (x, y) = self.center(side);
        let shift = (self.square_size / 4.0).trunc();
        if upper {
            (x, y + shift)
        } else {
            (x, y - shift)
        }
    }
}

/// Immutable frame/fixation elements drawn under every dichoptic trial.
#[derive(Debug, Clone)]
pub struct SceneTemplate {
    elements: Arc<[Visual]>,
}

impl SceneTemplate {
    /// Square frames and fixation crosses for both sides.
    pub fn dichoptic(layout: &SquareLayout, screen: &ScreenConfig, visual: &VisualConfig) -> Self {
        let px_per_deg = screen.px_per_deg();
        let stroke = Stroke {
            color: visual.frame_rgb1,
            width: visual.square_size_deg * 0.01 * visual.frame_thickness_percent * px_per_deg,
        };
        let cross_height = (visual.fixation_cross_size_deg * px_per_deg).trunc();

        let mut elements = Vec::with_capacity(4);
        for side in Side::BOTH {
            let pos = layout.center(side);
            elements.push(Visual::Shape(Shape::outlined_square(
                pos,
                layout.square_size,
                stroke,
            )));
            elements.push(Visual::Text(TextStim::new(
                "+",
                pos,
                cross_height,
                visual.frame_rgb1,
            )));
        }

        Self {
            elements: elements.into(),
        }
    }

    /// Template with nothing in it, for full-screen calibration displays.
    pub fn empty() -> Self {
        Self {
            elements: Vec::new().into(),
        }
    }

    pub fn elements(&self) -> &[Visual] {
        &self.elements
    }

    pub fn draw(&self, renderer: &mut dyn Renderer) {
        super::draw_all(renderer, self.elements.iter());
    }
}
