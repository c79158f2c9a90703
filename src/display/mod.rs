//! Display and input collaborators.
//!
//! The experiment core never talks to a windowing or graphics API directly.
//! Everything it shows is described as plain [`Visual`] values and handed to a
//! [`Renderer`]; everything it reads comes from an [`InputSource`] polled once
//! per frame.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::stimulus::GratingTexture;

pub mod scene;

pub use scene::{SceneTemplate, SquareLayout};

/// Colour in normalised `rgb1` space.
///
/// Components are nominally in `[0, 1]`, but scaled colours are allowed to
/// leave that range; clamping is the caller's decision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 3]", into = "[f64; 3]")]
pub struct Rgb {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0.0, 0.0, 0.0);
    pub const WHITE: Rgb = Rgb::new(1.0, 1.0, 1.0);

    pub const fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    /// Multiply every channel by `factor`, without clamping.
    pub fn scale(self, factor: f64) -> Self {
        Self::new(self.r * factor, self.g * factor, self.b * factor)
    }

    /// Clamp every channel into `[0, 1]`.
    pub fn clamped(self) -> Self {
        Self::new(
            self.r.clamp(0.0, 1.0),
            self.g.clamp(0.0, 1.0),
            self.b.clamp(0.0, 1.0),
        )
    }
}

impl From<[f64; 3]> for Rgb {
    fn from(value: [f64; 3]) -> Self {
        Self::new(value[0], value[1], value[2])
    }
}

impl From<Rgb> for [f64; 3] {
    fn from(value: Rgb) -> Self {
        [value.r, value.g, value.b]
    }
}

/// Screen side of a dichoptic square.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Left, Side::Right];
}

/// Pixel position relative to the screen centre.
pub type Point = (f64, f64);

/// Outline of a shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    pub color: Rgb,
    pub width: f64,
}

/// Axis-aligned rectangle.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    pub pos: Point,
    pub width: f64,
    pub height: f64,
    pub fill: Option<Rgb>,
    pub stroke: Option<Stroke>,
}

impl Shape {
    pub fn filled_square(pos: Point, size: f64, fill: Rgb) -> Self {
        Self {
            pos,
            width: size,
            height: size,
            fill: Some(fill),
            stroke: None,
        }
    }

    pub fn outlined_square(pos: Point, size: f64, stroke: Stroke) -> Self {
        Self {
            pos,
            width: size,
            height: size,
            fill: None,
            stroke: Some(stroke),
        }
    }
}

/// Text box.
#[derive(Debug, Clone, PartialEq)]
pub struct TextStim {
    pub text: String,
    pub pos: Point,
    pub letter_height: f64,
    pub color: Rgb,
    pub fill: Option<Rgb>,
}

impl TextStim {
    pub fn new(text: impl Into<String>, pos: Point, letter_height: f64, color: Rgb) -> Self {
        Self {
            text: text.into(),
            pos,
            letter_height,
            color,
            fill: None,
        }
    }

    pub fn with_fill(mut self, fill: Rgb) -> Self {
        self.fill = Some(fill);
        self
    }
}

/// One labelled curve of a [`CurvePlot`].
#[derive(Debug, Clone, PartialEq)]
pub struct CurveSeries {
    pub label: String,
    pub ys: Vec<f64>,
}

/// Line plot handed to the renderer for rasterisation.
#[derive(Debug, Clone, PartialEq)]
pub struct CurvePlot {
    pub x_label: String,
    pub y_label: String,
    pub xs: Vec<f64>,
    pub series: Vec<CurveSeries>,
}

/// Envelope applied to a grating patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mask {
    None,
    Gaussian,
}

/// Pixel content of an [`ImageStim`].
#[derive(Debug, Clone, PartialEq)]
pub enum ImageSource {
    /// Pre-rendered image prepared by an external service.
    File(PathBuf),
    /// One-cycle grating drawn with the given orientation and envelope.
    Grating {
        texture: Arc<GratingTexture>,
        orientation_deg: f64,
        cycles: f64,
        mask: Mask,
    },
    /// Data plot, e.g. the calibration fit shown for approval.
    Plot(CurvePlot),
}

/// Image patch.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageStim {
    pub pos: Point,
    pub size: (f64, f64),
    pub source: ImageSource,
}

/// Anything the core can ask a renderer to draw.
#[derive(Debug, Clone, PartialEq)]
pub enum Visual {
    Shape(Shape),
    Text(TextStim),
    Image(ImageStim),
}

impl Visual {
    pub fn draw(&self, renderer: &mut dyn Renderer) {
        match self {
            Visual::Shape(shape) => renderer.draw_shape(shape),
            Visual::Text(text) => renderer.draw_text(text),
            Visual::Image(image) => renderer.draw_image(image),
        }
    }
}

impl From<Shape> for Visual {
    fn from(value: Shape) -> Self {
        Visual::Shape(value)
    }
}

impl From<TextStim> for Visual {
    fn from(value: TextStim) -> Self {
        Visual::Text(value)
    }
}

impl From<ImageStim> for Visual {
    fn from(value: ImageStim) -> Self {
        Visual::Image(value)
    }
}

/// Display backend.
///
/// `flip` presents the back buffer and blocks until the next vertical
/// refresh; one call is one frame.
pub trait Renderer {
    fn draw_shape(&mut self, shape: &Shape);
    fn draw_image(&mut self, image: &ImageStim);
    fn draw_text(&mut self, text: &TextStim);
    fn set_background_color(&mut self, color: Rgb);
    fn flip(&mut self);
}

/// Keyboard/button backend.
///
/// `poll_pressed_keys` returns the buttons pressed since the previous poll,
/// in press order. No debouncing is performed by the core.
pub trait InputSource {
    fn poll_pressed_keys(&mut self) -> Vec<String>;

    /// Discard anything pressed before a new phase starts.
    fn clear(&mut self) {
        let _ = self.poll_pressed_keys();
    }
}

/// First key of `pressed` that belongs to `accepted`, in press order.
pub fn first_matching<'a>(pressed: &'a [String], accepted: &[String]) -> Option<&'a String> {
    pressed.iter().find(|key| accepted.contains(key))
}

/// Draw every visual in order.
pub fn draw_all<'a>(renderer: &mut dyn Renderer, visuals: impl IntoIterator<Item = &'a Visual>) {
    for visual in visuals {
        visual.draw(renderer);
    }
}
