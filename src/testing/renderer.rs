// Recording renderer

use crate::display::{ImageStim, Renderer, Rgb, Shape, TextStim};

/// Everything drawn between two flips
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameLog {
    pub shapes: Vec<Shape>,
    pub texts: Vec<TextStim>,
    pub images: Vec<ImageStim>,
    pub background: Option<Rgb>,
}

impl FrameLog {
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty() && self.texts.is_empty() && self.images.is_empty()
    }
}

/// Renderer that keeps a log of every presented frame
///
/// `keep_frames(false)` only counts flips, which keeps long simulated runs
/// cheap.
#[derive(Debug, Clone)]
pub struct RecordingRenderer {
    current: FrameLog,
    frames: Vec<FrameLog>,
    background: Option<Rgb>,
    flips: usize,
    keep_frames: bool,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self {
            current: FrameLog::default(),
            frames: Vec::new(),
            background: None,
            flips: 0,
            keep_frames: true,
        }
    }

    pub fn keep_frames(mut self, keep: bool) -> Self {
        self.keep_frames = keep;
        self
    }

    pub fn flips(&self) -> usize {
        self.flips
    }

    pub fn frames(&self) -> &[FrameLog] {
        &self.frames
    }

    pub fn last_frame(&self) -> Option<&FrameLog> {
        self.frames.last()
    }

    /// Background colour most recently set
    pub fn background(&self) -> Option<Rgb> {
        self.background
    }
}

impl Default for RecordingRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for RecordingRenderer {
    fn draw_shape(&mut self, shape: &Shape) {
        if self.keep_frames {
            self.current.shapes.push(shape.clone());
        }
    }

    fn draw_image(&mut self, image: &ImageStim) {
        if self.keep_frames {
            self.current.images.push(image.clone());
        }
    }

    fn draw_text(&mut self, text: &TextStim) {
        if self.keep_frames {
            self.current.texts.push(text.clone());
        }
    }

    fn set_background_color(&mut self, color: Rgb) {
        self.background = Some(color);
    }

    fn flip(&mut self) {
        self.flips += 1;
        if self.keep_frames {
            let mut frame = std::mem::take(&mut self.current);
            frame.background = self.background;
            self.frames.push(frame);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_flip_closes_a_frame() {
        let mut renderer = RecordingRenderer::new();
        renderer.set_background_color(Rgb::BLACK);
        renderer.draw_shape(&Shape::filled_square((0.0, 0.0), 10.0, Rgb::WHITE));
        renderer.flip();
        renderer.flip();

        assert_eq!(renderer.flips(), 2);
        assert_eq!(renderer.frames()[0].shapes.len(), 1);
        assert!(renderer.frames()[1].is_empty());
        assert_eq!(renderer.frames()[1].background, Some(Rgb::BLACK));
    }

    #[test]
    fn test_counting_only_mode() {
        let mut renderer = RecordingRenderer::new().keep_frames(false);
        renderer.draw_text(&TextStim::new("+", (0.0, 0.0), 12.0, Rgb::BLACK));
        renderer.flip();
        assert_eq!(renderer.flips(), 1);
        assert!(renderer.frames().is_empty());
    }
}
