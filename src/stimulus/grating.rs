// Grating texture generation
//
// One-row sinusoidal texture spanning a single cycle. The renderer tiles it
// to the requested number of cycles and applies orientation and mask.

use std::f64::consts::PI;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::display::Rgb;
use crate::error::ConfigError;

/// Largest accepted texture resolution
pub const MAX_RESOLUTION: usize = 512;

/// Single-cycle colour grating between two colours
#[derive(Debug, Clone, PartialEq)]
pub struct GratingTexture {
    pixels: Vec<Rgb>,
}

impl GratingTexture {
    /// Build a grating whose red and green channels oscillate between the
    /// channel values of `color_a` and `color_b`.
    ///
    /// The two channels use opposite-phase waves; which channel gets which
    /// phase is drawn from `rng`. Blue is always zero.
    pub fn generate<R: Rng + ?Sized>(
        resolution: usize,
        color_a: Rgb,
        color_b: Rgb,
        rng: &mut R,
    ) -> Result<Self, ConfigError> {
        if resolution == 0 || !resolution.is_power_of_two() || resolution > MAX_RESOLUTION {
            return Err(ConfigError::invalid_parameter(
                "grating_resolution",
                resolution,
            ));
        }

        let rising = sine_wave(resolution, false);
        let falling = sine_wave(resolution, true);
        let mut waves = [rising, falling];
        waves.shuffle(rng);
        let [red_wave, green_wave] = waves;

        let red = ChannelSpan::new(color_a.r, color_b.r);
        let green = ChannelSpan::new(color_a.g, color_b.g);

        let pixels = red_wave
            .iter()
            .zip(green_wave.iter())
            .map(|(&r, &g)| Rgb::new(red.at(r), green.at(g), 0.0))
            .collect();

        Ok(Self { pixels })
    }

    pub fn resolution(&self) -> usize {
        self.pixels.len()
    }

    pub fn pixels(&self) -> &[Rgb] {
        &self.pixels
    }
}

#[derive(Debug, Clone, Copy)]
struct ChannelSpan {
    min: f64,
    range: f64,
}

impl ChannelSpan {
    fn new(a: f64, b: f64) -> Self {
        Self {
            min: a.min(b),
            range: (a - b).abs(),
        }
    }

    fn at(self, wave: f64) -> f64 {
        wave * self.range + self.min
    }
}

/// Sine over `[-pi, pi]` (or reversed) rescaled into `[0, 1]`
fn sine_wave(resolution: usize, reversed: bool) -> Vec<f64> {
    let last = (resolution.max(2) - 1) as f64;
    (0..resolution)
        .map(|i| {
            let t = if resolution == 1 { 0.0 } else { i as f64 / last };
            let x = if reversed {
                PI - 2.0 * PI * t
            } else {
                -PI + 2.0 * PI * t
            };
            (x.sin() + 1.0) / 2.0
        })
        .collect()
}
