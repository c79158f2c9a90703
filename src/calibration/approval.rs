// Calibration approval screen
//
// After each sweep the raw betas and the fitted curve are shown to the
// experimenter, who either approves the calibration or asks for a repeat.

use std::collections::BTreeMap;

use crate::calibration::polynomial::Polynomial;
use crate::config::{ContrastConfig, KeysConfig};
use crate::display::{
    CurvePlot, CurveSeries, ImageSource, ImageStim, InputSource, Renderer, Rgb, TextStim, Visual,
};

/// Experimenter decision on a fitted calibration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Judgement {
    Approved,
    Rejected,
}

/// Data shown for approval
#[derive(Debug, Clone, PartialEq)]
pub struct FitReview {
    pub alphas: Vec<f64>,
    pub raw_betas: Vec<f64>,
    pub fitted_betas: Vec<f64>,
    pub polynomial: Polynomial,
}

impl FitReview {
    /// Pair every level with its nominal alpha, ordered by level
    pub fn new(raw: &BTreeMap<usize, f64>, contrast: &ContrastConfig, polynomial: Polynomial) -> Self {
        let alphas: Vec<f64> = raw.keys().map(|&level| contrast.alpha_for_level(level)).collect();
        let raw_betas: Vec<f64> = raw.values().copied().collect();
        let fitted_betas = alphas.iter().map(|&alpha| polynomial.evaluate(alpha)).collect();
        Self {
            alphas,
            raw_betas,
            fitted_betas,
            polynomial,
        }
    }

    pub fn plot(&self) -> CurvePlot {
        CurvePlot {
            x_label: "Alpha".to_string(),
            y_label: "Beta".to_string(),
            xs: self.alphas.clone(),
            series: vec![
                CurveSeries {
                    label: "Calibration Data".to_string(),
                    ys: self.raw_betas.clone(),
                },
                CurveSeries {
                    label: "Polynomial Fit".to_string(),
                    ys: self.fitted_betas.clone(),
                },
            ],
        }
    }

    fn visuals(&self, keys: &KeysConfig) -> Vec<Visual> {
        vec![
            Visual::Image(ImageStim {
                pos: (0.0, 100.0),
                size: (640.0, 480.0),
                source: ImageSource::Plot(self.plot()),
            }),
            Visual::Text(TextStim::new(
                "Please, wait for the experimenter to continue",
                (0.0, -200.0),
                24.0,
                Rgb::WHITE,
            )),
            Visual::Text(
                TextStim::new(
                    format!("Approve Calibration [{}]", keys.approve),
                    (-200.0, -300.0),
                    20.0,
                    Rgb::BLACK,
                )
                .with_fill(Rgb::WHITE),
            ),
            Visual::Text(
                TextStim::new(
                    format!("Repeat Calibration [{}]", keys.reject),
                    (200.0, -300.0),
                    20.0,
                    Rgb::BLACK,
                )
                .with_fill(Rgb::WHITE),
            ),
        ]
    }
}

/// Show the fit and block until approve or reject is pressed
///
/// The first decision key in press order wins.
pub fn request_approval(
    review: &FitReview,
    keys: &KeysConfig,
    renderer: &mut dyn Renderer,
    input: &mut dyn InputSource,
) -> Judgement {
    let visuals = review.visuals(keys);
    let accepted = [keys.approve.clone(), keys.reject.clone()];

    input.clear();
    loop {
        for visual in &visuals {
            visual.draw(renderer);
        }
        renderer.flip();

        let pressed = input.poll_pressed_keys();
        if let Some(key) = crate::display::first_matching(&pressed, &accepted) {
            let judgement = if *key == keys.approve {
                Judgement::Approved
            } else {
                Judgement::Rejected
            };
            log::info!("[CalibrationApproval] Experimenter judgement: {:?}", judgement);
            return judgement;
        }
    }
}
