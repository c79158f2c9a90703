// Simulated observer

use rand::Rng;

/// Deterministic or noisy observer with a fixed contrast threshold
///
/// Answers "yes" while the presented contrast is below the threshold, so an
/// up/down staircase settles around it. `lapse_rate` flips that many answers
/// at random.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulatedObserver {
    pub threshold: f64,
    pub lapse_rate: f64,
}

impl SimulatedObserver {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            lapse_rate: 0.0,
        }
    }

    pub fn with_lapse_rate(mut self, lapse_rate: f64) -> Self {
        self.lapse_rate = lapse_rate.clamp(0.0, 1.0);
        self
    }

    pub fn respond<R: Rng + ?Sized>(&self, alpha: f64, rng: &mut R) -> bool {
        let answer = alpha < self.threshold;
        if self.lapse_rate > 0.0 && rng.gen_bool(self.lapse_rate) {
            !answer
        } else {
            answer
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_noiseless_observer_compares_with_threshold() {
        let observer = SimulatedObserver::new(0.3);
        let mut rng = StdRng::seed_from_u64(0);
        assert!(observer.respond(0.29, &mut rng));
        assert!(!observer.respond(0.3, &mut rng));
        assert!(!observer.respond(0.5, &mut rng));
    }

    #[test]
    fn test_full_lapse_inverts_answers() {
        let observer = SimulatedObserver::new(0.3).with_lapse_rate(1.0);
        let mut rng = StdRng::seed_from_u64(0);
        assert!(!observer.respond(0.1, &mut rng));
    }
}
