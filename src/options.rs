use crate::error::{Result, SkipListError};

pub const DEFAULT_PROBABILITY: f64 = 0.5;

/// Construction-time knobs of a [`SkipList`](crate::SkipList).
///
/// The number of express lanes is not here: it is the `MAX_LEVELS` const
/// parameter of the list type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Options {
    /// Chance that a node is promoted to the next express lane.
    pub probability: f64,
    /// Seed for the level generator. `None` seeds from OS entropy.
    pub seed: Option<u64>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            probability: DEFAULT_PROBABILITY,
            seed: None,
        }
    }
}

impl Options {
    pub fn with_probability(mut self, probability: f64) -> Self {
        self.probability = probability;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<()> {
        // also rejects NaN
        if self.probability > 0.0 && self.probability <= 1.0 {
            Ok(())
        } else {
            Err(SkipListError::InvalidProbability(self.probability))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let opts = Options::default();
        assert_eq!(opts.probability, DEFAULT_PROBABILITY);
        assert_eq!(opts.seed, None);
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn test_validate_probability() {
        for p in &[0.01, 0.25, 0.5, 1.0] {
            assert!(Options::default().with_probability(*p).validate().is_ok());
        }
        for p in &[0.0, -0.5, 1.01, f64::NAN] {
            let err = Options::default().with_probability(*p).validate();
            assert!(matches!(err, Err(SkipListError::InvalidProbability(_))));
        }
    }

    #[test]
    fn test_builder() {
        let opts = Options::default().with_probability(0.25).with_seed(7);
        assert_eq!(opts.probability, 0.25);
        assert_eq!(opts.seed, Some(7));
    }
}
