use serde::Deserialize;

use crate::error::AdaptError;

/// Run-level options for the ADAPT controller.
///
/// Every recognized option is a named field; deserializing a config file with
/// an unknown key is rejected outright rather than warned about.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct AdaptConfig {
    /// Gradient threshold below which the pool is considered exhausted and
    /// the run converged.
    pub tolerance: f64,
    /// Maximum number of growth rounds before the run is cut off.
    pub max_cycles: usize,
    /// Starting value for the parameter of a newly added operator. Zero
    /// reproduces the pre-growth energy exactly.
    pub initial_parameter: f64,
    /// Report per-round gradients and energies at info level.
    pub verbose: bool,
    /// Whether the same pool operator may be selected in more than one round.
    pub allow_duplicates: bool,
    /// Worker threads for scoring the pool. 1 means sequential.
    pub ranker_workers: usize,
}

impl Default for AdaptConfig {
    fn default() -> Self {
        AdaptConfig {
            tolerance: 1e-3,
            max_cycles: 15,
            initial_parameter: 0.0,
            verbose: false,
            allow_duplicates: false,
            ranker_workers: 1,
        }
    }
}

impl AdaptConfig {
    pub fn validate(&self) -> Result<(), AdaptError> {
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(AdaptError::Config(format!(
                "tolerance must be a positive finite number, got {}",
                self.tolerance
            )));
        }
        if self.max_cycles == 0 {
            return Err(AdaptError::Config(
                "max_cycles must be at least 1".to_string(),
            ));
        }
        if !self.initial_parameter.is_finite() {
            return Err(AdaptError::Config(format!(
                "initial_parameter must be finite, got {}",
                self.initial_parameter
            )));
        }
        if self.ranker_workers == 0 {
            return Err(AdaptError::Config(
                "ranker_workers must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = AdaptConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_cycles, 15);
        assert_eq!(config.tolerance, 1e-3);
        assert!(!config.allow_duplicates);
    }

    #[test]
    fn bad_values_are_rejected() {
        let mut config = AdaptConfig {
            tolerance: -1.0,
            ..AdaptConfig::default()
        };
        assert!(config.validate().is_err());

        config.tolerance = 1e-3;
        config.max_cycles = 0;
        assert!(config.validate().is_err());

        config.max_cycles = 5;
        config.initial_parameter = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_keys_are_rejected_eagerly() {
        let err = serde_json::from_str::<AdaptConfig>(r#"{"tolerance": 0.01, "nShots": 100}"#);
        assert!(err.is_err());

        let ok: AdaptConfig = serde_json::from_str(r#"{"maxCycles": 3}"#).unwrap();
        assert_eq!(ok.max_cycles, 3);
        assert_eq!(ok.tolerance, 1e-3);
    }
}
