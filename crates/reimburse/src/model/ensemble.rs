use super::params::{ModelConfig, ModelConfigError};
use serde::{Deserialize, Serialize};

const WEIGHT_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleMember {
    pub weight: f64,
    pub config: ModelConfig,
}

/// Fixed-weight blend of several single-model configurations.
///
/// Each member is scored to its own clamped, rounded amount; the weighted
/// sum is then clamped and rounded again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleConfig {
    pub members: Vec<EnsembleMember>,
}

impl EnsembleConfig {
    pub fn new(members: Vec<EnsembleMember>) -> Result<Self, ModelConfigError> {
        let ensemble = Self { members };
        ensemble.validate()?;
        Ok(ensemble)
    }

    pub(crate) fn validate(&self) -> Result<(), ModelConfigError> {
        if self.members.is_empty() {
            return Err(ModelConfigError::EmptyEnsemble);
        }

        let mut sum = 0.0;
        for (index, member) in self.members.iter().enumerate() {
            if matches!(member.config, ModelConfig::Ensemble(_)) {
                return Err(ModelConfigError::NestedEnsemble { index });
            }
            if !member.weight.is_finite() || member.weight < 0.0 {
                return Err(ModelConfigError::InvalidEnsembleWeight {
                    index,
                    weight: member.weight,
                });
            }
            member.config.validate()?;
            sum += member.weight;
        }

        if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(ModelConfigError::EnsembleWeightsSum { sum });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::presets::Preset;

    fn member(weight: f64, preset: Preset) -> EnsembleMember {
        EnsembleMember {
            weight,
            config: preset.config(),
        }
    }

    #[test]
    fn accepts_weights_summing_to_one() {
        let ensemble = EnsembleConfig::new(vec![
            member(0.7, Preset::Base),
            member(0.3, Preset::Enhanced),
        ])
        .expect("valid ensemble");
        assert_eq!(ensemble.members.len(), 2);
    }

    #[test]
    fn rejects_weights_off_unity() {
        let result = EnsembleConfig::new(vec![
            member(0.7, Preset::Base),
            member(0.2, Preset::Enhanced),
        ]);
        assert!(matches!(
            result,
            Err(ModelConfigError::EnsembleWeightsSum { .. })
        ));
    }

    #[test]
    fn rejects_negative_weight_and_nesting() {
        assert!(matches!(
            EnsembleConfig::new(vec![member(1.5, Preset::Base), member(-0.5, Preset::Base)]),
            Err(ModelConfigError::InvalidEnsembleWeight { index: 1, .. })
        ));
        assert!(matches!(
            EnsembleConfig::new(vec![member(1.0, Preset::Ensemble)]),
            Err(ModelConfigError::NestedEnsemble { index: 0 })
        ));
        assert_eq!(
            EnsembleConfig::new(Vec::new()),
            Err(ModelConfigError::EmptyEnsemble)
        );
    }
}
