use super::params::{ModelConfig, ModelConfigError};
use crate::optimizer::Objective;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// A configuration handed from an optimization run to later scoring runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub name: String,
    pub generated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objective: Option<Objective>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    pub config: ModelConfig,
}

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("failed to access model artifact: {0}")]
    Io(#[from] std::io::Error),
    #[error("model artifact is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("model artifact holds an unusable configuration: {0}")]
    Invalid(#[from] ModelConfigError),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ArtifactFile {
    Artifact(ModelArtifact),
    Bare(ModelConfig),
}

impl ModelArtifact {
    pub fn new(name: impl Into<String>, config: ModelConfig) -> Self {
        Self {
            name: name.into(),
            generated_at: Utc::now(),
            objective: None,
            score: None,
            config,
        }
    }

    pub fn with_score(mut self, objective: Objective, score: f64) -> Self {
        self.objective = Some(objective);
        self.score = Some(score);
        self
    }

    pub fn to_json(&self) -> Result<String, ArtifactError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parses either a full artifact or a bare configuration, then validates it.
    pub fn from_json(raw: &str, fallback_name: &str) -> Result<Self, ArtifactError> {
        let artifact = match serde_json::from_str::<ArtifactFile>(raw) {
            Ok(ArtifactFile::Artifact(artifact)) => artifact,
            Ok(ArtifactFile::Bare(config)) => Self::new(fallback_name, config),
            // Re-parse as a bare config so the error names the real problem.
            Err(_) => Self::new(fallback_name, serde_json::from_str::<ModelConfig>(raw)?),
        };
        artifact.config.validate()?;
        Ok(artifact)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ArtifactError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ArtifactError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)?;
        let fallback = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("model");
        Self::from_json(&raw, fallback)
    }
}
