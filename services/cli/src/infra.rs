use metrics_exporter_prometheus::PrometheusHandle;
use reimburse::config::{ConfigError, ModelSource};
use reimburse::error::AppError;
use reimburse::model::{Preset, Scorer};
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) scorer: Arc<Scorer>,
    pub(crate) model: Arc<str>,
}

/// Picks the model source: `--model`, then `--preset`, then `fallback`.
///
/// `fallback` runs only when neither flag is given.
pub(crate) fn resolve_source<F>(
    preset: Option<Preset>,
    model: Option<PathBuf>,
    fallback: F,
) -> Result<ModelSource, ConfigError>
where
    F: FnOnce() -> Result<ModelSource, ConfigError>,
{
    match (model, preset) {
        (Some(path), _) => Ok(ModelSource::Artifact(path)),
        (None, Some(preset)) => Ok(ModelSource::Preset(preset)),
        (None, None) => fallback(),
    }
}

pub(crate) fn build_scorer(source: &ModelSource) -> Result<Scorer, AppError> {
    let config = source.load()?;
    debug!(model = %source.label(), variant = config.variant_name(), "model loaded");
    Ok(Scorer::new(config)?)
}

pub(crate) fn parse_preset(raw: &str) -> Result<Preset, String> {
    raw.parse::<Preset>().map_err(|err| err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reimburse::model::UnknownPreset;

    fn broken_environment() -> Result<ModelSource, ConfigError> {
        Err(ConfigError::InvalidPreset {
            source: "nope".parse::<Preset>().expect_err("unknown preset"),
        })
    }

    #[test]
    fn flags_override_environment_source() {
        let from_env = || Ok(ModelSource::Preset(Preset::Phase2));
        assert_eq!(
            resolve_source(None, None, from_env).expect("source resolves"),
            ModelSource::Preset(Preset::Phase2)
        );
        assert_eq!(
            resolve_source(Some(Preset::Enhanced), None, from_env).expect("source resolves"),
            ModelSource::Preset(Preset::Enhanced)
        );
        assert_eq!(
            resolve_source(Some(Preset::Enhanced), Some(PathBuf::from("m.json")), from_env)
                .expect("source resolves"),
            ModelSource::Artifact(PathBuf::from("m.json"))
        );
    }

    #[test]
    fn explicit_flags_never_read_the_environment() {
        assert_eq!(
            resolve_source(Some(Preset::Base), None, broken_environment).expect("flag wins"),
            ModelSource::Preset(Preset::Base)
        );
        assert_eq!(
            resolve_source(None, Some(PathBuf::from("m.json")), broken_environment)
                .expect("flag wins"),
            ModelSource::Artifact(PathBuf::from("m.json"))
        );
        let err: UnknownPreset = match resolve_source(None, None, broken_environment) {
            Err(ConfigError::InvalidPreset { source }) => source,
            other => panic!("expected the environment error, got {other:?}"),
        };
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn preset_parser_reports_choices() {
        assert_eq!(parse_preset("edge-case"), Ok(Preset::EdgeCase));
        let err = parse_preset("nope").expect_err("unknown preset");
        assert!(err.contains("expected one of"));
    }
}
