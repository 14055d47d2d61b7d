use crate::experiment::ExperimentConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "https://en.wikipedia.org";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Interface strings shown inside popups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Messages {
    pub footnote: String,
    pub jump_to_reference: String,
    pub no_preview: String,
    pub go_to_page: String,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            footnote: "Footnote".to_string(),
            jump_to_reference: "Jump to reference".to_string(),
            no_preview: "There was an issue displaying this preview.".to_string(),
            go_to_page: "Go to this page".to_string(),
        }
    }
}

/// Settings loaded from a `popups.toml` file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PopupsConfig {
    /// Wiki that bare page titles resolve against.
    pub base_url: String,
    /// A/B test definition; `None` means no experiment is running.
    pub experiment: Option<ExperimentConfig>,
    pub beta_feature_enabled: bool,
    pub messages: Messages,
    /// JSON-lines file receiving pageview events.
    pub pageview_log: Option<PathBuf>,
}

impl Default for PopupsConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            experiment: None,
            beta_feature_enabled: false,
            messages: Messages::default(),
            pageview_log: None,
        }
    }
}

impl PopupsConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let data = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&data)?;
        tracing::debug!(path = %path.display(), "loaded popups config");
        Ok(config)
    }

    pub fn from_toml_str(data: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_file_yields_defaults() {
        let cfg = PopupsConfig::from_toml_str("").unwrap();
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
        assert!(cfg.experiment.is_none());
        assert!(!cfg.beta_feature_enabled);
        assert_eq!(cfg.messages, Messages::default());
        assert!(cfg.pageview_log.is_none());
    }

    #[test]
    fn experiment_section_keeps_bucket_order() {
        let toml = r#"
            beta_feature_enabled = true

            [experiment]
            name = "Popups A/B Test - May, 2016"
            enabled = true

            [[experiment.buckets]]
            name = "control"
            weight = 0.5

            [[experiment.buckets]]
            name = "A"
            weight = 0.5
        "#;
        let cfg = PopupsConfig::from_toml_str(toml).unwrap();
        assert!(cfg.beta_feature_enabled);
        let experiment = cfg.experiment.unwrap();
        assert_eq!(experiment.name, "Popups A/B Test - May, 2016");
        assert!(experiment.enabled);
        let names: Vec<_> = experiment.buckets.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, ["control", "A"]);
    }

    #[test]
    fn partial_messages_fill_in_defaults() {
        let toml = r#"
            [messages]
            footnote = "Fußnote"
        "#;
        let cfg = PopupsConfig::from_toml_str(toml).unwrap();
        assert_eq!(cfg.messages.footnote, "Fußnote");
        assert_eq!(cfg.messages.go_to_page, "Go to this page");
    }

    #[test]
    fn invalid_toml_is_a_parse_error() {
        let err = PopupsConfig::from_toml_str("base_url = [").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn load_reads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "base_url = \"https://de.wikipedia.org\"").unwrap();
        writeln!(file, "pageview_log = \"/tmp/pageviews.jsonl\"").unwrap();
        let cfg = PopupsConfig::load(file.path()).unwrap();
        assert_eq!(cfg.base_url, "https://de.wikipedia.org");
        assert_eq!(cfg.pageview_log, Some(PathBuf::from("/tmp/pageviews.jsonl")));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = PopupsConfig::load(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
