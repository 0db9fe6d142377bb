use std::path::PathBuf;

use serde::Deserialize;
use tracing_subscriber::{filter::ParseError, EnvFilter};


/// `EnvFilter` directives such as `info` or `confx=debug,warn`.
///
/// Only valid directives can be deserialized, so building the filter later cannot fail.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(try_from = "String")]
pub struct LevelFilterDirectives(String);

impl LevelFilterDirectives {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn to_env_filter(&self) -> EnvFilter {
        EnvFilter::builder().parse_lossy(&self.0)
    }
}

impl TryFrom<String> for LevelFilterDirectives {
    type Error = ParseError;

    fn try_from(directives: String) -> Result<Self, Self::Error> {
        EnvFilter::try_new(&directives)?;
        Ok(Self(directives))
    }
}


/// The `[logging]` table.
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct LoggingSettings {
    pub console_output_level_filter: LevelFilterDirectives,

    pub log_file_output_level_filter: LevelFilterDirectives,

    /// `{PROJECT_ROOT}` and `{OUTPUT_DIRECTORY}` are expanded when the settings are loaded.
    pub log_file_output_directory: PathBuf,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            console_output_level_filter: LevelFilterDirectives("info".to_string()),
            log_file_output_level_filter: LevelFilterDirectives("debug".to_string()),
            log_file_output_directory: PathBuf::from("{PROJECT_ROOT}/logs"),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn built_in_directives_are_valid() {
        let defaults = LoggingSettings::default();

        for directives in [
            defaults.console_output_level_filter,
            defaults.log_file_output_level_filter,
        ] {
            assert!(LevelFilterDirectives::try_from(directives.as_str().to_string()).is_ok());
        }
    }

    #[test]
    fn invalid_directives_fail_deserialization() {
        assert!(
            toml::from_str::<LoggingSettings>("console_output_level_filter = \"confx=loud\"")
                .is_err()
        );

        let logging = toml::from_str::<LoggingSettings>(
            "log_file_output_level_filter = \"confx=trace,warn\"",
        )
        .unwrap();
        assert_eq!(logging.log_file_output_level_filter.as_str(), "confx=trace,warn");
        assert_eq!(logging.console_output_level_filter.as_str(), "info");
    }
}
