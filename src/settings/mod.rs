//! The `confx.toml` settings file of the `confx` binary: where the project
//! lives, where artifacts and logs go, and which images the `Dockerfile` uses.
//!
//! Every table and key is optional. Level filters are validated as they are
//! deserialized; the project root is checked and canonicalized afterwards,
//! and only then are `{PROJECT_ROOT}` / `{OUTPUT_DIRECTORY}` placeholders expanded.

use std::{
    fs,
    path::{Path, PathBuf},
};

use miette::{miette, Context, IntoDiagnostic, Result};
use serde::Deserialize;

use self::paths::PathsTable;
use self::utilities::get_default_settings_file_path;
use crate::artifacts::DockerConfig;

mod logging;
mod paths;
mod utilities;

pub use self::logging::{LevelFilterDirectives, LoggingSettings};
pub use self::paths::PathsSettings;
pub use self::utilities::DEFAULT_SETTINGS_FILE_NAME;


#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct SettingsFile {
    paths: PathsTable,
    logging: LoggingSettings,
    docker: DockerConfig,
}


#[derive(Debug, Clone)]
pub struct Settings {
    /// The file these settings were loaded from, `None` for built-in settings.
    pub file_path: Option<PathBuf>,

    pub paths: PathsSettings,

    pub logging: LoggingSettings,

    /// The `[docker]` table, image defaults not yet applied.
    pub docker: DockerConfig,
}

impl Settings {
    /// Load the settings from a specific file path. The file must exist.
    pub fn load_from_path<S: AsRef<Path>>(settings_file_path: S) -> Result<Self> {
        let settings_file_path = settings_file_path.as_ref();

        let settings_string = fs::read_to_string(settings_file_path)
            .into_diagnostic()
            .wrap_err_with(|| {
                miette!(
                    "Could not read settings file at {}.",
                    settings_file_path.display()
                )
            })?;

        let settings_file = toml::from_str::<SettingsFile>(&settings_string)
            .into_diagnostic()
            .wrap_err("Could not parse settings file!")?;

        let settings_file_path = dunce::canonicalize(settings_file_path)
            .into_diagnostic()
            .wrap_err("Could not canonicalize settings file path!")?;

        Self::from_file(settings_file, Some(settings_file_path))
    }

    /// Load the settings from the default path (`./confx.toml`),
    /// falling back to built-in settings if there is no such file.
    pub fn load_from_default_path() -> Result<Self> {
        let settings_file_path = get_default_settings_file_path()
            .wrap_err("Could not determine the default settings file path.")?;

        if settings_file_path.is_file() {
            Settings::load_from_path(settings_file_path)
        } else {
            Settings::builtin()
        }
    }

    /// Built-in settings, relative to the current directory.
    pub fn builtin() -> Result<Self> {
        Self::from_file(SettingsFile::default(), None)
    }

    fn from_file(settings_file: SettingsFile, file_path: Option<PathBuf>) -> Result<Self> {
        let paths = PathsSettings::from_table(settings_file.paths)
            .wrap_err("Invalid [paths] table.")?;

        let mut logging = settings_file.logging;
        logging.log_file_output_directory = paths.expand(&logging.log_file_output_directory);

        Ok(Self {
            file_path,
            paths,
            logging,
            docker: settings_file.docker,
        })
    }
}
