use std::{
    env::current_dir,
    path::{Path, PathBuf},
};

use miette::{miette, Context, IntoDiagnostic, Result};


/// Name of the settings file looked up in the current directory.
pub const DEFAULT_SETTINGS_FILE_NAME: &str = "confx.toml";


/// Returns the default settings filepath, which is at
/// `{current directory}/confx.toml`. The file does not have to exist.
pub fn get_default_settings_file_path() -> Result<PathBuf> {
    let mut settings_file_path = current_dir()
        .into_diagnostic()
        .wrap_err_with(|| miette!("Could not get the current directory."))?;
    settings_file_path.push(DEFAULT_SETTINGS_FILE_NAME);

    Ok(settings_file_path)
}

/// Replaces every occurrence of each placeholder (e.g. `{PROJECT_ROOT}`) in `template`.
#[must_use = "function returns the expanded path"]
pub fn expand_placeholders(template: &Path, placeholders: &[(&str, &Path)]) -> PathBuf {
    let mut path_string = template.to_string_lossy().into_owned();

    for (placeholder, value) in placeholders {
        path_string = path_string.replace(placeholder, &value.to_string_lossy());
    }

    PathBuf::from(path_string)
}
