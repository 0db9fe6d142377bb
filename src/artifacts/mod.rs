//! Deployment artifacts derived from the resolved registry:
//! `config/default.yml` and a `Dockerfile`.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use tracing::info;

use crate::{env_vars::EnvVars, error::ConfxError};

mod dockerfile;

pub use dockerfile::*;


/// Location of the default-values file, relative to the output directory.
pub const DEFAULT_VALUES_FILE_PATH: &str = "config/default.yml";

/// Location of the Dockerfile, relative to the output directory.
pub const DOCKERFILE_PATH: &str = "Dockerfile";


/// Paths written by a generation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedArtifacts {
    pub default_values_file_path: PathBuf,
    pub dockerfile_path: PathBuf,
}


/// Maps `<PREFIX>_<KEY>` to its value for every non-optional entry.
pub fn default_values(env_vars: &EnvVars) -> BTreeMap<String, String> {
    env_vars
        .iter()
        .filter(|env_var| !env_var.flags.optional)
        .map(|env_var| (env_var.key_with(env_vars.prefix()), env_var.value.clone()))
        .collect()
}

pub fn write_default_values(
    file_path: &Path,
    values: &BTreeMap<String, String>,
) -> Result<(), ConfxError> {
    write_to_file(file_path, render_default_values(values).as_bytes())?;

    info!(
        path = %file_path.display(),
        entries = values.len(),
        "Wrote default configuration values."
    );
    Ok(())
}

/// Renders `values` as a flat YAML mapping with every value double-quoted,
/// e.g. `SRV_X_PORT: "8080"`, so numbers and booleans stay strings.
pub fn render_default_values(values: &BTreeMap<String, String>) -> String {
    if values.is_empty() {
        return "{}\n".to_string();
    }

    let mut contents = String::new();
    for (key, value) in values {
        let is_plain_key = !key.is_empty()
            && key
                .chars()
                .all(|character| character.is_ascii_alphanumeric() || character == '_');

        if is_plain_key {
            contents.push_str(key);
        } else {
            push_double_quoted(&mut contents, key);
        }
        contents.push_str(": ");
        push_double_quoted(&mut contents, value);
        contents.push('\n');
    }

    contents
}

fn push_double_quoted(output: &mut String, value: &str) {
    output.push('"');
    for character in value.chars() {
        match character {
            '"' => output.push_str("\\\""),
            '\\' => output.push_str("\\\\"),
            '\n' => output.push_str("\\n"),
            '\r' => output.push_str("\\r"),
            '\t' => output.push_str("\\t"),
            control if control.is_control() || matches!(control, '\u{2028}' | '\u{2029}') => {
                output.push_str(&format!("\\u{:04X}", u32::from(control)));
            }
            other => output.push(other),
        }
    }
    output.push('"');
}

pub fn write_dockerfile(file_path: &Path, dockerfile: &Dockerfile) -> Result<(), ConfxError> {
    write_to_file(file_path, dockerfile.to_string().as_bytes())?;

    info!(path = %file_path.display(), "Wrote Dockerfile.");
    Ok(())
}

/// Writes (or overwrites) `file_path`, creating missing parent directories first.
fn write_to_file(file_path: &Path, contents: &[u8]) -> Result<(), ConfxError> {
    if let Some(parent_directory) = file_path.parent() {
        if !parent_directory.as_os_str().is_empty() {
            fs::create_dir_all(parent_directory).map_err(|source| {
                ConfxError::CreateDirectory {
                    path: parent_directory.to_path_buf(),
                    source,
                }
            })?;
        }
    }

    fs::write(file_path, contents).map_err(|source| ConfxError::WriteArtifact {
        path: file_path.to_path_buf(),
        source,
    })
}
