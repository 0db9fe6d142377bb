use std::path::{Path, PathBuf};

use miette::{miette, Context, IntoDiagnostic, Result};
use serde::Deserialize;

use super::utilities::expand_placeholders;


/// The `[paths]` table as written in the settings file.
#[derive(Deserialize, Debug)]
#[serde(default)]
pub(super) struct PathsTable {
    project_root_path: PathBuf,

    /// May contain the `{PROJECT_ROOT}` placeholder.
    output_directory_path: PathBuf,
}

impl Default for PathsTable {
    fn default() -> Self {
        Self {
            project_root_path: PathBuf::from("."),
            output_directory_path: PathBuf::from("{PROJECT_ROOT}"),
        }
    }
}


#[derive(Debug, Clone)]
pub struct PathsSettings {
    /// Canonical project root. `config/local.yml` is read from here.
    pub project_root_path: PathBuf,

    /// Directory `config/default.yml` and the `Dockerfile` are written to.
    pub output_directory_path: PathBuf,
}

impl PathsSettings {
    /// Canonicalizes the project root, which must be an existing directory,
    /// and expands the output directory against it.
    pub(super) fn from_table(table: PathsTable) -> Result<Self> {
        let project_root_path = dunce::canonicalize(&table.project_root_path)
            .into_diagnostic()
            .wrap_err_with(|| {
                miette!(
                    "Project root path {} does not exist.",
                    table.project_root_path.display()
                )
            })?;

        if !project_root_path.is_dir() {
            return Err(miette!(
                "Project root path {} is not a directory!",
                project_root_path.display()
            ));
        }

        let output_directory_path = expand_placeholders(
            &table.output_directory_path,
            &[("{PROJECT_ROOT}", &project_root_path)],
        );

        Ok(Self {
            project_root_path,
            output_directory_path,
        })
    }

    /// Expands `{PROJECT_ROOT}` and `{OUTPUT_DIRECTORY}` in `template`.
    pub fn expand(&self, template: &Path) -> PathBuf {
        expand_placeholders(
            template,
            &[
                ("{PROJECT_ROOT}", &self.project_root_path),
                ("{OUTPUT_DIRECTORY}", &self.output_directory_path),
            ],
        )
    }
}


#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn output_directory_defaults_to_project_root() {
        let directory = tempfile::tempdir().unwrap();
        let table = PathsTable {
            project_root_path: directory.path().to_path_buf(),
            ..PathsTable::default()
        };

        let paths = PathsSettings::from_table(table).unwrap();
        let canonical_root = dunce::canonicalize(directory.path()).unwrap();

        assert_eq!(paths.project_root_path, canonical_root);
        assert_eq!(paths.output_directory_path, canonical_root);
        assert_eq!(
            paths.expand(Path::new("{OUTPUT_DIRECTORY}/logs")),
            canonical_root.join("logs")
        );
    }

    #[test]
    fn project_root_must_be_a_directory() {
        let directory = tempfile::tempdir().unwrap();
        let file_path = directory.path().join("not-a-directory");
        fs::write(&file_path, b"").unwrap();

        let table = PathsTable {
            project_root_path: file_path,
            ..PathsTable::default()
        };
        assert!(PathsSettings::from_table(table).is_err());
    }
}
