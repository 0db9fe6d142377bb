use std::{collections::BTreeMap, fs, path::Path};

use serde_yaml::Value;
use tracing::{debug, warn};

use crate::env_vars::EnvVars;


/// Location of the local override file, relative to the project root.
pub const LOCAL_OVERRIDE_FILE_PATH: &str = "config/local.yml";


/// Reads `config/local.yml` under `project_root` into a registry scoped to `prefix`.
///
/// Keys may be unprefixed (`PORT`) or prefixed (`SRV_X_PORT`). Returns `None`
/// when the file is missing or is not a flat mapping of scalars.
pub(crate) fn read_local_overrides(project_root: &Path, prefix: &str) -> Option<EnvVars> {
    let file_path = project_root.join(LOCAL_OVERRIDE_FILE_PATH);

    let contents = match fs::read_to_string(&file_path) {
        Ok(contents) => contents,
        Err(error) => {
            debug!(
                path = %file_path.display(),
                %error,
                "No local override file, skipping."
            );
            return None;
        }
    };

    let mapping = match serde_yaml::from_str::<BTreeMap<String, Value>>(&contents) {
        Ok(mapping) => mapping,
        Err(error) => {
            debug!(
                path = %file_path.display(),
                %error,
                "Local override file is not a key/value mapping, skipping."
            );
            return None;
        }
    };

    let key_prefix = format!("{}_", prefix);
    let mut env_vars = EnvVars::new(prefix);

    for (key, value) in mapping {
        let Some(value) = scalar_to_string(value) else {
            warn!(%key, "Ignoring non-scalar value in local override file.");
            continue;
        };

        let key = key
            .strip_prefix(&key_prefix)
            .map(str::to_string)
            .unwrap_or(key);
        env_vars.set_key_value(key, value);
    }

    Some(env_vars)
}

fn scalar_to_string(value: Value) -> Option<String> {
    match value {
        Value::String(string) => Some(string),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(boolean) => Some(boolean.to_string()),
        Value::Null => Some(String::new()),
        _ => None,
    }
}
