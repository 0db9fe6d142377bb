//! The ordered registry of resolved configuration entries.

use std::collections::HashMap;


/// Placeholder rendered in place of secret values.
pub const MASK: &str = "******";


/// Metadata flags declared for a configuration field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnvVarFlags {
    /// Absent values are fine, and the entry is left out of `config/default.yml`.
    pub optional: bool,

    /// The value is masked in reports.
    pub secret: bool,

    /// The value is a port exposed by the container image.
    pub expose: bool,
}


/// One resolved configuration entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvVar {
    pub key: String,
    pub value: String,
    pub flags: EnvVarFlags,
}

impl EnvVar {
    pub fn new<K, V>(key: K, value: V, flags: EnvVarFlags) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            key: key.into(),
            value: value.into(),
            flags,
        }
    }

    /// Full environment key, `<PREFIX>_<KEY>`.
    pub fn key_with(&self, prefix: &str) -> String {
        if prefix.is_empty() {
            self.key.clone()
        } else {
            format!("{}_{}", prefix, self.key)
        }
    }

    /// Value as it should appear in an operator-visible report.
    pub fn masked_value(&self) -> &str {
        if self.flags.secret {
            MASK
        } else {
            &self.value
        }
    }
}


/// Ordered collection of [`EnvVar`]s, unique by key.
///
/// Iteration follows insertion order, which keeps reports and generated
/// artifacts deterministic.
#[derive(Debug, Clone, Default)]
pub struct EnvVars {
    prefix: String,
    values: Vec<EnvVar>,
    index: HashMap<String, usize>,
}

impl EnvVars {
    pub fn new<S: Into<String>>(prefix: S) -> Self {
        Self {
            prefix: prefix.into(),
            values: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Collects every `<PREFIX>_<KEY>` variable from `environ`,
    /// storing it under its unprefixed `<KEY>`.
    pub fn from_environ<I, K, V>(prefix: &str, environ: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut env_vars = Self::new(prefix);
        let key_prefix = format!("{}_", prefix);

        for (key, value) in environ {
            if let Some(stripped_key) = key.as_ref().strip_prefix(&key_prefix) {
                if !stripped_key.is_empty() {
                    env_vars.set_key_value(stripped_key, value);
                }
            }
        }

        env_vars
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Inserts or updates an entry.
    ///
    /// The first `set` for a key fixes its flags, later calls only replace the value.
    pub fn set(&mut self, env_var: EnvVar) {
        match self.index.get(&env_var.key) {
            Some(&position) => {
                self.values[position].value = env_var.value;
            }
            None => {
                self.index.insert(env_var.key.clone(), self.values.len());
                self.values.push(env_var);
            }
        }
    }

    /// Sets a raw key/value pair with no declared flags.
    pub fn set_key_value<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.set(EnvVar::new(key, value, EnvVarFlags::default()));
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.get_var(key).map(|env_var| env_var.value.as_str())
    }

    pub fn get_var(&self, key: &str) -> Option<&EnvVar> {
        self.index.get(key).map(|&position| &self.values[position])
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EnvVar> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Renders `<PREFIX>_<KEY>=<value>` lines with secret values replaced by [`MASK`].
    pub fn mask_bytes(&self) -> Vec<u8> {
        let mut output = String::new();

        for env_var in &self.values {
            output.push_str(&env_var.key_with(&self.prefix));
            output.push('=');
            output.push_str(env_var.masked_value());
            output.push('\n');
        }

        output.into_bytes()
    }
}

impl<'a> IntoIterator for &'a EnvVars {
    type Item = &'a EnvVar;
    type IntoIter = std::slice::Iter<'a, EnvVar>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
