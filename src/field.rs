//! Field-level capabilities that let the resolver treat configuration
//! structs generically.
//!
//! A configuration struct implements [`Conf`] by listing its fields in
//! declaration order. Each field pairs a declared key and its [`EnvVarFlags`]
//! with a mutable reference to a value implementing [`EnvValue`].
//! Most structs should use [`impl_conf!`][crate::impl_conf] instead of
//! implementing [`Conf`] by hand.

use std::path::PathBuf;

use thiserror::Error;

use crate::env_vars::EnvVarFlags;


/// A raw string could not be decoded into a field value.
///
/// The message describes the expected shape, never the raw input.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct ValueError(String);

impl ValueError {
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self(message.into())
    }
}


/// Hook run on a field after its configuration has been resolved.
pub trait Init {
    fn init(&mut self);
}


/// A value that can be read from and written to a single environment string.
pub trait EnvValue {
    /// String form stored in the registry and generated files.
    fn encode(&self) -> String;

    /// Replaces `self` with the value parsed from `raw`.
    fn decode(&mut self, raw: &str) -> Result<(), ValueError>;

    /// Returns the post-resolution hook, if this type has one.
    fn as_init(&mut self) -> Option<&mut dyn Init> {
        None
    }
}


/// A declared configuration field.
pub struct Field<'a> {
    pub key: &'static str,
    pub flags: EnvVarFlags,
    pub value: &'a mut dyn EnvValue,
}

impl<'a> Field<'a> {
    pub fn new(key: &'static str, value: &'a mut dyn EnvValue) -> Self {
        Self {
            key,
            flags: EnvVarFlags::default(),
            value,
        }
    }

    #[must_use]
    pub fn optional(mut self) -> Self {
        self.flags.optional = true;
        self
    }

    #[must_use]
    pub fn secret(mut self) -> Self {
        self.flags.secret = true;
        self
    }

    #[must_use]
    pub fn expose(mut self) -> Self {
        self.flags.expose = true;
        self
    }
}


/// A flat configuration struct whose fields can be resolved from environment sources.
pub trait Conf {
    /// All fields, in declaration order.
    fn fields(&mut self) -> Vec<Field<'_>>;
}


/// Implements [`Conf`] for a struct from a list of `field => "KEY"` declarations,
/// each optionally followed by flags (`optional`, `secret`, `expose`).
///
/// ```
/// use confx::impl_conf;
///
/// #[derive(Default)]
/// struct Server {
///     port: u16,
///     password: String,
///     debug: Option<bool>,
/// }
///
/// impl_conf!(Server {
///     port => "PORT", expose;
///     password => "PASSWORD", secret;
///     debug => "DEBUG", optional;
/// });
/// ```
#[macro_export]
macro_rules! impl_conf {
    ($target:ty { $($field:ident => $key:literal $(, $flag:ident)*;)* }) => {
        impl $crate::Conf for $target {
            fn fields(&mut self) -> ::std::vec::Vec<$crate::Field<'_>> {
                ::std::vec![
                    $($crate::Field::new($key, &mut self.$field)$(.$flag())*,)*
                ]
            }
        }
    };
}



impl EnvValue for String {
    fn encode(&self) -> String {
        self.clone()
    }

    fn decode(&mut self, raw: &str) -> Result<(), ValueError> {
        raw.clone_into(self);
        Ok(())
    }
}

impl EnvValue for PathBuf {
    fn encode(&self) -> String {
        self.to_string_lossy().into_owned()
    }

    fn decode(&mut self, raw: &str) -> Result<(), ValueError> {
        *self = PathBuf::from(raw);
        Ok(())
    }
}

impl EnvValue for bool {
    fn encode(&self) -> String {
        self.to_string()
    }

    fn decode(&mut self, raw: &str) -> Result<(), ValueError> {
        *self = match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "t" | "true" => true,
            "0" | "f" | "false" => false,
            _ => return Err(ValueError::new("expected a boolean (true/false/1/0)")),
        };
        Ok(())
    }
}

macro_rules! impl_env_value_from_str {
    ($($value_type:ty),* $(,)?) => {
        $(
            impl EnvValue for $value_type {
                fn encode(&self) -> String {
                    self.to_string()
                }

                fn decode(&mut self, raw: &str) -> Result<(), ValueError> {
                    *self = raw.trim().parse::<$value_type>().map_err(|error| {
                        ValueError::new(format!(
                            "expected {}: {}",
                            stringify!($value_type),
                            error
                        ))
                    })?;
                    Ok(())
                }
            }
        )*
    };
}

impl_env_value_from_str!(u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64);


/// An empty string means `None`.
impl<T> EnvValue for Option<T>
where
    T: EnvValue + Default,
{
    fn encode(&self) -> String {
        match self {
            Some(value) => value.encode(),
            None => String::new(),
        }
    }

    fn decode(&mut self, raw: &str) -> Result<(), ValueError> {
        if raw.is_empty() {
            *self = None;
            return Ok(());
        }

        let mut value = T::default();
        value.decode(raw)?;
        *self = Some(value);
        Ok(())
    }

    fn as_init(&mut self) -> Option<&mut dyn Init> {
        self.as_mut().and_then(EnvValue::as_init)
    }
}

/// Comma-separated list; an empty string is an empty list.
impl<T> EnvValue for Vec<T>
where
    T: EnvValue + Default,
{
    fn encode(&self) -> String {
        self.iter()
            .map(EnvValue::encode)
            .collect::<Vec<_>>()
            .join(",")
    }

    fn decode(&mut self, raw: &str) -> Result<(), ValueError> {
        if raw.trim().is_empty() {
            self.clear();
            return Ok(());
        }

        let mut values = Vec::new();
        for item in raw.split(',') {
            let mut value = T::default();
            value.decode(item.trim())?;
            values.push(value);
        }

        *self = values;
        Ok(())
    }
}
