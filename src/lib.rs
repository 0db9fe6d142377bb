//! Layered configuration for services.
//!
//! A service declares flat configuration structs through [`Conf`] (usually via
//! [`impl_conf!`]) and resolves them through a [`Configuration`] created at
//! start-up. Values come from, in increasing precedence:
//!
//! 1. the struct's own defaults,
//! 2. `config/local.yml` under the project root, if present,
//! 3. `<PREFIX>_<KEY>` process environment variables.
//!
//! The resolved registry also drives generation of `config/default.yml`
//! and a `Dockerfile`.
//!
//! ```no_run
//! use confx::{impl_conf, Configuration};
//!
//! #[derive(Default)]
//! struct Server {
//!     port: u16,
//!     password: String,
//! }
//!
//! impl_conf!(Server {
//!     port => "PORT", expose;
//!     password => "PASSWORD", secret;
//! });
//!
//! # fn main() -> miette::Result<()> {
//! let mut configuration = Configuration::new("srv-x", env!("CARGO_MANIFEST_DIR"));
//! let mut server = Server { port: 80, ..Server::default() };
//!
//! configuration.resolve(&mut server)?;
//! configuration.dockerize()?;
//! # Ok(())
//! # }
//! ```

pub mod artifacts;
pub mod configuration;
pub mod env_vars;
pub mod error;
pub mod field;
pub mod logging;
pub mod settings;

pub use configuration::Configuration;
pub use env_vars::{EnvVar, EnvVarFlags, EnvVars};
pub use error::{ConfxError, SourceKind};
pub use field::{Conf, EnvValue, Field, Init, ValueError};
