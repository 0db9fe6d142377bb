//! Command-line interface definitions for the demo service binary.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};



/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(
    name = "confx",
    author,
    about = "Resolves layered service configuration and generates deployment artifacts.",
    version
)]
pub struct CLIArgs {
    /// Whether `config/default.yml` and the `Dockerfile` are regenerated
    /// before the command runs.
    #[arg(
        short = 'c',
        long = "output-docker-config",
        global = true,
        action = ArgAction::Set,
        default_value_t = true,
        help = "Write config/default.yml and Dockerfile before running (true/false). Defaults to true."
    )]
    pub output_docker_config: bool,

    /// This is the path to the settings file to use.
    /// If unspecified, this defaults to `./confx.toml`, and built-in
    /// settings are used when that file doesn't exist.
    #[arg(
        short = 's',
        long = "settings-file-path",
        global = true,
        help = "Path to the settings file to use. Defaults to ./confx.toml"
    )]
    pub settings_file_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<CLICommand>,
}


impl CLIArgs {
    /// Whether artifacts are written before the command runs.
    /// `dockerfile` only prints, whatever `-c` says.
    pub fn should_generate_artifacts(&self) -> bool {
        self.output_docker_config && self.command != Some(CLICommand::Dockerfile)
    }
}


#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CLICommand {
    /// Resolve the configuration and start the service (default).
    Run,

    /// Resolve the configuration and only print the masked report.
    Report,

    /// Print the Dockerfile that would be generated, without writing anything.
    Dockerfile,
}
