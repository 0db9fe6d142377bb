use clap::Parser;
use confx::{impl_conf, logging::initialize_tracing, settings::Settings, Configuration};
use miette::{Context, Result};
use tracing::info;

use crate::cli::{CLIArgs, CLICommand};

mod cli;


/// Name of the demo service; its variables are prefixed with `SRV_X_`.
const SERVICE_NAME: &str = "srv-x";


#[derive(Debug)]
struct ServerConfiguration {
    host: String,
    port: u16,
    debug: Option<bool>,
}

impl Default for ServerConfiguration {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 80,
            debug: None,
        }
    }
}

impl_conf!(ServerConfiguration {
    host => "HOST";
    port => "PORT", expose;
    debug => "DEBUG", optional;
});


#[derive(Debug)]
struct DatabaseConfiguration {
    url: String,
    password: String,
    pool_size: u32,
}

impl Default for DatabaseConfiguration {
    fn default() -> Self {
        Self {
            url: "postgres://localhost:5432/srv_x".to_string(),
            password: String::new(),
            pool_size: 8,
        }
    }
}

impl_conf!(DatabaseConfiguration {
    url => "DATABASE_URL";
    password => "DATABASE_PASSWORD", secret, optional;
    pool_size => "DATABASE_POOL_SIZE";
});


fn main() -> Result<()> {
    let cli_args = CLIArgs::parse();

    // Load settings.
    let settings = match cli_args.settings_file_path.as_ref() {
        Some(path) => Settings::load_from_path(path),
        None => Settings::load_from_default_path(),
    }
    .wrap_err("Failed to load settings.")?;


    let logging_raii_guard = initialize_tracing(&settings.logging, "confx.log")
        .wrap_err("Failed to initialize tracing.")?;

    info!(
        settings_file = ?settings.file_path,
        project_root = %settings.paths.project_root_path.display(),
        "Tracing initialized."
    );


    let mut configuration = Configuration::from_settings(SERVICE_NAME, &settings).initialize_from_env();
    configuration.should_generate_config = cli_args.should_generate_artifacts();

    let mut server_configuration = ServerConfiguration::default();
    configuration
        .resolve(&mut server_configuration)
        .wrap_err("Failed to resolve server configuration.")?;

    let mut database_configuration = DatabaseConfiguration::default();
    configuration
        .resolve(&mut database_configuration)
        .wrap_err("Failed to resolve database configuration.")?;


    if let Some(generated) = configuration
        .generate_if_requested()
        .wrap_err("Failed to generate deployment artifacts.")?
    {
        info!(
            default_values = %generated.default_values_file_path.display(),
            dockerfile = %generated.dockerfile_path.display(),
            "Deployment artifacts generated."
        );
    }


    match cli_args.command.unwrap_or(CLICommand::Run) {
        CLICommand::Run => {
            info!(
                project = %configuration.project_name(),
                root_path = %configuration.root_path(),
                host = %server_configuration.host,
                port = server_configuration.port,
                debug = ?server_configuration.debug,
                database_pool_size = database_configuration.pool_size,
                "Service configured."
            );
        }
        CLICommand::Report => {}
        CLICommand::Dockerfile => {
            print!("{}", configuration.dockerfile());
        }
    }


    drop(logging_raii_guard);
    Ok(())
}
