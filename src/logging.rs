use miette::{miette, Context, IntoDiagnostic, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, Layer};

use crate::settings::LoggingSettings;


/// Installs the global tracing subscriber: a console layer on stderr and a
/// non-blocking file layer writing `log_file_name` into the configured log
/// directory, each with its own level filter.
///
/// Keep the returned guard alive for as long as logs should be flushed to the file.
pub fn initialize_tracing(logging: &LoggingSettings, log_file_name: &str) -> Result<WorkerGuard> {
    let log_file_output_directory = logging.log_file_output_directory.as_path();

    std::fs::create_dir_all(log_file_output_directory)
        .into_diagnostic()
        .wrap_err_with(|| {
            miette!(
                "Failed to create log file output directory at {}.",
                log_file_output_directory.display()
            )
        })?;

    let file_appender = tracing_appender::rolling::never(log_file_output_directory, log_file_name);
    let (non_blocking_file_writer, guard) = tracing_appender::non_blocking(file_appender);


    // stdout carries the configuration report, so the console layer logs to stderr.
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(logging.console_output_level_filter.to_env_filter());

    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_writer(non_blocking_file_writer)
        .with_filter(logging.log_file_output_level_filter.to_env_filter());


    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .into_diagnostic()
        .wrap_err("Failed to install the global tracing subscriber.")?;

    Ok(guard)
}
