#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::must_use_candidate)]

use clap::error::ErrorKind;
use clap::Parser;
use log::error;
use std::error::Error;
use std::process::ExitCode;

use umbridge_gateway::cli::Options;
use umbridge_gateway::gateway;

fn parse_options() -> Result<Options, umbridge_gateway::Error> {
    Options::try_parse().map_err(|e| match e.kind() {
        // `--help`/`--version` aren't configuration errors; let clap print
        // its own output and exit 0 as usual.
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => e.exit(),
        // A genuine usage error (missing `--scheduler`, a bad flag value).
        // Logging isn't configured yet at this point in startup, so print
        // clap's own formatted message directly rather than relying on
        // `log::error!`, then surface it as our own fatal `ConfigError` so
        // the process exits through the same path (and exit code) as any
        // other startup failure.
        _ => {
            let _ = e.print();
            umbridge_gateway::Error::ConfigError(e.to_string())
        }
    })
}

fn main_detail() -> Result<(), Box<dyn Error>> {
    let options = parse_options()?;

    let log_level = match options.verbose.log_level_filter() {
        clap_verbosity_flag::LevelFilter::Off => "off",
        clap_verbosity_flag::LevelFilter::Error => "error",
        clap_verbosity_flag::LevelFilter::Warn => "warn",
        clap_verbosity_flag::LevelFilter::Info => "info",
        clap_verbosity_flag::LevelFilter::Debug => "debug",
        clap_verbosity_flag::LevelFilter::Trace => "trace",
    };

    let env = env_logger::Env::default()
        .filter_or("UMBRIDGE_GATEWAY_LOG", log_level)
        .write_style_or("UMBRIDGE_GATEWAY_LOG_STYLE", "auto");
    env_logger::Builder::from_env(env).init();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(gateway::run(options))?;

    Ok(())
}

fn main() -> ExitCode {
    if let Err(error) = main_detail() {
        error!("{error}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
