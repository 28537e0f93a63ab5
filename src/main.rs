//! groupgate: honors group memberships asserted by a trusted proxy.

use clap::Parser;
use std::env;
use termcolor::ColorChoice;

use crate::{
    args::{Args, Command},
    config::Config,
    prelude::*,
};

mod args;
mod auth;
mod cmd;
mod config;
mod http;
mod logger;
mod prelude;


#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        // Log error in case stdout is not connected and it is logged into a file.
        error!("{:?}", e);

        // Show a somewhat nice representation of the error
        eprintln!();
        bunt::eprintln!("{$red}▶▶▶ {$bold}Error:{/$}{/$} {[yellow+intense]}", e);
        eprintln!();
        if e.chain().len() > 1 {
            bunt::eprintln!("{$red+italic}Caused by:{/$}");
        }

        for (i, cause) in e.chain().skip(1).enumerate() {
            eprint!(" {: >1$}", "", i * 2);
            eprintln!("‣ {cause}");
        }

        std::process::exit(1);
    }
}

/// Main entry point.
async fn run() -> Result<()> {
    // If `RUST_BACKTRACE` wasn't already set, we default to `1`. Backtraces are
    // almost always useful for debugging and we don't expect errors to be
    // frequent.
    if env::var("RUST_BACKTRACE") == Err(env::VarError::NotPresent) {
        env::set_var("RUST_BACKTRACE", "1");
    }

    let args = Args::parse();
    let color = args.color();
    bunt::set_stdout_color_choice(color);
    bunt::set_stderr_color_choice(color);


    // Dispatch subcommand.
    match &args.cmd {
        Command::Serve { shared } => {
            let config = load_config_and_init_logger(shared, color, args.cmd_name())?;
            info!("Starting groupgate {} ...", env!("CARGO_PKG_VERSION"));
            trace!("Configuration: {:#?}", config);
            config.lint();
            http::serve(config).await.context("failed to run HTTP server")?;
        }
        Command::Resolve { args: resolve_args, shared } => {
            let config = load_config_and_init_logger(shared, color, args.cmd_name())?;
            cmd::resolve::run(resolve_args, &config)?;
        }
        Command::Encode { args: encode_args } => cmd::encode::run(encode_args)?,
        Command::Check { shared } => cmd::check::run(shared, color)?,
        Command::WriteConfig { target } => config::write_template(target.as_ref())?,
    }

    Ok(())
}

fn load_config_and_init_logger(
    shared: &args::Shared,
    color: ColorChoice,
    cmd: &str,
) -> Result<Config> {
    let (config, path) = match &shared.config {
        Some(path) => {
            let config = Config::load_from(path)
                .with_context(|| format!("failed to load config from '{}'", path.display()))?;
            (config, path.clone())
        }
        None => Config::from_env_or_default_locations()?,
    };

    // Initialize logger. Unfortunately, we can only do this here
    // after reading the config.
    logger::init(&config.log, color, cmd)?;
    info!("Loaded config from '{}'", path.display());

    Ok(config)
}
