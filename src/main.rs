mod args;
mod commands;
mod config;
mod generator;
mod locator;
mod remote;

use args::NcpassParse;
use config::Config;
use remote::NextcloudClient;

use anyhow::Result;
use clap::Parser;
use log::{debug, LevelFilter};
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::config::{Appender, Config as LogConfig, Root};
use log4rs::encode::pattern::PatternEncoder;
use std::env;
use std::io;
use std::process;

const LOG_CONFIG_VAR: &str = "NCPASS_LOG_CONFIG";
const LOG_LEVEL_VAR: &str = "NCPASS_LOG";

// Logs always go to stderr, stdout is reserved for command results
fn init_logging() -> Result<()> {
    if let Ok(path) = env::var(LOG_CONFIG_VAR) {
        return log4rs::init_file(path, Default::default());
    }

    let level = env::var(LOG_LEVEL_VAR)
        .ok()
        .and_then(|level| level.parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::Warn);

    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new("{l}: {m}{n}")))
        .build();

    let config = LogConfig::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .build(Root::builder().appender("stderr").build(level))?;

    log4rs::init_config(config)?;
    Ok(())
}

fn run(parsed: NcpassParse) -> Result<()> {
    let config = Config::from_env()?;
    debug!("Using {} as {}", config.url, config.user);

    let client = NextcloudClient::new(&config)?;

    let stdout = io::stdout();
    let stderr = io::stderr();
    commands::dispatch(parsed.command, &client, &mut stdout.lock(), &mut stderr.lock())
}

fn main() {
    if let Err(err) = init_logging() {
        eprintln!("Error: {}", err);
    }

    // usage, help and version all go to stderr
    let parsed = match NcpassParse::try_parse() {
        Ok(parsed) => parsed,
        Err(err) => {
            eprint!("{}", err);
            process::exit(if err.use_stderr() { 1 } else { 0 });
        }
    };

    if let Err(err) = run(parsed) {
        debug!("Command failed: {:?}", err);
        eprint!("Error: {}", err);
        err.chain().skip(1).for_each(|cause| eprint!(": {}", cause));
        eprintln!();

        process::exit(1);
    }
}
