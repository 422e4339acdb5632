//! Entry point for the command-line interface.
#![forbid(unsafe_code)]

use env_logger::Env;
use tiletex_cli::CliError;

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    match tiletex_cli::run() {
        Ok(()) => {}
        Err(CliError::ArgumentParsing(err)) => err.exit(),
        Err(err) => {
            eprintln!("tiletex: {err}");
            std::process::exit(1);
        }
    }
}
