use clap::Parser;
use tickerwise::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
