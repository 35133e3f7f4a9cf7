use clap::Parser;
use sketchwall::{cli, logger};

fn main() -> std::process::ExitCode {
    // Session log (overwrites previous session log)
    logger::init();

    let args = cli::CliArgs::parse();
    let code = cli::run(args);
    sketchwall::log_info!("sketchwall: finished with {:?}", code);
    code
}
