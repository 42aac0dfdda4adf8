//! `netsweep [--once] <options.yaml>`
//!
//! Runs collection rounds over the inventory in the options file, writing
//! each device's configuration into the workspace directory. With an
//! interval of zero (or `--once`) a single round runs and the process
//! exits. Set `RUST_LOG=debug` to follow each login dialogue.

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use log::{error, info};
use tokio::time::{Instant, sleep_until};

use netsweep::{DialectRegistry, MethodDispatch, Options, Scheduler, StatusRegistry, Workspace};

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), netsweep::Error> {
    let options = Options::load(&args.options)?;
    info!(
        "Loaded {} devices from {}",
        options.devices.len(),
        args.options.display()
    );

    let collector = MethodDispatch::new(DialectRegistry::with_builtins(), &options.executable_dir);
    let scheduler = Scheduler::new(
        collector,
        Arc::new(StatusRegistry::new()),
        Arc::new(Workspace::new(&options.workspace)),
        options.defaults(),
    )
    .with_concurrency(options.concurrency);

    let interval = if args.once { None } else { options.interval() };
    loop {
        let started = Instant::now();
        scheduler.run_round(&options.devices).await?;

        let Some(interval) = interval else {
            return Ok(());
        };
        sleep_until(started + interval).await;
    }
}

struct Args {
    options: PathBuf,
    once: bool,
}

impl Args {
    fn parse() -> Self {
        let mut options = None;
        let mut once = false;

        for arg in env::args().skip(1) {
            match arg.as_str() {
                "--once" => once = true,
                "--help" | "-h" => {
                    Self::print_help();
                    std::process::exit(0);
                }
                _ if arg.starts_with('-') => {
                    eprintln!("Unknown option: {}", arg);
                    Self::print_help();
                    std::process::exit(2);
                }
                _ => options = Some(PathBuf::from(arg)),
            }
        }

        let Some(options) = options else {
            Self::print_help();
            std::process::exit(2);
        };
        Self { options, once }
    }

    fn print_help() {
        println!(
            r#"netsweep - running-config backups for network devices

USAGE:
    netsweep [OPTIONS] <options.yaml>

OPTIONS:
    --once          Run a single round regardless of the configured interval
    -h, --help      Print this help message

ENVIRONMENT:
    RUST_LOG        Log filter (default: info)
"#
        );
    }
}
