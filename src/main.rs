use std::io::{self, Write};
use std::process::ExitCode;

use clap::Parser;

use apimgr::cli::commands::{run, ShellEnv};
use apimgr::cli::Cli;
use apimgr::logging::init_tracing;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let stdout = io::stdout();
    let stderr = io::stderr();
    let mut out = stdout.lock();
    let mut err = stderr.lock();

    let result = run(cli, ShellEnv::from_process(), &mut out, &mut err);
    let _ = out.flush();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let _ = writeln!(err, "error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
