use clap::Parser;
use rustpath::{
    cli::{run, Cli},
    diagnostics::emit_syntax_errors,
    error::Error,
    resolve::LoadError,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(Error::Load(LoadError::Syntax(files))) => {
            emit_syntax_errors(&files);
            ExitCode::FAILURE
        }
        Err(Error::DiagnosticsReported { .. }) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
