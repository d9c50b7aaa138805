use std::process::ExitCode;

fn main() -> ExitCode {
    freeflow_cli::run()
}
