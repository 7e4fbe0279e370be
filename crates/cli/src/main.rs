use std::process::ExitCode;

fn main() -> ExitCode {
    dukaan_cli::run()
}
