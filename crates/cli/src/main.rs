use std::process::ExitCode;

fn main() -> ExitCode {
    freightprint_cli::run()
}
