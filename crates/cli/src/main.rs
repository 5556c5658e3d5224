use std::process::ExitCode;

fn main() -> ExitCode {
    billpack_cli::run()
}
