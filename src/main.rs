use std::process::ExitCode;

fn main() -> ExitCode {
    stackdoc::cli::run()
}
