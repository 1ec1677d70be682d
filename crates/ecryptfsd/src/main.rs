use std::process::ExitCode;

fn main() -> ExitCode {
    ecryptfsd::exit_status(&ecryptfsd::run_daemon())
}
