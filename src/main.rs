use std::process::ExitCode;

fn main() -> ExitCode {
    match csp_titration::app::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) if err.is_source_unavailable() => {
            eprintln!("{err} Nothing was analysed.");
            ExitCode::from(err.exit_code())
        }
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(err.exit_code())
        }
    }
}
