mod app;

use std::process::ExitCode;

use tracing::error;

fn main() -> ExitCode {
    app::bootstrap::init_tracing();

    match app::bootstrap::build_app() {
        Ok(Some(wiring)) => app::loop_runner::run(wiring),
        Ok(None) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "startup_failed");
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
