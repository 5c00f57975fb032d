mod app;
mod audio;
mod images;
mod keys;
mod window;

use app::App;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    init_tracing();

    match App::new().and_then(App::run) {
        Ok(summary) => {
            info!(
                trials = summary.trials,
                low_cues = summary.cues.low,
                high_cues = summary.cues.high,
                audio_started = summary.audio_started,
                audio_finished = summary.audio_finished,
                key_presses = summary.key_presses,
                output = ?summary.output,
                "run complete"
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            let code = app::exit_code(&err);
            error!(code, "{err:#}");
            if code == app::EXIT_EXPORT {
                eprintln!("{}", app::EXPORT_FAILURE_MESSAGE);
            }
            ExitCode::from(code)
        }
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}
