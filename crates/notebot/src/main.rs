//! notebot entry point.
//!
//! # Responsibility
//! - Load configuration from the environment (and `.env` when present).
//! - Start logging, then keep the Telegram session alive under the
//!   restart supervisor.

mod telegram;

use log::info;
use notebot_core::{init_logging, supervise, BotConfig, SupervisorExit};
use std::process::ExitCode;
use std::sync::Arc;

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();

    let config = match BotConfig::from_env() {
        Ok(config) => Arc::new(config),
        Err(err) => {
            eprintln!("notebot: {err}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(err) = init_logging(&config.log_level, &config.log_dir) {
        eprintln!("notebot: {err}");
        return ExitCode::FAILURE;
    }
    info!(
        "event=bot_config module=main status=ok storage={} path={} summaries={}",
        config.storage_backend,
        config.storage_path.display(),
        config.completion.is_some()
    );

    let exit = supervise(&config.restart_policy, |attempt| {
        let config = Arc::clone(&config);
        async move { telegram::run_session(&config, attempt).await }
    })
    .await;

    match exit {
        SupervisorExit::Completed { .. } => ExitCode::SUCCESS,
        SupervisorExit::GaveUp { .. } => ExitCode::FAILURE,
    }
}
