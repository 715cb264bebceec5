//! Crash-restart loop for the bot session.
//!
//! Each attempt runs on its own task so a panic is observed as a failed
//! attempt instead of tearing down the process. State created inside an
//! attempt (conversation follow-ups included) does not survive a restart.

use log::{error, info, warn};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

pub const DEFAULT_RESTART_DELAY: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestartPolicy {
    /// Fixed back-off between a crash and the next attempt.
    pub delay: Duration,
    /// Give up after this many restarts; `None` restarts forever.
    pub max_restarts: Option<u32>,
}

impl Default for RestartPolicy {
    fn default() -> Self {
        Self {
            delay: DEFAULT_RESTART_DELAY,
            max_restarts: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorExit {
    /// An attempt returned `Ok(())`.
    Completed { restarts: u32 },
    /// `max_restarts` was exhausted.
    GaveUp { restarts: u32 },
}

/// Runs `launch(attempt)` until it completes cleanly.
///
/// `attempt` starts at 0 and increments on every restart.
pub async fn supervise<F, Fut, E>(policy: &RestartPolicy, mut launch: F) -> SupervisorExit
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: Display + Send + 'static,
{
    let mut restarts = 0;
    loop {
        let reason = match tokio::spawn(launch(restarts)).await {
            Ok(Ok(())) => {
                info!(
                    "event=supervisor_exit module=supervisor status=ok restarts={}",
                    restarts
                );
                return SupervisorExit::Completed { restarts };
            }
            Ok(Err(err)) => err.to_string(),
            Err(join_err) if join_err.is_panic() => "session panicked".to_string(),
            Err(join_err) => join_err.to_string(),
        };

        if policy.max_restarts.is_some_and(|max| restarts >= max) {
            error!(
                "event=supervisor_exit module=supervisor status=gave_up restarts={} reason={}",
                restarts, reason
            );
            return SupervisorExit::GaveUp { restarts };
        }

        warn!(
            "event=session_crash module=supervisor status=restarting attempt={} delay_secs={} reason={}",
            restarts,
            policy.delay.as_secs(),
            reason
        );
        tokio::time::sleep(policy.delay).await;
        restarts += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::{supervise, RestartPolicy, SupervisorExit};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn quick_policy(max_restarts: Option<u32>) -> RestartPolicy {
        RestartPolicy {
            delay: Duration::from_millis(1),
            max_restarts,
        }
    }

    #[tokio::test]
    async fn restarts_failed_attempts_until_success() {
        let exit = supervise(&quick_policy(None), |attempt| async move {
            if attempt < 2 {
                Err(format!("boom {attempt}"))
            } else {
                Ok(())
            }
        })
        .await;
        assert_eq!(exit, SupervisorExit::Completed { restarts: 2 });
    }

    #[tokio::test]
    async fn panicking_attempt_is_restarted() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let exit = supervise(&quick_policy(None), move |attempt| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt == 0 {
                    panic!("session crashed");
                }
                Ok::<(), String>(())
            }
        })
        .await;
        assert_eq!(exit, SupervisorExit::Completed { restarts: 1 });
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn gives_up_after_max_restarts() {
        let exit = supervise(&quick_policy(Some(3)), |_| async {
            Err::<(), _>("always failing")
        })
        .await;
        assert_eq!(exit, SupervisorExit::GaveUp { restarts: 3 });
    }
}
