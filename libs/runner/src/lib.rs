use std::future::Future;
use std::pin::Pin;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Error a runner can stop with. Boxed so every runner crate can use
/// its own error enum.
pub type RunnerError = Box<dyn std::error::Error + Send + Sync>;

/// A long-lived supervised task.
///
/// `run` stays pending until the work is finished or the token is
/// cancelled. Returning `Err` takes the whole process group down.
pub trait Runner: Send + 'static {
    fn name(&self) -> &str;

    fn run(
        &mut self,
        token: CancellationToken,
    ) -> Pin<Box<dyn Future<Output = Result<(), RunnerError>> + Send + '_>>;
}

// ---------------------------------------------------------------------------
// Supervisor
// ---------------------------------------------------------------------------

struct RunnerSlot {
    name: String,
    handle: JoinHandle<()>,
}

/// Spawns runners under one shared cancellation token and joins them
/// all on shutdown.
///
/// A runner that returns `Err` cancels the shared token, so the other
/// runners wind down instead of running headless.
pub struct Supervisor {
    token: CancellationToken,
    slots: Vec<RunnerSlot>,
}

impl Supervisor {
    pub fn new() -> Self {
        Supervisor {
            token: CancellationToken::new(),
            slots: Vec::new(),
        }
    }

    /// Clone of the shared shutdown token.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn spawn(&mut self, mut runner: impl Runner) {
        let name = runner.name().to_string();
        let token = self.token.clone();
        let task_name = name.clone();
        let handle = tokio::spawn(async move {
            match runner.run(token.clone()).await {
                Ok(()) => tracing::info!(runner = %task_name, "runner stopped"),
                Err(e) => {
                    tracing::error!(runner = %task_name, error = %e, "runner failed");
                    token.cancel();
                }
            }
        });
        tracing::info!(runner = %name, "spawned runner");
        self.slots.push(RunnerSlot { name, handle });
    }

    /// Fire the shutdown token without waiting for the runners.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Cancel and wait for every runner to exit.
    pub async fn shutdown(self) {
        self.token.cancel();
        for slot in self.slots {
            if let Err(e) = slot.handle.await {
                tracing::error!(runner = %slot.name, error = %e, "runner task panicked");
            }
        }
        tracing::info!("all runners stopped");
    }
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new()
    }
}
