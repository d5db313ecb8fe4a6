use std::{future::Future, time::Duration};

/// Failure of a scheduled task before it produced a result.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum ScheduleError {
    /// The task was cancelled while the caller was waiting on it.
    #[error("interrupted: {0}")]
    Interrupted(String),
    /// The task failed unexpectedly (for example it panicked).
    #[error("execution failed: {0}")]
    Execution(String),
}

/// Runs a task after a delay and hands its output back to the caller.
///
/// The client uses this as the timer for connect retries. Inject a custom
/// implementation with [`HanCloudsClient::with_scheduler`] to control time in
/// tests or to run retries on a dedicated runtime.
///
/// [`HanCloudsClient::with_scheduler`]: crate::HanCloudsClient::with_scheduler
pub trait Scheduler: Send + Sync {
    fn schedule<F>(
        &self,
        delay: Duration,
        task: F,
    ) -> impl Future<Output = Result<F::Output, ScheduleError>> + Send
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static;
}

/// Default [`Scheduler`]: spawns each task on the ambient tokio runtime.
///
/// Dropping the returned future aborts the spawned task, so a caller that
/// stops waiting also stops the pending attempt.
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
    fn schedule<F>(
        &self,
        delay: Duration,
        task: F,
    ) -> impl Future<Output = Result<F::Output, ScheduleError>> + Send
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task.await
        });

        let mut guard = AbortOnDrop(handle);

        async move {
            (&mut guard.0).await.map_err(|err| {
                if err.is_cancelled() {
                    ScheduleError::Interrupted(err.to_string())
                } else {
                    ScheduleError::Execution(err.to_string())
                }
            })
        }
    }
}

struct AbortOnDrop<T>(tokio::task::JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}
