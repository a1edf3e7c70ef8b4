use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Owned handle to a background sync task. The loops run until told to stop;
/// callers stop them before closing store handles.
pub struct TaskHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl TaskHandle {
    pub(crate) fn new(shutdown: watch::Sender<bool>, task: JoinHandle<()>) -> Self {
        TaskHandle { shutdown, task }
    }

    /// Signal the task to stop and wait for it to finish.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}
