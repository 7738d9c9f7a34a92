use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

use super::models::DerivativeJob;

/// Drains the queue until every sender is dropped. Derivative generation
/// itself happens outside this service, so jobs are only recorded.
pub fn spawn_job_logger(mut receiver: mpsc::UnboundedReceiver<DerivativeJob>) -> JoinHandle<usize> {
    tokio::spawn(async move {
        let mut handled = 0;
        while let Some(job) = receiver.recv().await {
            info!(user_id = job.user_id, file_id = %job.file_id, "Derivative job received");
            handled += 1;
        }
        info!("Job queue closed after {} jobs", handled);
        handled
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::FileId;
    use crate::jobs::{ChannelJobQueue, JobQueue};

    #[tokio::test]
    async fn test_logger_drains_until_closed() {
        let (queue, receiver) = ChannelJobQueue::new();
        let handle = spawn_job_logger(receiver);

        for user_id in 0..3 {
            queue.enqueue(DerivativeJob { user_id, file_id: FileId::new() }).unwrap();
        }
        drop(queue);

        assert_eq!(handle.await.unwrap(), 3);
    }
}
