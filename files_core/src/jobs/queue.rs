use tokio::sync::mpsc;
use tracing::debug;

use crate::error::{AppError, Result};
use super::models::DerivativeJob;

/// Outbound contract for derivative work. Enqueue never waits on a consumer.
pub trait JobQueue: Send + Sync {
    fn enqueue(&self, job: DerivativeJob) -> Result<()>;
}

/// In-process queue backed by an unbounded channel. The receiving half is
/// handed to whatever consumes the jobs.
#[derive(Clone)]
pub struct ChannelJobQueue {
    sender: mpsc::UnboundedSender<DerivativeJob>,
}

impl ChannelJobQueue {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<DerivativeJob>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl JobQueue for ChannelJobQueue {
    fn enqueue(&self, job: DerivativeJob) -> Result<()> {
        self.sender
            .send(job)
            .map_err(|_| AppError::Job("Job queue is closed".to_string()))?;

        debug!("Enqueued derivative job for {}", job.file_id);
        Ok(())
    }
}
