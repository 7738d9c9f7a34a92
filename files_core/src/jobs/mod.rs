pub mod models;
pub mod queue;
pub mod worker;

pub use models::DerivativeJob;
pub use queue::{ChannelJobQueue, JobQueue};
pub use worker::spawn_job_logger;
