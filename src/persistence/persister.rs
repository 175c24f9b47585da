//! Background persister
//!
//! Regular envelopes are appended on a dedicated thread fed by a bounded FIFO
//! queue, so a slow disk never sits between a publisher and its recipients.
//!
//! - One consumer: appends are applied in the order they were queued.
//! - Backpressure: when the queue is full, `enqueue` waits. Only the
//!   publishing connection slows down; delivery to others already happened.
//! - Append failures are logged on the persister thread and not reported back.

use std::sync::Arc;
use std::thread;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error};

use super::MessageStore;
use crate::utils::StoreError;

#[derive(Debug)]
enum Job {
    Append { topic: String, envelope: String },
    Flush(oneshot::Sender<()>),
}

/// Handle to the persister thread. Clones share the same queue; the thread
/// exits once every handle is dropped.
#[derive(Debug, Clone)]
pub struct Persister {
    jobs: mpsc::Sender<Job>,
}

impl Persister {
    /// Start the persister thread writing into `store`.
    pub fn spawn(store: Arc<dyn MessageStore>, capacity: usize) -> Result<Self, StoreError> {
        let (jobs, mut queue) = mpsc::channel::<Job>(capacity.max(1));

        thread::Builder::new()
            .name("persister".to_string())
            .spawn(move || {
                while let Some(job) = queue.blocking_recv() {
                    match job {
                        Job::Append { topic, envelope } => {
                            if let Err(e) = store.append(&topic, &envelope) {
                                error!("Error saving message for topic {topic}: {e}");
                            }
                        }
                        Job::Flush(done) => {
                            let _ = done.send(());
                        }
                    }
                }
                debug!("Persister stopped");
            })?;

        Ok(Self { jobs })
    }

    /// Queue `envelope` for appending to `topic`'s log.
    pub async fn enqueue(&self, topic: &str, envelope: &str) -> Result<(), StoreError> {
        self.jobs
            .send(Job::Append {
                topic: topic.to_string(),
                envelope: envelope.to_string(),
            })
            .await
            .map_err(|_| StoreError::PersisterClosed)
    }

    /// Wait until every append queued before this call has been applied.
    pub async fn flush(&self) -> Result<(), StoreError> {
        let (done, applied) = oneshot::channel();
        self.jobs
            .send(Job::Flush(done))
            .await
            .map_err(|_| StoreError::PersisterClosed)?;
        applied.await.map_err(|_| StoreError::PersisterClosed)
    }
}
