//! Queueing front end for a [`MutationPipeline`].
//!
//! The pipeline runs in its own task and pulls commands off an unbounded
//! mpsc channel one at a time. While a remote mutation is parked on the echo
//! gate, everything submitted after it waits in the channel, so mutations are
//! applied strictly in submission order and each one resolves its addressing
//! against the effects of everything queued ahead of it.
//!
//! ```text
//!   PipelineHandle (Clone)      mpsc       pipeline task
//!   ┌─────────────────────┐  ────────▶  ┌──────────────────────────┐
//!   │ .submit()           │             │ MutationPipeline         │
//!   │ .enqueue()          │  ◀────────  │   BlockStore (owned)     │
//!   │ .snapshot()         │   oneshot   │   gate / bridge          │
//!   └─────────────────────┘             └──────────────────────────┘
//! ```
//!
//! There is no cancellation: once enqueued, a mutation is applied even if
//! the submitter stops waiting for its outcome.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use blockwire_types::{Block, BlockId, OutputData};
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::error::PipelineError;
use crate::mutation::{Mutation, Outcome};
use crate::pipeline::MutationPipeline;

/// Internal command sent from PipelineHandle → pipeline task.
enum PipelineCommand {
    Apply {
        mutation: Mutation,
        reply: oneshot::Sender<Result<Outcome, PipelineError>>,
    },
    Snapshot {
        reply: oneshot::Sender<OutputData>,
    },
    Blocks {
        reply: oneshot::Sender<Vec<Block>>,
    },
    Locate {
        id: BlockId,
        reply: oneshot::Sender<Option<usize>>,
    },
}

/// Cloneable handle to a running pipeline. The task stops once every handle
/// is dropped and the queue has drained.
#[derive(Clone)]
pub struct PipelineHandle {
    tx: mpsc::UnboundedSender<PipelineCommand>,
}

impl PipelineHandle {
    /// Queue a mutation and wait for its outcome.
    pub async fn submit(&self, mutation: Mutation) -> Result<Outcome, PipelineError> {
        self.enqueue(mutation)?.await
    }

    /// Queue a mutation without waiting. Its place in the queue is fixed
    /// when this returns.
    pub fn enqueue(&self, mutation: Mutation) -> Result<PendingOutcome, PipelineError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(PipelineCommand::Apply { mutation, reply })
            .map_err(|_| PipelineError::Shutdown)?;
        Ok(PendingOutcome { rx })
    }

    /// Ordered document as of every mutation queued before this call.
    pub async fn snapshot(&self) -> Result<OutputData, PipelineError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(PipelineCommand::Snapshot { reply })
            .map_err(|_| PipelineError::Shutdown)?;
        rx.await.map_err(|_| PipelineError::Shutdown)
    }

    /// Blocks in document order.
    pub async fn blocks(&self) -> Result<Vec<Block>, PipelineError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(PipelineCommand::Blocks { reply })
            .map_err(|_| PipelineError::Shutdown)?;
        rx.await.map_err(|_| PipelineError::Shutdown)
    }

    /// Current index of a block, `None` if it is not in the store.
    pub async fn locate(&self, id: BlockId) -> Result<Option<usize>, PipelineError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(PipelineCommand::Locate { id, reply })
            .map_err(|_| PipelineError::Shutdown)?;
        rx.await.map_err(|_| PipelineError::Shutdown)
    }
}

/// Outcome of an enqueued mutation. Resolves once the pipeline has processed
/// it; fails with [`PipelineError::Shutdown`] if the task died first.
pub struct PendingOutcome {
    rx: oneshot::Receiver<Result<Outcome, PipelineError>>,
}

impl Future for PendingOutcome {
    type Output = Result<Outcome, PipelineError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|reply| reply.unwrap_or(Err(PipelineError::Shutdown)))
    }
}

/// Process commands until the channel closes.
async fn run(mut pipeline: MutationPipeline, mut rx: mpsc::UnboundedReceiver<PipelineCommand>) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            PipelineCommand::Apply { mutation, reply } => {
                let result = pipeline.apply(mutation).await;
                // Submitter may have stopped waiting; the mutation stands.
                let _ = reply.send(result);
            }
            PipelineCommand::Snapshot { reply } => {
                let _ = reply.send(pipeline.snapshot());
            }
            PipelineCommand::Blocks { reply } => {
                let _ = reply.send(pipeline.blocks().to_vec());
            }
            PipelineCommand::Locate { id, reply } => {
                let _ = reply.send(pipeline.store().get_by_uuid(&id).ok());
            }
        }
    }
    debug!(applied = pipeline.applied_count(), "pipeline shutting down: channel closed");
}

/// Move a pipeline into its own task and return a handle to it.
///
/// Must be called from within a tokio runtime.
pub fn spawn_pipeline(pipeline: MutationPipeline) -> PipelineHandle {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(run(pipeline, rx));
    PipelineHandle { tx }
}
