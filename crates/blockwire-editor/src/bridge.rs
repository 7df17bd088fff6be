//! Collaboration bridge: outward notifications for the replication system.
//!
//! One hook per mutation kind, each optional. A hook receives the addressing
//! information as it was *before* the change (predecessor id, replaced id,
//! mutated id) plus the new payload, which is what a replication system needs
//! to build its own operation without racing the editor's indices.
//!
//! Hooks are fire-and-forget from the pipeline's point of view. A hook that
//! returns `Err` is logged and reported in the mutation's
//! [`Notice`](crate::Notice); the store change it reports stands.
//!
//! `on_ready` and `on_change` are plain synchronous lifecycle signals and
//! carry no addressing.

use blockwire_types::{BlockId, MutationKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::warn;

use crate::mutation::Notice;

/// Payload of an insert notification.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InsertData {
    /// Id of the inserted block.
    pub id: BlockId,
    /// Tool name.
    pub name: String,
    pub data: Value,
    pub settings: Value,
    pub need_to_focus: bool,
}

/// Payload of a replace notification.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReplaceData {
    pub tool_name: String,
    pub data: Value,
}

/// Payload of an update notification.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UpdateData {
    pub uuid: BlockId,
    pub data: Value,
}

/// One outward notification.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum Notification {
    Insert {
        /// Predecessor at the time of insertion; `None` = at the start.
        after: Option<BlockId>,
        #[serde(flatten)]
        block: InsertData,
    },
    Replace {
        replacing: BlockId,
        #[serde(flatten)]
        block: ReplaceData,
    },
    Update {
        #[serde(flatten)]
        mutation: UpdateData,
    },
    Remove {
        uuid: BlockId,
    },
    Swap {
        from: BlockId,
        to: BlockId,
    },
}

impl Notification {
    pub fn kind(&self) -> MutationKind {
        match self {
            Notification::Insert { .. } => MutationKind::Insert,
            Notification::Replace { .. } => MutationKind::Replace,
            Notification::Update { .. } => MutationKind::Update,
            Notification::Remove { .. } => MutationKind::Remove,
            Notification::Swap { .. } => MutationKind::Swap,
        }
    }
}

type InsertHook = Box<dyn Fn(Option<BlockId>, &InsertData) -> anyhow::Result<()> + Send + Sync>;
type ReplaceHook = Box<dyn Fn(BlockId, &ReplaceData) -> anyhow::Result<()> + Send + Sync>;
type UpdateHook = Box<dyn Fn(&UpdateData) -> anyhow::Result<()> + Send + Sync>;
type RemoveHook = Box<dyn Fn(BlockId) -> anyhow::Result<()> + Send + Sync>;
type SwapHook = Box<dyn Fn(BlockId, BlockId) -> anyhow::Result<()> + Send + Sync>;
type LifecycleHook = Box<dyn Fn() + Send + Sync>;

/// Set of optional notification hooks. The default has none: every
/// notification is a no-op.
#[derive(Default)]
pub struct CollabBridge {
    on_insert: Option<InsertHook>,
    on_replace: Option<ReplaceHook>,
    on_update: Option<UpdateHook>,
    on_remove: Option<RemoveHook>,
    on_swap: Option<SwapHook>,
    on_ready: Option<LifecycleHook>,
    on_change: Option<LifecycleHook>,
}

impl CollabBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bridge that forwards every notification into a channel, for consumers
    /// that would rather poll than register callbacks.
    pub fn forwarding(tx: mpsc::UnboundedSender<Notification>) -> Self {
        fn send(tx: &mpsc::UnboundedSender<Notification>, n: Notification) -> anyhow::Result<()> {
            tx.send(n)
                .map_err(|_| anyhow::anyhow!("notification receiver dropped"))
        }

        let (t1, t2, t3, t4, t5) = (tx.clone(), tx.clone(), tx.clone(), tx.clone(), tx);
        Self::new()
            .on_insert(move |after, block| {
                send(&t1, Notification::Insert { after, block: block.clone() })
            })
            .on_replace(move |replacing, block| {
                send(&t2, Notification::Replace { replacing, block: block.clone() })
            })
            .on_update(move |mutation| {
                send(&t3, Notification::Update { mutation: mutation.clone() })
            })
            .on_remove(move |uuid| send(&t4, Notification::Remove { uuid }))
            .on_swap(move |from, to| send(&t5, Notification::Swap { from, to }))
    }

    pub fn on_insert<F>(mut self, f: F) -> Self
    where
        F: Fn(Option<BlockId>, &InsertData) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.on_insert = Some(Box::new(f));
        self
    }

    pub fn on_replace<F>(mut self, f: F) -> Self
    where
        F: Fn(BlockId, &ReplaceData) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.on_replace = Some(Box::new(f));
        self
    }

    /// Called once per update mutation. Not debounced.
    pub fn on_update<F>(mut self, f: F) -> Self
    where
        F: Fn(&UpdateData) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.on_update = Some(Box::new(f));
        self
    }

    pub fn on_remove<F>(mut self, f: F) -> Self
    where
        F: Fn(BlockId) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.on_remove = Some(Box::new(f));
        self
    }

    pub fn on_swap<F>(mut self, f: F) -> Self
    where
        F: Fn(BlockId, BlockId) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.on_swap = Some(Box::new(f));
        self
    }

    /// Fired once, after the store has been seeded.
    pub fn on_ready<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_ready = Some(Box::new(f));
        self
    }

    /// Fired after every applied mutation, swallowed ones included.
    pub fn on_change<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_change = Some(Box::new(f));
        self
    }

    /// Dispatch to the matching hook.
    pub fn notify(&self, notification: &Notification) -> Notice {
        let result = match notification {
            Notification::Insert { after, block } => self.on_insert.as_ref().map(|h| h(*after, block)),
            Notification::Replace { replacing, block } => {
                self.on_replace.as_ref().map(|h| h(*replacing, block))
            }
            Notification::Update { mutation } => self.on_update.as_ref().map(|h| h(mutation)),
            Notification::Remove { uuid } => self.on_remove.as_ref().map(|h| h(*uuid)),
            Notification::Swap { from, to } => self.on_swap.as_ref().map(|h| h(*from, *to)),
        };

        match result {
            None => Notice::NoListener,
            Some(Ok(())) => Notice::Delivered,
            Some(Err(e)) => {
                warn!(kind = %notification.kind(), error = %e, "collaboration hook failed");
                Notice::Failed(format!("{e:#}"))
            }
        }
    }

    pub(crate) fn ready(&self) {
        if let Some(hook) = &self.on_ready {
            hook();
        }
    }

    pub(crate) fn changed(&self) {
        if let Some(hook) = &self.on_change {
            hook();
        }
    }
}

impl std::fmt::Debug for CollabBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollabBridge")
            .field("on_insert", &self.on_insert.is_some())
            .field("on_replace", &self.on_replace.is_some())
            .field("on_update", &self.on_update.is_some())
            .field("on_remove", &self.on_remove.is_some())
            .field("on_swap", &self.on_swap.is_some())
            .field("on_ready", &self.on_ready.is_some())
            .field("on_change", &self.on_change.is_some())
            .finish()
    }
}
