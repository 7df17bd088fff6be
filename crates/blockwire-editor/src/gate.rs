//! Echo suppression gate.
//!
//! Before a remote mutation is applied the pipeline asks the gate whether the
//! replication system already knows about it. `true` means "apply, but do not
//! report it back": the change is an echo of one the replication system
//! made itself.
//!
//! The gate is asked once per remote mutation and its answer is never cached:
//! suppression is a property of one operation, not of a block.
//!
//! A gate that errors fails open: the mutation is treated as new and
//! notified.

use std::collections::HashMap;
use std::future::Future;

use async_trait::async_trait;
use blockwire_types::BlockId;
use parking_lot::Mutex;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

/// Gate failure. Never surfaced to the submitter; logged and treated as
/// "do not swallow".
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GateError {
    #[error("suppression gate failed: {0}")]
    SuppressionFailure(String),
}

/// Decides whether a remote mutation's notification is swallowed.
#[async_trait]
pub trait EchoGate: Send + Sync {
    /// `id` is the mutation's subject block; `data` its payload, when it
    /// carries one (insert, replace, update).
    ///
    /// The gate runs before the tool factory, so `data` is the payload as
    /// submitted: an insert or replace with `null` data arrives as
    /// `Some(Value::Null)`, not as the tool's default data that ends up in
    /// the store.
    async fn should_swallow_update(&self, id: BlockId, data: Option<Value>) -> Result<bool, GateError>;
}

/// Gate with a fixed answer.
#[derive(Clone, Copy, Debug)]
pub struct StaticGate(pub bool);

#[async_trait]
impl EchoGate for StaticGate {
    async fn should_swallow_update(&self, _id: BlockId, _data: Option<Value>) -> Result<bool, GateError> {
        Ok(self.0)
    }
}

/// Gate backed by an async closure. Build with [`gate_fn`].
pub struct FnGate<F>(F);

/// Wrap an async closure as a gate.
///
/// ```ignore
/// let gate = gate_fn(|id, _data| async move { Ok(replica.is_known(id)) });
/// ```
pub fn gate_fn<F, Fut>(f: F) -> FnGate<F>
where
    F: Fn(BlockId, Option<Value>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<bool, GateError>> + Send + 'static,
{
    FnGate(f)
}

#[async_trait]
impl<F, Fut> EchoGate for FnGate<F>
where
    F: Fn(BlockId, Option<Value>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<bool, GateError>> + Send + 'static,
{
    async fn should_swallow_update(&self, id: BlockId, data: Option<Value>) -> Result<bool, GateError> {
        (self.0)(id, data).await
    }
}

/// Gate fed by the replication system itself.
///
/// Before forwarding a change it already applied, the replication side calls
/// [`expect`](Self::expect) with the block id. The next remote mutation for
/// that id is swallowed and consumes one expectation; anything unexpected is
/// treated as new.
///
/// Expectations never expire on their own. An echo that will not arrive
/// (the replication side dropped the op, or the block was removed first)
/// must be cleared with [`forget`](Self::forget).
#[derive(Debug, Default)]
pub struct EchoLedger {
    expected: Mutex<HashMap<BlockId, usize>>,
}

impl EchoLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark one upcoming remote mutation on `id` as already known.
    pub fn expect(&self, id: BlockId) {
        *self.expected.lock().entry(id).or_insert(0) += 1;
    }

    /// Expectations not yet consumed for `id`.
    pub fn pending(&self, id: &BlockId) -> usize {
        self.expected.lock().get(id).copied().unwrap_or(0)
    }

    /// Drop every outstanding expectation for `id`. Returns how many there were.
    pub fn forget(&self, id: &BlockId) -> usize {
        self.expected.lock().remove(id).unwrap_or(0)
    }

    fn take(&self, id: &BlockId) -> bool {
        let mut expected = self.expected.lock();
        match expected.get_mut(id) {
            Some(count) => {
                *count -= 1;
                if *count == 0 {
                    expected.remove(id);
                }
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl EchoGate for EchoLedger {
    async fn should_swallow_update(&self, id: BlockId, _data: Option<Value>) -> Result<bool, GateError> {
        Ok(self.take(&id))
    }
}

/// Ask the gate, failing open. No gate means never swallow.
pub(crate) async fn consult(gate: Option<&dyn EchoGate>, id: BlockId, data: Option<Value>) -> bool {
    let Some(gate) = gate else {
        return false;
    };
    match gate.should_swallow_update(id, data).await {
        Ok(verdict) => verdict,
        Err(e) => {
            warn!(block = %id, error = %e, "echo gate failed, notifying anyway");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_no_gate_never_swallows() {
        assert!(!consult(None, BlockId::new(), None).await);
    }

    #[tokio::test]
    async fn test_static_gate() {
        let gate = StaticGate(true);
        assert!(consult(Some(&gate), BlockId::new(), None).await);
    }

    #[tokio::test]
    async fn test_failing_gate_fails_open() {
        let gate = gate_fn(|_id, _data| async {
            Err::<bool, _>(GateError::SuppressionFailure("replica offline".into()))
        });
        assert!(!consult(Some(&gate), BlockId::new(), None).await);
    }

    #[tokio::test]
    async fn test_fn_gate_sees_payload() {
        let gate = gate_fn(|_id, data: Option<Value>| async move {
            Ok::<_, GateError>(data.is_some_and(|d| d["echo"] == true))
        });
        let id = BlockId::new();
        assert!(consult(Some(&gate), id, Some(serde_json::json!({"echo": true}))).await);
        assert!(!consult(Some(&gate), id, None).await);
    }

    #[tokio::test]
    async fn test_ledger_consumes_one_expectation_per_mutation() {
        let ledger = EchoLedger::new();
        let id = BlockId::new();
        ledger.expect(id);
        ledger.expect(id);
        assert_eq!(ledger.pending(&id), 2);

        assert!(consult(Some(&ledger), id, None).await);
        assert!(consult(Some(&ledger), id, None).await);
        assert!(!consult(Some(&ledger), id, None).await);
        assert_eq!(ledger.pending(&id), 0);
    }

    #[tokio::test]
    async fn test_ledger_forget_clears_stale_expectations() {
        let ledger = EchoLedger::new();
        let (kept, gone) = (BlockId::new(), BlockId::new());
        ledger.expect(kept);
        ledger.expect(gone);
        ledger.expect(gone);

        assert_eq!(ledger.forget(&gone), 2);
        assert_eq!(ledger.forget(&gone), 0);
        assert_eq!(ledger.pending(&gone), 0);
        assert!(!consult(Some(&ledger), gone, None).await);
        assert_eq!(ledger.pending(&kept), 1);
    }
}
