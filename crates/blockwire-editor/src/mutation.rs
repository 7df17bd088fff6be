//! Mutations: the one-shot units of work the pipeline processes.
//!
//! A [`Mutation`] pairs a structural operation with its [`Origin`] and an
//! optional pre-decided swallow verdict. Callers say where a change came
//! from; the pipeline decides what to report.
//!
//! Mutations serialize as flat JSON objects tagged by `op`, which is the
//! line format of replay scripts:
//!
//! ```json
//! {"op": "update", "target": "0190...", "data": {"text": "x"}, "origin": "remote"}
//! ```

use blockwire_types::{BlockId, MutationKind, Origin};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Structural change with its addressing fields and payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum MutationOp {
    /// Insert a new block after `after` (`None` = at the start).
    Insert {
        #[serde(default)]
        after: Option<BlockId>,
        /// Id for the new block. Remote inserts carry the originator's id;
        /// `None` gets a fresh one when the pipeline picks the mutation up.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<BlockId>,
        tool: String,
        #[serde(default)]
        data: Value,
        #[serde(default, skip_serializing_if = "Value::is_null")]
        settings: Value,
        #[serde(default)]
        need_to_focus: bool,
    },
    /// Change a block's tool and data wholesale.
    Replace {
        target: BlockId,
        tool: String,
        #[serde(default)]
        data: Value,
    },
    /// Overwrite a block's data in place.
    Update { target: BlockId, data: Value },
    Remove { target: BlockId },
    /// Exchange the positions of two blocks.
    Swap { from: BlockId, to: BlockId },
}

impl MutationOp {
    pub fn insert(after: Option<BlockId>, tool: impl Into<String>, data: Value) -> Self {
        Self::Insert {
            after,
            id: None,
            tool: tool.into(),
            data,
            settings: Value::Null,
            need_to_focus: false,
        }
    }

    pub fn replace(target: BlockId, tool: impl Into<String>, data: Value) -> Self {
        Self::Replace {
            target,
            tool: tool.into(),
            data,
        }
    }

    pub fn update(target: BlockId, data: Value) -> Self {
        Self::Update { target, data }
    }

    pub fn remove(target: BlockId) -> Self {
        Self::Remove { target }
    }

    pub fn swap(from: BlockId, to: BlockId) -> Self {
        Self::Swap { from, to }
    }

    pub fn kind(&self) -> MutationKind {
        match self {
            Self::Insert { .. } => MutationKind::Insert,
            Self::Replace { .. } => MutationKind::Replace,
            Self::Update { .. } => MutationKind::Update,
            Self::Remove { .. } => MutationKind::Remove,
            Self::Swap { .. } => MutationKind::Swap,
        }
    }

    /// The block this mutation is about: the new block for inserts, the
    /// target otherwise, `from` for swaps. `None` only for an insert whose
    /// id has not been assigned yet.
    pub fn subject(&self) -> Option<BlockId> {
        match self {
            Self::Insert { id, .. } => *id,
            Self::Replace { target, .. } | Self::Update { target, .. } | Self::Remove { target } => {
                Some(*target)
            }
            Self::Swap { from, .. } => Some(*from),
        }
    }

    /// Data payload shown to the echo gate, if the operation carries one.
    pub fn payload(&self) -> Option<&Value> {
        match self {
            Self::Insert { data, .. } | Self::Replace { data, .. } | Self::Update { data, .. } => {
                Some(data)
            }
            Self::Remove { .. } | Self::Swap { .. } => None,
        }
    }

    /// Give an insert without an id a fresh one. Returns the subject.
    pub(crate) fn assign_id(&mut self) -> BlockId {
        if let Self::Insert { id, .. } = self {
            return *id.get_or_insert_with(BlockId::new);
        }
        // Every other variant always has a subject.
        self.subject().unwrap_or_else(BlockId::nil)
    }
}

/// A mutation submitted to the pipeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Mutation {
    #[serde(flatten)]
    pub op: MutationOp,

    #[serde(default)]
    pub origin: Origin,

    /// Pre-decided swallow verdict. `None` lets the echo gate decide for
    /// remote mutations. Ignored for local mutations, which always notify.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swallow: Option<bool>,
}

impl Mutation {
    pub fn new(op: MutationOp, origin: Origin) -> Self {
        Self {
            op,
            origin,
            swallow: None,
        }
    }

    /// A change made in this editor.
    pub fn local(op: MutationOp) -> Self {
        Self::new(op, Origin::Local)
    }

    /// A change received from the replication system.
    pub fn remote(op: MutationOp) -> Self {
        Self::new(op, Origin::Remote)
    }

    /// Skip the gate and use this verdict instead.
    pub fn with_swallow(mut self, swallow: bool) -> Self {
        self.swallow = Some(swallow);
        self
    }

    pub fn kind(&self) -> MutationKind {
        self.op.kind()
    }
}

/// What happened to the outward notification of an applied mutation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notice {
    /// The matching bridge hook ran and returned `Ok`.
    Delivered,
    /// Remote mutation the gate (or a preset verdict) swallowed.
    Swallowed,
    /// No hook is registered for this kind.
    NoListener,
    /// The hook returned an error. The mutation stays applied.
    Failed(String),
}

/// Result of processing one mutation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The store changed.
    Applied {
        kind: MutationKind,
        /// Subject block (see [`MutationOp::subject`]).
        id: BlockId,
        notice: Notice,
    },
    /// Valid but a no-op (swap of a block with itself).
    Unchanged,
}

impl Outcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied { .. })
    }

    pub fn notice(&self) -> Option<&Notice> {
        match self {
            Outcome::Applied { notice, .. } => Some(notice),
            Outcome::Unchanged => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_script_line_parses() {
        let target = BlockId::new();
        let line = format!(
            r#"{{"op": "update", "target": "{}", "data": {{"text": "x"}}, "origin": "remote"}}"#,
            target
        );
        let m: Mutation = serde_json::from_str(&line).unwrap();
        assert_eq!(m.origin, Origin::Remote);
        assert_eq!(m.swallow, None);
        assert_eq!(m.op, MutationOp::update(target, json!({"text": "x"})));
    }

    #[test]
    fn test_insert_defaults() {
        let m: Mutation = serde_json::from_str(r#"{"op": "insert", "tool": "paragraph"}"#).unwrap();
        assert_eq!(m.origin, Origin::Local);
        match m.op {
            MutationOp::Insert { after, id, data, need_to_focus, .. } => {
                assert_eq!(after, None);
                assert_eq!(id, None);
                assert_eq!(data, Value::Null);
                assert!(!need_to_focus);
            }
            other => panic!("expected insert, got {other:?}"),
        }
    }

    #[test]
    fn test_subject_and_payload() {
        let a = BlockId::new();
        let b = BlockId::new();
        assert_eq!(MutationOp::swap(a, b).subject(), Some(a));
        assert_eq!(MutationOp::remove(a).payload(), None);
        assert_eq!(
            MutationOp::update(a, json!({"n": 1})).payload(),
            Some(&json!({"n": 1}))
        );
        assert_eq!(MutationOp::insert(None, "paragraph", Value::Null).subject(), None);
    }

    #[test]
    fn test_assign_id_is_stable() {
        let mut op = MutationOp::insert(None, "paragraph", Value::Null);
        let first = op.assign_id();
        let second = op.assign_id();
        assert_eq!(first, second);
        assert_eq!(op.subject(), Some(first));
    }

    #[test]
    fn test_serialize_roundtrip_keeps_swallow() {
        let m = Mutation::remote(MutationOp::remove(BlockId::new())).with_swallow(true);
        let json = serde_json::to_string(&m).unwrap();
        assert!(json.contains(r#""op":"remove""#));
        let back: Mutation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);
    }
}
