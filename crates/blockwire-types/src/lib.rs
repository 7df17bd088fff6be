//! Shared block identity and mutation vocabulary for blockwire.
//!
//! A pure leaf crate: typed block ids, the block entity, the ordered
//! document format, and the origin/kind tags carried by every mutation.
//!
//! |------------------|--------------------------------------------|
//! | Type             | Purpose                                    |
//! |------------------|--------------------------------------------|
//! | [`BlockId`]      | Stable, client-assigned block address      |
//! | [`Block`]        | Tool name + data + settings under an id    |
//! | [`OutputData`]   | Ordered document (seed and snapshot)       |
//! | [`Origin`]       | Local vs remote mutation source            |
//! | [`MutationKind`] | Insert / replace / update / remove / swap  |
//! |------------------|--------------------------------------------|

pub mod block;
pub mod ids;
pub mod origin;

pub use block::{Block, OutputBlock, OutputData};
pub use ids::BlockId;
pub use origin::{MutationKind, Origin};

/// Current time as Unix milliseconds.
pub(crate) fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
