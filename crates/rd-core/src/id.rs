//! Block identities.
//!
//! Every block gets an id when it is built. Ids never appear in markup: a
//! reparsed document has fresh ones. Node views, the host, and in-flight
//! uploads hold them as a handle on one block while the document around it
//! changes.

use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicU64, Ordering};

static IDS: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);
static NEXT: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(Spur);

impl NodeId {
    /// A fresh id for a block of the named kind, e.g. `image-12`.
    pub fn mint(kind: &str) -> Self {
        let n = NEXT.fetch_add(1, Ordering::Relaxed);
        NodeId(IDS.get_or_intern(format!("{kind}-{n}")))
    }

    /// Find an id previously handed out. Strings that were never minted
    /// give `None` and are not stored.
    pub fn lookup(s: &str) -> Option<Self> {
        IDS.get(s).map(NodeId)
    }

    pub fn as_str(&self) -> &str {
        IDS.resolve(&self.0)
    }

    /// The block kind this id was minted for.
    pub fn kind(&self) -> &str {
        self.as_str().rsplit_once('-').map_or("", |(kind, _)| kind)
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.as_str())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for NodeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Restores the exact id, so a serialized block keeps its identity.
impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(NodeId(IDS.get_or_intern(s)))
    }
}
