use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// The three raw change classifications tracked per path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RawEventKind {
    Created,
    Updated,
    Deleted,
}

impl RawEventKind {
    /// Map a notify event kind onto a raw classification. Access and
    /// metadata-only events carry no content change and are dropped, as are
    /// directory removals: only files are tracked, so only files can be
    /// reported deleted.
    pub(crate) fn classify(kind: &notify::EventKind) -> Option<Self> {
        use notify::event::{ModifyKind, RemoveKind, RenameMode};

        match kind {
            notify::EventKind::Create(_) => Some(Self::Created),
            notify::EventKind::Modify(modify_kind) => match modify_kind {
                ModifyKind::Name(RenameMode::From) => Some(Self::Deleted),
                ModifyKind::Name(RenameMode::To) => Some(Self::Created),
                ModifyKind::Metadata(_) => None,
                _ => Some(Self::Updated),
            },
            notify::EventKind::Remove(RemoveKind::Folder) => None,
            notify::EventKind::Remove(_) => Some(Self::Deleted),
            notify::EventKind::Access(_) => None,
            _ => None,
        }
    }
}

/// A coalesced per-directory batch as emitted by the aggregation engine.
///
/// All three categories are always present; empty categories are empty
/// vectors. Paths are relative to the watched root, in the order the first
/// surviving event for each path arrived.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryBatch {
    pub created: Vec<PathBuf>,
    pub updated: Vec<PathBuf>,
    pub deleted: Vec<PathBuf>,
}

impl DirectoryBatch {
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.updated.is_empty() && self.deleted.is_empty()
    }
}

/// A filtered batch as delivered to subscription callbacks.
///
/// Categories in which nothing passed the subscriber's pattern filter are
/// absent (`None`) rather than present-but-empty, so callers can distinguish
/// "nothing matched" from "matched an empty set".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeBatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<Vec<PathBuf>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<Vec<PathBuf>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted: Option<Vec<PathBuf>>,
}

impl ChangeBatch {
    /// True when no category survived filtering. Batches for which this
    /// holds are never delivered.
    pub fn is_empty(&self) -> bool {
        self.created.is_none() && self.updated.is_none() && self.deleted.is_none()
    }
}

/// What a directory-level listener receives on each fan-out.
#[derive(Debug, Clone)]
pub enum DirectoryEvent {
    /// A coalesced change batch.
    Batch(DirectoryBatch),

    /// The watch source reported a failure. Pending state is untouched.
    Error(String),
}
