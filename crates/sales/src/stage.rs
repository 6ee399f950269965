use serde::{Deserialize, Serialize};

/// Lifecycle of a sale commit.
///
/// `Draft → Validating → Allocating → Persisted`, with `Aborted` reachable
/// from every stage before `Persisted`. `Persisted` and `Aborted` are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitStage {
    #[default]
    Draft,
    Validating,
    Allocating,
    Persisted,
    Aborted,
}

impl CommitStage {
    pub fn as_str(self) -> &'static str {
        match self {
            CommitStage::Draft => "draft",
            CommitStage::Validating => "validating",
            CommitStage::Allocating => "allocating",
            CommitStage::Persisted => "persisted",
            CommitStage::Aborted => "aborted",
        }
    }

    pub fn is_final(self) -> bool {
        matches!(self, CommitStage::Persisted | CommitStage::Aborted)
    }

    /// The stage that follows on success, if any.
    pub fn next(self) -> Option<CommitStage> {
        match self {
            CommitStage::Draft => Some(CommitStage::Validating),
            CommitStage::Validating => Some(CommitStage::Allocating),
            CommitStage::Allocating => Some(CommitStage::Persisted),
            CommitStage::Persisted | CommitStage::Aborted => None,
        }
    }

    pub fn can_transition_to(self, to: CommitStage) -> bool {
        match to {
            CommitStage::Aborted => !self.is_final(),
            _ => self.next() == Some(to),
        }
    }
}

impl core::fmt::Display for CommitStage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
