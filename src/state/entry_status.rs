/// Queue entry status definitions
///
/// An entry moves forward along `Pending -> InProgress -> {Complete, Error}`.
/// `InProgress` may fall back to `Pending` through retry bookkeeping or crash
/// recovery, and `Error` only through an explicit requeue.
use std::fmt;

/// Represents the current status of a URL in a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryStatus {
    /// Waiting to be claimed
    Pending,

    /// Claimed by a worker; the fetch may be underway
    InProgress,

    /// Fetched, or skipped by robots/scope policy
    Complete,

    /// Failed and out of retries
    Error,
}

impl EntryStatus {
    /// Returns true if no further processing will happen without intervention
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Error)
    }

    /// Returns true if `next` is a legal transition from this status
    pub fn can_transition_to(&self, next: EntryStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::InProgress)
                | (Self::InProgress, Self::Complete)
                | (Self::InProgress, Self::Error)
                | (Self::InProgress, Self::Pending)
                | (Self::Error, Self::Pending)
        )
    }

    /// Converts the status to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Complete => "complete",
            Self::Error => "error",
        }
    }

    /// Parses a status from its database string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "in_progress" => Some(Self::InProgress),
            "complete" => Some(Self::Complete),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    /// All statuses, in lifecycle order
    pub fn all() -> [Self; 4] {
        [Self::Pending, Self::InProgress, Self::Complete, Self::Error]
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_string())
    }
}
