//! Processing status lifecycle shared by the document and link tracks

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Three-state processing lifecycle.
///
/// `Processing` is the initial state. `Processed` and `Failed` are terminal:
/// a terminal state never regresses to `Processing`, but a later successful
/// ingestion event may re-assert `Processed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessStatus {
    #[default]
    Processing,
    Processed,
    Failed,
}

/// Error for status strings that name no known state
#[derive(Debug, Error)]
#[error("unknown process status: {0}")]
pub struct UnknownStatus(pub String);

impl ProcessStatus {
    /// Whether this state admits no further lifecycle progress
    pub fn is_terminal(self) -> bool {
        !matches!(self, ProcessStatus::Processing)
    }

    /// Apply a transition.
    ///
    /// Any attempt to move back to `Processing` is ignored; `Processed` and
    /// `Failed` targets always apply, so a fresh ingestion outcome can
    /// overwrite an earlier terminal state.
    #[must_use]
    pub fn transition(self, to: ProcessStatus) -> ProcessStatus {
        match to {
            ProcessStatus::Processing => self,
            _ => to,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProcessStatus::Processing => "processing",
            ProcessStatus::Processed => "processed",
            ProcessStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcessStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "processing" => Ok(ProcessStatus::Processing),
            "processed" => Ok(ProcessStatus::Processed),
            "failed" => Ok(ProcessStatus::Failed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}
