use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::machine::Lifecycle;
use super::normalize_key;

/// Lifecycle of an uploaded document.
///
/// `processing` is animated by a progress timer and flips to `approved` at 100%. Staff may then
/// mark the document `verified`; `expired` and `rejected` end the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentStatus {
    Pending,
    Processing,
    #[serde(alias = "processed")]
    Approved,
    Verified,
    Expired,
    #[serde(alias = "failed")]
    Rejected,
}

impl DocumentStatus {
    pub const fn ordered() -> [Self; 6] {
        [
            Self::Pending,
            Self::Processing,
            Self::Approved,
            Self::Verified,
            Self::Expired,
            Self::Rejected,
        ]
    }
}

impl Lifecycle for DocumentStatus {
    const INITIAL: Self = Self::Pending;
    const SUCCESS: Self = Self::Approved;
    const REJECTED: Self = Self::Rejected;

    fn rank(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Processing => 1,
            Self::Approved => 2,
            Self::Verified => 3,
            Self::Expired => 4,
            Self::Rejected => 5,
        }
    }

    fn is_terminal(self) -> bool {
        matches!(self, Self::Expired | Self::Rejected)
    }

    fn is_in_flight(self) -> bool {
        self == Self::Processing
    }

    fn allows(self, next: Self) -> bool {
        match (self, next) {
            (from, _) if from.is_terminal() => false,
            (_, Self::Rejected) => true,
            (Self::Pending, Self::Processing | Self::Approved) => true,
            (Self::Processing, Self::Approved) => true,
            (Self::Approved, Self::Verified | Self::Expired) => true,
            (Self::Verified, Self::Expired) => true,
            _ => false,
        }
    }

    fn key(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Approved => "approved",
            Self::Verified => "verified",
            Self::Expired => "expired",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown document status '{0}'")]
pub struct UnknownDocumentStatus(pub String);

impl FromStr for DocumentStatus {
    type Err = UnknownDocumentStatus;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match normalize_key(raw).as_str() {
            "pending" => Ok(Self::Pending),
            "processing" | "in-progress" => Ok(Self::Processing),
            "approved" | "processed" | "completed" => Ok(Self::Approved),
            "verified" => Ok(Self::Verified),
            "expired" => Ok(Self::Expired),
            "rejected" | "failed" => Ok(Self::Rejected),
            _ => Err(UnknownDocumentStatus(raw.to_string())),
        }
    }
}
