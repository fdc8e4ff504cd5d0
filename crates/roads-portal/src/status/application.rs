use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::machine::Lifecycle;
use super::normalize_key;

/// Lifecycle of a permit or license application.
///
/// Progression is `submitted -> pending-payment -> under-review -> approved`; `rejected` can be
/// reached from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApplicationStatus {
    Submitted,
    PendingPayment,
    UnderReview,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub const fn ordered() -> [Self; 5] {
        [
            Self::Submitted,
            Self::PendingPayment,
            Self::UnderReview,
            Self::Approved,
            Self::Rejected,
        ]
    }
}

impl Lifecycle for ApplicationStatus {
    const INITIAL: Self = Self::Submitted;
    const SUCCESS: Self = Self::Approved;
    const REJECTED: Self = Self::Rejected;

    fn rank(self) -> u8 {
        match self {
            Self::Submitted => 0,
            Self::PendingPayment => 1,
            Self::UnderReview => 2,
            Self::Approved => 3,
            Self::Rejected => 4,
        }
    }

    fn is_terminal(self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }

    fn is_in_flight(self) -> bool {
        self == Self::UnderReview
    }

    fn key(self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::PendingPayment => "pending-payment",
            Self::UnderReview => "under-review",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown application status '{0}'")]
pub struct UnknownApplicationStatus(pub String);

impl FromStr for ApplicationStatus {
    type Err = UnknownApplicationStatus;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match normalize_key(raw).as_str() {
            "submitted" => Ok(Self::Submitted),
            "pending-payment" => Ok(Self::PendingPayment),
            "under-review" | "in-review" | "in-progress" => Ok(Self::UnderReview),
            "approved" | "completed" => Ok(Self::Approved),
            "rejected" | "denied" => Ok(Self::Rejected),
            _ => Err(UnknownApplicationStatus(raw.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::{StatusMachine, Tick};

    #[test]
    fn forward_path_reaches_approval() {
        let mut machine = StatusMachine::<ApplicationStatus>::new();
        machine
            .transition(ApplicationStatus::PendingPayment)
            .expect("payment requested");
        machine
            .transition(ApplicationStatus::UnderReview)
            .expect("payment received");
        assert_eq!(machine.advance(100), Tick::Completed);
        assert_eq!(machine.status(), ApplicationStatus::Approved);
    }

    #[test]
    fn review_can_skip_payment_but_not_go_back() {
        let mut machine = StatusMachine::<ApplicationStatus>::new();
        machine
            .transition(ApplicationStatus::UnderReview)
            .expect("fee waived");
        assert!(machine
            .transition(ApplicationStatus::PendingPayment)
            .is_err());
    }

    #[test]
    fn rejection_is_reachable_from_every_open_state() {
        for status in [
            ApplicationStatus::Submitted,
            ApplicationStatus::PendingPayment,
            ApplicationStatus::UnderReview,
        ] {
            let mut machine = StatusMachine::seeded(status, Some(30));
            machine.reject().expect("open states can be rejected");
            assert_eq!(machine.status(), ApplicationStatus::Rejected);
            assert_eq!(machine.progress(), None);
        }
    }

    #[test]
    fn parses_keys_and_aliases() {
        assert_eq!(
            "Under Review".parse::<ApplicationStatus>(),
            Ok(ApplicationStatus::UnderReview)
        );
        assert_eq!(
            "pending_payment".parse::<ApplicationStatus>(),
            Ok(ApplicationStatus::PendingPayment)
        );
        assert!("archived".parse::<ApplicationStatus>().is_err());
    }

    #[test]
    fn serializes_as_kebab_case() {
        let json = serde_json::to_string(&ApplicationStatus::PendingPayment).expect("serialize");
        assert_eq!(json, "\"pending-payment\"");
    }
}
