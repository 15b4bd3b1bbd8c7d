//! # RAEE Rules
//!
//! Pure decision logic shared by the RAEE donation backend. Nothing in this
//! crate performs I/O; every function is a deterministic computation over
//! data the caller has already fetched.
//!
//! | Concern        | Entry point(s)                                   |
//! |----------------|--------------------------------------------------|
//! | Authorization  | [`can_access`], [`can_accept`], [`writable_fields`] |
//! | Status machine | [`next_status_allowed`], [`releases_technician`] |
//! | Rewards        | [`RewardRule::compute_reward`], [`weight_bonus`] |
//!
//! Callers own persistence. In particular, a reward must be computed and
//! credited under the same guard that moves the record into `completed`;
//! the calculator cannot tell whether it has already been applied.

mod access;
mod reward;
mod status;
mod types;

#[cfg(test)]
mod test_access;
#[cfg(test)]
mod test_reward;

pub use access::{
    can_accept, can_access, writable_fields, AccessDecision, DEVICE_INFO_FIELDS, TECHNICIAN_FIELDS,
};
pub use reward::{weight_bonus, RewardRule, DEFAULT_BASE_POINTS, DEFAULT_MULTIPLIER};
pub use status::{awards_points, next_status_allowed, releases_technician};
pub use types::{
    Action, DonationField, DonationPatch, DonationRecord, DonationStatus, Principal, Role,
    UnknownVariant,
};

/// Why a request was refused.
#[derive(Copy, Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum DenyReason {
    /// Role or ownership check failed.
    #[error("forbidden")]
    Forbidden,
    /// Requested status is not reachable from the current one.
    #[error("invalid status transition")]
    InvalidTransition,
}
