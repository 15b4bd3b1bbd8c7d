//! Allowed status transitions for a donation.

use crate::types::DonationStatus;

/// Returns `true` if a donation in `current` may move to `requested`.
///
/// Only forward transitions are allowed:
///   Pending   -> Assigned | Cancelled
///   Assigned  -> InProcess | Cancelled
///   InProcess -> Completed | Cancelled
///   Completed -> (none)
///   Cancelled -> (none)
pub fn next_status_allowed(current: DonationStatus, requested: DonationStatus) -> bool {
    use DonationStatus::*;
    matches!(
        (current, requested),
        (Pending, Assigned)
            | (Assigned, InProcess)
            | (InProcess, Completed)
            | (Pending, Cancelled)
            | (Assigned, Cancelled)
            | (InProcess, Cancelled)
    )
}

/// Whether entering `requested` from `current` must hand the assigned
/// technician back to the available pool.
pub fn releases_technician(current: DonationStatus, requested: DonationStatus) -> bool {
    use DonationStatus::*;
    matches!(
        (current, requested),
        (Assigned, Cancelled) | (InProcess, Cancelled) | (InProcess, Completed)
    )
}

/// Whether entering `requested` from `current` awards points to the owner.
pub fn awards_points(current: DonationStatus, requested: DonationStatus) -> bool {
    next_status_allowed(current, requested) && requested == DonationStatus::Completed
}
