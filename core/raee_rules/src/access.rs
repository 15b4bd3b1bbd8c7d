//! # Access
//!
//! Decides whether a principal may read or write a donation and narrows a
//! write payload to the fields the caller's role may change.
//!
//! Rules are evaluated in order:
//!
//! 1. `Admin` passes the ownership check and keeps the full payload.
//! 2. Reads: a technician needs to be the assigned technician; a citizen or
//!    institution needs to own the record.
//! 3. Writes: same ownership check, then the payload is narrowed through
//!    [`writable_fields`]. Dropped fields are not an error.
//! 4. Writes that request a status unreachable from the current one are
//!    denied with [`DenyReason::InvalidTransition`]. `assigned` is never
//!    reachable through a write: only [`can_accept`] hands a donation to a
//!    technician, so an assigned donation always names one.

use crate::status::next_status_allowed;
use crate::types::{
    Action, DonationField, DonationPatch, DonationRecord, DonationStatus, Principal, Role,
};
use crate::DenyReason;

/// Device description fields an owner may edit while the donation is pending.
pub const DEVICE_INFO_FIELDS: &[DonationField] = &[
    DonationField::DeviceType,
    DonationField::Brand,
    DonationField::Model,
    DonationField::Description,
    DonationField::CategoryId,
    DonationField::ConditionId,
    DonationField::WeightKg,
    DonationField::Quantity,
];

/// Processing fields a technician may set on an assigned donation.
pub const TECHNICIAN_FIELDS: &[DonationField] = &[
    DonationField::Status,
    DonationField::Notes,
    DonationField::ProcessedDate,
];

const ALL_FIELDS: &[DonationField] = &[
    DonationField::DeviceType,
    DonationField::Brand,
    DonationField::Model,
    DonationField::Description,
    DonationField::CategoryId,
    DonationField::ConditionId,
    DonationField::WeightKg,
    DonationField::Quantity,
    DonationField::Status,
    DonationField::Notes,
    DonationField::ProcessedDate,
];

/// Outcome of [`can_access`].
#[derive(Clone, Debug, PartialEq)]
pub struct AccessDecision {
    pub allowed: bool,
    /// Payload narrowed to the caller's allowlist. Empty for reads and denials.
    pub filtered_payload: DonationPatch,
    /// Fields removed from the payload during narrowing.
    pub dropped: Vec<DonationField>,
    pub reason: Option<DenyReason>,
}

impl AccessDecision {
    fn allow(filtered_payload: DonationPatch, dropped: Vec<DonationField>) -> Self {
        Self {
            allowed: true,
            filtered_payload,
            dropped,
            reason: None,
        }
    }

    fn deny(reason: DenyReason) -> Self {
        Self {
            allowed: false,
            filtered_payload: DonationPatch::default(),
            dropped: Vec::new(),
            reason: Some(reason),
        }
    }

    /// Collapse the decision into a `Result` carrying the narrowed payload.
    pub fn into_result(self) -> Result<DonationPatch, DenyReason> {
        match self.reason {
            Some(reason) => Err(reason),
            None => Ok(self.filtered_payload),
        }
    }
}

/// Relationship between a caller and a record.
fn is_party(principal: &Principal, record: &DonationRecord) -> bool {
    match principal.role {
        Role::Admin => true,
        Role::Technician => record.assigned_technician_id == Some(principal.id),
        Role::Citizen | Role::Institution => record.owner_id == principal.id,
    }
}

/// Allowlist table keyed by `(role, record status)`.
///
/// Callers are expected to have passed the ownership check already; the
/// table does not look at identities.
pub fn writable_fields(role: Role, status: DonationStatus) -> &'static [DonationField] {
    match (role, status) {
        (Role::Admin, _) => ALL_FIELDS,
        (_, status) if status.is_terminal() => &[],
        (Role::Technician, _) => TECHNICIAN_FIELDS,
        (Role::Citizen | Role::Institution, DonationStatus::Pending) => DEVICE_INFO_FIELDS,
        (Role::Citizen | Role::Institution, _) => &[],
    }
}

/// Evaluate `action` on `record` for `principal`.
///
/// `payload` is only consulted for writes.
pub fn can_access(
    principal: &Principal,
    record: &DonationRecord,
    action: Action,
    payload: &DonationPatch,
) -> AccessDecision {
    if !is_party(principal, record) {
        return AccessDecision::deny(DenyReason::Forbidden);
    }

    match action {
        Action::Read => AccessDecision::allow(DonationPatch::default(), Vec::new()),
        Action::Write => narrow_write(principal, record, payload),
    }
}

fn narrow_write(
    principal: &Principal,
    record: &DonationRecord,
    payload: &DonationPatch,
) -> AccessDecision {
    let allowed = writable_fields(principal.role, record.status);
    if allowed.is_empty() {
        return AccessDecision::deny(DenyReason::Forbidden);
    }

    let mut filtered = payload.clone();
    let mut dropped = Vec::new();
    for field in payload.present_fields() {
        if !allowed.contains(&field) && filtered.clear(field) {
            dropped.push(field);
        }
    }

    if let Some(requested) = filtered.status {
        // Restating the current status is a no-op, not a transition.
        if requested == record.status {
            filtered.status = None;
        } else if requested == DonationStatus::Assigned
            || !next_status_allowed(record.status, requested)
        {
            return AccessDecision::deny(DenyReason::InvalidTransition);
        }
    }

    AccessDecision::allow(filtered, dropped)
}

/// Whether `principal` may claim `record` for processing.
///
/// Only pending, unassigned donations can be claimed; admins may claim on
/// behalf of a technician.
pub fn can_accept(principal: &Principal, record: &DonationRecord) -> Result<(), DenyReason> {
    if !matches!(principal.role, Role::Technician | Role::Admin) {
        return Err(DenyReason::Forbidden);
    }
    if record.assigned_technician_id.is_some() {
        return Err(DenyReason::Forbidden);
    }
    if !next_status_allowed(record.status, DonationStatus::Assigned) {
        return Err(DenyReason::InvalidTransition);
    }
    Ok(())
}
