use crate::invariants::{
    assert_denial_is_empty, assert_payload_within, assert_valid_status_transition,
};
use crate::{
    can_accept, can_access, writable_fields, Action, DenyReason, DonationField, DonationPatch,
    DonationRecord, DonationStatus, Principal, Role, DEVICE_INFO_FIELDS, TECHNICIAN_FIELDS,
};

const OWNER: i64 = 10;
const TECH: i64 = 20;
const STRANGER: i64 = 30;

fn record(status: DonationStatus, technician: Option<i64>) -> DonationRecord {
    DonationRecord {
        owner_id: OWNER,
        assigned_technician_id: technician,
        status,
        category_id: Some(1),
        condition_id: Some(2),
        weight_kg: 4.0,
        quantity: 1,
    }
}

fn mixed_payload(status: Option<DonationStatus>) -> DonationPatch {
    DonationPatch {
        brand: Some("Philips".to_string()),
        weight_kg: Some(12.5),
        notes: Some("screen cracked".to_string()),
        status,
        ..Default::default()
    }
}

fn read(principal: Principal, rec: &DonationRecord) -> Result<DonationPatch, DenyReason> {
    let decision = can_access(&principal, rec, Action::Read, &DonationPatch::default());
    assert_denial_is_empty(&decision);
    decision.into_result()
}

#[test]
fn test_admin_reads_everything() {
    let admin = Principal::new(1, Role::Admin);
    for status in DonationStatus::ALL {
        assert!(read(admin, &record(status, None)).is_ok());
    }
}

#[test]
fn test_technician_reads_only_assigned() {
    let tech = Principal::new(TECH, Role::Technician);
    assert!(read(tech, &record(DonationStatus::Assigned, Some(TECH))).is_ok());
    assert_eq!(
        read(tech, &record(DonationStatus::Assigned, Some(STRANGER))),
        Err(DenyReason::Forbidden)
    );
    assert_eq!(
        read(tech, &record(DonationStatus::Pending, None)),
        Err(DenyReason::Forbidden)
    );
}

#[test]
fn test_technician_owning_id_is_not_enough() {
    // A technician whose id happens to match owner_id is still judged by assignment.
    let tech = Principal::new(OWNER, Role::Technician);
    assert_eq!(
        read(tech, &record(DonationStatus::Assigned, Some(TECH))),
        Err(DenyReason::Forbidden)
    );
}

#[test]
fn test_owner_reads_own_record() {
    for role in [Role::Citizen, Role::Institution] {
        let completed = record(DonationStatus::Completed, Some(TECH));
        assert!(read(Principal::new(OWNER, role), &completed).is_ok());
        assert_eq!(
            read(Principal::new(STRANGER, role), &record(DonationStatus::Pending, None)),
            Err(DenyReason::Forbidden)
        );
    }
}

#[test]
fn test_technician_write_is_narrowed() {
    let tech = Principal::new(TECH, Role::Technician);
    let rec = record(DonationStatus::Assigned, Some(TECH));
    let decision = can_access(
        &tech,
        &rec,
        Action::Write,
        &mixed_payload(Some(DonationStatus::InProcess)),
    );
    assert!(decision.allowed);
    assert_payload_within(&decision, TECHNICIAN_FIELDS);
    assert_eq!(decision.filtered_payload.status, Some(DonationStatus::InProcess));
    assert_eq!(decision.filtered_payload.notes.as_deref(), Some("screen cracked"));
    assert_eq!(decision.filtered_payload.brand, None);
    assert_eq!(
        decision.dropped,
        vec![DonationField::Brand, DonationField::WeightKg]
    );
}

#[test]
fn test_owner_write_while_pending_keeps_device_fields() {
    let owner = Principal::new(OWNER, Role::Citizen);
    let rec = record(DonationStatus::Pending, None);
    let decision = can_access(
        &owner,
        &rec,
        Action::Write,
        &mixed_payload(Some(DonationStatus::Cancelled)),
    );
    assert!(decision.allowed);
    assert_payload_within(&decision, DEVICE_INFO_FIELDS);
    assert_eq!(decision.filtered_payload.brand.as_deref(), Some("Philips"));
    assert_eq!(decision.filtered_payload.weight_kg, Some(12.5));
    // status and notes are silently dropped, not an error
    assert_eq!(decision.filtered_payload.status, None);
    assert_eq!(decision.filtered_payload.notes, None);
}

#[test]
fn test_owner_cannot_write_after_pending() {
    let owner = Principal::new(OWNER, Role::Institution);
    for status in [
        DonationStatus::Assigned,
        DonationStatus::InProcess,
        DonationStatus::Completed,
        DonationStatus::Cancelled,
    ] {
        let decision = can_access(
            &owner,
            &record(status, Some(TECH)),
            Action::Write,
            &mixed_payload(None),
        );
        assert_denial_is_empty(&decision);
        assert_eq!(decision.reason, Some(DenyReason::Forbidden), "{status}");
    }
}

#[test]
fn test_stranger_write_is_forbidden() {
    let stranger = Principal::new(STRANGER, Role::Citizen);
    let decision = can_access(
        &stranger,
        &record(DonationStatus::Pending, None),
        Action::Write,
        &mixed_payload(None),
    );
    assert_denial_is_empty(&decision);
    assert_eq!(decision.reason, Some(DenyReason::Forbidden));
}

#[test]
fn test_invalid_transition_is_denied() {
    let tech = Principal::new(TECH, Role::Technician);
    let rec = record(DonationStatus::Assigned, Some(TECH));
    let decision = can_access(
        &tech,
        &rec,
        Action::Write,
        &mixed_payload(Some(DonationStatus::Completed)),
    );
    assert_denial_is_empty(&decision);
    assert_eq!(decision.reason, Some(DenyReason::InvalidTransition));
}

#[test]
fn test_admin_is_bound_by_transition_table() {
    let admin = Principal::new(1, Role::Admin);
    let rec = record(DonationStatus::Completed, Some(TECH));
    let patch = DonationPatch {
        status: Some(DonationStatus::Pending),
        ..Default::default()
    };
    let decision = can_access(&admin, &rec, Action::Write, &patch);
    assert_eq!(decision.reason, Some(DenyReason::InvalidTransition));

    let keep_all = can_access(
        &admin,
        &record(DonationStatus::Pending, None),
        Action::Write,
        &mixed_payload(None),
    );
    assert!(keep_all.allowed);
    assert!(keep_all.dropped.is_empty());
    assert_eq!(keep_all.filtered_payload, mixed_payload(None));
}

#[test]
fn test_restating_current_status_is_a_no_op() {
    let tech = Principal::new(TECH, Role::Technician);
    let rec = record(DonationStatus::InProcess, Some(TECH));
    let patch = DonationPatch {
        status: Some(DonationStatus::InProcess),
        notes: Some("still testing".to_string()),
        ..Default::default()
    };
    let filtered = can_access(&tech, &rec, Action::Write, &patch)
        .into_result()
        .expect("allowed");
    assert_eq!(filtered.status, None);
    assert_eq!(filtered.notes.as_deref(), Some("still testing"));
}

#[test]
fn test_writes_never_assign() {
    let admin = Principal::new(1, Role::Admin);
    let patch = DonationPatch {
        status: Some(DonationStatus::Assigned),
        ..Default::default()
    };
    let pending = record(DonationStatus::Pending, None);
    let decision = can_access(&admin, &pending, Action::Write, &patch);
    assert_denial_is_empty(&decision);
    assert_eq!(decision.reason, Some(DenyReason::InvalidTransition));
}

#[test]
fn test_allowed_writes_follow_the_transition_table() {
    let admin = Principal::new(1, Role::Admin);
    let tech = Principal::new(TECH, Role::Technician);
    let cases = [
        (admin, DonationStatus::Pending, None, DonationStatus::Cancelled),
        (tech, DonationStatus::Assigned, Some(TECH), DonationStatus::InProcess),
        (tech, DonationStatus::Assigned, Some(TECH), DonationStatus::Cancelled),
        (tech, DonationStatus::InProcess, Some(TECH), DonationStatus::Completed),
        (admin, DonationStatus::InProcess, Some(TECH), DonationStatus::Cancelled),
    ];
    for (principal, from, technician, to) in cases {
        let patch = DonationPatch {
            status: Some(to),
            ..Default::default()
        };
        let filtered = can_access(&principal, &record(from, technician), Action::Write, &patch)
            .into_result()
            .expect("allowed");
        assert_eq!(filtered.status, Some(to));
        assert_valid_status_transition(from, to);
    }
}

#[test]
fn test_allowlist_table() {
    assert_eq!(
        writable_fields(Role::Technician, DonationStatus::Assigned),
        TECHNICIAN_FIELDS
    );
    assert!(writable_fields(Role::Technician, DonationStatus::Completed).is_empty());
    assert_eq!(writable_fields(Role::Citizen, DonationStatus::Pending), DEVICE_INFO_FIELDS);
    assert!(writable_fields(Role::Institution, DonationStatus::InProcess).is_empty());
    assert_eq!(writable_fields(Role::Admin, DonationStatus::Cancelled).len(), 11);
}

#[test]
fn test_accepting_donations() {
    let tech = Principal::new(TECH, Role::Technician);
    assert_eq!(can_accept(&tech, &record(DonationStatus::Pending, None)), Ok(()));
    assert_eq!(
        can_accept(&tech, &record(DonationStatus::Pending, Some(STRANGER))),
        Err(DenyReason::Forbidden)
    );
    assert_eq!(
        can_accept(&tech, &record(DonationStatus::Cancelled, None)),
        Err(DenyReason::InvalidTransition)
    );
    assert_eq!(
        can_accept(
            &Principal::new(OWNER, Role::Citizen),
            &record(DonationStatus::Pending, None)
        ),
        Err(DenyReason::Forbidden)
    );
    assert_eq!(
        can_accept(&Principal::new(1, Role::Admin), &record(DonationStatus::Pending, None)),
        Ok(())
    );
}

#[test]
fn test_patch_wire_format() {
    let patch: DonationPatch =
        serde_json::from_str(r#"{"status":"in_process","notes":"ok","unknown":1}"#).unwrap();
    assert_eq!(patch.status, Some(DonationStatus::InProcess));
    assert_eq!(
        patch.present_fields(),
        vec![DonationField::Status, DonationField::Notes]
    );
}
