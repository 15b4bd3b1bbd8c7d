//! # Types
//!
//! Shared data structures used across the rules crate.
//!
//! ## Design decisions
//!
//! ### One role enum
//!
//! Every caller is described by a single tagged [`Role`]. Strings are parsed
//! into it exactly once, at the credential boundary.
//!
//! ### Status as a Finite-State Machine
//!
//! [`DonationStatus`] follows a forward-only lifecycle with one escape hatch:
//!
//! ```text
//! Pending ──► Assigned ──► InProcess ──► Completed
//!    │            │             │
//!    └────────────┴─────────────┴──► Cancelled
//! ```
//!
//! `Completed` and `Cancelled` are terminal. The transition table lives in
//! [`crate::status`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Kind of account behind a request.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Citizen,
    Institution,
    Technician,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Citizen => "citizen",
            Self::Institution => "institution",
            Self::Technician => "technician",
            Self::Admin => "admin",
        }
    }

    /// Citizens and institutions create donations and collect points.
    pub fn is_donor(&self) -> bool {
        matches!(self, Self::Citizen | Self::Institution)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "citizen" => Ok(Self::Citizen),
            "institution" => Ok(Self::Institution),
            "technician" => Ok(Self::Technician),
            "admin" => Ok(Self::Admin),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

/// Lifecycle status of a donation.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DonationStatus {
    /// Registered by the donor, waiting for a technician.
    Pending,
    /// Claimed by a technician.
    Assigned,
    /// Technician is working on the device.
    InProcess,
    /// Processing finished; points awarded.
    Completed,
    /// Withdrawn before completion.
    Cancelled,
}

impl DonationStatus {
    pub const ALL: [DonationStatus; 5] = [
        Self::Pending,
        Self::Assigned,
        Self::InProcess,
        Self::Completed,
        Self::Cancelled,
    ];

    /// Short identifier used in the database and on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Assigned => "assigned",
            Self::InProcess => "in_process",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

impl fmt::Display for DonationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DonationStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownVariant(s.to_string()))
    }
}

/// A string that does not name any variant of the target enum.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown variant `{0}`")]
pub struct UnknownVariant(pub String);

/// The authenticated caller, derived once per request from a verified token.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Principal {
    pub id: i64,
    pub role: Role,
}

impl Principal {
    pub fn new(id: i64, role: Role) -> Self {
        Self { id, role }
    }
}

/// The subset of a stored donation the rules look at.
#[derive(Clone, Debug, PartialEq)]
pub struct DonationRecord {
    pub owner_id: i64,
    pub assigned_technician_id: Option<i64>,
    pub status: DonationStatus,
    pub category_id: Option<i64>,
    pub condition_id: Option<i64>,
    pub weight_kg: f64,
    pub quantity: i64,
}

/// Operation a caller wants to perform on a donation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Action {
    Read,
    Write,
}

/// Every writable column of a donation.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DonationField {
    DeviceType,
    Brand,
    Model,
    Description,
    CategoryId,
    ConditionId,
    WeightKg,
    Quantity,
    Status,
    Notes,
    ProcessedDate,
}

/// Partial update of a donation. `None` means "leave unchanged".
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DonationPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight_kg: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<DonationStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_date: Option<String>,
}

impl DonationPatch {
    /// Fields that carry a value in this patch.
    pub fn present_fields(&self) -> Vec<DonationField> {
        use DonationField::*;
        let mut fields = Vec::new();
        if self.device_type.is_some() {
            fields.push(DeviceType);
        }
        if self.brand.is_some() {
            fields.push(Brand);
        }
        if self.model.is_some() {
            fields.push(Model);
        }
        if self.description.is_some() {
            fields.push(Description);
        }
        if self.category_id.is_some() {
            fields.push(CategoryId);
        }
        if self.condition_id.is_some() {
            fields.push(ConditionId);
        }
        if self.weight_kg.is_some() {
            fields.push(WeightKg);
        }
        if self.quantity.is_some() {
            fields.push(Quantity);
        }
        if self.status.is_some() {
            fields.push(Status);
        }
        if self.notes.is_some() {
            fields.push(Notes);
        }
        if self.processed_date.is_some() {
            fields.push(ProcessedDate);
        }
        fields
    }

    /// Clear `field`, returning whether it held a value.
    pub fn clear(&mut self, field: DonationField) -> bool {
        use DonationField::*;
        match field {
            DeviceType => self.device_type.take().is_some(),
            Brand => self.brand.take().is_some(),
            Model => self.model.take().is_some(),
            Description => self.description.take().is_some(),
            CategoryId => self.category_id.take().is_some(),
            ConditionId => self.condition_id.take().is_some(),
            WeightKg => self.weight_kg.take().is_some(),
            Quantity => self.quantity.take().is_some(),
            Status => self.status.take().is_some(),
            Notes => self.notes.take().is_some(),
            ProcessedDate => self.processed_date.take().is_some(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.present_fields().is_empty()
    }
}
