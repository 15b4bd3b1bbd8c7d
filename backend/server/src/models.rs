//! Row types, request bodies and response shapes.

use raee_rules::{DonationPatch, DonationRecord, DonationStatus, Role, UnknownVariant};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;

use crate::errors::{ApiError, Result};

// ─────────────────────────────────────────────────────────
// Stored rows
// ─────────────────────────────────────────────────────────

/// A user account as stored in the database.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct UserRecord {
    pub id: i64,
    pub dni: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub phone: String,
    pub province: String,
    pub municipality: String,
    pub role: String,
    pub points: i64,
    pub created_at: i64,
}

impl UserRecord {
    pub fn role(&self) -> Result<Role> {
        self.role
            .parse()
            .map_err(|e: UnknownVariant| ApiError::Database(sqlx::Error::Decode(Box::new(e))))
    }
}

/// A donation as stored in the database.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DonationRow {
    pub id: i64,
    pub owner_id: i64,
    pub assigned_technician_id: Option<i64>,
    pub status: String,
    pub category_id: Option<i64>,
    pub condition_id: Option<i64>,
    pub device_type: String,
    pub brand: String,
    pub model: String,
    pub description: Option<String>,
    pub weight_kg: f64,
    pub quantity: i64,
    pub notes: Option<String>,
    pub processed_date: Option<String>,
    pub points_awarded: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl DonationRow {
    pub fn status(&self) -> Result<DonationStatus> {
        self.status
            .parse()
            .map_err(|e: UnknownVariant| ApiError::Database(sqlx::Error::Decode(Box::new(e))))
    }

    /// The fields the authorization gate and reward calculator look at.
    pub fn to_record(&self) -> Result<DonationRecord> {
        Ok(DonationRecord {
            owner_id: self.owner_id,
            assigned_technician_id: self.assigned_technician_id,
            status: self.status()?,
            category_id: self.category_id,
            condition_id: self.condition_id,
            weight_kg: self.weight_kg,
            quantity: self.quantity,
        })
    }
}

/// Technician profile joined with its user account.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TechnicianRecord {
    pub user_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub province: String,
    pub municipality: String,
    pub workshop_address: String,
    pub specialties: Json<Vec<String>>,
    pub certifications: Json<Vec<String>>,
    pub opening_hours: String,
    pub services: Json<Vec<String>>,
    pub description: String,
    pub available: bool,
}

/// Institution profile joined with its user account.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct InstitutionRecord {
    pub user_id: i64,
    pub email: String,
    pub province: String,
    pub municipality: String,
    pub name: String,
    pub kind: String,
    pub address: String,
    pub postal_code: String,
    pub contact_phone: String,
    pub contact_email: String,
    pub manager_name: String,
    pub programs_description: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CategoryRecord {
    pub id: i64,
    pub name: String,
    pub base_points: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ConditionRecord {
    pub id: i64,
    pub name: String,
    pub multiplier: f64,
}

// ─────────────────────────────────────────────────────────
// Request bodies
// ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TechnicianProfileInput {
    pub workshop_address: String,
    pub specialties: Vec<String>,
    pub certifications: Vec<String>,
    pub opening_hours: String,
    pub services: Vec<String>,
    pub description: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct InstitutionProfileInput {
    pub name: String,
    pub kind: String,
    pub address: String,
    pub postal_code: String,
    pub contact_phone: String,
    pub contact_email: String,
    pub manager_name: String,
    pub programs_description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub dni: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub phone: String,
    pub province: String,
    pub municipality: String,
    pub role: Role,
    #[serde(default)]
    pub technician: Option<TechnicianProfileInput>,
    #[serde(default)]
    pub institution: Option<InstitutionProfileInput>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub dni: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateDonationRequest {
    pub device_type: String,
    pub brand: String,
    pub model: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub condition_id: Option<i64>,
    #[serde(default)]
    pub weight_kg: f64,
    #[serde(default = "one")]
    pub quantity: i64,
}

fn one() -> i64 {
    1
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: DonationStatus,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub processed_date: Option<String>,
}

impl From<StatusUpdateRequest> for DonationPatch {
    fn from(req: StatusUpdateRequest) -> Self {
        DonationPatch {
            status: Some(req.status),
            notes: req.notes,
            processed_date: req.processed_date,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AcceptRequest {
    /// Technician to assign. Required when an admin assigns on someone's behalf.
    #[serde(default)]
    pub technician_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TechnicianProfileUpdate {
    pub workshop_address: Option<String>,
    pub specialties: Option<Vec<String>>,
    pub certifications: Option<Vec<String>>,
    pub opening_hours: Option<String>,
    pub services: Option<Vec<String>>,
    pub description: Option<String>,
    pub available: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct InstitutionProfileUpdate {
    pub name: Option<String>,
    pub kind: Option<String>,
    pub address: Option<String>,
    pub postal_code: Option<String>,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
    pub manager_name: Option<String>,
    pub programs_description: Option<String>,
}

// ─────────────────────────────────────────────────────────
// Listing queries
// ─────────────────────────────────────────────────────────

/// Resolved page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: u32,
    pub size: u32,
}

impl Page {
    /// Clamp the requested page to `1..` and the size to `1..=max`.
    pub fn resolve(
        page: Option<u32>,
        per_page: Option<u32>,
        default_size: u32,
        max_size: u32,
    ) -> Self {
        Page {
            number: page.unwrap_or(1).max(1),
            size: per_page.unwrap_or(default_size).clamp(1, max_size),
        }
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.number - 1) * i64::from(self.size)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.size)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DonationListQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub status: Option<DonationStatus>,
    pub category_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TechnicianListQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub available: Option<bool>,
    pub province: Option<String>,
    /// Exact match against one entry of the specialties list.
    pub specialty: Option<String>,
    /// Substring of name, specialties or workshop address.
    pub search: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InstitutionListQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub kind: Option<String>,
    pub province: Option<String>,
    /// Substring of name, manager, contact email or address.
    pub search: Option<String>,
}

// ─────────────────────────────────────────────────────────
// Response shapes
// ─────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Pagination {
    pub current_page: u32,
    pub per_page: u32,
    pub total: i64,
    pub total_pages: i64,
}

impl Pagination {
    pub fn new(page: Page, total: i64) -> Self {
        let size = i64::from(page.size);
        Pagination {
            current_page: page.number,
            per_page: page.size,
            total,
            total_pages: (total + size - 1) / size,
        }
    }
}

/// Donations per status within some scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct StatusCounts {
    pub total: i64,
    pub pending: i64,
    pub assigned: i64,
    pub in_process: i64,
    pub completed: i64,
    pub cancelled: i64,
}

impl StatusCounts {
    /// Assigned plus in process.
    pub fn open(&self) -> i64 {
        self.assigned + self.in_process
    }

    /// Completed share of the total as a percentage, two decimals.
    pub fn completion_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let rate = self.completed as f64 / self.total as f64 * 100.0;
        (rate * 100.0).round() / 100.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct DeviceTypeCount {
    pub device_type: String,
    pub total: i64,
}

#[derive(Debug, Serialize)]
pub struct TechnicianStats {
    pub user_id: i64,
    pub jobs: StatusCounts,
    pub completion_rate: f64,
    pub points: i64,
    pub device_types: Vec<DeviceTypeCount>,
}

#[derive(Debug, Serialize)]
pub struct InstitutionStats {
    pub user_id: i64,
    pub donations: StatusCounts,
    pub points: i64,
    pub device_types: Vec<DeviceTypeCount>,
}

#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub data: Vec<T>,
    pub pagination: Pagination,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize)]
pub struct RegisterResponse {
    pub user_id: i64,
    pub role: Role,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserRecord,
}

#[derive(Serialize)]
pub struct PointsResponse {
    pub user_id: i64,
    pub points: i64,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}
