//! Input checks shared by the handlers. Each returns `ApiError::Validation`
//! naming the offending field.

use raee_rules::DonationPatch;

use crate::errors::{ApiError, Result};
use crate::models::{CreateDonationRequest, RegisterRequest};

const MAX_TEXT: usize = 100;

/// Largest batch a single donation may declare.
pub const MAX_QUANTITY: i64 = 1_000;

/// Heaviest unit a single donation may declare, in kilograms.
pub const MAX_WEIGHT_KG: f64 = 1_000.0;

pub fn text(field: &str, value: &str, min: usize, max: usize) -> Result<()> {
    let len = value.trim().chars().count();
    if len < min || len > max {
        return Err(ApiError::Validation(format!(
            "{field} must be between {min} and {max} characters"
        )));
    }
    Ok(())
}

pub fn email(value: &str) -> Result<()> {
    let value = value.trim();
    let valid = match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    };
    if !valid || value.contains(char::is_whitespace) {
        return Err(ApiError::Validation("email is not a valid address".to_string()));
    }
    Ok(())
}

pub fn weight(value: f64) -> Result<()> {
    if !value.is_finite() || !(0.0..=MAX_WEIGHT_KG).contains(&value) {
        return Err(ApiError::Validation(format!(
            "weight_kg must be between 0 and {MAX_WEIGHT_KG}"
        )));
    }
    Ok(())
}

pub fn quantity(value: i64) -> Result<()> {
    if !(1..=MAX_QUANTITY).contains(&value) {
        return Err(ApiError::Validation(format!(
            "quantity must be between 1 and {MAX_QUANTITY}"
        )));
    }
    Ok(())
}

/// Processing dates are RFC 3339 timestamps, like the ones the server stamps.
pub fn processed_date(value: &str) -> Result<()> {
    chrono::DateTime::parse_from_rfc3339(value).map_err(|_| {
        ApiError::Validation("processed_date must be an RFC 3339 timestamp".to_string())
    })?;
    Ok(())
}

pub fn registration(req: &RegisterRequest) -> Result<()> {
    text("dni", &req.dni, 7, 20)?;
    text("first_name", &req.first_name, 2, MAX_TEXT)?;
    text("last_name", &req.last_name, 2, MAX_TEXT)?;
    email(&req.email)?;
    if req.password.chars().count() < 6 {
        return Err(ApiError::Validation(
            "password must be at least 6 characters".to_string(),
        ));
    }
    text("phone", &req.phone, 10, 20)?;
    text("province", &req.province, 1, MAX_TEXT)?;
    text("municipality", &req.municipality, 1, MAX_TEXT)?;
    if let Some(institution) = &req.institution {
        text("institution.name", &institution.name, 2, MAX_TEXT)?;
    }
    Ok(())
}

pub fn new_donation(req: &CreateDonationRequest) -> Result<()> {
    text("device_type", &req.device_type, 1, MAX_TEXT)?;
    text("brand", &req.brand, 1, MAX_TEXT)?;
    text("model", &req.model, 1, MAX_TEXT)?;
    weight(req.weight_kg)?;
    quantity(req.quantity)
}

/// Checks the values of an already-narrowed patch.
pub fn patch(patch: &DonationPatch) -> Result<()> {
    if let Some(v) = &patch.device_type {
        text("device_type", v, 1, MAX_TEXT)?;
    }
    if let Some(v) = &patch.brand {
        text("brand", v, 1, MAX_TEXT)?;
    }
    if let Some(v) = &patch.model {
        text("model", v, 1, MAX_TEXT)?;
    }
    if let Some(v) = patch.weight_kg {
        weight(v)?;
    }
    if let Some(v) = patch.quantity {
        quantity(v)?;
    }
    if let Some(v) = &patch.processed_date {
        processed_date(v)?;
    }
    Ok(())
}
