//! Input validation shared by the pricing, checkout and estimation handlers.
//!
//! Every check returns `AppError::BadRequest` with the message shown to the
//! customer, so handlers can simply chain them with `?`.

use crate::errors::AppError;
use crate::models::{
    CreateTransactionRequest, PaymentMethod, PickupType, ScrapCategory, ValidatedTransaction,
};
use chrono::{DateTime, NaiveDate};
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

pub const MIN_WEIGHT_KG: f64 = 1.0;
pub const MAX_WEIGHT_KG: f64 = 50.0;
pub const MIN_LOCATION_CHARS: usize = 5;
pub const MAX_LOCATION_CHARS: usize = 200;
pub const ALLOWED_IMAGE_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/webp", "image/gif"];
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

fn location_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[\p{L}\p{N}\s,.\-#/()]+$").expect("valid location regex"))
}

fn otp_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9]{4}$").expect("valid otp regex"))
}

fn bad_request(msg: impl Into<String>) -> AppError {
    AppError::BadRequest(msg.into())
}

/// Requires a non-empty array made only of known scrap categories.
pub fn validate_categories(raw: Option<&Value>) -> Result<Vec<ScrapCategory>, AppError> {
    let items = match raw.and_then(Value::as_array) {
        Some(items) if !items.is_empty() => items,
        _ => return Err(bad_request("At least one category is required")),
    };

    items
        .iter()
        .map(|item| {
            item.as_str()
                .and_then(|s| s.parse::<ScrapCategory>().ok())
                .ok_or_else(|| {
                    let shown = item
                        .as_str()
                        .map(str::to_string)
                        .unwrap_or_else(|| item.to_string());
                    bad_request(format!("Invalid category: {}", shown))
                })
        })
        .collect()
}

/// Requires a JSON number within `[1, 50]` kg.
///
/// The result is rounded to the 2 decimals the `transactions.weight_kg`
/// column keeps, so the priced weight is the stored weight.
pub fn validate_weight(raw: Option<&Value>) -> Result<f64, AppError> {
    match raw.and_then(Value::as_f64) {
        Some(w) if w.is_finite() && (MIN_WEIGHT_KG..=MAX_WEIGHT_KG).contains(&w) => {
            Ok((w * 100.0).round() / 100.0)
        }
        _ => Err(bad_request("Weight must be between 1 and 50 kg")),
    }
}

/// Trims the location and checks its length and character set.
pub fn validate_location(raw: Option<&str>) -> Result<String, AppError> {
    let location = raw.map(str::trim).unwrap_or_default();
    let chars = location.chars().count();
    if !(MIN_LOCATION_CHARS..=MAX_LOCATION_CHARS).contains(&chars) {
        return Err(bad_request("Location must be between 5 and 200 characters"));
    }
    if !location_regex().is_match(location) {
        return Err(bad_request("Location contains invalid characters"));
    }
    Ok(location.to_string())
}

/// Accepts a calendar date (`2026-10-21`) or a full RFC 3339 timestamp.
pub fn parse_pickup_date(raw: Option<&str>) -> Result<NaiveDate, AppError> {
    let raw = raw.map(str::trim).unwrap_or_default();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
        .ok_or_else(|| bad_request("Invalid pickup date"))
}

pub fn validate_pickup_time(raw: Option<&str>) -> Result<String, AppError> {
    match raw.map(str::trim) {
        Some(time) if !time.is_empty() => Ok(time.to_string()),
        _ => Err(bad_request("Pickup time is required")),
    }
}

pub fn parse_pickup_type(raw: Option<&str>) -> Result<PickupType, AppError> {
    raw.and_then(|s| s.parse().ok())
        .ok_or_else(|| bad_request("Invalid pickup type"))
}

pub fn parse_payment_method(raw: Option<&str>) -> Result<PaymentMethod, AppError> {
    raw.and_then(|s| s.parse().ok())
        .ok_or_else(|| bad_request("Invalid payment method"))
}

/// UPI payments carry a 4-digit OTP. Only the format is checked.
pub fn validate_otp(method: PaymentMethod, otp: Option<&str>) -> Result<(), AppError> {
    if method != PaymentMethod::Upi {
        return Ok(());
    }
    match otp {
        Some(code) if otp_regex().is_match(code) => Ok(()),
        _ => Err(bad_request(
            "Valid 4-digit OTP is required for UPI payments",
        )),
    }
}

/// Checks an uploaded image before it is forwarded to the AI gateway.
///
/// Plain base64 and remote URLs are passed through; `data:` URLs must use an
/// allowed image type and decode to at most [`MAX_IMAGE_BYTES`].
pub fn validate_image_payload(raw: Option<&Value>) -> Result<String, AppError> {
    let image = match raw.and_then(Value::as_str) {
        Some(s) if !s.trim().is_empty() => s,
        _ => return Err(bad_request("imageBase64 is required")),
    };

    if let Some(rest) = image.strip_prefix("data:") {
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| bad_request("Malformed image data URL"))?;
        let mime = header.split(';').next().unwrap_or_default();
        if !ALLOWED_IMAGE_TYPES.contains(&mime) {
            return Err(bad_request(
                "Invalid file type. Allowed: jpeg, png, webp, gif",
            ));
        }
        if decoded_len(payload) > MAX_IMAGE_BYTES {
            return Err(bad_request("File too large. Maximum size is 5MB"));
        }
    }

    Ok(image.to_string())
}

/// Size of a base64 payload once decoded.
fn decoded_len(payload: &str) -> usize {
    let trimmed = payload.trim_end();
    let padding = trimmed.bytes().rev().take_while(|b| *b == b'=').count();
    ((trimmed.len() / 4) * 3 + (trimmed.len() % 4) * 3 / 4).saturating_sub(padding.min(2))
}

/// OTP as text. Integer JSON numbers are accepted too, so `1234` reads as "1234".
fn otp_text(raw: Option<&Value>) -> Option<String> {
    match raw? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => n.as_u64().map(|n| n.to_string()),
        _ => None,
    }
}

/// Runs every checkout check in the order the customer fills the form.
pub fn validate_transaction_request(
    req: &CreateTransactionRequest,
) -> Result<ValidatedTransaction, AppError> {
    let as_str = |v: &Option<Value>| v.as_ref().and_then(Value::as_str).map(str::to_owned);

    let categories = validate_categories(req.categories.as_ref())?;
    let weight_kg = validate_weight(req.weight.as_ref())?;
    let location = validate_location(as_str(&req.location).as_deref())?;
    let pickup_date = parse_pickup_date(as_str(&req.pickup_date).as_deref())?;
    let pickup_time = validate_pickup_time(as_str(&req.pickup_time).as_deref())?;
    let pickup_type = parse_pickup_type(as_str(&req.pickup_type).as_deref())?;
    let payment_method = parse_payment_method(as_str(&req.payment_method).as_deref())?;
    validate_otp(payment_method, otp_text(req.otp.as_ref()).as_deref())?;

    Ok(ValidatedTransaction {
        categories,
        weight_kg,
        location,
        pickup_date,
        pickup_time,
        pickup_type,
        payment_method,
    })
}
