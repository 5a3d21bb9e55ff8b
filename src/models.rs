use bigdecimal::{BigDecimal, ToPrimitive};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

// ============ Enumerations ============

/// Kind of scrap a customer can sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ScrapCategory {
    Paper,
    Plastic,
    Metal,
    Ewaste,
}

impl ScrapCategory {
    pub const ALL: [ScrapCategory; 4] = [
        ScrapCategory::Paper,
        ScrapCategory::Plastic,
        ScrapCategory::Metal,
        ScrapCategory::Ewaste,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScrapCategory::Paper => "paper",
            ScrapCategory::Plastic => "plastic",
            ScrapCategory::Metal => "metal",
            ScrapCategory::Ewaste => "ewaste",
        }
    }
}

impl FromStr for ScrapCategory {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|c| c.as_str() == s).ok_or(())
    }
}

impl fmt::Display for ScrapCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the scrap is collected from the customer or dropped off by them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PickupType {
    Pickup,
    Dropoff,
}

impl PickupType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PickupType::Pickup => "pickup",
            PickupType::Dropoff => "dropoff",
        }
    }
}

impl FromStr for PickupType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pickup" => Ok(PickupType::Pickup),
            "dropoff" => Ok(PickupType::Dropoff),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Upi,
    Cash,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Upi => "upi",
            PaymentMethod::Cash => "cash",
        }
    }

    /// Prefix used for transaction identifiers paid with this method.
    pub fn transaction_prefix(&self) -> &'static str {
        match self {
            PaymentMethod::Upi => "TXN",
            PaymentMethod::Cash => "COD",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "upi" => Ok(PaymentMethod::Upi),
            "cash" => Ok(PaymentMethod::Cash),
            _ => Err(()),
        }
    }
}

/// Lifecycle of a transaction. Only `Confirmed` is written by this service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Confirmed => "confirmed",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Cancelled => "cancelled",
        }
    }
}

// ============ Database Models ============

/// Result row of the `calculate_scrap_price` stored procedure.
#[derive(Debug, Clone, FromRow)]
pub struct PriceQuote {
    pub estimated_price: BigDecimal,
    pub confidence_score: i32,
}

impl PriceQuote {
    /// Price as a JSON-friendly float.
    pub fn estimated_price_f64(&self) -> f64 {
        self.estimated_price.to_f64().unwrap_or(0.0)
    }
}

/// A persisted pickup transaction as returned to its owner.
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct TransactionRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Human facing identifier such as `TXN-20261019-9F3A0C1B`.
    pub transaction_id: String,
    pub categories: Vec<String>,
    pub weight_kg: f64,
    pub location: String,
    pub estimated_price: f64,
    pub confidence_score: i32,
    pub pickup_date: NaiveDate,
    pub pickup_time: String,
    pub pickup_type: String,
    pub payment_method: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct Profile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Checkout data that passed validation and is ready to be priced and stored.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedTransaction {
    pub categories: Vec<ScrapCategory>,
    pub weight_kg: f64,
    pub location: String,
    pub pickup_date: NaiveDate,
    pub pickup_time: String,
    pub pickup_type: PickupType,
    pub payment_method: PaymentMethod,
}

// ============ API Request/Response Models ============
//
// Request fields are kept as raw JSON so that a wrongly typed field gets the
// same message as a missing one.

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PriceRequest {
    #[schema(value_type = Vec<String>, example = json!(["paper", "metal"]))]
    pub categories: Option<Value>,
    #[schema(value_type = f64, example = 12.5)]
    pub weight: Option<Value>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PriceResponse {
    pub estimated_price: f64,
    pub confidence_score: i32,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransactionRequest {
    #[schema(value_type = Vec<String>)]
    pub categories: Option<Value>,
    #[schema(value_type = f64)]
    pub weight: Option<Value>,
    #[schema(value_type = String)]
    pub location: Option<Value>,
    /// `YYYY-MM-DD` or an RFC 3339 timestamp.
    #[schema(value_type = String)]
    pub pickup_date: Option<Value>,
    #[schema(value_type = String)]
    pub pickup_time: Option<Value>,
    #[schema(value_type = PickupType)]
    pub pickup_type: Option<Value>,
    #[schema(value_type = PaymentMethod)]
    pub payment_method: Option<Value>,
    /// Four digit code, required for UPI payments.
    #[schema(value_type = Option<String>)]
    pub otp: Option<Value>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransactionResponse {
    pub transaction_id: String,
    pub estimated_price: f64,
    pub status: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EstimateWeightRequest {
    /// Image as a base64 data URL.
    #[schema(value_type = String)]
    pub image_base64: Option<Value>,
}

/// AI estimate of an uploaded scrap photo.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct WeightEstimate {
    pub weight: f64,
    pub category: ScrapCategory,
    pub confidence: f64,
}

impl Default for WeightEstimate {
    fn default() -> Self {
        Self {
            weight: 5.0,
            category: ScrapCategory::Paper,
            confidence: 50.0,
        }
    }
}
