use serde::{Deserialize, Deserializer, Serialize};

use crate::error::AppError;

// ---------------------------------------------------------------------------
// Fetch filter
// ---------------------------------------------------------------------------

/// Event kinds accepted by the `/events` endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Created,
    Successful,
    Cancelled,
    BidEntered,
    BidWithdrawn,
    Transfer,
    Approve,
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EventType::Created => "created",
            EventType::Successful => "successful",
            EventType::Cancelled => "cancelled",
            EventType::BidEntered => "bid_entered",
            EventType::BidWithdrawn => "bid_withdrawn",
            EventType::Transfer => "transfer",
            EventType::Approve => "approve",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for EventType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "created" => Ok(EventType::Created),
            "successful" => Ok(EventType::Successful),
            "cancelled" => Ok(EventType::Cancelled),
            "bid_entered" => Ok(EventType::BidEntered),
            "bid_withdrawn" => Ok(EventType::BidWithdrawn),
            "transfer" => Ok(EventType::Transfer),
            "approve" => Ok(EventType::Approve),
            other => Err(AppError::Config(format!("unknown EVENT_TYPE: {other}"))),
        }
    }
}

/// Query parameters for one `/events` request. Serialized straight into the
/// query string; unset filters are left out.
#[derive(Debug, Clone, Serialize)]
pub struct FetchFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_contract_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection_slug: Option<String>,
    pub event_type: EventType,
    pub limit: u32,
}

// ---------------------------------------------------------------------------
// Raw API payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct EventsResponse {
    pub asset_events: Vec<RawSaleEvent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawSaleEvent {
    pub id: i64,
    #[serde(default)]
    pub quantity: Option<String>,
    pub seller: Account,
    pub winner_account: Account,
    pub asset: Asset,
    /// Smallest-unit amount. The API sends a decimal string.
    #[serde(deserialize_with = "number_or_string")]
    pub total_price: f64,
    pub payment_token: PaymentToken,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    #[serde(default)]
    pub user: Option<User>,
    pub address: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Asset {
    pub id: i64,
    pub token_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    pub permalink: String,
    pub collection: Collection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Collection {
    pub name: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentToken {
    pub symbol: String,
    pub decimals: u32,
    #[serde(deserialize_with = "number_or_string")]
    pub usd_price: f64,
}

/// Accepts `"1500000000000000000"` as well as `1.5e18`.
fn number_or_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(f64),
        Str(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Num(n) => Ok(n),
        Raw::Str(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|e| serde::de::Error::custom(format!("invalid number {s:?}: {e}"))),
    }
}

// ---------------------------------------------------------------------------
// Normalized sale
// ---------------------------------------------------------------------------

/// Display-ready view of one sale, built per event and dropped after send.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedSale {
    pub event_id: i64,
    pub asset_id: i64,
    pub asset_name: String,
    pub collection_name: String,
    pub price: SalePrice,
    pub buyer: Profile,
    pub seller: Profile,
    /// Collection icon, shown in the footer.
    pub icon: String,
    /// Asset image, shown as the thumbnail.
    pub image: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SalePrice {
    pub native: f64,
    /// Whole dollars with thousands separators, e.g. `3,000`.
    pub usd: String,
    pub currency: String,
}

impl SalePrice {
    /// True for stablecoins, where a second USD line would just repeat the price.
    pub fn is_usd_pegged(&self) -> bool {
        self.currency.contains("USD")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub short: String,
    pub url: String,
}
