use tracing::warn;

use crate::types::{Account, NormalizedSale, Profile, RawSaleEvent, SalePrice};

/// Maps a raw sale event to the fields the embed shows. No I/O.
pub fn normalize(event: &RawSaleEvent, profile_base_url: &str) -> NormalizedSale {
    let token = &event.payment_token;
    let native = native_amount(event.total_price, token.decimals);
    let usd = (native * token.usd_price).floor();
    if !usd.is_finite() || usd < 0.0 {
        warn!(
            event_id = event.id,
            total_price = event.total_price,
            usd_price = token.usd_price,
            "Unexpected USD amount {usd} for event {}",
            event.id
        );
    }

    NormalizedSale {
        event_id: event.id,
        asset_id: event.asset.id,
        asset_name: event
            .asset
            .name
            .clone()
            .unwrap_or_else(|| format!("#{}", event.asset.token_id)),
        collection_name: event.asset.collection.name.clone(),
        price: SalePrice {
            native,
            usd: format_usd(usd),
            currency: token.symbol.clone(),
        },
        buyer: profile(&event.winner_account, profile_base_url),
        seller: profile(&event.seller, profile_base_url),
        icon: event.asset.collection.image_url.clone().unwrap_or_default(),
        image: event.asset.image_url.clone().unwrap_or_default(),
        url: event.asset.permalink.clone(),
    }
}

/// `raw / 10^decimals`.
pub fn native_amount(raw: f64, decimals: u32) -> f64 {
    raw / 10f64.powi(decimals as i32)
}

/// Username when the account has one, shortened address otherwise. The link
/// always points at the full address.
fn profile(account: &Account, base_url: &str) -> Profile {
    let short = account
        .user
        .as_ref()
        .and_then(|u| u.username.clone())
        .unwrap_or_else(|| shorten_address(&account.address));
    Profile {
        short,
        url: format!("{base_url}{}", account.address),
    }
}

/// Replaces the first occurrence of characters `[4, 38)` with `…`.
///
/// A 42-char hex address becomes `0x12…5678`. The range is clamped to the
/// input length, so shorter strings lose everything after index 4, and an
/// input of 4 chars or fewer gets the ellipsis prepended.
pub fn shorten_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    let end = chars.len().min(38);
    let start = chars.len().min(4);
    let middle: String = chars[start..end].iter().collect();
    address.replacen(&middle, "…", 1)
}

/// Whole-dollar amount with en-US grouping. Negative values keep their sign;
/// NaN and infinities print as `NaN`, `∞` and `-∞`.
pub fn format_usd(amount: f64) -> String {
    if amount.is_nan() {
        return "NaN".to_string();
    }
    let sign = if amount < 0.0 { "-" } else { "" };
    if amount.is_infinite() {
        return format!("{sign}∞");
    }
    format!("{sign}{}", format_thousands(amount.abs() as u64))
}

/// en-US grouping: `1234567` -> `1,234,567`.
pub fn format_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
