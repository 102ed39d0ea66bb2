use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use tracing::debug;

use crate::config::{Config, EMBED_COLOR};
use crate::error::Result;
use crate::types::NormalizedSale;

// ---------------------------------------------------------------------------
// Webhook payload
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct WebhookPayload {
    pub embeds: Vec<Embed>,
}

#[derive(Debug, Serialize)]
pub struct Embed {
    pub title: String,
    pub url: String,
    pub color: u32,
    pub fields: Vec<EmbedField>,
    pub footer: EmbedFooter,
    pub timestamp: String,
    pub thumbnail: EmbedThumbnail,
}

#[derive(Debug, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct EmbedFooter {
    pub text: String,
    pub icon_url: String,
}

#[derive(Debug, Serialize)]
pub struct EmbedThumbnail {
    pub url: String,
}

/// One-embed payload for a sale. The USD line is left out for stablecoin sales.
pub fn build_payload(sale: &NormalizedSale, sent_at: DateTime<Utc>) -> WebhookPayload {
    let mut fields = vec![EmbedField {
        name: "Sale Price".to_string(),
        value: format!("{} {}", sale.price.native, sale.price.currency),
        inline: None,
    }];
    if !sale.price.is_usd_pegged() {
        fields.push(EmbedField {
            name: "Sale Price USD".to_string(),
            value: format!("${}", sale.price.usd),
            inline: None,
        });
    }
    fields.push(EmbedField {
        name: "Buyer".to_string(),
        value: format!("[{}]({})", sale.buyer.short, sale.buyer.url),
        inline: Some(true),
    });
    fields.push(EmbedField {
        name: "Seller".to_string(),
        value: format!("[{}]({})", sale.seller.short, sale.seller.url),
        inline: Some(true),
    });

    WebhookPayload {
        embeds: vec![Embed {
            title: format!("{} was purchased!", sale.asset_name),
            url: sale.url.clone(),
            color: EMBED_COLOR,
            fields,
            footer: EmbedFooter {
                text: sale.collection_name.clone(),
                icon_url: sale.icon.clone(),
            },
            timestamp: sent_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            thumbnail: EmbedThumbnail {
                url: sale.image.clone(),
            },
        }],
    }
}

// ---------------------------------------------------------------------------
// Notifier
// ---------------------------------------------------------------------------

/// Posts sale embeds to a fixed webhook URL. Cheap to clone, so each send can
/// be moved into its own task.
#[derive(Clone)]
pub struct Notifier {
    client: reqwest::Client,
    webhook_url: String,
}

impl Notifier {
    pub fn new(cfg: &Config) -> Result<Self> {
        Self::with_url(&cfg.webhook_url, cfg.http_timeout_secs)
    }

    pub fn with_url(webhook_url: &str, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            webhook_url: webhook_url.to_string(),
        })
    }

    /// One POST per sale. A non-2xx answer is returned as an error.
    pub async fn send(&self, sale: &NormalizedSale) -> Result<()> {
        let payload = build_payload(sale, Utc::now());
        if tracing::enabled!(tracing::Level::DEBUG) {
            debug!(
                event_id = sale.event_id,
                "Webhook payload:\n{}",
                serde_json::to_string_pretty(&payload)?
            );
        }

        self.client
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
