use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::quote::Quote;

/// Minimal booking record written when an accepted quote is converted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub quote_id: ObjectId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote_number: Option<String>,
    pub customer_id: ObjectId,
    pub provider_id: ObjectId,
    pub service_id: ObjectId,
    pub total_amount: f64,
    pub currency: String,
    pub status: String,
    #[serde(with = "crate::util::timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Booking {
    /// Returns `None` when the quote has never been persisted.
    pub fn from_quote(quote: &Quote, now: DateTime<Utc>) -> Option<Self> {
        Some(Booking {
            id: None,
            quote_id: quote.id?,
            quote_number: quote.quote_number.clone(),
            customer_id: quote.customer.user_id,
            provider_id: quote.service_provider.provider_id,
            service_id: quote.service_details.service_id,
            total_amount: quote.pricing.final_total,
            currency: quote.pricing.currency.clone(),
            status: "pending".to_string(),
            created_at: now,
        })
    }
}
