use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::model::booking::Booking;
use crate::model::directory::{ProviderProfile, UserContact};
use crate::model::quote::{Attachment, CommunicationKind, CustomerDecision, Quote, QuoteStatus};

/// Quote plus the values derived from it at read time.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResponseDto {
    pub quote: Quote,
    pub is_expired: bool,
    pub days_until_expiration: Option<i64>,
    pub age_in_days: i64,
    pub profit_margin: f64,
}

/// A row of a provider or customer listing, with the referenced records resolved.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteListingDto {
    pub quote: Quote,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_contact: Option<UserContact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum QuoteSortField {
    #[default]
    #[serde(rename = "createdAt")]
    CreatedAt,
    #[serde(rename = "updatedAt")]
    UpdatedAt,
    #[serde(rename = "validUntil")]
    ValidUntil,
    #[serde(rename = "finalTotal")]
    FinalTotal,
    #[serde(rename = "quoteNumber")]
    QuoteNumber,
    #[serde(rename = "status")]
    Status,
}

impl QuoteSortField {
    /// Document path of the field in the quotes collection.
    pub fn field_path(&self) -> &'static str {
        match self {
            QuoteSortField::CreatedAt => "createdAt",
            QuoteSortField::UpdatedAt => "updatedAt",
            QuoteSortField::ValidUntil => "terms.validUntil",
            QuoteSortField::FinalTotal => "pricing.finalTotal",
            QuoteSortField::QuoteNumber => "quoteNumber",
            QuoteSortField::Status => "status",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn direction(&self) -> i32 {
        match self {
            SortOrder::Asc => 1,
            SortOrder::Desc => -1,
        }
    }
}

/// Pagination and ordering for listings.
#[derive(Debug, Clone, PartialEq)]
pub struct ListOptions {
    pub limit: i64,
    pub skip: u64,
    pub sort_by: QuoteSortField,
    pub sort_order: SortOrder,
}

impl Default for ListOptions {
    fn default() -> Self {
        ListOptions { limit: 50, skip: 0, sort_by: QuoteSortField::default(), sort_order: SortOrder::default() }
    }
}

/// Query string of the listing endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ListQuotesQuery {
    pub status: Option<QuoteStatus>,
    #[validate(range(min = 1))]
    pub limit: Option<i64>,
    pub skip: Option<u64>,
    pub sort_by: Option<QuoteSortField>,
    pub sort_order: Option<SortOrder>,
}

impl ListQuotesQuery {
    /// Fill gaps with defaults and clamp the page size.
    pub fn to_options(&self, default_limit: i64, max_limit: i64) -> ListOptions {
        ListOptions {
            limit: self.limit.unwrap_or(default_limit).clamp(1, max_limit),
            skip: self.skip.unwrap_or(0),
            sort_by: self.sort_by.unwrap_or_default(),
            sort_order: self.sort_order.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateQuoteStatusRequest {
    pub status: QuoteStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AddRevisionRequest {
    #[validate(length(min = 1, max = 2000))]
    pub changes: String,
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AddCommunicationRequest {
    #[validate(length(min = 1, max = 5000))]
    pub message: String,
    #[serde(rename = "type", default)]
    pub kind: CommunicationKind,
    #[serde(default)]
    #[validate(nested)]
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CustomerResponseRequest {
    pub decision: CustomerDecision,
    #[validate(length(max = 2000))]
    pub message: Option<String>,
    #[validate(range(min = 0.0))]
    pub counter_offer: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ExtendExpiryRequest {
    #[validate(range(min = 1, max = 365))]
    pub days: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AddInternalNoteRequest {
    #[validate(length(min = 2, max = 1000))]
    pub note: String,
}

/// Outcome of converting an accepted quote.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionDto {
    pub quote: Quote,
    pub booking: Booking,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepResultDto {
    pub expired: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_query_defaults_and_clamp() {
        let query = ListQuotesQuery::default();
        assert_eq!(query.to_options(50, 200), ListOptions::default());

        let query = ListQuotesQuery { limit: Some(10_000), ..Default::default() };
        assert_eq!(query.to_options(50, 200).limit, 200);
    }

    #[test]
    fn test_list_query_parses_camel_case() {
        let query: ListQuotesQuery = serde_json::from_str(
            r#"{"status":"sent","limit":5,"skip":10,"sortBy":"finalTotal","sortOrder":"asc"}"#,
        )
        .unwrap();
        let options = query.to_options(50, 200);
        assert_eq!(query.status, Some(QuoteStatus::Sent));
        assert_eq!(options.limit, 5);
        assert_eq!(options.skip, 10);
        assert_eq!(options.sort_by.field_path(), "pricing.finalTotal");
        assert_eq!(options.sort_order.direction(), 1);
    }

    #[test]
    fn test_request_validation() {
        assert!(ExtendExpiryRequest { days: 0 }.validate().is_err());
        assert!(ExtendExpiryRequest { days: 14 }.validate().is_ok());
        assert!(AddRevisionRequest { changes: String::new(), reason: None }.validate().is_err());
        let communication: AddCommunicationRequest =
            serde_json::from_str(r#"{"message":"hello"}"#).unwrap();
        assert_eq!(communication.kind, CommunicationKind::Message);
        assert!(communication.validate().is_ok());
    }
}
