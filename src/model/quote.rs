use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    #[default]
    Draft,
    Sent,
    Viewed,
    UnderReview,
    Negotiating,
    Revised,
    Accepted,
    Rejected,
    Expired,
    Cancelled,
    ConvertedToBooking,
}

impl QuoteStatus {
    pub const ALL: [QuoteStatus; 11] = [
        QuoteStatus::Draft,
        QuoteStatus::Sent,
        QuoteStatus::Viewed,
        QuoteStatus::UnderReview,
        QuoteStatus::Negotiating,
        QuoteStatus::Revised,
        QuoteStatus::Accepted,
        QuoteStatus::Rejected,
        QuoteStatus::Expired,
        QuoteStatus::Cancelled,
        QuoteStatus::ConvertedToBooking,
    ];

    /// Statuses a quote never leaves except `Accepted -> ConvertedToBooking`.
    pub const FINALIZED: [QuoteStatus; 5] = [
        QuoteStatus::Accepted,
        QuoteStatus::Rejected,
        QuoteStatus::Expired,
        QuoteStatus::Cancelled,
        QuoteStatus::ConvertedToBooking,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QuoteStatus::Draft => "draft",
            QuoteStatus::Sent => "sent",
            QuoteStatus::Viewed => "viewed",
            QuoteStatus::UnderReview => "under_review",
            QuoteStatus::Negotiating => "negotiating",
            QuoteStatus::Revised => "revised",
            QuoteStatus::Accepted => "accepted",
            QuoteStatus::Rejected => "rejected",
            QuoteStatus::Expired => "expired",
            QuoteStatus::Cancelled => "cancelled",
            QuoteStatus::ConvertedToBooking => "converted_to_booking",
        }
    }

    pub fn parse(value: &str) -> Option<QuoteStatus> {
        QuoteStatus::ALL.iter().copied().find(|s| s.as_str() == value)
    }

    pub fn is_terminal(&self) -> bool {
        QuoteStatus::FINALIZED.contains(self)
    }

    /// Allowed status graph. Staying in the same status is always allowed.
    pub fn can_transition_to(&self, next: QuoteStatus) -> bool {
        use QuoteStatus::*;
        if *self == next {
            return true;
        }
        match self {
            Draft => matches!(next, Sent | Revised | Cancelled | Expired),
            Sent | Viewed | UnderReview | Negotiating | Revised => {
                !matches!(next, Draft | ConvertedToBooking)
            }
            Accepted => next == ConvertedToBooking,
            Rejected | Expired | Cancelled | ConvertedToBooking => false,
        }
    }
}

impl std::fmt::Display for QuoteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Low,
    #[default]
    Normal,
    High,
    Emergency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Simple,
    #[default]
    Moderate,
    Complex,
    ExpertLevel,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[validate(length(min = 1))]
    pub street: String,
    #[validate(length(min = 1))]
    pub city: String,
    #[validate(length(min = 1))]
    pub state: String,
    #[validate(length(min = 1))]
    pub zip_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

/// Customer contact details as they were when the quote was created.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CustomerSnapshot {
    pub user_id: ObjectId,
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(nested)]
    pub address: Option<Address>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSnapshot {
    pub provider_id: ObjectId,
    #[validate(length(min = 1))]
    pub business_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(email)]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDetails {
    pub service_id: ObjectId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<ObjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub urgency: Urgency,
    #[serde(default)]
    pub complexity: Complexity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0.0))]
    pub estimated_hours: Option<f64>,
}

/// GeoJSON point, `[longitude, latitude]`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: [f64; 2],
}

impl GeoPoint {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        GeoPoint { kind: "Point".to_string(), coordinates: [longitude, latitude] }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ServiceLocation {
    #[validate(nested)]
    pub address: Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<GeoPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_instructions: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BasePrice {
    #[validate(range(min = 0.0))]
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LaborCost {
    #[validate(length(min = 1))]
    pub description: String,
    #[validate(range(min = 0.0))]
    pub hours: f64,
    #[validate(range(min = 0.0))]
    pub hourly_rate: f64,
    /// Derived: `hours * hourly_rate`.
    #[serde(default)]
    pub total_amount: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(range(min = 0.0))]
    pub quantity: f64,
    #[validate(range(min = 0.0))]
    pub unit_price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Derived: `quantity * unit_price`.
    #[serde(default)]
    pub total_price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalFee {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(range(min = 0.0))]
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// How a discount's amount is obtained. Serialized as `{"type": ..., "value": ...}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DiscountRule {
    /// `value` percent of the subtotal.
    Percentage { value: f64 },
    /// A flat `value` off.
    Fixed { value: f64 },
}

fn validate_discount_rule(rule: &DiscountRule) -> Result<(), ValidationError> {
    match *rule {
        DiscountRule::Percentage { value } if !(0.0..=100.0).contains(&value) => {
            Err(ValidationError::new("percentage_out_of_range"))
        }
        DiscountRule::Fixed { value } if value < 0.0 => Err(ValidationError::new("negative_discount")),
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Discount {
    #[serde(flatten)]
    #[validate(custom(function = "validate_discount_rule"))]
    pub rule: DiscountRule,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Derived from `rule` and the subtotal.
    #[serde(default)]
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Tax {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(range(min = 0.0))]
    pub rate: f64,
    /// Derived: `rate% * (subtotal - total_discounts)`.
    #[serde(default)]
    pub amount: f64,
}

fn default_currency() -> String {
    "USD".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Pricing {
    #[validate(nested)]
    pub base_price: BasePrice,
    #[serde(default)]
    #[validate(nested)]
    pub labor_costs: Vec<LaborCost>,
    #[serde(default)]
    #[validate(nested)]
    pub materials: Vec<Material>,
    #[serde(default)]
    #[validate(nested)]
    pub additional_fees: Vec<AdditionalFee>,
    #[serde(default)]
    #[validate(nested)]
    pub discounts: Vec<Discount>,
    #[serde(default)]
    #[validate(nested)]
    pub taxes: Vec<Tax>,
    #[serde(default)]
    pub subtotal: f64,
    #[serde(default)]
    pub total_discounts: f64,
    #[serde(default)]
    pub total_taxes: f64,
    #[serde(default)]
    pub final_total: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
}

impl Default for Pricing {
    fn default() -> Self {
        Pricing {
            base_price: BasePrice::default(),
            labor_costs: Vec::new(),
            materials: Vec::new(),
            additional_fees: Vec::new(),
            discounts: Vec::new(),
            taxes: Vec::new(),
            subtotal: 0.0,
            total_discounts: 0.0,
            total_taxes: 0.0,
            final_total: 0.0,
            currency: default_currency(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PaymentTerms {
    #[serde(default)]
    #[validate(range(min = 0.0, max = 100.0))]
    pub deposit_percentage: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_on: Option<String>,
    #[serde(default)]
    pub accepted_methods: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Warranty {
    pub duration_days: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermitResponsibility {
    Customer,
    Provider,
    Shared,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Terms {
    /// Always populated after the first persist.
    #[serde(default, with = "crate::util::timestamp::option", skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(nested)]
    pub payment_terms: Option<PaymentTerms>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warranty: Option<Warranty>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancellation_policy: Option<String>,
    #[serde(default)]
    pub permits_required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permit_responsibility: Option<PermitResponsibility>,
}

/// First time the quote entered each stage. Set once, never overwritten.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    #[serde(default, with = "crate::util::timestamp::option", skip_serializing_if = "Option::is_none")]
    pub sent_date: Option<DateTime<Utc>>,
    #[serde(default, with = "crate::util::timestamp::option", skip_serializing_if = "Option::is_none")]
    pub viewed_date: Option<DateTime<Utc>>,
    #[serde(default, with = "crate::util::timestamp::option", skip_serializing_if = "Option::is_none")]
    pub responded_date: Option<DateTime<Utc>>,
    #[serde(default, with = "crate::util::timestamp::option", skip_serializing_if = "Option::is_none")]
    pub accepted_date: Option<DateTime<Utc>>,
    #[serde(default, with = "crate::util::timestamp::option", skip_serializing_if = "Option::is_none")]
    pub rejected_date: Option<DateTime<Utc>>,
    #[serde(default, with = "crate::util::timestamp::option", skip_serializing_if = "Option::is_none")]
    pub expired_date: Option<DateTime<Utc>>,
    #[serde(default, with = "crate::util::timestamp::option", skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Revision {
    pub version: u32,
    pub changes: String,
    pub modified_by: ObjectId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(with = "crate::util::timestamp")]
    pub modified_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Party {
    Customer,
    Provider,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommunicationKind {
    #[default]
    Message,
    Question,
    Answer,
    CounterOffer,
    Update,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 1))]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Communication {
    pub from: Party,
    pub message: String,
    #[serde(rename = "type", default)]
    pub kind: CommunicationKind,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(with = "crate::util::timestamp")]
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomerDecision {
    Accepted,
    Rejected,
    Negotiating,
    UnderReview,
}

impl CustomerDecision {
    pub fn status(&self) -> QuoteStatus {
        match self {
            CustomerDecision::Accepted => QuoteStatus::Accepted,
            CustomerDecision::Rejected => QuoteStatus::Rejected,
            CustomerDecision::Negotiating => QuoteStatus::Negotiating,
            CustomerDecision::UnderReview => QuoteStatus::UnderReview,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerResponse {
    pub decision: CustomerDecision,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counter_offer: Option<f64>,
    #[serde(with = "crate::util::timestamp")]
    pub responded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Analytics {
    #[serde(default)]
    pub view_count: u32,
    #[serde(default)]
    pub revision_count: u32,
    #[serde(default, with = "crate::util::timestamp::option", skip_serializing_if = "Option::is_none")]
    pub last_viewed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Competitive {
    #[serde(default)]
    pub competitor_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_average: Option<f64>,
}

/// Provider-side note, never shown to the customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalNote {
    pub note: String,
    pub author: ObjectId,
    #[serde(with = "crate::util::timestamp")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote_number: Option<String>,

    #[validate(nested)]
    pub customer: CustomerSnapshot,
    #[validate(nested)]
    pub service_provider: ProviderSnapshot,
    #[validate(nested)]
    pub service_details: ServiceDetails,

    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1))]
    pub description: String,
    #[validate(nested)]
    pub service_location: ServiceLocation,

    #[validate(nested)]
    pub pricing: Pricing,
    #[serde(default)]
    #[validate(nested)]
    pub terms: Terms,

    #[serde(default)]
    pub status: QuoteStatus,
    #[serde(default)]
    pub workflow: Workflow,
    #[serde(default)]
    pub revision_history: Vec<Revision>,
    #[serde(default)]
    pub communications: Vec<Communication>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_response: Option<CustomerResponse>,
    #[serde(default)]
    #[validate(nested)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub analytics: Analytics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub competitive: Option<Competitive>,
    #[serde(default)]
    pub internal_notes: Vec<InternalNote>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_booking: Option<ObjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_quote: Option<ObjectId>,

    #[serde(default, with = "crate::util::timestamp::option", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "crate::util::timestamp::option", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,

    /// Optimistic concurrency counter, bumped by every successful write.
    #[serde(rename = "__v", default)]
    pub doc_version: i64,
}
