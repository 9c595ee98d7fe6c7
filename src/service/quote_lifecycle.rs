use std::sync::Arc;

use bson::oid::ObjectId;
use chrono::{DateTime, Duration, Utc};
use tracing::debug;
use validator::Validate;

use crate::config::QuoteConfig;
use crate::dto::quote_dto::QuoteResponseDto;
use crate::model::quote::{
    Attachment, Communication, CommunicationKind, CustomerDecision, CustomerResponse, InternalNote,
    Party, Quote, QuoteStatus, Revision, Workflow,
};
use crate::service::pricing;
use crate::util::clock::Clock;
use crate::util::error::ServiceError;
use crate::util::quote_number::QuoteNumberGenerator;

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Rules applied to a single quote in memory. Holds no storage handle; the
/// service loads, hands the record here, then writes it back.
pub struct QuoteLifecycle {
    clock: Arc<dyn Clock>,
    numbers: QuoteNumberGenerator,
    default_validity: Duration,
}

impl QuoteLifecycle {
    pub fn new(config: &QuoteConfig, clock: Arc<dyn Clock>) -> Self {
        QuoteLifecycle {
            clock,
            numbers: QuoteNumberGenerator::new(config.number_prefix.clone()),
            default_validity: Duration::days(config.default_validity_days),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Runs before every write: number, pricing, workflow stamps, default
    /// expiry, bookkeeping dates, then field validation.
    pub fn prepare_for_persist(&self, quote: &mut Quote) -> Result<(), ServiceError> {
        let now = self.now();

        if quote.quote_number.is_none() {
            quote.quote_number = Some(self.numbers.generate(now));
        }

        pricing::recalculate(&mut quote.pricing);

        stamp_workflow(&mut quote.workflow, quote.status, now);

        if quote.terms.valid_until.is_none() {
            quote.terms.valid_until = Some(now + self.default_validity);
        }

        if quote.created_at.is_none() {
            quote.created_at = Some(now);
        }
        quote.updated_at = Some(now);

        quote.validate()?;
        debug!(
            quote_number = ?quote.quote_number,
            status = %quote.status,
            final_total = quote.pricing.final_total,
            "Quote prepared for persist"
        );
        Ok(())
    }

    /// Replace the generated quote number, used after a unique-index collision.
    pub fn regenerate_quote_number(&self, quote: &mut Quote) {
        quote.quote_number = Some(self.numbers.generate(self.now()));
    }

    pub fn transition(&self, quote: &mut Quote, next: QuoteStatus) -> Result<(), ServiceError> {
        if !quote.status.can_transition_to(next) {
            return Err(ServiceError::Conflict(format!(
                "Cannot move quote from {} to {}",
                quote.status, next
            )));
        }
        quote.status = next;
        Ok(())
    }

    /// Appends a revision and moves the quote to `revised`. Returns the new version.
    pub fn add_revision(
        &self,
        quote: &mut Quote,
        changes: String,
        modified_by: ObjectId,
        reason: Option<String>,
    ) -> Result<u32, ServiceError> {
        if changes.trim().is_empty() {
            return Err(ServiceError::InvalidInput("Revision changes are required".to_string()));
        }
        self.transition(quote, QuoteStatus::Revised)?;

        let version = quote.revision_history.len() as u32 + 1;
        quote.revision_history.push(Revision {
            version,
            changes,
            modified_by,
            reason,
            modified_date: self.now(),
        });
        quote.analytics.revision_count += 1;
        Ok(version)
    }

    pub fn add_communication(
        &self,
        quote: &mut Quote,
        from: Party,
        message: String,
        kind: CommunicationKind,
        attachments: Vec<Attachment>,
    ) -> Result<(), ServiceError> {
        if message.trim().is_empty() {
            return Err(ServiceError::InvalidInput("Message is required".to_string()));
        }
        for attachment in &attachments {
            attachment.validate()?;
        }
        quote.communications.push(Communication {
            from,
            message,
            kind,
            attachments,
            timestamp: self.now(),
        });
        Ok(())
    }

    /// Counts a customer view. The first view of a sent or revised quote moves it to `viewed`.
    /// Drafts have not reached the customer, so viewing one is a conflict.
    pub fn record_view(&self, quote: &mut Quote) -> Result<(), ServiceError> {
        if quote.status == QuoteStatus::Draft {
            return Err(ServiceError::Conflict("Quote has not been sent yet".to_string()));
        }
        let now = self.now();
        if matches!(quote.status, QuoteStatus::Sent | QuoteStatus::Revised) {
            quote.status = QuoteStatus::Viewed;
        }
        quote.analytics.view_count += 1;
        quote.analytics.last_viewed_at = Some(now);
        Ok(())
    }

    pub fn record_response(
        &self,
        quote: &mut Quote,
        decision: CustomerDecision,
        message: Option<String>,
        counter_offer: Option<f64>,
    ) -> Result<(), ServiceError> {
        if quote.status == QuoteStatus::Draft {
            return Err(ServiceError::Conflict("Quote has not been sent yet".to_string()));
        }
        if decision == CustomerDecision::Accepted && self.is_expired(quote) {
            return Err(ServiceError::Conflict("Quote has expired".to_string()));
        }
        if let Some(offer) = counter_offer {
            if offer < 0.0 {
                return Err(ServiceError::InvalidInput("Counter offer must not be negative".to_string()));
            }
        }
        self.transition(quote, decision.status())?;
        quote.customer_response = Some(CustomerResponse {
            decision,
            message,
            counter_offer,
            responded_at: self.now(),
        });
        Ok(())
    }

    pub fn add_internal_note(&self, quote: &mut Quote, author: ObjectId, note: String) -> Result<(), ServiceError> {
        if note.trim().is_empty() {
            return Err(ServiceError::InvalidInput("Note is required".to_string()));
        }
        quote.internal_notes.push(InternalNote { note, author, created_at: self.now() });
        Ok(())
    }

    /// `now > validUntil`. A quote without an expiry date never counts as expired.
    pub fn is_expired(&self, quote: &Quote) -> bool {
        quote.terms.valid_until.map(|until| self.now() > until).unwrap_or(false)
    }

    /// Pushes `validUntil` forward by whole calendar days from its current value.
    pub fn extend_expiry(&self, quote: &mut Quote, days: i64) -> Result<DateTime<Utc>, ServiceError> {
        if days <= 0 {
            return Err(ServiceError::InvalidInput("Extension must be at least one day".to_string()));
        }
        let current = quote
            .terms
            .valid_until
            .ok_or_else(|| ServiceError::InvalidInput("Quote has no expiry date".to_string()))?;
        let extended = current + Duration::days(days);
        quote.terms.valid_until = Some(extended);
        Ok(extended)
    }

    pub fn days_until_expiration(&self, quote: &Quote) -> Option<i64> {
        let until = quote.terms.valid_until?;
        let millis = (until - self.now()).num_milliseconds();
        Some((millis as f64 / MILLIS_PER_DAY as f64).ceil() as i64)
    }

    pub fn age_in_days(&self, quote: &Quote) -> i64 {
        match quote.created_at {
            Some(created) => (self.now() - created).num_milliseconds().div_euclid(MILLIS_PER_DAY),
            None => 0,
        }
    }

    pub fn view(&self, quote: Quote) -> QuoteResponseDto {
        QuoteResponseDto {
            is_expired: self.is_expired(&quote),
            days_until_expiration: self.days_until_expiration(&quote),
            age_in_days: self.age_in_days(&quote),
            profit_margin: pricing::profit_margin(&quote.pricing),
            quote,
        }
    }
}

/// Set the stage timestamp for `status` if it has never been set, and always
/// refresh `last_modified`.
pub fn stamp_workflow(workflow: &mut Workflow, status: QuoteStatus, now: DateTime<Utc>) {
    let slot = match status {
        QuoteStatus::Sent => Some(&mut workflow.sent_date),
        QuoteStatus::Viewed => Some(&mut workflow.viewed_date),
        QuoteStatus::UnderReview | QuoteStatus::Negotiating => Some(&mut workflow.responded_date),
        QuoteStatus::Accepted | QuoteStatus::ConvertedToBooking => Some(&mut workflow.accepted_date),
        QuoteStatus::Rejected => Some(&mut workflow.rejected_date),
        QuoteStatus::Expired => Some(&mut workflow.expired_date),
        QuoteStatus::Draft | QuoteStatus::Revised | QuoteStatus::Cancelled => None,
    };
    if let Some(slot) = slot {
        slot.get_or_insert(now);
    }
    workflow.last_modified = Some(now);
}
