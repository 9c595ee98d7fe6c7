use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use bson::oid::ObjectId;
use tracing::{error, info, instrument, warn};

use crate::config::QuoteConfig;
use crate::dto::quote_dto::{ConversionDto, ListOptions, ListQuotesQuery, QuoteListingDto, QuoteResponseDto};
use crate::model::booking::Booking;
use crate::model::quote::{
    Analytics, Attachment, CommunicationKind, CustomerDecision, Party, Quote, QuoteStatus, Workflow,
};
use crate::repository::booking_repo::BookingRepository;
use crate::repository::directory_repo::DirectoryRepository;
use crate::repository::quote_repo::{QuoteFilter, QuoteRepository};
use crate::repository::repository_error::RepositoryError;
use crate::service::quote_lifecycle::QuoteLifecycle;
use crate::util::error::ServiceError;

#[async_trait]
pub trait QuoteService: Send + Sync {
    async fn create_quote(&self, quote: Quote) -> Result<Quote, ServiceError>;
    async fn get_quote(&self, id: ObjectId) -> Result<QuoteResponseDto, ServiceError>;
    async fn update_quote(&self, id: ObjectId, quote: Quote) -> Result<Quote, ServiceError>;
    async fn delete_quote(&self, id: ObjectId) -> Result<(), ServiceError>;
    async fn update_quote_status(&self, id: ObjectId, status: QuoteStatus) -> Result<Quote, ServiceError>;

    async fn add_revision(
        &self,
        id: ObjectId,
        changes: String,
        modified_by: ObjectId,
        reason: Option<String>,
    ) -> Result<Quote, ServiceError>;
    async fn add_communication(
        &self,
        id: ObjectId,
        from: Party,
        message: String,
        kind: CommunicationKind,
        attachments: Vec<Attachment>,
    ) -> Result<Quote, ServiceError>;
    async fn record_view(&self, id: ObjectId) -> Result<Quote, ServiceError>;
    async fn respond_to_quote(
        &self,
        id: ObjectId,
        decision: CustomerDecision,
        message: Option<String>,
        counter_offer: Option<f64>,
    ) -> Result<Quote, ServiceError>;
    async fn extend_expiry(&self, id: ObjectId, days: i64) -> Result<Quote, ServiceError>;
    async fn add_internal_note(&self, id: ObjectId, author: ObjectId, note: String) -> Result<Quote, ServiceError>;
    async fn convert_to_booking(&self, id: ObjectId) -> Result<ConversionDto, ServiceError>;

    async fn find_by_provider(
        &self,
        provider_id: ObjectId,
        status: Option<QuoteStatus>,
        options: ListOptions,
    ) -> Result<Vec<QuoteListingDto>, ServiceError>;
    async fn find_by_customer(
        &self,
        customer_id: ObjectId,
        status: Option<QuoteStatus>,
        options: ListOptions,
    ) -> Result<Vec<QuoteListingDto>, ServiceError>;
    async fn get_expired(&self) -> Result<Vec<Quote>, ServiceError>;
    /// Moves every overdue open quote to `expired`. Returns how many were changed.
    async fn expire_overdue(&self) -> Result<usize, ServiceError>;

    /// Listing options with the configured page size defaults applied.
    fn list_options(&self, query: &ListQuotesQuery) -> ListOptions;
}

/// Which side of a quote a listing is viewed from; the other side gets joined in.
#[derive(Debug, Clone, Copy)]
enum Counterpart {
    Customer,
    Provider,
}

pub struct QuoteServiceImpl {
    pub quote_repo: Arc<dyn QuoteRepository>,
    pub directory_repo: Arc<dyn DirectoryRepository>,
    pub booking_repo: Arc<dyn BookingRepository>,
    lifecycle: QuoteLifecycle,
    config: QuoteConfig,
}

impl QuoteServiceImpl {
    pub fn new(
        quote_repo: Arc<dyn QuoteRepository>,
        directory_repo: Arc<dyn DirectoryRepository>,
        booking_repo: Arc<dyn BookingRepository>,
        lifecycle: QuoteLifecycle,
        config: QuoteConfig,
    ) -> Self {
        QuoteServiceImpl { quote_repo, directory_repo, booking_repo, lifecycle, config }
    }

    /// Load, apply, persist. A concurrent write between load and persist
    /// replays the whole cycle on a fresh copy, up to `conflict_retries` times.
    async fn mutate<F>(&self, id: ObjectId, action: &'static str, apply: F) -> Result<Quote, ServiceError>
    where
        F: Fn(&QuoteLifecycle, &mut Quote) -> Result<(), ServiceError> + Send + Sync,
    {
        let mut retries = 0;
        loop {
            let mut quote = self.quote_repo.get_by_id(id).await?;
            apply(&self.lifecycle, &mut quote)?;
            self.lifecycle.prepare_for_persist(&mut quote)?;

            match self.quote_repo.replace(quote).await {
                Ok(saved) => {
                    info!(%id, action, version = saved.doc_version, "Quote updated");
                    return Ok(saved);
                }
                Err(RepositoryError::VersionConflict(msg)) if retries < self.config.conflict_retries => {
                    retries += 1;
                    warn!(%id, action, retries, "Concurrent write detected, retrying: {}", msg);
                }
                Err(e) => {
                    error!(%id, action, "Failed to update quote: {}", e);
                    return Err(ServiceError::from(e));
                }
            }
        }
    }

    async fn join_listing(
        &self,
        quotes: Vec<Quote>,
        counterpart: Counterpart,
    ) -> Result<Vec<QuoteListingDto>, ServiceError> {
        let service_ids = unique_ids(quotes.iter().map(|q| Some(q.service_details.service_id)));
        let category_ids = unique_ids(quotes.iter().map(|q| q.service_details.category_id));
        let service_names = self.directory_repo.service_names(&service_ids).await?;
        let category_names = self.directory_repo.category_names(&category_ids).await?;

        let (contacts, providers) = match counterpart {
            Counterpart::Customer => {
                let ids = unique_ids(quotes.iter().map(|q| Some(q.customer.user_id)));
                (self.directory_repo.user_contacts(&ids).await?, Default::default())
            }
            Counterpart::Provider => {
                let ids = unique_ids(quotes.iter().map(|q| Some(q.service_provider.provider_id)));
                (Default::default(), self.directory_repo.provider_profiles(&ids).await?)
            }
        };

        Ok(quotes
            .into_iter()
            .map(|quote| {
                let details = &quote.service_details;
                QuoteListingDto {
                    customer_contact: contacts.get(&quote.customer.user_id).cloned(),
                    provider: providers.get(&quote.service_provider.provider_id).cloned(),
                    service_name: service_names.get(&details.service_id).cloned(),
                    category_name: details.category_id.and_then(|c| category_names.get(&c).cloned()),
                    quote,
                }
            })
            .collect())
    }
}

fn unique_ids(ids: impl Iterator<Item = Option<ObjectId>>) -> Vec<ObjectId> {
    let mut seen = HashSet::new();
    ids.flatten().filter(|id| seen.insert(*id)).collect()
}

/// Clear everything a caller may not set on a new quote.
fn reset_server_fields(quote: &mut Quote) {
    quote.id = None;
    if !matches!(quote.status, QuoteStatus::Draft | QuoteStatus::Sent) {
        quote.status = QuoteStatus::Draft;
    }
    quote.workflow = Workflow::default();
    quote.revision_history.clear();
    quote.communications.clear();
    quote.customer_response = None;
    quote.internal_notes.clear();
    quote.analytics = Analytics::default();
    quote.related_booking = None;
    quote.created_at = None;
    quote.updated_at = None;
    quote.doc_version = 0;
}

#[async_trait]
impl QuoteService for QuoteServiceImpl {
    #[instrument(skip(self, quote), fields(title = %quote.title))]
    async fn create_quote(&self, quote: Quote) -> Result<Quote, ServiceError> {
        let mut quote = quote;
        reset_server_fields(&mut quote);

        let generated = quote.quote_number.is_none();
        let max_attempts = if generated { self.config.number_max_attempts } else { 1 };
        self.lifecycle.prepare_for_persist(&mut quote)?;

        let mut attempt = 1;
        loop {
            match self.quote_repo.create(quote.clone()).await {
                Ok(created) => {
                    info!(id = ?created.id, quote_number = ?created.quote_number, "Quote created");
                    return Ok(created);
                }
                Err(RepositoryError::AlreadyExists(msg)) if attempt < max_attempts => {
                    warn!(attempt, "Quote number collision, generating another: {}", msg);
                    self.lifecycle.regenerate_quote_number(&mut quote);
                    attempt += 1;
                }
                Err(e) => {
                    error!("Failed to create quote: {}", e);
                    return Err(ServiceError::from(e));
                }
            }
        }
    }

    #[instrument(skip(self), fields(id = %id))]
    async fn get_quote(&self, id: ObjectId) -> Result<QuoteResponseDto, ServiceError> {
        let quote = self.quote_repo.get_by_id(id).await?;
        Ok(self.lifecycle.view(quote))
    }

    /// Full replacement from the caller. The caller's `__v` must match the
    /// stored one; party snapshots and the logs the engine appends to are
    /// carried over untouched. Terminal quotes are frozen.
    #[instrument(skip(self, quote), fields(id = %id, version = quote.doc_version))]
    async fn update_quote(&self, id: ObjectId, quote: Quote) -> Result<Quote, ServiceError> {
        let stored = self.quote_repo.get_by_id(id).await?;
        if stored.doc_version != quote.doc_version {
            warn!(stored = stored.doc_version, "Update based on a stale version");
            return Err(ServiceError::Conflict(format!(
                "Quote {} has version {}, update was based on {}",
                id, stored.doc_version, quote.doc_version
            )));
        }
        if stored.status.is_terminal() {
            return Err(ServiceError::Conflict(format!(
                "Quote {} is {} and can no longer be changed",
                id, stored.status
            )));
        }
        if !stored.status.can_transition_to(quote.status) {
            return Err(ServiceError::Conflict(format!(
                "Cannot move quote from {} to {}",
                stored.status, quote.status
            )));
        }

        let mut next = quote;
        next.id = Some(id);
        next.quote_number = stored.quote_number;
        next.customer = stored.customer;
        next.service_provider = stored.service_provider;
        next.original_quote = stored.original_quote;
        next.workflow = stored.workflow;
        next.revision_history = stored.revision_history;
        next.communications = stored.communications;
        next.customer_response = stored.customer_response;
        next.analytics = stored.analytics;
        next.internal_notes = stored.internal_notes;
        next.related_booking = stored.related_booking;
        next.created_at = stored.created_at;

        self.lifecycle.prepare_for_persist(&mut next)?;
        let saved = self.quote_repo.replace(next).await.map_err(|e| {
            error!("Failed to update quote: {}", e);
            ServiceError::from(e)
        })?;
        info!(version = saved.doc_version, "Quote replaced");
        Ok(saved)
    }

    #[instrument(skip(self), fields(id = %id))]
    async fn delete_quote(&self, id: ObjectId) -> Result<(), ServiceError> {
        let res = self.quote_repo.delete(id).await;
        match &res {
            Ok(_) => info!("Quote deleted successfully"),
            Err(e) => error!("Failed to delete quote: {e}"),
        }
        res.map_err(ServiceError::from)
    }

    #[instrument(skip(self), fields(id = %id, status = %status))]
    async fn update_quote_status(&self, id: ObjectId, status: QuoteStatus) -> Result<Quote, ServiceError> {
        self.mutate(id, "update_status", move |lifecycle, quote| lifecycle.transition(quote, status))
            .await
    }

    #[instrument(skip(self, changes, reason), fields(id = %id, modified_by = %modified_by))]
    async fn add_revision(
        &self,
        id: ObjectId,
        changes: String,
        modified_by: ObjectId,
        reason: Option<String>,
    ) -> Result<Quote, ServiceError> {
        self.mutate(id, "add_revision", move |lifecycle, quote| {
            lifecycle
                .add_revision(quote, changes.clone(), modified_by, reason.clone())
                .map(|_| ())
        })
        .await
    }

    #[instrument(skip(self, message, attachments), fields(id = %id, from = ?from))]
    async fn add_communication(
        &self,
        id: ObjectId,
        from: Party,
        message: String,
        kind: CommunicationKind,
        attachments: Vec<Attachment>,
    ) -> Result<Quote, ServiceError> {
        self.mutate(id, "add_communication", move |lifecycle, quote| {
            lifecycle.add_communication(quote, from, message.clone(), kind, attachments.clone())
        })
        .await
    }

    #[instrument(skip(self), fields(id = %id))]
    async fn record_view(&self, id: ObjectId) -> Result<Quote, ServiceError> {
        self.mutate(id, "record_view", |lifecycle, quote| lifecycle.record_view(quote))
            .await
    }

    #[instrument(skip(self, message), fields(id = %id, decision = ?decision))]
    async fn respond_to_quote(
        &self,
        id: ObjectId,
        decision: CustomerDecision,
        message: Option<String>,
        counter_offer: Option<f64>,
    ) -> Result<Quote, ServiceError> {
        self.mutate(id, "respond", move |lifecycle, quote| {
            lifecycle.record_response(quote, decision, message.clone(), counter_offer)
        })
        .await
    }

    #[instrument(skip(self), fields(id = %id))]
    async fn extend_expiry(&self, id: ObjectId, days: i64) -> Result<Quote, ServiceError> {
        self.mutate(id, "extend_expiry", move |lifecycle, quote| {
            lifecycle.extend_expiry(quote, days).map(|_| ())
        })
        .await
    }

    #[instrument(skip(self, note), fields(id = %id, author = %author))]
    async fn add_internal_note(&self, id: ObjectId, author: ObjectId, note: String) -> Result<Quote, ServiceError> {
        self.mutate(id, "add_internal_note", move |lifecycle, quote| {
            lifecycle.add_internal_note(quote, author, note.clone())
        })
        .await
    }

    /// Insert the booking, then mark the quote converted. If the quote write
    /// fails the booking is removed again before the error is returned.
    #[instrument(skip(self), fields(id = %id))]
    async fn convert_to_booking(&self, id: ObjectId) -> Result<ConversionDto, ServiceError> {
        let mut quote = self.quote_repo.get_by_id(id).await?;
        if quote.status != QuoteStatus::Accepted {
            return Err(ServiceError::Conflict(format!(
                "Only accepted quotes can be converted, quote is {}",
                quote.status
            )));
        }

        let booking = Booking::from_quote(&quote, self.lifecycle.now())
            .ok_or_else(|| ServiceError::InternalError("Stored quote has no id".to_string()))?;
        let booking = self.booking_repo.create(booking).await?;
        let booking_id = booking
            .id
            .ok_or_else(|| ServiceError::InternalError("Booking was stored without an id".to_string()))?;

        let persisted = self
            .lifecycle
            .transition(&mut quote, QuoteStatus::ConvertedToBooking)
            .and_then(|_| {
                quote.related_booking = Some(booking_id);
                self.lifecycle.prepare_for_persist(&mut quote)
            });
        let result = match persisted {
            Ok(()) => self.quote_repo.replace(quote).await.map_err(ServiceError::from),
            Err(e) => Err(e),
        };

        match result {
            Ok(saved) => {
                info!(booking_id = %booking_id, "Quote converted to booking");
                Ok(ConversionDto { quote: saved, booking })
            }
            Err(e) => {
                error!(booking_id = %booking_id, "Failed to mark quote converted, removing booking: {}", e);
                if let Err(compensation) = self.booking_repo.delete(booking_id).await {
                    error!(booking_id = %booking_id, "Failed to remove orphaned booking: {}", compensation);
                }
                Err(e)
            }
        }
    }

    #[instrument(skip(self, options), fields(provider_id = %provider_id))]
    async fn find_by_provider(
        &self,
        provider_id: ObjectId,
        status: Option<QuoteStatus>,
        options: ListOptions,
    ) -> Result<Vec<QuoteListingDto>, ServiceError> {
        let quotes = self.quote_repo.find(&QuoteFilter::for_provider(provider_id, status), &options).await?;
        self.join_listing(quotes, Counterpart::Customer).await
    }

    #[instrument(skip(self, options), fields(customer_id = %customer_id))]
    async fn find_by_customer(
        &self,
        customer_id: ObjectId,
        status: Option<QuoteStatus>,
        options: ListOptions,
    ) -> Result<Vec<QuoteListingDto>, ServiceError> {
        let quotes = self.quote_repo.find(&QuoteFilter::for_customer(customer_id, status), &options).await?;
        self.join_listing(quotes, Counterpart::Provider).await
    }

    #[instrument(skip(self))]
    async fn get_expired(&self) -> Result<Vec<Quote>, ServiceError> {
        Ok(self.quote_repo.find_expired(self.lifecycle.now()).await?)
    }

    #[instrument(skip(self))]
    async fn expire_overdue(&self) -> Result<usize, ServiceError> {
        let overdue = self.quote_repo.find_expired(self.lifecycle.now()).await?;
        let mut expired = 0;

        for quote in overdue {
            let Some(id) = quote.id else { continue };
            let result = self
                .mutate(id, "expire", |lifecycle, quote| {
                    if quote.status.is_terminal() || !lifecycle.is_expired(quote) {
                        return Err(ServiceError::Conflict("Quote is no longer overdue".to_string()));
                    }
                    lifecycle.transition(quote, QuoteStatus::Expired)
                })
                .await;

            match result {
                Ok(_) => expired += 1,
                Err(ServiceError::Conflict(msg)) | Err(ServiceError::NotFound(msg)) => {
                    warn!(%id, "Skipping quote during expiry sweep: {}", msg);
                }
                Err(ServiceError::InvalidInput(msg)) => {
                    error!(%id, "Stored quote fails validation, left for manual repair: {}", msg);
                }
                Err(e) => return Err(e),
            }
        }

        info!(expired, "Expiry sweep finished");
        Ok(expired)
    }

    fn list_options(&self, query: &ListQuotesQuery) -> ListOptions {
        query.to_options(self.config.default_page_limit, self.config.max_page_limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_ids_keeps_first_occurrence_order() {
        let a = ObjectId::new();
        let b = ObjectId::new();
        let ids = unique_ids(vec![Some(a), None, Some(b), Some(a)].into_iter());
        assert_eq!(ids, vec![a, b]);
    }
}
