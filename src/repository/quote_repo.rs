use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Document};
use chrono::{DateTime, Utc};
use futures::stream::StreamExt;
use mongodb::{
    options::{FindOptions, IndexOptions},
    Collection, Database, IndexModel,
};
use tracing::{error, info};

use crate::config::mongo_conf::MongoConfig;
use crate::dto::quote_dto::ListOptions;
use crate::model::quote::{Quote, QuoteStatus};
use crate::repository::repository_error::{RepositoryError, RepositoryResult};
use crate::util::timestamp;

/// Which quotes a listing returns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuoteFilter {
    pub provider_id: Option<ObjectId>,
    pub customer_id: Option<ObjectId>,
    pub status: Option<QuoteStatus>,
}

impl QuoteFilter {
    pub fn for_provider(provider_id: ObjectId, status: Option<QuoteStatus>) -> Self {
        QuoteFilter { provider_id: Some(provider_id), customer_id: None, status }
    }

    pub fn for_customer(customer_id: ObjectId, status: Option<QuoteStatus>) -> Self {
        QuoteFilter { provider_id: None, customer_id: Some(customer_id), status }
    }

    pub fn to_document(&self) -> Document {
        let mut filter = Document::new();
        if let Some(provider_id) = self.provider_id {
            filter.insert("serviceProvider.providerId", provider_id);
        }
        if let Some(customer_id) = self.customer_id {
            filter.insert("customer.userId", customer_id);
        }
        if let Some(status) = self.status {
            filter.insert("status", status.as_str());
        }
        filter
    }

    pub fn matches(&self, quote: &Quote) -> bool {
        self.provider_id.map_or(true, |id| quote.service_provider.provider_id == id)
            && self.customer_id.map_or(true, |id| quote.customer.user_id == id)
            && self.status.map_or(true, |status| quote.status == status)
    }
}

/// Past `validUntil` and not yet finalized.
pub fn expired_filter(now: DateTime<Utc>) -> Document {
    let finalized: Vec<&str> = QuoteStatus::FINALIZED.iter().map(|s| s.as_str()).collect();
    doc! {
        "terms.validUntil": { "$lt": timestamp::format(&now) },
        "status": { "$nin": finalized },
    }
}

/// Requested order with `_id` as tie-breaker so pages never overlap.
pub fn sort_document(options: &ListOptions) -> Document {
    let direction = options.sort_order.direction();
    doc! { options.sort_by.field_path(): direction, "_id": direction }
}

#[async_trait]
pub trait QuoteRepository: Send + Sync {
    async fn create(&self, quote: Quote) -> RepositoryResult<Quote>;
    async fn get_by_id(&self, id: ObjectId) -> RepositoryResult<Quote>;
    /// Compare-and-swap on `__v`: succeeds only if the stored counter still
    /// equals `quote.doc_version`, and stores it incremented.
    async fn replace(&self, quote: Quote) -> RepositoryResult<Quote>;
    async fn delete(&self, id: ObjectId) -> RepositoryResult<()>;
    async fn find(&self, filter: &QuoteFilter, options: &ListOptions) -> RepositoryResult<Vec<Quote>>;
    async fn find_expired(&self, now: DateTime<Utc>) -> RepositoryResult<Vec<Quote>>;
}

pub struct MongoQuoteRepository {
    collection: Collection<Quote>,
}

impl MongoQuoteRepository {
    pub fn new(database: &Database, config: &MongoConfig) -> Self {
        let collection = database.collection::<Quote>(config.quote_collection_name());
        MongoQuoteRepository { collection }
    }

    /// Unique quote numbers, geo lookups, and the listing/expiry access paths.
    /// No TTL index: expiry is a status change, documents are never dropped by the store.
    pub async fn ensure_indexes(&self) -> RepositoryResult<()> {
        let indexes = vec![
            IndexModel::builder()
                .keys(doc! { "quoteNumber": 1 })
                .options(IndexOptions::builder().unique(true).name("quote_number_unique".to_string()).build())
                .build(),
            IndexModel::builder()
                .keys(doc! { "serviceLocation.coordinates": "2dsphere" })
                .options(IndexOptions::builder().name("service_location_geo".to_string()).build())
                .build(),
            IndexModel::builder()
                .keys(doc! { "serviceProvider.providerId": 1, "status": 1, "createdAt": -1 })
                .build(),
            IndexModel::builder()
                .keys(doc! { "customer.userId": 1, "status": 1, "createdAt": -1 })
                .build(),
            IndexModel::builder()
                .keys(doc! { "terms.validUntil": 1, "status": 1 })
                .build(),
        ];
        match self.collection.create_indexes(indexes, None).await {
            Ok(result) => {
                info!(indexes = ?result.index_names, "Quote indexes ensured");
                Ok(())
            }
            Err(e) => {
                error!("Failed to create quote indexes: {}", e);
                Err(RepositoryError::from(e))
            }
        }
    }

    async fn collect(&self, filter: Document, options: Option<FindOptions>) -> RepositoryResult<Vec<Quote>> {
        let mut cursor = self.collection.find(filter, options).await.map_err(|e| {
            error!("Failed to query quotes: {}", e);
            RepositoryError::from(e)
        })?;
        let mut quotes = Vec::new();
        while let Some(quote) = cursor.next().await {
            match quote {
                Ok(q) => quotes.push(q),
                Err(e) => {
                    error!("Failed to deserialize quote: {}", e);
                    return Err(RepositoryError::serialization(format!("Failed to deserialize quote: {}", e)));
                }
            }
        }
        Ok(quotes)
    }
}

#[async_trait]
impl QuoteRepository for MongoQuoteRepository {
    #[tracing::instrument(skip(self, quote), fields(quote_number = ?quote.quote_number))]
    async fn create(&self, quote: Quote) -> RepositoryResult<Quote> {
        let mut new_quote = quote;
        new_quote.id = Some(new_quote.id.unwrap_or_else(ObjectId::new));
        new_quote.doc_version = 0;

        match self.collection.insert_one(&new_quote, None).await {
            Ok(_) => {
                info!(id = ?new_quote.id, "Quote created successfully");
                Ok(new_quote)
            }
            Err(e) => {
                error!("Failed to create quote: {}", e);
                Err(RepositoryError::from(e))
            }
        }
    }

    #[tracing::instrument(skip(self), fields(id = %id))]
    async fn get_by_id(&self, id: ObjectId) -> RepositoryResult<Quote> {
        match self.collection.find_one(doc! { "_id": id }, None).await {
            Ok(Some(quote)) => Ok(quote),
            Ok(None) => {
                error!("Quote not found for ID: {}", id);
                Err(RepositoryError::not_found(format!("Quote not found for ID: {}", id)))
            }
            Err(e) => {
                error!("Failed to fetch quote by ID: {}", e);
                Err(RepositoryError::database(format!("Failed to fetch quote by ID: {}", e)))
            }
        }
    }

    #[tracing::instrument(skip(self, quote), fields(id = ?quote.id, version = quote.doc_version))]
    async fn replace(&self, quote: Quote) -> RepositoryResult<Quote> {
        let id = quote
            .id
            .ok_or_else(|| RepositoryError::validation("Cannot replace a quote without an id"))?;
        let expected = quote.doc_version;
        let mut next = quote;
        next.doc_version = expected + 1;

        let filter = doc! { "_id": id, "__v": expected };
        let result = self.collection.replace_one(filter, &next, None).await.map_err(|e| {
            error!("Failed to replace quote: {}", e);
            RepositoryError::from(e)
        })?;

        if result.matched_count > 0 {
            info!("Quote {} written at version {}", id, next.doc_version);
            return Ok(next);
        }

        let exists = self
            .collection
            .count_documents(doc! { "_id": id }, None)
            .await
            .map_err(RepositoryError::from)?;
        if exists > 0 {
            error!("Stale write on quote {}: expected version {}", id, expected);
            Err(RepositoryError::version_conflict(format!(
                "Quote {} was modified concurrently (expected version {})",
                id, expected
            )))
        } else {
            Err(RepositoryError::not_found(format!("No quote found to update for ID: {}", id)))
        }
    }

    #[tracing::instrument(skip(self), fields(id = %id))]
    async fn delete(&self, id: ObjectId) -> RepositoryResult<()> {
        match self.collection.delete_one(doc! { "_id": id }, None).await {
            Ok(delete_result) if delete_result.deleted_count > 0 => {
                info!("Quote deleted successfully for ID: {}", id);
                Ok(())
            }
            Ok(_) => {
                error!("No quote found to delete for ID: {}", id);
                Err(RepositoryError::not_found(format!("No quote found to delete for ID: {}", id)))
            }
            Err(e) => {
                error!("Failed to delete quote: {}", e);
                Err(RepositoryError::from(e))
            }
        }
    }

    #[tracing::instrument(skip(self))]
    async fn find(&self, filter: &QuoteFilter, options: &ListOptions) -> RepositoryResult<Vec<Quote>> {
        let find_options = FindOptions::builder()
            .sort(sort_document(options))
            .skip(options.skip)
            .limit(options.limit)
            .build();
        let quotes = self.collect(filter.to_document(), Some(find_options)).await?;
        info!("Fetched {} quotes", quotes.len());
        Ok(quotes)
    }

    #[tracing::instrument(skip(self), fields(now = %now))]
    async fn find_expired(&self, now: DateTime<Utc>) -> RepositoryResult<Vec<Quote>> {
        let find_options = FindOptions::builder().sort(doc! { "terms.validUntil": 1 }).build();
        let quotes = self.collect(expired_filter(now), Some(find_options)).await?;
        info!("Found {} overdue quotes", quotes.len());
        Ok(quotes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::quote_dto::{QuoteSortField, SortOrder};
    use chrono::TimeZone;

    #[test]
    fn test_provider_filter_document() {
        let provider = ObjectId::new();
        let filter = QuoteFilter::for_provider(provider, Some(QuoteStatus::Sent)).to_document();
        assert_eq!(filter.get_object_id("serviceProvider.providerId").unwrap(), provider);
        assert_eq!(filter.get_str("status").unwrap(), "sent");
        assert!(!filter.contains_key("customer.userId"));
    }

    #[test]
    fn test_customer_filter_without_status() {
        let customer = ObjectId::new();
        let filter = QuoteFilter::for_customer(customer, None).to_document();
        assert_eq!(filter.len(), 1);
        assert_eq!(filter.get_object_id("customer.userId").unwrap(), customer);
    }

    #[test]
    fn test_expired_filter_excludes_finalized_statuses() {
        let now = Utc.with_ymd_and_hms(2026, 4, 1, 8, 0, 0).unwrap();
        let filter = expired_filter(now);
        let valid_until = filter.get_document("terms.validUntil").unwrap();
        assert_eq!(valid_until.get_str("$lt").unwrap(), "2026-04-01T08:00:00.000Z");

        let excluded: Vec<&str> = filter
            .get_document("status")
            .unwrap()
            .get_array("$nin")
            .unwrap()
            .iter()
            .filter_map(|b| b.as_str())
            .collect();
        assert_eq!(excluded, vec!["accepted", "rejected", "expired", "cancelled", "converted_to_booking"]);
    }

    #[test]
    fn test_sort_document() {
        let options = ListOptions {
            limit: 10,
            skip: 0,
            sort_by: QuoteSortField::ValidUntil,
            sort_order: SortOrder::Asc,
        };
        let sort = sort_document(&options);
        let keys: Vec<&String> = sort.keys().collect();
        assert_eq!(keys, vec!["terms.validUntil", "_id"]);
        assert_eq!(sort.get_i32("terms.validUntil").unwrap(), 1);

        let sort = sort_document(&ListOptions::default());
        assert_eq!(sort.get_i32("createdAt").unwrap(), -1);
    }
}
