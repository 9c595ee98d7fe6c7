#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bson::oid::ObjectId;
use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::RwLock;

use quote_engine::config::QuoteConfig;
use quote_engine::dto::quote_dto::{ListOptions, QuoteSortField, SortOrder};
use quote_engine::model::booking::Booking;
use quote_engine::model::directory::{ProviderProfile, UserContact};
use quote_engine::model::quote::{
    Address, BasePrice, CustomerSnapshot, LaborCost, Material, Pricing, ProviderSnapshot, Quote, QuoteStatus,
    ServiceDetails, ServiceLocation, Terms, Workflow,
};
use quote_engine::repository::booking_repo::BookingRepository;
use quote_engine::repository::directory_repo::DirectoryRepository;
use quote_engine::repository::quote_repo::{QuoteFilter, QuoteRepository};
use quote_engine::repository::repository_error::{RepositoryError, RepositoryResult};
use quote_engine::service::quote_lifecycle::QuoteLifecycle;
use quote_engine::service::quote_service::QuoteServiceImpl;
use quote_engine::util::clock::FixedClock;

pub fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 10, 9, 30, 0).unwrap()
}

/// In-memory quote store with the same unique-number and `__v` rules as Mongo.
#[derive(Default)]
pub struct InMemoryQuoteRepository {
    pub quotes: RwLock<HashMap<ObjectId, Quote>>,
    /// Quote numbers that already exist outside this store.
    pub taken_numbers: RwLock<Vec<String>>,
    /// Bump the stored version behind the caller's back on the next N replaces.
    pub interfere: AtomicU32,
    /// Make every replace fail with a database error.
    pub fail_replace: AtomicBool,
    pub create_calls: AtomicU32,
}

impl InMemoryQuoteRepository {
    pub async fn insert_raw(&self, quote: Quote) -> ObjectId {
        let id = quote.id.unwrap_or_else(ObjectId::new);
        let mut quote = quote;
        quote.id = Some(id);
        self.quotes.write().await.insert(id, quote);
        id
    }

    /// Reserve every number the generator can produce on `day` (`yyyyMMdd`).
    pub async fn take_all_numbers(&self, prefix: &str, day: &str) {
        let mut taken = self.taken_numbers.write().await;
        taken.extend((0..1000).map(|n| format!("{}-{}-{:03}", prefix, day, n)));
    }

    pub async fn stored(&self, id: ObjectId) -> Quote {
        self.quotes.read().await.get(&id).cloned().expect("quote stored")
    }
}

fn sort_key(quote: &Quote, field: QuoteSortField) -> String {
    match field {
        QuoteSortField::CreatedAt => format!("{:?}", quote.created_at),
        QuoteSortField::UpdatedAt => format!("{:?}", quote.updated_at),
        QuoteSortField::ValidUntil => format!("{:?}", quote.terms.valid_until),
        QuoteSortField::FinalTotal => format!("{:020.4}", quote.pricing.final_total),
        QuoteSortField::QuoteNumber => quote.quote_number.clone().unwrap_or_default(),
        QuoteSortField::Status => quote.status.as_str().to_string(),
    }
}

#[async_trait]
impl QuoteRepository for InMemoryQuoteRepository {
    async fn create(&self, quote: Quote) -> RepositoryResult<Quote> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let mut quotes = self.quotes.write().await;
        let number = quote.quote_number.clone();
        let duplicate = self.taken_numbers.read().await.iter().any(|n| Some(n) == number.as_ref())
            || quotes.values().any(|q| q.quote_number.is_some() && q.quote_number == number);
        if duplicate {
            return Err(RepositoryError::already_exists(format!("Duplicate key: {:?}", number)));
        }
        let mut quote = quote;
        let id = quote.id.unwrap_or_else(ObjectId::new);
        quote.id = Some(id);
        quote.doc_version = 0;
        quotes.insert(id, quote.clone());
        Ok(quote)
    }

    async fn get_by_id(&self, id: ObjectId) -> RepositoryResult<Quote> {
        self.quotes
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| RepositoryError::not_found(format!("Quote not found for ID: {}", id)))
    }

    async fn replace(&self, quote: Quote) -> RepositoryResult<Quote> {
        if self.fail_replace.load(Ordering::SeqCst) {
            return Err(RepositoryError::database("replace failed"));
        }
        let id = quote.id.ok_or_else(|| RepositoryError::validation("missing id"))?;
        let mut quotes = self.quotes.write().await;
        let stored = quotes
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::not_found(format!("No quote found to update for ID: {}", id)))?;

        if self.interfere.load(Ordering::SeqCst) > 0 {
            self.interfere.fetch_sub(1, Ordering::SeqCst);
            stored.doc_version += 1;
        }
        if stored.doc_version != quote.doc_version {
            return Err(RepositoryError::version_conflict(format!("expected version {}", quote.doc_version)));
        }
        let mut next = quote;
        next.doc_version += 1;
        *stored = next.clone();
        Ok(next)
    }

    async fn delete(&self, id: ObjectId) -> RepositoryResult<()> {
        self.quotes
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| RepositoryError::not_found(format!("No quote found to delete for ID: {}", id)))
    }

    async fn find(&self, filter: &QuoteFilter, options: &ListOptions) -> RepositoryResult<Vec<Quote>> {
        let mut matched: Vec<Quote> =
            self.quotes.read().await.values().filter(|q| filter.matches(q)).cloned().collect();
        matched.sort_by(|a, b| {
            let ordering = sort_key(a, options.sort_by).cmp(&sort_key(b, options.sort_by)).then(a.id.cmp(&b.id));
            match options.sort_order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });
        Ok(matched
            .into_iter()
            .skip(options.skip as usize)
            .take(options.limit as usize)
            .collect())
    }

    async fn find_expired(&self, now: DateTime<Utc>) -> RepositoryResult<Vec<Quote>> {
        Ok(self
            .quotes
            .read()
            .await
            .values()
            .filter(|q| q.terms.valid_until.map_or(false, |until| until < now))
            .filter(|q| !QuoteStatus::FINALIZED.contains(&q.status))
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryDirectory {
    pub users: HashMap<ObjectId, UserContact>,
    pub providers: HashMap<ObjectId, ProviderProfile>,
    pub services: HashMap<ObjectId, String>,
    pub categories: HashMap<ObjectId, String>,
}

fn pick<V: Clone>(source: &HashMap<ObjectId, V>, ids: &[ObjectId]) -> HashMap<ObjectId, V> {
    ids.iter().filter_map(|id| source.get(id).map(|v| (*id, v.clone()))).collect()
}

#[async_trait]
impl DirectoryRepository for InMemoryDirectory {
    async fn user_contacts(&self, ids: &[ObjectId]) -> RepositoryResult<HashMap<ObjectId, UserContact>> {
        Ok(pick(&self.users, ids))
    }

    async fn provider_profiles(&self, ids: &[ObjectId]) -> RepositoryResult<HashMap<ObjectId, ProviderProfile>> {
        Ok(pick(&self.providers, ids))
    }

    async fn service_names(&self, ids: &[ObjectId]) -> RepositoryResult<HashMap<ObjectId, String>> {
        Ok(pick(&self.services, ids))
    }

    async fn category_names(&self, ids: &[ObjectId]) -> RepositoryResult<HashMap<ObjectId, String>> {
        Ok(pick(&self.categories, ids))
    }
}

#[derive(Default)]
pub struct InMemoryBookingRepository {
    pub bookings: RwLock<HashMap<ObjectId, Booking>>,
    pub deleted: RwLock<Vec<ObjectId>>,
}

#[async_trait]
impl BookingRepository for InMemoryBookingRepository {
    async fn create(&self, booking: Booking) -> RepositoryResult<Booking> {
        let mut booking = booking;
        let id = booking.id.unwrap_or_else(ObjectId::new);
        booking.id = Some(id);
        self.bookings.write().await.insert(id, booking.clone());
        Ok(booking)
    }

    async fn delete(&self, id: ObjectId) -> RepositoryResult<()> {
        self.deleted.write().await.push(id);
        self.bookings
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| RepositoryError::not_found(format!("No booking found to delete for ID: {}", id)))
    }
}

pub struct Harness {
    pub clock: Arc<FixedClock>,
    pub quotes: Arc<InMemoryQuoteRepository>,
    pub bookings: Arc<InMemoryBookingRepository>,
    pub service: Arc<QuoteServiceImpl>,
}

pub fn harness() -> Harness {
    harness_with(InMemoryDirectory::default(), QuoteConfig::default())
}

pub fn harness_with(directory: InMemoryDirectory, config: QuoteConfig) -> Harness {
    let clock = Arc::new(FixedClock::new(start()));
    let quotes = Arc::new(InMemoryQuoteRepository::default());
    let bookings = Arc::new(InMemoryBookingRepository::default());
    let lifecycle = QuoteLifecycle::new(&config, clock.clone());
    let service = Arc::new(QuoteServiceImpl::new(
        quotes.clone(),
        Arc::new(directory),
        bookings.clone(),
        lifecycle,
        config,
    ));
    Harness { clock, quotes, bookings, service }
}

/// A valid draft for the given parties. Pricing: base 100, labor 2h x 20, materials 35.
pub fn sample_quote(customer_id: ObjectId, provider_id: ObjectId) -> Quote {
    Quote {
        id: None,
        quote_number: None,
        customer: CustomerSnapshot {
            user_id: customer_id,
            name: "Dana Customer".to_string(),
            email: "dana@example.com".to_string(),
            phone: Some("+1 555 0100".to_string()),
            address: None,
        },
        service_provider: ProviderSnapshot {
            provider_id,
            business_name: "Reliable Plumbing".to_string(),
            contact_name: Some("Sam".to_string()),
            email: None,
            phone: None,
        },
        service_details: ServiceDetails {
            service_id: ObjectId::new(),
            category_id: None,
            service_name: None,
            description: None,
            urgency: Default::default(),
            complexity: Default::default(),
            estimated_hours: Some(2.0),
        },
        title: "Replace kitchen faucet".to_string(),
        description: "Remove old faucet and install the new one".to_string(),
        service_location: ServiceLocation {
            address: Address {
                street: "12 Elm St".to_string(),
                city: "Springfield".to_string(),
                state: "IL".to_string(),
                zip_code: "62701".to_string(),
                country: None,
            },
            coordinates: None,
            access_instructions: None,
        },
        pricing: Pricing {
            base_price: BasePrice { amount: 100.0, description: None },
            labor_costs: vec![LaborCost {
                description: "Install".to_string(),
                hours: 2.0,
                hourly_rate: 20.0,
                total_amount: 0.0,
            }],
            materials: vec![Material {
                name: "Faucet".to_string(),
                quantity: 1.0,
                unit_price: 35.0,
                unit: None,
                total_price: 0.0,
            }],
            ..Pricing::default()
        },
        terms: Terms::default(),
        status: QuoteStatus::Draft,
        workflow: Workflow::default(),
        revision_history: Vec::new(),
        communications: Vec::new(),
        customer_response: None,
        attachments: Vec::new(),
        analytics: Default::default(),
        competitive: None,
        internal_notes: Vec::new(),
        related_booking: None,
        original_quote: None,
        created_at: None,
        updated_at: None,
        doc_version: 0,
    }
}
