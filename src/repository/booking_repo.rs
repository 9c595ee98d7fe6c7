use async_trait::async_trait;
use bson::{doc, oid::ObjectId};
use mongodb::{Collection, Database};
use tracing::{error, info};

use crate::config::mongo_conf::MongoConfig;
use crate::model::booking::Booking;
use crate::repository::repository_error::{RepositoryError, RepositoryResult};

#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn create(&self, booking: Booking) -> RepositoryResult<Booking>;
    async fn delete(&self, id: ObjectId) -> RepositoryResult<()>;
}

pub struct MongoBookingRepository {
    collection: Collection<Booking>,
}

impl MongoBookingRepository {
    pub fn new(database: &Database, config: &MongoConfig) -> Self {
        MongoBookingRepository { collection: database.collection(config.booking_collection_name()) }
    }
}

#[async_trait]
impl BookingRepository for MongoBookingRepository {
    #[tracing::instrument(skip(self, booking), fields(quote_id = %booking.quote_id))]
    async fn create(&self, booking: Booking) -> RepositoryResult<Booking> {
        let mut new_booking = booking;
        new_booking.id = Some(new_booking.id.unwrap_or_else(ObjectId::new));

        match self.collection.insert_one(&new_booking, None).await {
            Ok(_) => {
                info!(id = ?new_booking.id, "Booking created successfully");
                Ok(new_booking)
            }
            Err(e) => {
                error!("Failed to create booking: {}", e);
                Err(RepositoryError::from(e))
            }
        }
    }

    #[tracing::instrument(skip(self), fields(id = %id))]
    async fn delete(&self, id: ObjectId) -> RepositoryResult<()> {
        match self.collection.delete_one(doc! { "_id": id }, None).await {
            Ok(result) if result.deleted_count > 0 => {
                info!("Booking deleted for ID: {}", id);
                Ok(())
            }
            Ok(_) => Err(RepositoryError::not_found(format!("No booking found to delete for ID: {}", id))),
            Err(e) => {
                error!("Failed to delete booking: {}", e);
                Err(RepositoryError::from(e))
            }
        }
    }
}
