use std::collections::HashMap;

use async_trait::async_trait;
use bson::{doc, oid::ObjectId};
use futures::stream::StreamExt;
use mongodb::{Collection, Database};
use serde::de::DeserializeOwned;
use tracing::{debug, error};

use crate::model::directory::{NamedRef, ProviderProfile, UserContact};
use crate::repository::repository_error::{RepositoryError, RepositoryResult};

/// Lookups into collections this engine reads but never writes. Missing ids are
/// simply absent from the returned map.
#[async_trait]
pub trait DirectoryRepository: Send + Sync {
    async fn user_contacts(&self, ids: &[ObjectId]) -> RepositoryResult<HashMap<ObjectId, UserContact>>;
    async fn provider_profiles(&self, ids: &[ObjectId]) -> RepositoryResult<HashMap<ObjectId, ProviderProfile>>;
    async fn service_names(&self, ids: &[ObjectId]) -> RepositoryResult<HashMap<ObjectId, String>>;
    async fn category_names(&self, ids: &[ObjectId]) -> RepositoryResult<HashMap<ObjectId, String>>;
}

pub struct MongoDirectoryRepository {
    users: Collection<UserContact>,
    providers: Collection<ProviderProfile>,
    services: Collection<NamedRef>,
    categories: Collection<NamedRef>,
}

impl MongoDirectoryRepository {
    pub fn new(database: &Database) -> Self {
        MongoDirectoryRepository {
            users: database.collection("users"),
            providers: database.collection("serviceproviders"),
            services: database.collection("services"),
            categories: database.collection("categories"),
        }
    }
}

async fn fetch_by_ids<T>(collection: &Collection<T>, ids: &[ObjectId]) -> RepositoryResult<Vec<T>>
where
    T: DeserializeOwned + Unpin + Send + Sync,
{
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let mut cursor = collection
        .find(doc! { "_id": { "$in": ids.to_vec() } }, None)
        .await
        .map_err(|e| {
            error!("Failed to query {}: {}", collection.name(), e);
            RepositoryError::from(e)
        })?;

    let mut records = Vec::new();
    while let Some(record) = cursor.next().await {
        match record {
            Ok(r) => records.push(r),
            Err(e) => {
                error!("Failed to deserialize {} record: {}", collection.name(), e);
                return Err(RepositoryError::serialization(e.to_string()));
            }
        }
    }
    debug!("Resolved {}/{} ids from {}", records.len(), ids.len(), collection.name());
    Ok(records)
}

fn names(records: Vec<NamedRef>) -> HashMap<ObjectId, String> {
    records.into_iter().map(|r| (r.id, r.name)).collect()
}

#[async_trait]
impl DirectoryRepository for MongoDirectoryRepository {
    #[tracing::instrument(skip(self, ids), fields(count = ids.len()))]
    async fn user_contacts(&self, ids: &[ObjectId]) -> RepositoryResult<HashMap<ObjectId, UserContact>> {
        let users = fetch_by_ids(&self.users, ids).await?;
        Ok(users.into_iter().map(|u| (u.id, u)).collect())
    }

    #[tracing::instrument(skip(self, ids), fields(count = ids.len()))]
    async fn provider_profiles(&self, ids: &[ObjectId]) -> RepositoryResult<HashMap<ObjectId, ProviderProfile>> {
        let providers = fetch_by_ids(&self.providers, ids).await?;
        Ok(providers.into_iter().map(|p| (p.id, p)).collect())
    }

    #[tracing::instrument(skip(self, ids), fields(count = ids.len()))]
    async fn service_names(&self, ids: &[ObjectId]) -> RepositoryResult<HashMap<ObjectId, String>> {
        Ok(names(fetch_by_ids(&self.services, ids).await?))
    }

    #[tracing::instrument(skip(self, ids), fields(count = ids.len()))]
    async fn category_names(&self, ids: &[ObjectId]) -> RepositoryResult<HashMap<ObjectId, String>> {
        Ok(names(fetch_by_ids(&self.categories, ids).await?))
    }
}
