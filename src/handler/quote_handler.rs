use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use bson::oid::ObjectId;
use tracing::{error, info};
use validator::Validate;

use crate::dto::quote_dto::{
    AddCommunicationRequest, AddInternalNoteRequest, AddRevisionRequest, CustomerResponseRequest,
    ExtendExpiryRequest, ListQuotesQuery, SweepResultDto, UpdateQuoteStatusRequest,
};
use crate::middlewares::identity::Actor;
use crate::model::quote::{Party, Quote};
use crate::service::quote_service::{QuoteService, QuoteServiceImpl};
use crate::util::error::HandlerError;

fn parse_id(raw: &str, what: &str) -> Result<ObjectId, HandlerError> {
    ObjectId::parse_str(raw).map_err(|_| HandlerError::bad_request(format!("Invalid {} id", what)))
}

/// Loads the quote and checks the caller is on it.
async fn require_party(service: &QuoteServiceImpl, id: ObjectId, actor: &Actor) -> Result<(), HandlerError> {
    let view = service.get_quote(id).await?;
    actor.require_party_of(&view.quote)
}

pub async fn create_quote_handler(
    State(service): State<Arc<QuoteServiceImpl>>,
    actor: Actor,
    Json(quote): Json<Quote>,
) -> Result<impl IntoResponse, HandlerError> {
    actor.require(Party::Provider)?;
    if quote.service_provider.provider_id != actor.user_id {
        return Err(HandlerError::forbidden("Providers can only quote on their own behalf"));
    }
    let created = service.create_quote(quote).await.map_err(|e| {
        error!("[create_quote_handler] {}", e);
        HandlerError::from(e)
    })?;
    info!("[create_quote_handler] Created quote {:?}", created.quote_number);
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get_quote_handler(
    State(service): State<Arc<QuoteServiceImpl>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HandlerError> {
    let id = parse_id(&id, "quote")?;
    let quote = service.get_quote(id).await?;
    Ok(Json(quote))
}

pub async fn update_quote_handler(
    State(service): State<Arc<QuoteServiceImpl>>,
    actor: Actor,
    Path(id): Path<String>,
    Json(quote): Json<Quote>,
) -> Result<impl IntoResponse, HandlerError> {
    actor.require(Party::Provider)?;
    let id = parse_id(&id, "quote")?;
    require_party(&service, id, &actor).await?;
    let updated = service.update_quote(id, quote).await?;
    Ok(Json(updated))
}

pub async fn delete_quote_handler(
    State(service): State<Arc<QuoteServiceImpl>>,
    actor: Actor,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HandlerError> {
    actor.require(Party::Provider)?;
    let id = parse_id(&id, "quote")?;
    require_party(&service, id, &actor).await?;
    service.delete_quote(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn update_quote_status_handler(
    State(service): State<Arc<QuoteServiceImpl>>,
    actor: Actor,
    Path(id): Path<String>,
    Json(payload): Json<UpdateQuoteStatusRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    actor.require(Party::Provider)?;
    let id = parse_id(&id, "quote")?;
    require_party(&service, id, &actor).await?;
    let updated = service.update_quote_status(id, payload.status).await?;
    Ok(Json(updated))
}

pub async fn add_revision_handler(
    State(service): State<Arc<QuoteServiceImpl>>,
    actor: Actor,
    Path(id): Path<String>,
    Json(payload): Json<AddRevisionRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    actor.require(Party::Provider)?;
    let id = parse_id(&id, "quote")?;
    require_party(&service, id, &actor).await?;
    payload.validate().map_err(HandlerError::validation)?;
    let updated = service
        .add_revision(id, payload.changes, actor.user_id, payload.reason)
        .await?;
    Ok(Json(updated))
}

pub async fn add_communication_handler(
    State(service): State<Arc<QuoteServiceImpl>>,
    actor: Actor,
    Path(id): Path<String>,
    Json(payload): Json<AddCommunicationRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let id = parse_id(&id, "quote")?;
    require_party(&service, id, &actor).await?;
    payload.validate().map_err(HandlerError::validation)?;
    let updated = service
        .add_communication(id, actor.role, payload.message, payload.kind, payload.attachments)
        .await?;
    Ok(Json(updated))
}

pub async fn record_view_handler(
    State(service): State<Arc<QuoteServiceImpl>>,
    actor: Actor,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HandlerError> {
    actor.require(Party::Customer)?;
    let id = parse_id(&id, "quote")?;
    require_party(&service, id, &actor).await?;
    let updated = service.record_view(id).await?;
    Ok(Json(updated))
}

pub async fn respond_to_quote_handler(
    State(service): State<Arc<QuoteServiceImpl>>,
    actor: Actor,
    Path(id): Path<String>,
    Json(payload): Json<CustomerResponseRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    actor.require(Party::Customer)?;
    let id = parse_id(&id, "quote")?;
    require_party(&service, id, &actor).await?;
    payload.validate().map_err(HandlerError::validation)?;
    let updated = service
        .respond_to_quote(id, payload.decision, payload.message, payload.counter_offer)
        .await?;
    Ok(Json(updated))
}

pub async fn extend_expiry_handler(
    State(service): State<Arc<QuoteServiceImpl>>,
    actor: Actor,
    Path(id): Path<String>,
    Json(payload): Json<ExtendExpiryRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    actor.require(Party::Provider)?;
    let id = parse_id(&id, "quote")?;
    require_party(&service, id, &actor).await?;
    payload.validate().map_err(HandlerError::validation)?;
    let updated = service.extend_expiry(id, payload.days).await?;
    Ok(Json(updated))
}

pub async fn add_internal_note_handler(
    State(service): State<Arc<QuoteServiceImpl>>,
    actor: Actor,
    Path(id): Path<String>,
    Json(payload): Json<AddInternalNoteRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    actor.require(Party::Provider)?;
    let id = parse_id(&id, "quote")?;
    require_party(&service, id, &actor).await?;
    payload.validate().map_err(HandlerError::validation)?;
    let updated = service.add_internal_note(id, actor.user_id, payload.note).await?;
    Ok(Json(updated))
}

/// Either party on an accepted quote may book it.
pub async fn convert_to_booking_handler(
    State(service): State<Arc<QuoteServiceImpl>>,
    actor: Actor,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HandlerError> {
    let id = parse_id(&id, "quote")?;
    require_party(&service, id, &actor).await?;
    let conversion = service.convert_to_booking(id).await.map_err(|e| {
        error!("[convert_to_booking_handler] {}", e);
        HandlerError::from(e)
    })?;
    Ok((StatusCode::CREATED, Json(conversion)))
}

pub async fn list_expired_handler(
    State(service): State<Arc<QuoteServiceImpl>>,
) -> Result<impl IntoResponse, HandlerError> {
    let quotes = service.get_expired().await?;
    Ok(Json(quotes))
}

pub async fn sweep_expired_handler(
    State(service): State<Arc<QuoteServiceImpl>>,
) -> Result<impl IntoResponse, HandlerError> {
    let expired = service.expire_overdue().await?;
    info!("[sweep_expired_handler] Expired {} quotes", expired);
    Ok(Json(SweepResultDto { expired }))
}

pub async fn list_provider_quotes_handler(
    State(service): State<Arc<QuoteServiceImpl>>,
    Path(provider_id): Path<String>,
    Query(query): Query<ListQuotesQuery>,
) -> Result<impl IntoResponse, HandlerError> {
    let provider_id = parse_id(&provider_id, "provider")?;
    query.validate().map_err(HandlerError::validation)?;
    let options = service.list_options(&query);
    let quotes = service.find_by_provider(provider_id, query.status, options).await?;
    Ok(Json(quotes))
}

pub async fn list_customer_quotes_handler(
    State(service): State<Arc<QuoteServiceImpl>>,
    Path(user_id): Path<String>,
    Query(query): Query<ListQuotesQuery>,
) -> Result<impl IntoResponse, HandlerError> {
    let user_id = parse_id(&user_id, "customer")?;
    query.validate().map_err(HandlerError::validation)?;
    let options = service.list_options(&query);
    let quotes = service.find_by_customer(user_id, query.status, options).await?;
    Ok(Json(quotes))
}
