use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::handler::quote_handler::{
    add_communication_handler, add_internal_note_handler, add_revision_handler, convert_to_booking_handler,
    create_quote_handler, delete_quote_handler, extend_expiry_handler, get_quote_handler, list_customer_quotes_handler,
    list_expired_handler, list_provider_quotes_handler, record_view_handler, respond_to_quote_handler,
    sweep_expired_handler, update_quote_handler, update_quote_status_handler,
};
use crate::service::quote_service::QuoteServiceImpl;

pub fn quote_router(service: Arc<QuoteServiceImpl>) -> Router {
    // Read side
    let queries = Router::new()
        .route("/quotes/expired", get(list_expired_handler))
        .route("/providers/{provider_id}/quotes", get(list_provider_quotes_handler))
        .route("/customers/{user_id}/quotes", get(list_customer_quotes_handler));

    // Lifecycle actions, identity checked per handler
    let commands = Router::new()
        .route("/quotes", post(create_quote_handler))
        .route(
            "/quotes/{id}",
            get(get_quote_handler).put(update_quote_handler).delete(delete_quote_handler),
        )
        .route("/quotes/{id}/status", put(update_quote_status_handler))
        .route("/quotes/{id}/revisions", post(add_revision_handler))
        .route("/quotes/{id}/communications", post(add_communication_handler))
        .route("/quotes/{id}/view", post(record_view_handler))
        .route("/quotes/{id}/response", post(respond_to_quote_handler))
        .route("/quotes/{id}/extend", post(extend_expiry_handler))
        .route("/quotes/{id}/notes", post(add_internal_note_handler))
        .route("/quotes/{id}/convert", post(convert_to_booking_handler))
        .route("/quotes/expired/sweep", post(sweep_expired_handler));

    queries.merge(commands).with_state(service)
}
