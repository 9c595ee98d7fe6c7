use axum::{extract::FromRequestParts, http::request::Parts};
use bson::oid::ObjectId;
use tracing::warn;

use crate::model::quote::{Party, Quote};
use crate::util::error::HandlerError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const ROLE_HEADER: &str = "x-actor-role";

/// Caller identity as resolved by the upstream gateway. This service trusts
/// the headers and never authenticates on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: ObjectId,
    pub role: Party,
}

impl Actor {
    pub fn require(&self, role: Party) -> Result<(), HandlerError> {
        if self.role == role {
            Ok(())
        } else {
            Err(HandlerError::forbidden(format!("Only a {} can do this", role_name(role))))
        }
    }

    /// The caller must be the quote's customer or its provider, matched on the side of its role.
    pub fn require_party_of(&self, quote: &Quote) -> Result<(), HandlerError> {
        let party_id = match self.role {
            Party::Customer => quote.customer.user_id,
            Party::Provider => quote.service_provider.provider_id,
        };
        if party_id == self.user_id {
            Ok(())
        } else {
            warn!(user_id = %self.user_id, quote_id = ?quote.id, "Caller is not a party to the quote");
            Err(HandlerError::forbidden(format!(
                "This quote belongs to another {}",
                role_name(self.role)
            )))
        }
    }
}

fn role_name(role: Party) -> &'static str {
    match role {
        Party::Customer => "customer",
        Party::Provider => "provider",
    }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Result<&'a str, HandlerError> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| HandlerError::unauthorized(format!("Missing {} header", name)))
}

impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = HandlerError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = ObjectId::parse_str(header(parts, USER_ID_HEADER)?).map_err(|_| {
            warn!("Rejected request with malformed {}", USER_ID_HEADER);
            HandlerError::unauthorized(format!("Invalid {} header", USER_ID_HEADER))
        })?;
        let role = match header(parts, ROLE_HEADER)? {
            "customer" => Party::Customer,
            "provider" => Party::Provider,
            other => {
                warn!("Rejected request with unknown role {:?}", other);
                return Err(HandlerError::unauthorized(format!("Invalid {} header", ROLE_HEADER)));
            }
        };
        Ok(Actor { user_id, role })
    }
}
