//! Request identity extraction.
//!
//! Callers identify themselves with an `X-User-Id` header carrying
//! their account UUID; session handling lives upstream of this service.
//! The account is loaded on every request so the requester's role is
//! normalized exactly once, at the edge.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use common::UserId;
use domain::Requester;
use store::Datastore;

use crate::error::ApiError;
use crate::routes::AppState;

/// The authenticated requester, resolved from the `X-User-Id` header.
pub struct Identity(pub Requester);

impl<S> FromRequestParts<Arc<AppState<S>>> for Identity
where
    S: Datastore + Clone + 'static,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<S>>,
    ) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get("x-user-id")
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;
        let user_id: UserId = raw.parse().map_err(|_| ApiError::Unauthorized)?;

        let user = state
            .store
            .get_user(user_id)
            .await
            .map_err(domain::DomainError::from)?
            .ok_or(ApiError::Unauthorized)?;

        Ok(Identity(Requester::new(user.id, user.role)))
    }
}
