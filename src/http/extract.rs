//! Request extractors that fail with `ShopError`, so every rejection renders
//! the same `{"error": ...}` body.

use axum::async_trait;
use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::Json;
use serde::de::DeserializeOwned;

use crate::access::Principal;
use crate::error::ShopError;
use crate::model::ModelStore;
use crate::shop::Shop;

/// Authenticated caller, resolved through the shop's gate.
pub struct Auth(pub Principal);

#[async_trait]
impl<S: ModelStore> FromRequestParts<Shop<S>> for Auth {
    type Rejection = ShopError;

    async fn from_request_parts(parts: &mut Parts, shop: &Shop<S>) -> Result<Self, Self::Rejection> {
        let header = match parts.headers.get(AUTHORIZATION) {
            Some(value) => Some(
                value
                    .to_str()
                    .map_err(|_| ShopError::unauthenticated("not authorized, unreadable header"))?,
            ),
            None => None,
        };
        shop.authenticate(header).map(Auth)
    }
}

/// JSON body whose rejection is a `Validation` error.
pub struct Body<T>(pub T);

#[async_trait]
impl<T, St> FromRequest<St> for Body<T>
where
    T: DeserializeOwned + Send,
    St: Send + Sync,
{
    type Rejection = ShopError;

    async fn from_request(req: Request, state: &St) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Body(value))
    }
}

/// Query string whose rejection is a `Validation` error.
pub struct Params<T>(pub T);

#[async_trait]
impl<T, St> FromRequestParts<St> for Params<T>
where
    T: DeserializeOwned + Send,
    St: Send + Sync,
{
    type Rejection = ShopError;

    async fn from_request_parts(parts: &mut Parts, state: &St) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(Params(value))
    }
}
