//! Access Control Gate.
//!
//! `Gate::authenticate` turns a bearer credential into a [`Principal`] by
//! verifying the token and re-reading the user record, so deleted users,
//! role changes and password resets take effect on the next request.
//! `Principal::require` checks the principal's role against an operation's
//! allowed-role set.

use chrono::Utc;
use tracing::debug;

use crate::error::ShopError;
use crate::identity::{Role, TokenError, TokenSigner, User};
use crate::ids::UserId;
use crate::model::{ModelStore, ModelsExt};

/// Authenticated identity attached to a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub role: Role,
    pub username: String,
}

impl Principal {
    pub fn from_user(user: &User) -> Self {
        Self {
            user_id: user.id.clone(),
            role: user.role,
            username: user.username.clone(),
        }
    }

    /// `Forbidden` unless this principal's role is in `allowed`.
    pub fn require(&self, allowed: &[Role]) -> Result<(), ShopError> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            Err(ShopError::forbidden(format!(
                "role {} may not perform this operation",
                self.role
            )))
        }
    }
}

/// Allowed-role sets used across the shop.
pub mod roles {
    use crate::identity::Role;

    pub const CUSTOMER: &[Role] = &[Role::Customer];
    pub const ADMIN: &[Role] = &[Role::Admin];
    pub const ORDER_MANAGERS: &[Role] = &[Role::Admin, Role::Supervisor];
    pub const CATALOG_EDITORS: &[Role] = &[Role::Admin, Role::Seller];
    pub const CATALOG_VIEWERS: &[Role] = &[Role::Admin, Role::Supervisor, Role::Seller];
    pub const SELLER: &[Role] = &[Role::Seller];
}

/// Verifies credentials against the signer and the user store.
#[derive(Debug, Clone)]
pub struct Gate<S> {
    store: S,
    signer: TokenSigner,
}

impl<S: ModelStore> Gate<S> {
    pub fn new(store: S, signer: TokenSigner) -> Self {
        Self { store, signer }
    }

    pub fn signer(&self) -> &TokenSigner {
        &self.signer
    }

    /// Resolve an `Authorization` header value (`Bearer <token>`) to a principal.
    pub fn authenticate(&self, authorization: Option<&str>) -> Result<Principal, ShopError> {
        let header = authorization
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or_else(|| ShopError::unauthenticated("not authorized, no token"))?;
        let token = bearer_token(header)
            .ok_or_else(|| ShopError::unauthenticated("not authorized, expected a bearer token"))?;
        self.authenticate_token(token)
    }

    pub fn authenticate_token(&self, token: &str) -> Result<Principal, ShopError> {
        let claims = self.signer.verify(token, Utc::now()).map_err(|e| {
            debug!(error = %e, "token rejected");
            match e {
                TokenError::Expired => ShopError::unauthenticated("not authorized, token expired"),
                _ => ShopError::unauthenticated("not authorized, token failed"),
            }
        })?;

        let user = self
            .store
            .models::<User>()
            .get(claims.sub.as_str())?
            .map(|v| v.data)
            .ok_or_else(|| ShopError::unauthenticated("not authorized, user no longer exists"))?;

        if user.credential_epoch != claims.epoch {
            return Err(ShopError::unauthenticated(
                "not authorized, credentials changed since token was issued",
            ));
        }

        Ok(Principal::from_user(&user))
    }

    pub fn authorize(&self, principal: &Principal, allowed: &[Role]) -> Result<(), ShopError> {
        principal.require(allowed)
    }
}

fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
