//! Request extractors: authentication, validated bodies, record ids,
//! client address and raw query parameters.

use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequest, FromRequestParts, Path, Query, Request},
    http::{header, request::Parts},
    Json,
};
use domain::acl::{self, Subject};
use domain::pagination::QueryMap;
use serde::de::DeserializeOwned;
use std::convert::Infallible;
use std::net::SocketAddr;
use tracing::{debug, trace};
use validator::Validate;

use crate::error::ApiError;
use crate::schemas::AppState;

/// The request's principal, resolved from an `Authorization: Bearer` token.
/// Requests without a valid token get an empty context; routes decide
/// whether that is acceptable through [`Auth::authorize`].
#[derive(Debug, Clone, Default)]
pub struct Auth {
    pub subject: Option<Subject>,
    /// Token the request authenticated with
    pub token_id: Option<i32>,
}

impl Auth {
    pub fn authorize(
        &self,
        permission: common::Permission,
        owner: Option<i32>,
    ) -> Result<&Subject, ApiError> {
        Ok(acl::authorize(self.subject.as_ref(), permission, owner)?)
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[async_trait]
impl FromRequestParts<AppState> for Auth {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(parts) else {
            trace!("No bearer token on request");
            return Ok(Auth::default());
        };

        let Some((token, user)) = domain::auth::find_token(&state.db, token).await? else {
            debug!("Unknown bearer token");
            return Ok(Auth::default());
        };

        let subject = Subject::load(&state.db, &user).await?;
        Ok(Auth {
            subject: Some(subject),
            token_id: Some(token.id),
        })
    }
}

/// JSON body that has been deserialized and validated.
///
/// Handlers that check permissions first take `Result<ValidatedJson<T>, ApiError>`
/// and unwrap it after authorization.
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await.map_err(|rejection| {
            debug!("Rejected request body: {}", rejection.body_text());
            ApiError::BadRequest(rejection.body_text())
        })?;

        value.validate()?;
        Ok(ValidatedJson(value))
    }
}

/// Record id from the `:id` path segment. Anything other than an integer
/// of at least 1 without leading zeros does not match the route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdPath(pub i32);

fn parse_id(raw: &str) -> Option<i32> {
    if !raw.starts_with(|c: char| matches!(c, '1'..='9')) || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for IdPath {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let path = parts.uri.path().trim_start_matches('/').to_string();
        let not_found = || ApiError::RouteNotFound(path.clone());

        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| not_found())?;

        parse_id(&raw).map(IdPath).ok_or_else(not_found)
    }
}

/// Address of the caller: first `X-Forwarded-For` entry, else the socket
/// peer, else `unknown`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for ClientIp {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let forwarded = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|value| !value.is_empty());

        if let Some(ip) = forwarded {
            return Ok(ClientIp(ip.to_string()));
        }

        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());

        Ok(ClientIp(peer.unwrap_or_else(|| "unknown".to_string())))
    }
}

/// Raw query parameters. Malformed query strings read as empty.
#[derive(Debug, Clone, Default)]
pub struct QueryParams(pub QueryMap);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for QueryParams {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let params = match Query::<QueryMap>::from_request_parts(parts, state).await {
            Ok(Query(params)) => params,
            Err(e) => {
                debug!("Ignoring malformed query string: {}", e);
                QueryMap::new()
            }
        };
        Ok(QueryParams(params))
    }
}
