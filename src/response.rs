//! Envelope responders and response post-processing.

use axum::{
    extract::State,
    http::{Method, StatusCode, Uri},
    response::{IntoResponse, Json, Response},
};
use common::pagination::PageUrls;
use common::{ApiPaginated, ApiResponse, DeletedDto, PaginationLinks, PaginationMeta};
use domain::Listing;
use serde::Serialize;
use tracing::{trace, warn};

use crate::error::ApiError;
use crate::schemas::{AppState, ErrorResponse};

/// Status carried inside the envelope, recorded on the response so the
/// post-processing layer can see it without parsing the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvelopeStatus(pub u16);

/// Bodies that carry an envelope status.
pub trait Enveloped: Serialize {
    fn status(&self) -> u16;
}

impl<T: Serialize> Enveloped for ApiResponse<T> {
    fn status(&self) -> u16 {
        self.status
    }
}

impl<T: Serialize> Enveloped for ApiPaginated<T> {
    fn status(&self) -> u16 {
        self.status
    }
}

impl Enveloped for ErrorResponse {
    fn status(&self) -> u16 {
        self.status
    }
}

/// Serializes an envelope with transport status 200.
#[derive(Debug)]
pub struct Envelope<B>(pub B);

impl<B: Enveloped> IntoResponse for Envelope<B> {
    fn into_response(self) -> Response {
        let status = EnvelopeStatus(self.0.status());
        let mut response = Json(self.0).into_response();
        response.extensions_mut().insert(status);
        response
    }
}

pub type ApiResult<T> = Result<Envelope<ApiResponse<T>>, ApiError>;

pub fn ok<T>(message: &str, data: T) -> ApiResult<T> {
    Ok(Envelope(ApiResponse::ok(message, 200, data)))
}

pub fn created<T>(message: &str, data: T) -> ApiResult<T> {
    Ok(Envelope(ApiResponse::ok(message, 201, data)))
}

/// Delete endpoints report the flag in `data` whether or not a row went away;
/// a miss is `success: false` with status 400.
pub fn deleted(
    deleted: bool,
    success_message: &str,
    failure_message: &str,
) -> Envelope<ApiResponse<DeletedDto>> {
    Envelope(ApiResponse {
        success: deleted,
        message: if deleted { success_message } else { failure_message }.to_string(),
        status: if deleted { 200 } else { 400 },
        data: Some(DeletedDto { deleted }),
    })
}

/// Renders a listing: the paginated envelope with `meta` and `links`, or
/// the plain envelope holding every item.
pub fn listing<T: Serialize>(listing: Listing<T>, message: &str, urls: &PageUrls) -> Response {
    match listing {
        Listing::Paginated(page) => {
            let last_page = page.last_page();
            let meta = PaginationMeta::new(
                urls,
                page.page,
                page.per_page,
                page.total,
                page.items.len() as u64,
            );
            let links = PaginationLinks::new(urls, page.page, last_page);

            Envelope(ApiPaginated {
                success: true,
                message: message.to_string(),
                status: 200,
                data: page.items,
                meta,
                links,
            })
            .into_response()
        }
        Listing::All(items) => Envelope(ApiResponse::ok(message, 200, items)).into_response(),
    }
}

/// Page link builder for the current request path.
pub fn page_urls(state: &AppState, uri: &Uri, query: Vec<(String, String)>) -> PageUrls {
    let base = state.settings.app.url.trim_end_matches('/');
    PageUrls::new(format!("{}{}", base, uri.path()), query)
}

/// Wraps bare 405 and 408 responses from the router and the timeout layer
/// in the envelope and, when configured, copies the envelope status onto the
/// transport status.
pub async fn finalize_response(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    response: Response,
) -> Response {
    let bare = response.extensions().get::<EnvelopeStatus>().is_none();

    let mut response = match response.status() {
        StatusCode::METHOD_NOT_ALLOWED if bare => {
            trace!("Wrapping method not allowed response for {} {}", method, uri);
            ApiError::MethodNotAllowed {
                method: method.to_string(),
                path: uri.path().trim_start_matches('/').to_string(),
            }
            .into_response()
        }
        StatusCode::REQUEST_TIMEOUT if bare => {
            warn!("Request {} {} timed out", method, uri);
            ApiError::RequestTimeout.into_response()
        }
        _ => response,
    };

    if state.settings.http.mirror_status {
        let envelope_status = response.extensions().get::<EnvelopeStatus>().copied();
        if let Some(status) = envelope_status.and_then(|EnvelopeStatus(code)| StatusCode::from_u16(code).ok()) {
            *response.status_mut() = status;
        }
    }

    response
}

/// Envelope for requests that match no route.
pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::RouteNotFound(uri.path().trim_start_matches('/').to_string())
}
