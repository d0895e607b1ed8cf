use crate::pagination::{PaginationLinks, PaginationMeta};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Uniform response envelope returned by every endpoint.
///
/// The transport status is normally 200; the outcome is carried by
/// `success` and `status`. Error responses carry `data: null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Whether the request succeeded
    pub success: bool,
    /// Human readable message
    pub message: String,
    /// HTTP-like status code of the outcome
    pub status: u16,
    /// Response data
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, status: u16, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            status,
            data: Some(data),
        }
    }

    pub fn failure(message: impl Into<String>, status: u16) -> Self {
        Self {
            success: false,
            message: message.into(),
            status,
            data: None,
        }
    }
}

/// Paginated variant of [`ApiResponse`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ApiPaginated<T> {
    pub success: bool,
    pub message: String,
    pub status: u16,
    pub data: Vec<T>,
    pub meta: PaginationMeta,
    pub links: PaginationLinks,
}
