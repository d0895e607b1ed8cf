use axum::{extract::State, http::Uri, response::Response};
use common::Permission;
use domain::categories;
use domain::pagination::PageRequest;
use tracing::{debug, instrument, trace};

use crate::error::ApiError;
use crate::extract::{Auth, QueryParams};
use crate::response;
use crate::schemas::AppState;

/// List expense categories
#[utoipa::path(
    get,
    path = "/categories",
    tag = "categories",
    security(("bearer" = [])),
    params(
        ("paginate" = Option<bool>, Query, description = "Return a page (default) or every category"),
        ("page" = Option<u64>, Query, description = "Page number, starting at 1"),
        ("perPage" = Option<u64>, Query, description = "Page size, at most `pagination.max_per_page`")
    ),
    responses(
        (status = 200, description = "Category listing", body = common::ApiPaginated<common::CategoryDto>),
        (status = 403, description = "Missing `view categories` (envelope status)", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_categories(
    State(state): State<AppState>,
    auth: Auth,
    QueryParams(query): QueryParams,
    uri: Uri,
) -> Result<Response, ApiError> {
    trace!("Entering get_categories function");
    auth.authorize(Permission::ViewCategories, None)?;

    let request = PageRequest::from_query(&query, state.settings.pagination.limits())?;
    let listing = categories::list(&state.db, &request).await?;
    debug!("Returning {} categories", listing.len());

    let urls = response::page_urls(&state, &uri, request.query_pairs());
    Ok(response::listing(listing, "Category listing", &urls))
}
