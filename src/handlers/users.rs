use axum::{
    extract::State,
    http::Uri,
    response::Response,
};
use common::{ApiResponse, CreateUserRequest, DeletedDto, Permission, UpdateUserRequest, UserDto};
use domain::pagination::PageRequest;
use domain::users;
use tracing::{debug, info, instrument, trace, warn};

use crate::error::ApiError;
use crate::extract::{Auth, IdPath, QueryParams, ValidatedJson};
use crate::response::{self, ApiResult, Envelope};
use crate::schemas::AppState;

/// Get a page of users
#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    security(("bearer" = [])),
    params(
        ("paginate" = Option<bool>, Query, description = "Return a page (default) or every user"),
        ("page" = Option<u64>, Query, description = "Page number, starting at 1"),
        ("perPage" = Option<u64>, Query, description = "Page size, at most `pagination.max_per_page`")
    ),
    responses(
        (status = 200, description = "User listing", body = common::ApiPaginated<UserDto>),
        (status = 403, description = "Missing `view users` (envelope status)", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_users(
    State(state): State<AppState>,
    auth: Auth,
    QueryParams(query): QueryParams,
    uri: Uri,
) -> Result<Response, ApiError> {
    trace!("Entering get_users function");
    auth.authorize(Permission::ViewUsers, None)?;

    let request = PageRequest::from_query(&query, state.settings.pagination.limits())?;
    let listing = users::list(&state.db, &request).await?;
    debug!("Returning {} users", listing.len());

    let urls = response::page_urls(&state, &uri, request.query_pairs());
    Ok(response::listing(listing, "User listing", &urls))
}

/// Get a user by id
#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "users",
    security(("bearer" = [])),
    params(("id" = i32, Path, description = "User id")),
    responses(
        (status = 200, description = "User resource", body = common::ApiResponse<UserDto>),
        (status = 400, description = "Unknown user (envelope status)", body = crate::schemas::ErrorResponse),
        (status = 403, description = "Missing `view user` (envelope status)", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    IdPath(user_id): IdPath,
    auth: Auth,
) -> ApiResult<UserDto> {
    trace!("Entering get_user function");
    auth.authorize(Permission::ViewUser, None)?;

    let Some(user) = users::find(&state.db, user_id).await? else {
        warn!("User with ID {} not found", user_id);
        return Err(ApiError::BadRequest("User resource not found.".to_string()));
    };

    response::ok("User resource", users::to_dto(&state.db, user).await?)
}

/// Create a user
#[utoipa::path(
    post,
    path = "/users",
    tag = "users",
    security(("bearer" = [])),
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User resource created (envelope status)", body = common::ApiResponse<UserDto>),
        (status = 400, description = "Invalid request (envelope status)", body = crate::schemas::ErrorResponse),
        (status = 403, description = "Missing `create users` (envelope status)", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    auth: Auth,
    payload: Result<ValidatedJson<CreateUserRequest>, ApiError>,
) -> ApiResult<UserDto> {
    trace!("Entering create_user function");
    auth.authorize(Permission::CreateUsers, None)?;
    let ValidatedJson(request) = payload?;

    let user = users::create(&state.db, request).await?;
    info!("User resource created with ID: {}", user.id);

    response::created("User resource created.", user)
}

/// Update the given fields of a user
#[utoipa::path(
    patch,
    path = "/users/{id}",
    tag = "users",
    security(("bearer" = [])),
    params(("id" = i32, Path, description = "User id")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User resource updated", body = common::ApiResponse<UserDto>),
        (status = 400, description = "Invalid request or unknown user (envelope status)", body = crate::schemas::ErrorResponse),
        (status = 403, description = "Missing `update users` (envelope status)", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    IdPath(user_id): IdPath,
    auth: Auth,
    payload: Result<ValidatedJson<UpdateUserRequest>, ApiError>,
) -> ApiResult<UserDto> {
    trace!("Entering update_user function");
    auth.authorize(Permission::UpdateUsers, None)?;
    let ValidatedJson(request) = payload?;

    match users::update(&state.db, user_id, request).await? {
        Some(user) => {
            info!("User resource {} updated", user_id);
            response::ok("User resource updated.", user)
        }
        None => {
            warn!("User with ID {} not found for update", user_id);
            Err(ApiError::BadRequest("User resource not updated.".to_string()))
        }
    }
}

/// Delete a user and, by cascade, their expenses
#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = "users",
    security(("bearer" = [])),
    params(("id" = i32, Path, description = "User id")),
    responses(
        (status = 200, description = "`deleted` tells whether a user was removed; 400 in the envelope when not", body = common::ApiResponse<DeletedDto>),
        (status = 403, description = "Missing `delete users` (envelope status)", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    IdPath(user_id): IdPath,
    auth: Auth,
) -> Result<Envelope<ApiResponse<DeletedDto>>, ApiError> {
    trace!("Entering delete_user function");
    auth.authorize(Permission::DeleteUsers, None)?;

    let deleted = users::delete(&state.db, user_id).await?;
    if deleted {
        info!("User resource {} deleted", user_id);
    } else {
        warn!("User with ID {} not found for deletion", user_id);
    }

    Ok(response::deleted(
        deleted,
        "User resource deleted.",
        "User resource not found.",
    ))
}
