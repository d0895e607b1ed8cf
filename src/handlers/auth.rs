use axum::extract::State;
use common::{AuthDto, LoginRequest, TokenRequest};
use domain::auth::{self, TOKEN_TYPE};
use domain::roles;
use domain::throttle::LoginThrottle;
use model::entities::user;
use tracing::{debug, info, instrument, trace, warn};

use crate::error::{ApiError, LOGIN_FAILED};
use crate::extract::{Auth, ClientIp, ValidatedJson};
use crate::response::{self, ApiResult};
use crate::schemas::AppState;

pub const LOGIN_SUCCESS: &str = "Login successful.";
pub const LOGOUT_SUCCESS: &str = "Logout successful.";

/// Token name used for tokens issued by `/auth/login`.
const LOGIN_TOKEN_NAME: &str = "api";

/// Checks credentials under the login throttle. A throttled key is rejected
/// before the password is looked at; the attempt taken for a wrong password
/// stays counted.
async fn authenticate(
    state: &AppState,
    username: &str,
    password: &str,
    ip: &str,
) -> Result<user::Model, ApiError> {
    let key = LoginThrottle::key(username, ip);

    if let Err(seconds) = state.throttle.attempt(&key).await {
        warn!("Login for '{}' from {} is throttled for {}s", username, ip, seconds);
        return Err(ApiError::LoginFailed(format!(
            "Too many login attempts. Please try again in {} seconds.",
            seconds
        )));
    }

    match auth::attempt(&state.db, username, password).await? {
        Some(user) => {
            state.throttle.clear(&key).await;
            Ok(user)
        }
        None => Err(ApiError::LoginFailed(LOGIN_FAILED.to_string())),
    }
}

async fn auth_resource(state: &AppState, user: user::Model, token: String) -> Result<AuthDto, ApiError> {
    let role = roles::find(&state.db, user.role_id)
        .await?
        .ok_or_else(|| ApiError::Internal(format!("User {} has no role {}", user.id, user.role_id)))?;

    Ok(AuthDto {
        id: user.id,
        name: user.username,
        email: user.email,
        role: roles::to_dto(&state.db, role).await?,
        token,
        token_type: TOKEN_TYPE.to_string(),
    })
}

/// Authenticate with username and password
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated principal with a new bearer token", body = common::ApiResponse<AuthDto>),
        (status = 401, description = "Wrong credentials or too many attempts (envelope status)", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    payload: ValidatedJson<LoginRequest>,
) -> ApiResult<AuthDto> {
    trace!("Entering login function");
    let ValidatedJson(request) = payload;

    let user = authenticate(&state, &request.username, &request.password, &ip).await?;
    let token = auth::issue_token(&state.db, user.id, LOGIN_TOKEN_NAME).await?;
    info!("User '{}' logged in", user.username);

    response::ok(LOGIN_SUCCESS, auth_resource(&state, user, token).await?)
}

/// Issue a named token for a device
///
/// Also served at `/sanctum/token` for clients of the earlier API.
#[utoipa::path(
    post,
    path = "/auth/token",
    tag = "auth",
    request_body = TokenRequest,
    responses(
        (status = 200, description = "Authenticated principal with a new bearer token", body = common::ApiResponse<AuthDto>),
        (status = 401, description = "Wrong credentials or too many attempts (envelope status)", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state, payload))]
pub async fn token(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    payload: ValidatedJson<TokenRequest>,
) -> ApiResult<AuthDto> {
    trace!("Entering token function");
    let ValidatedJson(request) = payload;

    let user = authenticate(&state, &request.username, &request.password, &ip).await?;
    let token = auth::issue_token(&state.db, user.id, &request.device_name).await?;
    info!("Issued token '{}' for user '{}'", request.device_name, user.username);

    response::ok(LOGIN_SUCCESS, auth_resource(&state, user, token).await?)
}

/// Revoke the token used for this request
#[utoipa::path(
    get,
    path = "/logout",
    tag = "auth",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Token revoked, `data` is null"),
        (status = 400, description = "Unauthenticated (envelope status)", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn logout(State(state): State<AppState>, context: Auth) -> ApiResult<Option<()>> {
    trace!("Entering logout function");
    let (Some(subject), Some(token_id)) = (context.subject.as_ref(), context.token_id) else {
        return Err(ApiError::Unauthenticated);
    };

    auth::revoke_token(&state.db, token_id).await?;
    debug!("User {} logged out of token {}", subject.user_id, token_id);

    response::ok(LOGOUT_SUCCESS, None)
}
