use crate::handlers::{
    auth::{login, logout, token},
    categories::get_categories,
    expenses::{create_expense, delete_expense, get_expense_summary, get_expenses},
    health::health_check,
    index::info,
    users::{create_user, delete_user, get_user, get_users, update_user},
};
use crate::response::{finalize_response, not_found};
use crate::schemas::{ApiDoc, AppState};
use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Create application router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    let timeout = state.settings.timeout();

    Router::new()
        // Public routes
        .route("/", get(info))
        .route("/health", get(health_check))
        .route("/auth/login", post(login))
        .route("/auth/token", post(token))
        .route("/sanctum/token", post(token))
        // Token protected routes
        .route("/logout", get(logout))
        .route("/users", get(get_users).post(create_user))
        .route(
            "/users/:id",
            get(get_user).patch(update_user).delete(delete_user),
        )
        .route("/expenses", get(get_expenses).post(create_expense))
        .route("/expenses/summary", get(get_expense_summary))
        .route("/expenses/:id", delete(delete_expense))
        .route("/categories", get(get_categories))
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .fallback(not_found)
        // Timeouts must pass through the response mapper to get an envelope
        .layer(TimeoutLayer::new(timeout))
        .layer(middleware::map_response_with_state(
            state.clone(),
            finalize_response,
        ))
        // Add middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
