use common::{
    ApiPaginated, ApiResponse, AppInfo, AuthDto, CategoryDto, CountryDto, CreateExpenseRequest,
    CreateUserRequest, DeletedDto, ExpenseDto, ExpenseSummaryDto, LoginRequest, PageLink,
    PaginationLinks, PaginationMeta, RoleDto, TokenRequest, UpdateUserRequest, UserDto,
};
use domain::throttle::LoginThrottle;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi, ToSchema,
};

use crate::config::Settings;

/// Application state shared across handlers
#[derive(Clone, Debug)]
pub struct AppState {
    /// Database connection
    pub db: DatabaseConnection,
    /// Failed login counters
    pub throttle: LoginThrottle,
    pub settings: Arc<Settings>,
}

/// Failure envelope; `data` is always null
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Always false
    pub success: bool,
    pub message: String,
    /// HTTP-like status code of the outcome
    pub status: u16,
    #[schema(value_type = Option<Object>)]
    pub data: Option<serde_json::Value>,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
    /// Database connection status
    pub database: String,
}

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
        );
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::index::info,
        crate::handlers::health::health_check,
        crate::handlers::auth::login,
        crate::handlers::auth::token,
        crate::handlers::auth::logout,
        crate::handlers::users::get_users,
        crate::handlers::users::get_user,
        crate::handlers::users::create_user,
        crate::handlers::users::update_user,
        crate::handlers::users::delete_user,
        crate::handlers::expenses::get_expenses,
        crate::handlers::expenses::create_expense,
        crate::handlers::expenses::delete_expense,
        crate::handlers::expenses::get_expense_summary,
        crate::handlers::categories::get_categories,
    ),
    components(
        schemas(
            ApiResponse<AuthDto>,
            ApiResponse<UserDto>,
            ApiResponse<ExpenseDto>,
            ApiResponse<ExpenseSummaryDto>,
            ApiResponse<DeletedDto>,
            ApiPaginated<UserDto>,
            ApiPaginated<ExpenseDto>,
            ApiPaginated<CategoryDto>,
            ErrorResponse,
            HealthResponse,
            AppInfo,
            AuthDto,
            RoleDto,
            CountryDto,
            UserDto,
            CategoryDto,
            ExpenseDto,
            ExpenseSummaryDto,
            DeletedDto,
            PaginationMeta,
            PaginationLinks,
            PageLink,
            LoginRequest,
            TokenRequest,
            CreateUserRequest,
            UpdateUserRequest,
            CreateExpenseRequest,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "info", description = "Service information"),
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Login, token issue and logout"),
        (name = "users", description = "User management endpoints"),
        (name = "expenses", description = "Expense listing, summary and mutation endpoints"),
        (name = "categories", description = "Expense category endpoints"),
    ),
    info(
        title = "Expense Tracker API",
        description = "Track personal expenses by category, with role based access for users, moderators and administrators",
        version = "0.1.0",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    )
)]
pub struct ApiDoc;
