use axum::{extract::State, http::Uri, response::Response};
use common::{ApiResponse, CreateExpenseRequest, DeletedDto, ExpenseDto, ExpenseSummaryDto, Permission};
use domain::expenses::{self, ExpenseFilter, NewExpense};
use tracing::{debug, info, instrument, trace, warn};

use crate::error::ApiError;
use crate::extract::{Auth, IdPath, QueryParams, ValidatedJson};
use crate::response::{self, ApiResult, Envelope};
use crate::schemas::AppState;

/// List expenses, newest first
///
/// Non-administrators always see their own expenses; `userId` is only
/// honored for administrators.
#[utoipa::path(
    get,
    path = "/expenses",
    tag = "expenses",
    security(("bearer" = [])),
    params(
        ("paginate" = Option<bool>, Query, description = "Return a page (default) or every expense"),
        ("page" = Option<u64>, Query, description = "Page number, starting at 1"),
        ("perPage" = Option<u64>, Query, description = "Page size, at most `pagination.max_per_page`"),
        ("userId" = Option<i32>, Query, description = "Owner filter, administrators only"),
        ("categoryId" = Option<i32>, Query, description = "Category filter"),
        ("term" = Option<String>, Query, description = "Search term; validated but not applied")
    ),
    responses(
        (status = 200, description = "User expense listing", body = common::ApiPaginated<ExpenseDto>),
        (status = 400, description = "Invalid filter (envelope status)", body = crate::schemas::ErrorResponse),
        (status = 403, description = "Missing `view expenses` (envelope status)", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_expenses(
    State(state): State<AppState>,
    auth: Auth,
    QueryParams(query): QueryParams,
    uri: Uri,
) -> Result<Response, ApiError> {
    trace!("Entering get_expenses function");
    let subject = auth.authorize(Permission::ViewExpenses, None)?;

    let filter = ExpenseFilter::parse(&query, state.settings.pagination.limits())?
        .scoped_to(subject)
        .verify(&state.db)
        .await?;
    debug!("Resolved expense filter: {:?}", filter);

    let listing = expenses::list(&state.db, &filter).await?;
    let urls = response::page_urls(&state, &uri, filter.query_pairs());

    Ok(response::listing(listing, "User expense listing", &urls))
}

/// Record an expense
#[utoipa::path(
    post,
    path = "/expenses",
    tag = "expenses",
    security(("bearer" = [])),
    request_body = CreateExpenseRequest,
    responses(
        (status = 201, description = "Expense resource created (envelope status)", body = common::ApiResponse<ExpenseDto>),
        (status = 400, description = "Invalid request (envelope status)", body = crate::schemas::ErrorResponse),
        (status = 403, description = "Missing `create expenses` (envelope status)", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state, payload))]
pub async fn create_expense(
    State(state): State<AppState>,
    auth: Auth,
    payload: Result<ValidatedJson<CreateExpenseRequest>, ApiError>,
) -> ApiResult<ExpenseDto> {
    trace!("Entering create_expense function");
    let subject = auth.authorize(Permission::CreateExpenses, None)?;
    let ValidatedJson(request) = payload?;

    let user_id = match request.user_id {
        Some(user_id) if subject.is_admin() => user_id,
        _ => subject.user_id,
    };

    let expense = expenses::create(
        &state.db,
        NewExpense {
            user_id,
            category_id: request.category_id,
            amount: request.amount,
            date: request.date,
            description: request.description,
        },
    )
    .await?;
    info!("Expense resource created with ID: {}", expense.id);

    response::created("Expense resource created.", expense)
}

/// Delete an expense
#[utoipa::path(
    delete,
    path = "/expenses/{id}",
    tag = "expenses",
    security(("bearer" = [])),
    params(("id" = i32, Path, description = "Expense id")),
    responses(
        (status = 200, description = "`deleted` tells whether the expense was removed; 400 in the envelope when not", body = common::ApiResponse<DeletedDto>),
        (status = 403, description = "Missing `delete expenses` or not the owner (envelope status)", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn delete_expense(
    State(state): State<AppState>,
    IdPath(expense_id): IdPath,
    auth: Auth,
) -> Result<Envelope<ApiResponse<DeletedDto>>, ApiError> {
    trace!("Entering delete_expense function");
    auth.authorize(Permission::DeleteExpenses, None)?;

    let deleted = match expenses::find(&state.db, expense_id).await? {
        Some(expense) => {
            auth.authorize(Permission::DeleteExpenses, Some(expense.user_id))?;
            expenses::delete(&state.db, expense_id).await?
        }
        None => {
            warn!("Expense with ID {} not found for deletion", expense_id);
            false
        }
    };

    Ok(response::deleted(
        deleted,
        "Expense resource deleted.",
        "Expense resource not deleted.",
    ))
}

/// Total spent and number of expenses of the caller
#[utoipa::path(
    get,
    path = "/expenses/summary",
    tag = "expenses",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "User expense summary", body = common::ApiResponse<ExpenseSummaryDto>),
        (status = 403, description = "Missing `view expense summary` (envelope status)", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_expense_summary(
    State(state): State<AppState>,
    auth: Auth,
) -> ApiResult<ExpenseSummaryDto> {
    trace!("Entering get_expense_summary function");
    let subject = auth.authorize(Permission::ViewExpenseSummary, None)?;

    let summary = expenses::summary(&state.db, subject.user_id).await?;
    response::ok("User expense summary", summary)
}
