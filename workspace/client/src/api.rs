//! Typed services over a [`Transport`].
//!
//! Every response is decoded twice: first the envelope head, to tell a
//! failed request from a successful one, then the whole body into the DTO
//! the service promises. A body that does not fit is a
//! [`ClientError::Data`], never a panic.

use chrono::Utc;
use common::{
    ApiPaginated, ApiResponse, AuthDto, CategoryDto, CreateExpenseRequest, DeletedDto, ExpenseDto,
    ExpenseSummaryDto, LoginRequest, UserDto,
};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, error, info, trace};

use crate::error::{ClientError, Result};
use crate::transport::{HttpRequest, HttpResponse, Transport};

/// Page size the server uses when none is requested.
pub const DEFAULT_PER_PAGE: u64 = 15;

/// Filters and paging of an expense listing request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExpenseQuery {
    pub page: u64,
    pub per_page: u64,
    /// Only honored by the server for administrators
    pub user_id: Option<i32>,
    pub category_id: Option<i32>,
    pub term: Option<String>,
}

impl Default for ExpenseQuery {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PER_PAGE,
            user_id: None,
            category_id: None,
            term: None,
        }
    }
}

impl ExpenseQuery {
    /// Same filters, another page.
    pub fn with_page(&self, page: u64) -> Self {
        Self {
            page,
            ..self.clone()
        }
    }

    fn to_query(&self, paginate: bool) -> Vec<(String, String)> {
        let mut query = vec![("paginate".to_string(), if paginate { "1" } else { "0" }.to_string())];
        if paginate {
            query.push(("page".to_string(), self.page.to_string()));
            query.push(("perPage".to_string(), self.per_page.to_string()));
        }
        if let Some(user_id) = self.user_id {
            query.push(("userId".to_string(), user_id.to_string()));
        }
        if let Some(category_id) = self.category_id {
            query.push(("categoryId".to_string(), category_id.to_string()));
        }
        if let Some(term) = &self.term {
            query.push(("term".to_string(), term.clone()));
        }
        query.push(cache_buster());
        query
    }
}

/// `t` keeps intermediaries from answering listings out of their caches.
fn cache_buster() -> (String, String) {
    ("t".to_string(), Utc::now().timestamp_millis().to_string())
}

/// The signed-in account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: i32,
    pub token: String,
}

#[derive(Deserialize)]
struct EnvelopeHead {
    success: bool,
    status: u16,
    #[serde(default)]
    message: String,
}

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Parses the body and classifies failures, without checking `success`.
fn parse_envelope(response: &HttpResponse) -> Result<(EnvelopeHead, Value)> {
    let value: Value = match serde_json::from_str(&response.body) {
        Ok(value) => value,
        Err(_) if !is_success(response.status) => {
            return Err(ClientError::from_status(
                response.status,
                format!("HTTP error: {}", response.status),
            ));
        }
        Err(e) => return Err(ClientError::Data(format!("Response is not JSON: {}", e))),
    };
    let head = EnvelopeHead::deserialize(&value)
        .map_err(|e| ClientError::Data(format!("Response is not an envelope: {}", e)))?;

    if matches!(response.status, 401 | 403) {
        return Err(ClientError::from_status(response.status, head.message));
    }
    Ok((head, value))
}

/// Decodes a successful envelope into `D`.
pub(crate) fn decode<D: DeserializeOwned>(response: &HttpResponse) -> Result<D> {
    let (head, value) = parse_envelope(response)?;
    if !head.success {
        return Err(ClientError::from_status(head.status, head.message));
    }
    serde_json::from_value(value).map_err(|e| ClientError::Data(e.to_string()))
}

fn required<T>(envelope: ApiResponse<T>) -> Result<T> {
    envelope
        .data
        .ok_or_else(|| ClientError::Data(format!("'{}' carried no data", envelope.message)))
}

fn to_body<B: Serialize>(body: &B) -> Result<Value> {
    serde_json::to_value(body).map_err(|e| ClientError::Data(e.to_string()))
}

/// Typed access to the expense tracker API.
pub struct ApiClient<T: Transport> {
    transport: T,
    session: RwLock<Option<Session>>,
}

impl<T: Transport> ApiClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            session: RwLock::new(None),
        }
    }

    /// Client for an account that signed in earlier.
    pub fn with_session(transport: T, session: Session) -> Self {
        Self {
            transport,
            session: RwLock::new(Some(session)),
        }
    }

    pub async fn session(&self) -> Option<Session> {
        self.session.read().await.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.session.read().await.is_some()
    }

    /// Id of the signed-in account.
    pub async fn user_id(&self) -> Result<i32> {
        self.session
            .read()
            .await
            .as_ref()
            .map(|session| session.user_id)
            .ok_or_else(|| ClientError::Auth {
                status: 401,
                message: "Not signed in.".to_string(),
            })
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let token = self.session.read().await.as_ref().map(|s| s.token.clone());
        let (method, path) = (request.method.clone(), request.path.clone());

        let response = self.transport.send(request.token(token)).await?;
        trace!("{} {} answered {}", method, path, response.status);
        Ok(response)
    }

    async fn fetch<D: DeserializeOwned>(&self, request: HttpRequest) -> Result<D> {
        let (method, path) = (request.method.clone(), request.path.clone());
        let response = self.send(request).await?;
        decode(&response).inspect_err(|e| error!("{} {} - {}", method, path, e))
    }

    async fn fetch_data<D: DeserializeOwned>(&self, request: HttpRequest) -> Result<D> {
        required(self.fetch::<ApiResponse<D>>(request).await?)
    }

    /// Signs in and keeps the issued token for later requests.
    pub async fn login(&self, username: &str, password: &str) -> Result<AuthDto> {
        debug!("Logging in as '{}'", username);
        let body = to_body(&LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        })?;

        let auth: AuthDto = self
            .fetch_data(HttpRequest::new(Method::POST, "/auth/login").json(body))
            .await?;
        *self.session.write().await = Some(Session {
            user_id: auth.id,
            token: auth.token.clone(),
        });
        info!("Logged in as '{}' (ID: {})", auth.name, auth.id);

        Ok(auth)
    }

    /// Revokes the current token on the server and forgets it.
    pub async fn logout(&self) -> Result<()> {
        self.fetch::<ApiResponse<Value>>(HttpRequest::new(Method::GET, "/logout"))
            .await?;
        *self.session.write().await = None;
        info!("Logged out");
        Ok(())
    }

    pub async fn expenses_page(&self, query: &ExpenseQuery) -> Result<ApiPaginated<ExpenseDto>> {
        trace!("Fetching expenses page {}", query.page);
        let page: ApiPaginated<ExpenseDto> = self
            .fetch(HttpRequest::new(Method::GET, "/expenses").query(query.to_query(true)))
            .await?;
        debug!(
            "Fetched {} expenses (page {} of {})",
            page.data.len(),
            page.meta.current_page,
            page.meta.last_page
        );
        Ok(page)
    }

    /// Every expense matching the filters, ignoring paging.
    pub async fn expenses_all(&self, query: &ExpenseQuery) -> Result<Vec<ExpenseDto>> {
        self.fetch_data(HttpRequest::new(Method::GET, "/expenses").query(query.to_query(false)))
            .await
    }

    pub async fn expense_summary(&self) -> Result<ExpenseSummaryDto> {
        self.fetch_data(HttpRequest::new(Method::GET, "/expenses/summary"))
            .await
    }

    pub async fn create_expense(&self, request: &CreateExpenseRequest) -> Result<ExpenseDto> {
        let expense: ExpenseDto = self
            .fetch_data(HttpRequest::new(Method::POST, "/expenses").json(to_body(request)?))
            .await?;
        info!("Created expense {} for user {}", expense.id, expense.user_id);
        Ok(expense)
    }

    /// Whether the expense was deleted. A miss is `Ok(false)`.
    pub async fn delete_expense(&self, expense_id: i32) -> Result<bool> {
        let response = self
            .send(HttpRequest::new(
                Method::DELETE,
                format!("/expenses/{}", expense_id),
            ))
            .await?;
        let (head, value) = parse_envelope(&response)?;

        // Both outcomes carry `{deleted}`; other failures do not
        let envelope: ApiResponse<DeletedDto> =
            serde_json::from_value(value).map_err(|e| ClientError::Data(e.to_string()))?;
        match envelope.data {
            Some(DeletedDto { deleted }) => Ok(deleted),
            None if !head.success => Err(ClientError::from_status(head.status, head.message)),
            None => Err(ClientError::Data("delete response carried no data".to_string())),
        }
    }

    /// Every category.
    pub async fn categories(&self) -> Result<Vec<CategoryDto>> {
        let query = vec![("paginate".to_string(), "0".to_string()), cache_buster()];
        self.fetch_data(HttpRequest::new(Method::GET, "/categories").query(query))
            .await
    }

    pub async fn users_page(&self, page: u64, per_page: u64) -> Result<ApiPaginated<UserDto>> {
        let query = vec![
            ("page".to_string(), page.to_string()),
            ("perPage".to_string(), per_page.to_string()),
            cache_buster(),
        ];
        self.fetch(HttpRequest::new(Method::GET, "/users").query(query))
            .await
    }

    pub async fn user(&self, user_id: i32) -> Result<UserDto> {
        self.fetch_data(HttpRequest::new(Method::GET, format!("/users/{}", user_id)))
            .await
    }
}
