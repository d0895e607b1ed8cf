//! In-memory transport and canned responses for the client tests.

use async_trait::async_trait;
use chrono::NaiveDate;
use common::pagination::PageUrls;
use common::{
    ApiPaginated, AuthDto, CategoryDto, ExpenseDto, PaginationLinks, PaginationMeta, RoleDto,
};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::sync::Mutex;
use std::time::Duration;

use crate::error::{ClientError, Result};
use crate::transport::{HttpRequest, HttpResponse, Transport};

type Handler = Box<dyn Fn(&HttpRequest) -> HttpResponse + Send + Sync>;
type Matcher = Box<dyn Fn(&HttpRequest) -> bool + Send + Sync>;

/// Answers requests with a closure and records every request it sees.
pub struct MockTransport {
    handler: Option<Handler>,
    delay: Option<(Duration, Matcher)>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new(handler: impl Fn(&HttpRequest) -> HttpResponse + Send + Sync + 'static) -> Self {
        Self {
            handler: Some(Box::new(handler)),
            delay: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Fails every request with a network error.
    pub fn offline() -> Self {
        Self {
            handler: None,
            delay: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Holds back the answer to matching requests for `delay`.
    pub fn delay(
        mut self,
        delay: Duration,
        matches: impl Fn(&HttpRequest) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.delay = Some((delay, Box::new(matches)));
        self
    }

    /// Requests sent so far to `path`.
    pub fn hits(&self, path: &str) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|request| request.path == path)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some((delay, matches)) = &self.delay {
            if matches(&request) {
                tokio::time::sleep(*delay).await;
            }
        }
        match &self.handler {
            Some(handler) => Ok(handler(&request)),
            None => Err(ClientError::Network("connection refused".to_string())),
        }
    }
}

pub fn query_value<'a>(request: &'a HttpRequest, key: &str) -> Option<&'a str> {
    request
        .query
        .iter()
        .find(|(name, _)| name == key)
        .map(|(_, value)| value.as_str())
}

pub fn envelope(message: &str, data: Value) -> Value {
    json!({ "success": true, "message": message, "status": 200, "data": data })
}

pub fn failure(status: u16, message: &str) -> Value {
    json!({ "success": false, "message": message, "status": status, "data": null })
}

pub fn auth(user_id: i32, token: &str) -> Value {
    let auth = AuthDto {
        id: user_id,
        name: "utester".to_string(),
        email: "utester@example.com".to_string(),
        role: RoleDto {
            id: 1,
            name: "user".to_string(),
            permissions: vec!["view expenses".to_string()],
        },
        token: token.to_string(),
        token_type: "Bearer".to_string(),
    };
    envelope("Login successful.", serde_json::to_value(auth).unwrap())
}

pub fn expense(id: i32, user_id: i32) -> Value {
    let date = NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap();
    serde_json::to_value(ExpenseDto {
        id,
        user_id,
        description: Some(format!("Expense {}", id)),
        amount: Decimal::new(1050, 2),
        category: Some(CategoryDto {
            id: 1,
            name: "Leisure".to_string(),
        }),
        date,
        created_at: date,
        updated_at: date,
    })
    .unwrap()
}

/// Page `page` of `last_page`, two expenses per page.
pub fn expense_page(page: u64, last_page: u64) -> Value {
    let urls = PageUrls::new("http://localhost:3000/expenses", Vec::new());
    let first_id = (page as i32 - 1) * 2 + 1;
    let data: Vec<ExpenseDto> = vec![first_id, first_id + 1]
        .into_iter()
        .map(|id| serde_json::from_value::<ExpenseDto>(expense(id, 7)).unwrap())
        .collect();

    serde_json::to_value(ApiPaginated {
        success: true,
        message: "User expense listing".to_string(),
        status: 200,
        data,
        meta: PaginationMeta::new(&urls, page, 2, last_page * 2, 2),
        links: PaginationLinks::new(&urls, page, last_page),
    })
    .unwrap()
}
