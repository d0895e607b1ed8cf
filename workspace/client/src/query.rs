//! Cache-aware queries over [`ApiClient`].
//!
//! Reads are cached per [`QueryKey`]. Concurrent reads of the same key share
//! one request. Creating or deleting an expense evicts every expense listing
//! and summary of the affected users, so the next read goes to the server.
//! Reading a page that is not the last one prefetches the following page in
//! the background; eviction cancels the user's prefetches still in flight.

use common::{ApiPaginated, CategoryDto, CreateExpenseRequest, ExpenseDto, ExpenseSummaryDto};
use moka::future::Cache;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::api::{ApiClient, ExpenseQuery};
use crate::error::{ClientError, Result};
use crate::transport::Transport;

/// Identity of a cached read. Expense reads are keyed by the signed-in user
/// and the request parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    Expenses { user_id: i32, resource: ExpenseQuery },
    ExpenseSummary { user_id: i32 },
    Categories,
}

impl QueryKey {
    /// Whether an expense mutation by or for `user_id` makes the entry stale.
    pub fn is_stale_after_mutation_of(&self, user_id: i32) -> bool {
        match self {
            QueryKey::Expenses { user_id: owner, .. } | QueryKey::ExpenseSummary { user_id: owner } => {
                *owner == user_id
            }
            QueryKey::Categories => false,
        }
    }
}

#[derive(Debug, Clone)]
enum QueryData {
    Expenses(Arc<ApiPaginated<ExpenseDto>>),
    ExpenseSummary(ExpenseSummaryDto),
    Categories(Arc<Vec<CategoryDto>>),
}

fn unexpected(key: &QueryKey) -> ClientError {
    ClientError::Data(format!("cache entry for {:?} holds another kind of data", key))
}

fn shared(error: Arc<ClientError>) -> ClientError {
    (*error).clone()
}

async fn load_expenses<T: Transport>(
    client: Arc<ApiClient<T>>,
    resource: ExpenseQuery,
) -> Result<QueryData> {
    let page = client.expenses_page(&resource).await?;
    Ok(QueryData::Expenses(Arc::new(page)))
}

/// Cached expense, summary and category reads for one signed-in client.
pub struct ExpenseQueries<T: Transport + 'static> {
    client: Arc<ApiClient<T>>,
    cache: Cache<QueryKey, QueryData>,
    /// Prefetch tasks with the user they load pages for.
    prefetches: Mutex<Vec<(i32, JoinHandle<()>)>>,
}

impl<T: Transport + 'static> ExpenseQueries<T> {
    /// Entries live for `ttl` unless a mutation evicts them first.
    pub fn new(client: Arc<ApiClient<T>>, capacity: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(capacity)
            .time_to_live(ttl)
            .build();

        Self {
            client,
            cache,
            prefetches: Mutex::new(Vec::new()),
        }
    }

    pub fn client(&self) -> &ApiClient<T> {
        &self.client
    }

    pub fn is_cached(&self, key: &QueryKey) -> bool {
        self.cache.contains_key(key)
    }

    /// One page of expenses.
    pub async fn expenses(&self, resource: ExpenseQuery) -> Result<Arc<ApiPaginated<ExpenseDto>>> {
        let user_id = self.client.user_id().await?;
        let key = QueryKey::Expenses {
            user_id,
            resource: resource.clone(),
        };

        let data = self
            .cache
            .try_get_with(key.clone(), load_expenses(self.client.clone(), resource.clone()))
            .await
            .map_err(shared)?;
        let QueryData::Expenses(page) = data else {
            return Err(unexpected(&key));
        };

        if page.meta.current_page < page.meta.last_page {
            self.prefetch_page(user_id, resource.with_page(page.meta.current_page + 1));
        }
        Ok(page)
    }

    fn prefetch_page(&self, user_id: i32, resource: ExpenseQuery) {
        let key = QueryKey::Expenses {
            user_id,
            resource: resource.clone(),
        };
        if self.cache.contains_key(&key) {
            trace!("Page {} already cached", resource.page);
            return;
        }

        let client = self.client.clone();
        let cache = self.cache.clone();
        let page = resource.page;
        let handle = tokio::spawn(async move {
            match cache.try_get_with(key, load_expenses(client, resource)).await {
                Ok(_) => debug!("Prefetched expenses page {}", page),
                Err(e) => warn!("Prefetch of expenses page {} failed: {}", page, e),
            }
        });

        match self.prefetches.lock() {
            Ok(mut prefetches) => {
                prefetches.retain(|(_, handle)| !handle.is_finished());
                prefetches.push((user_id, handle));
            }
            Err(_) => handle.abort(),
        }
    }

    fn take_prefetches(&self, user_id: Option<i32>) -> Vec<JoinHandle<()>> {
        let Ok(mut prefetches) = self.prefetches.lock() else {
            return Vec::new();
        };
        let (taken, kept): (Vec<_>, Vec<_>) = prefetches
            .drain(..)
            .partition(|(owner, _)| user_id.is_none_or(|user_id| *owner == user_id));
        *prefetches = kept;
        taken.into_iter().map(|(_, handle)| handle).collect()
    }

    /// Waits for every prefetch still running.
    pub async fn prefetched(&self) {
        for handle in self.take_prefetches(None) {
            if let Err(e) = handle.await {
                warn!("Prefetch task did not finish: {}", e);
            }
        }
    }

    /// Aborts the prefetches of `user_id`, or all of them, and waits until
    /// none of them can still write to the cache.
    async fn cancel_prefetches(&self, user_id: Option<i32>) {
        for handle in self.take_prefetches(user_id) {
            handle.abort();
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    warn!("Prefetch task failed: {}", e);
                }
            }
        }
    }

    pub async fn summary(&self) -> Result<ExpenseSummaryDto> {
        let user_id = self.client.user_id().await?;
        let key = QueryKey::ExpenseSummary { user_id };

        let client = self.client.clone();
        let data = self
            .cache
            .try_get_with(key.clone(), async move {
                client.expense_summary().await.map(QueryData::ExpenseSummary)
            })
            .await
            .map_err(shared)?;
        match data {
            QueryData::ExpenseSummary(summary) => Ok(summary),
            _ => Err(unexpected(&key)),
        }
    }

    pub async fn categories(&self) -> Result<Arc<Vec<CategoryDto>>> {
        let key = QueryKey::Categories;

        let client = self.client.clone();
        let data = self
            .cache
            .try_get_with(key.clone(), async move {
                client
                    .categories()
                    .await
                    .map(|categories| QueryData::Categories(Arc::new(categories)))
            })
            .await
            .map_err(shared)?;
        match data {
            QueryData::Categories(categories) => Ok(categories),
            _ => Err(unexpected(&key)),
        }
    }

    /// Creates the expense and evicts the reads it makes stale.
    pub async fn create_expense(&self, request: &CreateExpenseRequest) -> Result<ExpenseDto> {
        let user_id = self.client.user_id().await?;
        let expense = self.client.create_expense(request).await?;

        self.invalidate_user(user_id).await;
        if expense.user_id != user_id {
            self.invalidate_user(expense.user_id).await;
        }
        Ok(expense)
    }

    /// Deletes the expense; reads are evicted only when something was deleted.
    pub async fn delete_expense(&self, expense_id: i32) -> Result<bool> {
        let user_id = self.client.user_id().await?;
        let deleted = self.client.delete_expense(expense_id).await?;

        if deleted {
            self.invalidate_user(user_id).await;
        }
        Ok(deleted)
    }

    /// Evicts every expense listing and summary cached for `user_id`.
    pub async fn invalidate_user(&self, user_id: i32) {
        self.cancel_prefetches(Some(user_id)).await;

        let stale: Vec<Arc<QueryKey>> = self
            .cache
            .iter()
            .filter(|(key, _)| key.is_stale_after_mutation_of(user_id))
            .map(|(key, _)| key)
            .collect();

        debug!("Evicting {} cached queries of user {}", stale.len(), user_id);
        for key in stale {
            self.cache.invalidate(key.as_ref()).await;
        }
    }

    pub async fn clear(&self) {
        self.cancel_prefetches(None).await;
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Session;
    use crate::testing::{envelope, expense, expense_page, failure, query_value, MockTransport};
    use crate::transport::HttpResponse;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use serde_json::json;
    use std::sync::atomic::{AtomicU64, Ordering};

    const USER_ID: i32 = 7;

    fn ok(body: serde_json::Value) -> HttpResponse {
        HttpResponse {
            status: 200,
            body: body.to_string(),
        }
    }

    /// Two pages of expenses; summary totals grow with every created expense.
    fn api() -> Arc<MockTransport> {
        Arc::new(responses())
    }

    fn responses() -> MockTransport {
        let created = Arc::new(AtomicU64::new(0));
        MockTransport::new(move |request| {
            match (request.method.as_str(), request.path.as_str()) {
                ("GET", "/expenses") => {
                    let page = query_value(request, "page")
                        .and_then(|page| page.parse().ok())
                        .unwrap_or(1);
                    ok(expense_page(page, 2))
                }
                ("GET", "/expenses/summary") => ok(envelope(
                    "User expense summary",
                    json!({ "spent": 21.0, "total": 4 + created.load(Ordering::SeqCst) }),
                )),
                ("POST", "/expenses") => {
                    created.fetch_add(1, Ordering::SeqCst);
                    let owner = request.body.as_ref().and_then(|body| body["userId"].as_i64());
                    ok(envelope("Expense resource created.", expense(99, owner.unwrap_or(7) as i32)))
                }
                ("DELETE", "/expenses/1") => ok(json!({
                    "success": true,
                    "message": "Expense resource deleted.",
                    "status": 200,
                    "data": { "deleted": true }
                })),
                ("DELETE", _) => ok(json!({
                    "success": false,
                    "message": "Expense resource not deleted.",
                    "status": 400,
                    "data": { "deleted": false }
                })),
                ("GET", "/categories") => ok(envelope(
                    "Category listing",
                    json!([{ "id": 1, "name": "Leisure" }, { "id": 2, "name": "Advertising" }]),
                )),
                _ => ok(failure(404, "The route could not be found.")),
            }
        })
    }

    fn queries(transport: Arc<MockTransport>) -> ExpenseQueries<Arc<MockTransport>> {
        let client = ApiClient::with_session(
            transport,
            Session {
                user_id: USER_ID,
                token: "t0ken".to_string(),
            },
        );
        ExpenseQueries::new(Arc::new(client), 100, Duration::from_secs(60))
    }

    fn new_expense(user_id: Option<i32>) -> CreateExpenseRequest {
        CreateExpenseRequest {
            user_id,
            category_id: 1,
            amount: Decimal::new(999, 2),
            date: NaiveDate::from_ymd_opt(2024, 3, 1)
                .unwrap()
                .and_hms_opt(14, 30, 0)
                .unwrap(),
            description: Some("Coffee".to_string()),
        }
    }

    fn page_key(page: u64) -> QueryKey {
        QueryKey::Expenses {
            user_id: USER_ID,
            resource: ExpenseQuery::default().with_page(page),
        }
    }

    #[tokio::test]
    async fn test_reads_are_cached() {
        let transport = api();
        let queries = queries(transport.clone());

        let first = queries.summary().await.unwrap();
        let second = queries.summary().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(transport.hits("/expenses/summary").len(), 1);

        let categories = queries.categories().await.unwrap();
        queries.categories().await.unwrap();
        assert_eq!(categories.len(), 2);
        assert_eq!(transport.hits("/categories").len(), 1);
    }

    #[tokio::test]
    async fn test_next_page_is_prefetched() {
        let transport = api();
        let queries = queries(transport.clone());

        let page = queries.expenses(ExpenseQuery::default()).await.unwrap();
        assert_eq!(page.meta.current_page, 1);
        queries.prefetched().await;

        assert!(queries.is_cached(&page_key(2)));
        let requested: Vec<_> = transport
            .hits("/expenses")
            .iter()
            .map(|request| query_value(request, "page").unwrap_or("").to_string())
            .collect();
        assert_eq!(requested, vec!["1", "2"]);

        // Served from the cache, and the last page prefetches nothing
        let last = queries.expenses(ExpenseQuery::default().with_page(2)).await.unwrap();
        assert_eq!(last.meta.current_page, 2);
        queries.prefetched().await;
        assert_eq!(transport.hits("/expenses").len(), 2);
        assert!(!queries.is_cached(&page_key(3)));
    }

    #[tokio::test]
    async fn test_create_evicts_expense_reads_of_the_user() {
        let transport = api();
        let queries = queries(transport.clone());

        queries.expenses(ExpenseQuery::default()).await.unwrap();
        queries.prefetched().await;
        assert_eq!(queries.summary().await.unwrap().total, 4);
        queries.categories().await.unwrap();

        let created = queries.create_expense(&new_expense(None)).await.unwrap();
        assert_eq!(created.user_id, USER_ID);

        assert!(!queries.is_cached(&page_key(1)));
        assert!(!queries.is_cached(&page_key(2)));
        assert!(!queries.is_cached(&QueryKey::ExpenseSummary { user_id: USER_ID }));
        assert!(queries.is_cached(&QueryKey::Categories));

        // The next read is fresh
        assert_eq!(queries.summary().await.unwrap().total, 5);
        assert_eq!(transport.hits("/expenses/summary").len(), 2);
    }

    #[tokio::test]
    async fn test_create_cancels_prefetch_in_flight() {
        let transport = Arc::new(responses().delay(Duration::from_millis(200), |request| {
            query_value(request, "page") == Some("2")
        }));
        let queries = queries(transport.clone());

        queries.expenses(ExpenseQuery::default()).await.unwrap();
        // Let the prefetch reach the transport
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(transport.hits("/expenses").len(), 2);

        queries.create_expense(&new_expense(None)).await.unwrap();
        queries.prefetched().await;
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(!queries.is_cached(&page_key(2)));

        queries.expenses(ExpenseQuery::default().with_page(2)).await.unwrap();
        let pages: Vec<_> = transport
            .hits("/expenses")
            .iter()
            .map(|request| query_value(request, "page").unwrap_or("").to_string())
            .collect();
        assert_eq!(pages, vec!["1", "2", "2"]);
    }

    #[tokio::test]
    async fn test_delete_evicts_only_when_deleted() {
        let transport = api();
        let queries = queries(transport.clone());

        queries.summary().await.unwrap();
        assert!(!queries.delete_expense(42).await.unwrap());
        assert!(queries.is_cached(&QueryKey::ExpenseSummary { user_id: USER_ID }));

        assert!(queries.delete_expense(1).await.unwrap());
        assert!(!queries.is_cached(&QueryKey::ExpenseSummary { user_id: USER_ID }));
    }

    #[tokio::test]
    async fn test_other_users_entries_survive() {
        let queries = queries(api());
        let other = QueryKey::ExpenseSummary { user_id: 8 };

        assert!(!other.is_stale_after_mutation_of(USER_ID));
        assert!(QueryKey::ExpenseSummary { user_id: USER_ID }.is_stale_after_mutation_of(USER_ID));
        assert!(!QueryKey::Categories.is_stale_after_mutation_of(USER_ID));

        queries.summary().await.unwrap();
        queries.invalidate_user(8).await;
        assert!(queries.is_cached(&QueryKey::ExpenseSummary { user_id: USER_ID }));
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let transport = Arc::new(MockTransport::new(|_| ok(failure(403, "This action is unauthorized."))));
        let queries = queries(transport.clone());

        assert!(queries.summary().await.unwrap_err().is_auth());
        assert!(queries.summary().await.unwrap_err().is_auth());
        assert_eq!(transport.hits("/expenses/summary").len(), 2);
    }

    #[tokio::test]
    async fn test_signed_out_client_cannot_query() {
        let client = ApiClient::new(api());
        let queries = ExpenseQueries::new(Arc::new(client), 10, Duration::from_secs(60));

        assert!(queries.expenses(ExpenseQuery::default()).await.unwrap_err().is_auth());
    }
}
