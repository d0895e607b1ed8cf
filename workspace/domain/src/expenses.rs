//! Expense listing, filtering, summary and mutations.

use chrono::{NaiveDateTime, Utc};
use common::{ExpenseDto, ExpenseSummaryDto};
use model::entities::{category, expense, user};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use tracing::{debug, info, instrument, trace};
use validator::ValidationErrors;

use crate::acl::Subject;
use crate::categories;
use crate::error::{field_error, DomainError, Result};
use crate::pagination::{parse_positive, Listing, Page, PageLimits, PageRequest, QueryMap};

fn missing_in_storage(field: &'static str) -> validator::ValidationError {
    field_error("exists", format!("The {} does not exist in storage.", field))
}

/// Normalized expense listing parameters.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExpenseFilter {
    pub page: PageRequest,
    pub user_id: Option<i32>,
    pub category_id: Option<i32>,
    /// Accepted and validated; listings do not search by it.
    pub term: Option<String>,
}

impl ExpenseFilter {
    /// Parses the raw query. Does not touch the database.
    pub fn parse(query: &QueryMap, limits: PageLimits) -> std::result::Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let page = PageRequest::parse(query, limits, &mut errors);
        let user_id = parse_positive::<i32>(query, "userId", &mut errors);
        let category_id = parse_positive::<i32>(query, "categoryId", &mut errors);
        let term = match query.get("term") {
            Some(term) if term.trim().is_empty() => {
                errors.add(
                    "term",
                    field_error("min", "The term field must be at least 1 characters."),
                );
                None
            }
            Some(term) => Some(term.trim().to_string()),
            None => None,
        };

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(Self {
            page,
            user_id,
            category_id,
            term,
        })
    }

    /// Restricts non-admin subjects to their own expenses.
    pub fn scoped_to(mut self, subject: &Subject) -> Self {
        if !subject.is_admin() || self.user_id.is_none() {
            self.user_id = Some(subject.user_id);
        }
        self
    }

    /// Checks that the referenced user and category exist, one lookup each.
    pub async fn verify(self, db: &DatabaseConnection) -> Result<Self> {
        let mut errors = ValidationErrors::new();

        if let Some(user_id) = self.user_id {
            if user::Entity::find_by_id(user_id).one(db).await?.is_none() {
                errors.add("userId", missing_in_storage("userId"));
            }
        }
        if let Some(category_id) = self.category_id {
            if !categories::exists(db, category_id).await? {
                errors.add("categoryId", missing_in_storage("categoryId"));
            }
        }

        if errors.is_empty() {
            Ok(self)
        } else {
            Err(DomainError::Validation(errors))
        }
    }

    /// [`ExpenseFilter::parse`] followed by [`ExpenseFilter::verify`].
    pub async fn resolve(
        db: &DatabaseConnection,
        query: &QueryMap,
        limits: PageLimits,
    ) -> Result<Self> {
        Self::parse(query, limits)?.verify(db).await
    }

    /// Query parameters to carry into page links.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = self.page.query_pairs();
        if let Some(user_id) = self.user_id {
            pairs.push(("userId".to_string(), user_id.to_string()));
        }
        if let Some(category_id) = self.category_id {
            pairs.push(("categoryId".to_string(), category_id.to_string()));
        }
        if let Some(term) = &self.term {
            pairs.push(("term".to_string(), term.clone()));
        }
        pairs
    }
}

pub fn to_dto(expense: expense::Model, category: Option<category::Model>) -> ExpenseDto {
    ExpenseDto {
        id: expense.id,
        user_id: expense.user_id,
        description: expense.description,
        amount: expense.amount,
        category: category.map(categories::to_dto),
        date: expense.date,
        created_at: expense.created_at,
        updated_at: expense.updated_at,
    }
}

/// Expenses matching the filter, newest first.
#[instrument(skip(db))]
pub async fn list(db: &DatabaseConnection, filter: &ExpenseFilter) -> Result<Listing<ExpenseDto>> {
    trace!("Entering list function");

    let mut select = expense::Entity::find();
    if let Some(user_id) = filter.user_id {
        select = select.filter(expense::Column::UserId.eq(user_id));
    }
    if let Some(category_id) = filter.category_id {
        select = select.filter(expense::Column::CategoryId.eq(category_id));
    }
    let select = select
        .order_by_desc(expense::Column::Date)
        .order_by_desc(expense::Column::Id)
        .find_also_related(category::Entity);

    let request = &filter.page;
    let listing = if request.paginate {
        let paginator = select.paginate(db, request.per_page);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(request.page - 1).await?;
        debug!("Fetched page {} with {} of {} expenses", request.page, items.len(), total);
        Listing::Paginated(Page {
            items,
            total,
            page: request.page,
            per_page: request.per_page,
        })
    } else {
        let items = select.all(db).await?;
        debug!("Fetched all {} expenses", items.len());
        Listing::All(items)
    };

    Ok(listing.map(|(expense, category)| to_dto(expense, category)))
}

/// Total spent and number of expenses of a user. Zero for no expenses.
#[instrument(skip(db))]
pub async fn summary(db: &DatabaseConnection, user_id: i32) -> Result<ExpenseSummaryDto> {
    let (spent, total): (Option<Decimal>, i64) = expense::Entity::find()
        .select_only()
        .column_as(Expr::col(expense::Column::Amount).sum(), "spent")
        .column_as(Expr::col(expense::Column::Id).count(), "total")
        .filter(expense::Column::UserId.eq(user_id))
        .into_tuple()
        .one(db)
        .await?
        .unwrap_or((None, 0));

    let summary = ExpenseSummaryDto {
        spent: spent.unwrap_or_default().round_dp(2),
        total: u64::try_from(total).unwrap_or_default(),
    };
    debug!("Summary for user {}: {:?}", user_id, summary);

    Ok(summary)
}

/// Fields of an expense about to be created.
#[derive(Debug, Clone, PartialEq)]
pub struct NewExpense {
    pub user_id: i32,
    pub category_id: i32,
    pub amount: Decimal,
    pub date: NaiveDateTime,
    pub description: Option<String>,
}

/// Validates references and inserts the expense. Nothing is written when
/// validation fails.
#[instrument(skip(db))]
pub async fn create(db: &DatabaseConnection, new: NewExpense) -> Result<ExpenseDto> {
    trace!("Entering create function");

    let mut errors = ValidationErrors::new();
    if let Err(error) = common::amount::validate_amount(&new.amount) {
        errors.add("amount", error);
    }
    if user::Entity::find_by_id(new.user_id).one(db).await?.is_none() {
        errors.add("userId", missing_in_storage("userId"));
    }
    let category = category::Entity::find_by_id(new.category_id).one(db).await?;
    if category.is_none() {
        errors.add("categoryId", missing_in_storage("categoryId"));
    }
    if !errors.is_empty() {
        return Err(DomainError::Validation(errors));
    }

    let now = Utc::now().naive_utc();
    let expense = expense::ActiveModel {
        user_id: Set(new.user_id),
        category_id: Set(new.category_id),
        amount: Set(new.amount),
        description: Set(new.description),
        date: Set(new.date),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;
    info!("Created expense {} for user {}", expense.id, expense.user_id);

    Ok(to_dto(expense, category))
}

pub async fn find(db: &DatabaseConnection, expense_id: i32) -> Result<Option<expense::Model>> {
    Ok(expense::Entity::find_by_id(expense_id).one(db).await?)
}

/// Deletes by id. Returns false when nothing was deleted.
#[instrument(skip(db))]
pub async fn delete(db: &DatabaseConnection, expense_id: i32) -> Result<bool> {
    let result = expense::Entity::delete_by_id(expense_id).exec(db).await?;
    debug!("Deleted {} expense(s) with id {}", result.rows_affected, expense_id);
    Ok(result.rows_affected == 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{create_expense, create_user, day, setup_test_db};
    use common::RoleName;

    fn query(pairs: &[(&str, &str)]) -> QueryMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn subject(user_id: i32, role: RoleName) -> Subject {
        Subject {
            user_id,
            username: "someone".to_string(),
            role: role.as_str().to_string(),
            permissions: role.default_permissions().into_iter().collect(),
        }
    }

    #[test]
    fn test_parse_filter() {
        let filter = ExpenseFilter::parse(
            &query(&[("userId", "2"), ("categoryId", "3"), ("term", " rent ")]),
            PageLimits::default(),
        )
        .unwrap();
        assert!(filter.page.paginate);
        assert_eq!(filter.user_id, Some(2));
        assert_eq!(filter.category_id, Some(3));
        assert_eq!(filter.term.as_deref(), Some("rent"));

        let errors = ExpenseFilter::parse(
            &query(&[("categoryId", "abc"), ("term", "")]),
            PageLimits::default(),
        )
        .unwrap_err();
        assert!(errors.field_errors().contains_key("categoryId"));
        assert!(errors.field_errors().contains_key("term"));
    }

    #[test]
    fn test_scoping() {
        let requested = ExpenseFilter {
            user_id: Some(7),
            ..Default::default()
        };

        let scoped = requested.clone().scoped_to(&subject(1, RoleName::User));
        assert_eq!(scoped.user_id, Some(1));

        let scoped = requested.scoped_to(&subject(1, RoleName::Admin));
        assert_eq!(scoped.user_id, Some(7));

        let scoped = ExpenseFilter::default().scoped_to(&subject(1, RoleName::Admin));
        assert_eq!(scoped.user_id, Some(1));
    }

    #[tokio::test]
    async fn test_verify_rejects_unknown_references() {
        let db = setup_test_db().await;
        let err = ExpenseFilter::resolve(&db, &query(&[("categoryId", "999")]), PageLimits::default())
            .await
            .unwrap_err();

        match err {
            DomainError::Validation(errors) => {
                let fields = errors.field_errors();
                let message = fields["categoryId"][0].message.as_ref().unwrap();
                assert_eq!(message, "The categoryId does not exist in storage.");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_list_filters_and_orders_by_date_desc() {
        let db = setup_test_db().await;
        let alice = create_user(&db, "alice", RoleName::User).await;
        let bob = create_user(&db, "bob", RoleName::User).await;

        create_expense(&db, alice.id, 1, Decimal::new(1000, 2), day(1)).await;
        create_expense(&db, alice.id, 2, Decimal::new(2000, 2), day(3)).await;
        create_expense(&db, alice.id, 1, Decimal::new(3000, 2), day(2)).await;
        create_expense(&db, bob.id, 1, Decimal::new(4000, 2), day(4)).await;

        let filter = ExpenseFilter {
            page: PageRequest {
                paginate: false,
                ..Default::default()
            },
            user_id: Some(alice.id),
            ..Default::default()
        };
        let Listing::All(items) = list(&db, &filter).await.unwrap() else {
            panic!("expected every expense");
        };
        let dates: Vec<_> = items.iter().map(|e| e.date).collect();
        assert_eq!(dates, vec![day(3), day(2), day(1)]);
        assert_eq!(items[0].category.as_ref().unwrap().id, 2);

        let filter = ExpenseFilter {
            category_id: Some(1),
            ..filter
        };
        assert_eq!(list(&db, &filter).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_list_paginates() {
        let db = setup_test_db().await;
        let user = create_user(&db, "pager", RoleName::User).await;
        for n in 1..=20 {
            create_expense(&db, user.id, 1, Decimal::from(n), day(n)).await;
        }

        let filter = ExpenseFilter {
            page: PageRequest {
                paginate: true,
                page: 2,
                per_page: 15,
            },
            user_id: Some(user.id),
            ..Default::default()
        };
        let Listing::Paginated(page) = list(&db, &filter).await.unwrap() else {
            panic!("expected a page");
        };
        assert_eq!(page.total, 20);
        assert_eq!(page.page, 2);
        assert_eq!(page.per_page, 15);
        assert_eq!(page.items.len(), 5);
        assert_eq!(page.items[0].date, day(5));
    }

    #[tokio::test]
    async fn test_summary() {
        let db = setup_test_db().await;
        let user = create_user(&db, "spender", RoleName::User).await;

        let empty = summary(&db, user.id).await.unwrap();
        assert_eq!(empty.spent, Decimal::ZERO);
        assert_eq!(empty.total, 0);

        create_expense(&db, user.id, 1, Decimal::new(1050, 2), day(1)).await;
        create_expense(&db, user.id, 2, Decimal::new(225, 2), day(2)).await;
        let other = create_user(&db, "bystander", RoleName::User).await;
        create_expense(&db, other.id, 1, Decimal::new(9900, 2), day(3)).await;

        let totals = summary(&db, user.id).await.unwrap();
        assert_eq!(totals.spent, Decimal::new(1275, 2));
        assert_eq!(totals.total, 2);
    }

    #[tokio::test]
    async fn test_create_and_delete() {
        let db = setup_test_db().await;
        let user = create_user(&db, "creator", RoleName::User).await;

        let created = create(
            &db,
            NewExpense {
                user_id: user.id,
                category_id: 1,
                amount: Decimal::new(9999, 2),
                date: day(10),
                description: Some("Test".to_string()),
            },
        )
        .await
        .unwrap();
        assert_eq!(created.amount, Decimal::new(9999, 2));
        assert_eq!(created.category.as_ref().unwrap().name, "Leisure");
        assert_eq!(created.description.as_deref(), Some("Test"));

        assert!(delete(&db, created.id).await.unwrap());
        assert!(!delete(&db, created.id).await.unwrap());
        assert!(find(&db, created.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_with_unknown_category_writes_nothing() {
        let db = setup_test_db().await;
        let user = create_user(&db, "creator", RoleName::User).await;

        let err = create(
            &db,
            NewExpense {
                user_id: user.id,
                category_id: 999,
                amount: Decimal::ONE,
                date: day(10),
                description: None,
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(summary(&db, user.id).await.unwrap().total, 0);
    }
}
