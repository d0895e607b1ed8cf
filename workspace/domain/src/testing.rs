//! Fixtures shared by the unit tests of this crate.

use chrono::{NaiveDate, NaiveDateTime, Utc};
use common::RoleName;
use migration::{Migrator, MigratorTrait};
use model::entities::{expense, role, user};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Database, DatabaseConnection, EntityTrait, QueryFilter, Set,
};

use crate::auth::hash_password_with_cost;

pub const TEST_PASSWORD: &str = "T3st!nG";

/// In-memory SQLite database with all migrations applied.
pub async fn setup_test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to connect to in-memory database");

    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    db
}

pub async fn role_id(db: &DatabaseConnection, role: RoleName) -> i32 {
    role::Entity::find()
        .filter(role::Column::Name.eq(role.as_str()))
        .one(db)
        .await
        .unwrap()
        .expect("seeded role")
        .id
}

/// Creates a user in country 1 whose password is [`TEST_PASSWORD`].
pub async fn create_user(db: &DatabaseConnection, username: &str, role: RoleName) -> user::Model {
    let now = Utc::now().naive_utc();
    user::ActiveModel {
        name: Set("Test".to_string()),
        surname: Set(username.to_string()),
        email: Set(format!("{}@example.com", username)),
        phone: Set("0123456789".to_string()),
        username: Set(username.to_string()),
        password: Set(hash_password_with_cost(TEST_PASSWORD, 4).unwrap()),
        gender: Set("f".to_string()),
        country_id: Set(1),
        role_id: Set(role_id(db, role).await),
        email_verified_at: Set(Some(now)),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to create test user")
}

pub fn day(day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, day)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

pub async fn create_expense(
    db: &DatabaseConnection,
    user_id: i32,
    category_id: i32,
    amount: Decimal,
    date: NaiveDateTime,
) -> expense::Model {
    let now = Utc::now().naive_utc();
    expense::ActiveModel {
        user_id: Set(user_id),
        category_id: Set(category_id),
        amount: Set(amount),
        description: Set(Some(format!("Expense on {}", date))),
        date: Set(date),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to create test expense")
}
