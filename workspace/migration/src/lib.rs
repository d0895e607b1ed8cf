pub use sea_orm_migration::prelude::*;

mod m20240601_000001_create_reference_tables;
mod m20240601_000002_create_users_and_expenses;
pub mod m20240601_000003_seed_reference_data;

pub use m20240601_000003_seed_reference_data::{CATEGORIES, COUNTRIES};

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240601_000001_create_reference_tables::Migration),
            Box::new(m20240601_000002_create_users_and_expenses::Migration),
            Box::new(m20240601_000003_seed_reference_data::Migration),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{ConnectionTrait, Database, DbBackend, Statement};

    async fn count(db: &sea_orm::DatabaseConnection, table: &str) -> i64 {
        let row = db
            .query_one(Statement::from_string(
                DbBackend::Sqlite,
                format!("SELECT COUNT(*) AS n FROM {}", table),
            ))
            .await
            .unwrap()
            .unwrap();
        row.try_get("", "n").unwrap()
    }

    #[tokio::test]
    async fn test_up_seeds_reference_data() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();

        assert_eq!(count(&db, "countries").await, COUNTRIES.len() as i64);
        assert_eq!(count(&db, "categories").await, CATEGORIES.len() as i64);
        assert_eq!(count(&db, "permissions").await, 14);
        assert_eq!(count(&db, "roles").await, 3);
        // user: 6, moderator: 9, admin: 14
        assert_eq!(count(&db, "role_permissions").await, 29);
    }

    #[tokio::test]
    async fn test_down_then_up_again() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        Migrator::down(&db, None).await.unwrap();
        Migrator::up(&db, None).await.unwrap();

        assert_eq!(count(&db, "roles").await, 3);
    }
}
