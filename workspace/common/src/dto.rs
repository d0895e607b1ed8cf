use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ===================== Reference data =====================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CategoryDto {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CountryDto {
    pub id: i32,
    pub name: String,
    /// ISO 3166-1 alpha-2 code
    pub code: String,
    pub active: bool,
}

/// Role with the names of the permissions it grants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RoleDto {
    pub id: i32,
    pub name: String,
    pub permissions: Vec<String>,
}

// ===================== Users =====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: i32,
    pub name: String,
    pub surname: String,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub username: String,
    pub gender: String,
    pub country: Option<CountryDto>,
    pub role: Option<RoleDto>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub verified: bool,
}

/// Authenticated principal returned by the login endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthDto {
    pub id: i32,
    /// The username the account signs in with
    pub name: String,
    pub email: String,
    pub role: RoleDto,
    /// Bearer token for subsequent requests
    pub token: String,
    pub token_type: String,
}

// ===================== Expenses =====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseDto {
    pub id: i32,
    pub user_id: i32,
    pub description: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub amount: Decimal,
    pub category: Option<CategoryDto>,
    pub date: NaiveDateTime,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Total spent (rounded to two decimals) and number of expenses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ExpenseSummaryDto {
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub spent: Decimal,
    pub total: u64,
}

impl Default for ExpenseSummaryDto {
    fn default() -> Self {
        Self {
            spent: Decimal::ZERO,
            total: 0,
        }
    }
}

// ===================== Misc =====================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DeletedDto {
    pub deleted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AppInfo {
    pub name: String,
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expense_amount_is_a_json_number() {
        let date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        let expense = ExpenseDto {
            id: 1,
            user_id: 2,
            description: None,
            amount: Decimal::new(1250, 2),
            category: Some(CategoryDto { id: 3, name: "Rent".to_string() }),
            date,
            created_at: date,
            updated_at: date,
        };

        let json = serde_json::to_value(&expense).unwrap();
        assert_eq!(json["amount"], serde_json::json!(12.5));
        assert_eq!(json["userId"], 2);
        assert_eq!(json["date"], "2024-01-02T10:00:00");

        let back: ExpenseDto = serde_json::from_value(json).unwrap();
        assert_eq!(back.amount, Decimal::new(125, 1));
    }

    #[test]
    fn test_empty_summary_is_zero() {
        let json = serde_json::to_value(ExpenseSummaryDto::default()).unwrap();
        assert_eq!(json["spent"].as_f64(), Some(0.0));
        assert_eq!(json["total"], 0);
    }
}
