use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

/// Genders accepted by the user endpoints.
pub const GENDERS: [&str; 2] = ["m", "f"];

fn gender_error() -> ValidationError {
    let mut error = ValidationError::new("in");
    error.message = Some("The selected gender is invalid.".into());
    error
}

// ===================== Auth =====================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 100))]
    pub username: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Credentials exchanged for a named API token.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequest {
    #[validate(length(min = 1, max = 100))]
    pub username: String,
    #[validate(length(min = 1))]
    pub password: String,
    #[validate(length(min = 1, max = 255))]
    pub device_name: String,
}

// ===================== Users =====================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_create_user_gender"))]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1, max = 100))]
    pub surname: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 4, max = 100))]
    pub phone: String,
    #[validate(length(min = 1, max = 100))]
    pub username: String,
    #[validate(
        length(min = 3, max = 100),
        must_match(other = "password_confirmation", message = "The password field confirmation does not match.")
    )]
    pub password: String,
    pub password_confirmation: String,
    pub gender: String,
    #[validate(range(min = 1))]
    pub country_id: i32,
    #[validate(range(min = 1))]
    pub role_id: i32,
}

fn validate_create_user_gender(request: &CreateUserRequest) -> Result<(), ValidationError> {
    if GENDERS.contains(&request.gender.as_str()) {
        Ok(())
    } else {
        Err(gender_error())
    }
}

/// Partial update: only the fields that are present are applied.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_update_user"))]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub surname: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 4, max = 100))]
    pub phone: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub username: Option<String>,
    #[validate(length(min = 3, max = 100))]
    pub password: Option<String>,
    pub password_confirmation: Option<String>,
    pub gender: Option<String>,
    #[validate(range(min = 1))]
    pub country_id: Option<i32>,
    #[validate(range(min = 1))]
    pub role_id: Option<i32>,
}

fn validate_update_user(request: &UpdateUserRequest) -> Result<(), ValidationError> {
    if let Some(gender) = &request.gender {
        if !GENDERS.contains(&gender.as_str()) {
            return Err(gender_error());
        }
    }
    if request.password.is_some() && request.password != request.password_confirmation {
        let mut error = ValidationError::new("confirmed");
        error.message = Some("The password field confirmation does not match.".into());
        return Err(error);
    }
    Ok(())
}

// ===================== Expenses =====================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateExpenseRequest {
    /// Owner of the expense; only administrators may set someone else
    #[validate(range(min = 1))]
    pub user_id: Option<i32>,
    #[validate(range(min = 1))]
    pub category_id: i32,
    /// Number or numeric string, at most two decimals
    #[serde(deserialize_with = "crate::amount::deserialize")]
    #[validate(custom(function = "crate::amount::validate_amount"))]
    #[schema(value_type = String, example = "99.99")]
    pub amount: Decimal,
    /// `YYYY-MM-DD HH:MM:SS`
    #[serde(deserialize_with = "crate::datetime::deserialize")]
    #[schema(value_type = String, example = "2024-03-01 14:30:00")]
    pub date: NaiveDateTime,
    #[validate(length(min = 1))]
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_request() -> CreateUserRequest {
        CreateUserRequest {
            name: "Jane".to_string(),
            surname: "Doe".to_string(),
            email: "jane@example.com".to_string(),
            phone: "+441234567".to_string(),
            username: "jdoe".to_string(),
            password: "secret".to_string(),
            password_confirmation: "secret".to_string(),
            gender: "f".to_string(),
            country_id: 1,
            role_id: 1,
        }
    }

    #[test]
    fn test_create_user_validation() {
        assert!(user_request().validate().is_ok());

        let mut request = user_request();
        request.password_confirmation = "other".to_string();
        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("password"));

        let mut request = user_request();
        request.gender = "x".to_string();
        assert!(request.validate().is_err());

        let mut request = user_request();
        request.email = "not-an-email".to_string();
        assert!(request.validate().unwrap_err().field_errors().contains_key("email"));
    }

    #[test]
    fn test_update_user_is_partial() {
        assert!(UpdateUserRequest::default().validate().is_ok());

        let request = UpdateUserRequest {
            password: Some("secret".to_string()),
            ..Default::default()
        };
        assert!(request.validate().is_err());

        let request = UpdateUserRequest {
            name: Some(String::new()),
            ..Default::default()
        };
        assert!(request.validate().unwrap_err().field_errors().contains_key("name"));
    }

    #[test]
    fn test_create_expense_from_json() {
        let request: CreateExpenseRequest = serde_json::from_str(
            r#"{"categoryId": 1, "amount": "99.99", "date": "2024-03-01 14:30:00", "description": "Test"}"#,
        )
        .unwrap();
        assert!(request.validate().is_ok());
        assert_eq!(request.amount, Decimal::new(9999, 2));
        assert_eq!(request.user_id, None);

        let request: CreateExpenseRequest = serde_json::from_str(
            r#"{"categoryId": 1, "amount": "1.999", "date": "2024-03-01 14:30:00", "description": ""}"#,
        )
        .unwrap();
        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("amount"));
        assert!(errors.field_errors().contains_key("description"));

        let bad_date = serde_json::from_str::<CreateExpenseRequest>(
            r#"{"categoryId": 1, "amount": 5, "date": "yesterday"}"#,
        );
        assert!(bad_date.is_err());
    }
}
