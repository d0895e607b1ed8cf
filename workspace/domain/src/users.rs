use chrono::Utc;
use common::{CreateUserRequest, UpdateUserRequest, UserDto};
use model::entities::{country, role, user};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use tracing::{debug, info, instrument, trace};
use validator::ValidationErrors;

use crate::auth::hash_password;
use crate::error::{field_error, DomainError, Result};
use crate::pagination::{Listing, Page, PageRequest};
use crate::{countries, roles};

/// Builds the user resource, loading country and role with permissions.
pub async fn to_dto(db: &DatabaseConnection, user: user::Model) -> Result<UserDto> {
    let country = country::Entity::find_by_id(user.country_id).one(db).await?;
    let role = match role::Entity::find_by_id(user.role_id).one(db).await? {
        Some(role) => Some(roles::to_dto(db, role).await?),
        None => None,
    };

    Ok(UserDto {
        id: user.id,
        full_name: user.full_name(),
        name: user.name,
        surname: user.surname,
        email: user.email,
        phone: user.phone,
        username: user.username,
        gender: user.gender,
        country: country.map(countries::to_dto),
        role,
        created_at: user.created_at,
        updated_at: user.updated_at,
        verified: user.email_verified_at.is_some(),
    })
}

#[instrument(skip(db))]
pub async fn list(db: &DatabaseConnection, request: &PageRequest) -> Result<Listing<UserDto>> {
    trace!("Entering list function");
    let select = user::Entity::find().order_by_asc(user::Column::Id);

    let listing = if request.paginate {
        let paginator = select.paginate(db, request.per_page);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(request.page - 1).await?;
        Listing::Paginated(Page {
            items,
            total,
            page: request.page,
            per_page: request.per_page,
        })
    } else {
        Listing::All(select.all(db).await?)
    };
    debug!("Listed {} users", listing.len());

    // Resolve resources one by one; listings are bounded by the page size.
    let listing = match listing {
        Listing::Paginated(page) => {
            let mut items = Vec::with_capacity(page.items.len());
            for user in page.items {
                items.push(to_dto(db, user).await?);
            }
            Listing::Paginated(Page {
                items,
                total: page.total,
                page: page.page,
                per_page: page.per_page,
            })
        }
        Listing::All(users) => {
            let mut items = Vec::with_capacity(users.len());
            for user in users {
                items.push(to_dto(db, user).await?);
            }
            Listing::All(items)
        }
    };

    Ok(listing)
}

pub async fn find(db: &DatabaseConnection, user_id: i32) -> Result<Option<user::Model>> {
    Ok(user::Entity::find_by_id(user_id).one(db).await?)
}

pub async fn find_by_username(db: &DatabaseConnection, username: &str) -> Result<Option<user::Model>> {
    Ok(user::Entity::find()
        .filter(user::Column::Username.eq(username))
        .one(db)
        .await?)
}

/// Reference and uniqueness checks shared by create and update.
/// `current` is the id of the user being updated, if any.
async fn check_references(
    db: &DatabaseConnection,
    errors: &mut ValidationErrors,
    current: Option<i32>,
    country_id: Option<i32>,
    role_id: Option<i32>,
    username: Option<&str>,
    email: Option<&str>,
) -> Result<()> {
    if let Some(country_id) = country_id {
        if !countries::exists(db, country_id).await? {
            errors.add(
                "countryId",
                field_error("exists", "The countryId does not exist in storage."),
            );
        }
    }
    if let Some(role_id) = role_id {
        if !roles::exists(db, role_id).await? {
            errors.add("roleId", field_error("exists", "The selected roleId is invalid."));
        }
    }
    if let Some(username) = username {
        let taken = user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(db)
            .await?;
        if taken.is_some_and(|other| Some(other.id) != current) {
            errors.add(
                "username",
                field_error("unique", "The username has already been taken."),
            );
        }
    }
    if let Some(email) = email {
        let taken = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(db)
            .await?;
        if taken.is_some_and(|other| Some(other.id) != current) {
            errors.add("email", field_error("unique", "The email has already been taken."));
        }
    }
    Ok(())
}

/// Creates a user from a request that already passed field validation.
#[instrument(skip(db, request), fields(username = %request.username))]
pub async fn create(db: &DatabaseConnection, request: CreateUserRequest) -> Result<UserDto> {
    let mut errors = ValidationErrors::new();
    check_references(
        db,
        &mut errors,
        None,
        Some(request.country_id),
        Some(request.role_id),
        Some(&request.username),
        Some(&request.email),
    )
    .await?;
    if !errors.is_empty() {
        return Err(DomainError::Validation(errors));
    }

    let now = Utc::now().naive_utc();
    let user = user::ActiveModel {
        name: Set(request.name),
        surname: Set(request.surname),
        email: Set(request.email),
        phone: Set(request.phone),
        username: Set(request.username),
        password: Set(hash_password(&request.password)?),
        gender: Set(request.gender),
        country_id: Set(request.country_id),
        role_id: Set(request.role_id),
        email_verified_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;
    info!("Created user {} ({})", user.id, user.username);

    to_dto(db, user).await
}

/// Applies the fields present in `request`. Returns `None` for an unknown id.
#[instrument(skip(db, request))]
pub async fn update(
    db: &DatabaseConnection,
    user_id: i32,
    request: UpdateUserRequest,
) -> Result<Option<UserDto>> {
    let Some(existing) = find(db, user_id).await? else {
        return Ok(None);
    };

    let mut errors = ValidationErrors::new();
    check_references(
        db,
        &mut errors,
        Some(user_id),
        request.country_id,
        request.role_id,
        request.username.as_deref(),
        request.email.as_deref(),
    )
    .await?;
    if !errors.is_empty() {
        return Err(DomainError::Validation(errors));
    }

    let mut active: user::ActiveModel = existing.into();
    if let Some(name) = request.name {
        active.name = Set(name);
    }
    if let Some(surname) = request.surname {
        active.surname = Set(surname);
    }
    if let Some(email) = request.email {
        active.email = Set(email);
    }
    if let Some(phone) = request.phone {
        active.phone = Set(phone);
    }
    if let Some(username) = request.username {
        active.username = Set(username);
    }
    if let Some(password) = request.password {
        active.password = Set(hash_password(&password)?);
    }
    if let Some(gender) = request.gender {
        active.gender = Set(gender);
    }
    if let Some(country_id) = request.country_id {
        active.country_id = Set(country_id);
    }
    if let Some(role_id) = request.role_id {
        active.role_id = Set(role_id);
    }
    active.updated_at = Set(Utc::now().naive_utc());

    let user = active.update(db).await?;
    info!("Updated user {}", user.id);

    Ok(Some(to_dto(db, user).await?))
}

/// Deletes by id. Returns false when nothing was deleted.
#[instrument(skip(db))]
pub async fn delete(db: &DatabaseConnection, user_id: i32) -> Result<bool> {
    let result = user::Entity::delete_by_id(user_id).exec(db).await?;
    Ok(result.rows_affected == 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{create_expense, create_user, day, role_id, setup_test_db};
    use crate::expenses;
    use common::RoleName;
    use rust_decimal::Decimal;

    async fn request(db: &DatabaseConnection, username: &str) -> CreateUserRequest {
        CreateUserRequest {
            name: "Jane".to_string(),
            surname: "Doe".to_string(),
            email: format!("{}@example.com", username),
            phone: "0123456789".to_string(),
            username: username.to_string(),
            password: "secret".to_string(),
            password_confirmation: "secret".to_string(),
            gender: "f".to_string(),
            country_id: 1,
            role_id: role_id(db, RoleName::User).await,
        }
    }

    #[tokio::test]
    async fn test_create_builds_resource() {
        let db = setup_test_db().await;
        let dto = create(&db, request(&db, "jdoe").await).await.unwrap();

        assert_eq!(dto.full_name, "Jane Doe");
        assert_eq!(dto.country.as_ref().unwrap().code, "gb");
        assert_eq!(dto.role.as_ref().unwrap().name, "user");
        assert!(!dto.verified);

        let stored = find(&db, dto.id).await.unwrap().unwrap();
        assert_ne!(stored.password, "secret");
    }

    #[tokio::test]
    async fn test_create_rejects_duplicates_and_unknown_references() {
        let db = setup_test_db().await;
        create(&db, request(&db, "jdoe").await).await.unwrap();

        let mut duplicate = request(&db, "jdoe").await;
        duplicate.country_id = 999;
        let err = create(&db, duplicate).await.unwrap_err();
        let DomainError::Validation(errors) = err else {
            panic!("expected validation errors");
        };
        let fields = errors.field_errors();
        assert!(fields.contains_key("username"));
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("countryId"));
    }

    #[tokio::test]
    async fn test_update_applies_present_fields_only() {
        let db = setup_test_db().await;
        let user = create_user(&db, "partial", RoleName::User).await;

        let updated = update(
            &db,
            user.id,
            UpdateUserRequest {
                phone: Some("99999".to_string()),
                // Keeping one's own username is not a conflict
                username: Some("partial".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();

        assert_eq!(updated.phone, "99999");
        assert_eq!(updated.name, user.name);
        assert_eq!(updated.email, user.email);

        assert!(update(&db, 999, UpdateUserRequest::default()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_cascades_to_expenses() {
        let db = setup_test_db().await;
        let user = create_user(&db, "leaving", RoleName::User).await;
        create_expense(&db, user.id, 1, Decimal::ONE, day(1)).await;

        assert!(delete(&db, user.id).await.unwrap());
        assert!(!delete(&db, user.id).await.unwrap());
        assert_eq!(expenses::summary(&db, user.id).await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn test_list_paginates_users() {
        let db = setup_test_db().await;
        for name in ["a", "b", "c"] {
            create_user(&db, name, RoleName::User).await;
        }

        let request = PageRequest {
            paginate: true,
            page: 2,
            per_page: 2,
        };
        let Listing::Paginated(page) = list(&db, &request).await.unwrap() else {
            panic!("expected a page");
        };
        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].username, "c");
    }
}
