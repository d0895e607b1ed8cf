//! Password hashing, credential checks and personal access tokens.

use chrono::Utc;
use model::entities::{personal_access_token, user};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument, trace, warn};
use uuid::Uuid;

use crate::error::Result;

/// bcrypt work factor for stored passwords.
pub const PASSWORD_COST: u32 = bcrypt::DEFAULT_COST;

pub const TOKEN_TYPE: &str = "Bearer";

pub fn hash_password(password: &str) -> Result<String> {
    hash_password_with_cost(password, PASSWORD_COST)
}

pub fn hash_password_with_cost(password: &str, cost: u32) -> Result<String> {
    Ok(bcrypt::hash(password, cost)?)
}

/// Returns false for a malformed hash rather than failing.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match bcrypt::verify(password, hash) {
        Ok(valid) => valid,
        Err(e) => {
            warn!("Could not verify password hash: {}", e);
            false
        }
    }
}

/// Looks the user up by username and checks the password.
#[instrument(skip(db, password))]
pub async fn attempt(
    db: &DatabaseConnection,
    username: &str,
    password: &str,
) -> Result<Option<user::Model>> {
    trace!("Entering attempt function");

    let Some(user) = user::Entity::find()
        .filter(user::Column::Username.eq(username))
        .one(db)
        .await?
    else {
        debug!("No user named '{}'", username);
        return Ok(None);
    };

    if verify_password(password, &user.password) {
        Ok(Some(user))
    } else {
        debug!("Password mismatch for user '{}'", username);
        Ok(None)
    }
}

/// SHA-256 of a plain token, hex encoded. This is what gets stored.
pub fn hash_token(plain: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(plain.as_bytes());
    hex::encode(hasher.finalize())
}

fn generate_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

/// Issues a new token for the user and returns its plain text form.
/// The plain token is not recoverable afterwards.
#[instrument(skip(db))]
pub async fn issue_token(db: &DatabaseConnection, user_id: i32, name: &str) -> Result<String> {
    let plain = generate_token();
    let token = personal_access_token::ActiveModel {
        user_id: Set(user_id),
        name: Set(name.to_string()),
        token: Set(hash_token(&plain)),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    };
    let token = token.insert(db).await?;
    info!("Issued token {} for user {}", token.id, user_id);

    Ok(plain)
}

/// Resolves a plain bearer token to its record and owner, touching
/// `last_used_at`.
pub async fn find_token(
    db: &DatabaseConnection,
    plain: &str,
) -> Result<Option<(personal_access_token::Model, user::Model)>> {
    let found = personal_access_token::Entity::find()
        .filter(personal_access_token::Column::Token.eq(hash_token(plain)))
        .find_also_related(user::Entity)
        .one(db)
        .await?;

    let Some((token, Some(user))) = found else {
        return Ok(None);
    };

    let mut active: personal_access_token::ActiveModel = token.into();
    active.last_used_at = Set(Some(Utc::now().naive_utc()));
    let token = active.update(db).await?;

    Ok(Some((token, user)))
}

/// Deletes a single token. Returns whether a row was removed.
#[instrument(skip(db))]
pub async fn revoke_token(db: &DatabaseConnection, token_id: i32) -> Result<bool> {
    let result = personal_access_token::Entity::delete_by_id(token_id)
        .exec(db)
        .await?;
    debug!("Revoked {} token(s)", result.rows_affected);
    Ok(result.rows_affected == 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{create_user, setup_test_db, TEST_PASSWORD};
    use common::RoleName;
    use sea_orm::PaginatorTrait;

    #[test]
    fn test_hash_token_is_stable_hex() {
        let hashed = hash_token("abc");
        assert_eq!(hashed.len(), 64);
        assert_eq!(
            hashed,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_password_round_trip() {
        let hash = hash_password_with_cost("Passw0rd!", 4).unwrap();
        assert!(verify_password("Passw0rd!", &hash));
        assert!(!verify_password("passw0rd!", &hash));
        assert!(!verify_password("Passw0rd!", "not-a-hash"));
    }

    #[tokio::test]
    async fn test_attempt() {
        let db = setup_test_db().await;
        create_user(&db, "utester", RoleName::User).await;

        assert!(attempt(&db, "utester", TEST_PASSWORD).await.unwrap().is_some());
        assert!(attempt(&db, "utester", "wrong").await.unwrap().is_none());
        assert!(attempt(&db, "nobody", TEST_PASSWORD).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_token_lifecycle() {
        let db = setup_test_db().await;
        let user = create_user(&db, "utester", RoleName::User).await;

        let first = issue_token(&db, user.id, "web").await.unwrap();
        let second = issue_token(&db, user.id, "cli").await.unwrap();
        assert_ne!(first, second);

        let (token, owner) = find_token(&db, &first).await.unwrap().unwrap();
        assert_eq!(owner.id, user.id);
        assert!(token.last_used_at.is_some());
        assert!(find_token(&db, "unknown").await.unwrap().is_none());

        // Revoking one token leaves the other usable
        assert!(revoke_token(&db, token.id).await.unwrap());
        assert!(find_token(&db, &first).await.unwrap().is_none());
        assert!(find_token(&db, &second).await.unwrap().is_some());
        assert_eq!(personal_access_token::Entity::find().count(&db).await.unwrap(), 1);

        assert!(!revoke_token(&db, token.id).await.unwrap());
    }
}
