//! Capability checks.
//!
//! Access to an action is decided from the acting [`Subject`], the
//! [`Permission`] the action needs and, for actions on owned records, the id
//! of the owner. Administrators bypass ownership but still need the
//! permission itself.

use common::{Permission, RoleName};
use model::entities::{role, user};
use sea_orm::{DatabaseConnection, EntityTrait};
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::{DomainError, Result};

/// The authenticated principal of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    pub user_id: i32,
    pub username: String,
    pub role: String,
    pub permissions: HashSet<Permission>,
}

impl Subject {
    /// Loads the user's role and its permissions.
    pub async fn load(db: &DatabaseConnection, user: &user::Model) -> Result<Self> {
        let role = role::Entity::find_by_id(user.role_id)
            .one(db)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("Role {}", user.role_id)))?;

        let mut permissions = HashSet::new();
        for name in role.permission_names(db).await? {
            match name.parse::<Permission>() {
                Ok(permission) => {
                    permissions.insert(permission);
                }
                Err(e) => warn!("Ignoring permission of role '{}': {}", role.name, e),
            }
        }

        Ok(Self {
            user_id: user.id,
            username: user.username.clone(),
            role: role.name,
            permissions,
        })
    }

    pub fn is_admin(&self) -> bool {
        self.role == RoleName::Admin.as_str()
    }

    pub fn can(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessError {
    #[error("Unauthenticated.")]
    Unauthenticated,
    #[error("This action is unauthorized.")]
    Forbidden,
}

/// Checks that `subject` may perform an action requiring `permission`.
/// When `owner` is given, non-admin subjects must also own the record.
pub fn authorize(
    subject: Option<&Subject>,
    permission: Permission,
    owner: Option<i32>,
) -> std::result::Result<&Subject, AccessError> {
    let subject = subject.ok_or(AccessError::Unauthenticated)?;

    if !subject.can(permission) {
        debug!(user_id = subject.user_id, %permission, "Permission denied");
        return Err(AccessError::Forbidden);
    }

    if let Some(owner_id) = owner {
        if owner_id != subject.user_id && !subject.is_admin() {
            debug!(user_id = subject.user_id, owner_id, "Ownership check failed");
            return Err(AccessError::Forbidden);
        }
    }

    Ok(subject)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{create_user, setup_test_db};

    fn subject(role: RoleName, user_id: i32) -> Subject {
        Subject {
            user_id,
            username: format!("user{}", user_id),
            role: role.as_str().to_string(),
            permissions: role.default_permissions().into_iter().collect(),
        }
    }

    #[test]
    fn test_unauthenticated_is_always_denied() {
        assert_eq!(
            authorize(None, Permission::ViewExpenses, None),
            Err(AccessError::Unauthenticated)
        );
    }

    #[test]
    fn test_permission_is_required() {
        let user = subject(RoleName::User, 1);
        assert!(authorize(Some(&user), Permission::ViewExpenses, None).is_ok());
        assert_eq!(
            authorize(Some(&user), Permission::ViewUsers, None),
            Err(AccessError::Forbidden)
        );
    }

    #[test]
    fn test_ownership() {
        let user = subject(RoleName::User, 1);
        assert!(authorize(Some(&user), Permission::DeleteExpenses, Some(1)).is_ok());
        assert_eq!(
            authorize(Some(&user), Permission::DeleteExpenses, Some(2)),
            Err(AccessError::Forbidden)
        );

        let admin = subject(RoleName::Admin, 9);
        assert!(authorize(Some(&admin), Permission::DeleteExpenses, Some(2)).is_ok());
    }

    #[test]
    fn test_admin_still_needs_the_permission() {
        let mut admin = subject(RoleName::Admin, 9);
        admin.permissions.remove(&Permission::DeleteUsers);
        assert_eq!(
            authorize(Some(&admin), Permission::DeleteUsers, Some(9)),
            Err(AccessError::Forbidden)
        );
    }

    #[tokio::test]
    async fn test_load_reads_seeded_role_permissions() {
        let db = setup_test_db().await;
        let user = create_user(&db, "moddy", RoleName::Moderator).await;

        let subject = Subject::load(&db, &user).await.unwrap();
        assert_eq!(subject.role, "moderator");
        assert!(!subject.is_admin());
        assert!(subject.can(Permission::ViewUsers));
        assert!(!subject.can(Permission::DeleteUsers));
    }
}
