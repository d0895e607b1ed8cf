use common::RoleDto;
use model::entities::role;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

use crate::error::Result;

pub async fn find(db: &DatabaseConnection, role_id: i32) -> Result<Option<role::Model>> {
    Ok(role::Entity::find_by_id(role_id).one(db).await?)
}

pub async fn find_by_name(db: &DatabaseConnection, name: &str) -> Result<Option<role::Model>> {
    Ok(role::Entity::find()
        .filter(role::Column::Name.eq(name))
        .one(db)
        .await?)
}

pub async fn exists(db: &DatabaseConnection, role_id: i32) -> Result<bool> {
    Ok(find(db, role_id).await?.is_some())
}

/// Role with its permission names.
pub async fn to_dto(db: &DatabaseConnection, role: role::Model) -> Result<RoleDto> {
    let permissions = role.permission_names(db).await?;
    Ok(RoleDto {
        id: role.id,
        name: role.name,
        permissions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::setup_test_db;

    #[tokio::test]
    async fn test_admin_dto_lists_every_permission() {
        let db = setup_test_db().await;
        let admin = find_by_name(&db, "admin").await.unwrap().unwrap();
        let dto = to_dto(&db, admin).await.unwrap();

        assert_eq!(dto.name, "admin");
        assert_eq!(dto.permissions.len(), 14);
        assert_eq!(dto.permissions[0], "view user");
        assert!(find_by_name(&db, "root").await.unwrap().is_none());
    }
}
