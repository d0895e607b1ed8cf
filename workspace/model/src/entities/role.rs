use sea_orm::entity::prelude::*;
use sea_orm::{DatabaseConnection, QueryOrder};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "roles")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::user::Entity")]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

// Many-to-many with permissions through the role_permissions join table.
impl Related<super::permission::Entity> for Entity {
    fn to() -> RelationDef {
        super::role_permission::Relation::Permission.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::role_permission::Relation::Role.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Names of the permissions granted by this role, ordered by id.
    pub async fn permission_names(&self, db: &DatabaseConnection) -> Result<Vec<String>, DbErr> {
        let permissions = self
            .find_related(super::permission::Entity)
            .order_by_asc(super::permission::Column::Id)
            .all(db)
            .await?;

        Ok(permissions.into_iter().map(|p| p.name).collect())
    }
}
