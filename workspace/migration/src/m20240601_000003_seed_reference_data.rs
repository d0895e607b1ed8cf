use common::{Permission, RoleName};
use sea_orm_migration::prelude::*;

use crate::m20240601_000001_create_reference_tables::{
    Categories, Countries, Permissions, RolePermissions, Roles,
};

/// Countries available at registration: (alpha-2 code, name).
pub const COUNTRIES: [(&str, &str); 15] = [
    ("gb", "Great Britain"),
    ("fr", "France"),
    ("de", "Germany"),
    ("it", "Italy"),
    ("be", "Belgium"),
    ("es", "Spain"),
    ("ua", "Ukraine"),
    ("ca", "Canada"),
    ("us", "United States"),
    ("dk", "Denmark"),
    ("gl", "Greenland"),
    ("is", "Iceland"),
    ("nz", "New Zealand"),
    ("pt", "Portugal"),
    ("za", "South Africa"),
];

pub const CATEGORIES: [&str; 18] = [
    "Leisure",
    "Advertising",
    "Bank Fees",
    "Insurance",
    "Utilities",
    "Rent",
    "Software",
    "Salaries and Wages",
    "Education",
    "Donations",
    "Travel",
    "Marketing",
    "Subscriptions",
    "Equipment",
    "Property",
    "Professional Services",
    "Charitable Contributions",
    "Office Supplies",
];

#[derive(DeriveMigrationName)]
pub struct Migration;

fn values_error(e: sea_orm::sea_query::error::Error) -> DbErr {
    DbErr::Migration(e.to_string())
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let mut insert = Query::insert();
        insert
            .into_table(Countries::Table)
            .columns([Countries::Alpha2Code, Countries::Name, Countries::Active]);
        for (code, name) in COUNTRIES {
            insert
                .values([code.into(), name.into(), true.into()])
                .map_err(values_error)?;
        }
        manager.exec_stmt(insert).await?;

        let mut insert = Query::insert();
        insert.into_table(Categories::Table).columns([Categories::Name]);
        for name in CATEGORIES {
            insert.values([name.into()]).map_err(values_error)?;
        }
        manager.exec_stmt(insert).await?;

        let mut insert = Query::insert();
        insert.into_table(Permissions::Table).columns([Permissions::Name]);
        for permission in Permission::ALL {
            insert
                .values([permission.as_str().into()])
                .map_err(values_error)?;
        }
        manager.exec_stmt(insert).await?;

        let mut insert = Query::insert();
        insert.into_table(Roles::Table).columns([Roles::Name]);
        for role in RoleName::ALL {
            insert.values([role.as_str().into()]).map_err(values_error)?;
        }
        manager.exec_stmt(insert).await?;

        // Grant each role its default permissions, resolving ids by name
        for role in RoleName::ALL {
            let names: Vec<&str> = role
                .default_permissions()
                .iter()
                .map(|permission| permission.as_str())
                .collect();

            let select = Query::select()
                .column((Roles::Table, Roles::Id))
                .column((Permissions::Table, Permissions::Id))
                .from(Roles::Table)
                .from(Permissions::Table)
                .and_where(Expr::col((Roles::Table, Roles::Name)).eq(role.as_str()))
                .and_where(Expr::col((Permissions::Table, Permissions::Name)).is_in(names))
                .to_owned();

            let insert = Query::insert()
                .into_table(RolePermissions::Table)
                .columns([RolePermissions::RoleId, RolePermissions::PermissionId])
                .select_from(select)
                .map_err(values_error)?
                .to_owned();
            manager.exec_stmt(insert).await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .exec_stmt(Query::delete().from_table(RolePermissions::Table).to_owned())
            .await?;
        manager
            .exec_stmt(Query::delete().from_table(Roles::Table).to_owned())
            .await?;
        manager
            .exec_stmt(Query::delete().from_table(Permissions::Table).to_owned())
            .await?;
        manager
            .exec_stmt(Query::delete().from_table(Categories::Table).to_owned())
            .await?;
        manager
            .exec_stmt(Query::delete().from_table(Countries::Table).to_owned())
            .await
    }
}
