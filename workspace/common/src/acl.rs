//! Permission catalog and built-in roles.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// A capability a role may grant. The string form is what is stored in the
/// `permissions` table and exposed to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Permission {
    #[serde(rename = "view user")]
    ViewUser,
    #[serde(rename = "create users")]
    CreateUsers,
    #[serde(rename = "update users")]
    UpdateUsers,
    #[serde(rename = "delete users")]
    DeleteUsers,
    #[serde(rename = "view users")]
    ViewUsers,
    #[serde(rename = "view expenses")]
    ViewExpenses,
    #[serde(rename = "create expenses")]
    CreateExpenses,
    #[serde(rename = "update expenses")]
    UpdateExpenses,
    #[serde(rename = "delete expenses")]
    DeleteExpenses,
    #[serde(rename = "view expense summary")]
    ViewExpenseSummary,
    #[serde(rename = "view categories")]
    ViewCategories,
    #[serde(rename = "update categories")]
    UpdateCategories,
    #[serde(rename = "create categories")]
    CreateCategories,
    #[serde(rename = "delete categories")]
    DeleteCategories,
}

impl Permission {
    pub const ALL: [Permission; 14] = [
        Permission::ViewUser,
        Permission::CreateUsers,
        Permission::UpdateUsers,
        Permission::DeleteUsers,
        Permission::ViewUsers,
        Permission::ViewExpenses,
        Permission::CreateExpenses,
        Permission::UpdateExpenses,
        Permission::DeleteExpenses,
        Permission::ViewExpenseSummary,
        Permission::ViewCategories,
        Permission::UpdateCategories,
        Permission::CreateCategories,
        Permission::DeleteCategories,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::ViewUser => "view user",
            Permission::CreateUsers => "create users",
            Permission::UpdateUsers => "update users",
            Permission::DeleteUsers => "delete users",
            Permission::ViewUsers => "view users",
            Permission::ViewExpenses => "view expenses",
            Permission::CreateExpenses => "create expenses",
            Permission::UpdateExpenses => "update expenses",
            Permission::DeleteExpenses => "delete expenses",
            Permission::ViewExpenseSummary => "view expense summary",
            Permission::ViewCategories => "view categories",
            Permission::UpdateCategories => "update categories",
            Permission::CreateCategories => "create categories",
            Permission::DeleteCategories => "delete categories",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::ALL
            .iter()
            .copied()
            .find(|permission| permission.as_str() == s)
            .ok_or_else(|| format!("Unknown permission: {}", s))
    }
}

/// Roles seeded with the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoleName {
    User,
    Moderator,
    Admin,
}

impl RoleName {
    pub const ALL: [RoleName; 3] = [RoleName::User, RoleName::Moderator, RoleName::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            RoleName::User => "user",
            RoleName::Moderator => "moderator",
            RoleName::Admin => "admin",
        }
    }

    /// Permissions granted to the role when it is seeded.
    pub fn default_permissions(&self) -> Vec<Permission> {
        use Permission::*;

        let expenses = [
            ViewCategories,
            ViewExpenses,
            CreateExpenses,
            UpdateExpenses,
            DeleteExpenses,
            ViewExpenseSummary,
        ];
        match self {
            RoleName::User => expenses.to_vec(),
            RoleName::Moderator => {
                let mut permissions = vec![ViewUser, ViewUsers, UpdateCategories];
                permissions.extend(expenses);
                permissions
            }
            RoleName::Admin => Permission::ALL.to_vec(),
        }
    }
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoleName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RoleName::ALL
            .iter()
            .copied()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| format!("Unknown role: {}", s))
    }
}
