//! This file serves as the root for all SeaORM entity modules.
//! We define the data models for the expense tracking application here.

pub mod category;
pub mod country;
pub mod expense;
pub mod permission;
pub mod personal_access_token;
pub mod role;
pub mod role_permission;
pub mod user;

pub mod prelude {
    //! A prelude module for easy importing of all entities.
    pub use super::category::Entity as Category;
    pub use super::country::Entity as Country;
    pub use super::expense::Entity as Expense;
    pub use super::permission::Entity as Permission;
    pub use super::personal_access_token::Entity as PersonalAccessToken;
    pub use super::role::Entity as Role;
    pub use super::role_permission::Entity as RolePermission;
    pub use super::user::Entity as User;
}
