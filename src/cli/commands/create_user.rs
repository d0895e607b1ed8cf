use anyhow::{anyhow, Result};
use common::{CreateUserRequest, RoleName};
use domain::{roles, users};
use tracing::{debug, error, info, trace};
use validator::Validate;

use super::initdb::connect_and_migrate;

/// Account details collected from the command line.
#[derive(Debug, Clone)]
pub struct Account {
    pub username: String,
    pub password: String,
    pub email: String,
    pub role: RoleName,
    pub name: String,
    pub surname: String,
    pub phone: String,
    pub gender: String,
    pub country_id: i32,
}

pub async fn create_user(database_url: &str, account: Account) -> Result<()> {
    trace!("Entering create_user function");
    info!("Creating {} account '{}'", account.role, account.username);

    let db = connect_and_migrate(database_url).await?;

    let role = roles::find_by_name(&db, account.role.as_str())
        .await?
        .ok_or_else(|| anyhow!("Role '{}' is not seeded", account.role))?;
    debug!("Resolved role '{}' to id {}", role.name, role.id);

    let request = CreateUserRequest {
        name: account.name,
        surname: account.surname,
        email: account.email,
        phone: account.phone,
        username: account.username,
        password_confirmation: account.password.clone(),
        password: account.password,
        gender: account.gender,
        country_id: account.country_id,
        role_id: role.id,
    };
    request.validate()?;

    match users::create(&db, request).await {
        Ok(user) => {
            info!("Created user {} ({})", user.id, user.username);
            println!("Created user {} with id {}", user.username, user.id);
            Ok(())
        }
        Err(e) => {
            error!("Failed to create user: {}", e);
            Err(e.into())
        }
    }
}
