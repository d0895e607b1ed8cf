use common::CountryDto;
use model::entities::country;
use sea_orm::{DatabaseConnection, EntityTrait};

use crate::error::Result;

pub async fn find(db: &DatabaseConnection, country_id: i32) -> Result<Option<country::Model>> {
    Ok(country::Entity::find_by_id(country_id).one(db).await?)
}

pub async fn exists(db: &DatabaseConnection, country_id: i32) -> Result<bool> {
    Ok(find(db, country_id).await?.is_some())
}

pub fn to_dto(country: country::Model) -> CountryDto {
    CountryDto {
        id: country.id,
        name: country.name,
        code: country.alpha_2_code,
        active: country.active,
    }
}
