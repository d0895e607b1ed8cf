use common::CategoryDto;
use model::entities::category;
use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait, QueryOrder};
use tracing::{debug, instrument};

use crate::error::Result;
use crate::pagination::{Listing, Page, PageRequest};

pub async fn exists(db: &DatabaseConnection, category_id: i32) -> Result<bool> {
    Ok(category::Entity::find_by_id(category_id)
        .one(db)
        .await?
        .is_some())
}

pub fn to_dto(category: category::Model) -> CategoryDto {
    CategoryDto {
        id: category.id,
        name: category.name,
    }
}

/// Categories ordered by id.
#[instrument(skip(db))]
pub async fn list(db: &DatabaseConnection, request: &PageRequest) -> Result<Listing<CategoryDto>> {
    let select = category::Entity::find().order_by_asc(category::Column::Id);

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

    debug!("Listed {} categories", listing.len());
    Ok(listing.map(to_dto))
}
