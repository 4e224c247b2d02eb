//! Category and location lookup tables

use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::Deserialize;

use super::access::require_role;
use super::views::{CategoryView, LocationView};
use crate::db::entities::status::Role;
use crate::db::entities::{category, location, user};
use crate::error::{Result, ServerError};

#[derive(Debug, Deserialize)]
pub struct NewCategory {
    pub category_name: String,
}

#[derive(Debug, Deserialize)]
pub struct NewLocation {
    pub location_name: String,
    pub building: Option<String>,
    pub floor: Option<String>,
}

pub async fn list_categories<C: ConnectionTrait>(db: &C) -> Result<Vec<CategoryView>> {
    let rows = category::Entity::find()
        .order_by_asc(category::Column::Name)
        .all(db)
        .await?;
    Ok(rows.into_iter().map(CategoryView::from).collect())
}

pub async fn list_locations<C: ConnectionTrait>(db: &C) -> Result<Vec<LocationView>> {
    let rows = location::Entity::find()
        .order_by_asc(location::Column::Name)
        .all(db)
        .await?;
    Ok(rows.into_iter().map(LocationView::from).collect())
}

fn trimmed_name(name: &str, what: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ServerError::Validation(format!("{} name must not be blank", what)));
    }
    Ok(name.to_string())
}

pub async fn create_category<C: ConnectionTrait>(
    db: &C,
    actor: &user::Model,
    new_category: NewCategory,
) -> Result<CategoryView> {
    require_role(actor, Role::Admin)?;
    let name = trimmed_name(&new_category.category_name, "Category")?;

    let existing = category::Entity::find()
        .filter(category::Column::Name.eq(name.as_str()))
        .one(db)
        .await?;
    if existing.is_some() {
        return Err(ServerError::Conflict(format!("Category '{}' already exists", name)));
    }

    let created = category::ActiveModel {
        name: Set(name),
        ..Default::default()
    }
    .insert(db)
    .await?;
    tracing::info!("Created category {} ({})", created.id, created.name);
    Ok(created.into())
}

pub async fn create_location<C: ConnectionTrait>(
    db: &C,
    actor: &user::Model,
    new_location: NewLocation,
) -> Result<LocationView> {
    require_role(actor, Role::Admin)?;
    let name = trimmed_name(&new_location.location_name, "Location")?;

    if find_location_by_name(db, &name).await?.is_some() {
        return Err(ServerError::Conflict(format!("Location '{}' already exists", name)));
    }

    let created = location::ActiveModel {
        name: Set(name),
        building: Set(new_location.building.filter(|b| !b.trim().is_empty())),
        floor: Set(new_location.floor.filter(|f| !f.trim().is_empty())),
        ..Default::default()
    }
    .insert(db)
    .await?;
    tracing::info!("Created location {} ({})", created.id, created.name);
    Ok(created.into())
}

async fn find_location_by_name<C: ConnectionTrait>(db: &C, name: &str) -> Result<Option<location::Model>> {
    Ok(location::Entity::find()
        .filter(location::Column::Name.eq(name))
        .one(db)
        .await?)
}

/// Resolve a free-text location name, creating the row on first use.
/// A blank name resolves to no location.
pub async fn find_or_create_location<C: ConnectionTrait>(db: &C, name: &str) -> Result<Option<location::Model>> {
    let name = name.trim();
    if name.is_empty() {
        return Ok(None);
    }
    if let Some(existing) = find_location_by_name(db, name).await? {
        return Ok(Some(existing));
    }

    let created = location::ActiveModel {
        name: Set(name.to_string()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    tracing::debug!("Created location {} from report", created.name);
    Ok(Some(created))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_database;
    use crate::portal::users::{ensure_admin, register, NewUser};

    async fn admin_and_student<C: ConnectionTrait>(db: &C) -> (user::Model, user::Model) {
        let admin = ensure_admin(db, "ADMIN", "pw").await.unwrap();
        let student = register(
            db,
            NewUser {
                name: Some("Sam".into()),
                roll_number: Some("S1".into()),
                password: Some("pw".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        (admin, student)
    }

    #[tokio::test]
    async fn test_categories_sorted_and_unique() {
        let db = test_database().await;
        let (admin, student) = admin_and_student(&db).await;

        for name in ["Wallets", "Electronics", "Bags"] {
            create_category(&db, &admin, NewCategory { category_name: name.into() })
                .await
                .unwrap();
        }
        let names: Vec<_> = list_categories(&db)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.category_name)
            .collect();
        assert_eq!(names, vec!["Bags", "Electronics", "Wallets"]);

        let dup = create_category(&db, &admin, NewCategory { category_name: " Bags ".into() }).await;
        assert!(matches!(dup, Err(ServerError::Conflict(_))));

        let forbidden = create_category(&db, &student, NewCategory { category_name: "Keys".into() }).await;
        assert!(matches!(forbidden, Err(ServerError::Forbidden)));
    }

    #[tokio::test]
    async fn test_find_or_create_location() {
        let db = test_database().await;
        assert!(find_or_create_location(&db, "   ").await.unwrap().is_none());

        let first = find_or_create_location(&db, " Library ").await.unwrap().unwrap();
        assert_eq!(first.name, "Library");
        let again = find_or_create_location(&db, "Library").await.unwrap().unwrap();
        assert_eq!(first.id, again.id);
        assert_eq!(list_locations(&db).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_location_keeps_details() {
        let db = test_database().await;
        let (admin, _) = admin_and_student(&db).await;
        let loc = create_location(
            &db,
            &admin,
            NewLocation {
                location_name: "Main Block".into(),
                building: Some("A".into()),
                floor: Some("".into()),
            },
        )
        .await
        .unwrap();
        assert_eq!(loc.building.as_deref(), Some("A"));
        assert!(loc.floor.is_none());
    }
}
