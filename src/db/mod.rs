//! Database module: connection setup and schema creation using SeaORM

pub mod entities;

use std::time::Duration;

use sea_orm::sea_query::Index;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbBackend, DbErr, EntityTrait, Schema,
};

use entities::{item, Category, Claim, Item, ItemImage, Location, Report, User};

/// Connect to the database and create tables that do not exist yet
pub async fn init_database(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    tracing::info!("Connecting to database: {}", redact(database_url));

    let mut options = ConnectOptions::new(database_url.to_string());
    options
        .max_connections(10)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);
    // An in-memory SQLite database exists per connection; keep exactly one.
    if database_url.starts_with("sqlite::memory:") {
        options.max_connections(1).min_connections(1);
    }

    let db = Database::connect(options).await?;
    create_tables(&db).await?;
    Ok(db)
}

/// Create all tables if they don't exist. Referenced tables come first so
/// foreign keys resolve on engines that check them at creation time.
pub async fn create_tables(db: &DatabaseConnection) -> Result<(), DbErr> {
    create_table(db, User).await?;
    create_table(db, Category).await?;
    create_table(db, Location).await?;
    create_table(db, Item).await?;
    create_table(db, Report).await?;
    create_table(db, ItemImage).await?;
    create_table(db, Claim).await?;

    let backend = db.get_database_backend();
    let mut unique_title = Index::create()
        .name("uk_title_createdby")
        .table(Item)
        .col(item::Column::Title)
        .col(item::Column::CreatedBy)
        .unique()
        .to_owned();
    // MySQL has no CREATE INDEX IF NOT EXISTS
    if backend != DbBackend::MySql {
        unique_title.if_not_exists();
    }
    match db.execute(backend.build(&unique_title)).await {
        Ok(_) => {}
        Err(e) if index_already_exists(&e) => {
            tracing::debug!("Index uk_title_createdby already present");
        }
        Err(e) => {
            tracing::warn!("Could not create unique index uk_title_createdby: {}", e);
        }
    }

    tracing::info!("Database tables initialized");
    Ok(())
}

async fn create_table<E: EntityTrait>(db: &DatabaseConnection, entity: E) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(backend.build(&statement)).await?;
    Ok(())
}

/// MySQL reports an existing index as error 1061 "Duplicate key name"
fn index_already_exists(err: &DbErr) -> bool {
    let message = err.to_string();
    message.contains("Duplicate key name") || message.contains("already exists")
}

/// Hide the password part of a connection URL before logging it
fn redact(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            let credentials = &url[scheme_end + 3..at];
            match credentials.find(':') {
                Some(colon) => format!(
                    "{}{}:***{}",
                    &url[..scheme_end + 3],
                    &credentials[..colon],
                    &url[at..]
                ),
                None => url.to_string(),
            }
        }
        _ => url.to_string(),
    }
}

/// In-memory database with the full schema, for tests
#[cfg(test)]
pub async fn test_database() -> DatabaseConnection {
    init_database("sqlite::memory:")
        .await
        .expect("in-memory database")
}
