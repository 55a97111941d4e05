//! Database configuration module for `DealDesk`.
//!
//! This module handles the `SQLite` connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with `Schema::create_table_from_entity`,
//! so the schema always matches the Rust structs without hand-written SQL. Every write
//! that touches more than one row runs in a transaction, which is what keeps the store
//! consistent when the sweep and a button press land at the same time.

use crate::entities::{
    Appeal, Cascade, Deal, Merchant, MessageLink, ProofMessage, Shift, SlaNotification, Staff,
    Stat, StatMerchant,
};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};
use tracing::debug;

const DEFAULT_DATABASE_URL: &str = "sqlite://data/deal_desk.sqlite?mode=rwc";

/// Gets the database URL from the environment or returns the default `SQLite` path.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the database named by `DATABASE_URL`.
///
/// Falls back to a local `SQLite` file (created on first run) if the variable is not set.
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();
    debug!(url = %database_url, "connecting to deal store");
    Database::connect(&database_url).await.map_err(Into::into)
}

async fn create_table<C, E>(db: &C, schema: &Schema, entity: E) -> Result<()>
where
    C: ConnectionTrait,
    E: EntityTrait,
{
    let builder = db.get_database_backend();
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(builder.build(&statement)).await?;
    Ok(())
}

/// Creates every deal store table that does not exist yet.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let schema = Schema::new(db.get_database_backend());

    create_table(db, &schema, Deal).await?;
    create_table(db, &schema, MessageLink).await?;
    create_table(db, &schema, Merchant).await?;
    create_table(db, &schema, Cascade).await?;
    create_table(db, &schema, Stat).await?;
    create_table(db, &schema, StatMerchant).await?;
    create_table(db, &schema, Appeal).await?;
    create_table(db, &schema, ProofMessage).await?;
    create_table(db, &schema, SlaNotification).await?;
    create_table(db, &schema, Shift).await?;
    create_table(db, &schema, Staff).await?;

    Ok(())
}
