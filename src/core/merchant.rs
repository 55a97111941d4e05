//! Merchant store operations - registration, chat binding and handler claims.

use crate::{
    entities::{Merchant, merchant},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::info;

const ENTITY: &str = "Merchant";

/// All merchants in registration order.
pub async fn get_all_merchants(db: &DatabaseConnection) -> Result<Vec<merchant::Model>> {
    Merchant::find()
        .order_by_asc(merchant::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds a merchant by its unique name.
pub async fn get_merchant_by_name(
    db: &DatabaseConnection,
    name: &str,
) -> Result<Option<merchant::Model>> {
    Merchant::find()
        .filter(merchant::Column::Name.eq(name))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds the merchant bound to a chat.
pub async fn get_merchant_by_chat(
    db: &DatabaseConnection,
    chat_id: &str,
) -> Result<Option<merchant::Model>> {
    Merchant::find()
        .filter(merchant::Column::ChatId.eq(chat_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Registers a new merchant with a freshly generated merchant id.
///
/// # Errors
/// `AlreadyExists` if the name is taken.
pub async fn create_merchant(
    db: &DatabaseConnection,
    name: &str,
    display_name: &str,
    chat_id: Option<String>,
    handler_id: Option<String>,
) -> Result<merchant::Model> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::Config {
            message: "Merchant name cannot be empty".to_string(),
        });
    }
    if get_merchant_by_name(db, name).await?.is_some() {
        return Err(Error::AlreadyExists {
            entity: ENTITY,
            name: name.to_string(),
        });
    }

    let merchant = merchant::ActiveModel {
        name: Set(name.to_string()),
        display_name: Set(display_name.trim().to_string()),
        chat_id: Set(chat_id),
        merchant_id: Set(uuid::Uuid::new_v4().to_string()),
        handler_id: Set(handler_id),
        ..Default::default()
    };
    let merchant = merchant.insert(db).await?;
    info!(name = %merchant.name, "merchant registered");
    Ok(merchant)
}

/// Removes a merchant.
pub async fn delete_merchant(db: &DatabaseConnection, name: &str) -> Result<()> {
    let result = Merchant::delete_many()
        .filter(merchant::Column::Name.eq(name))
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        return Err(Error::NotFound {
            entity: ENTITY,
            name: name.to_string(),
        });
    }
    info!(name, "merchant deleted");
    Ok(())
}

/// Binds a chat to the named merchant, registering the merchant if needed.
pub async fn bind_chat(
    db: &DatabaseConnection,
    name: &str,
    chat_id: &str,
) -> Result<merchant::Model> {
    match get_merchant_by_name(db, name).await? {
        Some(existing) => {
            let mut active: merchant::ActiveModel = existing.into();
            active.chat_id = Set(Some(chat_id.to_string()));
            active.update(db).await.map_err(Into::into)
        }
        None => create_merchant(db, name, name, Some(chat_id.to_string()), None).await,
    }
}

/// Sets or clears the merchant's handler.
pub async fn set_handler(
    db: &DatabaseConnection,
    name: &str,
    handler_id: Option<String>,
) -> Result<merchant::Model> {
    let existing = get_merchant_by_name(db, name)
        .await?
        .ok_or_else(|| Error::NotFound {
            entity: ENTITY,
            name: name.to_string(),
        })?;

    let mut active: merchant::ActiveModel = existing.into();
    active.handler_id = Set(handler_id);
    active.update(db).await.map_err(Into::into)
}

/// Claims an unclaimed merchant for `user_id`, or releases one the user holds.
///
/// Admins may release a merchant held by someone else. Returns the updated merchant and
/// whether it is now claimed.
pub async fn toggle_claim(
    db: &DatabaseConnection,
    name: &str,
    user_id: &str,
    is_admin: bool,
) -> Result<(merchant::Model, bool)> {
    let existing = get_merchant_by_name(db, name)
        .await?
        .ok_or_else(|| Error::NotFound {
            entity: ENTITY,
            name: name.to_string(),
        })?;

    let next = match existing.handler_id.as_deref() {
        None => Some(user_id.to_string()),
        Some(holder) if holder == user_id || is_admin => None,
        Some(_) => {
            return Err(Error::Unauthorized {
                user_id: user_id.to_string(),
                action: format!("release merchant {name} held by another handler"),
            });
        }
    };

    let claimed = next.is_some();
    let merchant = set_handler(db, name, next).await?;
    Ok((merchant, claimed))
}
