//! Entity module - Contains all SeaORM entity definitions for the deal store.
//! These entities represent the database tables. Each entity has a Model struct for
//! data and an Entity struct for operations.

pub mod appeal;
pub mod cascade;
pub mod deal;
pub mod merchant;
pub mod message_link;
pub mod proof_message;
pub mod shift;
pub mod sla_notification;
pub mod staff;
pub mod stat;
pub mod stat_merchant;

// Re-export specific types to avoid conflicts
pub use appeal::{Entity as Appeal, Model as AppealModel};
pub use cascade::{Column as CascadeColumn, Entity as Cascade, Model as CascadeModel};
pub use deal::{Column as DealColumn, DealStatus, Entity as Deal, Model as DealModel};
pub use merchant::{Column as MerchantColumn, Entity as Merchant, Model as MerchantModel};
pub use message_link::{Entity as MessageLink, Model as MessageLinkModel};
pub use proof_message::{Entity as ProofMessage, Model as ProofMessageModel};
pub use shift::{Entity as Shift, Model as ShiftModel};
pub use sla_notification::{Entity as SlaNotification, Model as SlaNotificationModel};
pub use staff::{Entity as Staff, Model as StaffModel};
pub use stat::{Entity as Stat, Model as StatModel, StatKind};
pub use stat_merchant::{Entity as StatMerchant, Model as StatMerchantModel};
