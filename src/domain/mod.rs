//! Domain layer: entities, identifiers, the availability state machine and the
//! storage port the workflows talk to.

pub mod availability;
pub mod book;
pub mod ids;
pub mod money;
pub mod ports;
pub mod purchase;
pub mod query;
pub mod record;
pub mod rental;
pub mod review;
