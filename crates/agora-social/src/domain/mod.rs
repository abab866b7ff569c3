//! Domain model for the social context.

pub mod aggregates;
pub mod commands;
pub mod entities;
pub mod events;
pub mod records;
pub mod store;
