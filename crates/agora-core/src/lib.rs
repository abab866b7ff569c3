//! Agora Core: shared domain abstractions.
//!
//! This crate defines the fundamental traits and types that the social
//! context and the infrastructure adapters depend on: aggregate outboxes,
//! messages, the seen-set used by units of work, persistence and I/O ports,
//! and the command/event message bus. It contains no infrastructure code.

pub mod aggregate;
pub mod blob_storage;
pub mod bus;
pub mod clock;
pub mod command;
pub mod error;
pub mod event;
pub mod identity_map;
pub mod message;
pub mod publisher;
pub mod repository;
pub mod unit_of_work;

#[cfg(test)]
pub(crate) mod testing;
