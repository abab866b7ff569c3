//! Application layer: handlers, queries, the unit of work and bus wiring.

pub mod bootstrap;
pub mod command_handlers;
pub mod event_handlers;
pub mod query_handlers;
pub mod unit_of_work;
