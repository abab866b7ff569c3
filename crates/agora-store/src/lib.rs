//! Agora infrastructure adapters.
//!
//! `PostgreSQL` backing for the social store, filesystem blob storage, and
//! the Redis and log-only event publishers.

pub mod blob_storage;
pub mod pg_store;
pub mod publisher;
pub mod schema;
