//! Agora social bounded context.
//!
//! Responsible for posts, threaded comments up to three reply levels deep,
//! likes on both, and image attachments. Commands enter through the message
//! bus assembled in [`application::bootstrap`]; reads go through
//! [`application::query_handlers`].

pub mod application;
pub mod domain;
pub mod infrastructure;
