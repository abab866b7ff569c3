//! Command abstractions.

use uuid::Uuid;

use crate::message::Routable;

/// Trait that all commands implement.
///
/// A command names one intended state change and is routed to exactly one
/// handler.
pub trait Command: Routable + Send + Sync + std::fmt::Debug {
    /// The type name for this command (for logging/routing).
    fn command_type(&self) -> &'static str;

    /// Correlation ID to trace this command through the system.
    fn correlation_id(&self) -> Uuid;
}
