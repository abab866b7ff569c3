//! Message routing primitives shared by commands and events.

use std::fmt::Debug;
use std::hash::Hash;

/// A fieldless tag identifying one command or event variant.
///
/// `all()` must list every variant so that registries can be checked for
/// completeness when the bus is built.
pub trait MessageKind: Copy + Eq + Hash + Debug + Send + Sync + 'static {
    /// Every kind of this message family.
    fn all() -> &'static [Self];

    /// Stable name used in logs.
    fn name(self) -> &'static str;
}

/// A message that can be routed by its kind tag.
pub trait Routable {
    /// The kind tag type for this message family.
    type Kind: MessageKind;

    /// Returns the kind tag of this message.
    fn kind(&self) -> Self::Kind;
}

/// Anything the bus accepts: a command or an event.
#[derive(Debug, Clone)]
pub enum Message<C, E> {
    /// A request to change state, handled by exactly one handler.
    Command(C),
    /// A fact, handled by zero or more handlers.
    Event(E),
}
