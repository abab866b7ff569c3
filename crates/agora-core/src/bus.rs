//! Command/event message bus.
//!
//! The bus accepts one message, routes a command to its single handler or an
//! event to each of its subscribers, and then drains the events harvested by
//! the call's unit of work into a FIFO queue, dispatching them in turn until
//! the queue is empty.
//!
//! Command failures abort the whole call. Event handler failures are logged
//! and isolated to the failing handler: sibling handlers and already queued
//! events still run, and any events the failing handler recorded are
//! discarded.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::blob_storage::BlobStorage;
use crate::clock::Clock;
use crate::command::Command;
use crate::error::DomainError;
use crate::event::DomainEvent;
use crate::message::{Message, MessageKind, Routable};
use crate::publisher::EventPublisher;
use crate::unit_of_work::UnitOfWork;

/// Boxed future returned by every handler.
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<(), DomainError>> + Send>>;

/// An ambient dependency a handler may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dependency {
    /// The unit of work created for the current bus call.
    UnitOfWork,
    /// The pub/sub event publisher.
    Publisher,
    /// The blob storage client.
    BlobStorage,
    /// The clock.
    Clock,
}

impl Dependency {
    /// Stable name used in configuration errors.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::UnitOfWork => "unit_of_work",
            Self::Publisher => "publisher",
            Self::BlobStorage => "blob_storage",
            Self::Clock => "clock",
        }
    }
}

fn undeclared(dependency: Dependency) -> DomainError {
    DomainError::Configuration(format!(
        "handler did not declare the {} dependency",
        dependency.name()
    ))
}

/// The subset of dependencies injected into one handler invocation.
pub struct Injected<U> {
    unit_of_work: Option<Arc<U>>,
    publisher: Option<Arc<dyn EventPublisher>>,
    blob_storage: Option<Arc<dyn BlobStorage>>,
    clock: Option<Arc<dyn Clock>>,
}

impl<U> Injected<U> {
    /// The unit of work for the current bus call.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Configuration` if the handler did not declare
    /// `Dependency::UnitOfWork`.
    pub fn unit_of_work(&self) -> Result<&U, DomainError> {
        self.unit_of_work
            .as_deref()
            .ok_or_else(|| undeclared(Dependency::UnitOfWork))
    }

    /// The event publisher.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Configuration` if the handler did not declare
    /// `Dependency::Publisher`.
    pub fn publisher(&self) -> Result<&dyn EventPublisher, DomainError> {
        self.publisher
            .as_deref()
            .ok_or_else(|| undeclared(Dependency::Publisher))
    }

    /// The blob storage client.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Configuration` if the handler did not declare
    /// `Dependency::BlobStorage`.
    pub fn blob_storage(&self) -> Result<&dyn BlobStorage, DomainError> {
        self.blob_storage
            .as_deref()
            .ok_or_else(|| undeclared(Dependency::BlobStorage))
    }

    /// The clock.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Configuration` if the handler did not declare
    /// `Dependency::Clock`.
    pub fn clock(&self) -> Result<&dyn Clock, DomainError> {
        self.clock
            .as_deref()
            .ok_or_else(|| undeclared(Dependency::Clock))
    }
}

/// A registered handler: a plain function plus the dependencies it declares.
pub struct Handler<M, U> {
    name: &'static str,
    requires: &'static [Dependency],
    call: fn(M, Injected<U>) -> HandlerFuture,
}

impl<M, U> Handler<M, U> {
    /// Creates a handler that will receive only the `requires` dependencies.
    #[must_use]
    pub const fn new(
        name: &'static str,
        requires: &'static [Dependency],
        call: fn(M, Injected<U>) -> HandlerFuture,
    ) -> Self {
        Self {
            name,
            requires,
            call,
        }
    }

    /// The handler name used in logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The dependencies this handler declares.
    #[must_use]
    pub fn requires(&self) -> &'static [Dependency] {
        self.requires
    }
}

impl<M, U> Clone for Handler<M, U> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M, U> Copy for Handler<M, U> {}

impl<M, U> fmt::Debug for Handler<M, U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("name", &self.name)
            .field("requires", &self.requires)
            .finish_non_exhaustive()
    }
}

/// The ambient dependencies available to handlers.
///
/// The unit of work is always available: a new one is built for every bus
/// call by the supplied factory.
pub struct Dependencies<U> {
    unit_of_work: Arc<dyn Fn() -> U + Send + Sync>,
    publisher: Option<Arc<dyn EventPublisher>>,
    blob_storage: Option<Arc<dyn BlobStorage>>,
    clock: Option<Arc<dyn Clock>>,
}

impl<U> Dependencies<U> {
    /// Creates a dependency set around a unit-of-work factory.
    pub fn new(unit_of_work: impl Fn() -> U + Send + Sync + 'static) -> Self {
        Self {
            unit_of_work: Arc::new(unit_of_work),
            publisher: None,
            blob_storage: None,
            clock: None,
        }
    }

    /// Provides the event publisher.
    #[must_use]
    pub fn with_publisher(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    /// Provides the blob storage client.
    #[must_use]
    pub fn with_blob_storage(mut self, blob_storage: Arc<dyn BlobStorage>) -> Self {
        self.blob_storage = Some(blob_storage);
        self
    }

    /// Provides the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    fn provides(&self, dependency: Dependency) -> bool {
        match dependency {
            Dependency::UnitOfWork => true,
            Dependency::Publisher => self.publisher.is_some(),
            Dependency::BlobStorage => self.blob_storage.is_some(),
            Dependency::Clock => self.clock.is_some(),
        }
    }

    fn inject(&self, requires: &[Dependency], unit_of_work: &Arc<U>) -> Injected<U> {
        let wants = |dependency| requires.contains(&dependency);
        Injected {
            unit_of_work: wants(Dependency::UnitOfWork).then(|| Arc::clone(unit_of_work)),
            publisher: self
                .publisher
                .clone()
                .filter(|_| wants(Dependency::Publisher)),
            blob_storage: self
                .blob_storage
                .clone()
                .filter(|_| wants(Dependency::BlobStorage)),
            clock: self.clock.clone().filter(|_| wants(Dependency::Clock)),
        }
    }
}

/// Collects handler registrations and validates them into a `MessageBus`.
pub struct MessageBusBuilder<C: Routable, E: Routable, U> {
    dependencies: Dependencies<U>,
    command_handlers: HashMap<C::Kind, Handler<C, U>>,
    event_handlers: HashMap<E::Kind, Vec<Handler<E, U>>>,
    problems: Vec<String>,
}

impl<C: Routable, E: Routable, U> MessageBusBuilder<C, E, U> {
    /// Registers the single handler for a command kind.
    #[must_use]
    pub fn command(mut self, kind: C::Kind, handler: Handler<C, U>) -> Self {
        if self.command_handlers.insert(kind, handler).is_some() {
            self.problems
                .push(format!("command {} has more than one handler", kind.name()));
        }
        self
    }

    /// Appends a handler for an event kind. Handlers run in registration order.
    #[must_use]
    pub fn event(mut self, kind: E::Kind, handler: Handler<E, U>) -> Self {
        self.event_handlers.entry(kind).or_default().push(handler);
        self
    }

    /// Validates the registry and builds the bus.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Configuration` if a command kind has no handler
    /// or more than one, or if any handler declares a dependency that was not
    /// provided.
    pub fn build(self) -> Result<MessageBus<C, E, U>, DomainError> {
        let mut problems = self.problems;

        for kind in <C::Kind as MessageKind>::all() {
            if !self.command_handlers.contains_key(kind) {
                problems.push(format!("command {} has no handler", kind.name()));
            }
        }

        let names_and_requirements = self
            .command_handlers
            .values()
            .map(|h| (h.name, h.requires))
            .chain(
                self.event_handlers
                    .values()
                    .flatten()
                    .map(|h| (h.name, h.requires)),
            );
        for (name, requires) in names_and_requirements {
            for dependency in requires {
                if !self.dependencies.provides(*dependency) {
                    problems.push(format!(
                        "handler {name} requires {} which was not provided",
                        dependency.name()
                    ));
                }
            }
        }

        if !problems.is_empty() {
            return Err(DomainError::Configuration(problems.join("; ")));
        }

        Ok(MessageBus {
            dependencies: self.dependencies,
            command_handlers: self.command_handlers,
            event_handlers: self.event_handlers,
        })
    }
}

/// Routes commands and events to their handlers and propagates the events
/// they produce.
///
/// The registry is immutable once built, so one bus can serve concurrent
/// calls without locking.
pub struct MessageBus<C: Routable, E: Routable, U> {
    dependencies: Dependencies<U>,
    command_handlers: HashMap<C::Kind, Handler<C, U>>,
    event_handlers: HashMap<E::Kind, Vec<Handler<E, U>>>,
}

impl<C, E, U> MessageBus<C, E, U>
where
    C: Command,
    E: DomainEvent,
    U: UnitOfWork<Event = E>,
{
    /// Starts a registry around the given dependencies.
    #[must_use]
    pub fn builder(dependencies: Dependencies<U>) -> MessageBusBuilder<C, E, U> {
        MessageBusBuilder {
            dependencies,
            command_handlers: HashMap::new(),
            event_handlers: HashMap::new(),
            problems: Vec::new(),
        }
    }

    /// Handles one message and every event it transitively produces.
    ///
    /// Returns the events dispatched during the call, in dispatch order.
    ///
    /// # Errors
    ///
    /// Returns the command handler's error if it fails, or
    /// `DomainError::Configuration` if no handler is registered for the
    /// command. Event handler failures are logged, never returned.
    pub async fn handle(&self, message: Message<C, E>) -> Result<Vec<E>, DomainError> {
        let unit_of_work = Arc::new((self.dependencies.unit_of_work)());
        let mut queue = VecDeque::from([message]);
        let mut dispatched = Vec::new();

        while let Some(message) = queue.pop_front() {
            match message {
                Message::Command(command) => {
                    self.handle_command(command, &unit_of_work, &mut queue)
                        .await?;
                }
                Message::Event(event) => {
                    self.handle_event(&event, &unit_of_work, &mut queue).await;
                    dispatched.push(event);
                }
            }
        }

        Ok(dispatched)
    }

    async fn handle_command(
        &self,
        command: C,
        unit_of_work: &Arc<U>,
        queue: &mut VecDeque<Message<C, E>>,
    ) -> Result<(), DomainError> {
        let kind = command.kind();
        let Some(handler) = self.command_handlers.get(&kind) else {
            return Err(DomainError::Configuration(format!(
                "command {} has no handler",
                kind.name()
            )));
        };

        let command_type = command.command_type();
        let correlation_id = command.correlation_id();
        debug!(command = command_type, handler = handler.name, %correlation_id, "handling command");

        let injected = self.dependencies.inject(handler.requires, unit_of_work);
        if let Err(err) = (handler.call)(command, injected).await {
            warn!(command = command_type, handler = handler.name, %correlation_id, error = %err, "command handler failed");
            return Err(err);
        }

        queue.extend(
            unit_of_work
                .collect_new_events()
                .into_iter()
                .map(Message::Event),
        );
        Ok(())
    }

    async fn handle_event(
        &self,
        event: &E,
        unit_of_work: &Arc<U>,
        queue: &mut VecDeque<Message<C, E>>,
    ) {
        let event_type = event.event_type();
        let handlers = self
            .event_handlers
            .get(&event.kind())
            .map(Vec::as_slice)
            .unwrap_or_default();

        if handlers.is_empty() {
            debug!(event = event_type, "no handlers registered for event");
        }

        for handler in handlers {
            debug!(event = event_type, handler = handler.name, "handling event");
            let injected = self.dependencies.inject(handler.requires, unit_of_work);
            match (handler.call)(event.clone(), injected).await {
                Ok(()) => queue.extend(
                    unit_of_work
                        .collect_new_events()
                        .into_iter()
                        .map(Message::Event),
                ),
                Err(err) => {
                    let discarded = unit_of_work.collect_new_events().len();
                    error!(
                        event = event_type,
                        handler = handler.name,
                        error = %err,
                        discarded,
                        "event handler failed"
                    );
                }
            }
        }
    }
}

impl<C: Routable, E: Routable, U> fmt::Debug for MessageBus<C, E, U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageBus")
            .field("command_handlers", &self.command_handlers)
            .field("event_handlers", &self.event_handlers)
            .finish_non_exhaustive()
    }
}
