//! Handler registry for the social context.
//!
//! The registry is assembled once at startup. Every command kind maps to
//! exactly one handler and every event kind to an ordered list, both through
//! exhaustive matches, and the bus validates declared dependencies before it
//! is handed out.

use std::sync::Arc;

use agora_core::blob_storage::BlobStorage;
use agora_core::bus::{Dependencies, Dependency, Handler, HandlerFuture, Injected, MessageBus};
use agora_core::clock::Clock;
use agora_core::error::DomainError;
use agora_core::message::MessageKind;
use agora_core::publisher::EventPublisher;
use tracing::info;

use crate::application::unit_of_work::SocialUnitOfWork;
use crate::application::{command_handlers, event_handlers};
use crate::domain::commands::{CommandKind, SocialCommand};
use crate::domain::events::{EventKind, SocialEvent};
use crate::domain::store::SocialStore;

/// The message bus of the social context.
pub type SocialBus = MessageBus<SocialCommand, SocialEvent, SocialUnitOfWork>;

type CommandHandler = Handler<SocialCommand, SocialUnitOfWork>;
type EventHandler = Handler<SocialEvent, SocialUnitOfWork>;

const UOW_AND_CLOCK: &[Dependency] = &[Dependency::UnitOfWork, Dependency::Clock];

fn misrouted(expected: CommandKind) -> DomainError {
    DomainError::Configuration(format!("handler for {} received another command", expected.name()))
}

macro_rules! command_adapter {
    ($adapter:ident, $variant:ident, $handler:path) => {
        fn $adapter(command: SocialCommand, deps: Injected<SocialUnitOfWork>) -> HandlerFuture {
            Box::pin(async move {
                let SocialCommand::$variant(command) = command else {
                    return Err(misrouted(CommandKind::$variant));
                };
                $handler(&command, deps.unit_of_work()?, deps.clock()?).await
            })
        }
    };
}

command_adapter!(create_post, CreatePost, command_handlers::handle_create_post);
command_adapter!(edit_post, EditPost, command_handlers::handle_edit_post);
command_adapter!(delete_post, DeletePost, command_handlers::handle_delete_post);
command_adapter!(like_unlike_post, LikeUnlikePost, command_handlers::handle_like_unlike_post);
command_adapter!(comment_post, CommentPost, command_handlers::handle_comment_post);
command_adapter!(reply_comment, ReplyComment, command_handlers::handle_reply_comment);
command_adapter!(like_unlike_comment, LikeUnlikeComment, command_handlers::handle_like_unlike_comment);
command_adapter!(delete_comment, DeleteComment, command_handlers::handle_delete_comment);

fn command_handler(kind: CommandKind) -> CommandHandler {
    match kind {
        CommandKind::CreatePost => Handler::new("handle_create_post", UOW_AND_CLOCK, create_post),
        CommandKind::EditPost => Handler::new("handle_edit_post", UOW_AND_CLOCK, edit_post),
        CommandKind::DeletePost => Handler::new("handle_delete_post", UOW_AND_CLOCK, delete_post),
        CommandKind::LikeUnlikePost => {
            Handler::new("handle_like_unlike_post", UOW_AND_CLOCK, like_unlike_post)
        }
        CommandKind::CommentPost => {
            Handler::new("handle_comment_post", UOW_AND_CLOCK, comment_post)
        }
        CommandKind::ReplyComment => {
            Handler::new("handle_reply_comment", UOW_AND_CLOCK, reply_comment)
        }
        CommandKind::LikeUnlikeComment => {
            Handler::new("handle_like_unlike_comment", UOW_AND_CLOCK, like_unlike_comment)
        }
        CommandKind::DeleteComment => {
            Handler::new("handle_delete_comment", UOW_AND_CLOCK, delete_comment)
        }
    }
}

fn upload_post_images(event: SocialEvent, deps: Injected<SocialUnitOfWork>) -> HandlerFuture {
    Box::pin(async move {
        event_handlers::upload_post_images(
            &event,
            deps.unit_of_work()?,
            deps.blob_storage()?,
            deps.clock()?,
        )
        .await
    })
}

fn audit_permission_denied(event: SocialEvent, _deps: Injected<SocialUnitOfWork>) -> HandlerFuture {
    Box::pin(async move { event_handlers::audit_permission_denied(&event).await })
}

fn publish_event(event: SocialEvent, deps: Injected<SocialUnitOfWork>) -> HandlerFuture {
    Box::pin(async move { event_handlers::publish_event(&event, deps.publisher()?).await })
}

const UPLOAD: EventHandler = Handler::new(
    "upload_post_images",
    &[Dependency::UnitOfWork, Dependency::BlobStorage, Dependency::Clock],
    upload_post_images,
);
const AUDIT: EventHandler = Handler::new("audit_permission_denied", &[], audit_permission_denied);
const PUBLISH: EventHandler = Handler::new("publish_event", &[Dependency::Publisher], publish_event);

const ON_POST_CREATED: &[EventHandler] = &[UPLOAD, PUBLISH];
const ON_DENIAL: &[EventHandler] = &[AUDIT, PUBLISH];
const ON_OTHER: &[EventHandler] = &[PUBLISH];

fn event_handlers(kind: EventKind) -> &'static [EventHandler] {
    match kind {
        EventKind::PostCreated => ON_POST_CREATED,
        EventKind::PostActionDenied | EventKind::CommentActionDenied => ON_DENIAL,
        EventKind::PostEdited
        | EventKind::PostDeleted
        | EventKind::PostLiked
        | EventKind::PostUnliked
        | EventKind::PostImageAttached
        | EventKind::CommentCreated
        | EventKind::CommentReplied
        | EventKind::CommentLiked
        | EventKind::CommentUnliked
        | EventKind::CommentDeleted => ON_OTHER,
    }
}

/// Collaborators the social bus is wired with.
#[derive(Clone)]
pub struct SocialServices {
    pub store: Arc<dyn SocialStore>,
    pub publisher: Arc<dyn EventPublisher>,
    pub blob_storage: Arc<dyn BlobStorage>,
    pub clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for SocialServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SocialServices").finish_non_exhaustive()
    }
}

/// Builds the social bus: one fresh [`SocialUnitOfWork`] per call over
/// `services.store`, and every command and event handler registered.
///
/// # Errors
///
/// Returns `DomainError::Configuration` if the registry is incomplete or a
/// handler requires a dependency that was not provided.
pub fn bootstrap(services: SocialServices) -> Result<SocialBus, DomainError> {
    let store = services.store;
    let dependencies = Dependencies::new(move || SocialUnitOfWork::new(Arc::clone(&store)))
        .with_publisher(services.publisher)
        .with_blob_storage(services.blob_storage)
        .with_clock(services.clock);

    let mut builder = SocialBus::builder(dependencies);
    for &kind in CommandKind::all() {
        builder = builder.command(kind, command_handler(kind));
    }
    for &kind in EventKind::all() {
        for handler in event_handlers(kind) {
            builder = builder.event(kind, *handler);
        }
    }

    let bus = builder.build()?;
    info!(
        commands = CommandKind::all().len(),
        events = EventKind::all().len(),
        "social message bus ready"
    );
    Ok(bus)
}

#[cfg(test)]
mod tests {
    use agora_core::clock::SystemClock;
    use agora_test_support::{InMemoryBlobStorage, RecordingPublisher};

    use super::*;
    use crate::infrastructure::in_memory::InMemorySocialStore;

    fn services() -> SocialServices {
        SocialServices {
            store: Arc::new(InMemorySocialStore::new()),
            publisher: Arc::new(RecordingPublisher::new()),
            blob_storage: Arc::new(InMemoryBlobStorage::new()),
            clock: Arc::new(SystemClock),
        }
    }

    #[test]
    fn test_bootstrap_registers_every_command() {
        let bus = bootstrap(services());

        assert!(bus.is_ok());
    }

    #[test]
    fn test_every_event_is_published_after_its_other_handlers() {
        for &kind in EventKind::all() {
            let handlers = event_handlers(kind);
            assert_eq!(
                handlers.last().map(Handler::name),
                Some("publish_event"),
                "{kind:?}"
            );
        }
    }

    #[test]
    fn test_denials_are_audited() {
        for kind in [EventKind::PostActionDenied, EventKind::CommentActionDenied] {
            let names: Vec<&str> = event_handlers(kind).iter().map(Handler::name).collect();
            assert_eq!(names, vec!["audit_permission_denied", "publish_event"]);
        }
    }

    #[test]
    fn test_command_handlers_need_only_unit_of_work_and_clock() {
        for &kind in CommandKind::all() {
            assert_eq!(command_handler(kind).requires(), UOW_AND_CLOCK);
        }
    }
}
