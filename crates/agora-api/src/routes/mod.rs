//! HTTP route modules.

pub mod comments;
pub mod health;
pub mod posts;

use agora_social::domain::events::{DeniedAction, SocialEvent, SocialEventKind};

use crate::error::ApiError;

fn action_name(action: DeniedAction) -> &'static str {
    match action {
        DeniedAction::Edit => "edit",
        DeniedAction::Delete => "delete",
    }
}

/// Turns the first denial among `events` into a 403.
pub(crate) fn refuse_denials(events: &[SocialEvent]) -> Result<(), ApiError> {
    let denial = events.iter().find_map(|event| match &event.kind {
        SocialEventKind::PostActionDenied(denied) => Some(format!(
            "user {} may not {} post {}",
            denied.user_id,
            action_name(denied.action),
            denied.post_id
        )),
        SocialEventKind::CommentActionDenied(denied) => Some(format!(
            "user {} may not {} comment {}",
            denied.user_id,
            action_name(denied.action),
            denied.comment_id
        )),
        _ => None,
    });
    match denial {
        Some(message) => Err(ApiError::Forbidden(message)),
        None => Ok(()),
    }
}
