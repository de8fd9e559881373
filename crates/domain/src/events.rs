use crate::models::Comment;

/// A decoded message from the live-push channel.
#[derive(Debug, Clone, PartialEq)]
pub enum LiveEvent {
    NewComment(Comment),
    /// Any `type` this client does not act on.
    Other(String),
}
