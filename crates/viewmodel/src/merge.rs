use domain::{protocol, tree, Comment, CommentId, LiveEvent};
use tracing::{debug, info};

use crate::{Diagnostic, ViewModel};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    InsertedRoot(CommentId),
    InsertedReply { id: CommentId, parent: CommentId },
    Orphaned(CommentId),
    Duplicate(CommentId),
    Ignored(String),
    Malformed,
}

impl ViewModel {
    /// Handles one raw frame from the live channel. Never fails: anything
    /// that cannot be placed is dropped and recorded.
    pub fn on_live_message(&mut self, raw: &str) -> MergeOutcome {
        match protocol::parse_live_message(raw) {
            Ok(LiveEvent::NewComment(comment)) => self.merge_new_comment(comment),
            Ok(LiveEvent::Other(kind)) => {
                debug!("Ignoring live message of type '{}'", kind);
                MergeOutcome::Ignored(kind)
            }
            Err(e) => {
                self.record(Diagnostic::MalformedLive(e.to_string()));
                MergeOutcome::Malformed
            }
        }
    }

    /// Inserts a freshly created comment, newest first, against whatever
    /// forest is current. Existing nodes are never modified other than
    /// gaining a reply.
    pub fn merge_new_comment(&mut self, mut comment: Comment) -> MergeOutcome {
        let id = comment.id.clone();
        if tree::contains(&self.forest, &id) {
            self.record(Diagnostic::DuplicateLive(id.clone()));
            return MergeOutcome::Duplicate(id);
        }

        self.normalizer.normalize_comment(&mut comment);

        if comment.is_root() {
            self.forest.insert(0, comment);
            info!("Live comment {} added at top level", id);
            return MergeOutcome::InsertedRoot(id);
        }

        let Some(parent_id) = comment.parent_comment_id.clone() else {
            self.record(Diagnostic::OrphanReply { id: id.clone(), parent: None });
            return MergeOutcome::Orphaned(id);
        };
        match tree::find_mut(&mut self.forest, &parent_id) {
            Some(parent) => {
                parent.children.insert(0, comment);
                info!("Live reply {} added under {}", id, parent_id);
                MergeOutcome::InsertedReply {
                    id,
                    parent: parent_id,
                }
            }
            None => {
                self.record(Diagnostic::OrphanReply {
                    id: id.clone(),
                    parent: Some(parent_id),
                });
                MergeOutcome::Orphaned(id)
            }
        }
    }
}
