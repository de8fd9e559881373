pub mod attachment;
mod cursor;
mod de;
mod draft;
mod events;
mod models;
pub mod protocol;
pub mod sanitize;
pub mod tree;

pub use attachment::{AttachmentKind, AttachmentNormalizer};
pub use cursor::{Cursor, Order, PageQuery, Sort, SortBy};
pub use draft::{Attachment, Draft, DraftError, DraftField, InlineTag, Submission};
pub use events::LiveEvent;
pub use models::{CaptchaChallenge, Comment, CommentId, CommentPage};
pub use protocol::ProtocolError;
