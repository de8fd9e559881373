use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::de;

/// Opaque comment identity. The server emits integers; it is kept as text so
/// any identifier scheme round-trips unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct CommentId(String);

impl CommentId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CommentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl<'de> Deserialize<'de> for CommentId {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(i64),
            Text(String),
        }

        Ok(match Raw::deserialize(d)? {
            Raw::Int(n) => CommentId(n.to_string()),
            Raw::Text(s) => CommentId(s),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireComment")]
pub struct Comment {
    pub id: CommentId,
    pub parent_comment_id: Option<CommentId>,
    /// Explicit root marker sent by the live channel. Falls back to the
    /// absence of a parent when missing, see [`Comment::is_root`].
    #[serde(rename = "is_root", skip_serializing_if = "Option::is_none")]
    pub root_flag: Option<bool>,
    pub user_name: String,
    pub email: String,
    pub home_page: String,
    pub text: String,
    pub image: Option<String>,
    pub text_file: Option<String>,
    pub created_at: Option<NaiveDateTime>,
    /// Newest-first for live inserts. Empty means "no replies".
    pub children: Vec<Comment>,
}

/// Comment as it arrives. The list view names the parent `parent_comment_id`,
/// the model serializer `parent_comment`; payloads may carry either or both.
#[derive(Deserialize)]
struct WireComment {
    id: CommentId,
    #[serde(default)]
    parent_comment_id: Option<CommentId>,
    #[serde(default)]
    parent_comment: Option<CommentId>,
    #[serde(default)]
    is_root: Option<bool>,
    #[serde(default, deserialize_with = "de::null_as_default")]
    user_name: String,
    #[serde(default, deserialize_with = "de::null_as_default")]
    email: String,
    #[serde(default, deserialize_with = "de::null_as_default")]
    home_page: String,
    #[serde(default, deserialize_with = "de::null_as_default")]
    text: String,
    #[serde(default, deserialize_with = "de::empty_as_none")]
    image: Option<String>,
    #[serde(default, deserialize_with = "de::empty_as_none")]
    text_file: Option<String>,
    #[serde(default, deserialize_with = "de::flexible_datetime")]
    created_at: Option<NaiveDateTime>,
    #[serde(default, deserialize_with = "de::null_as_default")]
    children: Vec<Comment>,
}

impl From<WireComment> for Comment {
    fn from(w: WireComment) -> Self {
        Self {
            id: w.id,
            parent_comment_id: w.parent_comment_id.or(w.parent_comment),
            root_flag: w.is_root,
            user_name: w.user_name,
            email: w.email,
            home_page: w.home_page,
            text: w.text,
            image: w.image,
            text_file: w.text_file,
            created_at: w.created_at,
            children: w.children,
        }
    }
}

impl Comment {
    pub fn root(id: impl Into<CommentId>) -> Self {
        Self::with_parent(id.into(), None)
    }

    pub fn reply(id: impl Into<CommentId>, parent: impl Into<CommentId>) -> Self {
        Self::with_parent(id.into(), Some(parent.into()))
    }

    fn with_parent(id: CommentId, parent: Option<CommentId>) -> Self {
        Self {
            id,
            root_flag: Some(parent.is_none()),
            parent_comment_id: parent,
            user_name: String::new(),
            email: String::new(),
            home_page: String::new(),
            text: String::new(),
            image: None,
            text_file: None,
            created_at: None,
            children: Vec::new(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.root_flag
            .unwrap_or_else(|| self.parent_comment_id.is_none())
    }

    pub fn has_replies(&self) -> bool {
        !self.children.is_empty()
    }
}

/// One page of root comments, each carrying its full reply subtree.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CommentPage {
    #[serde(default, deserialize_with = "de::null_as_default")]
    pub comments: Vec<Comment>,
    #[serde(default = "de::one", deserialize_with = "de::lenient_u32")]
    pub page: u32,
    #[serde(default = "de::one", deserialize_with = "de::lenient_u32")]
    pub total_pages: u32,
}

/// Single-use challenge pair. `value` is what the user is shown, `key`
/// correlates the answer on the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptchaChallenge {
    pub key: String,
    #[serde(alias = "image_url")]
    pub value: String,
}
