use std::ops::Range;
use std::path::Path;
use std::str::FromStr;

use thiserror::Error;

use crate::{attachment::AttachmentKind, sanitize, CaptchaChallenge, CommentId};

pub const MAX_TEXT_FILE_BYTES: usize = 100 * 1024;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DraftError {
    #[error("unsupported image format '{0}' (allowed: JPG, PNG, GIF)")]
    UnsupportedImage(String),
    #[error("'{0}' is not a .txt file")]
    NotATextFile(String),
    #[error("text file is {size} bytes, the limit is {} bytes", MAX_TEXT_FILE_BYTES)]
    TextFileTooLarge { size: usize },
    #[error("comment text is empty")]
    EmptyText,
    #[error("no captcha challenge has been issued")]
    MissingCaptcha,
    #[error("the comment form is closed")]
    FormClosed,
    #[error("selection {start}..{end} is outside the text")]
    SelectionOutOfRange { start: usize, end: usize },
}

/// A file picked for upload, already checked against the accepted formats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub kind: AttachmentKind,
    pub file_name: String,
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

impl Attachment {
    pub fn image(file_name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, DraftError> {
        let file_name = file_name.into();
        let mime = match extension(&file_name).as_deref() {
            Some("jpg") | Some("jpeg") => "image/jpeg",
            Some("png") => "image/png",
            Some("gif") => "image/gif",
            _ => return Err(DraftError::UnsupportedImage(file_name)),
        };
        Ok(Self {
            kind: AttachmentKind::Image,
            file_name,
            mime,
            bytes,
        })
    }

    pub fn text_file(file_name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, DraftError> {
        let file_name = file_name.into();
        if extension(&file_name).as_deref() != Some("txt") {
            return Err(DraftError::NotATextFile(file_name));
        }
        if bytes.len() > MAX_TEXT_FILE_BYTES {
            return Err(DraftError::TextFileTooLarge { size: bytes.len() });
        }
        Ok(Self {
            kind: AttachmentKind::TextFile,
            file_name,
            mime: "text/plain",
            bytes,
        })
    }
}

fn extension(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftField {
    UserName,
    Email,
    HomePage,
    Text,
}

impl FromStr for DraftField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" | "user_name" => Ok(DraftField::UserName),
            "email" => Ok(DraftField::Email),
            "home" | "home_page" => Ok(DraftField::HomePage),
            "text" => Ok(DraftField::Text),
            other => Err(format!("unknown field '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InlineTag {
    Italic,
    Strong,
    Code,
}

impl InlineTag {
    pub fn name(&self) -> &'static str {
        match self {
            InlineTag::Italic => "i",
            InlineTag::Strong => "strong",
            InlineTag::Code => "code",
        }
    }
}

impl FromStr for InlineTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "i" => Ok(InlineTag::Italic),
            "strong" => Ok(InlineTag::Strong),
            "code" => Ok(InlineTag::Code),
            other => Err(format!("unsupported tag '{}'", other)),
        }
    }
}

/// The in-progress comment form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    pub user_name: String,
    pub email: String,
    pub home_page: String,
    pub text: String,
    /// Last issued challenge; consumed by the next submission attempt.
    pub captcha: Option<CaptchaChallenge>,
    pub captcha_answer: String,
    pub parent_comment: Option<CommentId>,
    pub image: Option<Attachment>,
    pub text_file: Option<Attachment>,
}

impl Draft {
    pub fn set(&mut self, field: DraftField, value: impl Into<String>) {
        let value = value.into();
        match field {
            DraftField::UserName => self.user_name = value,
            DraftField::Email => self.email = value,
            DraftField::HomePage => self.home_page = value,
            DraftField::Text => self.text = value,
        }
    }

    pub fn attach(&mut self, attachment: Attachment) {
        match attachment.kind {
            AttachmentKind::Image => self.image = Some(attachment),
            AttachmentKind::TextFile => self.text_file = Some(attachment),
        }
    }

    pub fn detach(&mut self, kind: AttachmentKind) {
        match kind {
            AttachmentKind::Image => self.image = None,
            AttachmentKind::TextFile => self.text_file = None,
        }
    }

    /// Wraps the characters in `range` (char offsets) with `tag`.
    pub fn wrap_selection(&mut self, tag: InlineTag, range: Range<usize>) -> Result<(), DraftError> {
        let len = self.text.chars().count();
        if range.start > range.end || range.end > len {
            return Err(DraftError::SelectionOutOfRange {
                start: range.start,
                end: range.end,
            });
        }

        let byte_at = |char_idx: usize| {
            self.text
                .char_indices()
                .nth(char_idx)
                .map(|(b, _)| b)
                .unwrap_or(self.text.len())
        };
        let (start, end) = (byte_at(range.start), byte_at(range.end));

        self.text = format!(
            "{}<{tag}>{}</{tag}>{}",
            &self.text[..start],
            &self.text[start..end],
            &self.text[end..],
            tag = tag.name()
        );
        Ok(())
    }

    /// Clears what was typed for the comment itself; identity fields stay
    /// filled for the next comment.
    pub fn clear_free_text(&mut self) {
        self.text.clear();
        self.captcha_answer.clear();
        self.parent_comment = None;
        self.image = None;
        self.text_file = None;
    }

    /// Builds the outgoing payload against the given challenge. Text is run
    /// through the markup allow-list here, right before it is sent.
    pub fn to_submission(&self, captcha: CaptchaChallenge) -> Result<Submission, DraftError> {
        if self.text.trim().is_empty() {
            return Err(DraftError::EmptyText);
        }
        Ok(Submission {
            user_name: self.user_name.trim().to_string(),
            email: self.email.trim().to_string(),
            home_page: self.home_page.trim().to_string(),
            text: sanitize::sanitize_markup(&self.text),
            captcha_key: captcha.key,
            captcha_value: self.captcha_answer.trim().to_string(),
            parent_comment: self.parent_comment.clone(),
            image: self.image.clone(),
            text_file: self.text_file.clone(),
        })
    }
}

/// Everything the create endpoint receives, ready for multipart encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub user_name: String,
    pub email: String,
    pub home_page: String,
    pub text: String,
    pub captcha_key: String,
    pub captcha_value: String,
    pub parent_comment: Option<CommentId>,
    pub image: Option<Attachment>,
    pub text_file: Option<Attachment>,
}

impl Submission {
    pub fn text_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("user_name", self.user_name.clone()),
            ("email", self.email.clone()),
            ("home_page", self.home_page.clone()),
            ("text", self.text.clone()),
            ("captcha_value", self.captcha_value.clone()),
            ("captcha_key", self.captcha_key.clone()),
        ];
        if let Some(parent) = &self.parent_comment {
            fields.push(("parent_comment", parent.to_string()));
        }
        fields
    }
}
