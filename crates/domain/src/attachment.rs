//! Canonicalisation of attachment references.
//!
//! Storage fields can come back either as full delivery URLs or as bare
//! public ids that still carry the provider's `<resource>/upload/` segment.
//! Both are mapped to a single absolute URL under the configured base.

use crate::{tree, Comment};

pub const IMAGE_UPLOAD_PREFIX: &str = "image/upload/";
pub const RAW_UPLOAD_PREFIX: &str = "raw/upload/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    Image,
    TextFile,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct StorageRoute {
    redundant_prefix: &'static str,
    base_url: String,
}

impl StorageRoute {
    fn new(redundant_prefix: &'static str, base_url: &str) -> Self {
        let mut base_url = base_url.trim().to_string();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Self {
            redundant_prefix,
            base_url,
        }
    }

    fn normalize(&self, url: Option<&str>) -> String {
        let url = match url.map(str::trim) {
            Some(u) if !u.is_empty() => u,
            _ => return String::new(),
        };

        if url.starts_with(&self.base_url) {
            return url.to_string();
        }

        // "//host/..." is protocol-relative, not a rooted path
        let path = if url.starts_with("//") {
            url
        } else {
            url.trim_start_matches('/')
        };
        let rest = path.strip_prefix(self.redundant_prefix).unwrap_or(path);
        if is_absolute(rest) {
            return rest.to_string();
        }

        format!("{}{}", self.base_url, rest.trim_start_matches('/'))
    }
}

fn is_absolute(url: &str) -> bool {
    url.starts_with("https://") || url.starts_with("http://") || url.starts_with("//")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentNormalizer {
    image: StorageRoute,
    text_file: StorageRoute,
}

impl AttachmentNormalizer {
    pub fn new(image_base_url: &str, file_base_url: &str) -> Self {
        Self {
            image: StorageRoute::new(IMAGE_UPLOAD_PREFIX, image_base_url),
            text_file: StorageRoute::new(RAW_UPLOAD_PREFIX, file_base_url),
        }
    }

    pub fn cloudinary(cloud_name: &str) -> Self {
        Self::new(
            &format!("https://res.cloudinary.com/{}/{}", cloud_name, IMAGE_UPLOAD_PREFIX),
            &format!("https://res.cloudinary.com/{}/{}", cloud_name, RAW_UPLOAD_PREFIX),
        )
    }

    /// Returns the canonical absolute URL, or an empty string for a missing reference.
    pub fn normalize(&self, kind: AttachmentKind, url: Option<&str>) -> String {
        match kind {
            AttachmentKind::Image => self.image.normalize(url),
            AttachmentKind::TextFile => self.text_file.normalize(url),
        }
    }

    pub fn normalize_comment(&self, c: &mut Comment) {
        c.image = non_empty(self.normalize(AttachmentKind::Image, c.image.as_deref()));
        c.text_file = non_empty(self.normalize(AttachmentKind::TextFile, c.text_file.as_deref()));
    }

    pub fn normalize_forest(&self, forest: &mut [Comment]) {
        tree::walk_mut(forest, |c| self.normalize_comment(c));
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}
