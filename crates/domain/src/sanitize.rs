//! Allow-list cleaning of user-entered rich text before it leaves the client.

use std::collections::{HashMap, HashSet};

use ammonia::Builder;
use once_cell::sync::Lazy;

pub const ALLOWED_TAGS: [&str; 4] = ["a", "code", "i", "strong"];
pub const ALLOWED_LINK_ATTRIBUTES: [&str; 2] = ["href", "title"];

static INLINE_MARKUP: Lazy<Builder<'static>> = Lazy::new(|| {
    let mut builder = Builder::default();
    builder
        .tags(ALLOWED_TAGS.into_iter().collect())
        .tag_attributes(HashMap::from([(
            "a",
            ALLOWED_LINK_ATTRIBUTES.into_iter().collect::<HashSet<_>>(),
        )]))
        .generic_attributes(HashSet::new())
        .link_rel(None);
    builder
});

/// Keeps `<a href title>`, `<code>`, `<i>` and `<strong>`; everything else is
/// stripped, with the inner text preserved except for script/style bodies.
pub fn sanitize_markup(text: &str) -> String {
    INLINE_MARKUP.clean(text).to_string()
}
