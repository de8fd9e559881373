use domain::{
    tree, AttachmentNormalizer, Comment, CommentId, Cursor, Draft, PageQuery,
};
use tracing::warn;

/// Recoverable problems the view-model noticed. The most recent one is kept
/// for inspection; each is also logged when recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    LoadFailed(String),
    StaleResponse { seq: u64, latest: u64 },
    MalformedLive(String),
    OrphanReply {
        id: CommentId,
        parent: Option<CommentId>,
    },
    DuplicateLive(CommentId),
    CaptchaFailed(String),
}

/// The single owner of everything the widget shows: the comment forest,
/// pagination/sort cursor, the form draft and the user-facing error line.
#[derive(Debug, Clone)]
pub struct ViewModel {
    pub(crate) forest: Vec<Comment>,
    pub(crate) cursor: Cursor,
    /// Query of the most recently issued load, used to derive the next one.
    pub(crate) requested: PageQuery,
    pub(crate) latest_load: u64,
    pub(crate) draft: Draft,
    pub(crate) form_open: bool,
    pub(crate) error_message: Option<String>,
    pub(crate) live_connected: bool,
    pub(crate) last_diagnostic: Option<Diagnostic>,
    pub(crate) normalizer: AttachmentNormalizer,
}

impl ViewModel {
    pub fn new(normalizer: AttachmentNormalizer) -> Self {
        Self {
            forest: Vec::new(),
            cursor: Cursor::default(),
            requested: PageQuery::default(),
            latest_load: 0,
            draft: Draft::default(),
            form_open: false,
            error_message: None,
            live_connected: false,
            last_diagnostic: None,
            normalizer,
        }
    }

    pub fn forest(&self) -> &[Comment] {
        &self.forest
    }

    pub fn find(&self, id: &CommentId) -> Option<&Comment> {
        tree::find(&self.forest, id)
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut Draft {
        &mut self.draft
    }

    pub fn form_open(&self) -> bool {
        self.form_open
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn show_error(&mut self, message: impl Into<String>) {
        self.error_message = Some(message.into());
    }

    pub fn live_connected(&self) -> bool {
        self.live_connected
    }

    pub fn set_live_connected(&mut self, connected: bool) {
        self.live_connected = connected;
    }

    pub fn last_diagnostic(&self) -> Option<&Diagnostic> {
        self.last_diagnostic.as_ref()
    }

    pub(crate) fn record(&mut self, diagnostic: Diagnostic) {
        warn!("{:?}", diagnostic);
        self.last_diagnostic = Some(diagnostic);
    }
}
