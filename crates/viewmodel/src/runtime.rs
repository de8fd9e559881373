use std::ops::Range;
use std::sync::Arc;

use adapter::{ApiError, CommentApi, FeedSignal};
use domain::{
    Attachment, AttachmentKind, CaptchaChallenge, CommentId, CommentPage, DraftField, InlineTag,
    SortBy, Submission,
};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{PageRequest, SubmitOutcome, ViewModel};

/// User intents coming from the front-end.
#[derive(Debug)]
pub enum Command {
    LoadPage(u32),
    NextPage,
    PrevPage,
    Sort(SortBy),
    Refresh,
    OpenForm,
    CloseForm,
    Edit(DraftField, String),
    CaptchaAnswer(String),
    ReplyTo(Option<CommentId>),
    Attach(Attachment),
    Detach(AttachmentKind),
    Wrap(InlineTag, Range<usize>),
    Submit,
}

/// Network results posted back to the controller task.
enum Completion {
    Page(PageRequest, Result<CommentPage, ApiError>),
    Captcha(Result<CaptchaChallenge, ApiError>),
    Submitted(Result<(), ApiError>),
}

/// Owns the [`ViewModel`] on a single task. Requests run as spawned tasks
/// and report back through a channel, so every state change is applied here,
/// one event at a time, in arrival order.
pub struct Controller {
    api: Arc<dyn CommentApi>,
    model: ViewModel,
    done_tx: mpsc::Sender<Completion>,
    done_rx: mpsc::Receiver<Completion>,
    state_tx: watch::Sender<ViewModel>,
    feed_dropped: bool,
}

impl Controller {
    pub fn new(api: Arc<dyn CommentApi>, model: ViewModel) -> (Self, watch::Receiver<ViewModel>) {
        let (done_tx, done_rx) = mpsc::channel(64);
        let (state_tx, state_rx) = watch::channel(model.clone());
        let controller = Self {
            api,
            model,
            done_tx,
            done_rx,
            state_tx,
            feed_dropped: false,
        };
        (controller, state_rx)
    }

    pub async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut feed: mpsc::Receiver<FeedSignal>,
        cancel: CancellationToken,
    ) -> anyhow::Result<()> {
        let initial = self.model.request_page(1);
        self.spawn_load(initial);

        let mut feed_open = true;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                cmd = commands.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd),
                    None => {
                        info!("Command channel closed, stopping controller");
                        break;
                    }
                },
                signal = feed.recv(), if feed_open => match signal {
                    Some(signal) => self.handle_feed(signal),
                    None => {
                        info!("Live feed ended");
                        feed_open = false;
                        self.model.set_live_connected(false);
                    }
                },
                Some(done) = self.done_rx.recv() => self.handle_completion(done),
            }
            self.state_tx.send_replace(self.model.clone());
        }
        Ok(())
    }

    fn handle_command(&mut self, cmd: Command) {
        debug!("Command: {:?}", cmd);
        match cmd {
            Command::LoadPage(page) => {
                let req = self.model.request_page(page);
                self.spawn_load(req);
            }
            Command::NextPage => match self.model.request_next_page() {
                Some(req) => self.spawn_load(req),
                None => info!("Already on the last page"),
            },
            Command::PrevPage => match self.model.request_prev_page() {
                Some(req) => self.spawn_load(req),
                None => info!("Already on the first page"),
            },
            Command::Sort(by) => {
                let req = self.model.request_sort(by);
                self.spawn_load(req);
            }
            Command::Refresh => {
                let req = self.model.request_refresh();
                self.spawn_load(req);
            }
            Command::OpenForm => {
                if self.model.open_form() {
                    self.spawn_captcha();
                }
            }
            Command::CloseForm => self.model.close_form(),
            Command::Edit(field, value) => self.model.draft_mut().set(field, value),
            Command::CaptchaAnswer(answer) => self.model.draft_mut().captcha_answer = answer,
            Command::ReplyTo(parent) => self.model.reply_to(parent),
            Command::Attach(attachment) => self.model.draft_mut().attach(attachment),
            Command::Detach(kind) => self.model.draft_mut().detach(kind),
            Command::Wrap(tag, range) => {
                if let Err(e) = self.model.draft_mut().wrap_selection(tag, range) {
                    self.model.show_error(e.to_string());
                }
            }
            Command::Submit => match self.model.begin_submission() {
                Ok(submission) => self.spawn_submit(submission),
                Err(e) => info!("Submission blocked: {}", e),
            },
        }
    }

    fn handle_feed(&mut self, signal: FeedSignal) {
        match signal {
            FeedSignal::Connected => {
                self.model.set_live_connected(true);
                // events emitted while disconnected are only visible through a fresh snapshot
                if self.feed_dropped {
                    self.feed_dropped = false;
                    let req = self.model.request_refresh();
                    self.spawn_load(req);
                }
            }
            FeedSignal::Message(raw) => {
                self.model.on_live_message(&raw);
            }
            FeedSignal::Disconnected => {
                self.model.set_live_connected(false);
                self.feed_dropped = true;
            }
        }
    }

    fn handle_completion(&mut self, done: Completion) {
        match done {
            Completion::Page(req, result) => {
                self.model.apply_page(req, result);
            }
            Completion::Captcha(result) => self.model.apply_captcha(result),
            Completion::Submitted(result) => match self.model.apply_submission(result) {
                SubmitOutcome::Accepted(req) => self.spawn_load(req),
                SubmitOutcome::Rejected => self.spawn_captcha(),
            },
        }
    }

    fn spawn_load(&self, req: PageRequest) {
        let api = self.api.clone();
        let tx = self.done_tx.clone();
        tokio::spawn(async move {
            let result = api.list_comments(&req.query).await;
            let _ = tx.send(Completion::Page(req, result)).await;
        });
    }

    fn spawn_captcha(&self) {
        let api = self.api.clone();
        let tx = self.done_tx.clone();
        tokio::spawn(async move {
            let result = api.fetch_captcha().await;
            let _ = tx.send(Completion::Captcha(result)).await;
        });
    }

    fn spawn_submit(&self, submission: Submission) {
        let api = self.api.clone();
        let tx = self.done_tx.clone();
        tokio::spawn(async move {
            let result = api.create_comment(submission).await;
            let _ = tx.send(Completion::Submitted(result)).await;
        });
    }
}
