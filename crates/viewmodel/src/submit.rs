use adapter::ApiError;
use domain::{CaptchaChallenge, CommentId, DraftError, Submission};
use tracing::{info, warn};

use crate::{Diagnostic, PageRequest, ViewModel};

pub const GENERIC_SUBMIT_ERROR: &str = "An error occurred while sending the comment.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Accepted by the server; the forest should be reloaded with this request.
    Accepted(PageRequest),
    /// Rejected or not delivered; a new captcha must be fetched.
    Rejected,
}

impl ViewModel {
    /// Returns whether a captcha challenge needs to be fetched.
    pub fn open_form(&mut self) -> bool {
        let was_open = self.form_open;
        self.form_open = true;
        !was_open || self.draft.captcha.is_none()
    }

    pub fn close_form(&mut self) {
        self.form_open = false;
        self.error_message = None;
    }

    pub fn reply_to(&mut self, parent: Option<CommentId>) {
        if let Some(id) = &parent {
            if self.find(id).is_none() {
                warn!("Replying to {} which is not on the current page", id);
            }
        }
        self.draft.parent_comment = parent;
    }

    pub fn apply_captcha(&mut self, result: Result<CaptchaChallenge, ApiError>) {
        match result {
            Ok(challenge) => {
                self.draft.captcha = Some(challenge);
                self.draft.captcha_answer.clear();
            }
            Err(e) => self.record(Diagnostic::CaptchaFailed(e.to_string())),
        }
    }

    /// Builds the payload for the current draft and consumes its captcha.
    /// Only an open form can be submitted. Local validation failures are
    /// shown to the user and leave the draft (captcha included) untouched.
    pub fn begin_submission(&mut self) -> Result<Submission, DraftError> {
        let built = if self.form_open {
            self.draft
                .captcha
                .clone()
                .ok_or(DraftError::MissingCaptcha)
                .and_then(|captcha| self.draft.to_submission(captcha))
        } else {
            Err(DraftError::FormClosed)
        };

        match built {
            Ok(submission) => {
                self.draft.captcha = None;
                self.error_message = None;
                Ok(submission)
            }
            Err(e) => {
                self.error_message = Some(e.to_string());
                Err(e)
            }
        }
    }

    pub fn apply_submission(&mut self, result: Result<(), ApiError>) -> SubmitOutcome {
        match result {
            Ok(()) => {
                info!("Comment accepted");
                self.draft.clear_free_text();
                self.form_open = false;
                self.error_message = None;
                SubmitOutcome::Accepted(self.request_refresh())
            }
            Err(e) => {
                warn!("Comment submission failed: {}", e);
                let message = e.server_message().unwrap_or(GENERIC_SUBMIT_ERROR);
                self.error_message = Some(message.to_string());
                SubmitOutcome::Rejected
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use domain::{AttachmentNormalizer, DraftField};

    use super::*;

    fn challenge(key: &str) -> CaptchaChallenge {
        CaptchaChallenge {
            key: key.into(),
            value: format!("https://example.org/captcha/image/{}/", key),
        }
    }

    fn filled() -> ViewModel {
        let mut vm = ViewModel::new(AttachmentNormalizer::cloudinary("demo"));
        assert!(vm.open_form());
        vm.apply_captcha(Ok(challenge("k1")));
        let d = vm.draft_mut();
        d.set(DraftField::UserName, "ann");
        d.set(DraftField::Email, "ann@example.org");
        d.set(DraftField::Text, "<strong>hello</strong><img src=x>");
        d.captcha_answer = "WXYZ".into();
        vm
    }

    #[test]
    fn success_clears_text_closes_form_and_reloads() {
        let mut vm = filled();
        let s = vm.begin_submission().unwrap();
        assert_eq!(s.text, "<strong>hello</strong>");
        assert_eq!(s.captcha_key, "k1");
        assert!(vm.draft().captcha.is_none());

        match vm.apply_submission(Ok(())) {
            SubmitOutcome::Accepted(req) => assert_eq!(req.query, vm.cursor().query()),
            other => panic!("unexpected {:?}", other),
        }
        assert!(!vm.form_open());
        assert!(vm.draft().text.is_empty());
        assert_eq!(vm.draft().user_name, "ann");
        assert_eq!(vm.error_message(), None);
    }

    #[test]
    fn rejection_keeps_fields_and_shows_server_message() {
        let mut vm = filled();
        vm.begin_submission().unwrap();
        let out = vm.apply_submission(Err(ApiError::Rejected {
            status: 400,
            message: Some("Wrong CAPTCHA".into()),
        }));
        assert_eq!(out, SubmitOutcome::Rejected);
        assert_eq!(vm.error_message(), Some("Wrong CAPTCHA"));
        assert!(vm.form_open());
        assert_eq!(vm.draft().text, "<strong>hello</strong><img src=x>");
        // the spent challenge is gone until a new one arrives
        assert!(vm.draft().captcha.is_none());

        vm.apply_captcha(Ok(challenge("k2")));
        assert_eq!(vm.draft().captcha.as_ref().map(|c| c.key.as_str()), Some("k2"));
        assert!(vm.draft().captcha_answer.is_empty());
    }

    #[test]
    fn rejection_without_message_uses_generic_text() {
        let mut vm = filled();
        vm.begin_submission().unwrap();
        vm.apply_submission(Err(ApiError::Decode("eof".into())));
        assert_eq!(vm.error_message(), Some(GENERIC_SUBMIT_ERROR));
    }

    #[test]
    fn local_validation_keeps_captcha() {
        let mut vm = filled();
        vm.draft_mut().set(DraftField::Text, "   ");
        assert_eq!(vm.begin_submission(), Err(DraftError::EmptyText));
        assert!(vm.draft().captcha.is_some());
        assert!(vm.error_message().is_some());
    }

    #[test]
    fn submitting_without_captcha_is_refused() {
        let mut vm = ViewModel::new(AttachmentNormalizer::cloudinary("demo"));
        vm.open_form();
        vm.draft_mut().set(DraftField::Text, "hi");
        assert_eq!(vm.begin_submission(), Err(DraftError::MissingCaptcha));
    }

    #[test]
    fn closed_form_keeps_draft_and_captcha() {
        let mut vm = filled();
        vm.close_form();
        assert_eq!(vm.begin_submission(), Err(DraftError::FormClosed));
        assert_eq!(vm.draft().captcha.as_ref().map(|c| c.key.as_str()), Some("k1"));
        assert_eq!(vm.draft().text, "<strong>hello</strong><img src=x>");

        vm.open_form();
        assert_eq!(vm.begin_submission().unwrap().captcha_key, "k1");
    }

    #[test]
    fn reopening_form_with_captcha_needs_no_fetch() {
        let mut vm = filled();
        assert!(!vm.open_form());
        vm.close_form();
        assert!(vm.open_form());
    }
}
