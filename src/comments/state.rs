//! Comment form state machine

use serde::Serialize;

use super::form::{CommentForm, FieldErrors};
use super::submit::CommentSubmitter;

/// Shown above the form when the endpoint call fails
pub const SUBMIT_FAILED: &str = "Your comment could not be submitted. Please try again.";

/// What the comment section shows
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FormState {
    /// Form visible, possibly with inline errors or a failure banner
    Unsubmitted {
        values: CommentForm,
        errors: FieldErrors,
        failure: Option<&'static str>,
    },
    /// Thank-you message visible
    Submitted,
}

impl Default for FormState {
    fn default() -> Self {
        FormState::Unsubmitted {
            values: CommentForm::default(),
            errors: FieldErrors::default(),
            failure: None,
        }
    }
}

impl FormState {
    pub fn is_submitted(&self) -> bool {
        matches!(self, FormState::Submitted)
    }

    /// Validate and submit a form
    ///
    /// Invalid input never reaches the submitter. Only a successful call moves
    /// the form to `Submitted`; a failed one keeps the entered values.
    pub async fn submit(form: CommentForm, submitter: &dyn CommentSubmitter) -> FormState {
        let submission = match form.validate() {
            Ok(submission) => submission,
            Err(errors) => {
                tracing::debug!("Comment form rejected: {:?}", errors.messages());
                return FormState::Unsubmitted {
                    values: form,
                    errors,
                    failure: None,
                };
            }
        };

        match submitter.submit(&submission).await {
            Ok(()) => {
                tracing::info!("Comment submitted for post {}", submission.post_id);
                FormState::Submitted
            }
            Err(e) => {
                tracing::warn!(
                    "Comment submission for post {} failed: {}",
                    submission.post_id,
                    e
                );
                FormState::Unsubmitted {
                    values: form,
                    errors: FieldErrors::default(),
                    failure: Some(SUBMIT_FAILED),
                }
            }
        }
    }
}
