//! Reader comments - form validation, submission and form state

mod form;
mod state;
mod submit;

pub use form::{
    CommentForm, CommentSubmission, FieldErrors, COMMENT_REQUIRED, EMAIL_INVALID, EMAIL_REQUIRED,
    NAME_REQUIRED,
};
pub use state::{FormState, SUBMIT_FAILED};
pub use submit::{CommentSubmitter, HttpCommentSubmitter, SubmitError};

#[cfg(test)]
pub(crate) use submit::testing;
