//! Delivery of validated comments to the comment-creation endpoint

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

use super::form::CommentSubmission;
use crate::content::{ContentError, SanityClient};

/// Why a submission did not go through
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("comment request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("comment endpoint returned {status}")]
    Rejected { status: u16 },

    #[error(transparent)]
    Content(#[from] ContentError),
}

/// Sends a submission to wherever comments are moderated
#[async_trait]
pub trait CommentSubmitter: Send + Sync {
    async fn submit(&self, submission: &CommentSubmission) -> Result<(), SubmitError>;
}

/// Writes the comment document straight into the CMS
#[async_trait]
impl CommentSubmitter for SanityClient {
    async fn submit(&self, submission: &CommentSubmission) -> Result<(), SubmitError> {
        self.create_comment(submission).await?;
        Ok(())
    }
}

/// POSTs `{ _id, name, email, comment }` to an external endpoint
///
/// Any 2xx status counts as success; the response body is ignored.
pub struct HttpCommentSubmitter {
    client: Client,
    endpoint: String,
}

impl HttpCommentSubmitter {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, SubmitError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }
}

#[async_trait]
impl CommentSubmitter for HttpCommentSubmitter {
    async fn submit(&self, submission: &CommentSubmission) -> Result<(), SubmitError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(submission)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SubmitError::Rejected {
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Recording submitter for tests

    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct RecordingSubmitter {
        pub calls: Mutex<Vec<CommentSubmission>>,
        pub fail: AtomicBool,
    }

    impl RecordingSubmitter {
        pub fn failing() -> Self {
            let submitter = Self::default();
            submitter.fail.store(true, Ordering::SeqCst);
            submitter
        }

        pub fn calls(&self) -> Vec<CommentSubmission> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CommentSubmitter for RecordingSubmitter {
        async fn submit(&self, submission: &CommentSubmission) -> Result<(), SubmitError> {
            self.calls.lock().unwrap().push(submission.clone());
            if self.fail.load(Ordering::SeqCst) {
                return Err(SubmitError::Rejected { status: 500 });
            }
            Ok(())
        }
    }
}
