//! Comment form input and validation

use serde::{Deserialize, Serialize};

pub const NAME_REQUIRED: &str = "The Name Field is required";
pub const EMAIL_REQUIRED: &str = "The Email Field is required";
pub const EMAIL_INVALID: &str = "The Email Field must be a valid email address";
pub const COMMENT_REQUIRED: &str = "The Comment Field is required";

/// Raw form fields as posted by the browser
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentForm {
    /// Post identifier from the hidden input
    #[serde(default, rename = "_id")]
    pub post_id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub email: String,

    #[serde(default)]
    pub comment: String,
}

/// A validated submission, the JSON body sent to the comment endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentSubmission {
    #[serde(rename = "_id")]
    pub post_id: String,
    pub name: String,
    pub email: String,
    pub comment: String,
}

/// Inline error text per field
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldErrors {
    pub name: Option<&'static str>,
    pub email: Option<&'static str>,
    pub comment: Option<&'static str>,
}

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.comment.is_none()
    }

    /// Messages in field order
    pub fn messages(&self) -> Vec<&'static str> {
        [self.name, self.email, self.comment]
            .into_iter()
            .flatten()
            .collect()
    }
}

impl CommentForm {
    /// Check required fields and build the submission
    pub fn validate(&self) -> Result<CommentSubmission, FieldErrors> {
        let name = self.name.trim();
        let email = self.email.trim();
        let comment = self.comment.trim();

        let errors = FieldErrors {
            name: name.is_empty().then_some(NAME_REQUIRED),
            email: if email.is_empty() {
                Some(EMAIL_REQUIRED)
            } else if !looks_like_email(email) {
                Some(EMAIL_INVALID)
            } else {
                None
            },
            comment: comment.is_empty().then_some(COMMENT_REQUIRED),
        };

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(CommentSubmission {
            post_id: self.post_id.trim().to_string(),
            name: name.to_string(),
            email: email.to_string(),
            comment: comment.to_string(),
        })
    }
}

/// `local@domain` with no whitespace, as browsers check `type=email`
fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(name: &str, email: &str, comment: &str) -> CommentForm {
        CommentForm {
            post_id: "post-1".to_string(),
            name: name.to_string(),
            email: email.to_string(),
            comment: comment.to_string(),
        }
    }

    #[test]
    fn test_valid_form() {
        let submission = form(" Messi ", "messi@example.com", "Nice post").validate().unwrap();
        assert_eq!(submission.post_id, "post-1");
        assert_eq!(submission.name, "Messi");
        assert_eq!(submission.email, "messi@example.com");
        assert_eq!(submission.comment, "Nice post");
    }

    #[test]
    fn test_each_field_is_required() {
        let errors = form("", "", "   ").validate().unwrap_err();
        assert_eq!(
            errors.messages(),
            vec![NAME_REQUIRED, EMAIL_REQUIRED, COMMENT_REQUIRED]
        );

        let errors = form("Messi", "", "Hi").validate().unwrap_err();
        assert_eq!(errors.name, None);
        assert_eq!(errors.email, Some(EMAIL_REQUIRED));
        assert_eq!(errors.comment, None);
    }

    #[test]
    fn test_email_shape() {
        assert_eq!(
            form("a", "not-an-email", "c").validate().unwrap_err().email,
            Some(EMAIL_INVALID)
        );
        assert!(form("a", "Messi@Messi", "c").validate().is_ok());
        assert!(form("a", "a b@c", "c").validate().is_err());
    }

    #[test]
    fn test_submission_json_shape() {
        let submission = form("Messi", "m@m", "Hi").validate().unwrap();
        let value = serde_json::to_value(&submission).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"_id": "post-1", "name": "Messi", "email": "m@m", "comment": "Hi"})
        );
    }

    #[test]
    fn test_missing_fields_default_to_empty() {
        let form: CommentForm =
            serde_json::from_str(r#"{"_id": "post-9", "name": "X"}"#).unwrap();
        assert_eq!(form.post_id, "post-9");
        assert_eq!(form.email, "");
    }
}
