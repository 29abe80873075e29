//! HTTP client for the Sanity content API

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};

use super::post::{Post, PostSummary, Slug};
use super::query;
use crate::comments::CommentSubmission;
use crate::config::SanityConfig;

/// Errors talking to the content API
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("content API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("invalid response from content API: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("an API token is required to write documents")]
    MissingToken,
}

/// Read access to published posts
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Slugs of every post, in query order without duplicates
    async fn post_slugs(&self) -> Result<Vec<String>, ContentError>;

    /// A post with its author and approved comments, `None` if no post has that slug
    async fn post_by_slug(&self, slug: &str) -> Result<Option<Post>, ContentError>;

    /// All posts for the home page listing
    async fn post_summaries(&self) -> Result<Vec<PostSummary>, ContentError>;
}

/// Query response envelope
#[derive(Debug, Deserialize)]
struct QueryResponse<T> {
    result: T,
}

/// Error envelope; the API uses either shape depending on the endpoint
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    error: Option<ErrorDetail>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    description: Option<String>,
}

/// Row of the slug enumeration query
#[derive(Debug, Deserialize)]
struct SlugRecord {
    #[serde(rename = "_id")]
    id: String,
    #[serde(default)]
    slug: Option<Slug>,
}

/// Document written for a new comment
#[derive(Debug, Serialize)]
struct CommentDocument<'a> {
    #[serde(rename = "_type")]
    kind: &'static str,
    post: PostReference<'a>,
    name: &'a str,
    email: &'a str,
    comment: &'a str,
}

#[derive(Debug, Serialize)]
struct PostReference<'a> {
    #[serde(rename = "_type")]
    kind: &'static str,
    #[serde(rename = "_ref")]
    id: &'a str,
}

/// Sanity HTTP API client
#[derive(Clone)]
pub struct SanityClient {
    client: Client,
    config: SanityConfig,
}

impl SanityClient {
    /// Create a client for the configured project
    pub fn new(config: &SanityConfig) -> Result<Self, ContentError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .build()?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    fn api_base(&self, cdn: bool) -> String {
        if let Some(host) = &self.config.api_host {
            return host.trim_end_matches('/').to_string();
        }
        let domain = if cdn { "apicdn" } else { "api" };
        format!("https://{}.{}.sanity.io", self.config.project_id, domain)
    }

    fn endpoint(&self, action: &str, cdn: bool) -> String {
        format!(
            "{}/v{}/data/{}/{}",
            self.api_base(cdn),
            self.config.api_version,
            action,
            self.config.dataset
        )
    }

    /// Run a GROQ query with `$name` parameters
    #[instrument(skip(self, groq))]
    pub async fn fetch<T: DeserializeOwned>(
        &self,
        groq: &str,
        params: &[(&str, &str)],
    ) -> Result<T, ContentError> {
        let mut query: Vec<(String, String)> = vec![("query".to_string(), groq.to_string())];
        for (name, value) in params {
            query.push((format!("${}", name), serde_json::to_string(value)?));
        }

        let mut request = self
            .client
            .get(self.endpoint("query", self.config.use_cdn))
            .query(&query);
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let body = read_body(response).await?;
        let envelope: QueryResponse<T> = serde_json::from_str(&body)?;
        Ok(envelope.result)
    }

    /// Create a comment document referencing its post
    #[instrument(skip(self, submission), fields(post = %submission.post_id))]
    pub async fn create_comment(&self, submission: &CommentSubmission) -> Result<(), ContentError> {
        let token = self.config.token.as_ref().ok_or(ContentError::MissingToken)?;

        let document = CommentDocument {
            kind: "comment",
            post: PostReference {
                kind: "reference",
                id: &submission.post_id,
            },
            name: &submission.name,
            email: &submission.email,
            comment: &submission.comment,
        };
        let body = json!({ "mutations": [{ "create": document }] });

        let response = self
            .client
            .post(self.endpoint("mutate", false))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        read_body(response).await?;

        debug!("Comment created");
        Ok(())
    }
}

#[async_trait]
impl ContentSource for SanityClient {
    async fn post_slugs(&self) -> Result<Vec<String>, ContentError> {
        let records: Vec<SlugRecord> = self.fetch(query::POST_SLUGS, &[]).await?;
        Ok(collect_slugs(records))
    }

    async fn post_by_slug(&self, slug: &str) -> Result<Option<Post>, ContentError> {
        let post: Option<Post> = self.fetch(query::POST_BY_SLUG, &[("slug", slug)]).await?;
        Ok(post)
    }

    async fn post_summaries(&self) -> Result<Vec<PostSummary>, ContentError> {
        let posts: Option<Vec<PostSummary>> = self.fetch(query::POST_SUMMARIES, &[]).await?;
        Ok(posts
            .unwrap_or_default()
            .into_iter()
            .filter(|post| {
                let routable = !post.slug.current.trim().is_empty();
                if !routable {
                    tracing::warn!("Post {} has no slug, leaving it out of the listing", post.id);
                }
                routable
            })
            .collect())
    }
}

/// Keep non-empty slugs, first occurrence wins
fn collect_slugs(records: Vec<SlugRecord>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut slugs = Vec::with_capacity(records.len());

    for record in records {
        // Fetched by exact match, so the slug is kept as stored
        match record.slug.map(|s| s.current) {
            Some(slug) if !slug.trim().is_empty() => {
                if seen.insert(slug.clone()) {
                    slugs.push(slug);
                } else {
                    tracing::warn!("Duplicate slug {:?} on post {}", slug, record.id);
                }
            }
            _ => tracing::warn!("Post {} has no slug, skipping", record.id),
        }
    }

    slugs
}

/// Return the body of a successful response, or the API's error message
async fn read_body(response: reqwest::Response) -> Result<String, ContentError> {
    let status = response.status();
    let body = response.text().await?;

    if status.is_success() {
        return Ok(body);
    }

    Err(ContentError::Api {
        status: status.as_u16(),
        message: error_message(status, &body),
    })
}

fn error_message(status: StatusCode, body: &str) -> String {
    let parsed: Option<ErrorResponse> = serde_json::from_str(body).ok();
    parsed
        .and_then(|e| e.error.and_then(|d| d.description).or(e.message))
        .or_else(|| {
            let v: Value = serde_json::from_str(body).ok()?;
            v.get("error").and_then(|e| e.as_str()).map(str::to_string)
        })
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(server: &MockServer) -> SanityConfig {
        SanityConfig {
            project_id: "proj".to_string(),
            api_host: Some(server.uri()),
            token: Some("secret".to_string()),
            ..SanityConfig::default()
        }
    }

    #[test]
    fn test_collect_slugs() {
        let records: Vec<SlugRecord> = serde_json::from_str(
            r#"[
            {"_id": "a", "slug": {"current": "first"}},
            {"_id": "b", "slug": null},
            {"_id": "c", "slug": {"current": "  "}},
            {"_id": "d", "slug": {"current": "first"}},
            {"_id": "e", "slug": {"current": "second"}}
        ]"#,
        )
        .unwrap();

        assert_eq!(collect_slugs(records), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_untrimmed_slug_resolves() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("$slug", "\"hello \""))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": {
                    "_id": "post-1",
                    "_createdAt": "2022-03-01T10:20:30Z",
                    "title": "Hello",
                    "slug": {"current": "hello "}
                }
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": [{"_id": "post-1", "slug": {"current": "hello "}}]
            })))
            .mount(&server)
            .await;

        let client = SanityClient::new(&config(&server)).unwrap();
        let slugs = client.post_slugs().await.unwrap();
        assert_eq!(slugs, vec!["hello "]);
        for slug in &slugs {
            assert!(client.post_by_slug(slug).await.unwrap().is_some());
        }
    }

    #[tokio::test]
    async fn test_listing_skips_drafts_without_slug() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2021-10-21/data/query/production"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": [
                    {"_id": "post-a", "title": "A", "author": {"name": "Ada", "image": null},
                     "description": null, "mainImage": null, "slug": {"current": "a"}},
                    {"_id": "drafts.post-b", "title": null, "author": null,
                     "description": null, "mainImage": null, "slug": null}
                ]
            })))
            .mount(&server)
            .await;

        let client = SanityClient::new(&config(&server)).unwrap();
        let summaries = client.post_summaries().await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].id, "post-a");
        assert_eq!(summaries[0].slug.current, "a");

        let slugs = client.post_slugs().await.unwrap();
        assert_eq!(slugs, vec!["a"]);
    }

    #[test]
    fn test_public_endpoints() {
        let mut config = SanityConfig {
            project_id: "proj".to_string(),
            ..SanityConfig::default()
        };
        let client = SanityClient::new(&config).unwrap();
        assert_eq!(
            client.endpoint("query", false),
            "https://proj.api.sanity.io/v2021-10-21/data/query/production"
        );

        config.use_cdn = true;
        let client = SanityClient::new(&config).unwrap();
        assert_eq!(
            client.endpoint("query", true),
            "https://proj.apicdn.sanity.io/v2021-10-21/data/query/production"
        );
    }

    #[tokio::test]
    async fn test_post_by_slug_sends_parameter() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2021-10-21/data/query/production"))
            .and(query_param("$slug", "\"hello\""))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ms": 3,
                "result": {
                    "_id": "post-1",
                    "_createdAt": "2022-03-01T10:20:30Z",
                    "title": "Hello",
                    "slug": {"current": "hello"},
                    "comments": []
                }
            })))
            .mount(&server)
            .await;

        let client = SanityClient::new(&config(&server)).unwrap();
        let post = client.post_by_slug("hello").await.unwrap().unwrap();
        assert_eq!(post.id, "post-1");
        assert_eq!(post.title, "Hello");
    }

    #[tokio::test]
    async fn test_missing_post_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": null })))
            .mount(&server)
            .await;

        let client = SanityClient::new(&config(&server)).unwrap();
        assert!(client.post_by_slug("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_api_error_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {"description": "param $slug referenced, but not provided"}
            })))
            .mount(&server)
            .await;

        let client = SanityClient::new(&config(&server)).unwrap();
        match client.post_slugs().await {
            Err(ContentError::Api { status, message }) => {
                assert_eq!(status, 400);
                assert!(message.contains("not provided"));
            }
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_create_comment_mutation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2021-10-21/data/mutate/production"))
            .and(header("authorization", "Bearer secret"))
            .and(body_partial_json(json!({
                "mutations": [{"create": {
                    "_type": "comment",
                    "post": {"_type": "reference", "_ref": "post-1"},
                    "name": "Messi",
                    "email": "messi@example.com",
                    "comment": "Great read"
                }}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": []})))
            .expect(1)
            .mount(&server)
            .await;

        let client = SanityClient::new(&config(&server)).unwrap();
        let submission = CommentSubmission {
            post_id: "post-1".to_string(),
            name: "Messi".to_string(),
            email: "messi@example.com".to_string(),
            comment: "Great read".to_string(),
        };
        client.create_comment(&submission).await.unwrap();
    }

    #[tokio::test]
    async fn test_create_comment_requires_token() {
        let server = MockServer::start().await;
        let mut config = config(&server);
        config.token = None;

        let client = SanityClient::new(&config).unwrap();
        let submission = CommentSubmission {
            post_id: "post-1".to_string(),
            name: "a".to_string(),
            email: "a@b".to_string(),
            comment: "c".to_string(),
        };
        assert!(matches!(
            client.create_comment(&submission).await,
            Err(ContentError::MissingToken)
        ));
    }
}
