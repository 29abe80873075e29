//! HTTP server: cached page rendering, comment submission and static files

use anyhow::{Context, Result};
use axum::{
    body::{Body, Bytes},
    extract::{Path, State},
    http::{Request, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde_json::json;
use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::cache::{Lookup, PageCache};
use crate::comments::{CommentForm, CommentSubmitter, FormState};
use crate::content::{ContentError, Post, PostSummary};
use crate::generator::Generator;
use crate::Blog;

/// Cache key of the home page listing
const INDEX_KEY: &str = "index";

/// Shared server state
pub struct AppState {
    generator: Generator,
    /// Receives comment form posts
    comments: Arc<dyn CommentSubmitter>,
    /// Backs `/api/createComment`
    cms: Arc<dyn CommentSubmitter>,
    posts: PageCache<Post>,
    index: PageCache<Vec<PostSummary>>,
    public_dir: PathBuf,
}

impl AppState {
    pub fn new(
        generator: Generator,
        comments: Arc<dyn CommentSubmitter>,
        cms: Arc<dyn CommentSubmitter>,
        public_dir: PathBuf,
    ) -> Self {
        let revalidate = generator.config().revalidate_after();
        Self {
            generator,
            comments,
            cms,
            posts: PageCache::new(revalidate),
            index: PageCache::new(revalidate),
            public_dir,
        }
    }
}

/// Start the server
pub async fn start(blog: &Blog, ip: &str, port: u16, open: bool) -> Result<()> {
    let client = blog.content_client()?;
    let comments = blog.comment_submitter(client.clone())?;
    let generator = Generator::new(blog.config.clone(), client.clone())?;
    let state = Arc::new(AppState::new(
        generator,
        comments,
        client,
        blog.public_dir.clone(),
    ));

    prerender(&state).await?;

    let app = router(state);

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    let url = format!("http://{}:{}", ip, port);
    println!("Server running at {}", url);
    println!("Press Ctrl+C to stop.");

    if open {
        if let Err(e) = open_browser(&url) {
            tracing::warn!("Failed to open browser: {}", e);
        }
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Fetch every post and the home listing into the cache
///
/// Runs before the server accepts requests; any content source failure is
/// fatal.
pub async fn prerender(state: &AppState) -> Result<()> {
    let slugs = state.generator.static_paths().await?;

    for slug in &slugs {
        match state
            .generator
            .fetch_post(slug)
            .await
            .with_context(|| format!("Failed to fetch post {:?}", slug))?
        {
            Some(post) => {
                state.posts.insert(slug, post);
            }
            None => tracing::warn!("Post {:?} disappeared during pre-render, skipping", slug),
        }
    }

    let summaries = state
        .generator
        .fetch_summaries()
        .await
        .context("Failed to fetch the post listing")?;
    state.index.insert(INDEX_KEY, summaries);

    tracing::info!("Pre-rendered {} posts", state.posts.len());
    Ok(())
}

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/post/:slug", get(post_handler).post(comment_form_handler))
        .route("/api/createComment", post(create_comment_handler))
        .fallback(fallback_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve from cache with stale-while-revalidate, fetching on a miss
///
/// `Ok(None)` means the record does not exist.
async fn load<V, F, Fut>(
    state: &Arc<AppState>,
    cache: fn(&AppState) -> &PageCache<V>,
    key: String,
    fetch: F,
) -> Result<Option<Arc<V>>, ContentError>
where
    V: Send + Sync + 'static,
    F: FnOnce(Arc<AppState>) -> Fut + Send + 'static,
    Fut: Future<Output = Result<Option<V>, ContentError>> + Send + 'static,
{
    match cache(state).lookup(&key) {
        Lookup::Fresh(value) => Ok(Some(value)),
        Lookup::Stale { value, refresh } => {
            if refresh {
                let state = state.clone();
                tokio::spawn(async move {
                    let result = fetch(state.clone()).await;
                    let cache = cache(&state);
                    match result {
                        Ok(Some(value)) => {
                            cache.complete(&key, value);
                            tracing::debug!("Revalidated {:?}", key);
                        }
                        Ok(None) => {
                            cache.evict(&key);
                            tracing::info!("{:?} no longer exists, evicted", key);
                        }
                        Err(e) => {
                            cache.abort(&key);
                            tracing::error!("Failed to revalidate {:?}: {}", key, e);
                        }
                    }
                });
            }
            Ok(Some(value))
        }
        Lookup::Miss => match fetch(state.clone()).await? {
            Some(value) => Ok(Some(cache(state).insert(&key, value))),
            None => Ok(None),
        },
    }
}

fn post_cache(state: &AppState) -> &PageCache<Post> {
    &state.posts
}

fn index_cache(state: &AppState) -> &PageCache<Vec<PostSummary>> {
    &state.index
}

async fn load_post(
    state: &Arc<AppState>,
    slug: String,
) -> Result<Option<Arc<Post>>, ContentError> {
    let key = slug.clone();
    load(state, post_cache, key, move |state| async move {
        state.generator.fetch_post(&slug).await
    })
    .await
}

async fn index_handler(State(state): State<Arc<AppState>>) -> Response {
    let summaries = load(&state, index_cache, INDEX_KEY.to_string(), |state| async move {
        state.generator.fetch_summaries().await.map(Some)
    })
    .await;

    match summaries {
        Ok(Some(summaries)) => page(StatusCode::OK, state.generator.render_index(&summaries)),
        Ok(None) => not_found(&state),
        Err(e) => server_error(&state, "/", &e),
    }
}

async fn post_handler(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Response {
    match load_post(&state, slug.clone()).await {
        Ok(Some(post)) => page(
            StatusCode::OK,
            state.generator.render_post(&post, &FormState::default()),
        ),
        Ok(None) => not_found(&state),
        Err(e) => server_error(&state, &slug, &e),
    }
}

async fn comment_form_handler(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    Form(mut form): Form<CommentForm>,
) -> Response {
    let post = match load_post(&state, slug.clone()).await {
        Ok(Some(post)) => post,
        Ok(None) => return not_found(&state),
        Err(e) => return server_error(&state, &slug, &e),
    };

    form.post_id = post.id.clone();
    let form_state = FormState::submit(form, state.comments.as_ref()).await;
    page(StatusCode::OK, state.generator.render_post(&post, &form_state))
}

/// JSON comment creation; the body is parsed whatever the content type
async fn create_comment_handler(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let form: CommentForm = match serde_json::from_slice(&body) {
        Ok(form) => form,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "message": format!("Invalid comment body: {}", e) })),
            )
                .into_response();
        }
    };

    let submission = match form.validate() {
        Ok(submission) => submission,
        Err(errors) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "message": errors.messages().join(", ") })),
            )
                .into_response();
        }
    };
    if submission.post_id.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "The post id is required" })),
        )
            .into_response();
    }

    match state.cms.submit(&submission).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "message": "Comment submitted" })),
        )
            .into_response(),
        Err(e) => {
            tracing::warn!("Failed to create comment on {}: {}", submission.post_id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "message": "Couldn't submit comment", "err": e.to_string() })),
            )
                .into_response()
        }
    }
}

/// Static files from the public directory, otherwise the 404 page
async fn fallback_handler(State(state): State<Arc<AppState>>, request: Request<Body>) -> Response {
    let mut service = ServeDir::new(&state.public_dir);
    match service.try_call(request).await {
        Ok(response) if response.status() != StatusCode::NOT_FOUND => response.into_response(),
        Ok(_) => not_found(&state),
        Err(e) => {
            tracing::error!("Failed to serve static file: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response()
        }
    }
}

fn page(status: StatusCode, html: Result<String>) -> Response {
    match html {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            tracing::error!("Failed to render page: {:#}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response()
        }
    }
}

fn not_found(state: &AppState) -> Response {
    page(StatusCode::NOT_FOUND, state.generator.render_not_found())
}

fn server_error(state: &AppState, key: &str, error: &ContentError) -> Response {
    tracing::error!("Failed to fetch {:?}: {}", key, error);
    page(
        StatusCode::INTERNAL_SERVER_ERROR,
        state.generator.render_error(),
    )
}

/// Open a URL in the default browser
fn open_browser(url: &str) -> Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(url).spawn()?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open").arg(url).spawn()?;
    }

    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/c", "start", url])
            .spawn()?;
    }

    Ok(())
}
