//! List site content

use anyhow::Result;

use crate::content::ContentSource;
use crate::Blog;

/// List site content by type
pub async fn run(blog: &Blog, content_type: &str) -> Result<()> {
    let client = blog.content_client()?;
    for line in describe(client.as_ref(), content_type).await? {
        println!("{}", line);
    }
    Ok(())
}

async fn describe(source: &dyn ContentSource, content_type: &str) -> Result<Vec<String>> {
    let mut lines = Vec::new();

    match content_type {
        "post" | "posts" => {
            let posts = source.post_summaries().await?;
            lines.push(format!("Posts ({}):", posts.len()));
            for post in posts {
                let author = post
                    .author
                    .as_ref()
                    .and_then(|a| a.name.as_deref())
                    .unwrap_or("noname");
                lines.push(format!(
                    "  {} - {} [{}]",
                    post.slug.current, post.title, author
                ));
            }
        }
        "slug" | "slugs" => {
            let slugs = source.post_slugs().await?;
            lines.push(format!("Slugs ({}):", slugs.len()));
            for slug in slugs {
                lines.push(format!("  {}", slug));
            }
        }
        _ => {
            anyhow::bail!("Unknown type: {}. Available: post, slug", content_type);
        }
    }

    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::testing::{sample_post, MemorySource};

    #[tokio::test]
    async fn test_describe_posts() {
        let source = MemorySource::new(vec![
            sample_post("a", "First", &[]),
            sample_post("b", "Second", &[]),
        ]);

        let lines = describe(&source, "posts").await.unwrap();
        assert_eq!(lines[0], "Posts (2):");
        assert!(lines.contains(&"  a - First [Ada]".to_string()));

        let lines = describe(&source, "slug").await.unwrap();
        assert_eq!(lines, vec!["Slugs (2):", "  a", "  b"]);
    }

    #[tokio::test]
    async fn test_unknown_type() {
        let source = MemorySource::new(vec![]);
        assert!(describe(&source, "tags").await.is_err());
    }
}
