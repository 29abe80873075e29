//! GROQ queries issued against the content API

/// Every post's id and slug, used to enumerate page paths
pub const POST_SLUGS: &str = r#"*[_type == "post"]{
  _id,
  slug {
    current
  }
}"#;

/// Home page listing, newest first
pub const POST_SUMMARIES: &str = r#"*[_type == "post"] | order(_createdAt desc){
  _id,
  title,
  author->{
    name,
    image
  },
  description,
  mainImage,
  slug
}"#;

/// One post with its author and approved comments; takes `$slug`
pub const POST_BY_SLUG: &str = r#"*[_type == "post" && slug.current == $slug][0]{
  _id,
  _createdAt,
  title,
  author->{
    name,
    image
  },
  'comments': *[
    _type == "comment" &&
    post._ref == ^._id &&
    approved == true],
  description,
  mainImage,
  slug,
  body
}"#;
