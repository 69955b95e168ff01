//! # rb-ui
//!
//! askama templates and the small view models they render.
//! Every page extends `base.html`, which needs `current_user` for the nav bar.

use askama::Template;
use rb_core::models::{Post, TermKind};

pub mod content;

/// Characters of post content shown on listing pages.
pub const EXCERPT_CHARS: usize = 100;

#[derive(Template)]
#[template(path = "home.html")]
pub struct HomeTemplate<'a> {
    pub current_user: Option<String>,
    pub starting_content: &'a str,
    pub posts: Vec<PostSummary>,
}

/// About and Contact share one layout.
#[derive(Template)]
#[template(path = "page.html")]
pub struct PageTemplate<'a> {
    pub current_user: Option<String>,
    pub heading: &'a str,
    pub body: &'a str,
}

#[derive(Template)]
#[template(path = "compose.html")]
pub struct ComposeTemplate {
    pub current_user: Option<String>,
}

#[derive(Template)]
#[template(path = "registration.html")]
pub struct RegistrationTemplate {
    pub current_user: Option<String>,
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub current_user: Option<String>,
}

#[derive(Template)]
#[template(path = "post.html")]
pub struct PostTemplate {
    pub current_user: Option<String>,
    pub title: String,
    pub paragraphs: Vec<String>,
    pub tags: Vec<TermLink>,
    pub categories: Vec<TermLink>,
}

/// Detail page for a tag or a category.
#[derive(Template)]
#[template(path = "term.html")]
pub struct TermTemplate {
    pub current_user: Option<String>,
    pub kind_label: &'static str,
    pub title: String,
    pub paragraphs: Vec<String>,
    pub posts: Vec<PostSummary>,
}

#[derive(Template)]
#[template(path = "not_found.html")]
pub struct NotFoundTemplate {
    pub current_user: Option<String>,
    pub what: String,
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub current_user: Option<String>,
}

/// One entry of a post listing.
pub struct PostSummary {
    pub id: String,
    pub title: String,
    pub excerpt: String,
    pub truncated: bool,
}

impl From<&Post> for PostSummary {
    fn from(post: &Post) -> Self {
        let (excerpt, truncated) = excerpt(&post.content, EXCERPT_CHARS);
        Self {
            id: post.id.to_string(),
            title: post.title.clone(),
            excerpt,
            truncated,
        }
    }
}

/// A rendered reference from a post to a tag or category.
pub struct TermLink {
    pub href: String,
    pub label: String,
}

impl TermLink {
    pub fn new(kind: TermKind, id: impl std::fmt::Display, label: impl Into<String>) -> Self {
        Self {
            href: format!("{}/{}", kind.route_prefix(), id),
            label: label.into(),
        }
    }
}

/// First `max_chars` characters of `text`, and whether anything was cut.
pub fn excerpt(text: &str, max_chars: usize) -> (String, bool) {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => (text[..cut].trim_end().to_string(), true),
        None => (text.to_string(), false),
    }
}

/// Splits post content into paragraphs on line breaks, dropping blank lines.
pub fn paragraphs(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excerpt_respects_char_boundaries() {
        let (short, cut) = excerpt("héllo wörld", 5);
        assert_eq!(short, "héllo");
        assert!(cut);

        let (whole, cut) = excerpt("tiny", EXCERPT_CHARS);
        assert_eq!(whole, "tiny");
        assert!(!cut);
    }

    #[test]
    fn test_paragraphs_skip_blank_lines() {
        assert_eq!(paragraphs("one\r\n\r\n  two  \nthree"), ["one", "two", "three"]);
        assert!(paragraphs("   \n").is_empty());
    }

    #[test]
    fn test_home_escapes_post_titles() {
        let post = Post::new("<script>alert(1)</script>", "body").unwrap();
        let html = HomeTemplate {
            current_user: None,
            starting_content: content::HOME_STARTING_CONTENT,
            posts: vec![PostSummary::from(&post)],
        }
        .render()
        .unwrap();

        assert!(!html.contains("<script>"));
        assert!(html.contains(content::HOME_STARTING_CONTENT));
        assert!(html.contains("Log in"));
    }

    #[test]
    fn test_nav_shows_signed_in_user() {
        let html = ComposeTemplate { current_user: Some("ada".into()) }.render().unwrap();
        assert!(html.contains("Log out ada"));
        assert!(!html.contains("Register</a>"));
    }

    #[test]
    fn test_term_link_points_at_detail_route() {
        let link = TermLink::new(TermKind::Category, "abc", "News");
        assert_eq!(link.href, "/categories/abc");
    }
}
