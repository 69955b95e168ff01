//! Seeds the store with a demo account, a few tags and categories, and posts
//! that reference them. Safe to run more than once: it stops if the demo
//! account already exists.

use anyhow::Context;
use rb_auth_simple::SimpleAuthProvider;
use rb_config::Settings;
use rb_core::models::{Post, Term, TermKind, User};
use rb_core::traits::{AuthProvider, BlogRepo};
use rb_db_sqlite::{RetryPolicy, SqliteBlogRepo};

const DEMO_USERNAME: &str = "demo";
const DEMO_PASSWORD: &str = "demo-password";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let settings = Settings::load().context("loading settings")?;
    let policy = RetryPolicy {
        max_attempts: settings.database.max_attempts,
        initial_delay: settings.database.initial_backoff(),
        max_delay: settings.database.max_backoff(),
    };
    let repo = SqliteBlogRepo::connect_with_retry(&settings.database.url, &policy).await?;
    let auth = SimpleAuthProvider::new(settings.auth.bcrypt_cost)?;

    if repo.find_user_by_username(DEMO_USERNAME).await?.is_some() {
        log::info!("Store already seeded; nothing to do");
        return Ok(());
    }

    let hash = auth.hash_password(DEMO_PASSWORD).await?;
    repo.create_user(User::new(
        "Demo Writer".into(),
        "1 Example Road".into(),
        DEMO_USERNAME.into(),
        hash,
    ))
    .await?;

    let rust = Term::new(TermKind::Tag, "rust", "Posts about the Rust language.")?;
    let web = Term::new(TermKind::Tag, "web", "Servers, templates and HTTP.")?;
    let notes = Term::new(TermKind::Category, "Notes", "Short write-ups and reminders.")?;

    let first = Post::with_terms(
        "Hello, world",
        "The first post on this blog.\nIt is tagged rust and web.",
        vec![rust.id, web.id],
        vec![notes.id],
    )?;
    let second = Post::with_terms(
        "Templates",
        "Pages are rendered on the server.",
        vec![web.id],
        vec![notes.id],
    )?;

    // Terms carry back-references to the posts filed under them.
    let mut terms = [rust, web, notes];
    for term in terms.iter_mut() {
        term.posts = [&first, &second]
            .into_iter()
            .filter(|post| post.references(term.kind).contains(&term.id))
            .map(|post| post.id)
            .collect();
    }

    for term in terms {
        log::info!("Seeding {} {:?}", term.kind.label(), term.title);
        repo.create_term(term).await?;
    }
    for post in [first, second] {
        log::info!("Seeding post {:?}", post.title);
        repo.create_post(post).await?;
    }

    log::info!("Seeded demo account {DEMO_USERNAME:?} / {DEMO_PASSWORD:?}");
    Ok(())
}
