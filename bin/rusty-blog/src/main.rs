//! # Rusty-Blog Binary
//!
//! The entry point that wires settings, the document store and the HTTP server together.

use actix_web::cookie::Key;
use actix_web::{web, HttpServer};
use anyhow::{anyhow, Context};
use rb_api::middleware::standard_middleware;
use rb_api::{build_app, AppState};
use rb_auth_simple::SimpleAuthProvider;
use rb_config::Settings;
use rb_db_sqlite::{RetryPolicy, SqliteBlogRepo};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let settings = Settings::load().context("loading settings")?;

    // 1. Document store: one long-lived pool, retried until it answers
    let policy = RetryPolicy {
        max_attempts: settings.database.max_attempts,
        initial_delay: settings.database.initial_backoff(),
        max_delay: settings.database.max_backoff(),
    };
    let repo = SqliteBlogRepo::connect_with_retry(&settings.database.url, &policy)
        .await
        .context("connecting to the document store")?;

    // 2. Password hashing
    let auth = SimpleAuthProvider::new(settings.auth.bcrypt_cost)?;

    // 3. Session cookie key
    let key = match settings.auth.session_key_bytes() {
        Some(bytes) => Key::try_from(bytes).map_err(|err| anyhow!("invalid session key: {err:?}"))?,
        None => {
            log::warn!("BLOG_AUTH__SESSION_KEY is not set; sessions will not survive a restart");
            Key::generate()
        }
    };

    let state = web::Data::new(AppState {
        repo: Box::new(repo),
        auth: Box::new(auth),
    });

    let (host, port) = settings.bind_addr();
    let static_dir = settings.server.static_dir.clone();
    let cookie_secure = settings.auth.cookie_secure;

    log::info!("Rusty-Blog starting on http://{host}:{port}");

    HttpServer::new(move || {
        build_app(state.clone(), key.clone(), cookie_secure, Some(&static_dir))
            .wrap(standard_middleware())
    })
    .bind((host, port))?
    .run()
    .await?;

    Ok(())
}
