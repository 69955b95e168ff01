//! # rb-api Handlers
//!
//! This module coordinates the flow between HTTP requests and Core traits.
//! Each handler issues its store calls, waits for them, and answers exactly once.

use actix_web::http::{header, StatusCode};
use actix_web::{web, HttpResponse};
use askama::Template;
use rb_core::error::{AppError, Result};
use rb_core::models::{Post, TermKind, User};
use rb_core::traits::{AuthProvider, BlogRepo};
use rb_ui::content::{ABOUT_CONTENT, CONTACT_CONTENT, HOME_STARTING_CONTENT};
use rb_ui::{
    paragraphs, ComposeTemplate, ErrorTemplate, HomeTemplate, LoginTemplate, NotFoundTemplate,
    PageTemplate, PostSummary, PostTemplate, RegistrationTemplate, TermLink, TermTemplate,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::session::SessionContext;

/// State shared across all Actix-web workers.
pub struct AppState {
    pub repo: Box<dyn BlogRepo>,
    pub auth: Box<dyn AuthProvider>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct RegistrationForm {
    pub name: String,
    pub address: String,
    pub username: String,
    pub password: String,
}

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct ComposeForm {
    #[serde(rename = "postTitle")]
    pub title: String,
    #[serde(rename = "postBody")]
    pub body: String,
}

// ── Accounts ────────────────────────────────────────────────────────────────

pub async fn registration_form(data: web::Data<AppState>, session: SessionContext) -> HttpResponse {
    render(&RegistrationTemplate { current_user: current_username(&data, &session).await })
}

/// Stores a new user and signs them in. Failures go back to the form.
pub async fn register(
    data: web::Data<AppState>,
    session: SessionContext,
    form: web::Form<RegistrationForm>,
) -> HttpResponse {
    match create_account(&data, form.into_inner()).await {
        Ok(user) => {
            log::info!("Registered user {} ({})", user.username, user.id);
            if let Err(err) = session.sign_in(&user) {
                log::error!("Could not start session after registration: {err}");
            }
            redirect("/home")
        }
        Err(err) => {
            log::error!("Registration failed: {err}");
            redirect("/registration")
        }
    }
}

async fn create_account(state: &AppState, form: RegistrationForm) -> Result<User> {
    let hash = state.auth.hash_password(&form.password).await?;
    let user = User::new(form.name, form.address, form.username, hash);
    state.repo.create_user(user.clone()).await?;
    Ok(user)
}

pub async fn login_form(data: web::Data<AppState>, session: SessionContext) -> HttpResponse {
    render(&LoginTemplate { current_user: current_username(&data, &session).await })
}

pub async fn login(
    data: web::Data<AppState>,
    session: SessionContext,
    form: web::Form<LoginForm>,
) -> HttpResponse {
    match authenticate(&data, &form.username, &form.password).await {
        Ok(user) => match session.sign_in(&user) {
            Ok(()) => redirect("/home"),
            Err(err) => {
                log::error!("Could not start session for {}: {err}", user.username);
                redirect("/login")
            }
        },
        Err(AppError::Unauthorized(reason)) => {
            log::info!("Login rejected: {reason}");
            redirect("/login")
        }
        Err(err) => {
            log::error!("Login failed: {err}");
            redirect("/login")
        }
    }
}

async fn authenticate(state: &AppState, username: &str, password: &str) -> Result<User> {
    let user = state
        .repo
        .find_user_by_username(username)
        .await?
        .ok_or_else(|| AppError::Unauthorized(format!("unknown username {username:?}")))?;

    if state.auth.verify_password(password, &user.password).await {
        Ok(user)
    } else {
        Err(AppError::Unauthorized(format!("wrong password for {username:?}")))
    }
}

pub async fn logout(session: SessionContext) -> HttpResponse {
    session.sign_out();
    redirect("/home")
}

// ── Pages ───────────────────────────────────────────────────────────────────

pub async fn index() -> HttpResponse {
    redirect("/home")
}

/// Renders every post, oldest first.
pub async fn home(data: web::Data<AppState>, session: SessionContext) -> HttpResponse {
    let current_user = current_username(&data, &session).await;
    match data.repo.list_posts().await {
        Ok(posts) => render(&HomeTemplate {
            current_user,
            starting_content: HOME_STARTING_CONTENT,
            posts: posts.iter().map(PostSummary::from).collect(),
        }),
        Err(err) => {
            log::error!("Could not list posts: {err}");
            server_error(current_user)
        }
    }
}

pub async fn about(data: web::Data<AppState>, session: SessionContext) -> HttpResponse {
    render(&PageTemplate {
        current_user: current_username(&data, &session).await,
        heading: "About",
        body: ABOUT_CONTENT,
    })
}

pub async fn contact(data: web::Data<AppState>, session: SessionContext) -> HttpResponse {
    render(&PageTemplate {
        current_user: current_username(&data, &session).await,
        heading: "Contact",
        body: CONTACT_CONTENT,
    })
}

pub async fn not_found(data: web::Data<AppState>, session: SessionContext) -> HttpResponse {
    page_not_found(current_username(&data, &session).await, "The page you asked for")
}

// ── Posts ───────────────────────────────────────────────────────────────────

pub async fn compose_form(data: web::Data<AppState>, session: SessionContext) -> HttpResponse {
    if session.require_user_id().is_err() {
        return redirect("/login");
    }
    render(&ComposeTemplate { current_user: current_username(&data, &session).await })
}

/// Persists the post before answering; one redirect either way.
pub async fn compose(
    data: web::Data<AppState>,
    session: SessionContext,
    form: web::Form<ComposeForm>,
) -> HttpResponse {
    let author = match session.require_user_id() {
        Ok(id) => id,
        Err(_) => return redirect("/login"),
    };

    let ComposeForm { title, body } = form.into_inner();
    let saved = match Post::new(title, body) {
        Ok(post) => {
            let id = post.id;
            data.repo.create_post(post).await.map(|()| id)
        }
        Err(err) => Err(err),
    };

    match saved {
        Ok(id) => {
            log::info!("User {author} published post {id}");
            redirect("/home")
        }
        Err(err) => {
            log::error!("Could not save post: {err}");
            redirect("/compose")
        }
    }
}

pub async fn show_post(
    data: web::Data<AppState>,
    session: SessionContext,
    path: web::Path<String>,
) -> HttpResponse {
    let current_user = current_username(&data, &session).await;
    let Some(id) = parse_id(&path) else {
        return page_not_found(current_user, "That post");
    };

    match data.repo.get_post(id).await {
        Ok(Some(post)) => {
            let tags = term_links(&data, &post, TermKind::Tag).await;
            let categories = term_links(&data, &post, TermKind::Category).await;
            render(&PostTemplate {
                current_user,
                title: post.title,
                paragraphs: paragraphs(&post.content),
                tags,
                categories,
            })
        }
        Ok(None) => page_not_found(current_user, "That post"),
        Err(err) => {
            log::error!("Could not load post {id}: {err}");
            server_error(current_user)
        }
    }
}

/// Resolves a post's references to titles. Dangling ids are shown as-is.
async fn term_links(state: &AppState, post: &Post, kind: TermKind) -> Vec<TermLink> {
    let mut links = Vec::with_capacity(post.references(kind).len());
    for &id in post.references(kind) {
        let label = match state.repo.get_term(kind, id).await {
            Ok(Some(term)) => term.title,
            Ok(None) => id.to_string(),
            Err(err) => {
                log::warn!("Could not resolve {} {id}: {err}", kind.label());
                id.to_string()
            }
        };
        links.push(TermLink::new(kind, id, label));
    }
    links
}

// ── Tags & Categories ───────────────────────────────────────────────────────

pub async fn show_tag(
    data: web::Data<AppState>,
    session: SessionContext,
    path: web::Path<String>,
) -> HttpResponse {
    show_term(&data, session, TermKind::Tag, &path).await
}

pub async fn show_category(
    data: web::Data<AppState>,
    session: SessionContext,
    path: web::Path<String>,
) -> HttpResponse {
    show_term(&data, session, TermKind::Category, &path).await
}

/// The term record itself, followed by every post that references it.
async fn show_term(state: &AppState, session: SessionContext, kind: TermKind, raw_id: &str) -> HttpResponse {
    let current_user = current_username(state, &session).await;
    let what = format!("That {}", kind.label().to_lowercase());
    let Some(id) = parse_id(raw_id) else {
        return page_not_found(current_user, &what);
    };

    let term = match state.repo.get_term(kind, id).await {
        Ok(Some(term)) => term,
        Ok(None) => return page_not_found(current_user, &what),
        Err(err) => {
            log::error!("Could not load {} {id}: {err}", kind.label());
            return server_error(current_user);
        }
    };

    match state.repo.posts_with_term(kind, id).await {
        Ok(posts) => render(&TermTemplate {
            current_user,
            kind_label: kind.label(),
            title: term.title,
            paragraphs: paragraphs(&term.content),
            posts: posts.iter().map(PostSummary::from).collect(),
        }),
        Err(err) => {
            log::error!("Could not list posts for {} {id}: {err}", kind.label());
            server_error(current_user)
        }
    }
}

// ── Helpers ─────────────────────────────────────────────────────────────────

/// Username for the nav bar. The session holds only the id, so the account is
/// looked up; a deleted account or a store error renders the page signed out.
async fn current_username(state: &AppState, session: &SessionContext) -> Option<String> {
    let id = session.user_id()?;
    match state.repo.get_user(id).await {
        Ok(Some(user)) => Some(user.username),
        Ok(None) => {
            log::warn!("Session refers to unknown user {id}");
            None
        }
        Err(err) => {
            log::warn!("Could not load user {id} for the nav bar: {err}");
            None
        }
    }
}

fn parse_id(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw).ok()
}

fn redirect(location: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location))
        .finish()
}

fn render<T: Template>(template: &T) -> HttpResponse {
    render_with_status(StatusCode::OK, template)
}

fn render_with_status<T: Template>(status: StatusCode, template: &T) -> HttpResponse {
    match template.render() {
        Ok(html) => HttpResponse::build(status)
            .content_type("text/html; charset=utf-8")
            .body(html),
        Err(err) => {
            log::error!("Template rendering failed: {err}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

fn page_not_found(current_user: Option<String>, what: &str) -> HttpResponse {
    render_with_status(
        StatusCode::NOT_FOUND,
        &NotFoundTemplate { current_user, what: what.to_string() },
    )
}

fn server_error(current_user: Option<String>) -> HttpResponse {
    render_with_status(StatusCode::INTERNAL_SERVER_ERROR, &ErrorTemplate { current_user })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id_rejects_garbage() {
        assert!(parse_id("not-a-uuid").is_none());
        assert!(parse_id("507f1f77bcf86cd799439011").is_none());
        let id = Uuid::now_v7();
        assert_eq!(parse_id(&id.to_string()), Some(id));
    }

    #[test]
    fn test_redirect_uses_see_other() {
        let resp = redirect("/home");
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(resp.headers().get(header::LOCATION).unwrap(), "/home");
    }
}
