//! Shared fixtures for the HTTP tests.
#![allow(dead_code)]

use actix_web::cookie::Cookie;
use actix_web::dev::ServiceResponse;
use actix_web::http::header;
use actix_web::web;
use rb_api::middleware::SESSION_COOKIE;
use rb_api::AppState;
use rb_auth_simple::SimpleAuthProvider;
use rb_db_sqlite::SqliteBlogRepo;

/// Fresh in-memory store with the cheapest bcrypt cost.
pub async fn sqlite_state() -> web::Data<AppState> {
    let repo = SqliteBlogRepo::new("sqlite::memory:")
        .await
        .expect("in-memory store");
    let auth = SimpleAuthProvider::new(4).expect("valid cost");
    web::Data::new(AppState {
        repo: Box::new(repo),
        auth: Box::new(auth),
    })
}

pub fn location<B>(resp: &ServiceResponse<B>) -> String {
    resp.headers()
        .get(header::LOCATION)
        .expect("redirect carries a Location header")
        .to_str()
        .expect("ascii location")
        .to_owned()
}

pub fn session_cookie<B>(resp: &ServiceResponse<B>) -> Cookie<'static> {
    resp.response()
        .cookies()
        .find(|cookie| cookie.name() == SESSION_COOKIE)
        .expect("session cookie set")
        .into_owned()
}

/// Registers an account through the form and returns the session cookie.
#[allow(unused_macros)]
macro_rules! sign_up {
    ($app:expr, $username:expr, $password:expr) => {{
        let resp = actix_web::test::call_service(
            $app,
            actix_web::test::TestRequest::post()
                .uri("/registration")
                .set_form([
                    ("name", "Test User"),
                    ("address", "1 Test Street"),
                    ("username", $username),
                    ("password", $password),
                ])
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::SEE_OTHER);
        assert_eq!(common::location(&resp), "/home");
        common::session_cookie(&resp)
    }};
}
