//! Session helpers to keep HTTP handlers free of framework-specific logic.
//!
//! The cookie carries only the signed-in user's id. Everything else about the
//! account is read from the store per request, so the cookie stays a fixed size.

use actix_session::Session;
use actix_web::{dev::Payload, FromRequest, HttpRequest};
use futures_util::future::LocalBoxFuture;
use rb_core::error::{AppError, Result};
use rb_core::models::User;
use uuid::Uuid;

pub(crate) const USER_ID_KEY: &str = "user_id";

/// Newtype wrapper that exposes higher-level session operations.
#[derive(Clone)]
pub struct SessionContext(Session);

impl SessionContext {
    pub fn new(session: Session) -> Self {
        Self(session)
    }

    /// Starts a fresh session for `user`, discarding any previous identity.
    pub fn sign_in(&self, user: &User) -> Result<()> {
        self.0.renew();
        self.0
            .insert(USER_ID_KEY, user.id)
            .map_err(|err| AppError::Internal(format!("failed to persist session: {err}")))
    }

    pub fn sign_out(&self) {
        self.0.purge();
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.0.get::<Uuid>(USER_ID_KEY).unwrap_or_else(|err| {
            log::warn!("Invalid user id in session cookie: {err}");
            None
        })
    }

    pub fn require_user_id(&self) -> Result<Uuid> {
        self.user_id()
            .ok_or_else(|| AppError::Unauthorized("login required".to_string()))
    }
}

impl FromRequest for SessionContext {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, std::result::Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let fut = Session::from_request(req, payload);
        Box::pin(async move { fut.await.map(SessionContext::new) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::{session_middleware, SESSION_COOKIE};
    use actix_web::cookie::Key;
    use actix_web::http::StatusCode;
    use actix_web::{test, web, App, HttpResponse};

    #[actix_web::test]
    async fn round_trips_signed_in_user() {
        let app = test::init_service(
            App::new()
                .wrap(session_middleware(Key::generate(), false))
                .route(
                    "/set",
                    web::get().to(|session: SessionContext| async move {
                        let user = User::new("Ada".into(), "London".into(), "ada".into(), "hash".into());
                        session.sign_in(&user).unwrap();
                        HttpResponse::Ok().body(user.id.to_string())
                    }),
                )
                .route(
                    "/get",
                    web::get().to(|session: SessionContext| async move {
                        match session.require_user_id() {
                            Ok(id) => HttpResponse::Ok().body(id.to_string()),
                            Err(_) => HttpResponse::Unauthorized().finish(),
                        }
                    }),
                ),
        )
        .await;

        let anonymous =
            test::call_service(&app, test::TestRequest::get().uri("/get").to_request()).await;
        assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

        let set_res =
            test::call_service(&app, test::TestRequest::get().uri("/set").to_request()).await;
        let cookie = set_res
            .response()
            .cookies()
            .find(|cookie| cookie.name() == SESSION_COOKIE)
            .expect("session cookie set")
            .into_owned();
        let signed_in_id = test::read_body(set_res).await;

        let get_res = test::call_service(
            &app,
            test::TestRequest::get().uri("/get").cookie(cookie).to_request(),
        )
        .await;
        assert_eq!(get_res.status(), StatusCode::OK);
        assert_eq!(test::read_body(get_res).await, signed_in_id);
    }
}
