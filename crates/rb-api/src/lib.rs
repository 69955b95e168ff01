//! # rb-api
//!
//! The web routing and orchestration layer for Rusty-Blog.

pub mod handlers;
pub mod middleware;
pub mod session;

use actix_files::Files;
use actix_web::body::BoxBody;
use actix_web::cookie::Key;
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{web, App};

pub use handlers::AppState;

/// Configures the routes for the blog.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(handlers::index))
        .service(
            web::resource("/registration")
                .route(web::get().to(handlers::registration_form))
                .route(web::post().to(handlers::register)),
        )
        .service(
            web::resource("/login")
                .route(web::get().to(handlers::login_form))
                .route(web::post().to(handlers::login)),
        )
        .route("/logout", web::post().to(handlers::logout))
        .route("/home", web::get().to(handlers::home))
        .route("/about", web::get().to(handlers::about))
        .route("/contact", web::get().to(handlers::contact))
        .service(
            web::resource("/compose")
                .route(web::get().to(handlers::compose_form))
                .route(web::post().to(handlers::compose)),
        )
        .route("/posts/{post_id}", web::get().to(handlers::show_post))
        .route("/tags/{tag_id}", web::get().to(handlers::show_tag))
        .route("/categories/{categories_id}", web::get().to(handlers::show_category));
}

/// Assembles the full application. Called once per worker.
///
/// Static assets are mounted under `/static` when `static_dir` is given;
/// everything else runs behind the session and security-header middleware.
pub fn build_app(
    state: web::Data<AppState>,
    session_key: Key,
    cookie_secure: bool,
    static_dir: Option<&str>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<BoxBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let mut app = App::new().app_data(state);
    if let Some(dir) = static_dir {
        app = app.service(Files::new("/static", dir));
    }

    app.service(
        web::scope("")
            .wrap(middleware::session_middleware(session_key, cookie_secure))
            .wrap(middleware::security_headers())
            .configure(configure_routes)
            .default_service(web::to(handlers::not_found)),
    )
}
