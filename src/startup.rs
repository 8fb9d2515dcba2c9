use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::net::TcpListener;
use std::sync::Arc;

use crate::auth::{spawn_refresh_token_sweeper, JwtKeys};
use crate::configuration::{DatabaseSettings, Settings};
use crate::middleware::{JwtMiddleware, RequestLogger};
use crate::routes::{
    create_category, create_post, current_user, delete_post, get_own_post, get_post,
    health_check, hot_posts, latest_posts, list_categories, list_posts, login, logout, refresh,
    sessions, update_post,
};
use crate::state::AppState;

/// A bound, not yet running server
pub struct Application {
    port: u16,
    server: Server,
}

impl Application {
    /// Connect to Postgres, apply migrations, build signing keys, start the
    /// refresh token sweeper, and bind the listener.
    pub async fn build(configuration: Settings) -> Result<Self, std::io::Error> {
        let pool = get_connection_pool(&configuration.database);

        tracing::info!("Applying database migrations");
        sqlx::migrate!("./migrations").run(&pool).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to apply migrations");
            std::io::Error::new(std::io::ErrorKind::Other, e)
        })?;

        let keys = JwtKeys::from_settings(&configuration.jwt).map_err(|e| {
            tracing::error!(error = %e, "Failed to build JWT signing keys");
            std::io::Error::new(std::io::ErrorKind::InvalidInput, e)
        })?;
        let state = AppState::postgres(pool, Arc::new(keys), &configuration.jwt);

        spawn_refresh_token_sweeper(
            state.auth.clone(),
            configuration.maintenance.sweep_interval(),
        );

        let address = format!(
            "{}:{}",
            configuration.application.host, configuration.application.port
        );
        let listener = TcpListener::bind(&address)?;
        let port = listener.local_addr()?.port();
        tracing::info!(%address, port, "Server listening");

        let server = run(listener, state)?;
        Ok(Self { port, server })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        self.server.await
    }
}

/// Lazily connecting pool; the first query opens connections.
pub fn get_connection_pool(configuration: &DatabaseSettings) -> PgPool {
    PgPoolOptions::new()
        .max_connections(configuration.max_connections)
        .min_connections(configuration.min_connections)
        .max_lifetime(configuration.max_lifetime())
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect_lazy_with(configuration.with_db())
}

pub fn run(listener: TcpListener, state: AppState) -> Result<Server, std::io::Error> {
    let auth = web::Data::from(state.auth.clone());
    let users = web::Data::from(state.users.clone());
    let posts = web::Data::from(state.posts.clone());
    let categories = web::Data::from(state.categories.clone());
    let refresh_cookie = web::Data::new(state.refresh_cookie.clone());
    let keys = state.keys.clone();

    let server = HttpServer::new(move || {
        App::new()
            .wrap(RequestLogger)
            .app_data(auth.clone())
            .app_data(users.clone())
            .app_data(posts.clone())
            .app_data(categories.clone())
            .app_data(refresh_cookie.clone())
            // Public routes (no authentication required)
            .route("/health_check", web::get().to(health_check))
            .route("/login", web::post().to(login))
            .service(
                web::resource("/auth/refresh")
                    .route(web::post().to(refresh))
                    .route(web::delete().to(logout)),
            )
            .service(
                web::scope("/api")
                    // Protected routes (require JWT authentication)
                    .service(
                        web::scope("/admin")
                            .wrap(JwtMiddleware::new(keys.clone()))
                            .route("/user", web::get().to(current_user))
                            .route("/sessions", web::get().to(sessions))
                            .route("/categories", web::post().to(create_category))
                            .route("/posts", web::post().to(create_post))
                            .route("/posts/{id}", web::get().to(get_own_post))
                            .route("/posts/{id}", web::put().to(update_post))
                            .route("/posts/{id}", web::delete().to(delete_post)),
                    )
                    .route("/categories", web::get().to(list_categories))
                    .route("/posts", web::get().to(list_posts))
                    .route("/posts/hot", web::get().to(hot_posts))
                    .route("/posts/latest", web::get().to(latest_posts))
                    .route("/posts/{id}", web::get().to(get_post)),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
