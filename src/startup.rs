use actix_web::dev::Server;
use actix_web::{middleware::Logger, web, App, HttpServer};
use std::net::TcpListener;

use crate::auth::AuthService;
use crate::logger::LoggerMiddleware;
use crate::middleware::RequireIdentity;
use crate::routes::{create_user, health_check, login, me, refresh, revoke, update_user};

pub fn run(listener: TcpListener, auth: AuthService) -> Result<Server, std::io::Error> {
    let auth = web::Data::new(auth);

    let server = HttpServer::new(move || {
        App::new()
            // Global middleware
            .wrap(Logger::default())
            .wrap(LoggerMiddleware)

            // Shared state
            .app_data(auth.clone())

            // Public routes
            .route("/api/healthz", web::get().to(health_check))
            .route("/api/login", web::post().to(login))
            .route("/api/refresh", web::post().to(refresh))
            .route("/api/revoke", web::post().to(revoke))
            .service(
                web::resource("/api/users")
                    .route(web::post().to(create_user))
                    // Checks its own bearer token through the service
                    .route(web::put().to(update_user)),
            )

            // Protected routes (require a valid access token)
            .service(
                web::resource("/api/me")
                    .route(web::get().to(me))
                    .wrap(RequireIdentity::new(auth.clone())),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
