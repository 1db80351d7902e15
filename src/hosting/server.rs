use super::handlers;
use crate::Shutdown;
use crate::store::Database;
use crate::table::Table;
use actix_cors::Cors;
use actix_web::App;
use actix_web::HttpServer;
use actix_web::middleware::Logger;
use actix_web::web;
use std::sync::Arc;
use std::time::Duration;

#[rustfmt::skip]
pub fn routes<D: Database>(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(handlers::health::<D>))
        .route("/card", web::post().to(handlers::card::<D>))
        .route("/device/boot", web::post().to(handlers::boot::<D>))
        .route("/ws", web::get().to(handlers::ws::<D>))
        .service(
            web::scope("/admin")
                .route("/antenna", web::get().to(handlers::antennas::<D>))
                .route("/antenna/{id}", web::post().to(handlers::assign::<D>))
                .route("/antenna/{id}", web::delete().to(handlers::remove_antenna::<D>))
                .route("/player", web::get().to(handlers::players::<D>))
                .route("/player/{id}", web::post().to(handlers::rename::<D>))
                .route("/player/{id}/hand", web::get().to(handlers::hand::<D>))
                .route("/player/{id}/hand", web::delete().to(handlers::muck::<D>))
                .route("/game", web::delete().to(handlers::clear::<D>))
                .route("/history", web::get().to(handlers::history::<D>)),
        );
}

pub struct Server;

impl Server {
    /// Serve until shutdown is requested, then drain in-flight requests for
    /// at most `grace`.
    pub async fn run<D: Database>(table: Arc<Table<D>>, bind: &str, grace: Duration) -> Result<(), std::io::Error> {
        let mut shutdown: Shutdown = table.shutdown();
        let state = web::Data::from(table);
        log::info!("starting table server on {}", bind);
        let server = HttpServer::new(move || {
            App::new()
                .wrap(Logger::new("%r %s %Ts"))
                .wrap(
                    Cors::default()
                        .allow_any_origin()
                        .allow_any_method()
                        .allow_any_header(),
                )
                .app_data(state.clone())
                .configure(routes::<D>)
        })
        .disable_signals()
        .shutdown_timeout(grace.as_secs())
        .bind(bind)?
        .run();
        let handle = server.handle();
        tokio::spawn(async move {
            crate::stopped(&mut shutdown).await;
            log::info!("draining http server");
            handle.stop(true).await;
        });
        server.await
    }
}
