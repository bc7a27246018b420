use actix_web::web;

use super::{handlers, pages};

/// Configures the ballot page and the API routes
///
/// # Arguments
///
/// * `cfg` - The service configuration
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(pages::index))
        .route("/add_vote", web::post().to(pages::add_vote))
        .service(
            web::scope("/api/v1")
                .route("/chain", web::get().to(handlers::get_chain))
                .route("/votes/pending", web::get().to(handlers::get_pending_votes))
                .route("/votes/new", web::post().to(handlers::new_vote))
                .route("/seal", web::post().to(handlers::seal_block))
                .route("/validate", web::get().to(handlers::validate_chain)),
        );
}
