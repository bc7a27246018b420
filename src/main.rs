use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use clap::Parser;
use log::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod api;
mod blockchain;
mod config;

use blockchain::policy::spawn_interval_sealer;
use blockchain::{Ledger, SealPolicy};
use config::Cli;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::get_chain,
        api::handlers::get_pending_votes,
        api::handlers::new_vote,
        api::handlers::seal_block,
        api::handlers::validate_chain
    ),
    components(
        schemas(
            blockchain::Block,
            blockchain::Vote,
            api::handlers::ChainResponse,
            api::handlers::VoteRequest,
            api::handlers::VoteResponse,
            api::handlers::SealResponse
        )
    ),
    tags(
        (name = "ledger", description = "Voting ledger API endpoints")
    ),
    info(
        title = "Vote Ledger API",
        version = "1.0.0",
        description = "A blockchain-backed voting ledger API",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    )
)]
struct ApiDoc;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let cli = Cli::parse();
    let ledger = Ledger::new(cli.ledger_config());

    if let SealPolicy::Interval(period) = ledger.seal_policy() {
        info!("Sealing pending votes every {}s", period.as_secs());
        spawn_interval_sealer(ledger.clone(), period);
    }

    let ledger = web::Data::new(ledger);

    info!("Starting HTTP server at http://{}", cli.bind);

    // Start HTTP server
    HttpServer::new(move || {
        // Configure CORS
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        // Configure OpenAPI documentation
        let openapi = ApiDoc::openapi();

        App::new()
            .wrap(middleware::Logger::default())
            .wrap(cors)
            .app_data(ledger.clone())
            // Ballot page and API routes
            .configure(api::configure_routes)
            // Swagger UI
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi.clone())
            )
    })
    .bind(cli.bind.as_str())?
    .run()
    .await?;

    Ok(())
}
