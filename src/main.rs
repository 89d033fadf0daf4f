use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use splitledger::config::Config;
use splitledger::memory::InMemoryStore;
use splitledger::mongo::MongoStore;
use splitledger::repository::Store;
use splitledger::{routes, seed, BudgetService};

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "splitledger=info,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn open_store(config: &Config) -> std::io::Result<Arc<dyn Store>> {
    if let Some(uri) = &config.mongodb_uri {
        info!(database = %config.mongodb_db, "using MongoDB store");
        let store = MongoStore::connect(uri, &config.mongodb_db)
            .await
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err))?;
        return Ok(Arc::new(store));
    }

    info!(latency = ?config.simulated_latency, "using in-memory store");
    let store = InMemoryStore::with_latency(config.simulated_latency);
    if config.seed_demo {
        if let Err(err) = seed::load_demo(&store).await {
            error!(%err, "couldn't load demo data");
        }
    }
    Ok(Arc::new(store))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    init_tracing();

    let config = Config::from_env();
    let store = open_store(&config).await?;
    let service = web::Data::new(BudgetService::new(store, config.local_member.clone()));

    info!(addr = %config.bind_addr, port = config.port, "listening");
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(Cors::permissive())
            .app_data(service.clone())
            .configure(routes::configure)
    })
    .bind((config.bind_addr.as_str(), config.port))?
    .run()
    .await
}
