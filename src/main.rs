use std::io;
use std::sync::Arc;

use actix_cors::Cors;
use actix_governor::{Governor, GovernorConfigBuilder};
use actix_web::{middleware::Logger, web, App, HttpServer};

use kieru::config::Config;
use kieru::errors::ConfigError;
use kieru::store::{self, MemoryStore, NoteStore, PgStore};
use kieru::{handlers, NoteExchange};

fn open_store(config: &Config) -> io::Result<Arc<dyn NoteStore>> {
    match &config.database_url {
        Some(url) => {
            let store = PgStore::connect_lazy(url, config.db_pool_size);
            store
                .run_migrations()
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
            log::info!("using postgres note store");
            Ok(Arc::new(store))
        }
        None => {
            log::warn!("DATABASE_URL not set, notes will only live in memory");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::from_env().map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    let note_store = open_store(&config)?;

    store::spawn_expiry_sweeper(note_store.clone(), config.cleanup_interval);

    let exchange = web::Data::new(NoteExchange::with_ttl(note_store, config.note_ttl));
    let governor = GovernorConfigBuilder::default()
        .per_millisecond(config.rate_limit_replenish.as_millis() as u64)
        .burst_size(config.rate_limit_burst)
        .finish()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, ConfigError::RateLimit))?;

    log::info!("unread notes expire after {}s", exchange.ttl().as_secs());
    log::info!("listening on {}:{}", config.host, config.port);

    HttpServer::new(move || {
        App::new()
            .app_data(exchange.clone())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .wrap(Governor::new(&governor))
            .wrap(Logger::default())
            .configure(handlers::configure)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
