use std::sync::Arc;

use actix_web::{App, HttpServer};
use anyhow::Context;
use paperclip::actix::{web, OpenApiExt};
use tracing_actix_web::TracingLogger;

use bookinventory_repository::app_config::config_app;
use bookinventory_repository::books_repository::{
    BookRepository, InMemoryBookRepository, PostgresBooksRepository,
};
use bookinventory_repository::settings::Settings;
use bookinventory_repository::telemetry::init_telemetry;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    init_telemetry("bookinventory_repository")?;
    let settings = Settings::load()?;
    tracing::info!(
        "starting HTTP server at http://{}:{}",
        settings.host,
        settings.port
    );

    let books_repository: Arc<dyn BookRepository> = if settings.use_in_memory_db {
        Arc::new(InMemoryBookRepository::default())
    } else {
        Arc::new(
            PostgresBooksRepository::init(settings.postgres_config())
                .await
                .context("Failed to init postgres")?,
        )
    };

    HttpServer::new(move || {
        App::new()
            .wrap_api()
            .app_data(web::Data::new(books_repository.clone()))
            .wrap(TracingLogger::default())
            .configure(config_app)
            .with_json_spec_at("/apispec/v2")
            .build()
    })
    .bind((settings.host.as_str(), settings.port))?
    .run()
    .await?;
    Ok(())
}
