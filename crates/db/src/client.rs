use bson::doc;
use huddle_config::DatabaseSettings;
use mongodb::{Client, Database};
use tracing::info;

/// Connects to MongoDB and verifies the connection with a ping.
pub async fn connect(settings: &DatabaseSettings) -> Result<Database, mongodb::error::Error> {
    let client = Client::with_uri_str(&settings.url).await?;
    let db = client.database(&settings.name);
    db.run_command(doc! { "ping": 1 }).await?;
    info!(db = %settings.name, "Connected to MongoDB");
    Ok(db)
}
