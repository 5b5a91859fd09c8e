use mongodb::Database;
use mongodb::bson::doc;
use tracing::info;

use super::error::DatabaseError;

#[derive(Clone, Debug)]
pub struct DatabaseInstance {
    db: Database,
}

impl DatabaseInstance {
    pub async fn new(host: &str, port: i32, db_name: &str) -> Result<Self, DatabaseError> {
        let uri = format!("mongodb://{}:{}", host, port);

        info!(uri = %uri, database = %db_name, "Connecting to MongoDB");

        Self::connect(&uri, db_name).await
    }

    async fn connect(uri: &str, db_name: &str) -> Result<Self, DatabaseError> {
        let client = mongodb::Client::with_uri_str(uri).await?;
        Ok(Self { db: client.database(db_name) })
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Round-trip a ping to the server.
    pub async fn ping(&self) -> Result<(), DatabaseError> {
        self.db
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| DatabaseError::Query(format!("Ping failed: {}", e)))?;
        Ok(())
    }
}
