use std::time::Duration;

use mongodb::{bson::doc, options::ClientOptions, Client, Collection};
use secrecy::ExposeSecret;

use crate::{config::Config, errors::AppResult};

const APP_NAME: &str = "kambaz-quiz-server";

/// Handle on the quiz database. Cloning shares the underlying connection pool.
#[derive(Clone)]
pub struct Database {
    inner: mongodb::Database,
}

impl Database {
    /// Parses the connection string and pings the target database before
    /// handing out a handle, so a bad URI fails at startup.
    pub async fn connect(config: &Config) -> AppResult<Self> {
        let mut options = ClientOptions::parse(config.mongo_conn_string.expose_secret()).await?;
        options.app_name = Some(APP_NAME.to_string());
        options.connect_timeout = Some(Duration::from_secs(5));
        options.server_selection_timeout = Some(Duration::from_secs(5));

        let inner = Client::with_options(options)?.database(&config.mongo_db_name);
        inner.run_command(doc! { "ping": 1 }).await?;

        log::info!("Connected to MongoDB database '{}'", inner.name());
        Ok(Self { inner })
    }

    pub fn collection<T>(&self, name: &str) -> Collection<T>
    where
        T: Send + Sync,
    {
        self.inner.collection(name)
    }

    pub async fn health_check(&self) -> AppResult<()> {
        self.inner.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }
}
