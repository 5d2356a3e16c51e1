use std::{env, str::FromStr};

use secrecy::{ExposeSecret, SecretString};

use crate::errors::{AppError, AppResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    Mongo,
}

impl FromStr for StorageBackend {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "in-memory" => Ok(StorageBackend::Memory),
            "mongo" | "mongodb" => Ok(StorageBackend::Mongo),
            other => Err(AppError::ValidationError(format!(
                "Unknown storage backend '{}'",
                other
            ))),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub mongo_conn_string: SecretString,
    pub mongo_db_name: String,
    pub web_server_host: String,
    pub web_server_port: u16,
    pub storage_backend: StorageBackend,
    pub quiz_fixtures_path: Option<String>,
    pub attempts_collection: String,
    pub quizzes_collection: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            mongo_conn_string: SecretString::from(
                env::var("MONGO_CONN_STRING")
                    .unwrap_or_else(|_| "mongodb://localhost:27017".to_string()),
            ),
            mongo_db_name: env::var("MONGO_DB_NAME").unwrap_or_else(|_| "kambaz-local".to_string()),
            web_server_host: env::var("WEB_SERVER_HOST")
                .unwrap_or_else(|_| "localhost".to_string()),
            web_server_port: env::var("WEB_SERVER_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            storage_backend: env::var("STORAGE_BACKEND")
                .ok()
                .and_then(|b| b.parse().ok())
                .unwrap_or(StorageBackend::Memory),
            quiz_fixtures_path: env::var("QUIZ_FIXTURES_PATH").ok().filter(|p| !p.is_empty()),
            attempts_collection: env::var("ATTEMPTS_COLLECTION")
                .unwrap_or_else(|_| "quiz_attempts".to_string()),
            quizzes_collection: env::var("QUIZZES_COLLECTION")
                .unwrap_or_else(|_| "quizzes".to_string()),
        }
    }

    /// Rejects settings the server cannot start with.
    pub fn validate(&self) -> AppResult<()> {
        if self.web_server_port == 0 {
            return Err(AppError::ValidationError(
                "WEB_SERVER_PORT must be a non-zero port".to_string(),
            ));
        }

        if self.storage_backend == StorageBackend::Mongo
            && self.mongo_conn_string.expose_secret().trim().is_empty()
        {
            return Err(AppError::ValidationError(
                "MONGO_CONN_STRING must be set when STORAGE_BACKEND=mongo".to_string(),
            ));
        }

        Ok(())
    }

    pub fn test_config() -> Self {
        Self {
            mongo_conn_string: SecretString::from("mongodb://localhost:27017".to_string()),
            mongo_db_name: "kambaz-test".to_string(),
            web_server_host: "127.0.0.1".to_string(),
            web_server_port: 8080,
            storage_backend: StorageBackend::Memory,
            quiz_fixtures_path: None,
            attempts_collection: "quiz_attempts".to_string(),
            quizzes_collection: "quizzes".to_string(),
        }
    }
}
