use std::sync::Arc;

use crate::{
    config::{Config, StorageBackend},
    db::Database,
    errors::AppResult,
    repositories::{
        InMemoryQuizAttemptRepository, InMemoryQuizRepository, MongoQuizAttemptRepository,
        MongoQuizRepository, QuizAttemptRepository, QuizRepository,
    },
    services::QuizAttemptService,
};

#[derive(Clone)]
pub struct AppState {
    pub quiz_attempt_service: Arc<QuizAttemptService>,
    /// Present only for the MongoDB backend.
    pub db: Option<Database>,
    pub config: Arc<Config>,
}

impl AppState {
    pub async fn new(config: Config) -> AppResult<Self> {
        match config.storage_backend {
            StorageBackend::Memory => {
                log::info!("Using in-memory storage");
                let quizzes = match &config.quiz_fixtures_path {
                    Some(path) => InMemoryQuizRepository::from_fixtures_file(path).await?,
                    None => InMemoryQuizRepository::new(),
                };
                Ok(Self::from_repositories(
                    config,
                    Arc::new(quizzes),
                    Arc::new(InMemoryQuizAttemptRepository::new()),
                ))
            }
            StorageBackend::Mongo => {
                let db = Database::connect(&config).await?;

                let quiz_repository = MongoQuizRepository::new(&db, &config.quizzes_collection);
                quiz_repository.ensure_indexes().await?;
                if let Some(path) = &config.quiz_fixtures_path {
                    let fixtures = InMemoryQuizRepository::from_fixtures_file(path).await?;
                    for quiz in fixtures.all().await {
                        quiz_repository.upsert(quiz).await?;
                    }
                }

                let attempt_repository =
                    MongoQuizAttemptRepository::new(&db, &config.attempts_collection);
                attempt_repository.ensure_indexes().await?;

                let mut state = Self::from_repositories(
                    config,
                    Arc::new(quiz_repository),
                    Arc::new(attempt_repository),
                );
                state.db = Some(db);
                Ok(state)
            }
        }
    }

    pub fn from_repositories(
        config: Config,
        quizzes: Arc<dyn QuizRepository>,
        attempts: Arc<dyn QuizAttemptRepository>,
    ) -> Self {
        Self::from_service(config, QuizAttemptService::new(quizzes, attempts))
    }

    pub fn from_service(config: Config, service: QuizAttemptService) -> Self {
        Self {
            quiz_attempt_service: Arc::new(service),
            db: None,
            config: Arc::new(config),
        }
    }
}
