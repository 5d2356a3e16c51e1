use std::{collections::HashMap, path::Path, sync::Arc};

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{bson::doc, options::IndexOptions, Collection, IndexModel};
use tokio::sync::RwLock;

use crate::{db::Database, errors::AppResult, models::domain::Quiz};

/// Read side of quiz definitions, plus an upsert used for seeding.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuizRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<Quiz>>;
    async fn list_by_course(&self, course_id: &str) -> AppResult<Vec<Quiz>>;
    async fn upsert(&self, quiz: Quiz) -> AppResult<Quiz>;
}

pub struct MongoQuizRepository {
    collection: Collection<Quiz>,
}

impl MongoQuizRepository {
    pub fn new(db: &Database, collection_name: &str) -> Self {
        let collection = db.collection(collection_name);
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for quizzes collection");

        let id_index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("id_unique".to_string())
                    .build(),
            )
            .build();

        let course_index = IndexModel::builder()
            .keys(doc! { "courseId": 1 })
            .options(IndexOptions::builder().name("course_id".to_string()).build())
            .build();

        self.collection.create_index(id_index).await?;
        self.collection.create_index(course_index).await?;

        log::info!("Successfully created indexes for quizzes collection");
        Ok(())
    }
}

#[async_trait]
impl QuizRepository for MongoQuizRepository {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<Quiz>> {
        let quiz = self.collection.find_one(doc! { "id": id }).await?;
        Ok(quiz)
    }

    async fn list_by_course(&self, course_id: &str) -> AppResult<Vec<Quiz>> {
        let quizzes = self
            .collection
            .find(doc! { "courseId": course_id })
            .sort(doc! { "title": 1 })
            .await?
            .try_collect()
            .await?;
        Ok(quizzes)
    }

    async fn upsert(&self, quiz: Quiz) -> AppResult<Quiz> {
        quiz.check_definition()?;
        self.collection
            .replace_one(doc! { "id": &quiz.id }, &quiz)
            .upsert(true)
            .await?;
        Ok(quiz)
    }
}

/// Process-local quiz definitions, optionally seeded from a JSON fixture file.
#[derive(Default)]
pub struct InMemoryQuizRepository {
    quizzes: Arc<RwLock<HashMap<String, Quiz>>>,
}

impl InMemoryQuizRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a JSON array of quizzes, skipping malformed definitions.
    pub async fn from_fixtures_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await?;
        let quizzes: Vec<Quiz> = serde_json::from_str(&raw)?;

        let repo = Self::new();
        let mut loaded = 0;
        for quiz in quizzes {
            let id = quiz.id.clone();
            match repo.upsert(quiz).await {
                Ok(_) => loaded += 1,
                Err(err) => log::warn!("Skipping quiz fixture '{}': {}", id, err),
            }
        }

        log::info!("Loaded {} quiz definitions from {}", loaded, path.display());
        Ok(repo)
    }

    pub async fn all(&self) -> Vec<Quiz> {
        self.quizzes.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl QuizRepository for InMemoryQuizRepository {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<Quiz>> {
        let quizzes = self.quizzes.read().await;
        Ok(quizzes.get(id).cloned())
    }

    async fn list_by_course(&self, course_id: &str) -> AppResult<Vec<Quiz>> {
        let quizzes = self.quizzes.read().await;
        let mut items: Vec<_> = quizzes
            .values()
            .filter(|q| q.course_id == course_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(items)
    }

    async fn upsert(&self, quiz: Quiz) -> AppResult<Quiz> {
        quiz.check_definition()?;
        let mut quizzes = self.quizzes.write().await;
        quizzes.insert(quiz.id.clone(), quiz.clone());
        Ok(quiz)
    }
}
