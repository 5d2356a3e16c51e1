use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::doc,
    error::{ErrorKind, WriteFailure},
    options::IndexOptions,
    Collection, IndexModel,
};
use tokio::sync::RwLock;

use crate::{
    db::Database,
    errors::{AppError, AppResult},
    models::domain::QuizAttempt,
};

/// Durable store of quiz attempts, keyed by attempt id.
///
/// `save` is a compare-and-swap: it only succeeds while the stored attempt is
/// still open and carries the caller's `revision`, and it returns the stored
/// copy with the bumped revision.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuizAttemptRepository: Send + Sync {
    async fn create(&self, attempt: QuizAttempt) -> AppResult<QuizAttempt>;
    async fn find_by_id(&self, id: &str) -> AppResult<Option<QuizAttempt>>;
    async fn find_open(&self, user_id: &str, quiz_id: &str) -> AppResult<Option<QuizAttempt>>;
    async fn list_sealed(&self, user_id: &str, quiz_id: &str) -> AppResult<Vec<QuizAttempt>>;
    async fn list_by_user_and_quiz(
        &self,
        user_id: &str,
        quiz_id: &str,
    ) -> AppResult<Vec<QuizAttempt>>;
    async fn count_user_attempts(&self, user_id: &str, quiz_id: &str) -> AppResult<usize>;
    async fn save(&self, attempt: QuizAttempt) -> AppResult<QuizAttempt>;
}

pub struct MongoQuizAttemptRepository {
    collection: Collection<QuizAttempt>,
}

impl MongoQuizAttemptRepository {
    pub fn new(db: &Database, collection_name: &str) -> Self {
        let collection = db.collection(collection_name);
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for quiz attempts collection");

        let id_index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("id_unique".to_string())
                    .build(),
            )
            .build();

        // two racing starts compute the same attempt number; only one insert wins
        let attempt_number_index = IndexModel::builder()
            .keys(doc! { "userId": 1, "quizId": 1, "attemptNumber": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("user_quiz_attempt_number".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(id_index).await?;
        self.collection.create_index(attempt_number_index).await?;

        log::info!("Successfully created indexes for quiz attempts collection");
        Ok(())
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == 11000
    )
}

#[async_trait]
impl QuizAttemptRepository for MongoQuizAttemptRepository {
    async fn create(&self, attempt: QuizAttempt) -> AppResult<QuizAttempt> {
        if let Some(open) = self.find_open(&attempt.user_id, &attempt.quiz_id).await? {
            return Err(AppError::AttemptInProgress(format!(
                "Attempt '{}' is still open",
                open.id
            )));
        }

        match self.collection.insert_one(&attempt).await {
            Ok(_) => Ok(attempt),
            Err(err) if is_duplicate_key(&err) => Err(AppError::AttemptInProgress(format!(
                "Attempt {} for quiz '{}' was started concurrently",
                attempt.attempt_number, attempt.quiz_id
            ))),
            Err(err) => Err(err.into()),
        }
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<QuizAttempt>> {
        let attempt = self.collection.find_one(doc! { "id": id }).await?;
        Ok(attempt)
    }

    async fn find_open(&self, user_id: &str, quiz_id: &str) -> AppResult<Option<QuizAttempt>> {
        let attempt = self
            .collection
            .find_one(doc! {
                "userId": user_id,
                "quizId": quiz_id,
                "endTime": null
            })
            .await?;
        Ok(attempt)
    }

    async fn list_sealed(&self, user_id: &str, quiz_id: &str) -> AppResult<Vec<QuizAttempt>> {
        let attempts = self
            .collection
            .find(doc! {
                "userId": user_id,
                "quizId": quiz_id,
                "endTime": { "$ne": null }
            })
            .sort(doc! { "attemptNumber": 1 })
            .await?
            .try_collect()
            .await?;
        Ok(attempts)
    }

    async fn list_by_user_and_quiz(
        &self,
        user_id: &str,
        quiz_id: &str,
    ) -> AppResult<Vec<QuizAttempt>> {
        let attempts = self
            .collection
            .find(doc! { "userId": user_id, "quizId": quiz_id })
            .sort(doc! { "attemptNumber": 1 })
            .await?
            .try_collect()
            .await?;
        Ok(attempts)
    }

    async fn count_user_attempts(&self, user_id: &str, quiz_id: &str) -> AppResult<usize> {
        let count = self
            .collection
            .count_documents(doc! { "userId": user_id, "quizId": quiz_id })
            .await?;
        Ok(count as usize)
    }

    async fn save(&self, attempt: QuizAttempt) -> AppResult<QuizAttempt> {
        let mut next = attempt.clone();
        next.revision += 1;

        let result = self
            .collection
            .replace_one(
                doc! {
                    "id": &attempt.id,
                    "revision": attempt.revision,
                    "endTime": null
                },
                &next,
            )
            .await?;

        if result.matched_count == 1 {
            return Ok(next);
        }

        match self.find_by_id(&attempt.id).await? {
            None => Err(AppError::NotFound(format!(
                "Attempt with id '{}' not found",
                attempt.id
            ))),
            Some(stored) => Err(AppError::StorageConflict(format!(
                "Attempt '{}' changed underneath this write (stored revision {}, sealed: {})",
                attempt.id,
                stored.revision,
                stored.is_sealed()
            ))),
        }
    }
}

/// Process-local attempt store.
#[derive(Default)]
pub struct InMemoryQuizAttemptRepository {
    attempts: Arc<RwLock<HashMap<String, QuizAttempt>>>,
}

impl InMemoryQuizAttemptRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn sorted_by_number(mut items: Vec<QuizAttempt>) -> Vec<QuizAttempt> {
    items.sort_by_key(|a| a.attempt_number);
    items
}

#[async_trait]
impl QuizAttemptRepository for InMemoryQuizAttemptRepository {
    async fn create(&self, attempt: QuizAttempt) -> AppResult<QuizAttempt> {
        let mut attempts = self.attempts.write().await;
        if attempts.contains_key(&attempt.id) {
            return Err(AppError::StorageConflict(format!(
                "Attempt with id '{}' already exists",
                attempt.id
            )));
        }

        let clash = attempts.values().find(|a| {
            a.user_id == attempt.user_id
                && a.quiz_id == attempt.quiz_id
                && (!a.is_sealed() || a.attempt_number == attempt.attempt_number)
        });
        if let Some(existing) = clash {
            return Err(AppError::AttemptInProgress(format!(
                "Attempt '{}' already holds this slot",
                existing.id
            )));
        }

        attempts.insert(attempt.id.clone(), attempt.clone());
        Ok(attempt)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<QuizAttempt>> {
        let attempts = self.attempts.read().await;
        Ok(attempts.get(id).cloned())
    }

    async fn find_open(&self, user_id: &str, quiz_id: &str) -> AppResult<Option<QuizAttempt>> {
        let attempts = self.attempts.read().await;
        Ok(attempts
            .values()
            .find(|a| a.user_id == user_id && a.quiz_id == quiz_id && !a.is_sealed())
            .cloned())
    }

    async fn list_sealed(&self, user_id: &str, quiz_id: &str) -> AppResult<Vec<QuizAttempt>> {
        let attempts = self.attempts.read().await;
        Ok(sorted_by_number(
            attempts
                .values()
                .filter(|a| a.user_id == user_id && a.quiz_id == quiz_id && a.is_sealed())
                .cloned()
                .collect(),
        ))
    }

    async fn list_by_user_and_quiz(
        &self,
        user_id: &str,
        quiz_id: &str,
    ) -> AppResult<Vec<QuizAttempt>> {
        let attempts = self.attempts.read().await;
        Ok(sorted_by_number(
            attempts
                .values()
                .filter(|a| a.user_id == user_id && a.quiz_id == quiz_id)
                .cloned()
                .collect(),
        ))
    }

    async fn count_user_attempts(&self, user_id: &str, quiz_id: &str) -> AppResult<usize> {
        let attempts = self.attempts.read().await;
        Ok(attempts
            .values()
            .filter(|a| a.user_id == user_id && a.quiz_id == quiz_id)
            .count())
    }

    async fn save(&self, attempt: QuizAttempt) -> AppResult<QuizAttempt> {
        let mut attempts = self.attempts.write().await;
        let stored = attempts.get(&attempt.id).ok_or_else(|| {
            AppError::NotFound(format!("Attempt with id '{}' not found", attempt.id))
        })?;

        if stored.is_sealed() || stored.revision != attempt.revision {
            return Err(AppError::StorageConflict(format!(
                "Attempt '{}' changed underneath this write (stored revision {}, sealed: {})",
                attempt.id,
                stored.revision,
                stored.is_sealed()
            )));
        }

        let mut next = attempt;
        next.revision += 1;
        attempts.insert(next.id.clone(), next.clone());
        Ok(next)
    }
}
