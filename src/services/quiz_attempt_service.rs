use std::sync::Arc;

use crate::{
    errors::{AppError, AppResult},
    models::domain::{Quiz, QuizAttempt, UserRole},
    repositories::{QuizAttemptRepository, QuizRepository},
    services::{
        attempt_locks::AttemptLocks,
        attempt_policy::{AttemptCountPolicy, AttemptEligibility},
        attempt_timer::AttemptTimers,
        clock::{Clock, SystemClock},
        grading::GradingEngine,
        visibility_policy::VisibilityPolicy,
    },
};

/// Lifecycle of quiz attempts: start, resume, record answers, submit.
///
/// Every mutation of one attempt runs under that attempt's lock and ends in a
/// compare-and-swap save, so a timer-driven submit and a manual submit can
/// never both seal the same attempt.
#[derive(Clone)]
pub struct QuizAttemptService {
    quizzes: Arc<dyn QuizRepository>,
    attempts: Arc<dyn QuizAttemptRepository>,
    clock: Arc<dyn Clock>,
    timers: Arc<AttemptTimers>,
    locks: Arc<AttemptLocks>,
}

fn start_key(user_id: &str, quiz_id: &str) -> String {
    format!("start:{}:{}", user_id, quiz_id)
}

impl QuizAttemptService {
    pub fn new(quizzes: Arc<dyn QuizRepository>, attempts: Arc<dyn QuizAttemptRepository>) -> Self {
        Self::with_clock(quizzes, attempts, Arc::new(SystemClock))
    }

    pub fn with_clock(
        quizzes: Arc<dyn QuizRepository>,
        attempts: Arc<dyn QuizAttemptRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            quizzes,
            attempts,
            clock,
            timers: Arc::new(AttemptTimers::new()),
            locks: Arc::new(AttemptLocks::new()),
        }
    }

    pub async fn get_quiz(&self, quiz_id: &str) -> AppResult<Quiz> {
        self.quizzes
            .find_by_id(quiz_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Quiz with id '{}' not found", quiz_id)))
    }

    pub async fn get_attempt(&self, attempt_id: &str) -> AppResult<QuizAttempt> {
        self.attempts
            .find_by_id(attempt_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Attempt with id '{}' not found", attempt_id))
            })
    }

    /// Opens attempt number N+1 for `user_id`, where N counts every prior attempt.
    pub async fn start(&self, user_id: &str, quiz_id: &str) -> AppResult<QuizAttempt> {
        let quiz = self.get_quiz(quiz_id).await?;
        AttemptCountPolicy::check_availability(&quiz, self.clock.now())?;
        if quiz.questions.is_empty() {
            return Err(AppError::EmptyQuiz(quiz.id.clone()));
        }
        quiz.check_definition()?;
        if quiz.has_inconsistent_attempt_flags() {
            log::warn!(
                "Quiz {} has multipleAttemptsAllowed={:?} but maxAttempts={}; using maxAttempts",
                quiz.id,
                quiz.multiple_attempts_allowed,
                quiz.max_attempts
            );
        }

        let key = start_key(user_id, quiz_id);
        let guard = self.locks.acquire(&key).await;
        let result = self.start_locked(user_id, &quiz).await;
        drop(guard);
        self.locks.prune(&key).await;

        let attempt = result?;
        self.arm_timer(&quiz, &attempt).await;
        Ok(attempt)
    }

    async fn start_locked(&self, user_id: &str, quiz: &Quiz) -> AppResult<QuizAttempt> {
        if let Some(open) = self.attempts.find_open(user_id, &quiz.id).await? {
            if !open.has_expired(quiz, self.clock.now()) {
                return Err(AppError::AttemptInProgress(format!(
                    "Attempt {} of quiz '{}' is still open; resume it instead",
                    open.attempt_number, quiz.id
                )));
            }
            log::info!("Sealing expired attempt {} before starting a new one", open.id);
            self.finalize(quiz, &open.id).await?;
            self.timers.cancel(&open.id).await;
        }

        let sealed = self.attempts.list_sealed(user_id, &quiz.id).await?;
        if !AttemptCountPolicy::can_start_new_attempt(user_id, quiz, &sealed) {
            return Err(AppError::AttemptLimitReached(format!(
                "You have already used all {} allowed attempts for this quiz",
                quiz.max_attempts
            )));
        }

        let prior = self.attempts.count_user_attempts(user_id, &quiz.id).await?;
        let attempt = QuizAttempt::open(user_id, quiz, prior as u32 + 1, self.clock.now());
        let created = self.attempts.create(attempt).await?;

        log::info!(
            "User {} started attempt {} ({}) of quiz {}",
            user_id,
            created.attempt_number,
            created.id,
            quiz.id
        );
        Ok(created)
    }

    /// Returns the open attempt, sealing it first if its time limit has passed.
    pub async fn resume(&self, user_id: &str, quiz_id: &str) -> AppResult<Option<QuizAttempt>> {
        let quiz = self.get_quiz(quiz_id).await?;
        let Some(open) = self.attempts.find_open(user_id, quiz_id).await? else {
            return Ok(None);
        };

        let open = self.settle(&quiz, open).await?;
        if !open.is_sealed() {
            self.arm_timer(&quiz, &open).await;
        }
        Ok(Some(open))
    }

    /// Upserts one answer on an open attempt. Correctness is not evaluated here.
    pub async fn record_answer(
        &self,
        attempt_id: &str,
        question_id: &str,
        user_answer: &str,
    ) -> AppResult<QuizAttempt> {
        let attempt = self.get_attempt(attempt_id).await?;
        if attempt.is_sealed() {
            return Err(AppError::AlreadySubmitted(attempt.id));
        }
        let quiz = self.get_quiz(&attempt.quiz_id).await?;
        if quiz.question(question_id).is_none() {
            return Err(AppError::NotFound(format!(
                "Question '{}' is not part of quiz '{}'",
                question_id, quiz.id
            )));
        }

        let guard = self.locks.acquire(attempt_id).await;
        let result = self
            .record_locked(&quiz, attempt_id, question_id, user_answer)
            .await;
        drop(guard);
        self.locks.prune(attempt_id).await;

        if matches!(result, Err(AppError::AlreadySubmitted(_))) {
            self.timers.cancel(attempt_id).await;
        }
        result
    }

    async fn record_locked(
        &self,
        quiz: &Quiz,
        attempt_id: &str,
        question_id: &str,
        user_answer: &str,
    ) -> AppResult<QuizAttempt> {
        let mut retried = false;
        loop {
            let mut attempt = self.get_attempt(attempt_id).await?;
            if attempt.is_sealed() {
                return Err(AppError::AlreadySubmitted(attempt.id));
            }
            if attempt.has_expired(quiz, self.clock.now()) {
                log::info!("Answer arrived after the time limit; sealing attempt {}", attempt_id);
                self.seal_locked(quiz, attempt_id).await?;
                return Err(AppError::AlreadySubmitted(attempt.id));
            }

            attempt.upsert_answer(question_id, user_answer);
            match self.attempts.save(attempt).await {
                Ok(saved) => {
                    log::debug!("Recorded answer for {} on attempt {}", question_id, attempt_id);
                    return Ok(saved);
                }
                Err(AppError::StorageConflict(reason)) if !retried => {
                    log::warn!("Retrying answer write on attempt {}: {}", attempt_id, reason);
                    retried = true;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Grades and seals the attempt. Submitting a sealed attempt returns it unchanged.
    pub async fn submit(&self, attempt_id: &str) -> AppResult<QuizAttempt> {
        let attempt = self.get_attempt(attempt_id).await?;
        if attempt.is_sealed() {
            return Ok(attempt);
        }
        let quiz = self.get_quiz(&attempt.quiz_id).await?;

        let sealed = self.finalize(&quiz, attempt_id).await?;
        self.timers.cancel(attempt_id).await;
        Ok(sealed)
    }

    async fn finalize(&self, quiz: &Quiz, attempt_id: &str) -> AppResult<QuizAttempt> {
        let guard = self.locks.acquire(attempt_id).await;
        let result = self.seal_locked(quiz, attempt_id).await;
        drop(guard);
        self.locks.prune(attempt_id).await;

        match result {
            // lost the race to another submit; hand back the winner's result
            Err(AppError::AlreadySubmitted(_)) => self.get_attempt(attempt_id).await,
            other => other,
        }
    }

    async fn seal_locked(&self, quiz: &Quiz, attempt_id: &str) -> AppResult<QuizAttempt> {
        let mut retried = false;
        loop {
            let mut attempt = self.get_attempt(attempt_id).await?;
            if attempt.is_sealed() {
                return Err(AppError::AlreadySubmitted(attempt.id));
            }

            let graded = GradingEngine::grade_attempt(quiz, &attempt);
            attempt.total_points = graded.total_points;
            attempt.seal(graded.answers, graded.score, self.clock.now());

            match self.attempts.save(attempt).await {
                Ok(saved) => {
                    log::info!(
                        "Attempt {} of user {} sealed with score {}/{}",
                        saved.id,
                        saved.user_id,
                        saved.score,
                        saved.total_points
                    );
                    return Ok(saved);
                }
                Err(AppError::StorageConflict(reason)) if !retried => {
                    log::warn!("Retrying submit of attempt {}: {}", attempt_id, reason);
                    retried = true;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Arms the expiry timer under the attempt lock, so a submit that already
    /// sealed the attempt leaves nothing behind to cancel.
    async fn arm_timer(&self, quiz: &Quiz, attempt: &QuizAttempt) {
        if quiz.time_limit().is_none() {
            return;
        }

        let guard = self.locks.acquire(&attempt.id).await;
        match self.attempts.find_by_id(&attempt.id).await {
            Ok(Some(current)) if !current.is_sealed() => {
                if let Some(remaining) = current.remaining(quiz, self.clock.now()) {
                    let delay = remaining.to_std().unwrap_or_default();
                    let service = self.clone();
                    let attempt_id = current.id.clone();
                    self.timers
                        .arm(&current.id, delay, async move {
                            service.expire(attempt_id).await;
                        })
                        .await;
                }
            }
            Ok(_) => log::debug!("Not arming timer for closed attempt {}", attempt.id),
            Err(err) => log::warn!("Could not arm timer for attempt {}: {}", attempt.id, err),
        }
        drop(guard);
        self.locks.prune(&attempt.id).await;
    }

    /// Seals `attempt` when its time limit has passed; otherwise hands it back.
    async fn settle(&self, quiz: &Quiz, attempt: QuizAttempt) -> AppResult<QuizAttempt> {
        if attempt.is_sealed() || !attempt.has_expired(quiz, self.clock.now()) {
            return Ok(attempt);
        }
        log::info!("Attempt {} ran out of time; submitting recorded answers", attempt.id);
        let sealed = self.finalize(quiz, &attempt.id).await?;
        self.timers.cancel(&attempt.id).await;
        Ok(sealed)
    }

    /// The user's open attempt on `quiz`, after sealing it if it has run out of time.
    async fn settled_open(&self, user_id: &str, quiz: &Quiz) -> AppResult<Option<QuizAttempt>> {
        match self.attempts.find_open(user_id, &quiz.id).await? {
            Some(open) => {
                let settled = self.settle(quiz, open).await?;
                Ok((!settled.is_sealed()).then_some(settled))
            }
            None => Ok(None),
        }
    }

    async fn expire(&self, attempt_id: String) {
        self.timers.forget(&attempt_id).await;

        let attempt = match self.get_attempt(&attempt_id).await {
            Ok(attempt) if !attempt.is_sealed() => attempt,
            Ok(_) => return,
            Err(err) => {
                log::error!("Timer could not load attempt {}: {}", attempt_id, err);
                return;
            }
        };

        let result = match self.get_quiz(&attempt.quiz_id).await {
            Ok(quiz) => self.finalize(&quiz, &attempt_id).await,
            Err(err) => Err(err),
        };
        match result {
            Ok(sealed) => log::info!(
                "Auto-submitted attempt {} at its time limit with score {}/{}",
                sealed.id,
                sealed.score,
                sealed.total_points
            ),
            Err(err) => log::error!("Auto-submit of attempt {} failed: {}", attempt_id, err),
        }
    }

    /// Loads an attempt for display, sealing it first if its time limit has passed.
    pub async fn view_attempt(&self, attempt_id: &str) -> AppResult<QuizAttempt> {
        let attempt = self.get_attempt(attempt_id).await?;
        if attempt.is_sealed() {
            return Ok(attempt);
        }
        let quiz = self.get_quiz(&attempt.quiz_id).await?;
        self.settle(&quiz, attempt).await
    }

    pub async fn can_start_new_attempt(&self, user_id: &str, quiz_id: &str) -> AppResult<bool> {
        let quiz = self.get_quiz(quiz_id).await?;
        self.settled_open(user_id, &quiz).await?;
        let sealed = self.attempts.list_sealed(user_id, quiz_id).await?;
        Ok(AttemptCountPolicy::can_start_new_attempt(user_id, &quiz, &sealed))
    }

    pub async fn can_reveal_answers(
        &self,
        role: UserRole,
        user_id: &str,
        quiz_id: &str,
    ) -> AppResult<bool> {
        let quiz = self.get_quiz(quiz_id).await?;
        self.settled_open(user_id, &quiz).await?;
        let sealed = self.attempts.list_sealed(user_id, quiz_id).await?;
        Ok(VisibilityPolicy::can_reveal_answers(
            role,
            &quiz,
            user_id,
            &sealed,
            self.clock.now(),
        ))
    }

    pub async fn eligibility(&self, user_id: &str, quiz_id: &str) -> AppResult<AttemptEligibility> {
        let quiz = self.get_quiz(quiz_id).await?;
        let open = self.settled_open(user_id, &quiz).await?;
        let sealed = self.attempts.list_sealed(user_id, quiz_id).await?;
        Ok(AttemptCountPolicy::eligibility(
            user_id,
            &quiz,
            &sealed,
            open.as_ref(),
        ))
    }

    pub async fn history(&self, user_id: &str, quiz_id: &str) -> AppResult<Vec<QuizAttempt>> {
        let quiz = self.get_quiz(quiz_id).await?;
        self.settled_open(user_id, &quiz).await?;
        self.attempts.list_by_user_and_quiz(user_id, quiz_id).await
    }

    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }

    pub async fn has_pending_timer(&self, attempt_id: &str) -> bool {
        self.timers.is_armed(attempt_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        repositories::{
            quiz_attempt_repository::MockQuizAttemptRepository, InMemoryQuizAttemptRepository,
            InMemoryQuizRepository,
        },
        test_utils::{clock::ManualClock, fixtures::*},
    };
    use chrono::{Duration, Utc};

    struct Harness {
        service: QuizAttemptService,
        attempts: Arc<InMemoryQuizAttemptRepository>,
        clock: Arc<ManualClock>,
    }

    async fn harness(quizzes: Vec<Quiz>) -> Harness {
        let quiz_repo = Arc::new(InMemoryQuizRepository::new());
        for quiz in quizzes {
            quiz_repo.upsert(quiz).await.expect("fixture quiz should be valid");
        }
        let attempts = Arc::new(InMemoryQuizAttemptRepository::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let service = QuizAttemptService::with_clock(quiz_repo, attempts.clone(), clock.clone());
        Harness {
            service,
            attempts,
            clock,
        }
    }

    #[tokio::test]
    async fn start_creates_open_attempt_with_total_points() {
        let h = harness(vec![sample_quiz()]).await;

        let attempt = h.service.start("s1", "quiz-1").await.expect("start should work");

        assert_eq!(attempt.attempt_number, 1);
        assert_eq!(attempt.total_points, 6);
        assert!(attempt.end_time.is_none());
        assert!(attempt.answers.is_empty());
        assert!(h.attempts.find_by_id(&attempt.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn start_rejects_unknown_empty_and_unpublished_quizzes() {
        let mut draft = quiz_with_attempts(2);
        draft.published = false;
        let h = harness(vec![empty_quiz(), draft]).await;

        assert!(matches!(
            h.service.start("s1", "missing").await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            h.service.start("s1", "quiz-empty").await,
            Err(AppError::EmptyQuiz(_))
        ));
        assert!(matches!(
            h.service.start("s1", "quiz-multi").await,
            Err(AppError::QuizUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn start_while_open_is_rejected() {
        let h = harness(vec![quiz_with_attempts(3)]).await;

        h.service.start("s1", "quiz-multi").await.unwrap();
        let second = h.service.start("s1", "quiz-multi").await;

        assert!(matches!(second, Err(AppError::AttemptInProgress(_))));
        assert_eq!(h.attempts.count_user_attempts("s1", "quiz-multi").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn attempt_numbers_are_contiguous_and_limit_is_enforced() {
        let h = harness(vec![quiz_with_attempts(3)]).await;

        for expected in 1..=3 {
            let attempt = h.service.start("s1", "quiz-multi").await.unwrap();
            assert_eq!(attempt.attempt_number, expected);
            h.service.submit(&attempt.id).await.unwrap();
        }

        assert!(!h.service.can_start_new_attempt("s1", "quiz-multi").await.unwrap());
        assert!(matches!(
            h.service.start("s1", "quiz-multi").await,
            Err(AppError::AttemptLimitReached(_))
        ));
    }

    #[tokio::test]
    async fn submit_grades_recorded_answers() {
        let h = harness(vec![sample_quiz()]).await;
        let attempt = h.service.start("s1", "quiz-1").await.unwrap();

        h.service.record_answer(&attempt.id, "q-mc", "a").await.unwrap();
        h.service.record_answer(&attempt.id, "q-fib", " Paris ").await.unwrap();
        h.service.record_answer(&attempt.id, "q-mc", "b").await.unwrap();

        let sealed = h.service.submit(&attempt.id).await.unwrap();

        assert!(sealed.is_sealed());
        assert_eq!(sealed.score, 5);
        assert_eq!(sealed.total_points, 6);
        assert_eq!(sealed.answers.len(), 3);
        assert_eq!(sealed.correct_count(), 2);
    }

    #[tokio::test]
    async fn record_answer_does_not_reveal_correctness() {
        let h = harness(vec![sample_quiz()]).await;
        let attempt = h.service.start("s1", "quiz-1").await.unwrap();

        let saved = h.service.record_answer(&attempt.id, "q-mc", "b").await.unwrap();

        assert_eq!(saved.answers.len(), 1);
        assert!(!saved.answers[0].is_correct);
        assert_eq!(saved.score, 0);
    }

    #[tokio::test]
    async fn record_answer_rejects_unknown_question_and_sealed_attempt() {
        let h = harness(vec![sample_quiz()]).await;
        let attempt = h.service.start("s1", "quiz-1").await.unwrap();

        assert!(matches!(
            h.service.record_answer(&attempt.id, "q-nope", "x").await,
            Err(AppError::NotFound(_))
        ));

        h.service.submit(&attempt.id).await.unwrap();
        assert!(matches!(
            h.service.record_answer(&attempt.id, "q-mc", "b").await,
            Err(AppError::AlreadySubmitted(_))
        ));
    }

    #[tokio::test]
    async fn double_submit_returns_same_sealed_attempt() {
        let h = harness(vec![sample_quiz()]).await;
        let attempt = h.service.start("s1", "quiz-1").await.unwrap();
        h.service.record_answer(&attempt.id, "q-tf", "true").await.unwrap();

        let first = h.service.submit(&attempt.id).await.unwrap();
        h.clock.advance(Duration::seconds(30));
        let second = h.service.submit(&attempt.id).await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_submits_seal_exactly_once() {
        let h = harness(vec![sample_quiz()]).await;
        let attempt = h.service.start("s1", "quiz-1").await.unwrap();
        h.service.record_answer(&attempt.id, "q-mc", "b").await.unwrap();

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let service = h.service.clone();
                let id = attempt.id.clone();
                tokio::spawn(async move { service.submit(&id).await })
            })
            .collect();

        let mut results = Vec::new();
        for task in tasks {
            results.push(task.await.unwrap().expect("submit should be idempotent"));
        }

        assert!(results.windows(2).all(|pair| pair[0] == pair[1]));
        assert_eq!(results[0].score, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_answers_for_distinct_questions_are_all_kept() {
        let h = harness(vec![sample_quiz()]).await;
        let attempt = h.service.start("s1", "quiz-1").await.unwrap();

        let writes = [("q-mc", "b"), ("q-tf", "true"), ("q-fib", "paris")];
        let tasks: Vec<_> = writes
            .into_iter()
            .map(|(question, answer)| {
                let service = h.service.clone();
                let id = attempt.id.clone();
                tokio::spawn(async move { service.record_answer(&id, question, answer).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().expect("record should work");
        }

        let stored = h.service.get_attempt(&attempt.id).await.unwrap();
        assert_eq!(stored.answers.len(), 3);
        assert_eq!(h.service.submit(&attempt.id).await.unwrap().score, 6);
    }

    #[tokio::test]
    async fn resume_returns_open_attempt_and_none_without_one() {
        let h = harness(vec![sample_quiz()]).await;
        assert!(h.service.resume("s1", "quiz-1").await.unwrap().is_none());

        let attempt = h.service.start("s1", "quiz-1").await.unwrap();
        h.service.record_answer(&attempt.id, "q-tf", "false").await.unwrap();

        let resumed = h.service.resume("s1", "quiz-1").await.unwrap().unwrap();
        assert_eq!(resumed.id, attempt.id);
        assert_eq!(resumed.answer_for("q-tf"), Some("false"));
        assert!(!resumed.is_sealed());
    }

    #[tokio::test]
    async fn resume_after_time_limit_seals_with_recorded_answers() {
        let h = harness(vec![timed_quiz(1)]).await;
        let attempt = h.service.start("s1", "quiz-timed").await.unwrap();
        h.service.record_answer(&attempt.id, "q-mc", "b").await.unwrap();

        h.clock.advance(Duration::seconds(61));
        let resumed = h.service.resume("s1", "quiz-timed").await.unwrap().unwrap();

        assert!(resumed.is_sealed());
        assert_eq!(resumed.score, 2);
        assert_eq!(resumed.end_time, Some(attempt.start_time + Duration::seconds(61)));
        assert!(!h.service.has_pending_timer(&attempt.id).await);
    }

    #[tokio::test]
    async fn answer_after_time_limit_seals_instead_of_recording() {
        let h = harness(vec![timed_quiz(1)]).await;
        let attempt = h.service.start("s1", "quiz-timed").await.unwrap();
        h.service.record_answer(&attempt.id, "q-tf", "true").await.unwrap();

        h.clock.advance(Duration::seconds(60));
        let late = h.service.record_answer(&attempt.id, "q-mc", "b").await;

        assert!(matches!(late, Err(AppError::AlreadySubmitted(_))));
        let sealed = h.service.get_attempt(&attempt.id).await.unwrap();
        assert!(sealed.is_sealed());
        assert_eq!(sealed.score, 1);
        assert_eq!(sealed.answer_for("q-mc"), Some(""));
    }

    #[tokio::test]
    async fn start_seals_a_stale_open_attempt_first() {
        let mut quiz = timed_quiz(1);
        quiz.max_attempts = 2;
        let h = harness(vec![quiz]).await;
        let first = h.service.start("s1", "quiz-timed").await.unwrap();

        h.clock.advance(Duration::minutes(5));
        let second = h.service.start("s1", "quiz-timed").await.unwrap();

        assert_eq!(second.attempt_number, 2);
        assert!(h.service.get_attempt(&first.id).await.unwrap().is_sealed());
    }

    #[tokio::test]
    async fn eligibility_seals_an_attempt_whose_timer_was_lost() {
        let mut quiz = timed_quiz(1);
        quiz.max_attempts = 2;
        let h = harness(vec![quiz]).await;
        let attempt = h.service.start("s1", "quiz-timed").await.unwrap();
        h.service.record_answer(&attempt.id, "q-tf", "true").await.unwrap();
        h.service.timers.cancel(&attempt.id).await;

        h.clock.advance(Duration::minutes(5));
        let eligibility = h.service.eligibility("s1", "quiz-timed").await.unwrap();

        assert!(eligibility.can_start);
        assert!(eligibility.open_attempt_id.is_none());
        assert_eq!(eligibility.sealed_attempts, 1);
        assert_eq!(eligibility.remaining_attempts, 1);

        let stored = h.attempts.find_by_id(&attempt.id).await.unwrap().unwrap();
        assert!(stored.is_sealed());
        assert_eq!(stored.score, 1);
        assert_eq!(stored.end_time, Some(attempt.start_time + Duration::minutes(5)));
    }

    #[tokio::test]
    async fn read_views_report_expired_attempt_as_submitted() {
        let h = harness(vec![timed_quiz(1)]).await;
        let attempt = h.service.start("s1", "quiz-timed").await.unwrap();
        h.service.timers.cancel(&attempt.id).await;

        h.clock.advance(Duration::seconds(90));
        let viewed = h.service.view_attempt(&attempt.id).await.unwrap();
        assert!(viewed.is_sealed());

        let history = h.service.history("s1", "quiz-timed").await.unwrap();
        assert!(history.iter().all(|a| a.is_sealed()));
        assert!(!h.service.can_start_new_attempt("s1", "quiz-timed").await.unwrap());
        assert!(matches!(
            h.service.start("s1", "quiz-timed").await,
            Err(AppError::AttemptLimitReached(_))
        ));
    }

    #[tokio::test]
    async fn history_seals_expired_open_attempt() {
        let h = harness(vec![timed_quiz(1)]).await;
        let attempt = h.service.start("s1", "quiz-timed").await.unwrap();
        h.service.timers.cancel(&attempt.id).await;

        h.clock.advance(Duration::minutes(2));
        let history = h.service.history("s1", "quiz-timed").await.unwrap();

        assert_eq!(history.len(), 1);
        assert!(history[0].is_sealed());
    }

    #[tokio::test]
    async fn timer_is_not_armed_for_an_attempt_sealed_in_the_meantime() {
        let h = harness(vec![timed_quiz(10)]).await;
        let quiz = timed_quiz(10);
        let attempt = h.service.start("s1", "quiz-timed").await.unwrap();
        h.service.submit(&attempt.id).await.unwrap();
        assert!(!h.service.has_pending_timer(&attempt.id).await);

        // stale open copy, as seen by a caller that read it before the submit
        h.service.arm_timer(&quiz, &attempt).await;

        assert!(!h.service.has_pending_timer(&attempt.id).await);
    }

    #[tokio::test(start_paused = true)]
    async fn timer_auto_submits_without_resume() {
        let quiz_repo = Arc::new(InMemoryQuizRepository::new());
        quiz_repo.upsert(timed_quiz(1)).await.unwrap();
        let attempts = Arc::new(InMemoryQuizAttemptRepository::new());
        let service = QuizAttemptService::new(quiz_repo, attempts.clone());

        let attempt = service.start("s1", "quiz-timed").await.unwrap();
        service.record_answer(&attempt.id, "q-fib", "paris").await.unwrap();
        assert!(service.has_pending_timer(&attempt.id).await);

        tokio::time::sleep(std::time::Duration::from_secs(61)).await;
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        let stored = attempts.find_by_id(&attempt.id).await.unwrap().unwrap();
        assert!(stored.is_sealed());
        assert_eq!(stored.score, 3);
    }

    #[tokio::test]
    async fn manual_submit_cancels_timer() {
        let h = harness(vec![timed_quiz(10)]).await;
        let attempt = h.service.start("s1", "quiz-timed").await.unwrap();
        assert!(h.service.has_pending_timer(&attempt.id).await);

        h.service.submit(&attempt.id).await.unwrap();

        assert!(!h.service.has_pending_timer(&attempt.id).await);
    }

    #[tokio::test]
    async fn visibility_and_eligibility_follow_history() {
        let h = harness(vec![sample_quiz()]).await;

        assert!(!h.service.can_reveal_answers(UserRole::Student, "s1", "quiz-1").await.unwrap());
        assert!(h.service.can_reveal_answers(UserRole::Faculty, "f1", "quiz-1").await.unwrap());

        let attempt = h.service.start("s1", "quiz-1").await.unwrap();
        let eligibility = h.service.eligibility("s1", "quiz-1").await.unwrap();
        assert!(!eligibility.can_start);
        assert_eq!(eligibility.open_attempt_id.as_deref(), Some(attempt.id.as_str()));

        h.service.submit(&attempt.id).await.unwrap();
        assert!(h.service.can_reveal_answers(UserRole::Student, "s1", "quiz-1").await.unwrap());
        assert_eq!(h.service.eligibility("s1", "quiz-1").await.unwrap().remaining_attempts, 0);
        assert_eq!(h.service.history("s1", "quiz-1").await.unwrap().len(), 1);
    }

    fn mocked_service(attempts: MockQuizAttemptRepository) -> QuizAttemptService {
        let mut quizzes = crate::repositories::quiz_repository::MockQuizRepository::new();
        quizzes
            .expect_find_by_id()
            .returning(|_| Ok(Some(sample_quiz())));
        QuizAttemptService::new(Arc::new(quizzes), Arc::new(attempts))
    }

    #[tokio::test]
    async fn submit_retries_once_after_storage_conflict() {
        let open = QuizAttempt::open("s1", &sample_quiz(), 1, Utc::now());
        let mut attempts = MockQuizAttemptRepository::new();
        let stored = open.clone();
        attempts
            .expect_find_by_id()
            .returning(move |_| Ok(Some(stored.clone())));

        let mut calls = 0;
        attempts.expect_save().times(2).returning(move |attempt| {
            calls += 1;
            if calls == 1 {
                Err(AppError::StorageConflict("stale revision".to_string()))
            } else {
                Ok(attempt)
            }
        });

        let service = mocked_service(attempts);
        let sealed = service.submit(&open.id).await.expect("retry should succeed");

        assert!(sealed.is_sealed());
    }

    #[tokio::test]
    async fn repeated_storage_conflict_is_surfaced() {
        let open = QuizAttempt::open("s1", &sample_quiz(), 1, Utc::now());
        let mut attempts = MockQuizAttemptRepository::new();
        let stored = open.clone();
        attempts
            .expect_find_by_id()
            .returning(move |_| Ok(Some(stored.clone())));
        attempts
            .expect_save()
            .times(2)
            .returning(|_| Err(AppError::StorageConflict("stale revision".to_string())));

        let service = mocked_service(attempts);
        let result = service.record_answer(&open.id, "q-mc", "b").await;

        assert!(matches!(result, Err(AppError::StorageConflict(_))));
    }
}
