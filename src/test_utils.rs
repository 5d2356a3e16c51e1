#[cfg(test)]
pub mod fixtures {
    use crate::models::domain::{Choice, Question, QuestionKind, Quiz, ShowCorrectAnswers};

    /// Two-choice question "q-mc" where "b" is correct, worth 2 points.
    pub fn multiple_choice_question() -> Question {
        Question {
            id: "q-mc".to_string(),
            title: "Colors".to_string(),
            prompt: "What color is a clear sky?".to_string(),
            points: 2,
            kind: QuestionKind::MultipleChoice {
                choices: vec![
                    Choice {
                        id: "a".to_string(),
                        text: "Red".to_string(),
                    },
                    Choice {
                        id: "b".to_string(),
                        text: "Blue".to_string(),
                    },
                ],
                correct_option_id: "b".to_string(),
            },
        }
    }

    /// True/false question "q-tf" whose answer is true, worth 1 point.
    pub fn true_false_question() -> Question {
        Question {
            id: "q-tf".to_string(),
            title: "Borrowing".to_string(),
            prompt: "A value can have many shared borrows at once".to_string(),
            points: 1,
            kind: QuestionKind::TrueFalse {
                correct_answer: true,
            },
        }
    }

    /// Fill in the blank question "q-fib" accepting "paris", worth 3 points.
    pub fn fill_in_blank_question() -> Question {
        Question {
            id: "q-fib".to_string(),
            title: "Capitals".to_string(),
            prompt: "The capital of France is ____".to_string(),
            points: 3,
            kind: QuestionKind::FillInBlank {
                possible_answers: vec!["paris".to_string()],
            },
        }
    }

    /// Published, untimed, single-attempt quiz worth 6 points.
    pub fn sample_quiz() -> Quiz {
        Quiz {
            id: "quiz-1".to_string(),
            course_id: "RS4550".to_string(),
            title: "Week 1 check-in".to_string(),
            description: None,
            time_limit_minutes: None,
            max_attempts: 1,
            multiple_attempts_allowed: None,
            show_correct_answers: ShowCorrectAnswers::Never,
            due_date: None,
            available_from: None,
            available_until: None,
            published: true,
            questions: vec![
                multiple_choice_question(),
                true_false_question(),
                fill_in_blank_question(),
            ],
        }
    }

    pub fn timed_quiz(minutes: u32) -> Quiz {
        Quiz {
            id: "quiz-timed".to_string(),
            time_limit_minutes: Some(minutes),
            ..sample_quiz()
        }
    }

    pub fn quiz_with_attempts(max_attempts: u32) -> Quiz {
        Quiz {
            id: "quiz-multi".to_string(),
            max_attempts,
            ..sample_quiz()
        }
    }

    pub fn empty_quiz() -> Quiz {
        Quiz {
            id: "quiz-empty".to_string(),
            questions: Vec::new(),
            ..sample_quiz()
        }
    }
}

#[cfg(test)]
pub mod clock {
    use std::sync::Mutex;

    use chrono::{DateTime, Duration, Utc};

    use crate::services::clock::Clock;

    /// Clock that only moves when a test advances it.
    pub struct ManualClock {
        now: Mutex<DateTime<Utc>>,
    }

    impl ManualClock {
        pub fn new(now: DateTime<Utc>) -> Self {
            Self {
                now: Mutex::new(now),
            }
        }

        pub fn advance(&self, by: Duration) {
            let mut now = self.now.lock().expect("clock mutex poisoned");
            *now += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock().expect("clock mutex poisoned")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::clock::ManualClock;
    use super::fixtures::*;
    use crate::services::clock::Clock;
    use chrono::{Duration, Utc};

    #[test]
    fn test_fixtures_sample_quiz_is_well_formed() {
        let quiz = sample_quiz();
        assert!(quiz.check_definition().is_ok());
        assert_eq!(quiz.total_points(), 6);
        assert_eq!(quiz.questions.len(), 3);
    }

    #[test]
    fn test_fixtures_variants() {
        assert_eq!(timed_quiz(5).time_limit_minutes, Some(5));
        assert_eq!(quiz_with_attempts(3).max_attempts, 3);
        assert!(empty_quiz().questions.is_empty());
    }

    #[test]
    fn test_manual_clock_advances() {
        let start = Utc::now();
        let clock = ManualClock::new(start);
        clock.advance(Duration::seconds(61));
        assert_eq!(clock.now() - start, Duration::seconds(61));
    }
}
