//! Quiz engine
//!
//! One [`QuizEngine`] runs one attempt: answers are collected in memory,
//! the attempt is scored on the last question and a locked [`TestResult`]
//! is persisted. A retake needs a fresh engine.

use crate::access;
use crate::error::{CliError, Result};
use crate::store::{KeyValueStore, RecordStore};
use chrono::{NaiveDate, Utc};
use medtrain_common::types::{new_id, DeviceType, Question, QuestionType, Session, TestResult, Training, User};
use std::collections::{BTreeSet, HashMap};

/// Result of [`QuizEngine::advance`]
#[derive(Debug, Clone, PartialEq)]
pub enum Advance {
    /// Current question has no answer yet; nothing changed
    Blocked,
    /// Moved on to the question at this index
    Next(usize),
    /// Attempt scored and stored
    Completed(QuizOutcome),
}

/// Score of a finished attempt together with the stored result
#[derive(Debug, Clone, PartialEq)]
pub struct QuizOutcome {
    pub correct: usize,
    pub total: usize,
    pub result: TestResult,
}

impl QuizOutcome {
    pub fn score(&self) -> f64 {
        self.result.score
    }

    pub fn passed(&self) -> bool {
        self.result.passed
    }
}

/// Per-question feedback shown after completion
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionReview {
    pub question_id: String,
    pub text: String,
    pub selected: BTreeSet<usize>,
    pub correct_answers: BTreeSet<usize>,
    pub is_correct: bool,
}

#[derive(Debug, Clone)]
enum State {
    InProgress { index: usize },
    Completed(QuizOutcome),
}

/// Check that `user` may start the test of `device` in `training` today
pub fn ensure_eligible(
    user: &User,
    training: &Training,
    device: &DeviceType,
    results: &[TestResult],
    today: NaiveDate,
) -> Result<()> {
    if !access::is_device_visible(user, training, device, today) {
        return Err(CliError::NotAuthorized(device.title.clone()));
    }
    if !device.has_quiz() {
        return Err(CliError::NoQuiz(device.title.clone()));
    }
    if !access::can_take_test(device, results, &user.id) {
        return Err(CliError::TestLocked(device.title.clone()));
    }
    Ok(())
}

/// A single quiz attempt
pub struct QuizEngine<'a, S> {
    store: &'a RecordStore<S>,
    device: DeviceType,
    user_id: String,
    username: String,
    answers: HashMap<String, BTreeSet<usize>>,
    state: State,
}

impl<'a, S: KeyValueStore> QuizEngine<'a, S> {
    /// Start a fresh attempt at the first question
    pub fn start(store: &'a RecordStore<S>, device: DeviceType, identity: &Session) -> Self {
        tracing::debug!(
            user_id = %identity.user_id,
            device_id = %device.id,
            questions = device.questions.len(),
            "Quiz started"
        );

        Self {
            store,
            device,
            user_id: identity.user_id.clone(),
            username: identity.username.clone(),
            answers: HashMap::new(),
            state: State::InProgress { index: 0 },
        }
    }

    pub fn device(&self) -> &DeviceType {
        &self.device
    }

    pub fn question_count(&self) -> usize {
        self.device.questions.len()
    }

    /// Index of the question being answered, `None` once completed
    pub fn current_index(&self) -> Option<usize> {
        match self.state {
            State::InProgress { index } => Some(index),
            State::Completed(_) => None,
        }
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.current_index()
            .and_then(|index| self.device.questions.get(index))
    }

    pub fn selection(&self, question_id: &str) -> BTreeSet<usize> {
        self.answers.get(question_id).cloned().unwrap_or_default()
    }

    pub fn outcome(&self) -> Option<&QuizOutcome> {
        match &self.state {
            State::Completed(outcome) => Some(outcome),
            State::InProgress { .. } => None,
        }
    }

    /// Record an answer choice.
    ///
    /// Single choice replaces the selection, multiple choice toggles the
    /// option. Unknown questions, out-of-range options and calls after
    /// completion are ignored.
    pub fn select_answer(&mut self, question_id: &str, option_index: usize) {
        if self.outcome().is_some() {
            return;
        }
        let Some(question) = self.device.question(question_id) else {
            tracing::debug!(question_id, "Ignoring answer for unknown question");
            return;
        };
        if !question.has_option(option_index) {
            tracing::debug!(question_id, option_index, "Ignoring out-of-range option");
            return;
        }

        let selected = self.answers.entry(question.id.clone()).or_default();
        match question.question_type {
            QuestionType::Single => {
                selected.clear();
                selected.insert(option_index);
            }
            QuestionType::Multiple => {
                if !selected.remove(&option_index) {
                    selected.insert(option_index);
                }
            }
        }
    }

    /// Move past the current question, scoring the attempt on the last one
    pub fn advance(&mut self) -> Result<Advance> {
        let index = match &self.state {
            State::Completed(outcome) => return Ok(Advance::Completed(outcome.clone())),
            State::InProgress { index } => *index,
        };

        if let Some(question) = self.device.questions.get(index) {
            if self.answers.get(&question.id).map_or(true, BTreeSet::is_empty) {
                return Ok(Advance::Blocked);
            }
        }

        if index + 1 < self.device.questions.len() {
            self.state = State::InProgress { index: index + 1 };
            return Ok(Advance::Next(index + 1));
        }

        let outcome = self.complete()?;
        self.state = State::Completed(outcome.clone());
        Ok(Advance::Completed(outcome))
    }

    fn complete(&self) -> Result<QuizOutcome> {
        let total = self.device.questions.len();
        let correct = self
            .device
            .questions
            .iter()
            .filter(|question| question.is_answered_by(&self.selection(&question.id)))
            .count();

        let score = if total == 0 {
            0.0
        } else {
            correct as f64 / total as f64 * 100.0
        };
        let passed = score >= f64::from(self.device.passing_percentage);

        let result = TestResult {
            id: new_id(),
            user_id: self.user_id.clone(),
            username: self.username.clone(),
            device_id: self.device.id.clone(),
            device_title: self.device.title.clone(),
            score,
            passed,
            timestamp: Utc::now(),
            is_locked: true,
        };
        self.store.append_test_result(result.clone())?;

        tracing::info!(
            user_id = %self.user_id,
            device_id = %self.device.id,
            result_id = %result.id,
            score,
            passed,
            "Quiz completed"
        );

        Ok(QuizOutcome {
            correct,
            total,
            result,
        })
    }

    /// Correct/incorrect per question; `None` until the attempt is completed
    pub fn per_question_review(&self) -> Option<Vec<QuestionReview>> {
        self.outcome()?;
        Some(
            self.device
                .questions
                .iter()
                .map(|question| {
                    let selected = self.selection(&question.id);
                    QuestionReview {
                        question_id: question.id.clone(),
                        text: question.text.clone(),
                        is_correct: question.is_answered_by(&selected),
                        selected,
                        correct_answers: question.correct_answers.clone(),
                    }
                })
                .collect(),
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::store::MemoryKeyValueStore;
    use crate::testing;
    use medtrain_common::types::Role;

    // Fixture answers: even questions {1} single, odd questions {0, 2} multiple.

    fn setup(questions: usize) -> (RecordStore<MemoryKeyValueStore>, DeviceType, Session) {
        let store = RecordStore::new(MemoryKeyValueStore::new());
        let training = testing::training_with_device("Infusion", "Pump", questions, 70);
        let device = training.device_types[0].clone();
        store.save_trainings(&[training]).unwrap();
        (store, device, Session::new("u1", "Jane Doe", Role::Trainee))
    }

    fn answer_correctly<S: KeyValueStore>(engine: &mut QuizEngine<'_, S>, index: usize) {
        let id = engine.device().questions[index].id.clone();
        if index % 2 == 0 {
            engine.select_answer(&id, 1);
        } else {
            engine.select_answer(&id, 0);
            engine.select_answer(&id, 2);
        }
    }

    #[test]
    fn test_all_correct_passes_and_locks() {
        let (store, device, session) = setup(2);
        let mut engine = QuizEngine::start(&store, device.clone(), &session);

        answer_correctly(&mut engine, 0);
        assert_eq!(engine.advance().unwrap(), Advance::Next(1));
        answer_correctly(&mut engine, 1);

        let Advance::Completed(outcome) = engine.advance().unwrap() else {
            panic!("expected completion");
        };
        assert_eq!(outcome.score(), 100.0);
        assert!(outcome.passed());
        assert!(outcome.result.is_locked);

        let results = store.test_results().unwrap();
        assert_eq!(results.len(), 1);
        assert!(!access::can_take_test(&device, &results, "u1"));
    }

    #[test]
    fn test_half_correct_fails_but_still_locks() {
        let (store, device, session) = setup(2);
        let mut engine = QuizEngine::start(&store, device, &session);

        answer_correctly(&mut engine, 0);
        engine.advance().unwrap();
        let second = engine.device().questions[1].id.clone();
        engine.select_answer(&second, 0);

        let Advance::Completed(outcome) = engine.advance().unwrap() else {
            panic!("expected completion");
        };
        assert_eq!(outcome.score(), 50.0);
        assert!(!outcome.passed());
        assert!(store.test_results().unwrap()[0].is_locked);
    }

    #[test]
    fn test_no_partial_credit() {
        let (store, device, session) = setup(2);

        for extra in [vec![0], vec![0, 1, 2]] {
            let mut engine = QuizEngine::start(&store, device.clone(), &session);
            answer_correctly(&mut engine, 0);
            engine.advance().unwrap();
            let id = engine.device().questions[1].id.clone();
            for option in extra {
                engine.select_answer(&id, option);
            }
            let Advance::Completed(outcome) = engine.advance().unwrap() else {
                panic!("expected completion");
            };
            assert_eq!(outcome.correct, 1);
        }
    }

    #[test]
    fn test_blocked_without_answer() {
        let (store, device, session) = setup(2);
        let mut engine = QuizEngine::start(&store, device, &session);

        assert_eq!(engine.advance().unwrap(), Advance::Blocked);
        assert_eq!(engine.current_index(), Some(0));

        // Toggling a multiple-choice answer off again empties the selection
        answer_correctly(&mut engine, 0);
        engine.advance().unwrap();
        let id = engine.device().questions[1].id.clone();
        engine.select_answer(&id, 2);
        engine.select_answer(&id, 2);
        assert_eq!(engine.advance().unwrap(), Advance::Blocked);
        assert!(store.test_results().unwrap().is_empty());
    }

    #[test]
    fn test_select_answer_semantics() {
        let (store, device, session) = setup(2);
        let mut engine = QuizEngine::start(&store, device, &session);
        let single = engine.device().questions[0].id.clone();
        let multiple = engine.device().questions[1].id.clone();

        engine.select_answer(&single, 0);
        engine.select_answer(&single, 2);
        assert_eq!(engine.selection(&single), BTreeSet::from([2]));

        engine.select_answer(&multiple, 0);
        engine.select_answer(&multiple, 1);
        engine.select_answer(&multiple, 0);
        assert_eq!(engine.selection(&multiple), BTreeSet::from([1]));

        engine.select_answer(&single, 9);
        engine.select_answer("nope", 0);
        assert_eq!(engine.selection(&single), BTreeSet::from([2]));
        assert!(engine.selection("nope").is_empty());
    }

    #[test]
    fn test_completion_is_terminal() {
        let (store, device, session) = setup(1);
        let mut engine = QuizEngine::start(&store, device, &session);
        answer_correctly(&mut engine, 0);

        let first = engine.advance().unwrap();
        let again = engine.advance().unwrap();
        assert_eq!(first, again);
        assert_eq!(store.test_results().unwrap().len(), 1);

        let review = engine.per_question_review().unwrap();
        assert_eq!(review.len(), 1);
        assert!(review[0].is_correct);
    }

    #[test]
    fn test_zero_questions_scores_zero() {
        let (store, _, session) = setup(1);
        let empty = testing::device("t", "Empty", 0, 0);
        let mut engine = QuizEngine::start(&store, empty, &session);

        let Advance::Completed(outcome) = engine.advance().unwrap() else {
            panic!("expected completion");
        };
        assert_eq!(outcome.score(), 0.0);
        assert_eq!(outcome.total, 0);
    }

    #[test]
    fn test_review_unavailable_while_in_progress() {
        let (store, device, session) = setup(1);
        let engine = QuizEngine::start(&store, device, &session);
        assert!(engine.per_question_review().is_none());
    }

    #[test]
    fn test_ensure_eligible() {
        let training = testing::training_with_device("Infusion", "Pump", 1, 70);
        let device = &training.device_types[0];
        let today = testing::day(2026, 6, 1);
        let mut user = testing::trainee("Jane");

        assert!(matches!(
            ensure_eligible(&user, &training, device, &[], today),
            Err(CliError::NotAuthorized(_))
        ));

        user.permissions.trainings.push(testing::grant(
            &training,
            testing::day(2026, 1, 1),
            testing::day(2026, 12, 31),
            &[device.id.as_str()],
        ));
        assert!(ensure_eligible(&user, &training, device, &[], today).is_ok());

        let locked = testing::result(&user.id, &device.id, Utc::now(), true);
        assert!(matches!(
            ensure_eligible(&user, &training, device, &[locked], today),
            Err(CliError::TestLocked(_))
        ));
    }
}
