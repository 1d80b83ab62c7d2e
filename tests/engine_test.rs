use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use interview_backend::error::{Error, Result};
use interview_backend::models::feedback::{
    AnswerFeedback, ComprehensiveFeedback, PerQuestionFeedback,
};
use interview_backend::models::question::Question;
use interview_backend::models::session::{AnsweredQuestion, InterviewSession};
use interview_backend::models::user::User;
use interview_backend::services::catalog::QuestionCatalog;
use interview_backend::services::engine::{SessionProgressionEngine, SubmitOutcome};
use interview_backend::services::feedback_service::{
    AnswerScoringRequest, ComprehensiveScoringRequest, FeedbackProvider,
};
use interview_backend::services::session_store::{CompletionUpdate, SessionConfig, SessionStore};

struct MemoryCatalog {
    questions: Vec<Question>,
}

#[async_trait]
impl QuestionCatalog for MemoryCatalog {
    async fn list_all(&self) -> Result<Vec<Question>> {
        Ok(self.questions.clone())
    }
}

/// In-memory store with the same guarded-append semantics as the Postgres
/// implementation: count must match, no duplicate question id, not completed.
#[derive(Default)]
struct MemoryStore {
    sessions: Mutex<HashMap<Uuid, InterviewSession>>,
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn create(&self, config: SessionConfig) -> Result<InterviewSession> {
        let now = Utc::now();
        let session = InterviewSession {
            id: Uuid::new_v4(),
            user_id: config.user_id,
            job_role: config.job_role,
            job_level: config.job_level,
            interview_type: config.interview_type,
            total_questions: config.total_questions,
            started_at: now,
            answered_questions: serde_json::json!([]),
            duration_seconds: None,
            overall_score: None,
            overall_feedback: None,
            improvements: None,
            completed_at: None,
            created_at: Some(now),
            updated_at: Some(now),
        };
        self.sessions
            .lock()
            .unwrap()
            .insert(session.id, session.clone());
        Ok(session)
    }

    async fn get(&self, id: Uuid) -> Result<Option<InterviewSession>> {
        Ok(self.sessions.lock().unwrap().get(&id).cloned())
    }

    async fn append_answer(
        &self,
        id: Uuid,
        expected_index: usize,
        answer: &AnsweredQuestion,
    ) -> Result<()> {
        let mut sessions = self.sessions.lock().unwrap();
        let session = sessions
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound("session".into()))?;

        let mut answered: Vec<AnsweredQuestion> =
            serde_json::from_value(session.answered_questions.clone())?;
        let duplicate = answered.iter().any(|a| a.question_id == answer.question_id);
        if session.completed_at.is_some() || answered.len() != expected_index || duplicate {
            return Err(Error::Conflict("guarded append failed".into()));
        }
        answered.push(answer.clone());
        session.answered_questions = serde_json::to_value(answered)?;
        Ok(())
    }

    async fn complete(&self, id: Uuid, update: CompletionUpdate) -> Result<()> {
        let mut sessions = self.sessions.lock().unwrap();
        let session = sessions
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound("session".into()))?;
        if session.completed_at.is_some() {
            return Err(Error::Conflict("already completed".into()));
        }
        session.completed_at = Some(Utc::now());
        session.duration_seconds = Some(update.duration_seconds);
        session.overall_score = Some(update.overall_score);
        session.overall_feedback = Some(update.overall_feedback);
        session.improvements = Some(serde_json::to_value(update.improvements)?);
        Ok(())
    }
}

impl MemoryStore {
    fn answered_count(&self, id: Uuid) -> usize {
        let sessions = self.sessions.lock().unwrap();
        let session = sessions.get(&id).expect("session exists");
        session
            .answered_questions
            .as_array()
            .map(|a| a.len())
            .unwrap_or(0)
    }
}

/// Wraps a store and fails the next `append_answer` with a conflict, to
/// exercise the engine's single retry after a lost compare-and-swap.
struct FlakyStore {
    inner: Arc<MemoryStore>,
    fail_next_append: AtomicBool,
}

#[async_trait]
impl SessionStore for FlakyStore {
    async fn create(&self, config: SessionConfig) -> Result<InterviewSession> {
        self.inner.create(config).await
    }

    async fn get(&self, id: Uuid) -> Result<Option<InterviewSession>> {
        self.inner.get(id).await
    }

    async fn append_answer(
        &self,
        id: Uuid,
        expected_index: usize,
        answer: &AnsweredQuestion,
    ) -> Result<()> {
        if self.fail_next_append.swap(false, Ordering::SeqCst) {
            return Err(Error::Conflict("simulated lost compare-and-swap".into()));
        }
        self.inner.append_answer(id, expected_index, answer).await
    }

    async fn complete(&self, id: Uuid, update: CompletionUpdate) -> Result<()> {
        self.inner.complete(id, update).await
    }
}

struct StubProvider {
    answer_calls: AtomicUsize,
    comprehensive_calls: AtomicUsize,
    fail_answers: AtomicBool,
    fail_comprehensive: AtomicBool,
}

impl Default for StubProvider {
    fn default() -> Self {
        Self {
            answer_calls: AtomicUsize::new(0),
            comprehensive_calls: AtomicUsize::new(0),
            fail_answers: AtomicBool::new(false),
            fail_comprehensive: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl FeedbackProvider for StubProvider {
    async fn score_answer(&self, request: &AnswerScoringRequest) -> Result<AnswerFeedback> {
        self.answer_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_answers.load(Ordering::SeqCst) {
            return Err(Error::Provider("scoring service down".into()));
        }
        Ok(AnswerFeedback {
            score: 7.0,
            feedback: format!("Feedback for: {}", request.question),
            strengths: vec!["clear structure".into()],
            improvements: vec!["add an example".into()],
            tips: vec!["quantify impact".into()],
        })
    }

    async fn score_comprehensive(
        &self,
        request: &ComprehensiveScoringRequest,
    ) -> Result<ComprehensiveFeedback> {
        self.comprehensive_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_comprehensive.load(Ordering::SeqCst) {
            return Err(Error::Provider("comprehensive scoring down".into()));
        }
        let per_question = request
            .questions
            .iter()
            .map(|q| PerQuestionFeedback {
                question_number: q.question_number,
                question: q.question.clone(),
                feedback: q.feedback.clone(),
                score: q.score,
            })
            .collect();
        Ok(ComprehensiveFeedback {
            overall_score: 7.5,
            overall_feedback: "Consistent performance overall.".into(),
            improvements: vec!["practice conciseness".into()],
            strengths: vec!["good fundamentals".into()],
            areas_to_improve: vec!["system design depth".into()],
            per_question_feedback: per_question,
        })
    }
}

fn make_catalog(count: usize) -> Vec<Question> {
    (0..count)
        .map(|i| Question {
            id: Uuid::new_v4(),
            position: i as i32 + 1,
            question: format!("Question {}", i + 1),
            question_type: if i % 2 == 0 { "behavioral" } else { "technical" }.to_string(),
        })
        .collect()
}

fn make_user(job_role: Option<&str>) -> User {
    let now = Utc::now();
    User {
        id: Uuid::new_v4(),
        external_id: format!("ext-{}", Uuid::new_v4()),
        name: "Alice".into(),
        email: "alice@example.com".into(),
        job_role: job_role.map(|r| r.to_string()),
        job_level: Some("mid".into()),
        created_at: now,
        updated_at: now,
    }
}

struct Harness {
    engine: SessionProgressionEngine,
    store: Arc<MemoryStore>,
    provider: Arc<StubProvider>,
    catalog: Vec<Question>,
}

fn setup(question_count: usize) -> Harness {
    let catalog = make_catalog(question_count);
    let store = Arc::new(MemoryStore::default());
    let provider = Arc::new(StubProvider::default());
    let engine = SessionProgressionEngine::new(
        Arc::new(MemoryCatalog {
            questions: catalog.clone(),
        }),
        store.clone(),
        provider.clone(),
    );
    Harness {
        engine,
        store,
        provider,
        catalog,
    }
}

#[tokio::test]
async fn scenario_a_two_question_happy_path() {
    let h = setup(2);
    let user = make_user(Some("Backend Engineer"));

    let start = h
        .engine
        .start_interview(&user, "mid", "technical")
        .await
        .expect("start");
    assert_eq!(start.question_number, 1);
    assert_eq!(start.total_questions, 2);
    assert_eq!(start.first_question.id, h.catalog[0].id);
    assert_eq!(start.job_role, "Backend Engineer");

    let first = h
        .engine
        .submit_answer(start.session_id, h.catalog[0].id, "ans1", 0)
        .await
        .expect("first answer");
    match first {
        SubmitOutcome::InProgress {
            next_question,
            question_number,
            current_question_index,
            total_questions,
            ..
        } => {
            assert_eq!(next_question.id, h.catalog[1].id);
            assert_eq!(question_number, 2);
            assert_eq!(current_question_index, 1);
            assert_eq!(total_questions, 2);
        }
        SubmitOutcome::Completed { .. } => panic!("session completed too early"),
    }

    let second = h
        .engine
        .submit_answer(start.session_id, h.catalog[1].id, "ans2", 1)
        .await
        .expect("second answer");
    match second {
        SubmitOutcome::Completed {
            answers,
            comprehensive,
            duration_seconds,
            ..
        } => {
            assert_eq!(answers.len(), 2);
            assert_eq!(comprehensive.per_question_feedback.len(), 2);
            assert!(duration_seconds >= 0);
        }
        SubmitOutcome::InProgress { .. } => panic!("session should be complete"),
    }

    let results = h
        .engine
        .get_results(start.session_id, &user)
        .await
        .expect("results");
    assert!(results.completed);
    assert_eq!(results.answers.len(), 2);
    assert_eq!(results.overall_score, Some(7.5));
    assert!(results.duration_seconds.is_some());
    assert_eq!(h.provider.comprehensive_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn scenario_b_out_of_order_submission_rejected() {
    let h = setup(2);
    let user = make_user(Some("Backend Engineer"));
    let start = h
        .engine
        .start_interview(&user, "mid", "technical")
        .await
        .expect("start");

    // Q2 offered for slot 0: the catalog entry at that index does not match.
    let err = h
        .engine
        .submit_answer(start.session_id, h.catalog[1].id, "ans", 0)
        .await
        .expect_err("must reject");
    assert!(matches!(err, Error::Validation(_)), "got {:?}", err);
    assert_eq!(h.store.answered_count(start.session_id), 0);
    assert_eq!(h.provider.answer_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn scenario_c_duplicate_answer_rejected_and_original_kept() {
    let h = setup(2);
    let user = make_user(Some("Backend Engineer"));
    let start = h
        .engine
        .start_interview(&user, "mid", "technical")
        .await
        .expect("start");

    h.engine
        .submit_answer(start.session_id, h.catalog[0].id, "ans1", 0)
        .await
        .expect("first answer");

    let err = h
        .engine
        .submit_answer(start.session_id, h.catalog[0].id, "ans1b", 0)
        .await
        .expect_err("duplicate must fail");
    assert!(matches!(err, Error::Conflict(_)), "got {:?}", err);

    let session = h.store.get(start.session_id).await.unwrap().unwrap();
    let answered = session.answered().unwrap();
    assert_eq!(answered.len(), 1);
    assert_eq!(answered[0].answer, "ans1");
}

#[tokio::test]
async fn skipping_ahead_is_rejected() {
    let h = setup(3);
    let user = make_user(Some("Backend Engineer"));
    let start = h
        .engine
        .start_interview(&user, "mid", "technical")
        .await
        .expect("start");

    // Index 1 matches Q2's catalog slot, but nothing has been answered yet.
    let err = h
        .engine
        .submit_answer(start.session_id, h.catalog[1].id, "ans", 1)
        .await
        .expect_err("must reject");
    assert!(matches!(err, Error::Validation(_)), "got {:?}", err);
    assert_eq!(h.store.answered_count(start.session_id), 0);
}

#[tokio::test]
async fn provider_failure_leaves_session_unchanged() {
    let h = setup(2);
    let user = make_user(Some("Backend Engineer"));
    let start = h
        .engine
        .start_interview(&user, "mid", "technical")
        .await
        .expect("start");

    h.provider.fail_answers.store(true, Ordering::SeqCst);
    let err = h
        .engine
        .submit_answer(start.session_id, h.catalog[0].id, "ans1", 0)
        .await
        .expect_err("provider down");
    assert!(matches!(err, Error::Provider(_)), "got {:?}", err);
    assert_eq!(h.store.answered_count(start.session_id), 0);

    // The same submission succeeds once the provider recovers.
    h.provider.fail_answers.store(false, Ordering::SeqCst);
    h.engine
        .submit_answer(start.session_id, h.catalog[0].id, "ans1", 0)
        .await
        .expect("retry succeeds");
    assert_eq!(h.store.answered_count(start.session_id), 1);
}

#[tokio::test]
async fn completed_session_rejects_further_submissions() {
    let h = setup(1);
    let user = make_user(Some("Backend Engineer"));
    let start = h
        .engine
        .start_interview(&user, "mid", "technical")
        .await
        .expect("start");

    let outcome = h
        .engine
        .submit_answer(start.session_id, h.catalog[0].id, "only answer", 0)
        .await
        .expect("completes");
    assert!(matches!(outcome, SubmitOutcome::Completed { .. }));

    let err = h
        .engine
        .submit_answer(start.session_id, h.catalog[0].id, "again", 0)
        .await
        .expect_err("terminal state");
    assert!(matches!(err, Error::Validation(_)), "got {:?}", err);
    assert_eq!(h.provider.comprehensive_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn interrupted_completion_resumes_on_final_resubmission() {
    let h = setup(2);
    let user = make_user(Some("Backend Engineer"));
    let start = h
        .engine
        .start_interview(&user, "mid", "technical")
        .await
        .expect("start");

    h.engine
        .submit_answer(start.session_id, h.catalog[0].id, "ans1", 0)
        .await
        .expect("first answer");

    // The comprehensive call dies after the final answer has landed.
    h.provider.fail_comprehensive.store(true, Ordering::SeqCst);
    let err = h
        .engine
        .submit_answer(start.session_id, h.catalog[1].id, "ans2", 1)
        .await
        .expect_err("comprehensive scoring down");
    assert!(matches!(err, Error::Provider(_)), "got {:?}", err);

    let session = h.store.get(start.session_id).await.unwrap().unwrap();
    assert_eq!(session.answered().unwrap().len(), 2);
    assert!(session.completed_at.is_none());

    h.provider.fail_comprehensive.store(false, Ordering::SeqCst);

    // Resubmitting an earlier answer is still a plain duplicate.
    let err = h
        .engine
        .submit_answer(start.session_id, h.catalog[0].id, "ans1", 0)
        .await
        .expect_err("not the final answer");
    assert!(matches!(err, Error::Conflict(_)), "got {:?}", err);

    // Resubmitting the final answer resumes the completion transition from
    // the stored record without re-scoring the answer itself.
    let outcome = h
        .engine
        .submit_answer(start.session_id, h.catalog[1].id, "ans2", 1)
        .await
        .expect("completion resumes");
    match outcome {
        SubmitOutcome::Completed { answers, .. } => assert_eq!(answers.len(), 2),
        SubmitOutcome::InProgress { .. } => panic!("session should be complete"),
    }

    let session = h.store.get(start.session_id).await.unwrap().unwrap();
    assert!(session.completed_at.is_some());
    assert!(session.overall_score.is_some());
    assert_eq!(h.provider.answer_calls.load(Ordering::SeqCst), 2);
    assert_eq!(h.provider.comprehensive_calls.load(Ordering::SeqCst), 2);

    // Terminal state afterwards: no further resumes, no recomputation.
    let err = h
        .engine
        .submit_answer(start.session_id, h.catalog[1].id, "ans2", 1)
        .await
        .expect_err("terminal state");
    assert!(matches!(err, Error::Validation(_)), "got {:?}", err);
    assert_eq!(h.provider.comprehensive_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn lost_compare_and_swap_is_retried_once() {
    let catalog = make_catalog(2);
    let inner = Arc::new(MemoryStore::default());
    let provider = Arc::new(StubProvider::default());
    let flaky = Arc::new(FlakyStore {
        inner: inner.clone(),
        fail_next_append: AtomicBool::new(false),
    });
    let engine = SessionProgressionEngine::new(
        Arc::new(MemoryCatalog {
            questions: catalog.clone(),
        }),
        flaky.clone(),
        provider.clone(),
    );

    let user = make_user(Some("Backend Engineer"));
    let start = engine
        .start_interview(&user, "mid", "technical")
        .await
        .expect("start");

    flaky.fail_next_append.store(true, Ordering::SeqCst);
    let outcome = engine
        .submit_answer(start.session_id, catalog[0].id, "ans1", 0)
        .await
        .expect("second pass lands");
    assert!(matches!(outcome, SubmitOutcome::InProgress { .. }));
    assert_eq!(inner.answered_count(start.session_id), 1);
    // Full re-validation means the provider was consulted on both passes.
    assert_eq!(provider.answer_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn results_require_ownership() {
    let h = setup(2);
    let owner = make_user(Some("Backend Engineer"));
    let stranger = make_user(Some("Data Analyst"));
    let start = h
        .engine
        .start_interview(&owner, "mid", "technical")
        .await
        .expect("start");

    let err = h
        .engine
        .get_results(start.session_id, &stranger)
        .await
        .expect_err("not the owner");
    assert!(matches!(err, Error::Forbidden(_)), "got {:?}", err);

    h.engine
        .get_results(start.session_id, &owner)
        .await
        .expect("owner can read");
}

#[tokio::test]
async fn unknown_session_and_question_are_not_found() {
    let h = setup(2);
    let user = make_user(Some("Backend Engineer"));

    let err = h
        .engine
        .submit_answer(Uuid::new_v4(), h.catalog[0].id, "ans", 0)
        .await
        .expect_err("no session");
    assert!(matches!(err, Error::NotFound(_)));

    let start = h
        .engine
        .start_interview(&user, "mid", "technical")
        .await
        .expect("start");
    let err = h
        .engine
        .submit_answer(start.session_id, Uuid::new_v4(), "ans", 0)
        .await
        .expect_err("question not in catalog");
    assert!(matches!(err, Error::NotFound(_)));

    let err = h
        .engine
        .get_results(Uuid::new_v4(), &user)
        .await
        .expect_err("no session");
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn start_requires_profile_job_role() {
    let h = setup(2);
    let user = make_user(None);
    let err = h
        .engine
        .start_interview(&user, "mid", "technical")
        .await
        .expect_err("no job role");
    assert!(matches!(err, Error::Config(_)), "got {:?}", err);
}

#[tokio::test]
async fn start_rejects_blank_inputs_and_empty_catalog() {
    let h = setup(2);
    let user = make_user(Some("Backend Engineer"));

    let err = h
        .engine
        .start_interview(&user, "  ", "technical")
        .await
        .expect_err("blank job level");
    assert!(matches!(err, Error::Validation(_)));

    let err = h
        .engine
        .start_interview(&user, "mid", "")
        .await
        .expect_err("blank interview type");
    assert!(matches!(err, Error::Validation(_)));

    let empty = setup(0);
    let err = empty
        .engine
        .start_interview(&user, "mid", "technical")
        .await
        .expect_err("empty catalog");
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn blank_answer_text_is_rejected_before_any_lookup() {
    let h = setup(2);
    let err = h
        .engine
        .submit_answer(Uuid::new_v4(), h.catalog[0].id, "   ", 0)
        .await
        .expect_err("blank answer");
    assert!(matches!(err, Error::Validation(_)));
    assert_eq!(h.provider.answer_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn question_lookup_by_index_is_bounds_checked() {
    let h = setup(3);

    let lookup = h.engine.get_question_by_index(1).await.expect("in range");
    assert_eq!(lookup.question.id, h.catalog[1].id);
    assert_eq!(lookup.question_number, 2);
    assert_eq!(lookup.total_questions, 3);

    let err = h
        .engine
        .get_question_by_index(3)
        .await
        .expect_err("out of range");
    assert!(matches!(err, Error::NotFound(_)));

    let err = h
        .engine
        .get_question_by_index(-1)
        .await
        .expect_err("negative");
    assert!(matches!(err, Error::Validation(_)));
}
