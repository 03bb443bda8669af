//! LessonEvaluator -- the extraction pipeline orchestrator.
//!
//! Sequences trigger, prompt, model call, parse, filter and persistence for
//! one turn. The contract is total: every failure is logged through the
//! injected [`ExtractionLog`] and turned into an (often empty) result.

use std::future::Future;

use chrono::Utc;
use gleaner_types::config::ExtractionConfig;
use gleaner_types::lesson::{ExtractionResult, ExtractionStage, LessonEntry};
use gleaner_types::llm::{CompletionRequest, Message};
use gleaner_types::turn::{SessionState, Turn};
use tokio_util::sync::CancellationToken;

use super::filter::check_candidate;
use super::log::{ExtractionLog, TracingLog};
use super::parse::parse_candidates;
use super::prompt::build_extraction_prompt;
use super::trigger::TriggerEvaluator;
use crate::lesson::store::LessonRepository;
use crate::llm::box_provider::BoxLlmProvider;

/// Post-turn lesson extractor.
///
/// Generic over the lesson repository; the model provider is type-erased so
/// the host can pick it at runtime.
pub struct LessonEvaluator<R: LessonRepository, L: ExtractionLog = TracingLog> {
    provider: BoxLlmProvider,
    repo: R,
    log: L,
    config: ExtractionConfig,
}

impl<R: LessonRepository> LessonEvaluator<R, TracingLog> {
    /// Create an evaluator that logs through `tracing`.
    pub fn new(provider: BoxLlmProvider, repo: R, config: ExtractionConfig) -> Self {
        Self::with_log(provider, repo, config, TracingLog)
    }
}

impl<R: LessonRepository, L: ExtractionLog> LessonEvaluator<R, L> {
    /// Create an evaluator with a custom log sink.
    pub fn with_log(provider: BoxLlmProvider, repo: R, config: ExtractionConfig, log: L) -> Self {
        Self {
            provider,
            repo,
            log,
            config: config.sanitized(),
        }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    /// Whether this turn should be handed to [`Self::handle`]. Pure.
    pub fn validate(&self, turn: &Turn, state: &SessionState) -> bool {
        TriggerEvaluator::should_extract(&turn.text, state)
    }

    /// Run the pipeline for one turn and return the records actually stored.
    ///
    /// Dropping the returned future abandons any in-flight model or store call.
    pub async fn handle(&self, turn: &Turn, state: &SessionState) -> ExtractionResult {
        self.run(turn, state, None).await
    }

    /// Like [`Self::handle`], but stops at the next await point once `cancel`
    /// fires, returning whatever was stored so far.
    pub async fn handle_cancellable(
        &self,
        turn: &Turn,
        state: &SessionState,
        cancel: &CancellationToken,
    ) -> ExtractionResult {
        self.run(turn, state, Some(cancel)).await
    }

    #[tracing::instrument(
        name = "extract_lessons",
        skip(self, turn, state, cancel),
        fields(turn_id = %turn.id, room_id = %turn.room_id, stage = tracing::field::Empty)
    )]
    async fn run(
        &self,
        turn: &Turn,
        state: &SessionState,
        cancel: Option<&CancellationToken>,
    ) -> ExtractionResult {
        let result = self.run_stages(turn, state, cancel).await;
        tracing::Span::current().record("stage", tracing::field::display(result.stage));
        result
    }

    async fn run_stages(
        &self,
        turn: &Turn,
        state: &SessionState,
        cancel: Option<&CancellationToken>,
    ) -> ExtractionResult {
        if !TriggerEvaluator::should_extract(&turn.text, state) {
            tracing::debug!("no trigger signal, skipping extraction");
            return ExtractionResult::empty(ExtractionStage::Skipped);
        }
        tracing::debug!(
            signals = ?TriggerEvaluator::signals(&turn.text, state),
            "extraction triggered"
        );

        let prompt = build_extraction_prompt(state, &turn.text, self.config.context_window);
        let request = CompletionRequest {
            model: self.config.model.clone(),
            messages: vec![Message::user(prompt)],
            system: None,
            max_tokens: self.config.max_tokens,
            temperature: Some(self.config.temperature),
            stop_sequences: None,
        };

        let response = match until_cancelled(cancel, self.provider.complete(&request)).await {
            None => {
                tracing::info!("extraction cancelled during model call");
                return ExtractionResult::empty(ExtractionStage::Cancelled);
            }
            Some(Ok(response)) => response,
            Some(Err(e)) => {
                self.log
                    .error(&format!("lesson extraction failed: model call error: {e}"));
                return ExtractionResult::empty(ExtractionStage::ModelFailed);
            }
        };

        let raw = match parse_candidates(&response.content) {
            Ok(raw) => raw,
            Err(e) => {
                self.log
                    .warn(&format!("could not parse lesson extraction output: {e}"));
                return ExtractionResult::empty(ExtractionStage::FailedParse);
            }
        };

        let mut admitted = Vec::with_capacity(raw.len());
        let mut rejected = 0usize;
        for candidate in &raw {
            match check_candidate(candidate, self.config.min_confidence) {
                Ok(record) => admitted.push(record),
                Err(_) => rejected += 1,
            }
        }
        tracing::debug!(
            candidates = raw.len(),
            admitted = admitted.len(),
            rejected,
            "filtered extraction candidates"
        );

        let mut stored = Vec::with_capacity(admitted.len());
        for record in admitted {
            let entry = LessonEntry::from_candidate(&record, turn, Utc::now());
            match until_cancelled(cancel, self.repo.save_lesson(&entry)).await {
                None => {
                    tracing::info!(stored = stored.len(), "extraction cancelled while persisting");
                    return ExtractionResult {
                        records: stored,
                        stage: ExtractionStage::Cancelled,
                    };
                }
                Some(Ok(())) => stored.push(record),
                Some(Err(e)) => {
                    self.log
                        .error(&format!("failed to store lesson '{}': {e}", record.text));
                }
            }
        }

        if !stored.is_empty() {
            self.log
                .info(&format!("extracted {} lesson(s) from turn", stored.len()));
        }

        ExtractionResult {
            records: stored,
            stage: ExtractionStage::Done,
        }
    }
}

/// Await `fut`, or return `None` as soon as `cancel` fires.
async fn until_cancelled<F: Future>(cancel: Option<&CancellationToken>, fut: F) -> Option<F::Output> {
    match cancel {
        None => Some(fut.await),
        Some(token) => {
            tokio::select! {
                biased;
                _ = token.cancelled() => None,
                out = fut => Some(out),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use gleaner_types::error::RepositoryError;
    use gleaner_types::llm::{
        CompletionResponse, LlmError, ProviderCapabilities, StopReason, Usage,
    };
    use gleaner_types::turn::ActionResult;
    use serde_json::json;
    use uuid::Uuid;

    use crate::llm::provider::LlmProvider;

    // -----------------------------------------------------------------------
    // Mocks
    // -----------------------------------------------------------------------

    struct MockProvider {
        reply: Result<String, LlmError>,
        calls: Arc<AtomicUsize>,
        last_request: Arc<Mutex<Option<CompletionRequest>>>,
        hang: bool,
        capabilities: ProviderCapabilities,
    }

    impl MockProvider {
        fn replying(text: &str) -> Self {
            Self::with_reply(Ok(text.to_string()))
        }

        fn failing(error: LlmError) -> Self {
            Self::with_reply(Err(error))
        }

        fn with_reply(reply: Result<String, LlmError>) -> Self {
            Self {
                reply,
                calls: Arc::new(AtomicUsize::new(0)),
                last_request: Arc::new(Mutex::new(None)),
                hang: false,
                capabilities: ProviderCapabilities {
                    max_context_tokens: 200_000,
                    max_output_tokens: 8_192,
                },
            }
        }
    }

    impl LlmProvider for MockProvider {
        fn name(&self) -> &str {
            "mock"
        }

        fn capabilities(&self) -> &ProviderCapabilities {
            &self.capabilities
        }

        async fn complete(
            &self,
            request: &CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_request.lock().unwrap() = Some(request.clone());
            if self.hang {
                std::future::pending::<()>().await;
            }
            match &self.reply {
                Ok(text) => Ok(CompletionResponse {
                    id: "msg-mock".to_string(),
                    content: text.clone(),
                    model: request.model.clone(),
                    stop_reason: StopReason::EndTurn,
                    usage: Usage::default(),
                }),
                Err(e) => Err(e.clone()),
            }
        }
    }

    #[derive(Default)]
    struct MockRepo {
        saved: Mutex<Vec<LessonEntry>>,
        calls: AtomicUsize,
        fail_on: Vec<String>,
        cancel_after_first: Option<CancellationToken>,
    }

    impl MockRepo {
        fn failing_on(contents: &[&str]) -> Self {
            Self {
                fail_on: contents.iter().map(|s| s.to_string()).collect(),
                ..Default::default()
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn saved_contents(&self) -> Vec<String> {
            self.saved
                .lock()
                .unwrap()
                .iter()
                .map(|e| e.content.clone())
                .collect()
        }
    }

    impl LessonRepository for MockRepo {
        async fn save_lesson(&self, entry: &LessonEntry) -> Result<(), RepositoryError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(token) = &self.cancel_after_first {
                if call >= 1 {
                    token.cancel();
                    std::future::pending::<()>().await;
                }
            }
            if self.fail_on.contains(&entry.content) {
                return Err(RepositoryError::Query("disk full".to_string()));
            }
            self.saved.lock().unwrap().push(entry.clone());
            Ok(())
        }

        async fn get_lessons(
            &self,
            room_id: &Uuid,
            _limit: Option<i64>,
        ) -> Result<Vec<LessonEntry>, RepositoryError> {
            Ok(self
                .saved
                .lock()
                .unwrap()
                .iter()
                .filter(|e| e.room_id == *room_id)
                .cloned()
                .collect())
        }

        async fn recent_lessons(&self, _limit: i64) -> Result<Vec<LessonEntry>, RepositoryError> {
            Ok(self.saved.lock().unwrap().clone())
        }

        async fn delete_lesson(&self, _lesson_id: &Uuid) -> Result<(), RepositoryError> {
            Ok(())
        }

        async fn delete_all_lessons(&self, _room_id: &Uuid) -> Result<u64, RepositoryError> {
            Ok(0)
        }
    }

    #[derive(Clone, Default)]
    struct RecordingLog {
        infos: Arc<Mutex<Vec<String>>>,
        warnings: Arc<Mutex<Vec<String>>>,
        errors: Arc<Mutex<Vec<String>>>,
    }

    impl RecordingLog {
        fn counts(&self) -> (usize, usize, usize) {
            (
                self.infos.lock().unwrap().len(),
                self.warnings.lock().unwrap().len(),
                self.errors.lock().unwrap().len(),
            )
        }
    }

    impl ExtractionLog for RecordingLog {
        fn info(&self, message: &str) {
            self.infos.lock().unwrap().push(message.to_string());
        }

        fn warn(&self, message: &str) {
            self.warnings.lock().unwrap().push(message.to_string());
        }

        fn error(&self, message: &str) {
            self.errors.lock().unwrap().push(message.to_string());
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    struct Harness {
        evaluator: LessonEvaluator<MockRepo, RecordingLog>,
        model_calls: Arc<AtomicUsize>,
        last_request: Arc<Mutex<Option<CompletionRequest>>>,
        log: RecordingLog,
    }

    fn harness(provider: MockProvider, repo: MockRepo) -> Harness {
        let model_calls = provider.calls.clone();
        let last_request = provider.last_request.clone();
        let log = RecordingLog::default();
        let evaluator = LessonEvaluator::with_log(
            BoxLlmProvider::new(provider),
            repo,
            ExtractionConfig::default(),
            log.clone(),
        );
        Harness {
            evaluator,
            model_calls,
            last_request,
            log,
        }
    }

    fn turn(text: &str) -> Turn {
        Turn::new(text, Uuid::now_v7(), Uuid::now_v7())
    }

    fn lessons_json(lessons: &[(&str, f64)]) -> String {
        let items: Vec<_> = lessons
            .iter()
            .map(|(text, confidence)| {
                json!({"text": text, "category": "error-handling", "confidence": confidence})
            })
            .collect();
        serde_json::Value::Array(items).to_string()
    }

    // -----------------------------------------------------------------------
    // Scenarios
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_completed_turn_stores_one_lesson() {
        let h = harness(
            MockProvider::replying(
                r#"[{"text":"Use smaller PRs","category":"task-estimation","confidence":0.8,"outcome":"success"}]"#,
            ),
            MockRepo::default(),
        );
        let turn = turn("Task completed! PR merged.");
        let state = SessionState::default();

        assert!(h.evaluator.validate(&turn, &state));
        let result = h.evaluator.handle(&turn, &state).await;

        assert_eq!(result.stage, ExtractionStage::Done);
        assert_eq!(result.len(), 1);
        assert_eq!(result.records[0].text, "Use smaller PRs");
        assert_eq!(result.records[0].outcome, "success");
        assert_eq!(h.model_calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.evaluator.repo().call_count(), 1);
        assert_eq!(h.log.counts(), (1, 0, 0));

        let saved = h.evaluator.repo().saved.lock().unwrap();
        assert_eq!(saved[0].room_id, turn.room_id);
        assert_eq!(saved[0].entity_id, turn.entity_id);
        assert_eq!(saved[0].metadata.kind, "lesson");
        assert_eq!(saved[0].metadata.category, "task-estimation");
        assert_eq!(saved[0].metadata.confidence, 0.8);
    }

    #[tokio::test]
    async fn test_low_confidence_feedback_stores_nothing() {
        let h = harness(
            MockProvider::replying(r#"[{"text":"x","category":"c","confidence":0.3}]"#),
            MockRepo::default(),
        );
        let result = h
            .evaluator
            .handle(&turn("that's wrong"), &SessionState::default())
            .await;

        assert!(result.is_empty());
        assert_eq!(result.stage, ExtractionStage::Done);
        assert_eq!(h.model_calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.evaluator.repo().call_count(), 0);
        assert_eq!(h.log.counts(), (0, 0, 0));
    }

    #[tokio::test]
    async fn test_lowered_threshold_in_config_still_excludes_weak_lessons() {
        let repo = MockRepo::default();
        let evaluator = LessonEvaluator::with_log(
            BoxLlmProvider::new(MockProvider::replying(&lessons_json(&[
                ("weak", 0.3),
                ("solid", 0.6),
            ]))),
            repo,
            ExtractionConfig {
                min_confidence: 0.2,
                ..ExtractionConfig::default()
            },
            RecordingLog::default(),
        );
        assert!((evaluator.config().min_confidence - 0.5).abs() < f64::EPSILON);

        let result = evaluator
            .handle(&turn("Task completed"), &SessionState::default())
            .await;

        let texts: Vec<_> = result.records.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["solid"]);
        assert_eq!(evaluator.repo().call_count(), 1);
    }

    #[tokio::test]
    async fn test_no_signal_skips_model_call() {
        let h = harness(MockProvider::replying("[]"), MockRepo::default());
        let turn = turn("hello");
        let state = SessionState::default();

        assert!(!h.evaluator.validate(&turn, &state));
        let result = h.evaluator.handle(&turn, &state).await;

        assert!(result.is_empty());
        assert_eq!(result.stage, ExtractionStage::Skipped);
        assert_eq!(h.model_calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.evaluator.repo().call_count(), 0);
    }

    #[tokio::test]
    async fn test_unparseable_output_warns_once() {
        let h = harness(MockProvider::replying("not json"), MockRepo::default());
        let result = h
            .evaluator
            .handle(&turn("Task completed"), &SessionState::default())
            .await;

        assert!(result.is_empty());
        assert_eq!(result.stage, ExtractionStage::FailedParse);
        assert_eq!(h.log.counts(), (0, 1, 0));
        assert_eq!(h.evaluator.repo().call_count(), 0);
    }

    #[tokio::test]
    async fn test_non_array_output_warns_once() {
        let h = harness(
            MockProvider::replying(r#"{"text":"x","category":"c","confidence":0.9}"#),
            MockRepo::default(),
        );
        let result = h
            .evaluator
            .handle(&turn("the job failed"), &SessionState::default())
            .await;

        assert!(result.is_empty());
        assert_eq!(result.stage, ExtractionStage::FailedParse);
        assert_eq!(h.log.counts(), (0, 1, 0));
    }

    // -----------------------------------------------------------------------
    // Properties
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_model_failure_yields_empty_result_and_error_log() {
        let h = harness(
            MockProvider::failing(LlmError::RateLimited {
                retry_after_ms: Some(1_000),
            }),
            MockRepo::default(),
        );
        let result = h
            .evaluator
            .handle(&turn("Task completed"), &SessionState::default())
            .await;

        assert!(result.is_empty());
        assert_eq!(result.stage, ExtractionStage::ModelFailed);
        assert_eq!(h.log.counts(), (0, 0, 1));
        assert_eq!(h.model_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_partial_store_failure_returns_exactly_stored_records() {
        let h = harness(
            MockProvider::replying(&lessons_json(&[("first", 0.9), ("second", 0.8), ("third", 0.7)])),
            MockRepo::failing_on(&["second"]),
        );
        let result = h
            .evaluator
            .handle(&turn("Task completed"), &SessionState::default())
            .await;

        let texts: Vec<_> = result.records.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "third"]);
        assert_eq!(result.stage, ExtractionStage::Done);
        assert_eq!(h.evaluator.repo().call_count(), 3);
        assert_eq!(h.evaluator.repo().saved_contents(), vec!["first", "third"]);
        assert_eq!(h.log.counts(), (1, 0, 1));
    }

    #[tokio::test]
    async fn test_all_stores_failing_returns_empty_without_info() {
        let h = harness(
            MockProvider::replying(&lessons_json(&[("only", 0.9)])),
            MockRepo::failing_on(&["only"]),
        );
        let result = h
            .evaluator
            .handle(&turn("Task completed"), &SessionState::default())
            .await;

        assert!(result.is_empty());
        assert_eq!(result.stage, ExtractionStage::Done);
        assert_eq!(h.log.counts(), (0, 0, 1));
    }

    #[tokio::test]
    async fn test_missing_fields_excluded_even_when_confident() {
        let reply = json!([
            {"category": "c", "confidence": 0.95},
            {"text": "no category", "confidence": 0.95},
            {"text": "kept", "category": "c", "confidence": 0.95}
        ])
        .to_string();
        let h = harness(MockProvider::replying(&reply), MockRepo::default());
        let result = h
            .evaluator
            .handle(&turn("great work"), &SessionState::default())
            .await;

        assert_eq!(result.len(), 1);
        assert_eq!(result.records[0].text, "kept");
        assert_eq!(result.records[0].outcome, "partial");
        assert_eq!(h.evaluator.repo().call_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_array_is_done_and_silent() {
        let h = harness(MockProvider::replying("  []\n"), MockRepo::default());
        let result = h
            .evaluator
            .handle(&turn("Task completed"), &SessionState::default())
            .await;

        assert!(result.is_empty());
        assert_eq!(result.stage, ExtractionStage::Done);
        assert_eq!(h.log.counts(), (0, 0, 0));
    }

    #[tokio::test]
    async fn test_task_result_triggers_and_request_uses_config() {
        let h = harness(MockProvider::replying("[]"), MockRepo::default());
        let state = SessionState {
            recent_messages: Vec::new(),
            action_results: vec![ActionResult {
                action: Some("RUN_TASK".to_string()),
                data: Some(json!({"taskId": "t-9"})),
            }],
        };
        let turn = turn("hello");

        assert!(h.evaluator.validate(&turn, &state));
        h.evaluator.handle(&turn, &state).await;

        let request = h.last_request.lock().unwrap().clone().unwrap();
        assert_eq!(request.temperature, Some(0.3));
        assert_eq!(request.model, h.evaluator.config().model);
        assert_eq!(request.messages.len(), 1);
        assert!(request.messages[0].content.contains("Current message:\nhello"));
    }

    // -----------------------------------------------------------------------
    // Cancellation
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_cancel_during_model_call() {
        let mut provider = MockProvider::replying("[]");
        provider.hang = true;
        let h = harness(provider, MockRepo::default());
        let token = CancellationToken::new();

        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            canceller.cancel();
        });

        let result = h
            .evaluator
            .handle_cancellable(&turn("Task completed"), &SessionState::default(), &token)
            .await;

        assert!(result.is_empty());
        assert_eq!(result.stage, ExtractionStage::Cancelled);
        assert_eq!(h.evaluator.repo().call_count(), 0);
        assert_eq!(h.log.counts(), (0, 0, 0));
    }

    #[tokio::test]
    async fn test_cancel_while_persisting_keeps_stored_prefix() {
        let token = CancellationToken::new();
        let repo = MockRepo {
            cancel_after_first: Some(token.clone()),
            ..Default::default()
        };
        let h = harness(
            MockProvider::replying(&lessons_json(&[("one", 0.9), ("two", 0.9), ("three", 0.9)])),
            repo,
        );

        let result = h
            .evaluator
            .handle_cancellable(&turn("Task completed"), &SessionState::default(), &token)
            .await;

        assert_eq!(result.stage, ExtractionStage::Cancelled);
        assert_eq!(result.len(), 1);
        assert_eq!(result.records[0].text, "one");
        assert_eq!(h.evaluator.repo().call_count(), 2);
    }

    #[tokio::test]
    async fn test_uncancelled_token_runs_to_completion() {
        let h = harness(MockProvider::replying(&lessons_json(&[("a", 0.9)])), MockRepo::default());
        let token = CancellationToken::new();
        let result = h
            .evaluator
            .handle_cancellable(&turn("Task completed"), &SessionState::default(), &token)
            .await;

        assert_eq!(result.stage, ExtractionStage::Done);
        assert_eq!(result.len(), 1);
    }
}
