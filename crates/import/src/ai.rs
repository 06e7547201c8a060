use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::staging::ImportSession;

/// Description → proposed category name.
pub type CategoryProposals = HashMap<String, String>;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("AI classification request failed: {0}")]
    Transport(String),
    #[error("AI classification service rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },
    #[error("Could not decode AI classification response: {0}")]
    Decode(String),
    #[error("AI classification task did not complete: {0}")]
    Task(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationRequest {
    pub descriptions: Vec<String>,
    /// Both directions combined.
    pub categories: Vec<String>,
}

/// The external classification service.
#[async_trait]
pub trait CategorySuggester: Send + Sync {
    async fn suggest(&self, request: &ClassificationRequest) -> Result<CategoryProposals, AiError>;
}

/// Reads `{"categories": {"<description>": "<category>"}}`. Entries whose value
/// is not a string are left unresolved; any other shape is an error.
pub fn parse_response(body: &serde_json::Value) -> Result<CategoryProposals, AiError> {
    let map = body
        .get("categories")
        .and_then(serde_json::Value::as_object)
        .ok_or_else(|| AiError::Decode("expected an object with a 'categories' map".to_string()))?;

    Ok(map
        .iter()
        .filter_map(|(desc, cat)| {
            let cat = cat.as_str()?.trim();
            (!cat.is_empty()).then(|| (desc.clone(), cat.to_string()))
        })
        .collect())
}

// ── HTTP backend ──────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct HttpRequestBody<'a> {
    #[serde(flatten)]
    request: &'a ClassificationRequest,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
}

/// Posts the request as JSON to a classification endpoint.
pub struct HttpSuggester {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: Option<String>,
}

impl HttpSuggester {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, AiError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AiError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key: None,
            model: None,
        })
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl CategorySuggester for HttpSuggester {
    async fn suggest(&self, request: &ClassificationRequest) -> Result<CategoryProposals, AiError> {
        let body = HttpRequestBody {
            request,
            model: self.model.as_deref(),
        };

        let mut builder = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let resp = builder.send().await.map_err(|e| {
            tracing::error!("Failed to send classification request to {}: {}", self.endpoint, e);
            AiError::Transport(e.to_string())
        })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AiError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let value: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| AiError::Decode(e.to_string()))?;
        parse_response(&value)
    }
}

// ── Canned backend (used for tests and offline runs) ──────────────────────────

/// Returns a fixed response regardless of the request.
pub struct StaticSuggester {
    response: Result<CategoryProposals, String>,
}

impl StaticSuggester {
    pub fn new(proposals: CategoryProposals) -> Self {
        Self { response: Ok(proposals) }
    }

    /// Always fails with a transport error carrying `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            response: Err(message.into()),
        }
    }
}

#[async_trait]
impl CategorySuggester for StaticSuggester {
    async fn suggest(&self, _request: &ClassificationRequest) -> Result<CategoryProposals, AiError> {
        self.response.clone().map_err(AiError::Transport)
    }
}

// ── Session integration ───────────────────────────────────────────────────────

/// Outcome of one AI round, tagged with the session it was requested for.
#[derive(Debug)]
pub struct ClassificationResult {
    session_id: Uuid,
    outcome: Result<CategoryProposals, AiError>,
}

impl ClassificationResult {
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn outcome(&self) -> &Result<CategoryProposals, AiError> {
        &self.outcome
    }
}

/// An in-flight AI request. The session it came from stays editable meanwhile.
pub struct PendingClassification {
    session_id: Uuid,
    handle: JoinHandle<Result<CategoryProposals, AiError>>,
}

impl PendingClassification {
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn abort(&self) {
        self.handle.abort();
    }

    pub async fn await_result(self) -> ClassificationResult {
        let outcome = match self.handle.await {
            Ok(outcome) => outcome,
            Err(e) => Err(AiError::Task(e.to_string())),
        };
        ClassificationResult {
            session_id: self.session_id,
            outcome,
        }
    }
}

impl ImportSession {
    pub fn classification_request(&self) -> ClassificationRequest {
        ClassificationRequest {
            descriptions: self.distinct_descriptions(),
            categories: self.catalogue().combined(),
        }
    }

    /// Starts an AI round on the tokio runtime using a snapshot of the current
    /// descriptions. Must be called from within a runtime.
    pub fn spawn_ai_classification(
        &self,
        suggester: Arc<dyn CategorySuggester>,
    ) -> PendingClassification {
        let request = self.classification_request();
        let session_id = self.id();
        tracing::info!(
            session = %session_id,
            descriptions = request.descriptions.len(),
            "AI classification started"
        );
        let handle = tokio::spawn(async move {
            if request.descriptions.is_empty() {
                return Ok(CategoryProposals::new());
            }
            suggester.suggest(&request).await
        });
        PendingClassification { session_id, handle }
    }

    /// Merges a finished round. On failure nothing changes and the error is
    /// returned; a result from another session is ignored. Returns the number of
    /// items whose category changed.
    pub fn apply_ai_result(&mut self, result: ClassificationResult) -> Result<usize, AiError> {
        if result.session_id != self.id() {
            tracing::warn!(
                session = %self.id(),
                origin = %result.session_id,
                "discarding AI result from another session"
            );
            return Ok(0);
        }
        match result.outcome {
            Ok(proposals) => {
                let changed = self.apply_category_proposals(&proposals);
                tracing::info!(
                    session = %self.id(),
                    proposals = proposals.len(),
                    changed,
                    "AI classification merged"
                );
                Ok(changed)
            }
            Err(e) => {
                tracing::warn!(session = %self.id(), "AI classification failed: {e}");
                Err(e)
            }
        }
    }

    /// Requests and merges in one step.
    pub async fn classify_with_ai(
        &mut self,
        suggester: &dyn CategorySuggester,
    ) -> Result<usize, AiError> {
        let request = self.classification_request();
        if request.descriptions.is_empty() {
            return Ok(0);
        }
        let outcome = suggester.suggest(&request).await;
        self.apply_ai_result(ClassificationResult {
            session_id: self.id(),
            outcome,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::staging::tests::session_with;
    use crate::staging::{StagingField, StagingId};
    use tokio::sync::Notify;

    fn proposals(pairs: &[(&str, &str)]) -> CategoryProposals {
        pairs
            .iter()
            .map(|(d, c)| (d.to_string(), c.to_string()))
            .collect()
    }

    fn categories(session: &ImportSession) -> Vec<(String, String)> {
        session
            .items()
            .iter()
            .map(|i| (i.description().to_string(), i.category().to_string()))
            .collect()
    }

    /// Holds its answer until released.
    struct GatedSuggester {
        gate: Arc<Notify>,
        proposals: CategoryProposals,
    }

    #[async_trait]
    impl CategorySuggester for GatedSuggester {
        async fn suggest(&self, _request: &ClassificationRequest) -> Result<CategoryProposals, AiError> {
            self.gate.notified().await;
            Ok(self.proposals.clone())
        }
    }

    #[test]
    fn request_has_distinct_descriptions_and_combined_catalogue() {
        let s = session_with(&[("X", "A"), ("Y", "A"), ("X", "A")]);
        let req = s.classification_request();
        assert_eq!(req.descriptions, vec!["X", "Y"]);
        assert_eq!(req.categories, vec!["Vendas", "Outros", "A", "B", "Energia"]);
    }

    #[test]
    fn parse_response_reads_string_values() {
        let body = serde_json::json!({"categories": {"X": "B", "Y": 3, "Z": null, "W": " "}});
        let parsed = parse_response(&body).unwrap();
        assert_eq!(parsed, proposals(&[("X", "B")]));
    }

    #[test]
    fn parse_response_rejects_other_shapes() {
        assert!(matches!(
            parse_response(&serde_json::json!({"X": "B"})),
            Err(AiError::Decode(_))
        ));
        assert!(parse_response(&serde_json::json!(["X", "B"])).is_err());
        assert!(parse_response(&serde_json::json!({"categories": ["B"]})).is_err());
    }

    #[test]
    fn http_body_flattens_request() {
        let req = ClassificationRequest {
            descriptions: vec!["X".into()],
            categories: vec!["A".into()],
        };
        let body = HttpRequestBody {
            request: &req,
            model: Some("small"),
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({"descriptions": ["X"], "categories": ["A"], "model": "small"})
        );
    }

    #[tokio::test]
    async fn merge_overwrites_matching_descriptions() {
        let mut s = session_with(&[("X", "A"), ("Y", "A")]);
        let suggester = StaticSuggester::new(proposals(&[("X", "B")]));
        assert_eq!(s.classify_with_ai(&suggester).await.unwrap(), 1);
        assert_eq!(
            categories(&s),
            vec![("X".to_string(), "B".to_string()), ("Y".to_string(), "A".to_string())]
        );
    }

    #[tokio::test]
    async fn failure_leaves_staging_untouched() {
        let mut s = session_with(&[("X", "A"), ("Y", "A")]);
        s.update_field(StagingId(2), StagingField::Category, "Energia");
        let before = s.items().to_vec();

        let err = s
            .classify_with_ai(&StaticSuggester::failing("connection reset"))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("connection reset"));
        assert_eq!(s.items(), before.as_slice());
    }

    #[tokio::test]
    async fn empty_session_skips_the_call() {
        let mut s = session_with(&[]);
        let suggester = StaticSuggester::failing("should not be called");
        assert_eq!(s.classify_with_ai(&suggester).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn staging_stays_editable_while_outstanding_and_merge_wins() {
        let mut s = session_with(&[("X", "A"), ("Y", "A")]);
        let gate = Arc::new(Notify::new());
        let pending = s.spawn_ai_classification(Arc::new(GatedSuggester {
            gate: gate.clone(),
            proposals: proposals(&[("X", "B")]),
        }));

        tokio::task::yield_now().await;
        assert!(!pending.is_finished());

        // A manual edit made while the request is outstanding.
        s.update_field(StagingId(1), StagingField::Category, "Energia");
        s.update_field(StagingId(2), StagingField::Category, "Energia");

        gate.notify_one();
        let result = pending.await_result().await;
        assert_eq!(s.apply_ai_result(result).unwrap(), 1);
        assert_eq!(
            categories(&s),
            vec![
                ("X".to_string(), "B".to_string()),
                ("Y".to_string(), "Energia".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn result_for_another_session_is_ignored() {
        let origin = session_with(&[("X", "A")]);
        let mut other = session_with(&[("X", "A")]);
        let pending = origin.spawn_ai_classification(Arc::new(StaticSuggester::new(proposals(&[(
            "X", "B",
        )]))));
        origin.cancel();

        let result = pending.await_result().await;
        assert_eq!(other.apply_ai_result(result).unwrap(), 0);
        assert_eq!(other.items()[0].category(), "A");
    }

    #[tokio::test]
    async fn aborted_round_is_a_failure_with_no_changes() {
        let mut s = session_with(&[("X", "A")]);
        let pending = s.spawn_ai_classification(Arc::new(GatedSuggester {
            gate: Arc::new(Notify::new()),
            proposals: proposals(&[("X", "B")]),
        }));
        pending.abort();

        let result = pending.await_result().await;
        assert!(matches!(result.outcome(), Err(AiError::Task(_))));
        assert!(s.apply_ai_result(result).is_err());
        assert_eq!(s.items()[0].category(), "A");
    }

    #[tokio::test]
    async fn http_transport_failure_surfaces_as_error() {
        let suggester =
            HttpSuggester::new("http://127.0.0.1:9/classify", Duration::from_secs(2)).unwrap();
        let mut s = session_with(&[("X", "A")]);
        let err = s.classify_with_ai(&suggester).await.unwrap_err();
        assert!(matches!(err, AiError::Transport(_) | AiError::Rejected { .. }));
        assert_eq!(s.items()[0].category(), "A");
    }

    mod http {
        use super::*;
        use serde_json::json;
        use wiremock::matchers::{body_json, header, method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        fn suggester(server: &MockServer) -> HttpSuggester {
            HttpSuggester::new(format!("{}/classify", server.uri()), Duration::from_secs(5)).unwrap()
        }

        #[tokio::test]
        async fn posts_request_with_bearer_key_and_merges_reply() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/classify"))
                .and(header("authorization", "Bearer sk-caixa"))
                .and(body_json(json!({
                    "descriptions": ["X", "Y"],
                    "categories": ["Vendas", "Outros", "A", "B", "Energia"],
                    "model": "small",
                })))
                .respond_with(
                    ResponseTemplate::new(200).set_body_json(json!({"categories": {"X": "B"}})),
                )
                .expect(1)
                .mount(&server)
                .await;

            let suggester = suggester(&server).with_api_key("sk-caixa").with_model("small");
            let mut s = session_with(&[("X", "A"), ("Y", "A")]);
            assert_eq!(s.classify_with_ai(&suggester).await.unwrap(), 1);
            assert_eq!(
                categories(&s),
                vec![("X".to_string(), "B".to_string()), ("Y".to_string(), "A".to_string())]
            );
        }

        #[tokio::test]
        async fn error_status_is_rejected_and_staging_untouched() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
                .mount(&server)
                .await;

            let mut s = session_with(&[("X", "A")]);
            let before = s.items().to_vec();
            let err = s.classify_with_ai(&suggester(&server)).await.unwrap_err();
            match err {
                AiError::Rejected { status, body } => {
                    assert_eq!(status, 503);
                    assert_eq!(body, "overloaded");
                }
                other => panic!("expected Rejected, got {other:?}"),
            }
            assert_eq!(s.items(), before.as_slice());
        }

        #[tokio::test]
        async fn non_json_body_is_a_decode_failure() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
                .mount(&server)
                .await;

            let mut s = session_with(&[("X", "A")]);
            let before = s.items().to_vec();
            let err = s.classify_with_ai(&suggester(&server)).await.unwrap_err();
            assert!(matches!(err, AiError::Decode(_)));
            assert_eq!(s.items(), before.as_slice());
        }

        #[tokio::test]
        async fn wrong_shape_is_a_decode_failure() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({"X": "B"})))
                .mount(&server)
                .await;

            let mut s = session_with(&[("X", "A")]);
            let err = s.classify_with_ai(&suggester(&server)).await.unwrap_err();
            assert!(matches!(err, AiError::Decode(_)));
            assert_eq!(s.items()[0].category(), "A");
        }

        #[tokio::test]
        async fn no_key_sends_no_authorization_header() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({"categories": {}})))
                .mount(&server)
                .await;

            let mut s = session_with(&[("X", "A")]);
            assert_eq!(s.classify_with_ai(&suggester(&server)).await.unwrap(), 0);

            let requests = server.received_requests().await.unwrap();
            assert_eq!(requests.len(), 1);
            assert!(!requests[0].headers.contains_key("authorization"));
        }
    }
}
