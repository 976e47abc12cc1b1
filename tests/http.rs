use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use persona_remix::advisor::Advisor;
use persona_remix::backends::{BackendError, BackendId, TextGenerator};
use persona_remix::http::{app, AppState};
use persona_remix::persona::PersonaRegistry;
use persona_remix::router::ModelRouter;
use persona_remix::saved_messages::{ChangeEvent, SavedMessageStore};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_stream::StreamExt;
use tower::ServiceExt;

struct FakeGenerator {
    id: BackendId,
    reply: Result<String, BackendError>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl FakeGenerator {
    fn new(id: BackendId, reply: Result<String, BackendError>) -> Arc<Self> {
        Arc::new(Self {
            id,
            reply,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn last_prompt(&self) -> String {
        self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl TextGenerator for FakeGenerator {
    fn id(&self) -> BackendId {
        self.id
    }

    async fn generate(&self, prompt: &str) -> Result<String, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.reply.clone()
    }
}

struct Harness {
    _td: tempfile::TempDir,
    state: AppState,
    gemini: Arc<FakeGenerator>,
}

fn harness(gemini_reply: Result<String, BackendError>, claude: Option<Arc<FakeGenerator>>) -> Harness {
    let td = tempfile::tempdir().unwrap();
    let gemini = FakeGenerator::new(BackendId::Gemini, gemini_reply);
    let router = ModelRouter::new(
        Some(gemini.clone() as Arc<dyn TextGenerator>),
        claude.map(|c| c as Arc<dyn TextGenerator>),
        Duration::from_secs(5),
    );
    let state = AppState {
        advisor: Advisor::new(PersonaRegistry::global(), router),
        store: SavedMessageStore::new(td.path().join("saved_messages.json")),
    };
    Harness {
        _td: td,
        state,
        gemini,
    }
}

async fn send(state: &AppState, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(v) => builder
            .header("content-type", "application/json")
            .body(Body::from(v.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let resp = app(state.clone()).oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn advisor_missing_fields_is_400_without_backend_call() {
    let h = harness(Ok("unused".to_string()), None);

    for body in [
        json!({ "aspects": ["focuser"] }),
        json!({ "text": "help", "aspects": [] }),
        json!({ "text": "", "aspects": ["focuser"] }),
    ] {
        let (status, v) = send(&h.state, "POST", "/api/advise", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(v, json!({ "error": "Missing required fields" }));
    }

    let (status, v) = send(
        &h.state,
        "POST",
        "/api/remix",
        Some(json!({ "text": "help", "aspects": [] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(v["error"], "Missing required fields");

    assert_eq!(h.gemini.calls(), 0);
}

#[tokio::test]
async fn advisor_end_to_end_focus_coach() {
    let h = harness(Ok("Pick the one feature users pay for.".to_string()), None);
    let (status, v) = send(
        &h.state,
        "POST",
        "/api/remix",
        Some(json!({
            "text": "I am stuck prioritizing features",
            "aspects": ["focuser"],
            "model": "gemini",
            "projectPhase": "execution",
            "energyLevel": "low"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["success"], true);
    assert_eq!(v["remixedText"], "Pick the one feature users pay for.");
    assert_eq!(v["modelUsed"], "gemini");
    assert_eq!(v["aspectsUsed"], json!(["focuser"]));

    let focuser = PersonaRegistry::global().aspect("focuser").unwrap();
    let prompt = h.gemini.last_prompt();
    assert!(prompt.contains(&format!("The Focus Coach: {}", focuser.prompt_style)));
    assert!(prompt.contains("Project Phase: execution"));
    assert!(prompt.contains("Energy Level: low"));
}

#[tokio::test]
async fn claude_without_key_is_served_by_gemini() {
    let h = harness(Ok("advice".to_string()), None);
    let (status, v) = send(
        &h.state,
        "POST",
        "/api/advise",
        Some(json!({ "text": "Should I pivot?", "aspects": ["validator"], "model": "claude" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["modelUsed"], "gemini");
    assert_eq!(h.gemini.calls(), 1);
}

#[tokio::test]
async fn claude_with_key_is_used() {
    let claude = FakeGenerator::new(BackendId::Claude, Ok("from claude".to_string()));
    let h = harness(Ok("from gemini".to_string()), Some(claude.clone()));
    let (status, v) = send(
        &h.state,
        "POST",
        "/api/remix",
        Some(json!({ "text": "AI tutors", "persona": "visionary", "model": "claude" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["remixedText"], "from claude");
    assert_eq!(v["modelUsed"], "claude");
    assert_eq!(v["personaUsed"], "The Visionary");
    assert_eq!(claude.calls(), 1);
    assert_eq!(h.gemini.calls(), 0);
}

#[tokio::test]
async fn legacy_remix_with_skeptic() {
    let h = harness(Ok("Mocked remixed content".to_string()), None);
    let (status, v) = send(
        &h.state,
        "POST",
        "/api/remix",
        Some(json!({
            "text": "Large Language Models are transforming education.",
            "persona": "skeptic",
            "model": "gemini"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["remixedText"], "Mocked remixed content");
    assert_eq!(v["modelUsed"], "gemini");
    assert_eq!(v["personaUsed"], "The Skeptic");
    assert!(h
        .gemini
        .last_prompt()
        .starts_with("Remix the following text from the perspective of skeptic."));
}

#[tokio::test]
async fn legacy_remix_without_text_is_400() {
    let h = harness(Ok("unused".to_string()), None);
    let (status, v) = send(&h.state, "POST", "/api/remix", Some(json!({ "persona": "skeptic" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(v["error"].as_str().unwrap().contains("text"));
    assert_eq!(h.gemini.calls(), 0);
}

#[tokio::test]
async fn backend_failure_is_500_with_details() {
    let h = harness(
        Err(BackendError::Status {
            backend: BackendId::Gemini,
            status: 503,
            message: "UNAVAILABLE: model overloaded".to_string(),
        }),
        None,
    );

    let (status, v) = send(
        &h.state,
        "POST",
        "/api/advise",
        Some(json!({ "text": "help", "aspects": ["validator"] })),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(v["success"], false);
    assert_eq!(v["error"], "Failed to generate advice");
    assert!(v["details"].as_str().unwrap().contains("model overloaded"));
    assert!(v.get("remixedText").is_none());

    let (status, v) = send(&h.state, "POST", "/api/remix", Some(json!({ "text": "help" }))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(v["error"].as_str().unwrap().contains("model overloaded"));
    assert!(v.get("remixedText").is_none());
}

#[tokio::test]
async fn invalid_json_and_bad_phase_are_400() {
    let h = harness(Ok("unused".to_string()), None);

    let req = Request::builder()
        .method("POST")
        .uri("/api/advise")
        .header("content-type", "application/json")
        .body(Body::from("{ not json"))
        .unwrap();
    let resp = app(h.state.clone()).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let (status, v) = send(
        &h.state,
        "POST",
        "/api/advise",
        Some(json!({ "text": "help", "aspects": ["focuser"], "projectPhase": "launch" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(v["error"].as_str().unwrap().contains("projectPhase"));
    assert_eq!(h.gemini.calls(), 0);
}

#[tokio::test]
async fn catalog_and_model_listing() {
    let h = harness(Ok("unused".to_string()), None);

    let (status, v) = send(&h.state, "GET", "/api/aspects", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v[0]["id"], "validator");
    assert_eq!(v[0]["traitName"], "The Idea Validator");
    assert_eq!(v[1]["id"], "focuser");

    let (status, v) = send(&h.state, "GET", "/api/models", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        v,
        json!([
            { "id": "gemini", "configured": true, "default": true },
            { "id": "claude", "configured": false, "default": false }
        ])
    );

    let (status, v) = send(&h.state, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["status"], "ok");
}

#[tokio::test]
async fn saved_messages_lifecycle() {
    let h = harness(Ok("unused".to_string()), None);
    let mut changes = h.state.store.subscribe();

    let (status, first) = send(
        &h.state,
        "POST",
        "/api/saved-messages",
        Some(json!({ "content": "first", "role": "assistant", "created_at": "2024-01-01T00:00:00Z" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(first["content"], "first");

    let (status, second) = send(
        &h.state,
        "POST",
        "/api/saved-messages",
        Some(json!({ "content": "second", "role": "user", "created_at": "2024-01-02T00:00:00Z" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, list) = send(&h.state, "GET", "/api/saved-messages", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list[0]["content"], "second");
    assert_eq!(list[1]["content"], "first");

    let (_, asc) = send(&h.state, "GET", "/api/saved-messages?direction=asc", None).await;
    assert_eq!(asc[0]["content"], "first");

    let id = first["id"].as_str().unwrap().to_string();
    let (status, _) = send(&h.state, "DELETE", &format!("/api/saved-messages/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&h.state, "DELETE", &format!("/api/saved-messages/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, list) = send(&h.state, "GET", "/api/saved-messages", None).await;
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["id"], second["id"]);

    assert!(matches!(changes.recv().await.unwrap(), ChangeEvent::Inserted(m) if m.content == "first"));
    assert!(matches!(changes.recv().await.unwrap(), ChangeEvent::Inserted(m) if m.content == "second"));
    assert_eq!(
        changes.recv().await.unwrap(),
        ChangeEvent::Deleted { id }
    );
}

#[tokio::test]
async fn empty_saved_message_is_400() {
    let h = harness(Ok("unused".to_string()), None);
    let (status, v) = send(
        &h.state,
        "POST",
        "/api/saved-messages",
        Some(json!({ "content": "  ", "role": "user" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(v["error"].as_str().unwrap().contains("empty"));
}

#[tokio::test]
async fn change_stream_is_server_sent_events() {
    let h = harness(Ok("unused".to_string()), None);
    let req = Request::builder()
        .uri("/api/saved-messages/changes")
        .body(Body::empty())
        .unwrap();
    let resp = app(h.state.clone()).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()["content-type"].to_str().unwrap(),
        "text/event-stream"
    );
}

#[tokio::test]
async fn change_stream_emits_named_events_with_payload() {
    let h = harness(Ok("unused".to_string()), None);
    let req = Request::builder()
        .uri("/api/saved-messages/changes")
        .body(Body::empty())
        .unwrap();
    let resp = app(h.state.clone()).oneshot(req).await.unwrap();
    let mut frames = resp.into_body().into_data_stream();

    let (status, saved) = send(
        &h.state,
        "POST",
        "/api/saved-messages",
        Some(json!({ "content": "keep this", "role": "assistant" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let frame = tokio::time::timeout(Duration::from_secs(5), frames.next())
        .await
        .expect("no event before timeout")
        .unwrap()
        .unwrap();
    let text = String::from_utf8(frame.to_vec()).unwrap();
    assert!(text.contains("event: inserted"), "{text}");

    let data = text
        .lines()
        .find_map(|l| l.strip_prefix("data: "))
        .unwrap();
    let payload: Value = serde_json::from_str(data).unwrap();
    assert_eq!(payload["event"], "inserted");
    assert_eq!(payload["id"], saved["id"]);
    assert_eq!(payload["content"], "keep this");
}
