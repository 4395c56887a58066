use std::sync::{Arc, Mutex};
use std::time::Duration;

use agent_chat::agent_directory::{AgentDirectory, DirectoryApi, DirectoryError, HealthStatus};
use agent_chat::agent_socket::{ChatSession, SendOutcome, SessionConfig, SessionError};
use agent_chat::chat_types::{
    Agent, AgentDraft, AgentId, AgentKind, ConnectionStatus, Principal, Role,
};
use agent_chat::{ChatView, ViewError};
use agent_socket_mock::ScriptedConnector;
use async_trait::async_trait;
use pretty_assertions::assert_eq;

#[derive(Default)]
struct FakeApi {
    list: Mutex<Option<Result<Vec<Agent>, DirectoryError>>>,
    create: Mutex<Option<Result<Agent, DirectoryError>>>,
    calls: Mutex<Vec<String>>,
}

impl FakeApi {
    fn with_list(self, result: Result<Vec<Agent>, DirectoryError>) -> Self {
        *self.list.lock().expect("lock") = Some(result);
        self
    }

    fn with_create(self, result: Result<Agent, DirectoryError>) -> Self {
        *self.create.lock().expect("lock") = Some(result);
        self
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("lock").clone()
    }
}

#[async_trait]
impl DirectoryApi for FakeApi {
    async fn list_agents(&self) -> Result<Vec<Agent>, DirectoryError> {
        self.calls.lock().expect("lock").push("list".to_owned());
        self.list
            .lock()
            .expect("lock")
            .clone()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn create_agent(&self, draft: &AgentDraft) -> Result<Agent, DirectoryError> {
        self.calls
            .lock()
            .expect("lock")
            .push(format!("create {}", draft.name));
        self.create
            .lock()
            .expect("lock")
            .clone()
            .unwrap_or_else(|| Ok(Agent::from_draft("generated", draft.clone())))
    }

    async fn get_agent(&self, id: &AgentId) -> Result<Agent, DirectoryError> {
        Err(DirectoryError::NotFound { id: id.clone() })
    }

    async fn health(&self) -> Result<HealthStatus, DirectoryError> {
        Ok(HealthStatus {
            status: "ok".to_owned(),
            service: None,
        })
    }
}

fn agent(id: &str, name: &str) -> Agent {
    Agent::from_draft(id, AgentDraft::new(name, "gpt-4.1-mini", "be brief"))
}

fn view_with(api: FakeApi, connector: &ScriptedConnector) -> ChatView<FakeApi> {
    let mut directory = AgentDirectory::new(api);
    directory.seed([AgentKind::new("assistant", "General helper", "gemini-2.5-flash")]);
    let session = ChatSession::new(
        SessionConfig::new("ws://chat.test"),
        Arc::new(connector.clone()),
    );
    ChatView::new(directory, session)
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

#[tokio::test(start_paused = true)]
async fn selecting_an_agent_opens_the_session_and_streams_replies() {
    let connector = ScriptedConnector::new();
    let peer = connector.accept();
    let mut view = view_with(FakeApi::default(), &connector);

    assert_eq!(view.status_line(), "idle: no agent selected");

    view.select_agent(&AgentId::new("assistant"))
        .await
        .expect("select");
    settle().await;

    assert_eq!(view.session().status(), ConnectionStatus::Connected);
    assert_eq!(view.status_line(), "connected to assistant");
    assert_eq!(connector.attempts()[0].path(), "/ws/assistant");

    assert!(matches!(view.submit("hello"), Ok(SendOutcome::Dispatched)));
    settle().await;
    assert_eq!(peer.sent_frames(), vec!["hello".to_owned()]);

    peer.push_text("Hi");
    peer.push_text(" there");
    settle().await;

    let messages = view.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::User);
    assert_eq!(messages[0].content, "hello");
    assert_eq!(messages[1].role, Role::Assistant);
    assert_eq!(messages[1].content, "Hi there");
    assert!(messages[1].open);

    view.clear();
    assert!(view.messages().is_empty());
    assert_eq!(view.session().status(), ConnectionStatus::Connected);
}

#[tokio::test(start_paused = true)]
async fn selecting_an_unlisted_agent_leaves_the_session_idle() {
    let connector = ScriptedConnector::new();
    let mut view = view_with(FakeApi::default(), &connector);

    let error = view
        .select_agent(&AgentId::new("ghost"))
        .await
        .expect_err("unknown agent");

    assert!(matches!(
        error,
        ViewError::Directory(DirectoryError::NotFound { .. })
    ));
    assert_eq!(view.session().agent_id(), None);
    assert_eq!(connector.attempt_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn blank_agent_name_sets_form_error_without_a_request() {
    let connector = ScriptedConnector::new();
    let mut view = view_with(FakeApi::default(), &connector);

    let result = view
        .create_agent(AgentDraft::new("  ", "gemini-2.5-flash", "helpful"))
        .await;

    assert!(result.is_err());
    assert!(view.form_error().is_some());
    assert!(view.directory().api().calls().is_empty());
    assert_eq!(view.directory().agents().len(), 1);
    assert_eq!(view.session().agent_id(), None);
}

#[tokio::test(start_paused = true)]
async fn rejected_create_keeps_the_server_detail_on_the_form() {
    let connector = ScriptedConnector::new();
    let api = FakeApi::default().with_create(Err(DirectoryError::validation(
        "model is not allowed",
    )));
    let mut view = view_with(api, &connector);

    view.create_agent(AgentDraft::new("Helper", "nope", "helpful"))
        .await
        .expect_err("rejected");

    assert_eq!(view.form_error(), Some("model is not allowed"));
    assert_eq!(view.directory().agents().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn created_agent_is_selected_and_connected() {
    let connector = ScriptedConnector::new();
    connector.accept();
    let api = FakeApi::default().with_create(Ok(agent("A9", "Helper")));
    let mut view = view_with(api, &connector);

    let created = view
        .create_agent(AgentDraft::new("Helper", "gpt-4.1-mini", "be brief"))
        .await
        .expect("create");
    settle().await;

    assert_eq!(created.id, AgentId::new("A9"));
    assert_eq!(view.form_error(), None);
    assert_eq!(view.directory().selected(), Some(&AgentId::new("A9")));
    assert_eq!(view.session().agent_id(), Some(AgentId::new("A9")));
    assert_eq!(view.status_line(), "connected to A9");
    assert_eq!(
        view.directory().api().calls(),
        vec!["create Helper".to_owned()]
    );
}

#[tokio::test(start_paused = true)]
async fn create_succeeds_even_when_the_new_agent_cannot_be_opened() {
    let connector = ScriptedConnector::new();
    let api = FakeApi::default().with_create(Ok(agent("  ", "Helper")));
    let mut view = view_with(api, &connector);

    let created = view
        .create_agent(AgentDraft::new("Helper", "gpt-4.1-mini", "be brief"))
        .await
        .expect("create stands");

    assert_eq!(created.name, "Helper");
    assert_eq!(view.form_error(), None);
    assert_eq!(view.directory().agents().len(), 2);
    assert!(view
        .banner()
        .is_some_and(|banner| banner.starts_with("could not connect to")));
    assert_eq!(connector.attempt_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn failed_refresh_raises_banner_and_keeps_agents() {
    let connector = ScriptedConnector::new();
    let api = FakeApi::default().with_list(Err(DirectoryError::request("connection refused")));
    let mut view = view_with(api, &connector);

    view.refresh_agents().await.expect_err("refresh fails");

    assert_eq!(
        view.banner(),
        Some("could not load agents: request failed: connection refused")
    );
    assert_eq!(view.directory().agents().len(), 1);

    view.dismiss_banner();
    assert_eq!(view.banner(), None);
}

#[tokio::test(start_paused = true)]
async fn successful_refresh_clears_banner() {
    let connector = ScriptedConnector::new();
    let api = FakeApi::default().with_list(Ok(vec![agent("A1", "Alpha"), agent("B2", "Beta")]));
    let mut view = view_with(api, &connector);

    assert_eq!(view.refresh_agents().await, Ok(2));
    assert_eq!(view.banner(), None);
}

#[tokio::test(start_paused = true)]
async fn status_line_reports_retry_after_transient_failure() {
    let connector = ScriptedConnector::new();
    connector.refuse_times(1);
    let mut view = view_with(FakeApi::default(), &connector);

    view.select_agent(&AgentId::new("assistant"))
        .await
        .expect("select");
    settle().await;

    assert_eq!(view.session().status(), ConnectionStatus::Disconnected);
    assert_eq!(
        view.status_line(),
        "disconnected: transport error: connection refused (retry 1)"
    );

    assert!(matches!(view.submit("queued"), Ok(SendOutcome::Queued)));
    assert_eq!(view.session().pending_sends(), vec!["queued".to_owned()]);
}

#[tokio::test(start_paused = true)]
async fn fatal_close_parks_session_until_retry() {
    let connector = ScriptedConnector::new();
    let peer = connector.accept();
    connector.accept();
    let mut view = view_with(FakeApi::default(), &connector);

    view.select_agent(&AgentId::new("assistant"))
        .await
        .expect("select");
    settle().await;
    peer.close_with(4404, "agent not found");
    settle().await;

    assert_eq!(view.session().status(), ConnectionStatus::Errored);
    assert!(view.status_line().starts_with("errored: agent assistant not found"));
    assert!(!view.status_line().contains("(retry"));
    assert_eq!(connector.attempt_count(), 1);

    view.retry().await.expect("retry");
    settle().await;
    assert_eq!(view.status_line(), "connected to assistant");
    assert_eq!(connector.attempt_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn submit_without_agent_is_rejected() {
    let connector = ScriptedConnector::new();
    let mut view = view_with(FakeApi::default(), &connector);

    assert!(matches!(
        view.submit("hello"),
        Err(SessionError::NoAgentSelected)
    ));
    assert!(matches!(view.submit("   "), Ok(SendOutcome::Ignored)));
    assert!(view.messages().is_empty());
}

#[tokio::test(start_paused = true)]
async fn header_line_names_agent_and_user() {
    let connector = ScriptedConnector::new();
    let guest = view_with(FakeApi::default(), &connector);
    assert_eq!(guest.header_line(), "agent-chat | no agent | guest");
    assert!(!guest.is_signed_in());

    connector.accept();
    let principal = Principal {
        id: "u-1".to_owned(),
        name: "Ada".to_owned(),
        email: None,
        avatar: None,
        provider: "github".to_owned(),
    };
    let mut view = view_with(FakeApi::default(), &connector).with_principal(principal);
    view.select_agent(&AgentId::new("assistant"))
        .await
        .expect("select");

    assert!(view.is_signed_in());
    assert_eq!(
        view.header_line(),
        "agent-chat | assistant (gemini-2.5-flash) | Ada"
    );
}

#[tokio::test(start_paused = true)]
async fn deselect_and_shutdown_return_to_idle() {
    let connector = ScriptedConnector::new();
    connector.accept();
    let mut view = view_with(FakeApi::default(), &connector);

    view.select_agent(&AgentId::new("assistant"))
        .await
        .expect("select");
    settle().await;
    view.shutdown().await;
    assert_eq!(view.session().status(), ConnectionStatus::Idle);
    assert_eq!(view.status_line(), "idle: assistant not connected");

    view.deselect_agent().await.expect("deselect");
    assert_eq!(view.directory().selected(), None);
    assert_eq!(view.status_line(), "idle: no agent selected");
}
