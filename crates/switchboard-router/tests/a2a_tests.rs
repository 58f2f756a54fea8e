//! Routing over real HTTP against mock A2A agents

#![cfg(feature = "a2a")]

use serde_json::json;
use std::time::Duration;
use switchboard_router::{
    A2aTransport, AgentRole, AgentTransport, Candidate, EcosystemConfig, Switchboard,
    SwitchboardConfig, TransportError, WorkflowStatus,
};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn card(name: &str, url: &str, tags: &[&str]) -> serde_json::Value {
    json!({
        "name": name,
        "description": format!("{name} for tests"),
        "url": url,
        "capabilities": {"streaming": true},
        "skills": [{"id": "main", "name": name, "tags": tags}]
    })
}

fn task_reply(state: &str, text: &str) -> serde_json::Value {
    json!({
        "jsonrpc": "2.0",
        "id": "1",
        "result": {
            "kind": "task",
            "id": "task-1",
            "status": {"state": state},
            "history": [
                {"messageId": "a1", "role": "agent", "parts": [{"kind": "text", "text": text}]}
            ]
        }
    })
}

async fn agent(name: &str, tags: &[&str], reply: serde_json::Value) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/.well-known/agent-card.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(card(name, &server.uri(), tags)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "message/send"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(reply))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_descriptor_from_agent_card() {
    let server = agent("Calculator Agent", &["Arithmetic"], task_reply("completed", "4")).await;
    let transport = A2aTransport::new(Duration::from_secs(5)).unwrap();

    let descriptor = transport.fetch_descriptor(&server.uri()).await.unwrap();
    assert_eq!(descriptor.name, "Calculator Agent");
    assert!(descriptor.supports_streaming);
    assert_eq!(descriptor.skills[0].tags, vec!["Arithmetic"]);

    let answer = transport.send_query(&server.uri(), "2 + 2").await.unwrap();
    assert_eq!(answer, "4");
}

#[tokio::test]
async fn test_failed_task_is_remote_error() {
    let server = agent("Calculator Agent", &[], task_reply("failed", "division by zero")).await;
    let transport = A2aTransport::new(Duration::from_secs(5)).unwrap();

    let err = transport.send_query(&server.uri(), "1 / 0").await.unwrap_err();
    assert!(matches!(err, TransportError::RemoteError { .. }));
    assert!(err.to_string().contains("division by zero"));
}

#[tokio::test]
async fn test_missing_card_is_unreachable() {
    let server = MockServer::start().await;
    let transport = A2aTransport::new(Duration::from_secs(5)).unwrap();

    let err = transport.fetch_descriptor(&server.uri()).await.unwrap_err();
    assert!(matches!(err, TransportError::Unreachable { .. }));
}

#[tokio::test]
async fn test_slow_agent_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(task_reply("completed", "late"))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;
    let transport = A2aTransport::new(Duration::from_millis(100)).unwrap();

    let err = transport.send_query(&server.uri(), "hello").await.unwrap_err();
    assert!(matches!(err, TransportError::Timeout { timeout_ms: 100, .. }));
}

#[tokio::test]
async fn test_switchboard_over_http() {
    let echo = agent("Echo Agent", &["Status Check"], task_reply("completed", "Echo: hi")).await;
    let calc = agent("Calculator Agent", &["arithmetic"], task_reply("completed", "6.28")).await;
    let search = agent(
        "Web Search Agent",
        &[],
        task_reply("completed", "Mathematics is the study of..."),
    )
    .await;

    let ecosystem = EcosystemConfig {
        agents: vec![
            Candidate::new(echo.uri(), AgentRole::Testing),
            Candidate::new(calc.uri(), AgentRole::Computation),
            Candidate::new(search.uri(), AgentRole::Information),
            Candidate::new("http://127.0.0.1:9", AgentRole::Orchestration),
        ],
        ..Default::default()
    };
    let switchboard = Switchboard::a2a(SwitchboardConfig::default(), ecosystem).unwrap();

    let report = switchboard.discover_configured().await.unwrap();
    assert_eq!(report.succeeded, 3);
    assert_eq!(report.failures.len(), 1);

    // skill tags extend the role keywords
    let decision = switchboard.route("run a status check").await.unwrap();
    assert_eq!(decision.agent_name(), "Echo Agent");
    assert!(!decision.is_fallback);

    let answer = switchboard
        .coordinate("Calculate pi * 2 and search for mathematics")
        .await
        .unwrap();
    assert_eq!(
        answer,
        "**Calculator Agent:** 6.28\n\n**Web Search Agent:** Mathematics is the study of..."
    );

    let execution = switchboard.execute("research_calculate").await.unwrap();
    assert_eq!(execution.status, WorkflowStatus::Completed);
}
