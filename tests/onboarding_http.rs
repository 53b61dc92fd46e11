//! Integration tests for the onboarding REST API.
//!
//! Each test spins up an Axum server on a random port backed by an
//! in-memory libSQL store and exercises the real HTTP contract.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::time::timeout;

use agent_onboarding::onboarding::{
    AgentFlavor, OnboardingRouteState, OnboardingSessions, onboarding_routes,
};
use agent_onboarding::store::{CheckpointStore, LibSqlBackend};

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Start an Axum server on a random port, return the base URL.
async fn start_server(default_flavor: AgentFlavor) -> String {
    let store: Arc<dyn CheckpointStore> = Arc::new(LibSqlBackend::new_memory().await.unwrap());
    let state = OnboardingRouteState {
        sessions: Arc::new(OnboardingSessions::new(store)),
        default_flavor,
    };
    let app = onboarding_routes(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give the server a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;

    format!("http://127.0.0.1:{port}")
}

async fn post_json(url: String, body: Value) -> (u16, Value) {
    let resp = reqwest::Client::new()
        .post(url)
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

// ── Stateless ────────────────────────────────────────────────────────

#[tokio::test]
async fn health_endpoint() {
    timeout(TEST_TIMEOUT, async {
        let base = start_server(AgentFlavor::Clmm).await;

        let resp = reqwest::get(format!("{base}/health")).await.unwrap();
        assert_eq!(resp.status(), 200);

        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "agent-onboarding");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn resolve_snapshot() {
    timeout(TEST_TIMEOUT, async {
        let base = start_server(AgentFlavor::Clmm).await;

        let (status, body) = post_json(
            format!("{base}/api/onboarding/resolve"),
            json!({
                "hasSetupInput": true,
                "hasFundingTokenInput": true,
                "requiresDelegationSigning": true
            }),
        )
        .await;
        assert_eq!(status, 200);
        assert_eq!(body["phase"], "collect-delegations");
        assert_eq!(body["rule"], "delegations");

        let (_, body) = post_json(format!("{base}/api/onboarding/resolve"), json!({})).await;
        assert_eq!(body["phase"], "collect-setup-input");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn resolve_with_flavor_applies_requirements() {
    timeout(TEST_TIMEOUT, async {
        let base = start_server(AgentFlavor::Clmm).await;

        let (_, body) = post_json(
            format!("{base}/api/onboarding/resolve"),
            json!({"flavor": "gmx", "requiresPoolCatalog": false}),
        )
        .await;
        assert_eq!(body["phase"], "collect-pool-catalog");

        let (_, body) = post_json(
            format!("{base}/api/onboarding/resolve"),
            json!({
                "flavor": "polymarket",
                "hasSetupInput": true,
                "hasFundingTokenInput": true,
                "hasOperatorConfig": true
            }),
        )
        .await;
        assert_eq!(body["phase"], "ready");
        assert!(body["rule"].is_null());
    })
    .await
    .expect("test timed out");
}

// ── Sessions ─────────────────────────────────────────────────────────

#[tokio::test]
async fn unknown_session_is_404() {
    timeout(TEST_TIMEOUT, async {
        let base = start_server(AgentFlavor::Clmm).await;

        let resp = reqwest::get(format!("{base}/api/onboarding/nope")).await.unwrap();
        assert_eq!(resp.status(), 404);
        let body: Value = resp.json().await.unwrap();
        assert!(body["error"].as_str().unwrap().contains("nope"));
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn start_uses_default_flavor() {
    timeout(TEST_TIMEOUT, async {
        let base = start_server(AgentFlavor::Polymarket).await;

        let (status, body) =
            post_json(format!("{base}/api/onboarding/poly-1/start"), json!({})).await;
        assert_eq!(status, 200);
        assert_eq!(body["flavor"], "polymarket");
        assert_eq!(body["phase"], "collect-setup-input");
        assert_eq!(body["task"]["task_state"], "submitted");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn full_onboarding_over_http() {
    timeout(TEST_TIMEOUT, async {
        let base = start_server(AgentFlavor::Clmm).await;
        let session = format!("{base}/api/onboarding/gmx-1");

        let (_, body) = post_json(format!("{session}/start"), json!({"flavor": "gmx"})).await;
        assert_eq!(body["phase"], "collect-pool-catalog");

        // First wait checkpoints, the identical second one does not.
        let (_, wait) = post_json(format!("{session}/await"), json!({"message": "Fetching markets"})).await;
        assert_eq!(wait["phase"], "collect-pool-catalog");
        assert_eq!(wait["persisted"], true);
        let (_, wait) = post_json(format!("{session}/await"), json!({"message": "Fetching markets"})).await;
        assert_eq!(wait["persisted"], false);

        let steps = [
            ("pool-catalog", "collect-setup-input"),
            ("setup-input", "collect-funding-token"),
            ("funding-token", "collect-delegations"),
            ("delegation-bundle", "prepare-operator"),
            ("operator-config", "prepare-operator"),
            ("setup-complete", "ready"),
        ];
        for (step, phase) in steps {
            let (status, body) = post_json(format!("{session}/steps"), json!({"step": step})).await;
            assert_eq!(status, 200);
            assert_eq!(body["phase"], phase, "after {step}");
        }

        let resp = reqwest::get(session.clone()).await.unwrap();
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["phase"], "ready");
        assert_eq!(body["inputs"]["setupComplete"], true);
        assert_eq!(body["inputs"]["requiresSetupComplete"], true);

        // Firing drops delegations; the thread goes back to collecting them.
        let (_, body) = post_json(format!("{session}/fire"), json!({})).await;
        assert_eq!(body["phase"], "collect-delegations");
        assert_eq!(body["task"]["task_state"], "canceled");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn rejected_input_is_retried() {
    timeout(TEST_TIMEOUT, async {
        let base = start_server(AgentFlavor::Polymarket).await;
        let session = format!("{base}/api/onboarding/retry");

        post_json(format!("{session}/start"), json!({})).await;
        let (_, wait) = post_json(format!("{session}/await"), json!({"message": "Wallet?"})).await;
        assert_eq!(wait["persisted"], true);

        let (status, body) =
            post_json(format!("{session}/reject"), json!({"reason": "not an address"})).await;
        assert_eq!(status, 200);
        assert_eq!(body["phase"], "collect-setup-input");
        assert_eq!(body["task"]["task_state"], "failed");
        assert_eq!(body["task"]["task_message"], "not an address");

        let (_, wait) = post_json(format!("{session}/await"), json!({"message": "Wallet?"})).await;
        assert_eq!(wait["phase"], "collect-setup-input");
        assert_eq!(wait["persisted"], true);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn out_of_order_requests_conflict() {
    timeout(TEST_TIMEOUT, async {
        let base = start_server(AgentFlavor::Polymarket).await;
        let session = format!("{base}/api/onboarding/poly-2");
        post_json(format!("{session}/start"), json!({})).await;

        // Nothing is pending yet, so there is nothing to reject.
        let (status, body) =
            post_json(format!("{session}/reject"), json!({"reason": "too early"})).await;
        assert_eq!(status, 409);
        assert!(body["error"].as_str().unwrap().contains("no pending input"));

        for step in ["setup-input", "funding-token", "operator-config"] {
            post_json(format!("{session}/steps"), json!({"step": step})).await;
        }

        // A ready thread has nothing left to wait for.
        let (status, body) =
            post_json(format!("{session}/await"), json!({"message": "More?"})).await;
        assert_eq!(status, 409);
        assert!(body["error"].as_str().unwrap().contains("already ready"));

        let resp = reqwest::get(session.clone()).await.unwrap();
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["phase"], "ready");
        assert_eq!(body["task"]["task_state"], "working");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn list_sessions() {
    timeout(TEST_TIMEOUT, async {
        let base = start_server(AgentFlavor::Clmm).await;
        post_json(format!("{base}/api/onboarding/a/start"), json!({})).await;
        post_json(format!("{base}/api/onboarding/b/start"), json!({"flavor": "pendle"})).await;

        let resp = reqwest::get(format!("{base}/api/onboarding/sessions")).await.unwrap();
        assert_eq!(resp.status(), 200);
        let body: Vec<Value> = resp.json().await.unwrap();
        assert_eq!(body.len(), 2);
    })
    .await
    .expect("test timed out");
}
