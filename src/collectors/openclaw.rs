use crate::state::ProbeOutcome;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

/// One reachability check against the gateway status endpoint. Exactly one
/// outbound request, no retries; the scheduler's next tick is the retry.
pub async fn probe_status(client: &Client, url: &str, timeout: Duration) -> ProbeOutcome {
    let response = match client.get(url).timeout(timeout).send().await {
        Ok(resp) => resp,
        Err(err) => {
            debug!(error = %err, "openclaw not reachable");
            return ProbeOutcome::Unreachable;
        }
    };

    let status = response.status();
    if !status.is_success() {
        warn!(status = status.as_u16(), "openclaw status endpoint rejected the probe");
        return ProbeOutcome::Rejected(status.as_u16());
    }

    let body = match response.bytes().await {
        Ok(body) => body,
        Err(err) => {
            debug!(error = %err, "openclaw status body read failed");
            return ProbeOutcome::Unreachable;
        }
    };

    match serde_json::from_slice::<serde_json::Value>(&body) {
        Ok(value) => {
            let agents = value
                .get("agents")
                .and_then(|v| v.as_array())
                .cloned()
                .unwrap_or_default();
            ProbeOutcome::Online(agents)
        }
        Err(err) => {
            debug!(error = %err, "openclaw status body is not valid JSON");
            ProbeOutcome::Unreachable
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;
    use std::net::SocketAddr;
    use tokio::net::TcpListener;

    async fn spawn_gateway(router: Router) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("serve");
        });
        addr
    }

    fn client() -> Client {
        Client::new()
    }

    #[tokio::test]
    async fn success_response_yields_online_with_agents() {
        let addr = spawn_gateway(Router::new().route(
            "/api/status",
            get(|| async { Json(json!({"agents": [{"id": "main"}, {"id": "blog"}]})) }),
        ))
        .await;

        let url = format!("http://{addr}/api/status");
        let outcome = probe_status(&client(), &url, Duration::from_secs(2)).await;
        match outcome {
            ProbeOutcome::Online(agents) => assert_eq!(agents.len(), 2),
            other => panic!("expected online, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_agents_field_defaults_to_empty() {
        let addr = spawn_gateway(Router::new().route(
            "/api/status",
            get(|| async { Json(json!({"uptime": 12})) }),
        ))
        .await;

        let url = format!("http://{addr}/api/status");
        let outcome = probe_status(&client(), &url, Duration::from_secs(2)).await;
        match outcome {
            ProbeOutcome::Online(agents) => assert!(agents.is_empty()),
            other => panic!("expected online, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_success_status_yields_rejected() {
        let addr = spawn_gateway(Router::new().route(
            "/api/status",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        ))
        .await;

        let url = format!("http://{addr}/api/status");
        let outcome = probe_status(&client(), &url, Duration::from_secs(2)).await;
        assert!(matches!(outcome, ProbeOutcome::Rejected(500)));
    }

    #[tokio::test]
    async fn connection_refused_yields_unreachable() {
        // Bind to grab a free port, then drop the listener before probing.
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        drop(listener);

        let url = format!("http://{addr}/api/status");
        let outcome = probe_status(&client(), &url, Duration::from_secs(2)).await;
        assert!(matches!(outcome, ProbeOutcome::Unreachable));
    }

    #[tokio::test]
    async fn timeout_yields_unreachable() {
        let addr = spawn_gateway(Router::new().route(
            "/api/status",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(json!({"agents": []}))
            }),
        ))
        .await;

        let url = format!("http://{addr}/api/status");
        let outcome = probe_status(&client(), &url, Duration::from_millis(100)).await;
        assert!(matches!(outcome, ProbeOutcome::Unreachable));
    }
}
