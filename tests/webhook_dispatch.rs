//! Integration tests for the webhook → dispatch → bus path.
//!
//! Each test starts the real axum router on a random port and posts
//! wire-format activity JSON at it, with the bus and the connector
//! transport stubbed out.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpListener;
use tokio::time::timeout;

use botbridge::activity::{Address, OutboundPayload};
use botbridge::auth::AuthGate;
use botbridge::bus::{MessageBus, ReceivedEvent};
use botbridge::cards::{CardSynthesizer, StaticCatalog};
use botbridge::channels::{StrategyRegistry, TeamsStrategy, TextStrategy};
use botbridge::connector::{Connector, RosterMember};
use botbridge::directory::UserDirectory;
use botbridge::dispatch::Dispatcher;
use botbridge::error::{DispatchError, TransportError};
use botbridge::webhook::{WebhookState, webhook_routes};

/// Maximum time any test request may take before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Default)]
struct RecordingBus {
    events: Mutex<Vec<ReceivedEvent>>,
}

#[async_trait]
impl MessageBus for RecordingBus {
    async fn deliver(&self, event: ReceivedEvent) -> Result<(), DispatchError> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

/// Connector stub: canned roster, accepts all sends.
struct StubConnector;

#[async_trait]
impl Connector for StubConnector {
    async fn send(
        &self,
        _address: &Address,
        _payloads: &[OutboundPayload],
    ) -> Result<(), TransportError> {
        Ok(())
    }

    async fn fetch_roster(
        &self,
        _service_url: &str,
        _conversation_id: &str,
    ) -> Result<Vec<RosterMember>, TransportError> {
        Ok(vec![RosterMember {
            id: "u1".into(),
            name: Some("Alice".into()),
            object_id: Some("obj1".into()),
        }])
    }
}

/// Start the webhook server on a random port; returns (url, bus).
async fn serve() -> (String, Arc<RecordingBus>) {
    let directory = Arc::new(UserDirectory::new());
    let bus = Arc::new(RecordingBus::default());
    let connector: Arc<dyn Connector> = Arc::new(StubConnector);

    let mut registry = StrategyRegistry::new();
    registry.register(
        "msteams",
        Arc::new(TeamsStrategy::new(
            "hubot".into(),
            Vec::new(),
            Arc::clone(&directory),
            Arc::clone(&connector),
            CardSynthesizer::new(Arc::new(StaticCatalog::default())),
        )),
    );
    registry.register("webchat", Arc::new(TextStrategy::new(Arc::clone(&directory))));

    let dispatcher = Arc::new(Dispatcher::new(
        registry,
        AuthGate::new(false, directory),
        bus.clone(),
        connector,
        "hubot".into(),
    ));

    let app = webhook_routes("/api/messages", WebhookState { dispatcher });
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}/api/messages"), bus)
}

fn message_activity(source: &str, text: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "message",
        "source": source,
        "id": "a1",
        "text": text,
        "address": {
            "bot": {"id": "b1", "name": "hubot"},
            "user": {"id": "u1", "name": "Alice", "aadObjectId": "obj1"},
            "conversation": {"id": "c1", "isGroup": false},
            "channelId": source,
            "serviceUrl": "https://smba.example.test"
        },
        "sourceEvent": {"tenant": {"id": "t1"}}
    })
}

#[tokio::test]
async fn single_activity_round_trips_to_bus() {
    let (url, bus) = serve().await;
    let client = reqwest::Client::new();

    let response = timeout(
        TEST_TIMEOUT,
        client
            .post(&url)
            .json(&message_activity("msteams", "<@u1|Alice> hello"))
            .send(),
    )
    .await
    .expect("request timed out")
    .unwrap();

    assert_eq!(response.status().as_u16(), 202);
    assert!(response.bytes().await.unwrap().is_empty());

    let events = bus.events.lock().unwrap();
    assert_eq!(events.len(), 1);
    // Direct conversation: invocation-name prefix, mention resolved
    // to the roster object id.
    assert_eq!(events[0].text(), Some("hubot obj1 hello"));
}

#[tokio::test]
async fn array_body_dispatches_each_activity() {
    let (url, bus) = serve().await;
    let client = reqwest::Client::new();

    let mut typing = message_activity("msteams", "");
    typing["type"] = serde_json::json!("typing");
    let body = serde_json::json!([typing, message_activity("webchat", "hello there")]);

    let response = timeout(TEST_TIMEOUT, client.post(&url).json(&body).send())
        .await
        .expect("request timed out")
        .unwrap();
    assert_eq!(response.status().as_u16(), 202);

    // The typing activity drops; only the message arrives.
    let events = bus.events.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].text(), Some("hello there"));
}

#[tokio::test]
async fn unknown_source_reports_server_error() {
    let (url, bus) = serve().await;
    let client = reqwest::Client::new();

    let response = timeout(
        TEST_TIMEOUT,
        client
            .post(&url)
            .json(&message_activity("smoke-signals", "hello"))
            .send(),
    )
    .await
    .expect("request timed out")
    .unwrap();

    assert_eq!(response.status().as_u16(), 500);
    assert!(bus.events.lock().unwrap().is_empty());
}
