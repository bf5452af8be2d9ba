use std::net::SocketAddr;
use std::sync::Arc;

use annotator_store::annotation::{Annotation, MemoryAnnotationStore};
use annotator_store::auth::{AuthState, Authenticator, Consumer, MemoryConsumerStore, token};
use annotator_store::clock::FixedClock;
use annotator_store::config::TestConsumerConfig;
use annotator_store::gateway::{AppState, router};
use chrono::{DateTime, TimeZone, Utc};
use reqwest::RequestBuilder;
use tokio::net::TcpListener;

pub const CONSUMER_KEY: &str = "testConsumer";
pub const CONSUMER_SECRET: &str = "testConsumerSecret";
pub const CONSUMER_TTL: i64 = 300;

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

pub struct TestOptions {
    pub auth_on: bool,
    pub mountpoint: &'static str,
    pub test_consumer: bool,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            auth_on: true,
            mountpoint: "",
            test_consumer: false,
        }
    }
}

pub struct TestServer {
    pub url: String,
    #[allow(dead_code)]
    pub addr: SocketAddr,
    pub clock: Arc<FixedClock>,
    pub store: Arc<MemoryAnnotationStore>,
    pub client: reqwest::Client,
}

impl TestServer {
    pub async fn start() -> Self {
        Self::start_with(TestOptions::default()).await
    }

    pub async fn start_with(options: TestOptions) -> Self {
        let clock = Arc::new(FixedClock::new(start_time()));
        let store = Arc::new(MemoryAnnotationStore::new());

        let consumers = MemoryConsumerStore::new();
        consumers.insert(Consumer::new(CONSUMER_KEY, CONSUMER_SECRET, Some(CONSUMER_TTL)));

        let auth = Arc::new(AuthState {
            authenticator: Authenticator::new(Arc::new(consumers), clock.clone()),
            enabled: options.auth_on,
        });

        let test_consumer = options.test_consumer.then(|| TestConsumerConfig {
            key: CONSUMER_KEY.into(),
            secret: CONSUMER_SECRET.into(),
            ttl: Some(CONSUMER_TTL),
            user: "alice".into(),
        });
        let state = AppState::new(store.clone(), auth).with_test_consumer(test_consumer);
        let app = router(Arc::new(state), options.mountpoint);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Give server a moment to start
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

        Self {
            url: format!("http://{addr}{}", options.mountpoint),
            addr,
            clock,
            store,
            client: reqwest::Client::new(),
        }
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.url, path)
    }

    /// Seed a record directly into the store.
    #[allow(dead_code)]
    pub fn seed(&self, annotation: Annotation) -> Annotation {
        self.store.insert(annotation)
    }
}

/// The four auth headers for `user`, issued at `issued`.
#[allow(dead_code)]
pub fn auth_headers(user: &str, issued: DateTime<Utc>) -> Vec<(&'static str, String)> {
    let issue_time = token::format_issue_time(issued);
    let auth_token = token::derive(CONSUMER_SECRET, user, &issue_time);
    vec![
        ("x-annotator-consumer-key", CONSUMER_KEY.to_string()),
        ("x-annotator-auth-token", auth_token),
        ("x-annotator-auth-token-issue-time", issue_time),
        ("x-annotator-user-id", user.to_string()),
    ]
}

/// Attach valid auth headers for `user`, issued at `issued`.
#[allow(dead_code)]
pub fn signed_at(req: RequestBuilder, user: &str, issued: DateTime<Utc>) -> RequestBuilder {
    auth_headers(user, issued)
        .into_iter()
        .fold(req, |req, (name, value)| req.header(name, value))
}

/// Attach valid auth headers for `user`, issued at the server's start time.
pub fn signed(req: RequestBuilder, user: &str) -> RequestBuilder {
    signed_at(req, user, start_time())
}
