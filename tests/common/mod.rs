//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use earnmadu_api::config::{AppConfig, Environment};
use earnmadu_api::lifecycle::{Shutdown, ShutdownReason};
use earnmadu_api::mail::{EmailMessage, MailError, Mailer};
use earnmadu_api::store::{Earning, MemoryStore, Role, User, Video};
use earnmadu_api::{AppState, HttpServer};

/// Mailer that records messages instead of sending them.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<EmailMessage>>,
    fail: Mutex<bool>,
    delay: Mutex<Option<Duration>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn fail_with_rejection(&self) {
        *self.fail.lock().unwrap() = true;
    }

    /// Hold every send for `delay` before recording it.
    pub fn stall_for(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if *self.fail.lock().unwrap() {
            return Err(MailError::Rejected {
                status: 422,
                body: "bad recipient".into(),
            });
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

pub struct TestApp {
    pub addr: SocketAddr,
    pub store: Arc<MemoryStore>,
    pub mailer: Arc<RecordingMailer>,
    pub shutdown: Shutdown,
    pub client: reqwest::Client,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Insert a user and return a fresh session token for them.
    pub fn login(&self, id: &str, role: Role) -> String {
        self.store.insert_user(User {
            id: id.to_string(),
            email: format!("{id}@example.com"),
            name: format!("User {id}"),
            role,
        });
        self.store.create_session(id, chrono::Duration::hours(1))
    }

    pub fn seed_video(&self, id: &str, category: &str) {
        self.store.insert_video(Video {
            id: id.to_string(),
            title: format!("Video {id}"),
            url: format!("https://cdn.example.com/{id}.mp4"),
            category: category.to_string(),
            reward_cents: 5,
            duration_secs: 30,
        });
    }

    pub fn seed_earning(&self, id: &str, user_id: &str, amount_cents: i64) {
        self.store.insert_earning(Earning {
            id: id.to_string(),
            user_id: user_id.to_string(),
            video_id: "v1".to_string(),
            amount_cents,
            created_at: Utc::now(),
        });
    }

    pub async fn stop(self) {
        self.shutdown.trigger(ShutdownReason::Signal);
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.environment = Environment::Production;
    config.listener.host = "127.0.0.1".into();
    config.listener.port = 0;
    config
}

/// Start the API on an ephemeral port with in-memory collaborators.
pub async fn spawn_app(config: AppConfig) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let mailer = Arc::new(RecordingMailer::default());
    let state = AppState::new(config, store.clone(), mailer.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();

    let server = HttpServer::new(state);
    let signal = shutdown.clone();
    tokio::spawn(async move {
        server.run(listener, signal).await.unwrap();
    });

    TestApp {
        addr,
        store,
        mailer,
        shutdown,
        client: reqwest::Client::new(),
    }
}

/// Start a programmable HTTP backend. Each request's body is handed to `f`,
/// which decides the status and response body.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let body = read_request_body(&mut socket).await;
                        let (status, body) = f(body).await;
                        let status_text = match status {
                            200 => "200 OK",
                            401 => "401 Unauthorized",
                            422 => "422 Unprocessable Entity",
                            500 => "500 Internal Server Error",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

async fn read_request_body(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        let n = socket.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&buf);
        if let Some(head_end) = text.find("\r\n\r\n") {
            let content_length = text[..head_end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if buf.len() >= head_end + 4 + content_length {
                return String::from_utf8_lossy(&buf[head_end + 4..head_end + 4 + content_length])
                    .into_owned();
            }
        }
    }

    String::new()
}
