use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::config;
use crate::notification::{Event, EventType, NotificationError, Notifier, format_event};

const TELEGRAM_API_URL: &str = "https://api.telegram.org";
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_MESSAGE_LENGTH: usize = 4096;
const ASYNC_QUEUE_SIZE: usize = 100;

/// Telegram notifier settings.
#[derive(Debug, Clone)]
pub struct TelegramSettings {
    pub bot_token: String,
    pub chat_id: String,
    /// Chat for error events; falls back to `chat_id`.
    pub error_chat_id: Option<String>,
    pub notify_opportunities: bool,
    pub notify_errors: bool,
    pub notify_overview: bool,
    /// Bot API base URL.
    pub api_url: String,
}

impl TelegramSettings {
    pub fn new(bot_token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
            error_chat_id: None,
            notify_opportunities: true,
            notify_errors: true,
            notify_overview: true,
            api_url: TELEGRAM_API_URL.to_string(),
        }
    }

    pub fn with_error_chat_id(mut self, chat_id: impl Into<String>) -> Self {
        self.error_chat_id = Some(chat_id.into());
        self
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    fn chat_for(&self, event_type: EventType) -> &str {
        match (&self.error_chat_id, event_type) {
            (Some(chat), EventType::Error) => chat,
            _ => &self.chat_id,
        }
    }

    fn send_url(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_url, self.bot_token)
    }
}

impl From<&config::TelegramConfig> for TelegramSettings {
    fn from(cfg: &config::TelegramConfig) -> Self {
        let settings = Self {
            notify_opportunities: cfg.notify_opportunities,
            notify_errors: cfg.notify_errors,
            notify_overview: cfg.notify_overview,
            ..Self::new(&cfg.bot_token, &cfg.chat_id)
        };
        if cfg.error_chat_id.is_empty() {
            settings
        } else {
            settings.with_error_chat_id(&cfg.error_chat_id)
        }
    }
}

/// TelegramNotifier posts events through the Telegram Bot API.
///
/// `send_async` queues onto a bounded channel drained by one worker task;
/// `close` stops accepting events and waits for the queue to drain.
pub struct TelegramNotifier {
    settings: TelegramSettings,
    http_client: reqwest::Client,
    sender: Mutex<Option<mpsc::Sender<Event>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl TelegramNotifier {
    /// Must be called inside a tokio runtime.
    pub fn new(settings: TelegramSettings) -> Result<Self, NotificationError> {
        if settings.bot_token.is_empty() {
            return Err(NotificationError::Config("bot_token is required".into()));
        }
        if settings.chat_id.is_empty() {
            return Err(NotificationError::Config("chat_id is required".into()));
        }

        let http_client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| NotificationError::Config(format!("failed to create HTTP client: {}", e)))?;

        let (sender, receiver) = mpsc::channel(ASYNC_QUEUE_SIZE);
        let worker = Self::spawn_worker(receiver, settings.clone(), http_client.clone());

        Ok(Self {
            settings,
            http_client,
            sender: Mutex::new(Some(sender)),
            worker: Mutex::new(Some(worker)),
        })
    }

    fn spawn_worker(
        mut receiver: mpsc::Receiver<Event>,
        settings: TelegramSettings,
        http_client: reqwest::Client,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(event) = receiver.recv().await {
                let chat_id = settings.chat_for(event.event_type);
                let text = format_event(&event);
                if let Err(e) = post_message(&http_client, &settings.send_url(), chat_id, &text).await
                {
                    error!(error = %e, event = %event.event_type, "Failed to send Telegram message");
                }
            }
            debug!("Telegram worker stopped");
        })
    }
}

/// Cuts `text` to at most `max` bytes on a char boundary.
fn truncate(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

async fn post_message(
    http_client: &reqwest::Client,
    url: &str,
    chat_id: &str,
    text: &str,
) -> Result<(), NotificationError> {
    let payload = serde_json::json!({
        "chat_id": chat_id,
        "text": truncate(text, MAX_MESSAGE_LENGTH),
        "parse_mode": "Markdown"
    });

    let response = http_client
        .post(url)
        .json(&payload)
        .send()
        .await
        .map_err(|e| NotificationError::Http(e.to_string()))?;

    if !response.status().is_success() {
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(NotificationError::Api { status, body });
    }

    Ok(())
}

#[async_trait::async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, event: &Event) -> Result<(), NotificationError> {
        if !self.is_enabled(event.event_type) {
            return Ok(());
        }
        let text = format_event(event);
        post_message(
            &self.http_client,
            &self.settings.send_url(),
            self.settings.chat_for(event.event_type),
            &text,
        )
        .await
    }

    fn send_async(&self, event: Event) {
        if !self.is_enabled(event.event_type) {
            return;
        }
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        match sender.as_ref() {
            Some(tx) => {
                if let Err(e) = tx.try_send(event) {
                    error!(error = %e, "Failed to queue Telegram message");
                }
            }
            None => warn!("Telegram notifier closed, event dropped"),
        }
    }

    fn is_enabled(&self, event_type: EventType) -> bool {
        match event_type {
            EventType::Startup | EventType::Shutdown => true,
            EventType::Opportunity => self.settings.notify_opportunities,
            EventType::Error => self.settings.notify_errors,
            EventType::Overview => self.settings.notify_overview,
        }
    }

    async fn close(&self) -> Result<(), NotificationError> {
        // Dropping the sender ends the worker loop once the queue is empty.
        self.sender
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take();
        let worker = self
            .worker
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take();

        if let Some(handle) = worker {
            match tokio::time::timeout(CLOSE_TIMEOUT, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => return Err(NotificationError::Http(format!("worker failed: {}", e))),
                Err(_) => warn!("Telegram queue not drained before close timeout"),
            }
        }
        Ok(())
    }
}
