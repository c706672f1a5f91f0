//! Outbound mail transport.
//!
//! `LogMailer` is used when no relay is configured; it logs the message and
//! reports success. `HttpMailer` hands messages to an HTTP mail relay.
use anyhow::Context;
use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EmailMessage {
    pub to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
    pub subject: String,
    pub text: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> anyhow::Result<()>;
}

#[derive(Clone, Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &EmailMessage) -> anyhow::Result<()> {
        info!(to = %message.to, subject = %message.subject, "mail send stub");
        Ok(())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RelayRequest<'a> {
    from: &'a str,
    #[serde(flatten)]
    message: &'a EmailMessage,
}

/// Posts each message as JSON to a mail relay endpoint.
#[derive(Clone)]
pub struct HttpMailer {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    from: String,
}

impl HttpMailer {
    pub fn new(endpoint: &str, api_key: Option<String>, from: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .context("build mail relay client")?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            api_key,
            from: from.to_string(),
        })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, message: &EmailMessage) -> anyhow::Result<()> {
        let body = RelayRequest {
            from: &self.from,
            message,
        };
        let mut req = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        req.send()
            .await
            .context("mail relay request")?
            .error_for_status()
            .context("mail relay rejected message")?;
        Ok(())
    }
}
