//! Pushbullet sink: sends every notification as a `note` push to all of the
//! account's devices.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use super::{Notifier, Status};
use crate::error::{Error, Result};

const PUSHES_URL: &str = "https://api.pushbullet.com/v2/pushes";

#[derive(Serialize)]
struct NotePush<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    title: &'a str,
    body: &'a str,
}

pub struct PushbulletNotifier {
    client: reqwest::Client,
    api_token: SecretString,
    endpoint: String,
}

impl PushbulletNotifier {
    pub fn new(api_token: SecretString) -> Self {
        Self::with_endpoint(api_token, PUSHES_URL)
    }

    /// Point the sink at a different pushes endpoint (proxies, tests).
    pub fn with_endpoint(api_token: SecretString, endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_token,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl Notifier for PushbulletNotifier {
    fn name(&self) -> &str {
        "pushbullet"
    }

    async fn send_notification(
        &self,
        bot_name: &str,
        status: Status,
        title: &str,
        body: &str,
    ) -> Result<()> {
        let title = format!("{bot_name} {status}: {title}");
        let response = self
            .client
            .post(&self.endpoint)
            .header("Access-Token", self.api_token.expose_secret())
            .json(&NotePush {
                kind: "note",
                title: &title,
                body,
            })
            .send()
            .await?;

        let code = response.status();
        if code.is_success() {
            Ok(())
        } else {
            let detail = response.text().await.unwrap_or_default();
            Err(Error::Notification {
                sink: self.name().to_string(),
                reason: format!("HTTP {code}: {detail}"),
            })
        }
    }
}
