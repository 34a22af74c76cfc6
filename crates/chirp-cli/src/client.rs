use anyhow::{Context, anyhow, bail};
use chrono::{DateTime, SecondsFormat, Utc};
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use reqwest::{Response, Url};
use serde_json::json;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::debug;

use chirp_types::api::{ErrorResponse, RegisterResponse};
use chirp_types::events::MonitorEvent;
use chirp_types::models::{Chirp, ChirpId};

/// HTTP + WebSocket client for the chirp service tier.
#[derive(Clone)]
pub struct ChirpClient {
    base: String,
    http: reqwest::Client,
}

impl ChirpClient {
    pub fn new(base: &str) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub async fn register(&self, username: &str) -> anyhow::Result<String> {
        let response = self
            .http
            .post(self.url("/users"))
            .json(&json!({ "username": username }))
            .send()
            .await?;
        let registered: RegisterResponse = check(response).await?.json().await?;
        Ok(registered.username)
    }

    pub async fn chirp(&self, username: &str, text: &str, parent_id: ChirpId) -> anyhow::Result<Chirp> {
        let response = self
            .http
            .post(self.url("/chirps"))
            .json(&json!({ "username": username, "text": text, "parent_id": parent_id }))
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    pub async fn edit(&self, username: &str, id: ChirpId, text: &str) -> anyhow::Result<Chirp> {
        let response = self
            .http
            .put(self.url(&format!("/chirps/{}", id)))
            .json(&json!({ "username": username, "text": text }))
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    pub async fn delete(&self, username: &str, id: ChirpId) -> anyhow::Result<()> {
        let response = self
            .http
            .delete(self.url(&format!("/chirps/{}", id)))
            .query(&[("username", username)])
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    pub async fn follow(&self, username: &str, to_follow: &str) -> anyhow::Result<()> {
        let response = self
            .http
            .post(self.url("/follows"))
            .json(&json!({ "username": username, "to_follow": to_follow }))
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    pub async fn read(&self, id: ChirpId) -> anyhow::Result<Vec<Chirp>> {
        let response = self.http.get(self.url(&format!("/chirps/{}", id))).send().await?;
        Ok(check(response).await?.json().await?)
    }

    /// Open a monitor stream. Live unless `since` is given, in which case the
    /// server replays and then closes.
    pub async fn monitor(
        &self,
        username: &str,
        since: Option<DateTime<Utc>>,
    ) -> anyhow::Result<BoxStream<'static, anyhow::Result<MonitorEvent>>> {
        let url = monitor_url(&self.base, username, since)?;
        debug!("Connecting to {}", url);

        let (socket, _) = connect_async(url.as_str()).await.map_err(|e| match e {
            tungstenite::Error::Http(response) => {
                let message = response
                    .body()
                    .as_deref()
                    .and_then(|body| serde_json::from_slice::<ErrorResponse>(body).ok())
                    .map(|body| body.error)
                    .unwrap_or_else(|| response.status().to_string());
                anyhow!(message)
            }
            other => anyhow!(other).context("monitor connection failed"),
        })?;

        Ok(socket
            .filter_map(|frame| async move {
                match frame {
                    Ok(Message::Text(text)) => Some(
                        serde_json::from_str::<MonitorEvent>(text.as_str())
                            .context("bad monitor event"),
                    ),
                    Ok(_) => None,
                    Err(e) => Some(Err(anyhow!(e))),
                }
            })
            .boxed())
    }
}

/// Turn a non-2xx response into its `{error}` message.
async fn check(response: Response) -> anyhow::Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = match response.json::<ErrorResponse>().await {
        Ok(body) => body.error,
        Err(_) => status.to_string(),
    };
    bail!(message)
}

fn websocket_base(base: &str) -> anyhow::Result<String> {
    if let Some(rest) = base.strip_prefix("http://") {
        Ok(format!("ws://{}", rest))
    } else if let Some(rest) = base.strip_prefix("https://") {
        Ok(format!("wss://{}", rest))
    } else {
        bail!("server URL must start with http:// or https://: {}", base)
    }
}

/// The monitor endpoint for `username`, with the name percent-encoded as a
/// single path segment.
fn monitor_url(base: &str, username: &str, since: Option<DateTime<Utc>>) -> anyhow::Result<Url> {
    let mut url = Url::parse(&websocket_base(base)?).context("invalid server URL")?;
    url.path_segments_mut()
        .map_err(|_| anyhow!("server URL cannot carry a path: {}", base))?
        .pop_if_empty()
        .push("monitor")
        .push(username);
    if let Some(since) = since {
        url.query_pairs_mut()
            .append_pair("since", &since.to_rfc3339_opts(SecondsFormat::Nanos, true));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn websocket_base_swaps_the_scheme() {
        assert_eq!(websocket_base("http://127.0.0.1:3000").unwrap(), "ws://127.0.0.1:3000");
        assert_eq!(websocket_base("https://chirp.example").unwrap(), "wss://chirp.example");
        assert!(websocket_base("127.0.0.1:3000").is_err());
    }

    #[test]
    fn monitor_url_encodes_the_username_as_one_segment() {
        let url = monitor_url("http://127.0.0.1:3000", "ann marie/ops?", None).unwrap();
        assert_eq!(url.as_str(), "ws://127.0.0.1:3000/monitor/ann%20marie%2Fops%3F");

        let since = DateTime::parse_from_rfc3339("2026-01-02T03:04:05Z")
            .unwrap()
            .with_timezone(&Utc);
        let url = monitor_url("https://chirp.example/", "bob", Some(since)).unwrap();
        assert_eq!(url.path(), "/monitor/bob");
        assert_eq!(
            url.query_pairs().next().unwrap().1,
            "2026-01-02T03:04:05.000000000Z"
        );
    }
}
