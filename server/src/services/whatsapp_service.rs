//! Inbound WhatsApp Business webhook.
//!
//! Meta verifies the endpoint with a `GET` carrying `hub.*` parameters and
//! then delivers message batches as `POST` payloads shaped
//! `entry[].changes[].value.messages[]`.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::Config;
use crate::utils::error::{AppError, AppResult};

#[derive(Debug, Default, Deserialize)]
pub struct VerifyQuery {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub entry: Vec<WebhookEntry>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookEntry {
    #[serde(default)]
    pub changes: Vec<WebhookChange>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookChange {
    #[serde(default)]
    pub value: ChangeValue,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChangeValue {
    #[serde(default)]
    pub messages: Vec<InboundMessage>,
}

#[derive(Debug, Deserialize)]
pub struct InboundMessage {
    pub from: String,
    pub id: String,
    pub timestamp: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub text: Option<TextBody>,
    pub button: Option<ButtonBody>,
    pub interactive: Option<InteractiveBody>,
}

#[derive(Debug, Deserialize)]
pub struct TextBody {
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct ButtonBody {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct InteractiveBody {
    pub button_reply: Option<ReplyBody>,
    pub list_reply: Option<ReplyBody>,
}

#[derive(Debug, Deserialize)]
pub struct ReplyBody {
    pub title: String,
}

/// What gets forwarded to the relay for each inbound message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelayMessage {
    pub from: String,
    pub message_id: String,
    pub kind: String,
    pub body: Option<String>,
    pub timestamp: Option<i64>,
}

impl InboundMessage {
    fn body(&self) -> Option<String> {
        if let Some(text) = &self.text {
            return Some(text.body.clone());
        }
        if let Some(button) = &self.button {
            return Some(button.text.clone());
        }
        self.interactive.as_ref().and_then(|i| {
            i.button_reply
                .as_ref()
                .or(i.list_reply.as_ref())
                .map(|reply| reply.title.clone())
        })
    }
}

/// Answers Meta's subscription handshake with the challenge.
pub fn verify(config: &Config, query: &VerifyQuery) -> AppResult<String> {
    let expected = config
        .whatsapp_verify_token
        .as_deref()
        .ok_or_else(|| AppError::Forbidden("Webhook verification is not configured".to_string()))?;

    match (query.mode.as_deref(), query.verify_token.as_deref(), &query.challenge) {
        (Some("subscribe"), Some(token), Some(challenge)) if token == expected => {
            info!("WhatsApp webhook verified");
            Ok(challenge.clone())
        }
        _ => Err(AppError::Forbidden("Webhook verification failed".to_string())),
    }
}

pub fn extract_messages(payload: &WebhookPayload) -> Vec<RelayMessage> {
    payload
        .entry
        .iter()
        .flat_map(|entry| &entry.changes)
        .flat_map(|change| &change.value.messages)
        .map(|message| RelayMessage {
            from: message.from.clone(),
            message_id: message.id.clone(),
            kind: message.kind.clone(),
            body: message.body(),
            timestamp: message.timestamp.as_deref().and_then(|t| t.parse().ok()),
        })
        .collect()
}

/// HTTP client for the relay. A relay that stops answering fails the request
/// after `timeout` instead of holding the webhook open.
pub fn relay_client(timeout: Duration) -> AppResult<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(timeout)
        .timeout(timeout)
        .build()
        .map_err(|e| AppError::InternalServerError(format!("Failed to build relay client: {}", e)))
}

/// Logs every inbound message and forwards it to the relay when one is set.
/// Returns how many messages were relayed.
pub async fn handle_inbound(config: &Config, http: &reqwest::Client, payload: &WebhookPayload) -> usize {
    let messages = extract_messages(payload);
    let mut relayed = 0;

    for message in &messages {
        info!(
            from = %message.from,
            message_id = %message.message_id,
            kind = %message.kind,
            "Inbound WhatsApp message"
        );
        let Some(url) = config.whatsapp_relay_url.as_deref() else {
            continue;
        };
        match relay(http, url, message).await {
            Ok(()) => relayed += 1,
            Err(e) => e.log(),
        }
    }
    relayed
}

async fn relay(http: &reqwest::Client, url: &str, message: &RelayMessage) -> AppResult<()> {
    let response = http
        .post(url)
        .json(message)
        .send()
        .await
        .map_err(|e| AppError::ExternalServiceError(format!("WhatsApp relay unreachable: {}", e)))?;

    if response.status().is_success() {
        Ok(())
    } else {
        warn!(status = %response.status(), message_id = %message.message_id, "Relay refused message");
        Err(AppError::ExternalServiceError(format!(
            "WhatsApp relay answered {}",
            response.status()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config_with_token(token: Option<&str>) -> Config {
        Config {
            whatsapp_verify_token: token.map(str::to_string),
            ..Config::default()
        }
    }

    fn query(mode: &str, token: &str, challenge: &str) -> VerifyQuery {
        VerifyQuery {
            mode: Some(mode.to_string()),
            verify_token: Some(token.to_string()),
            challenge: Some(challenge.to_string()),
        }
    }

    #[test]
    fn test_verify_handshake() {
        let config = config_with_token(Some("s3cret"));
        assert_eq!(verify(&config, &query("subscribe", "s3cret", "1158201444")).unwrap(), "1158201444");
        assert!(verify(&config, &query("subscribe", "wrong", "1")).is_err());
        assert!(verify(&config, &query("unsubscribe", "s3cret", "1")).is_err());
        assert!(verify(&config_with_token(None), &query("subscribe", "s3cret", "1")).is_err());
    }

    #[test]
    fn test_extract_messages() {
        let payload: WebhookPayload = serde_json::from_value(json!({
            "object": "whatsapp_business_account",
            "entry": [{
                "id": "102290129340398",
                "changes": [{
                    "field": "messages",
                    "value": {
                        "messaging_product": "whatsapp",
                        "messages": [
                            {
                                "from": "2348012345678",
                                "id": "wamid.A",
                                "timestamp": "1717243200",
                                "type": "text",
                                "text": { "body": "Do you have tickets left?" }
                            },
                            {
                                "from": "2348012345678",
                                "id": "wamid.B",
                                "type": "interactive",
                                "interactive": {
                                    "type": "button_reply",
                                    "button_reply": { "id": "yes", "title": "Yes please" }
                                }
                            },
                            {
                                "from": "2348099999999",
                                "id": "wamid.C",
                                "timestamp": "not-a-number",
                                "type": "image",
                                "image": { "id": "media-1" }
                            }
                        ]
                    }
                }]
            }]
        }))
        .unwrap();

        let messages = extract_messages(&payload);
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].body.as_deref(), Some("Do you have tickets left?"));
        assert_eq!(messages[0].timestamp, Some(1_717_243_200));
        assert_eq!(messages[1].body.as_deref(), Some("Yes please"));
        assert_eq!(messages[2].kind, "image");
        assert_eq!(messages[2].body, None);
        assert_eq!(messages[2].timestamp, None);
    }

    #[test]
    fn test_status_only_payload_has_no_messages() {
        let payload: WebhookPayload = serde_json::from_value(json!({
            "entry": [{ "changes": [{ "value": { "statuses": [{ "id": "wamid.A", "status": "read" }] } }] }]
        }))
        .unwrap();
        assert!(extract_messages(&payload).is_empty());
    }

    #[tokio::test]
    async fn test_handle_inbound_without_relay() {
        let payload: WebhookPayload = serde_json::from_value(json!({
            "entry": [{ "changes": [{ "value": { "messages": [
                { "from": "1", "id": "wamid.X", "type": "text", "text": { "body": "hi" } }
            ] } }] }]
        }))
        .unwrap();
        let relayed = handle_inbound(&Config::default(), &reqwest::Client::new(), &payload).await;
        assert_eq!(relayed, 0);
    }

    #[tokio::test]
    async fn test_relay_gives_up_on_a_silent_endpoint() {
        // Accepts connections and never writes a response.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let config = Config {
            whatsapp_relay_url: Some(format!("http://{}/relay", addr)),
            ..Config::default()
        };
        let payload: WebhookPayload = serde_json::from_value(json!({
            "entry": [{ "changes": [{ "value": { "messages": [
                { "from": "1", "id": "wamid.Y", "type": "text", "text": { "body": "hello" } }
            ] } }] }]
        }))
        .unwrap();
        let http = relay_client(Duration::from_millis(200)).unwrap();

        let relayed = tokio::time::timeout(Duration::from_secs(5), handle_inbound(&config, &http, &payload))
            .await
            .expect("relay call should time out on its own");
        assert_eq!(relayed, 0);
    }
}
