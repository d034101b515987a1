//! Channel definitions and payload rendering
//!
//! Rendering is pure; delivery lives in [`super::dispatcher`].

use super::message::Message;
use crate::config::ConfigError;
use serde_json::{json, Value};
use std::fmt;
use std::path::PathBuf;

pub const CHANNEL_NAMES: [&str; 3] = ["slack", "webhook", "email"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Channel {
    Slack { webhook_url: String },
    Webhook { url: String },
    Email {
        to: Vec<String>,
        from: String,
        sendmail: PathBuf,
    },
}

impl Channel {
    pub fn kind(&self) -> &'static str {
        match self {
            Channel::Slack { .. } => "slack",
            Channel::Webhook { .. } => "webhook",
            Channel::Email { .. } => "email",
        }
    }

    /// Validates a channel name from `NOTIFY_CHANNELS`
    pub fn check_name(name: &str) -> Result<&'static str, ConfigError> {
        let lowered = name.trim().to_ascii_lowercase();
        CHANNEL_NAMES
            .iter()
            .find(|n| **n == lowered)
            .copied()
            .ok_or_else(|| ConfigError::invalid("NOTIFY_CHANNELS", name, &CHANNEL_NAMES))
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}

fn fallback_text(message: &Message) -> String {
    format!("{} {}", message.status.emoji(), message.title)
}

fn mention_prefix(mentions: &[String]) -> String {
    if mentions.is_empty() {
        return String::new();
    }
    let rendered: Vec<String> = mentions
        .iter()
        .map(|m| {
            let m = m.trim_start_matches('@');
            match m {
                "here" | "channel" | "everyone" => format!("<!{}>", m),
                _ => format!("<@{}>", m),
            }
        })
        .collect();
    format!("{} ", rendered.join(" "))
}

/// Slack incoming-webhook body (attachment with Block Kit blocks)
pub fn slack_payload(message: &Message) -> Value {
    let mut blocks = vec![
        json!({
            "type": "header",
            "text": {"type": "plain_text", "text": message.title, "emoji": true}
        }),
        json!({
            "type": "section",
            "text": {
                "type": "mrkdwn",
                "text": format!("{}{}", mention_prefix(&message.mentions), message.body)
            }
        }),
    ];

    if !message.fields.is_empty() {
        let fields: Vec<Value> = message
            .fields
            .iter()
            .map(|(k, v)| json!({"type": "mrkdwn", "text": format!("*{}*\n{}", k, v)}))
            .collect();
        // Slack caps a section at 10 fields
        for chunk in fields.chunks(10) {
            blocks.push(json!({"type": "section", "fields": chunk}));
        }
    }

    if let Some(description) = message.build.describe() {
        let text = match message.build.build_url() {
            Some(url) => format!("<{}|{}>", url, description),
            None => description,
        };
        blocks.push(json!({
            "type": "context",
            "elements": [{"type": "mrkdwn", "text": text}]
        }));
    }

    json!({
        "text": fallback_text(message),
        "attachments": [{
            "color": message.status.color(),
            "blocks": blocks
        }]
    })
}

/// Generic webhook body
pub fn webhook_payload(message: &Message, timestamp: &str) -> Value {
    let fields: serde_json::Map<String, Value> = message
        .fields
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect();

    let mut payload = json!({
        "title": message.title,
        "message": message.body,
        "status": message.status,
        "mentions": message.mentions,
        "fields": fields,
        "timestamp": timestamp,
    });
    if !message.build.is_empty() {
        payload["build"] = json!(message.build);
        if let Some(url) = message.build.build_url() {
            payload["build"]["url"] = Value::String(url);
        }
    }
    payload
}

/// RFC 5322 message for `sendmail -t`
pub fn email_message(message: &Message, to: &[String], from: &str) -> String {
    let mut mail = String::new();
    mail.push_str(&format!("From: {}\n", from));
    mail.push_str(&format!("To: {}\n", to.join(", ")));
    mail.push_str(&format!(
        "Subject: [{}] {}\n",
        message.status.as_str().to_ascii_uppercase(),
        single_line(&message.title)
    ));
    mail.push_str("MIME-Version: 1.0\n");
    mail.push_str("Content-Type: text/plain; charset=utf-8\n\n");
    mail.push_str(&message.body);
    mail.push('\n');
    if !message.fields.is_empty() {
        mail.push('\n');
        for (k, v) in &message.fields {
            mail.push_str(&format!("{}: {}\n", k, v));
        }
    }
    if let Some(description) = message.build.describe() {
        mail.push_str(&format!("\n{}\n", description));
        if let Some(url) = message.build.build_url() {
            mail.push_str(&format!("{}\n", url));
        }
    }
    mail
}

/// Header values must not carry line breaks
fn single_line(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}
