//! Per-channel delivery with independent failures

use super::channel::{email_message, slack_payload, webhook_payload, Channel};
use super::message::Message;
use crate::dispatch::{CommandRunner, CommandSpec, RunOptions};
use crate::error::PipeError;
use anyhow::{anyhow, bail, Context};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{error, info};

/// How many channels must succeed for the run to pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeliveryPolicy {
    /// At least one channel delivered
    AnySucceeds,
    /// Every channel delivered (`NOTIFY_STRICT=true`)
    AllSucceed,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChannelResult {
    pub channel: String,
    pub delivered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DeliveryReport {
    pub results: Vec<ChannelResult>,
}

impl DeliveryReport {
    pub fn delivered(&self) -> usize {
        self.results.iter().filter(|r| r.delivered).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.delivered()
    }

    pub fn evaluate(&self, policy: DeliveryPolicy) -> Result<(), PipeError> {
        let failed = self.failed();
        let total = self.results.len();
        let ok = match policy {
            DeliveryPolicy::AnySucceeds => total == 0 || failed < total,
            DeliveryPolicy::AllSucceed => failed == 0,
        };
        if ok {
            Ok(())
        } else {
            Err(PipeError::Delivery { failed, total })
        }
    }
}

pub struct Notifier<'a> {
    http: reqwest::blocking::Client,
    runner: &'a dyn CommandRunner,
    options: &'a RunOptions,
}

impl<'a> Notifier<'a> {
    pub fn new(
        runner: &'a dyn CommandRunner,
        options: &'a RunOptions,
        timeout: Duration,
    ) -> Result<Self, PipeError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("pipekit/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            http,
            runner,
            options,
        })
    }

    /// Attempts every channel; one failing never stops the others
    pub fn deliver(&self, message: &Message, channels: &[Channel], timestamp: &str) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        for channel in channels {
            let outcome = match channel {
                Channel::Slack { webhook_url } => self.post(webhook_url, &slack_payload(message)),
                Channel::Webhook { url } => self.post(url, &webhook_payload(message, timestamp)),
                Channel::Email { to, from, sendmail } => {
                    let mail = email_message(message, to, from);
                    let spec = CommandSpec::new(sendmail.display().to_string())
                        .args(["-t", "-oi"])
                        .stdin(mail);
                    self.send_mail(&spec)
                }
            };
            match outcome {
                Ok(()) => {
                    info!("\u{2713} Notification sent via {}", channel);
                    report.results.push(ChannelResult {
                        channel: channel.kind().to_string(),
                        delivered: true,
                        error: None,
                    });
                }
                Err(e) => {
                    error!("\u{2717} Notification via {} failed: {:#}", channel, e);
                    report.results.push(ChannelResult {
                        channel: channel.kind().to_string(),
                        delivered: false,
                        error: Some(format!("{:#}", e)),
                    });
                }
            }
        }
        report
    }

    fn post(&self, url: &str, payload: &Value) -> anyhow::Result<()> {
        let response = self
            .http
            .post(url)
            .json(payload)
            .send()
            .map_err(reqwest::Error::without_url)
            .with_context(|| format!("POST to {} failed", redact_url(url)))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            bail!("{} responded {}: {}", redact_url(url), status, body.trim());
        }
        Ok(())
    }

    fn send_mail(&self, spec: &CommandSpec) -> anyhow::Result<()> {
        let result = self
            .runner
            .run(spec, self.options)
            .map_err(|e| anyhow!("{}", e))?;
        if !result.success {
            bail!(
                "sendmail exited with {:?}: {}",
                result.exit_code,
                result.error_tail(5)
            );
        }
        Ok(())
    }
}

/// Webhook URLs embed their secret in the path; log only scheme and host
pub fn redact_url(url: &str) -> String {
    match reqwest::Url::parse(url) {
        Ok(parsed) => match parsed.port() {
            Some(port) => format!(
                "{}://{}:{}/***",
                parsed.scheme(),
                parsed.host_str().unwrap_or_default(),
                port
            ),
            None => format!(
                "{}://{}/***",
                parsed.scheme(),
                parsed.host_str().unwrap_or_default()
            ),
        },
        Err(_) => "<invalid url>".to_string(),
    }
}
