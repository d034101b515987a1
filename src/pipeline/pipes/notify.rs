//! Notify pipe: one status message fanned out to every configured channel

use crate::config::{self, ConfigError, EnvSource};
use crate::error::PipeError;
use crate::notify::{BuildContext, Channel, DeliveryPolicy, Message, Notifier, NotifyStatus};
use crate::pipeline::orchestrator::timestamp;
use crate::pipeline::{Pipe, PipeContext};
use crate::report::GateResult;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

const DEFAULT_SENDMAIL: &str = "/usr/sbin/sendmail";
const DEFAULT_EMAIL_FROM: &str = "pipekit@localhost";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct NotifyConfig {
    pub channels: Vec<Channel>,
    pub message: Message,
    pub policy: DeliveryPolicy,
    pub http_timeout: Duration,
}

impl NotifyConfig {
    pub fn from_source(source: &dyn EnvSource) -> Result<Self, ConfigError> {
        let names = config::list(source, "NOTIFY_CHANNELS");
        if names.is_empty() {
            return Err(ConfigError::missing("NOTIFY_CHANNELS"));
        }

        let mut channels = Vec::new();
        for name in &names {
            let channel = match Channel::check_name(name)? {
                "slack" => Channel::Slack {
                    webhook_url: config::required(source, "SLACK_WEBHOOK_URL")?,
                },
                "webhook" => Channel::Webhook {
                    url: config::required(source, "WEBHOOK_URL")?,
                },
                _ => {
                    let to = config::list(source, "EMAIL_TO");
                    if to.is_empty() {
                        return Err(ConfigError::missing("EMAIL_TO"));
                    }
                    Channel::Email {
                        to,
                        from: config::string_or(source, "EMAIL_FROM", DEFAULT_EMAIL_FROM),
                        sendmail: PathBuf::from(config::string_or(
                            source,
                            "SENDMAIL_PATH",
                            DEFAULT_SENDMAIL,
                        )),
                    }
                }
            };
            if !channels.contains(&channel) {
                channels.push(channel);
            }
        }

        let status = match config::string(source, "STATUS") {
            Some(value) => NotifyStatus::parse(&value)?,
            None => NotifyStatus::Info,
        };
        let build = BuildContext {
            repository: config::string(source, "BITBUCKET_REPO_FULL_NAME"),
            branch: config::string(source, "BITBUCKET_BRANCH"),
            commit: config::string(source, "BITBUCKET_COMMIT"),
            build_number: config::string(source, "BITBUCKET_BUILD_NUMBER"),
        };
        let title = config::string(source, "TITLE")
            .unwrap_or_else(|| format!("Pipeline {}", status.as_str()));
        let message = Message::new(title, config::string_or(source, "MESSAGE", ""), status)
            .with_mentions(config::list(source, "MENTIONS"))
            .with_fields(config::key_values(source, "FIELDS")?)
            .with_build(build);

        let policy = if config::bool_or(source, "NOTIFY_STRICT", false) {
            DeliveryPolicy::AllSucceed
        } else {
            DeliveryPolicy::AnySucceeds
        };

        Ok(Self {
            channels,
            message,
            policy,
            http_timeout: Duration::from_secs(config::number_or(
                source,
                "HTTP_TIMEOUT",
                DEFAULT_HTTP_TIMEOUT_SECS,
            )),
        })
    }
}

pub struct NotifyPipe;

impl Pipe for NotifyPipe {
    fn name(&self) -> &'static str {
        "notify"
    }

    fn run(&self, ctx: &mut PipeContext) -> Result<(), PipeError> {
        let cfg = NotifyConfig::from_source(ctx.env())?;
        info!(
            "Sending '{}' ({}) to {} channel(s)",
            cfg.message.title,
            cfg.message.status,
            cfg.channels.len()
        );

        let delivery = {
            let notifier = Notifier::new(ctx.runner.as_ref(), &ctx.options, cfg.http_timeout)?;
            notifier.deliver(&cfg.message, &cfg.channels, &timestamp())
        };

        for result in &delivery.results {
            let gate = match &result.error {
                None => GateResult::passed(result.channel.as_str(), "delivered"),
                Some(e) => GateResult::warned(result.channel.as_str(), e.as_str()),
            };
            ctx.report.gate(gate);
        }
        ctx.report.set("NOTIFY_DELIVERED", delivery.delivered());
        ctx.report.set("NOTIFY_FAILED", delivery.failed());

        delivery.evaluate(cfg.policy)?;
        ctx.report.gate(GateResult::passed(
            "delivery",
            format!("{} of {} channel(s) delivered", delivery.delivered(), delivery.results.len()),
        ));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::env_map;
    use crate::dispatch::{Scripted, ScriptedRunner};
    use crate::pipeline::run_pipe;
    use crate::pipeline::testing::{context_in, context_with};
    use std::net::TcpListener;
    use tempfile::TempDir;

    fn unreachable_url() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        format!("http://127.0.0.1:{}/hooks/secret", port)
    }

    #[test]
    fn test_channels_require_endpoints() {
        let err = NotifyConfig::from_source(&env_map(&[("NOTIFY_CHANNELS", "slack")])).unwrap_err();
        assert_eq!(err, ConfigError::missing("SLACK_WEBHOOK_URL"));

        let err = NotifyConfig::from_source(&env_map(&[])).unwrap_err();
        assert_eq!(err, ConfigError::missing("NOTIFY_CHANNELS"));

        let err = NotifyConfig::from_source(&env_map(&[("NOTIFY_CHANNELS", "slak")])).unwrap_err();
        assert!(err.to_string().contains("did you mean 'slack'"));
    }

    #[test]
    fn test_message_from_env() {
        let cfg = NotifyConfig::from_source(&env_map(&[
            ("NOTIFY_CHANNELS", "email"),
            ("EMAIL_TO", "a@example.com, b@example.com"),
            ("STATUS", "error"),
            ("FIELDS", "Env=prod,Version=1.2"),
            ("BITBUCKET_REPO_FULL_NAME", "acme/api"),
        ]))
        .unwrap();
        assert_eq!(cfg.message.title, "Pipeline error");
        assert_eq!(cfg.message.fields.len(), 2);
        assert_eq!(cfg.policy, DeliveryPolicy::AnySucceeds);
        match &cfg.channels[0] {
            Channel::Email { to, from, sendmail } => {
                assert_eq!(to.len(), 2);
                assert_eq!(from, DEFAULT_EMAIL_FROM);
                assert_eq!(sendmail, &PathBuf::from(DEFAULT_SENDMAIL));
            }
            other => panic!("unexpected channel {:?}", other),
        }
    }

    #[test]
    fn test_email_delivered_through_sendmail() {
        let temp = TempDir::new().unwrap();
        let (mut ctx, runner) = context_in(
            temp.path(),
            &[
                ("NOTIFY_CHANNELS", "email"),
                ("EMAIL_TO", "team@example.com"),
                ("TITLE", "Deployed"),
                ("STATUS", "success"),
            ],
        );
        let report = run_pipe(&NotifyPipe, &mut ctx);
        assert_eq!(report.exit_code(), 0);
        let call = &runner.calls()[0];
        assert_eq!(call.command, "/usr/sbin/sendmail -t -oi");
        assert!(call.stdin.as_deref().unwrap().contains("To: team@example.com"));
    }

    #[test]
    fn test_partial_failure_passes_unless_strict() {
        let url = unreachable_url();
        let pairs = [
            ("NOTIFY_CHANNELS", "webhook,email"),
            ("WEBHOOK_URL", url.as_str()),
            ("EMAIL_TO", "team@example.com"),
            ("HTTP_TIMEOUT", "2"),
        ];

        let temp = TempDir::new().unwrap();
        let (mut ctx, _) = context_in(temp.path(), &pairs);
        let report = run_pipe(&NotifyPipe, &mut ctx);
        assert_eq!(report.exit_code(), 0);
        assert_eq!(report.metadata["NOTIFY_DELIVERED"], "1");
        assert_eq!(report.metadata["NOTIFY_FAILED"], "1");
        assert!(!format!("{:?}", report).contains("secret"));

        let strict = [pairs[0], pairs[1], pairs[2], pairs[3], ("NOTIFY_STRICT", "true")];
        let (mut ctx, _) = context_in(temp.path(), &strict);
        let report = run_pipe(&NotifyPipe, &mut ctx);
        assert_eq!(report.exit_code(), 1);
        assert_eq!(report.error.unwrap().kind, "delivery");
    }

    #[test]
    fn test_all_channels_failed() {
        let temp = TempDir::new().unwrap();
        let runner = ScriptedRunner::new().on("/usr/sbin/sendmail", Scripted::exit(75));
        let (mut ctx, _) = context_with(
            temp.path(),
            &[("NOTIFY_CHANNELS", "email"), ("EMAIL_TO", "team@example.com")],
            runner,
        );
        let report = run_pipe(&NotifyPipe, &mut ctx);
        assert_eq!(report.exit_code(), 1);
        assert!(temp.path().join("build-info/notify-info.txt").exists());
    }
}
