use crate::config::ConfigError;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyStatus {
    Success,
    Warning,
    Error,
    Info,
}

impl NotifyStatus {
    pub const NAMES: [&'static str; 4] = ["success", "warning", "error", "info"];

    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "success" | "passed" | "ok" => Ok(NotifyStatus::Success),
            "warning" | "warn" => Ok(NotifyStatus::Warning),
            "error" | "failed" | "failure" => Ok(NotifyStatus::Error),
            "info" => Ok(NotifyStatus::Info),
            _ => Err(ConfigError::invalid("STATUS", value, &Self::NAMES)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NotifyStatus::Success => "success",
            NotifyStatus::Warning => "warning",
            NotifyStatus::Error => "error",
            NotifyStatus::Info => "info",
        }
    }

    /// Attachment color for chat channels
    pub fn color(&self) -> &'static str {
        match self {
            NotifyStatus::Success => "#2eb886",
            NotifyStatus::Warning => "#daa038",
            NotifyStatus::Error => "#a30200",
            NotifyStatus::Info => "#439fe0",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            NotifyStatus::Success => ":white_check_mark:",
            NotifyStatus::Warning => ":warning:",
            NotifyStatus::Error => ":x:",
            NotifyStatus::Info => ":information_source:",
        }
    }
}

impl fmt::Display for NotifyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CI run the message is about, taken from the runner's environment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_number: Option<String>,
}

impl BuildContext {
    pub fn is_empty(&self) -> bool {
        self == &BuildContext::default()
    }

    pub fn build_url(&self) -> Option<String> {
        match (&self.repository, &self.build_number) {
            (Some(repo), Some(build)) => Some(format!(
                "https://bitbucket.org/{}/addon/pipelines/home#!/results/{}",
                repo, build
            )),
            _ => None,
        }
    }

    /// One-line description, e.g. `acme/api@main #42 (1a2b3c4)`
    pub fn describe(&self) -> Option<String> {
        let repo = self.repository.as_deref()?;
        let mut line = repo.to_string();
        if let Some(branch) = &self.branch {
            line.push_str(&format!("@{}", branch));
        }
        if let Some(build) = &self.build_number {
            line.push_str(&format!(" #{}", build));
        }
        if let Some(commit) = &self.commit {
            let short: String = commit.chars().take(7).collect();
            line.push_str(&format!(" ({})", short));
        }
        Some(line)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub title: String,
    pub body: String,
    pub status: NotifyStatus,
    pub mentions: Vec<String>,
    pub fields: Vec<(String, String)>,
    pub build: BuildContext,
}

impl Message {
    pub fn new(title: impl Into<String>, body: impl Into<String>, status: NotifyStatus) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            status,
            mentions: Vec::new(),
            fields: Vec::new(),
            build: BuildContext::default(),
        }
    }

    pub fn with_mentions(mut self, mentions: Vec<String>) -> Self {
        self.mentions = mentions;
        self
    }

    pub fn with_fields(mut self, fields: Vec<(String, String)>) -> Self {
        self.fields = fields;
        self
    }

    pub fn with_build(mut self, build: BuildContext) -> Self {
        self.build = build;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse() {
        assert_eq!(NotifyStatus::parse("SUCCESS").unwrap(), NotifyStatus::Success);
        assert_eq!(NotifyStatus::parse("failed").unwrap(), NotifyStatus::Error);
        let err = NotifyStatus::parse("sucess").unwrap_err();
        assert!(err.to_string().contains("did you mean 'success'"));
    }

    #[test]
    fn test_build_context_description() {
        let build = BuildContext {
            repository: Some("acme/api".into()),
            branch: Some("main".into()),
            commit: Some("1a2b3c4d5e6f".into()),
            build_number: Some("42".into()),
        };
        assert_eq!(build.describe().unwrap(), "acme/api@main #42 (1a2b3c4)");
        assert!(build.build_url().unwrap().ends_with("/results/42"));
        assert!(BuildContext::default().is_empty());
        assert!(BuildContext::default().describe().is_none());
    }
}
