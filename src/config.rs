//! Typed configuration loaded once at startup.
//!
//! The YAML document enumerates the GitHub credential location, the label
//! list, the team roster, the metric toggles evaluated during a push run and
//! the push-gateway coordinates. The structure is deserialized into an
//! immutable [`Config`] value and validated before any action executes, so a
//! malformed document fails the whole run with no partial output.

use std::{env, fs, path::Path};

use serde::Deserialize;

use crate::error::{self, Error};

/// Environment variable consulted when no credential file is configured.
const TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Root configuration document.
///
/// # Examples
///
/// ```
/// use ghmon::Config;
///
/// let yaml = r#"
/// github:
///   team: [alice, bob]
///   labels: [bug, enhancement]
/// prometheus:
///   push_target: localhost:9091
///   push_job: ghmon
/// "#;
/// let config: Config = serde_yaml::from_str(yaml).expect("valid configuration");
/// assert_eq!(config.github.team.len(), 2);
/// ```
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// GitHub credential and metric-collection settings.
    pub github: GithubConfig,

    /// Push-gateway coordinates, required only by the push action.
    #[serde(default)]
    pub prometheus: Option<PrometheusConfig>
}

/// GitHub-facing settings.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct GithubConfig {
    /// Optional path to a file containing a personal access token. When
    /// absent the `GITHUB_TOKEN` environment variable is used instead.
    #[serde(default)]
    pub token_file: Option<String>,

    /// Labels evaluated by the per-label metric collectors.
    #[serde(default)]
    pub labels: Vec<String>,

    /// Team roster used to partition counts and lifetime averages.
    #[serde(default)]
    pub team: Vec<String>,

    /// Metric toggles and windows evaluated during a push run.
    #[serde(default)]
    pub metrics: MetricsConfig
}

/// Metric toggles and rolling windows.
#[derive(Debug, Deserialize, Clone)]
pub struct MetricsConfig {
    /// Organization-level metrics to collect.
    #[serde(default = "default_org_metrics")]
    pub org: Vec<String>,

    /// Repository-level metrics to collect.
    #[serde(default = "default_repo_metrics")]
    pub repo: Vec<String>,

    /// Rolling windows, in days, for "created within" counts and closed-item
    /// lifetime averages.
    #[serde(default = "default_timeframes")]
    pub timeframes: Vec<i64>,

    /// Days without update after which an open item counts as old.
    #[serde(default = "default_no_activity_limit")]
    pub no_activity_limit: i64,

    /// Workflow names and run statuses reported during a push run.
    #[serde(default)]
    pub workflows: WorkflowsConfig
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            org:               default_org_metrics(),
            repo:              default_repo_metrics(),
            timeframes:        default_timeframes(),
            no_activity_limit: default_no_activity_limit(),
            workflows:         WorkflowsConfig::default()
        }
    }
}

/// Workflow reporting settings.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct WorkflowsConfig {
    /// Workflow names whose most recent completed run is reported.
    #[serde(default)]
    pub names: Vec<String>,

    /// Run statuses whose totals are reported.
    #[serde(default = "default_workflow_status")]
    pub status: Vec<String>
}

/// Push-gateway coordinates.
#[derive(Debug, Deserialize, Clone)]
pub struct PrometheusConfig {
    /// Gateway address accepting batched gauge pushes.
    pub push_target: String,

    /// Job name the batch is grouped under.
    pub push_job: String
}

fn default_org_metrics() -> Vec<String> {
    ["members", "admins", "repositories", "team_size"].map(String::from).to_vec()
}

fn default_repo_metrics() -> Vec<String> {
    [
        "contributors",
        "events",
        "general_info",
        "issues_by_label",
        "created_issues_by_timeframe",
        "created_pulls_by_timeframe",
        "open_issues",
        "open_pulls",
        "issues_lifetime_average",
        "pulls_lifetime_average"
    ]
    .map(String::from)
    .to_vec()
}

fn default_timeframes() -> Vec<i64> {
    vec![30]
}

fn default_no_activity_limit() -> i64 {
    30
}

fn default_workflow_status() -> Vec<String> {
    ["completed", "in_progress", "queued"].map(String::from).to_vec()
}

impl Config {
    /// Resolves the GitHub token from the configured credential file or the
    /// `GITHUB_TOKEN` environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] when the credential file cannot be read and
    /// [`Error::Validation`] when no token source is available.
    pub fn github_token(&self) -> Result<String, Error> {
        if let Some(token_file) = self.github.token_file.as_deref() {
            let path = Path::new(token_file);
            let contents =
                fs::read_to_string(path).map_err(|source| error::io_error(path, source))?;
            let token = contents.trim();
            if token.is_empty() {
                return Err(Error::validation(format!("token file '{token_file}' is empty")));
            }
            return Ok(token.to_owned());
        }

        env::var(TOKEN_ENV).map_err(|_| {
            Error::validation("no GitHub token: set github.token_file or GITHUB_TOKEN")
        })
    }

    /// Returns the push-gateway settings, failing when the section is absent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when the configuration has no
    /// `prometheus` section.
    pub fn prometheus(&self) -> Result<&PrometheusConfig, Error> {
        self.prometheus
            .as_ref()
            .ok_or_else(|| Error::validation("prometheus section is required for push actions"))
    }
}

/// Loads and validates the configuration from the provided YAML file path.
///
/// # Errors
///
/// Returns an [`Error`] when the file cannot be read, the YAML cannot be
/// deserialized, or the configuration violates invariants.
pub fn load_config(path: &Path) -> Result<Config, Error> {
    let contents = fs::read_to_string(path).map_err(|source| error::io_error(path, source))?;
    parse_config(&contents)
}

/// Parses and validates a configuration document string.
///
/// # Errors
///
/// Propagates [`Error::Parse`] when the YAML cannot be decoded and
/// [`Error::Validation`] when required invariants are violated.
pub fn parse_config(contents: &str) -> Result<Config, Error> {
    let config: Config = serde_yaml::from_str(contents)?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &Config) -> Result<(), Error> {
    let metrics = &config.github.metrics;

    if metrics.timeframes.is_empty() {
        return Err(Error::validation("github.metrics.timeframes must not be empty"));
    }
    if metrics.timeframes.iter().any(|days| *days <= 0) {
        return Err(Error::validation("github.metrics.timeframes entries must be positive"));
    }
    if metrics.no_activity_limit <= 0 {
        return Err(Error::validation("github.metrics.no_activity_limit must be positive"));
    }

    if let Some(prometheus) = config.prometheus.as_ref() {
        if prometheus.push_target.trim().is_empty() {
            return Err(Error::validation("prometheus.push_target cannot be empty"));
        }
        if prometheus.push_job.trim().is_empty() {
            return Err(Error::validation("prometheus.push_job cannot be empty"));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::{Config, load_config, parse_config};
    use crate::error::Error;

    #[test]
    fn parse_config_applies_defaults() {
        let config = parse_config("github: {}").expect("expected parse success");

        assert!(config.github.labels.is_empty());
        assert!(config.github.team.is_empty());
        assert_eq!(config.github.metrics.timeframes, vec![30]);
        assert_eq!(config.github.metrics.no_activity_limit, 30);
        assert!(config.github.metrics.org.contains(&"members".to_owned()));
        assert!(config.github.metrics.repo.contains(&"issues_lifetime_average".to_owned()));
        assert!(config.prometheus.is_none());
    }

    #[test]
    fn parse_config_reads_full_document() {
        let yaml = r#"
github:
  token_file: /etc/ghmon/token
  labels: [bug, enhancement]
  team: [alice, bob]
  metrics:
    org: [members]
    repo: [open_issues, workflows]
    timeframes: [30, 90]
    no_activity_limit: 14
    workflows:
      names: [CI]
      status: [completed]
prometheus:
  push_target: localhost:9091
  push_job: ghmon
"#;

        let config = parse_config(yaml).expect("expected parse success");
        assert_eq!(config.github.token_file.as_deref(), Some("/etc/ghmon/token"));
        assert_eq!(config.github.metrics.timeframes, vec![30, 90]);
        assert_eq!(config.github.metrics.no_activity_limit, 14);
        assert_eq!(config.github.metrics.workflows.names, vec!["CI"]);
        let prometheus = config.prometheus.expect("expected prometheus section");
        assert_eq!(prometheus.push_target, "localhost:9091");
        assert_eq!(prometheus.push_job, "ghmon");
    }

    #[test]
    fn parse_config_rejects_empty_timeframes() {
        let yaml = r"
github:
  metrics:
    timeframes: []
";
        let error = parse_config(yaml).expect_err("expected validation failure");
        assert!(matches!(error, Error::Validation { .. }));
    }

    #[test]
    fn parse_config_rejects_non_positive_timeframes() {
        let yaml = r"
github:
  metrics:
    timeframes: [30, 0]
";
        let result = parse_config(yaml);
        assert!(result.is_err());
    }

    #[test]
    fn parse_config_rejects_blank_push_target() {
        let yaml = r#"
github: {}
prometheus:
  push_target: " "
  push_job: ghmon
"#;
        let result = parse_config(yaml);
        assert!(result.is_err());
    }

    #[test]
    fn prometheus_accessor_fails_without_section() {
        let config = parse_config("github: {}").expect("expected parse success");
        let error = config.prometheus().expect_err("expected missing section error");
        assert!(matches!(error, Error::Validation { .. }));
    }

    #[test]
    fn github_token_reads_credential_file() {
        let mut file = tempfile::NamedTempFile::new().expect("expected temp file");
        writeln!(file, "ghp_example").expect("expected write to succeed");

        let mut config = parse_config("github: {}").expect("expected parse success");
        config.github.token_file = Some(file.path().to_string_lossy().into_owned());

        let token = config.github_token().expect("expected token");
        assert_eq!(token, "ghp_example");
    }

    #[test]
    fn github_token_rejects_empty_credential_file() {
        let file = tempfile::NamedTempFile::new().expect("expected temp file");

        let mut config = parse_config("github: {}").expect("expected parse success");
        config.github.token_file = Some(file.path().to_string_lossy().into_owned());

        let error = config.github_token().expect_err("expected empty token error");
        assert!(matches!(error, Error::Validation { .. }));
    }

    #[test]
    fn load_config_reports_io_errors() {
        let path = std::path::Path::new("/nonexistent/ghmon.yaml");
        let error = load_config(path).expect_err("expected io error");
        assert!(matches!(error, Error::Io { .. }));
    }

    #[test]
    fn load_config_reads_configuration_from_disk() {
        let mut file = tempfile::NamedTempFile::new().expect("expected temp file");
        write!(file, "github:\n  team: [alice]\n").expect("expected write to succeed");

        let config: Config = load_config(file.path()).expect("expected load to succeed");
        assert_eq!(config.github.team, vec!["alice"]);
    }
}
