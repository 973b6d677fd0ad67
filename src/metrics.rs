//! Metric naming and collection.
//!
//! Every statistic becomes a flat `{name, value, description}` record whose
//! name is derived deterministically from canonicalized identifiers, so
//! repeated runs extend the same time series. Records are appended in call
//! order with no deduplication; the downstream sink owns charset validation
//! beyond canonicalization.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::{
    canon::canonical_name,
    config::Config,
    error::Error,
    filters::{FilterSet, ItemKind},
    github::{Cutoff, CutoffField, GithubClient},
    model::{CloseSortedDesc, CreationSortedDesc, Item, Repo},
    scan::{
        self, LifetimeStats, TeamRoster, count_created_within, count_unassigned, stale_items
    }
};

/// One gauge sample destined for a sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metric {
    /// Canonicalized gauge name, valid as a Prometheus metric name.
    pub name:        String,
    /// Gauge value; counts and floored minute averages both fit in `i64`.
    pub value:       i64,
    /// Human-readable help text registered alongside the gauge.
    pub description: String
}

/// Output of a full per-repository collection pass.
#[derive(Debug, Default)]
pub struct RepoMetrics {
    /// Gauge samples for the push sink.
    pub metrics:         Vec<Metric>,
    /// Workflow summary lines, reported to the console rather than pushed.
    pub workflow_report: Vec<String>
}

/// Splits an `owner/name` repository identifier.
///
/// # Errors
///
/// Returns [`Error::Validation`] when the identifier has no `/` separator.
pub fn split_repo_id(repo_id: &str) -> Result<(&str, &str), Error> {
    repo_id
        .split_once('/')
        .ok_or_else(|| Error::validation(format!("repository id '{repo_id}' is not owner/name")))
}

fn record(metrics: &mut Vec<Metric>, name: String, value: i64, description: String) {
    metrics.push(Metric {
        name,
        value,
        description
    });
}

/// Builds the three open-item gauges (total, unassigned, stale) for one
/// collection, with an optional qualifier suffix.
///
/// The suffix text goes into descriptions verbatim; its last word, in
/// canonical form, becomes the metric name suffix.
fn open_item_metrics(
    metrics: &mut Vec<Metric>,
    repo_id: &str,
    items: &[Item],
    kind: ItemKind,
    suffix: &str,
    no_activity_limit: i64,
    now: DateTime<Utc>
) {
    let repo_name = canonical_name(repo_id);
    let kind = kind.plural();
    let metric_suffix = match suffix.split_whitespace().last() {
        Some(word) => format!("_{}", canonical_name(word)),
        None => String::new()
    };

    record(
        metrics,
        format!("{repo_name}_open_{kind}{metric_suffix}"),
        items.len() as i64,
        format!("Count of open {kind} on {repo_id} {suffix}")
    );
    record(
        metrics,
        format!("{repo_name}_unassigned_open_{kind}{metric_suffix}"),
        count_unassigned(items) as i64,
        format!("Count of unassigned open {kind} on {repo_id} {suffix}")
    );
    record(
        metrics,
        format!("{repo_name}_old_open_{kind}{metric_suffix}"),
        stale_items(items, no_activity_limit, now).len() as i64,
        format!("Count of old open {kind} on {repo_id} {suffix}")
    );
}

/// Builds the per-label gauges (total, unassigned, stale) for one collection.
fn label_metrics(
    metrics: &mut Vec<Metric>,
    repo_id: &str,
    items: &[Item],
    label: &str,
    state: &str,
    kind: ItemKind,
    no_activity_limit: i64,
    now: DateTime<Utc>
) {
    let repo_name = canonical_name(repo_id);
    let kind = kind.plural();
    let label_name = canonical_name(label).to_lowercase();

    record(
        metrics,
        format!("{repo_name}_{state}_{kind}_label_{label_name}"),
        items.len() as i64,
        format!("Count of {state} {kind} on {repo_id} with label {label}")
    );
    record(
        metrics,
        format!("{repo_name}_{state}_{kind}_label_{label_name}_unassigned"),
        count_unassigned(items) as i64,
        format!("Count of unassigned {state} {kind} on {repo_id} with label {label}")
    );
    record(
        metrics,
        format!("{repo_name}_{state}_{kind}_label_{label_name}_old"),
        stale_items(items, no_activity_limit, now).len() as i64,
        format!("Count of old {state} {kind} on {repo_id} with label {label}")
    );
}

/// Builds the created-within-timeframe pair (total, by team).
fn created_metrics(
    metrics: &mut Vec<Metric>,
    repo_id: &str,
    kind: ItemKind,
    timeframe: i64,
    total: u64,
    team_total: u64
) {
    let repo_name = canonical_name(repo_id);
    let kind = kind.plural();

    record(
        metrics,
        format!("{repo_name}_created_{kind}_{timeframe}days"),
        total as i64,
        format!("Number of created {kind} within last {timeframe} days on {repo_id}")
    );
    record(
        metrics,
        format!("{repo_name}_created_{kind}_by_team_{timeframe}days"),
        team_total as i64,
        format!("Number of {kind} created by team within last {timeframe} days on {repo_id}")
    );
}

/// Builds the lifetime gauges for one reduction: counts only for the closed
/// state (where a timeframe bounds the window), averages for both states.
fn lifetime_metrics(
    metrics: &mut Vec<Metric>,
    repo_id: &str,
    stats: &LifetimeStats,
    kind: ItemKind,
    state: &str,
    timeframe: Option<i64>
) {
    let repo_name = canonical_name(repo_id);
    let kind = kind.plural();
    let (suffix, metric_suffix) = match timeframe {
        Some(days) => (format!("from last {days} days"), format!("_{days}days")),
        None => (String::new(), String::new())
    };

    if let Some(days) = timeframe {
        record(
            metrics,
            format!("{repo_name}_{state}_{kind}_{days}days"),
            stats.count as i64,
            format!("Number of {state} {kind} on {repo_id} {suffix}")
        );
        record(
            metrics,
            format!("{repo_name}_{state}_{kind}_{days}days_team"),
            stats.team_count as i64,
            format!("Number of {state} team {kind} on {repo_id} {suffix}")
        );
    }

    record(
        metrics,
        format!("{repo_name}_{state}_{kind}_lifetime_average{metric_suffix}"),
        stats.average_minutes,
        format!("Average lifetime of {state} {kind} on {repo_id} {suffix}")
    );
    record(
        metrics,
        format!("{repo_name}_{state}_{kind}_lifetime_average{metric_suffix}_team"),
        stats.team_average_minutes,
        format!("Average lifetime of {state} team {kind} on {repo_id} {suffix}")
    );
}

/// Collects org- and repository-level gauges according to the configured
/// toggle lists.
pub struct MetricsCollector<'a> {
    github: &'a GithubClient,
    config: &'a Config,
    team:   TeamRoster,
    now:    DateTime<Utc>
}

impl<'a> MetricsCollector<'a> {
    /// Builds a collector bound to a client and configuration.
    pub fn new(github: &'a GithubClient, config: &'a Config) -> Self {
        Self {
            github,
            config,
            team: TeamRoster::new(config.github.team.iter().cloned()),
            now: Utc::now()
        }
    }

    fn max_timeframe(&self) -> i64 {
        self.config.github.metrics.timeframes.iter().copied().max().unwrap_or_default()
    }

    /// Collects organization-level gauges.
    ///
    /// When the `repositories` toggle is active the fetched listing is
    /// returned so callers iterating "all repositories" reuse it instead of
    /// fetching twice.
    ///
    /// # Errors
    ///
    /// Propagates API failures from the underlying client.
    pub async fn collect_org(
        &self,
        org: &str
    ) -> Result<(Vec<Metric>, Option<Vec<Repo>>), Error> {
        let mut metrics = Vec::new();
        let mut repos = None;

        for toggle in &self.config.github.metrics.org {
            let count = match toggle.as_str() {
                "members" => self.github.list_org_members(org, "all").await?.len() as i64,
                "admins" => self.github.list_org_members(org, "admin").await?.len() as i64,
                "repositories" => {
                    let listing = self.github.list_org_repos(org).await?;
                    let count = listing.len() as i64;
                    repos = Some(listing);
                    count
                }
                "team_size" => self.config.github.team.len() as i64,
                other => {
                    warn!(metric = other, "organization metric is not available");
                    continue;
                }
            };
            record(
                &mut metrics,
                format!("{org}_org_{toggle}"),
                count,
                format!("Count of {toggle} on {org} org")
            );
        }

        Ok((metrics, repos))
    }

    /// Collects every configured repository-level gauge for one repository.
    ///
    /// # Errors
    ///
    /// Propagates API failures; an unknown toggle is skipped with a warning.
    pub async fn collect_repo(&self, repo_id: &str) -> Result<RepoMetrics, Error> {
        debug!(repo = repo_id, "collecting repository metrics");
        let (owner, repo) = split_repo_id(repo_id)?;
        let mut out = RepoMetrics::default();

        for toggle in &self.config.github.metrics.repo {
            match toggle.as_str() {
                "contributors" => {
                    let contributors = self.github.list_contributors(owner, repo).await?;
                    let repo_name = canonical_name(repo_id);
                    record(
                        &mut out.metrics,
                        format!("{repo_name}_contributors"),
                        contributors.len() as i64,
                        format!("Count of contributors on {repo_id}")
                    );
                }
                "events" => {
                    let events = self.github.list_events(owner, repo).await?;
                    let repo_name = canonical_name(repo_id);
                    record(
                        &mut out.metrics,
                        format!("{repo_name}_events"),
                        events.len() as i64,
                        format!("Count of events on {repo_id}")
                    );
                }
                "general_info" => self.collect_general_info(repo_id, &mut out.metrics).await?,
                "issues_by_label" => {
                    self.collect_issues_by_label(repo_id, "open", &mut out.metrics).await?;
                }
                "created_issues_by_timeframe" => {
                    self.collect_created(repo_id, ItemKind::Issue, &mut out.metrics).await?;
                }
                "created_pulls_by_timeframe" => {
                    self.collect_created(repo_id, ItemKind::Pull, &mut out.metrics).await?;
                }
                "open_issues" => {
                    self.collect_open_items(repo_id, ItemKind::Issue, &mut out.metrics).await?;
                }
                "open_pulls" => {
                    self.collect_open_items(repo_id, ItemKind::Pull, &mut out.metrics).await?;
                }
                "issues_lifetime_average" => {
                    self.collect_lifetime(repo_id, ItemKind::Issue, &mut out.metrics).await?;
                }
                "pulls_lifetime_average" => {
                    self.collect_lifetime(repo_id, ItemKind::Pull, &mut out.metrics).await?;
                }
                "workflows" => {
                    out.workflow_report.extend(self.collect_workflows(owner, repo).await?);
                }
                other => warn!(metric = other, "repository metric is not available")
            }
        }

        Ok(out)
    }

    async fn collect_general_info(
        &self,
        repo_id: &str,
        metrics: &mut Vec<Metric>
    ) -> Result<(), Error> {
        let (owner, repo) = split_repo_id(repo_id)?;
        let info = self.github.get_repo(owner, repo).await?;
        let labels_count = self.github.list_labels(owner, repo).await?.len() as i64;
        let repo_name = canonical_name(repo_id);

        let gauges: [(&str, i64); 7] = [
            ("forks_count", info.forks_count as i64),
            ("stargazers_count", info.stargazers_count as i64),
            ("subscribers_count", info.subscribers_count.unwrap_or_default() as i64),
            ("archived", i64::from(info.archived)),
            ("private", i64::from(info.private)),
            ("open_issues_count", info.open_issues_count as i64),
            ("labels_count", labels_count)
        ];
        for (key, value) in gauges {
            record(
                metrics,
                format!("{repo_name}_{key}"),
                value,
                format!("Count of {key} on {repo_id}")
            );
        }
        Ok(())
    }

    async fn collect_issues_by_label(
        &self,
        repo_id: &str,
        state: &str,
        metrics: &mut Vec<Metric>
    ) -> Result<(), Error> {
        let (owner, repo) = split_repo_id(repo_id)?;
        let limit = self.config.github.metrics.no_activity_limit;
        let filters = FilterSet::parse(&format!("state={state}"), ItemKind::Issue)?;

        for label in &self.config.github.labels {
            let items = self
                .github
                .list_issues(owner, repo, &filters, std::slice::from_ref(label), None)
                .await?;
            label_metrics(metrics, repo_id, &items, label, state, ItemKind::Issue, limit, self.now);

            let pulls: Vec<Item> = items.into_iter().filter(Item::is_pull).collect();
            label_metrics(metrics, repo_id, &pulls, label, state, ItemKind::Pull, limit, self.now);
        }
        Ok(())
    }

    async fn collect_created(
        &self,
        repo_id: &str,
        kind: ItemKind,
        metrics: &mut Vec<Metric>
    ) -> Result<(), Error> {
        let (owner, repo) = split_repo_id(repo_id)?;
        let cutoff = Cutoff {
            field: CutoffField::Created,
            at:    self.now - chrono::Duration::days(self.max_timeframe())
        };
        let filters = FilterSet::parse("state=all", kind)?;
        let items = match kind {
            ItemKind::Issue => {
                self.github.list_issues(owner, repo, &filters, &[], Some(cutoff)).await?
            }
            ItemKind::Pull => self.github.list_pulls(owner, repo, &filters, Some(cutoff)).await?
        };

        // Default filters request descending creation order upstream.
        let items = CreationSortedDesc::new_unchecked(items);
        for &timeframe in &self.config.github.metrics.timeframes {
            let (total, team_total) =
                count_created_within(&items, timeframe, &self.team, self.now);
            created_metrics(metrics, repo_id, kind, timeframe, total, team_total);
        }
        Ok(())
    }

    async fn collect_open_items(
        &self,
        repo_id: &str,
        kind: ItemKind,
        metrics: &mut Vec<Metric>
    ) -> Result<(), Error> {
        let (owner, repo) = split_repo_id(repo_id)?;
        let limit = self.config.github.metrics.no_activity_limit;
        let filters = FilterSet::parse("state=open", kind)?;
        let items = match kind {
            ItemKind::Issue => self.github.list_issues(owner, repo, &filters, &[], None).await?,
            ItemKind::Pull => self.github.list_pulls(owner, repo, &filters, None).await?
        };

        open_item_metrics(metrics, repo_id, &items, kind, "", limit, self.now);

        let team_items: Vec<Item> = items
            .into_iter()
            .filter(|item| self.team.contains(item.reporter()))
            .collect();
        open_item_metrics(metrics, repo_id, &team_items, kind, "filed by team", limit, self.now);
        Ok(())
    }

    async fn collect_lifetime(
        &self,
        repo_id: &str,
        kind: ItemKind,
        metrics: &mut Vec<Metric>
    ) -> Result<(), Error> {
        let (owner, repo) = split_repo_id(repo_id)?;
        let cutoff = Cutoff {
            field: CutoffField::Closed,
            at:    self.now - chrono::Duration::days(self.max_timeframe())
        };

        let closed_filters = FilterSet::parse("state=closed", kind)?;
        let closed = match kind {
            ItemKind::Issue => {
                self.github.list_issues(owner, repo, &closed_filters, &[], Some(cutoff)).await?
            }
            ItemKind::Pull => {
                self.github.list_pulls(owner, repo, &closed_filters, Some(cutoff)).await?
            }
        };
        let closed = CloseSortedDesc::new_unchecked(closed);
        for &timeframe in &self.config.github.metrics.timeframes {
            let stats = scan::closed_lifetime(&closed, timeframe, &self.team, self.now);
            lifetime_metrics(metrics, repo_id, &stats, kind, "closed", Some(timeframe));
        }

        let open_filters = FilterSet::parse("state=open", kind)?;
        let open = match kind {
            ItemKind::Issue => {
                self.github.list_issues(owner, repo, &open_filters, &[], None).await?
            }
            ItemKind::Pull => self.github.list_pulls(owner, repo, &open_filters, None).await?
        };
        let stats = scan::open_lifetime(&open, &self.team);
        lifetime_metrics(metrics, repo_id, &stats, kind, "open", None);
        Ok(())
    }

    async fn collect_workflows(&self, owner: &str, repo: &str) -> Result<Vec<String>, Error> {
        let repo_name = canonical_name(repo);
        let mut report = Vec::new();

        for status in &self.config.github.metrics.workflows.status {
            let count = self.github.count_workflow_runs(owner, repo, status).await?;
            report.push(format!(
                "{repo_name}_workflows_status: {count} - Count of {status} workflows runs on {repo_name}"
            ));
        }

        let workflows = self.github.list_workflows(owner, repo).await?;
        for name in &self.config.github.metrics.workflows.names {
            let workflow = workflows
                .iter()
                .find(|workflow| workflow.name == *name)
                .ok_or_else(|| Error::not_found(format!("workflow '{name}' in {owner}/{repo}")))?;
            let runs = self
                .github
                .list_workflow_runs(owner, repo, workflow.id, Some("completed"))
                .await?;
            let last_run = runs
                .workflow_runs
                .first()
                .ok_or_else(|| Error::not_found(format!("completed run of workflow '{name}'")))?;

            let workflow_name = canonical_name(name);
            let fields: [(&str, String); 5] = [
                ("status", last_run.status.clone()),
                ("conclusion", last_run.conclusion.clone().unwrap_or_else(|| "-".to_owned())),
                ("created_at", last_run.created_at.to_string()),
                ("updated_at", last_run.updated_at.to_string()),
                ("html_url", last_run.html_url.clone())
            ];
            for (info, value) in fields {
                report.push(format!(
                    "{repo_name}_workflow_{workflow_name}_info: {value} - Count of {info} workflows runs on {repo_name}"
                ));
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::{
        created_metrics, label_metrics, lifetime_metrics, open_item_metrics, split_repo_id
    };
    use crate::{
        filters::ItemKind,
        model::{ActorRef, Item, ItemState},
        scan::LifetimeStats
    };

    fn open_item(number: u64, updated_days_ago: i64, assigned: bool) -> Item {
        let now = Utc::now();
        Item {
            number,
            state: ItemState::Open,
            title: format!("item {number}"),
            html_url: String::new(),
            created_at: now - Duration::days(updated_days_ago + 1),
            updated_at: now - Duration::days(updated_days_ago),
            closed_at: None,
            user: ActorRef {
                login:    "alice".to_owned(),
                html_url: String::new()
            },
            assignee: assigned.then(|| ActorRef {
                login:    "bob".to_owned(),
                html_url: String::new()
            }),
            milestone: None,
            pull_request: None
        }
    }

    #[test]
    fn split_repo_id_requires_separator() {
        assert_eq!(split_repo_id("org/repo").expect("expected split"), ("org", "repo"));
        assert!(split_repo_id("repo-only").is_err());
    }

    #[test]
    fn open_item_metric_names_and_values() {
        let items = vec![open_item(1, 0, true), open_item(2, 120, false)];
        let mut metrics = Vec::new();
        open_item_metrics(
            &mut metrics,
            "my-org/My.Repo",
            &items,
            ItemKind::Issue,
            "",
            90,
            Utc::now()
        );

        let names: Vec<_> = metrics.iter().map(|metric| metric.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "myorg_MyRepo_open_issues",
                "myorg_MyRepo_unassigned_open_issues",
                "myorg_MyRepo_old_open_issues"
            ]
        );
        let values: Vec<_> = metrics.iter().map(|metric| metric.value).collect();
        assert_eq!(values, vec![2, 1, 1]);
    }

    #[test]
    fn open_item_metric_suffix_uses_last_word() {
        let mut metrics = Vec::new();
        open_item_metrics(
            &mut metrics,
            "org/repo",
            &[],
            ItemKind::Pull,
            "filed by team",
            90,
            Utc::now()
        );

        assert_eq!(metrics[0].name, "org_repo_open_pulls_team");
        assert_eq!(metrics[0].description, "Count of open pulls on org/repo filed by team");
    }

    #[test]
    fn label_metric_names_lowercase_canonical_label() {
        let mut metrics = Vec::new();
        label_metrics(
            &mut metrics,
            "org/repo",
            &[],
            "Good First-Issue",
            "open",
            ItemKind::Issue,
            90,
            Utc::now()
        );

        let names: Vec<_> = metrics.iter().map(|metric| metric.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "org_repo_open_issues_label_goodfirstissue",
                "org_repo_open_issues_label_goodfirstissue_unassigned",
                "org_repo_open_issues_label_goodfirstissue_old"
            ]
        );
    }

    #[test]
    fn created_metric_pair_encodes_timeframe() {
        let mut metrics = Vec::new();
        created_metrics(&mut metrics, "org/repo", ItemKind::Pull, 30, 7, 3);

        assert_eq!(metrics[0].name, "org_repo_created_pulls_30days");
        assert_eq!(metrics[0].value, 7);
        assert_eq!(metrics[1].name, "org_repo_created_pulls_by_team_30days");
        assert_eq!(metrics[1].value, 3);
    }

    #[test]
    fn closed_lifetime_metrics_carry_window_and_counts() {
        let stats = LifetimeStats {
            count:                3,
            average_minutes:      20,
            team_count:           1,
            team_average_minutes: 10
        };
        let mut metrics = Vec::new();
        lifetime_metrics(&mut metrics, "org/repo", &stats, ItemKind::Issue, "closed", Some(90));

        let names: Vec<_> = metrics.iter().map(|metric| metric.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "org_repo_closed_issues_90days",
                "org_repo_closed_issues_90days_team",
                "org_repo_closed_issues_lifetime_average_90days",
                "org_repo_closed_issues_lifetime_average_90days_team"
            ]
        );
        let values: Vec<_> = metrics.iter().map(|metric| metric.value).collect();
        assert_eq!(values, vec![3, 1, 20, 10]);
    }

    #[test]
    fn open_lifetime_metrics_skip_counts_and_window() {
        let stats = LifetimeStats::default();
        let mut metrics = Vec::new();
        lifetime_metrics(&mut metrics, "org/repo", &stats, ItemKind::Pull, "open", None);

        let names: Vec<_> = metrics.iter().map(|metric| metric.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "org_repo_open_pulls_lifetime_average",
                "org_repo_open_pulls_lifetime_average_team"
            ]
        );
    }
}
