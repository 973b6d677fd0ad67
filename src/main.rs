//! Command-line interface for the ghmon binary.
//!
//! One invocation performs one action against the GitHub API and prints the
//! result, except for `push-metrics-prometheus` which republishes the
//! collected statistics to a Pushgateway.

use std::{path::PathBuf, process};

use chrono::{Duration, Utc};
use clap::{Parser, ValueEnum};
use ghmon::{
    Account, CloseSortedDesc, Config, Cutoff, CutoffField, Error, FilterSet, GithubClient, Item,
    ItemKind, MemberRow, MetricsCollector, TeamRoster, ToRow, closed_lifetime,
    label_usage_header, label_usage_row, load_config, open_lifetime, push_metrics,
    render_lifetime_report, render_repo_info, render_rows, split_repo_id, stale_items
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Collect GitHub information for humans and monitoring tools.
#[derive(Debug, Parser)]
#[command(name = "ghmon", version, about = "Collect GitHub information")]
struct Cli {
    /// The organization ID to be consulted.
    #[arg(short, long, default_value = "ExampleOrg")]
    org: String,

    /// Repository name (owner/name) when required by an action, or `all`.
    #[arg(short, long, default_value = "all")]
    repository: String,

    /// Action to perform.
    #[arg(short, long, value_enum)]
    action: Action,

    /// Show the numbers only.
    #[arg(short, long)]
    count: bool,

    /// Number of days to filter older or recent issues and pulls.
    #[arg(short, long, default_value_t = 30)]
    days: i64,

    /// Query filters accepted by the API, as comma separated key=value pairs.
    #[arg(short, long, default_value = "", conflicts_with = "labels")]
    filters: String,

    /// Comma separated labels used to filter the results.
    #[arg(short, long, default_value = "")]
    labels: String,

    /// Path to the configuration file.
    #[arg(long, value_name = "PATH", env = "GHMON_CONFIG", default_value = "ghmon.yaml")]
    config: PathBuf,

    /// Raise the default log level to debug.
    #[arg(short, long)]
    verbose: bool
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Action {
    ListOrgRepos,
    ListOrgMembers,
    ListRepoContributors,
    ListRepoInfos,
    ListRepoLabels,
    ListRepoLabelsCount,
    ListRepoEvents,
    ListRepoIssues,
    ListRepoOldIssues,
    ListRepoRecentPulls,
    CalcRepoIssuesLifetime,
    ListRepoPulls,
    ListRepoOldPulls,
    CalcRepoPullsLifetime,
    PushMetricsPrometheus
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "ghmon=debug"
    } else {
        "ghmon=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into())
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(error) = run(cli).await {
        eprintln!("{error}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Error> {
    let config = load_config(&cli.config)?;
    let github = GithubClient::new(&config.github_token()?)?;

    match cli.action {
        Action::ListOrgRepos => {
            let repos = github.list_org_repos(&cli.org).await?;
            print_listing(&repos, cli.count);
        }
        Action::ListOrgMembers => {
            let members = github.list_org_members(&cli.org, "all").await?;
            if cli.count {
                println!("{}", members.len());
                return Ok(());
            }
            let rows = enrich_members(&github, &cli.org, members).await;
            print_lines(&render_rows(&rows));
        }
        Action::ListRepoContributors => {
            let contributors = {
                let (owner, repo) = split_repo_id(&cli.repository)?;
                github.list_contributors(owner, repo).await?
            };
            if cli.count {
                println!("{}", contributors.len());
                return Ok(());
            }
            let rows = enrich_members(&github, &cli.org, contributors).await;
            print_lines(&render_rows(&rows));
        }
        Action::ListRepoInfos => {
            let (owner, repo) = split_repo_id(&cli.repository)?;
            let info = github.get_repo(owner, repo).await?;
            let labels_count = github.list_labels(owner, repo).await?.len() as u64;
            print_lines(&render_repo_info(&info, labels_count));
        }
        Action::ListRepoLabels => {
            let (owner, repo) = split_repo_id(&cli.repository)?;
            let labels = github.list_labels(owner, repo).await?;
            print_listing(&labels, cli.count);
        }
        Action::ListRepoLabelsCount => {
            run_label_usage(&github, &cli.repository).await?;
        }
        Action::ListRepoEvents => {
            let (owner, repo) = split_repo_id(&cli.repository)?;
            let events = github.list_events(owner, repo).await?;
            print_listing(&events, cli.count);
        }
        Action::ListRepoIssues => {
            let items = fetch_issues(&github, &cli.repository, &cli.filters, &cli.labels).await?;
            print_listing(&items, cli.count);
        }
        Action::ListRepoPulls => {
            let items = fetch_pulls(&github, &cli.repository, &cli.filters).await?;
            print_listing(&items, cli.count);
        }
        Action::ListRepoOldIssues => {
            let items = fetch_issues(&github, &cli.repository, "state=open", "").await?;
            print_listing(&stale_subset(&items, cli.days), cli.count);
        }
        Action::ListRepoOldPulls => {
            let items = fetch_pulls(&github, &cli.repository, "state=open").await?;
            print_listing(&stale_subset(&items, cli.days), cli.count);
        }
        Action::ListRepoRecentPulls => {
            let (owner, repo) = split_repo_id(&cli.repository)?;
            let filters = FilterSet::parse("state=all", ItemKind::Pull)?;
            let cutoff = created_cutoff(cli.days);
            let items = github.list_pulls(owner, repo, &filters, Some(cutoff)).await?;
            let recent: Vec<Item> =
                items.into_iter().filter(|item| item.created_at >= cutoff.at).collect();
            print_listing(&recent, cli.count);
        }
        Action::CalcRepoIssuesLifetime => {
            run_lifetime(&github, &config, &cli.repository, ItemKind::Issue, cli.days).await?;
        }
        Action::CalcRepoPullsLifetime => {
            run_lifetime(&github, &config, &cli.repository, ItemKind::Pull, cli.days).await?;
        }
        Action::PushMetricsPrometheus => {
            run_push(&github, &config, &cli.org, &cli.repository).await?;
            println!("Metrics successfully sent!");
        }
    }

    Ok(())
}

fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{line}");
    }
}

fn print_listing<T>(items: &[T], count_only: bool)
where
    T: ToRow
{
    if count_only {
        println!("{}", items.len());
        return;
    }
    print_lines(&render_rows(items));
}

fn created_cutoff(days: i64) -> Cutoff {
    Cutoff {
        field: CutoffField::Created,
        at:    Utc::now() - Duration::days(days)
    }
}

fn stale_subset(items: &[Item], days: i64) -> Vec<Item> {
    stale_items(items, days, Utc::now()).into_iter().cloned().collect()
}

async fn fetch_issues(
    github: &GithubClient,
    repo_id: &str,
    filters: &str,
    labels: &str
) -> Result<Vec<Item>, Error> {
    let (owner, repo) = split_repo_id(repo_id)?;
    let filters = FilterSet::parse(filters, ItemKind::Issue)?;
    let labels: Vec<String> = labels
        .split(',')
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .map(str::to_owned)
        .collect();
    github.list_issues(owner, repo, &filters, &labels, None).await
}

async fn fetch_pulls(
    github: &GithubClient,
    repo_id: &str,
    filters: &str
) -> Result<Vec<Item>, Error> {
    let (owner, repo) = split_repo_id(repo_id)?;
    let filters = FilterSet::parse(filters, ItemKind::Pull)?;
    github.list_pulls(owner, repo, &filters, None).await
}

/// Resolves profile and membership detail per account; accounts that cannot
/// be resolved (private memberships, deleted users) fall back to placeholder
/// rows rather than failing the listing.
async fn enrich_members(
    github: &GithubClient,
    org: &str,
    accounts: Vec<Account>
) -> Vec<MemberRow> {
    let mut rows = Vec::with_capacity(accounts.len());
    for account in accounts {
        let detail = match (
            github.get_user(&account.login).await,
            github.get_membership(org, &account.login).await
        ) {
            (Ok(profile), Ok(membership)) => Some((profile, membership)),
            (profile, membership) => {
                debug!(
                    login = %account.login,
                    profile_ok = profile.is_ok(),
                    membership_ok = membership.is_ok(),
                    "membership detail unavailable"
                );
                None
            }
        };
        rows.push(MemberRow {
            account,
            detail
        });
    }
    rows
}

async fn run_label_usage(github: &GithubClient, repo_id: &str) -> Result<(), Error> {
    let (owner, repo) = split_repo_id(repo_id)?;
    let labels = github.list_labels(owner, repo).await?;

    println!("{}", label_usage_header());
    for label in labels {
        let open_filters = FilterSet::parse("state=open", ItemKind::Issue)?;
        let open = github
            .list_issues(owner, repo, &open_filters, std::slice::from_ref(&label.name), None)
            .await?;
        let closed_filters = FilterSet::parse("state=closed", ItemKind::Issue)?;
        let closed = github
            .list_issues(owner, repo, &closed_filters, std::slice::from_ref(&label.name), None)
            .await?;
        println!("{}", label_usage_row(&label.name, open.len(), closed.len()));
    }
    Ok(())
}

async fn run_lifetime(
    github: &GithubClient,
    config: &Config,
    repo_id: &str,
    kind: ItemKind,
    days: i64
) -> Result<(), Error> {
    let (owner, repo) = split_repo_id(repo_id)?;
    let team = TeamRoster::new(config.github.team.iter().cloned());
    let now = Utc::now();

    let closed_filters = FilterSet::parse("state=closed", kind)?;
    let cutoff = Cutoff {
        field: CutoffField::Closed,
        at:    now - Duration::days(days)
    };
    let closed = match kind {
        ItemKind::Issue => {
            github.list_issues(owner, repo, &closed_filters, &[], Some(cutoff)).await?
        }
        ItemKind::Pull => github.list_pulls(owner, repo, &closed_filters, Some(cutoff)).await?
    };
    let closed = CloseSortedDesc::new_unchecked(closed);
    let closed_stats = closed_lifetime(&closed, days, &team, now);

    let open_filters = FilterSet::parse("state=open", kind)?;
    let open = match kind {
        ItemKind::Issue => github.list_issues(owner, repo, &open_filters, &[], None).await?,
        ItemKind::Pull => github.list_pulls(owner, repo, &open_filters, None).await?
    };
    let open_stats = open_lifetime(&open, &team);

    print_lines(&render_lifetime_report(&closed_stats, &open_stats, kind, days));
    Ok(())
}

async fn run_push(
    github: &GithubClient,
    config: &Config,
    org: &str,
    repository: &str
) -> Result<(), Error> {
    let prometheus = config.prometheus()?.clone();
    let collector = MetricsCollector::new(github, config);

    let (mut metrics, org_repos) = collector.collect_org(org).await?;

    if repository == "all" {
        let repos = match org_repos {
            Some(repos) => repos,
            None => github.list_org_repos(org).await?
        };
        let progress = ProgressBar::new(repos.len() as u64).with_style(
            ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
        );
        for repo in repos {
            progress.set_message(repo.full_name.clone());
            let collected = collector.collect_repo(&repo.full_name).await?;
            print_lines(&collected.workflow_report);
            metrics.extend(collected.metrics);
            progress.inc(1);
        }
        progress.finish_and_clear();
    } else {
        let collected = collector.collect_repo(repository).await?;
        print_lines(&collected.workflow_report);
        metrics.extend(collected.metrics);
    }

    push_metrics(metrics, &prometheus.push_target, &prometheus.push_job).await
}
