//! GitHub organization and repository activity collection.
//!
//! The library queries the GitHub REST API for activity data (issues, pull
//! requests, contributors, labels, workflow runs) and reduces it into either
//! CSV-style reports for humans or gauge batches for a Prometheus
//! Pushgateway. The aggregation pipeline walks paginated, time-ordered
//! collections and derives rolling statistics (lifetime averages,
//! team-partitioned counts, staleness counts) while bounding the walk by the
//! requested time window wherever the API's ordering guarantees allow it.

mod canon;
mod config;
mod error;
mod filters;
mod github;
mod metrics;
mod model;
mod output;
mod push;
mod scan;

pub use canon::canonical_name;
pub use config::{
    Config, GithubConfig, MetricsConfig, PrometheusConfig, WorkflowsConfig, load_config,
    parse_config
};
pub use error::{Error, io_error};
pub use filters::{FilterSet, ItemKind, is_sentinel};
pub use github::{Cutoff, CutoffField, GithubClient};
pub use metrics::{Metric, MetricsCollector, RepoMetrics, split_repo_id};
pub use model::{
    Account, ActorRef, CloseSortedDesc, CreationSortedDesc, EventRecord, Item, ItemState, Label,
    Membership, MilestoneRef, OrgRef, Repo, UserProfile, Workflow, WorkflowRun, WorkflowRunsPage,
    WorkflowsPage
};
pub use output::{
    MemberRow, ToRow, label_usage_header, label_usage_row, render_lifetime_report,
    render_repo_info, render_rows
};
pub use push::{build_registry, push_metrics};
pub use scan::{
    LifetimeStats, TeamRoster, closed_lifetime, count_created_within, count_unassigned,
    minutes_between, open_lifetime, stale_items
};
