//! Domain objects consumed from the hosting API.
//!
//! All entities in this module are externally owned and read-only: they
//! mirror the wire shape of GitHub responses closely enough to deserialize
//! directly, while exposing only the fields the collectors and printers
//! consume. Issues and pull requests share the unified [`Item`] record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lightweight reference to a user or actor embedded in other objects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorRef {
    /// Account login.
    pub login: String,

    /// Web URL of the account, when the embedding object carries one.
    #[serde(default)]
    pub html_url: String
}

/// Milestone reference embedded in issue objects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MilestoneRef {
    /// Milestone title.
    pub title: String,

    /// Milestone number used as an API filter value.
    pub number: u64
}

/// Open/closed state of an issue or pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemState {
    /// The item is open.
    Open,
    /// The item is closed. `closed_at` is set iff this state holds.
    Closed
}

impl std::fmt::Display for ItemState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => f.write_str("open"),
            Self::Closed => f.write_str("closed")
        }
    }
}

/// Unified issue / pull request record.
///
/// GitHub's issues listing returns pull requests interleaved with issues; the
/// `pull_request` marker distinguishes them. Pull listings deserialize into
/// the same shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    /// Item number within the repository.
    pub number: u64,

    /// Open/closed state.
    pub state: ItemState,

    /// Item title.
    #[serde(default)]
    pub title: String,

    /// Web URL of the item.
    #[serde(default)]
    pub html_url: String,

    /// Creation timestamp.
    pub created_at: DateTime<Utc>,

    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,

    /// Close timestamp, present iff the item is closed.
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,

    /// Account that reported the item.
    pub user: ActorRef,

    /// Assigned account, when any.
    #[serde(default)]
    pub assignee: Option<ActorRef>,

    /// Milestone, when any.
    #[serde(default)]
    pub milestone: Option<MilestoneRef>,

    /// Marker object present on issue records that are pull requests.
    #[serde(default, skip_serializing)]
    pub pull_request: Option<serde_json::Value>
}

impl Item {
    /// Login of the account that reported the item.
    pub fn reporter(&self) -> &str {
        &self.user.login
    }

    /// Whether an issue record actually denotes a pull request.
    pub fn is_pull(&self) -> bool {
        self.pull_request.is_some()
    }

    /// End timestamp used for lifetime computation: close time for closed
    /// items, last update otherwise.
    pub fn lifetime_end(&self) -> DateTime<Utc> {
        self.closed_at.unwrap_or(self.updated_at)
    }
}

/// Repository record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repo {
    /// Repository name.
    pub name: String,

    /// Owner-qualified name (`owner/name`).
    pub full_name: String,

    /// Numeric identifier.
    pub id: u64,

    /// Web URL of the repository.
    #[serde(default)]
    pub html_url: String,

    /// Private-visibility flag.
    #[serde(default)]
    pub private: bool,

    /// Archived flag.
    #[serde(default)]
    pub archived: bool,

    /// Owning account.
    pub owner: ActorRef,

    /// Fork count.
    #[serde(default)]
    pub forks_count: u64,

    /// Star count.
    #[serde(default)]
    pub stargazers_count: u64,

    /// Open issue count (includes open pull requests).
    #[serde(default)]
    pub open_issues_count: u64,

    /// Watcher count. Only present on single-repository responses; listing
    /// responses omit it.
    #[serde(default)]
    pub subscribers_count: Option<u64>,

    /// Creation timestamp.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,

    /// Last push timestamp. Absent for empty repositories.
    #[serde(default)]
    pub pushed_at: Option<DateTime<Utc>>,

    /// Last update timestamp.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>
}

/// Organization member or repository contributor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Account login.
    pub login: String,

    /// Web URL of the account.
    #[serde(default)]
    pub html_url: String,

    /// Contribution count, present on contributor listings.
    #[serde(default)]
    pub contributions: u64
}

/// Full user profile fetched when rendering membership rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    /// Account login.
    pub login: String,

    /// Display name, when set.
    #[serde(default)]
    pub name: Option<String>,

    /// Public email, when set.
    #[serde(default)]
    pub email: Option<String>,

    /// Web URL of the account.
    #[serde(default)]
    pub html_url: String
}

/// Organization membership details for a single account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Membership {
    /// Membership state (`active`, `pending`).
    pub state: String,

    /// Membership role (`member`, `admin`).
    pub role: String,

    /// Organization the membership belongs to.
    pub organization: OrgRef
}

/// Organization reference embedded in membership objects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrgRef {
    /// Organization login.
    pub login: String
}

/// Repository label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Label {
    /// Label name.
    pub name: String
}

/// Repository event record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    /// Account that triggered the event.
    pub actor: ActorRef,

    /// Event type name.
    #[serde(rename = "type")]
    pub event_type: String,

    /// Event timestamp.
    pub created_at: DateTime<Utc>
}

/// Workflow descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    /// Numeric workflow identifier.
    pub id: u64,

    /// Workflow name.
    pub name: String
}

/// Single workflow run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRun {
    /// Run status (`completed`, `in_progress`, ...).
    pub status: String,

    /// Run conclusion (`success`, `failure`, ...), absent while running.
    #[serde(default)]
    pub conclusion: Option<String>,

    /// Run creation timestamp.
    pub created_at: DateTime<Utc>,

    /// Run update timestamp.
    pub updated_at: DateTime<Utc>,

    /// Web URL of the run.
    #[serde(default)]
    pub html_url: String
}

/// Envelope of the workflow-runs listing endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowRunsPage {
    /// Total number of runs matching the query, across all pages.
    pub total_count: u64,

    /// Runs on the requested page.
    #[serde(default)]
    pub workflow_runs: Vec<WorkflowRun>
}

/// Envelope of the workflows listing endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowsPage {
    /// Total number of workflows, across all pages.
    pub total_count: u64,

    /// Workflows on the requested page.
    #[serde(default)]
    pub workflows: Vec<Workflow>
}

/// Items fetched with `sort=created, direction=desc`.
///
/// The wrapper is a contract witness for the early-exit recency scan: the
/// caller asserts the collection was requested in descending creation-time
/// order. If the assertion is violated the scan silently under- or
/// over-counts; the precondition is documented, not masked.
#[derive(Debug, Clone)]
pub struct CreationSortedDesc(Vec<Item>);

impl CreationSortedDesc {
    /// Wraps items the caller fetched in descending creation-time order.
    /// The ordering is not verified.
    pub fn new_unchecked(items: Vec<Item>) -> Self {
        Self(items)
    }

    /// Borrowed view of the wrapped items.
    pub fn items(&self) -> &[Item] {
        &self.0
    }
}

/// Closed items fetched in descending close-time order.
///
/// Same contract shape as [`CreationSortedDesc`], keyed on `closed_at`.
#[derive(Debug, Clone)]
pub struct CloseSortedDesc(Vec<Item>);

impl CloseSortedDesc {
    /// Wraps items the caller fetched in descending close-time order.
    /// The ordering is not verified.
    pub fn new_unchecked(items: Vec<Item>) -> Self {
        Self(items)
    }

    /// Borrowed view of the wrapped items.
    pub fn items(&self) -> &[Item] {
        &self.0
    }
}
