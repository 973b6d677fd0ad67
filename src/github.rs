//! GitHub API facade.
//!
//! Wraps an [`Octocrab`] client behind typed listing and resolution calls.
//! Paginated collections are fetched page by page; callers that only need a
//! recent window pass a [`Cutoff`] so the walk stops once a page crosses the
//! window boundary instead of draining the full history.

use chrono::{DateTime, Utc};
use octocrab::Octocrab;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::{
    error::Error,
    filters::{FilterSet, ItemKind, is_sentinel},
    model::{
        Account, EventRecord, Item, Label, Membership, MilestoneRef, Repo, UserProfile, Workflow,
        WorkflowRunsPage, WorkflowsPage
    }
};

const PER_PAGE: u32 = 100;
const MAX_PAGES: u32 = 100;

/// Timestamp field a bounded walk stops on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CutoffField {
    /// Stop when `created_at` falls before the boundary.
    Created,
    /// Stop when `closed_at` falls before the boundary.
    Closed
}

/// Lower time boundary for a bounded collection walk.
///
/// Pagination stops after the first page containing an item older than the
/// boundary. The accuracy of the resulting prefix depends on the API
/// returning items in descending order of the chosen field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cutoff {
    /// Timestamp field compared against the boundary.
    pub field: CutoffField,
    /// Boundary instant; items strictly older stop the walk.
    pub at:    DateTime<Utc>
}

impl Cutoff {
    fn reached(&self, item: &Item) -> bool {
        match self.field {
            CutoffField::Created => item.created_at < self.at,
            CutoffField::Closed => item.closed_at.is_some_and(|closed_at| closed_at < self.at)
        }
    }
}

/// Typed facade over the GitHub REST API.
pub struct GithubClient {
    octocrab: Octocrab
}

impl GithubClient {
    /// Builds an authenticated client from a personal access token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Service`] when the underlying client cannot be
    /// constructed.
    pub fn new(token: &str) -> Result<Self, Error> {
        let octocrab = Octocrab::builder()
            .personal_token(token.to_owned())
            .build()
            .map_err(|e| Error::service(format!("failed to build GitHub client: {e}")))?;
        Ok(Self {
            octocrab
        })
    }

    /// Lists every repository of an organization.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when the organization does not exist and
    /// [`Error::Service`] for other API failures.
    pub async fn list_org_repos(&self, org: &str) -> Result<Vec<Repo>, Error> {
        self.fetch_all(&format!("/orgs/{org}/repos"), Vec::new(), &format!("organization {org}"))
            .await
    }

    /// Lists organization members holding the given role (`all`, `member` or
    /// `admin`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when the organization does not exist and
    /// [`Error::Service`] for other API failures.
    pub async fn list_org_members(&self, org: &str, role: &str) -> Result<Vec<Account>, Error> {
        let params = vec![("role", role.to_owned())];
        self.fetch_all(&format!("/orgs/{org}/members"), params, &format!("organization {org}"))
            .await
    }

    /// Resolves a user login to a profile.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when no such user exists.
    pub async fn get_user(&self, login: &str) -> Result<UserProfile, Error> {
        self.get_one(&format!("/users/{login}"), &format!("user {login}")).await
    }

    /// Fetches a user's membership record in an organization.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when the user holds no membership.
    pub async fn get_membership(&self, org: &str, login: &str) -> Result<Membership, Error> {
        self.get_one(
            &format!("/orgs/{org}/memberships/{login}"),
            &format!("membership of {login} in {org}")
        )
        .await
    }

    /// Fetches a single repository.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when the repository does not exist.
    pub async fn get_repo(&self, owner: &str, repo: &str) -> Result<Repo, Error> {
        self.get_one(&format!("/repos/{owner}/{repo}"), &format!("repository {owner}/{repo}"))
            .await
    }

    /// Lists repository contributors with their contribution counts.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for a missing repository and
    /// [`Error::Service`] for other API failures.
    pub async fn list_contributors(&self, owner: &str, repo: &str) -> Result<Vec<Account>, Error> {
        self.fetch_all(
            &format!("/repos/{owner}/{repo}/contributors"),
            Vec::new(),
            &format!("repository {owner}/{repo}")
        )
        .await
    }

    /// Lists every label defined on a repository.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for a missing repository and
    /// [`Error::Service`] for other API failures.
    pub async fn list_labels(&self, owner: &str, repo: &str) -> Result<Vec<Label>, Error> {
        self.fetch_all(
            &format!("/repos/{owner}/{repo}/labels"),
            Vec::new(),
            &format!("repository {owner}/{repo}")
        )
        .await
    }

    /// Lists recent repository events, newest first.
    ///
    /// The events feed only retains the trailing window the API chooses to
    /// serve, so this is inherently a partial view.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for a missing repository and
    /// [`Error::Service`] for other API failures.
    pub async fn list_events(&self, owner: &str, repo: &str) -> Result<Vec<EventRecord>, Error> {
        self.fetch_all(
            &format!("/repos/{owner}/{repo}/events"),
            Vec::new(),
            &format!("repository {owner}/{repo}")
        )
        .await
    }

    /// Lists issues matching a filter set, optionally label-restricted and
    /// cutoff-bounded.
    ///
    /// Non-sentinel `assignee` and `milestone` values are resolved through
    /// the API first; the milestone is sent as its number as the API
    /// requires. When `labels` is non-empty the `assignee` and `milestone`
    /// parameters are omitted entirely: the endpoint treats them as real
    /// constraints even for the sentinel values, which would narrow a label
    /// query to unassigned, milestone-less issues. The issues endpoint also
    /// surfaces pull requests; callers split them with [`Item::is_pull`]
    /// when they need one kind only.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when the repository, a referenced user or
    /// a referenced milestone does not exist.
    pub async fn list_issues(
        &self,
        owner: &str,
        repo: &str,
        filters: &FilterSet,
        labels: &[String],
        cutoff: Option<Cutoff>
    ) -> Result<Vec<Item>, Error> {
        debug_assert_eq!(filters.kind(), ItemKind::Issue);

        let mut params = issue_params(filters, labels);
        for param in &mut params {
            match param.0 {
                "assignee" if !is_sentinel(&param.1) => {
                    param.1 = self.get_user(&param.1).await?.login;
                }
                "milestone" if !is_sentinel(&param.1) => {
                    let milestone = self.resolve_milestone(owner, repo, &param.1).await?;
                    param.1 = milestone.number.to_string();
                }
                _ => {}
            }
        }

        self.fetch_items(
            &format!("/repos/{owner}/{repo}/issues"),
            params,
            cutoff,
            &format!("repository {owner}/{repo}")
        )
        .await
    }

    /// Lists pull requests matching a filter set, optionally cutoff-bounded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for a missing repository and
    /// [`Error::Service`] for other API failures.
    pub async fn list_pulls(
        &self,
        owner: &str,
        repo: &str,
        filters: &FilterSet,
        cutoff: Option<Cutoff>
    ) -> Result<Vec<Item>, Error> {
        debug_assert_eq!(filters.kind(), ItemKind::Pull);

        let params = filters.iter().map(|(key, value)| (key, value.to_owned())).collect();
        self.fetch_items(
            &format!("/repos/{owner}/{repo}/pulls"),
            params,
            cutoff,
            &format!("repository {owner}/{repo}")
        )
        .await
    }

    /// Resolves a milestone title to its reference.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when no milestone carries the title.
    pub async fn resolve_milestone(
        &self,
        owner: &str,
        repo: &str,
        title: &str
    ) -> Result<MilestoneRef, Error> {
        let params = vec![("state", "all".to_owned())];
        let milestones: Vec<MilestoneRef> = self
            .fetch_all(
                &format!("/repos/{owner}/{repo}/milestones"),
                params,
                &format!("repository {owner}/{repo}")
            )
            .await?;

        milestones
            .into_iter()
            .find(|milestone| milestone.title == title)
            .ok_or_else(|| Error::not_found(format!("milestone '{title}' in {owner}/{repo}")))
    }

    /// Lists workflows defined on a repository.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for a missing repository and
    /// [`Error::Service`] for other API failures.
    pub async fn list_workflows(&self, owner: &str, repo: &str) -> Result<Vec<Workflow>, Error> {
        let page: WorkflowsPage = self
            .get_one(
                &format!("/repos/{owner}/{repo}/actions/workflows?per_page={PER_PAGE}"),
                &format!("repository {owner}/{repo}")
            )
            .await?;
        Ok(page.workflows)
    }

    /// Counts workflow runs across the whole repository matching a status.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for a missing repository and
    /// [`Error::Service`] for other API failures.
    pub async fn count_workflow_runs(
        &self,
        owner: &str,
        repo: &str,
        status: &str
    ) -> Result<u64, Error> {
        let page: WorkflowRunsPage = self
            .get_one(
                &format!("/repos/{owner}/{repo}/actions/runs?status={status}&per_page=1"),
                &format!("repository {owner}/{repo}")
            )
            .await?;
        Ok(page.total_count)
    }

    /// Fetches the first page of runs for a workflow, newest first, together
    /// with the total run count.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for a missing workflow and
    /// [`Error::Service`] for other API failures.
    pub async fn list_workflow_runs(
        &self,
        owner: &str,
        repo: &str,
        workflow_id: u64,
        status: Option<&str>
    ) -> Result<WorkflowRunsPage, Error> {
        let mut path =
            format!("/repos/{owner}/{repo}/actions/workflows/{workflow_id}/runs?per_page={PER_PAGE}");
        if let Some(status) = status {
            path.push_str(&format!("&status={status}"));
        }
        self.get_one(&path, &format!("workflow {workflow_id} in {owner}/{repo}")).await
    }

    async fn get_one<T>(&self, path: &str, what: &str) -> Result<T, Error>
    where
        T: DeserializeOwned
    {
        debug!(path, "GitHub GET");
        self.octocrab
            .get(path, None::<&()>)
            .await
            .map_err(|e| map_api_error(e, what))
    }

    async fn fetch_all<T>(
        &self,
        path: &str,
        base_params: Vec<(&'static str, String)>,
        what: &str
    ) -> Result<Vec<T>, Error>
    where
        T: DeserializeOwned
    {
        let mut collected = Vec::new();
        let mut page = 1u32;

        loop {
            let mut params = base_params.clone();
            params.push(("per_page", PER_PAGE.to_string()));
            params.push(("page", page.to_string()));

            debug!(path, page, "GitHub GET page");
            let batch: Vec<T> = self
                .octocrab
                .get(path, Some(&params))
                .await
                .map_err(|e| map_api_error(e, what))?;
            let batch_len = batch.len();
            collected.extend(batch);

            if batch_len < PER_PAGE as usize || page >= MAX_PAGES {
                break;
            }
            page += 1;
        }

        Ok(collected)
    }

    async fn fetch_items(
        &self,
        path: &str,
        base_params: Vec<(&'static str, String)>,
        cutoff: Option<Cutoff>,
        what: &str
    ) -> Result<Vec<Item>, Error> {
        let mut collected: Vec<Item> = Vec::new();
        let mut page = 1u32;

        loop {
            let mut params = base_params.clone();
            params.push(("per_page", PER_PAGE.to_string()));
            params.push(("page", page.to_string()));

            debug!(path, page, "GitHub GET page");
            let batch: Vec<Item> = self
                .octocrab
                .get(path, Some(&params))
                .await
                .map_err(|e| map_api_error(e, what))?;
            let batch_len = batch.len();
            let boundary_crossed = cutoff
                .as_ref()
                .is_some_and(|cutoff| batch.iter().any(|item| cutoff.reached(item)));
            collected.extend(batch);

            if batch_len < PER_PAGE as usize || boundary_crossed || page >= MAX_PAGES {
                break;
            }
            page += 1;
        }

        Ok(collected)
    }
}

/// Assembles the query parameters for an issue listing.
///
/// A label restriction drops the `assignee` and `milestone` filters: the
/// endpoint applies them as constraints even when they hold the sentinel
/// values, and the label metrics need the full labeled set.
fn issue_params(filters: &FilterSet, labels: &[String]) -> Vec<(&'static str, String)> {
    let mut params: Vec<(&'static str, String)> = filters
        .iter()
        .filter(|(key, _)| labels.is_empty() || !matches!(*key, "assignee" | "milestone"))
        .map(|(key, value)| (key, value.to_owned()))
        .collect();
    if !labels.is_empty() {
        params.push(("labels", labels.join(",")));
    }
    params
}

fn map_api_error(error: octocrab::Error, what: &str) -> Error {
    if let octocrab::Error::GitHub {
        source, ..
    } = &error
        && source.status_code.as_u16() == 404
    {
        return Error::not_found(what);
    }
    Error::service(format!("GitHub API request for {what} failed: {error}"))
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::{Cutoff, CutoffField, issue_params};
    use crate::{
        filters::{FilterSet, ItemKind},
        model::{ActorRef, Item, ItemState}
    };

    fn item(created_days_ago: i64, closed_days_ago: Option<i64>) -> Item {
        let now = Utc::now();
        Item {
            number:       1,
            state:        ItemState::Open,
            title:        "t".to_owned(),
            html_url:     String::new(),
            created_at:   now - Duration::days(created_days_ago),
            updated_at:   now,
            closed_at:    closed_days_ago.map(|days| now - Duration::days(days)),
            user:         ActorRef {
                login:    "alice".to_owned(),
                html_url: String::new()
            },
            assignee:     None,
            milestone:    None,
            pull_request: None
        }
    }

    #[test]
    fn label_query_omits_assignee_and_milestone() {
        let filters = FilterSet::defaults(ItemKind::Issue);
        let labels = vec!["bug".to_owned(), "help wanted".to_owned()];

        let params = issue_params(&filters, &labels);
        let keys: Vec<&str> = params.iter().map(|(key, _)| *key).collect();

        assert!(!keys.contains(&"assignee"));
        assert!(!keys.contains(&"milestone"));
        assert!(keys.contains(&"state"));
        assert!(params.contains(&("labels", "bug,help wanted".to_owned())));
    }

    #[test]
    fn unlabeled_query_keeps_sentinel_filters() {
        let filters = FilterSet::defaults(ItemKind::Issue);

        let params = issue_params(&filters, &[]);

        assert!(params.contains(&("assignee", "none".to_owned())));
        assert!(params.contains(&("milestone", "none".to_owned())));
        assert!(!params.iter().any(|(key, _)| *key == "labels"));
    }

    #[test]
    fn created_cutoff_fires_on_older_items() {
        let cutoff = Cutoff {
            field: CutoffField::Created,
            at:    Utc::now() - Duration::days(30)
        };
        assert!(!cutoff.reached(&item(10, None)));
        assert!(cutoff.reached(&item(40, None)));
    }

    #[test]
    fn closed_cutoff_ignores_items_without_close_time() {
        let cutoff = Cutoff {
            field: CutoffField::Closed,
            at:    Utc::now() - Duration::days(30)
        };
        assert!(!cutoff.reached(&item(100, None)));
        assert!(!cutoff.reached(&item(100, Some(5))));
        assert!(cutoff.reached(&item(100, Some(60))));
    }
}
