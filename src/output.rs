//! CSV-style report rendering.
//!
//! Listing actions share one shape: a header line naming the columns, then
//! one comma-joined row per object. Each listable object kind implements
//! [`ToRow`]; render helpers stay pure and return lines so callers decide
//! where they go. Absent optional fields render as `-`.

use chrono::{DateTime, Utc};

use crate::{
    filters::ItemKind,
    model::{Account, EventRecord, Item, Label, Membership, Repo, UserProfile},
    scan::{LifetimeStats, minutes_between}
};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const ABSENT: &str = "-";

fn timestamp(value: DateTime<Utc>) -> String {
    value.format(TIMESTAMP_FORMAT).to_string()
}

fn optional_timestamp(value: Option<DateTime<Utc>>) -> String {
    value.map(timestamp).unwrap_or_else(|| ABSENT.to_owned())
}

/// A report row for one listable object kind.
pub trait ToRow {
    /// Column header shared by every row of the kind.
    fn header() -> &'static str;

    /// One comma-joined report row.
    fn row(&self) -> String;
}

impl ToRow for Repo {
    fn header() -> &'static str {
        "repoName,repoFullName,repoId,repoUrl,private,owner,ownerUrl,forks_count,\
         stargazers_count,open_issues_count,subscribers_count,created_at,pushed_at,\
         updated_at,private"
    }

    fn row(&self) -> String {
        format!(
            "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
            self.name,
            self.full_name,
            self.id,
            self.html_url,
            self.private,
            self.owner.login,
            self.owner.html_url,
            self.forks_count,
            self.stargazers_count,
            self.open_issues_count,
            self.subscribers_count.map_or_else(|| ABSENT.to_owned(), |count| count.to_string()),
            optional_timestamp(self.created_at),
            optional_timestamp(self.pushed_at),
            optional_timestamp(self.updated_at),
            self.private
        )
    }
}

/// A member or contributor row, optionally enriched with profile and
/// organization membership detail.
///
/// Detail resolution can fail per account (private memberships, deleted
/// users); those rows fall back to `-` placeholders instead of failing the
/// listing.
#[derive(Debug)]
pub struct MemberRow {
    pub account: Account,
    pub detail:  Option<(UserProfile, Membership)>
}

impl ToRow for MemberRow {
    fn header() -> &'static str {
        "user,name,email,userUrl,membershipState,organization,organizationRole,contributions"
    }

    fn row(&self) -> String {
        match &self.detail {
            Some((profile, membership)) => format!(
                "{},{},{},{},{},{},{},{}",
                self.account.login,
                profile.name.as_deref().unwrap_or(ABSENT),
                profile.email.as_deref().unwrap_or(ABSENT),
                profile.html_url,
                membership.state,
                membership.organization.login,
                membership.role,
                self.account.contributions
            ),
            None => format!(
                "{},-,-,{},-,-,-,{}",
                self.account.login, self.account.html_url, self.account.contributions
            )
        }
    }
}

impl ToRow for Item {
    fn header() -> &'static str {
        "number,state,issueUrl,createdAt,updatedAt,closedAt,lifetime,milestone,reporter,\
         assignee,title"
    }

    fn row(&self) -> String {
        let lifetime = minutes_between(self.created_at, self.lifetime_end());
        format!(
            "{},{},{},{},{},{},{},{},{},{},{}",
            self.number,
            self.state,
            self.html_url,
            timestamp(self.created_at),
            timestamp(self.updated_at),
            optional_timestamp(self.closed_at),
            lifetime,
            self.milestone.as_ref().map_or(ABSENT, |milestone| milestone.title.as_str()),
            self.reporter(),
            self.assignee.as_ref().map_or(ABSENT, |assignee| assignee.login.as_str()),
            self.title
        )
    }
}

impl ToRow for EventRecord {
    fn header() -> &'static str {
        "actor,eventType,createdAt"
    }

    fn row(&self) -> String {
        format!("{},{},{}", self.actor.login, self.event_type, timestamp(self.created_at))
    }
}

impl ToRow for Label {
    fn header() -> &'static str {
        "itemName"
    }

    fn row(&self) -> String {
        self.name.clone()
    }
}

/// Renders a header line followed by one row per object.
pub fn render_rows<T>(items: &[T]) -> Vec<String>
where
    T: ToRow
{
    let mut lines = Vec::with_capacity(items.len() + 1);
    lines.push(T::header().to_owned());
    lines.extend(items.iter().map(ToRow::row));
    lines
}

/// Renders the `key,value` report of repository counters.
pub fn render_repo_info(repo: &Repo, labels_count: u64) -> Vec<String> {
    vec![
        format!("forks_count,{}", repo.forks_count),
        format!("stargazers_count,{}", repo.stargazers_count),
        format!(
            "subscribers_count,{}",
            repo.subscribers_count.map_or_else(|| ABSENT.to_owned(), |count| count.to_string())
        ),
        format!("archived,{}", repo.archived),
        format!("private,{}", repo.private),
        format!("open_issues_count,{}", repo.open_issues_count),
        format!("labels_count,{labels_count}"),
    ]
}

/// Header of the per-label usage report.
pub fn label_usage_header() -> &'static str {
    "name,open_issues,closed_issues"
}

/// One row of the per-label usage report.
pub fn label_usage_row(label: &str, open: usize, closed: usize) -> String {
    format!("{label},{open},{closed}")
}

fn lifetime_line(
    stats: &LifetimeStats,
    kind: ItemKind,
    state: &str,
    window: Option<i64>
) -> String {
    let minutes = stats.average_minutes;
    let hours = minutes.div_euclid(60);
    let days = minutes.div_euclid(1440);
    let suffix = window.map_or_else(String::new, |days| format!(" within the last {days} days"));

    format!(
        "{state} {kind} lifetime average{suffix}: {days} day(s) or {hours} hour(s) or \
         {minutes} minute(s) for {count} {kind}",
        kind = kind.plural(),
        count = stats.count
    )
}

/// Renders the two-line lifetime report: the windowed closed reduction, then
/// the unwindowed open reduction.
pub fn render_lifetime_report(
    closed: &LifetimeStats,
    open: &LifetimeStats,
    kind: ItemKind,
    last_days: i64
) -> Vec<String> {
    vec![
        lifetime_line(closed, kind, "closed", Some(last_days)),
        lifetime_line(open, kind, "open", None),
    ]
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::{
        MemberRow, ToRow, label_usage_row, render_lifetime_report, render_repo_info, render_rows
    };
    use crate::{
        filters::ItemKind,
        model::{
            Account, ActorRef, EventRecord, Item, ItemState, Label, Membership, MilestoneRef,
            OrgRef, Repo, UserProfile
        },
        scan::LifetimeStats
    };

    fn sample_repo() -> Repo {
        let created = Utc.with_ymd_and_hms(2024, 4, 12, 10, 0, 0).single().expect("timestamp");
        Repo {
            name:              "widget".to_owned(),
            full_name:         "acme/widget".to_owned(),
            id:                42,
            html_url:          "https://github.com/acme/widget".to_owned(),
            private:           false,
            archived:          false,
            owner:             ActorRef {
                login:    "acme".to_owned(),
                html_url: "https://github.com/acme".to_owned()
            },
            forks_count:       3,
            stargazers_count:  7,
            open_issues_count: 5,
            subscribers_count: Some(2),
            created_at:        Some(created),
            pushed_at:         Some(created + Duration::days(1)),
            updated_at:        Some(created + Duration::days(2))
        }
    }

    #[test]
    fn repository_row_has_fifteen_columns() {
        let repo = sample_repo();
        assert_eq!(Repo::header().split(',').count(), 15);
        let row = repo.row();
        assert_eq!(row.split(',').count(), 15);
        assert!(row.starts_with("widget,acme/widget,42,"));
        assert!(row.contains("2024-04-12 10:00:00"));
        // private repeats as the final column
        assert!(row.ends_with(",false"));
    }

    #[test]
    fn member_row_without_detail_uses_placeholders() {
        let row = MemberRow {
            account: Account {
                login:         "alice".to_owned(),
                html_url:      "https://github.com/alice".to_owned(),
                contributions: 12
            },
            detail:  None
        }
        .row();

        assert_eq!(row, "alice,-,-,https://github.com/alice,-,-,-,12");
    }

    #[test]
    fn member_row_with_detail_reports_membership() {
        let row = MemberRow {
            account: Account {
                login:         "alice".to_owned(),
                html_url:      "https://github.com/alice".to_owned(),
                contributions: 12
            },
            detail:  Some((
                UserProfile {
                    login:    "alice".to_owned(),
                    name:     Some("Alice".to_owned()),
                    email:    None,
                    html_url: "https://github.com/alice".to_owned()
                },
                Membership {
                    state:        "active".to_owned(),
                    role:         "admin".to_owned(),
                    organization: OrgRef {
                        login: "acme".to_owned()
                    }
                }
            ))
        }
        .row();

        assert_eq!(row, "alice,Alice,-,https://github.com/alice,active,acme,admin,12");
    }

    #[test]
    fn item_row_reports_lifetime_and_references() {
        let created = Utc.with_ymd_and_hms(2024, 4, 12, 10, 0, 0).single().expect("timestamp");
        let item = Item {
            number:       7,
            state:        ItemState::Closed,
            title:        "broken build".to_owned(),
            html_url:     "https://github.com/acme/widget/issues/7".to_owned(),
            created_at:   created,
            updated_at:   created + Duration::minutes(90),
            closed_at:    Some(created + Duration::minutes(30)),
            user:         ActorRef {
                login:    "alice".to_owned(),
                html_url: String::new()
            },
            assignee:     None,
            milestone:    Some(MilestoneRef {
                title:  "v1".to_owned(),
                number: 1
            }),
            pull_request: None
        };

        let row = item.row();
        assert_eq!(row.split(',').count(), 11);
        assert!(row.contains(",30,v1,alice,-,broken build"));
    }

    #[test]
    fn render_rows_prepends_header() {
        let events = vec![EventRecord {
            actor:      ActorRef {
                login:    "alice".to_owned(),
                html_url: String::new()
            },
            event_type: "PushEvent".to_owned(),
            created_at: Utc.with_ymd_and_hms(2024, 4, 12, 10, 0, 0).single().expect("timestamp")
        }];

        let lines = render_rows(&events);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "actor,eventType,createdAt");
        assert_eq!(lines[1], "alice,PushEvent,2024-04-12 10:00:00");
    }

    #[test]
    fn label_rows_are_bare_names() {
        let labels = vec![Label {
            name: "bug".to_owned()
        }];
        let lines = render_rows(&labels);
        assert_eq!(lines, vec!["itemName".to_owned(), "bug".to_owned()]);
    }

    #[test]
    fn repo_info_lists_seven_counters() {
        let lines = render_repo_info(&sample_repo(), 9);
        assert_eq!(lines.len(), 7);
        assert_eq!(lines[0], "forks_count,3");
        assert_eq!(lines[6], "labels_count,9");
    }

    #[test]
    fn label_usage_row_joins_counts() {
        assert_eq!(label_usage_row("bug", 4, 11), "bug,4,11");
    }

    #[test]
    fn lifetime_report_formats_both_states() {
        let closed = LifetimeStats {
            count:                3,
            average_minutes:      2880,
            team_count:           0,
            team_average_minutes: 0
        };
        let open = LifetimeStats::default();

        let lines = render_lifetime_report(&closed, &open, ItemKind::Pull, 90);
        assert_eq!(
            lines[0],
            "closed pulls lifetime average within the last 90 days: 2 day(s) or 48 hour(s) or \
             2880 minute(s) for 3 pulls"
        );
        assert_eq!(
            lines[1],
            "open pulls lifetime average: 0 day(s) or 0 hour(s) or 0 minute(s) for 0 pulls"
        );
    }
}
