//! Query filter normalization.
//!
//! A raw delimited `key=value` string is expanded into a complete filter set
//! for the requested object type: recognized keys override the defaults, any
//! other key fails the whole action before a single API call is made. Values
//! are free-form strings handed to the API unchanged, except for the
//! `assignee`/`milestone` sentinels `none` and `*` which mean "no filter".

use std::collections::BTreeMap;

use crate::error::Error;

/// Object type a filter string is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    /// Issue queries.
    Issue,
    /// Pull request queries.
    Pull
}

impl ItemKind {
    /// Singular label used in error messages.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Issue => "issue",
            Self::Pull => "pull"
        }
    }

    /// Plural label used in metric names and reports.
    pub fn plural(self) -> &'static str {
        match self {
            Self::Issue => "issues",
            Self::Pull => "pulls"
        }
    }
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recognized keys and their defaults for issue queries.
const ISSUE_DEFAULTS: &[(&str, &str)] = &[
    ("state", "open"),
    ("assignee", "none"),
    ("milestone", "none"),
    ("sort", "created"),
    ("direction", "desc")
];

/// Recognized keys and their defaults for pull request queries.
const PULL_DEFAULTS: &[(&str, &str)] =
    &[("state", "open"), ("sort", "created"), ("direction", "desc")];

/// Returns whether a filter value is a "no filter" sentinel that must be
/// passed through to the API unresolved.
pub fn is_sentinel(value: &str) -> bool {
    matches!(value, "none" | "*")
}

/// Complete, validated filter set for one object type.
///
/// Constructed via [`FilterSet::parse`]; every recognized key is always
/// present (defaulted then overridden).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSet {
    kind:   ItemKind,
    values: BTreeMap<&'static str, String>
}

impl FilterSet {
    /// Builds the default filter set for the given object type.
    pub fn defaults(kind: ItemKind) -> Self {
        let defaults = match kind {
            ItemKind::Issue => ISSUE_DEFAULTS,
            ItemKind::Pull => PULL_DEFAULTS
        };
        let values = defaults.iter().map(|(key, value)| (*key, (*value).to_owned())).collect();
        Self {
            kind,
            values
        }
    }

    /// Parses a raw `key=value[,key=value...]` string into a complete filter
    /// set for the given object type. An empty or blank string yields the
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for malformed pairs and
    /// [`Error::InvalidFilter`] for keys the object type does not recognize.
    ///
    /// # Examples
    ///
    /// ```
    /// use ghmon::{FilterSet, ItemKind};
    ///
    /// let filters = FilterSet::parse("state=closed,milestone=v1", ItemKind::Issue)?;
    /// assert_eq!(filters.get("state"), Some("closed"));
    /// assert_eq!(filters.get("assignee"), Some("none"));
    /// # Ok::<(), ghmon::Error>(())
    /// ```
    pub fn parse(raw: &str, kind: ItemKind) -> Result<Self, Error> {
        let mut filters = Self::defaults(kind);

        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(filters);
        }

        for pair in trimmed.split(',') {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| Error::validation(format!("filter '{pair}' is not key=value")))?;
            filters.set(key.trim(), value.trim())?;
        }

        Ok(filters)
    }

    /// Object type this filter set is scoped to.
    pub fn kind(&self) -> ItemKind {
        self.kind
    }

    /// Returns the value for a recognized key, `None` otherwise.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Overrides the value of a recognized key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFilter`] when the key is not recognized for
    /// this object type.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), Error> {
        let defaults = match self.kind {
            ItemKind::Issue => ISSUE_DEFAULTS,
            ItemKind::Pull => PULL_DEFAULTS
        };
        let known = defaults
            .iter()
            .map(|(known, _)| *known)
            .find(|known| *known == key)
            .ok_or_else(|| Error::invalid_filter(key, self.kind.as_str()))?;

        self.values.insert(known, value.to_owned());
        Ok(())
    }

    /// Iterates over `(key, value)` pairs in deterministic key order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.values.iter().map(|(key, value)| (*key, value.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::{FilterSet, ItemKind, is_sentinel};
    use crate::error::Error;

    #[test]
    fn issue_defaults_cover_all_recognized_keys() {
        let filters = FilterSet::defaults(ItemKind::Issue);
        assert_eq!(filters.get("state"), Some("open"));
        assert_eq!(filters.get("assignee"), Some("none"));
        assert_eq!(filters.get("milestone"), Some("none"));
        assert_eq!(filters.get("sort"), Some("created"));
        assert_eq!(filters.get("direction"), Some("desc"));
    }

    #[test]
    fn pull_defaults_omit_assignee_and_milestone() {
        let filters = FilterSet::defaults(ItemKind::Pull);
        assert_eq!(filters.get("state"), Some("open"));
        assert_eq!(filters.get("sort"), Some("created"));
        assert_eq!(filters.get("direction"), Some("desc"));
        assert_eq!(filters.get("assignee"), None);
        assert_eq!(filters.get("milestone"), None);
    }

    #[test]
    fn parse_preserves_non_overridden_defaults() {
        let filters = FilterSet::parse("state=closed,milestone=v1", ItemKind::Issue)
            .expect("expected parse success");

        assert_eq!(filters.get("state"), Some("closed"));
        assert_eq!(filters.get("milestone"), Some("v1"));
        assert_eq!(filters.get("assignee"), Some("none"));
        assert_eq!(filters.get("sort"), Some("created"));
        assert_eq!(filters.get("direction"), Some("desc"));
    }

    #[test]
    fn parse_rejects_unknown_keys() {
        let error = FilterSet::parse("reviewer=alice", ItemKind::Issue)
            .expect_err("expected invalid filter error");
        match error {
            Error::InvalidFilter {
                key,
                kind
            } => {
                assert_eq!(key, "reviewer");
                assert_eq!(kind, "issue");
            }
            other => panic!("unexpected error variant: {other:?}")
        }
    }

    #[test]
    fn parse_rejects_issue_only_keys_for_pulls() {
        let result = FilterSet::parse("assignee=alice", ItemKind::Pull);
        assert!(matches!(result, Err(Error::InvalidFilter { .. })));
    }

    #[test]
    fn parse_rejects_malformed_pairs() {
        let result = FilterSet::parse("state", ItemKind::Issue);
        assert!(matches!(result, Err(Error::Validation { .. })));
    }

    #[test]
    fn parse_accepts_blank_input() {
        let filters = FilterSet::parse("  ", ItemKind::Pull).expect("expected parse success");
        assert_eq!(filters, FilterSet::defaults(ItemKind::Pull));
    }

    #[test]
    fn parse_trims_keys_and_values() {
        let filters = FilterSet::parse(" state = closed , sort = updated ", ItemKind::Pull)
            .expect("expected parse success");
        assert_eq!(filters.get("state"), Some("closed"));
        assert_eq!(filters.get("sort"), Some("updated"));
    }

    #[test]
    fn set_overrides_resolved_references() {
        let mut filters = FilterSet::defaults(ItemKind::Issue);
        filters.set("milestone", "3").expect("expected known key");
        assert_eq!(filters.get("milestone"), Some("3"));
    }

    #[test]
    fn sentinels_are_recognized() {
        assert!(is_sentinel("none"));
        assert!(is_sentinel("*"));
        assert!(!is_sentinel("alice"));
    }

    #[test]
    fn iter_yields_deterministic_order() {
        let filters = FilterSet::defaults(ItemKind::Pull);
        let keys: Vec<_> = filters.iter().map(|(key, _)| key).collect();
        assert_eq!(keys, vec!["direction", "sort", "state"]);
    }
}
