//! Field partitioning for the platform's query restrictions.
//!
//! Some remote fields cannot be selected together with any other field.
//! A [`QueryPlan`] splits a requested field list into groups that can each
//! be sent as one statement: a singleton group for every such field that
//! was requested, then one shared group for everything else.

/// Field groups for one logical query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPlan {
    groups: Vec<Vec<String>>,
}

impl QueryPlan {
    /// Partition `requested` according to `selectable_only_alone`.
    ///
    /// Singleton groups follow the order of `selectable_only_alone`; the
    /// shared group keeps request order and is dropped when empty.
    pub fn new<F: AsRef<str>>(requested: &[F], selectable_only_alone: &[&str]) -> Self {
        let mut remaining: Vec<String> = Vec::with_capacity(requested.len());
        for field in requested {
            let field = field.as_ref();
            if !remaining.iter().any(|f| f == field) {
                remaining.push(field.to_string());
            }
        }

        let mut groups = Vec::new();
        for alone in selectable_only_alone {
            if let Some(pos) = remaining.iter().position(|f| f == alone) {
                groups.push(vec![remaining.remove(pos)]);
            }
        }
        if !remaining.is_empty() {
            groups.push(remaining);
        }

        tracing::trace!(groups = groups.len(), "Planned query field groups");
        Self { groups }
    }

    /// The field groups, one statement each.
    pub fn groups(&self) -> &[Vec<String>] {
        &self.groups
    }

    /// Number of statements this plan needs.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Check if the plan selects nothing.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Whether results from several statements must be merged.
    pub fn is_split(&self) -> bool {
        self.groups.len() > 1
    }

    /// Every planned field, group by group.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().flatten().map(String::as_str)
    }
}
