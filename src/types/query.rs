use serde::{Deserialize, Serialize};

/// Collections that carry watcher/stargizer sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Goal,
    Project,
    Team,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    #[must_use]
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Sort keys for goal search. Every ordering is tie-broken by id
/// ascending so pages stay stable under concurrent inserts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalSort {
    #[default]
    CreatedAt,
    UpdatedAt,
    Title,
}

impl GoalSort {
    #[must_use]
    pub fn as_sql(&self) -> &'static str {
        match self {
            GoalSort::CreatedAt => "g.created_at",
            GoalSort::UpdatedAt => "g.updated_at",
            GoalSort::Title => "g.title",
        }
    }
}

/// Which collection's goals a search runs over. Team scope spans the
/// goals of every member project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GoalScope {
    Project(String),
    Team(String),
}

/// Full-text plus faceted goal filter. Facets are OR-within, AND-across;
/// an empty facet applies no constraint. An empty `query` is an explicit
/// product rule for "match nothing", not "no filter".
#[derive(Debug, Clone)]
pub struct GoalFilter {
    pub query: String,
    pub states: Vec<String>,
    pub tags: Vec<String>,
    pub owners: Vec<String>,
    pub page_size: i64,
    pub offset: i64,
    pub sort_by: GoalSort,
    pub sort: SortOrder,
}

impl Default for GoalFilter {
    fn default() -> Self {
        Self {
            query: String::new(),
            states: Vec::new(),
            tags: Vec::new(),
            owners: Vec::new(),
            page_size: 50,
            offset: 0,
            sort_by: GoalSort::default(),
            sort: SortOrder::default(),
        }
    }
}
