use serde::{Deserialize, Serialize};

use crate::protocol::MODEL_PATH;

pub const QUERY_YEAR: &str = "year";
pub const QUERY_CONTRIBUTIONS: &str = "contributions";
pub const QUERY_INCLUDE_LABELS: &str = "include_labels";

/// Which subset of a year's contributions the model is built from.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContributionFilter {
    #[default]
    All,
    Personal,
    Work,
}

impl ContributionFilter {
    pub const ALL: [ContributionFilter; 3] = [Self::All, Self::Personal, Self::Work];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Personal => "personal",
            Self::Work => "work",
        }
    }

    /// Anything other than `All` needs work data to exist for the year.
    pub fn requires_work_data(&self) -> bool {
        *self != Self::All
    }
}

impl std::fmt::Display for ContributionFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ContributionFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "personal" => Ok(Self::Personal),
            "work" => Ok(Self::Work),
            other => Err(format!("unknown contribution filter: {other}")),
        }
    }
}

/// The user's current model selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelConfiguration {
    pub year: Option<u32>,
    pub contributions: ContributionFilter,
    pub include_labels: Option<bool>,
}

impl ModelConfiguration {
    pub fn for_year(year: u32) -> Self {
        Self {
            year: Some(year),
            ..Self::default()
        }
    }
}

/// Clamp a raw year input: anything non-positive or beyond `u32` is unset.
pub fn sanitize_year(raw: i64) -> Option<u32> {
    if raw <= 0 {
        return None;
    }
    u32::try_from(raw).ok()
}

/// Parse a year typed by the user. Non-integer text is unset.
pub fn parse_year(text: &str) -> Option<u32> {
    text.trim().parse::<i64>().ok().and_then(sanitize_year)
}

/// Canonical address of a model resource: a path plus query parameters in
/// declared field order. Equal configurations always produce equal locators,
/// so locators double as cache keys.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceLocator {
    path: String,
    query: Vec<(&'static str, String)>,
}

impl ResourceLocator {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> &[(&'static str, String)] {
        &self.query
    }

    pub fn query_string(&self) -> String {
        self.query
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Path plus query, e.g. `/contributions/model?year=2021&contributions=all`.
    pub fn path_and_query(&self) -> String {
        if self.query.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{}", self.path, self.query_string())
        }
    }

    pub fn to_url(&self, base_url: &str) -> String {
        format!("{}{}", base_url.trim_end_matches('/'), self.path_and_query())
    }

    /// The year encoded in the query, if any.
    pub fn year(&self) -> Option<u32> {
        self.query
            .iter()
            .find(|(k, _)| *k == QUERY_YEAR)
            .and_then(|(_, v)| v.parse().ok())
    }

    /// Download name matching the server's `Content-Disposition`.
    pub fn suggested_filename(&self, user: &str) -> String {
        match self.year() {
            Some(year) => format!("{user}-{year}-{year}.stl"),
            None => format!("{user}.stl"),
        }
    }
}

impl std::fmt::Display for ResourceLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.path_and_query())
    }
}

/// Resolve a configuration into its resource locator.
///
/// Unset fields are omitted; present ones are emitted as
/// `year`, `contributions`, `include_labels`, in that order.
pub fn resolve(config: &ModelConfiguration) -> ResourceLocator {
    let mut query = Vec::with_capacity(3);
    if let Some(year) = config.year {
        query.push((QUERY_YEAR, year.to_string()));
    }
    query.push((QUERY_CONTRIBUTIONS, config.contributions.as_str().to_string()));
    if let Some(include_labels) = config.include_labels {
        query.push((QUERY_INCLUDE_LABELS, include_labels.to_string()));
    }
    ResourceLocator {
        path: MODEL_PATH.to_string(),
        query,
    }
}
