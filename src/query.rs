use std::fmt;

use serde_json::Value as JsonValue;

/// Value of a single list filter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FilterValue {
    /// One `key=value` pair.
    Scalar(String),
    /// One `key=value` pair per element, in order.
    Many(Vec<String>),
    /// One `key=candidate` pair per selected candidate, in order.
    Selection(Vec<(String, bool)>),
}

impl FilterValue {
    /// Builds a selection map from `(candidate, is_selected)` pairs.
    pub fn selection<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, bool)>,
        K: Into<String>,
    {
        Self::Selection(
            entries
                .into_iter()
                .map(|(candidate, selected)| (candidate.into(), selected))
                .collect(),
        )
    }

    fn push_pairs(&self, key: &str, pairs: &mut Vec<String>) {
        match self {
            Self::Scalar(value) => pairs.push(format!("{key}={value}")),
            Self::Many(values) => {
                pairs.extend(values.iter().map(|value| format!("{key}={value}")));
            }
            Self::Selection(entries) => pairs.extend(
                entries
                    .iter()
                    .filter(|(_, selected)| *selected)
                    .map(|(candidate, _)| format!("{key}={candidate}")),
            ),
        }
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        Self::Scalar(value)
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        Self::Scalar(value.to_owned())
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        Self::Scalar(value.to_string())
    }
}

impl From<i32> for FilterValue {
    fn from(value: i32) -> Self {
        Self::Scalar(value.to_string())
    }
}

impl From<u64> for FilterValue {
    fn from(value: u64) -> Self {
        Self::Scalar(value.to_string())
    }
}

impl From<f64> for FilterValue {
    fn from(value: f64) -> Self {
        Self::Scalar(value.to_string())
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        Self::Scalar(value.to_string())
    }
}

impl<T: Into<FilterScalar>> From<Vec<T>> for FilterValue {
    fn from(values: Vec<T>) -> Self {
        Self::Many(values.into_iter().map(|value| value.into().0).collect())
    }
}

impl<T: Into<FilterScalar>, const N: usize> From<[T; N]> for FilterValue {
    fn from(values: [T; N]) -> Self {
        Self::Many(values.into_iter().map(|value| value.into().0).collect())
    }
}

/// Converts decoded JSON the same way a loosely typed caller would pass it:
/// arrays expand, objects select their `true` keys, everything else is a
/// single value.
impl From<JsonValue> for FilterValue {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Array(values) => Self::Many(values.iter().map(json_scalar).collect()),
            JsonValue::Object(entries) => Self::Selection(
                entries
                    .into_iter()
                    .map(|(candidate, selected)| (candidate, selected == JsonValue::Bool(true)))
                    .collect(),
            ),
            other => Self::Scalar(json_scalar(&other)),
        }
    }
}

/// Rendered text of one filter element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilterScalar(String);

impl From<String> for FilterScalar {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for FilterScalar {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<i64> for FilterScalar {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

impl From<i32> for FilterScalar {
    fn from(value: i32) -> Self {
        Self(value.to_string())
    }
}

impl From<u64> for FilterScalar {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

fn json_scalar(value: &JsonValue) -> String {
    match value {
        JsonValue::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Sort direction rendered into `_order`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asc => f.write_str("asc"),
            Self::Desc => f.write_str("desc"),
        }
    }
}

impl From<SortOrder> for String {
    fn from(order: SortOrder) -> Self {
        order.to_string()
    }
}

/// Filter, sort and pagination parameters of a list request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListParams {
    /// Filters in insertion order.
    pub filters: Vec<(String, FilterValue)>,
    /// Sort fields; joined with commas.
    pub sort: Vec<String>,
    /// Sort direction token.
    pub order: Option<String>,
    /// Index of the first record. Zero is not emitted.
    pub offset: Option<u64>,
    /// Page size. Zero is not emitted.
    pub limit: Option<u64>,
}

impl ListParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a filter; an existing key keeps its position and gets the new value.
    pub fn filter(mut self, key: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        let key = key.into();
        let value = value.into();
        match self.filters.iter_mut().find(|(existing, _)| *existing == key) {
            Some(slot) => slot.1 = value,
            None => self.filters.push((key, value)),
        }
        self
    }

    /// Sets a single sort field.
    pub fn sort(mut self, field: impl Into<String>) -> Self {
        self.sort = vec![field.into()];
        self
    }

    /// Sets several sort fields, in priority order.
    pub fn sort_by<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sort = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn order(mut self, order: impl Into<String>) -> Self {
        self.order = Some(order.into());
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Renders list parameters as a json-server query string, without the
/// leading `?`.
///
/// Values are inserted verbatim; callers that need escaping must pre-encode.
/// An offset of `0` is treated as absent.
pub fn encode_query(params: &ListParams) -> String {
    let mut pairs = Vec::new();

    for (key, value) in &params.filters {
        value.push_pairs(key, &mut pairs);
    }

    if !params.sort.is_empty() {
        pairs.push(format!("_sort={}", params.sort.join(",")));
    }
    if let Some(order) = params.order.as_deref().filter(|order| !order.is_empty()) {
        pairs.push(format!("_order={order}"));
    }
    if let Some(offset) = params.offset.filter(|offset| *offset != 0) {
        pairs.push(format!("_start={offset}"));
    }
    if let Some(limit) = params.limit.filter(|limit| *limit != 0) {
        pairs.push(format!("_limit={limit}"));
    }

    pairs.join("&")
}
