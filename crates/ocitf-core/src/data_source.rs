// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Data sources, pagination and list filters.

use std::collections::HashSet;
use std::future::Future;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{ProviderError, Result};
use crate::retry::RetryPolicy;
use crate::schema::ResourceSpec;

/// A read-only query against a service.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Schema of the arguments and results.
    fn spec(&self) -> &ResourceSpec;

    /// Run the query with JSON arguments and return JSON results.
    async fn read(&self, args: Value) -> Result<Value>;
}

/// One page of a list call.
#[derive(Debug, Clone)]
pub struct Page<T> {
    /// Items on this page.
    pub items: Vec<T>,
    /// Token for the next page (`opc-next-page`), if there is one.
    pub next_page: Option<String>,
}

impl<T> Page<T> {
    /// A page with no successor.
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_page: None,
        }
    }
}

/// Fetch every page of a list call.
///
/// Each page request runs under `retry`. A token that repeats ends the
/// iteration instead of looping forever.
pub async fn paginate<T, F, Fut>(retry: &RetryPolicy, operation: &str, mut fetch: F) -> Result<Vec<T>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    let mut items = Vec::new();
    let mut token: Option<String> = None;
    let mut seen = HashSet::new();
    let mut pages = 0u32;

    loop {
        let page = retry
            .execute(operation, || fetch(token.clone()))
            .await?;
        pages += 1;
        items.extend(page.items);

        match page.next_page {
            Some(next) if !seen.insert(next.clone()) => {
                warn!(operation = operation, token = %next, "Page token repeated, stopping");
                break;
            }
            Some(next) => token = Some(next),
            None => break,
        }
    }

    debug!(operation = operation, pages = pages, items = items.len(), "Listed all pages");
    Ok(items)
}

/// Client-side filter over list results.
///
/// An item passes when the attribute `name` (a dotted path into nested
/// objects) matches any of `values`. With `regex` set the values are
/// regular expressions searched anywhere in the attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    /// Attribute to filter on.
    pub name: String,
    /// Accepted values.
    pub values: Vec<String>,
    /// Treat values as regular expressions.
    #[serde(default)]
    pub regex: bool,
}

impl Filter {
    /// Exact-match filter.
    pub fn new<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
            regex: false,
        }
    }

    /// Regular-expression filter.
    pub fn regex<I, S>(name: impl Into<String>, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            regex: true,
            ..Self::new(name, patterns)
        }
    }

    fn matcher(&self) -> Result<Matcher<'_>> {
        if !self.regex {
            return Ok(Matcher::Exact(&self.values));
        }
        self.values
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| {
                    ProviderError::validation(
                        format!("filter.{}", self.name),
                        format!("invalid regular expression '{}': {}", pattern, e),
                    )
                })
            })
            .collect::<Result<Vec<_>>>()
            .map(Matcher::Regex)
    }
}

enum Matcher<'a> {
    Exact(&'a [String]),
    Regex(Vec<Regex>),
}

impl Matcher<'_> {
    fn matches(&self, value: &Value) -> bool {
        match value {
            Value::Array(items) => items.iter().any(|item| self.matches(item)),
            Value::String(s) => self.matches_str(s),
            Value::Number(n) => self.matches_str(&n.to_string()),
            Value::Bool(b) => self.matches_str(if *b { "true" } else { "false" }),
            Value::Null | Value::Object(_) => false,
        }
    }

    fn matches_str(&self, s: &str) -> bool {
        match self {
            Matcher::Exact(values) => values.iter().any(|v| v == s),
            Matcher::Regex(patterns) => patterns.iter().any(|re| re.is_match(s)),
        }
    }
}

fn lookup<'a>(item: &'a Value, path: &str) -> Option<&'a Value> {
    let object = item.as_object()?;
    if let Some(value) = object.get(path) {
        return Some(value);
    }
    let (head, rest) = path.split_once('.')?;
    lookup(object.get(head)?, rest)
}

/// Keep the items that pass every filter.
pub fn apply_filters(items: Vec<Value>, filters: &[Filter]) -> Result<Vec<Value>> {
    if filters.is_empty() {
        return Ok(items);
    }
    let matchers = filters
        .iter()
        .map(|f| f.matcher().map(|m| (f.name.as_str(), m)))
        .collect::<Result<Vec<_>>>()?;

    Ok(items
        .into_iter()
        .filter(|item| {
            matchers
                .iter()
                .all(|(name, m)| lookup(item, name).is_some_and(|v| m.matches(v)))
        })
        .collect())
}
