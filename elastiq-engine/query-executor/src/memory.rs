use std::cmp::Ordering;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use hashbrown::HashMap;
use parking_lot::RwLock;
use search_query::{BoolClause, Clause, MultiMatchKind, RangeBounds, Sort, KEYWORD_SUFFIX};
use serde_json::{Map, Value as JsonValue};

use crate::request::{CompositeAggregation, CountRequest, SearchRequest, SortField, SourceFilter};
use crate::response::{
    Aggregations,
    Bucket,
    CompositeResult,
    Hit,
    Hits,
    SearchResponse,
    TopHits,
};
use crate::transport::Transport;

/// The backend's page size when a request leaves it unset.
const DEFAULT_PAGE_SIZE: usize = 10;

/// The backend's top hits size when a request leaves it unset.
const DEFAULT_TOP_HITS_SIZE: usize = 3;

/// A transport evaluating requests against documents held in memory.
///
/// Only the clause kinds the query compiler produces are understood.
/// Text is analyzed by lowercasing and splitting on anything that
/// is not alphanumeric.
///
/// The transport has no mapping, so `term` and `terms` clauses always
/// compare whole field values. A backend matches those clauses against
/// the analyzed tokens of a text field without a keyword sub-field, such
/// queries can match here and miss on the backend.
#[derive(Default)]
pub struct MemoryTransport {
    indexes: RwLock<HashMap<String, Vec<JsonValue>>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transport holding the given documents in one index.
    pub fn with_documents(
        index: impl Into<String>,
        documents: impl IntoIterator<Item = JsonValue>,
    ) -> Self {
        let transport = Self::new();
        transport.add_documents(index, documents);
        transport
    }

    pub fn add_documents(
        &self,
        index: impl Into<String>,
        documents: impl IntoIterator<Item = JsonValue>,
    ) {
        let mut lock = self.indexes.write();
        lock.entry(index.into())
            .or_insert_with(Vec::new)
            .extend(documents);
    }

    fn matching<F, T>(&self, index: &str, query: &Clause, handle: F) -> Result<T>
    where
        F: FnOnce(Vec<(usize, &JsonValue)>) -> T,
    {
        let lock = self.indexes.read();
        let documents = lock
            .get(index)
            .ok_or_else(|| anyhow!("no such index: {:?}", index))?;

        let matched = documents
            .iter()
            .enumerate()
            .filter(|(_, doc)| matches_clause(doc, query))
            .collect();

        Ok(handle(matched))
    }
}

impl Transport for MemoryTransport {
    fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        self.matching(&request.index, &request.query, |mut matched| {
            sort_documents(&mut matched, &request.sort);

            let aggregations = request
                .aggregation
                .as_ref()
                .map(|agg| composite_aggregation(&matched, agg, request.source.as_ref()));

            let hits = matched
                .iter()
                .skip(request.from.unwrap_or_default())
                .take(request.size)
                .map(|(pos, doc)| to_hit(*pos, doc, request.source.as_ref()))
                .collect();

            SearchResponse {
                hits: Hits { hits },
                aggregations,
            }
        })
    }

    fn count(&self, request: &CountRequest) -> Result<u64> {
        self.matching(&request.index, &request.query, |matched| {
            matched.len() as u64
        })
    }
}

fn to_hit(pos: usize, doc: &JsonValue, source: Option<&SourceFilter>) -> Hit {
    let source = match source {
        Some(filter) => project(doc, &filter.includes),
        None => doc.clone(),
    };

    Hit {
        id: pos.to_string(),
        source,
    }
}

fn project(doc: &JsonValue, includes: &[String]) -> JsonValue {
    let mut projected = Map::new();
    for field in includes {
        let path = strip_keyword(field);
        if let Some(value) = lookup(doc, path) {
            insert_path(&mut projected, path, value.clone());
        }
    }

    JsonValue::Object(projected)
}

fn insert_path(target: &mut Map<String, JsonValue>, path: &str, value: JsonValue) {
    match path.split_once('.') {
        None => {
            target.insert(path.to_string(), value);
        },
        Some((head, rest)) => {
            let entry = target
                .entry(head.to_string())
                .or_insert_with(|| JsonValue::Object(Map::new()));

            if let JsonValue::Object(inner) = entry {
                insert_path(inner, rest, value);
            }
        },
    }
}

fn composite_aggregation(
    matched: &[(usize, &JsonValue)],
    agg: &CompositeAggregation,
    source: Option<&SourceFilter>,
) -> Aggregations {
    let mut buckets: Vec<(Vec<JsonValue>, Vec<(usize, &JsonValue)>)> = vec![];

    'documents: for (pos, doc) in matched {
        let mut key = Vec::with_capacity(agg.sources.len());
        for source in agg.sources.iter() {
            match field_values(doc, &source.field).first() {
                Some(value) => key.push((*value).clone()),
                None => continue 'documents,
            }
        }

        match buckets.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, members)) => members.push((*pos, *doc)),
            None => buckets.push((key, vec![(*pos, *doc)])),
        }
    }

    buckets.sort_by(|(a, _), (b, _)| compare_keys(a, b));

    let page_size = agg.size.unwrap_or(DEFAULT_PAGE_SIZE);
    let hits_size = agg.hits_size.unwrap_or(DEFAULT_TOP_HITS_SIZE);
    let has_more = buckets.len() > page_size;

    let to_key = |values: &[JsonValue]| -> Map<String, JsonValue> {
        agg.sources
            .iter()
            .zip(values)
            .map(|(source, value)| (source.name.clone(), value.clone()))
            .collect()
    };

    let buckets: Vec<Bucket> = buckets
        .into_iter()
        .take(page_size)
        .map(|(key, mut members)| {
            sort_documents(&mut members, &agg.sort);

            Bucket {
                key: to_key(key.as_slice()),
                doc_count: members.len() as u64,
                data_composite: Some(TopHits {
                    hits: Hits {
                        hits: members
                            .iter()
                            .take(hits_size)
                            .map(|(pos, doc)| to_hit(*pos, doc, source))
                            .collect(),
                    },
                }),
            }
        })
        .collect();

    let after_key = if has_more {
        buckets.last().map(|bucket| bucket.key.clone())
    } else {
        None
    };

    Aggregations {
        composite: CompositeResult { after_key, buckets },
    }
}

fn compare_keys(a: &[JsonValue], b: &[JsonValue]) -> Ordering {
    for (a, b) in a.iter().zip(b) {
        match compare_values(a, b) {
            Some(Ordering::Equal) | None => continue,
            Some(ord) => return ord,
        }
    }

    Ordering::Equal
}

fn sort_documents(matched: &mut [(usize, &JsonValue)], sort: &[SortField]) {
    if sort.is_empty() {
        return;
    }

    matched.sort_by(|(_, a), (_, b)| {
        for key in sort {
            let left = field_values(a, &key.field).first().copied();
            let right = field_values(b, &key.field).first().copied();

            // Missing values always sort last.
            let ord = match (left, right) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(left), Some(right)) => {
                    let ord = compare_values(left, right).unwrap_or(Ordering::Equal);
                    match key.sort {
                        Sort::Asc => ord,
                        Sort::Desc => ord.reverse(),
                    }
                },
            };

            if ord != Ordering::Equal {
                return ord;
            }
        }

        Ordering::Equal
    });
}

fn matches_clause(doc: &JsonValue, clause: &Clause) -> bool {
    match clause {
        Clause::MatchAll => true,
        Clause::MatchNone => false,
        Clause::Term { field, value } => field_values(doc, field)
            .iter()
            .any(|v| values_equal(v, value)),
        Clause::Terms { field, values } => field_values(doc, field)
            .iter()
            .any(|v| values.iter().any(|term| values_equal(v, term))),
        Clause::Range { field, bounds } => field_values(doc, field)
            .iter()
            .any(|v| within_bounds(v, bounds)),
        Clause::MatchPhrase { field, query } => {
            let phrase = tokenize(query);
            !phrase.is_empty()
                && field_values(doc, field)
                    .iter()
                    .any(|v| contains_sequence(&tokenize(&as_text(v)), &phrase, false))
        },
        Clause::QueryString { fields, query } => {
            let pattern = parse_wildcard(query);
            fields.iter().any(|field| {
                field_values(doc, field)
                    .iter()
                    .any(|v| matches_wildcard_text(&as_text(v), &pattern))
            })
        },
        Clause::MultiMatch { fields, query, kind, .. } => {
            let tokens = tokenize(query);
            !tokens.is_empty()
                && fields.iter().any(|field| {
                    field_values(doc, field).iter().any(|v| {
                        let text = tokenize(&as_text(v));
                        match kind {
                            MultiMatchKind::PhrasePrefix => contains_sequence(&text, &tokens, true),
                        }
                    })
                })
        },
        Clause::Exists { field } => !field_values(doc, field).is_empty(),
        Clause::Bool(inner) => matches_bool(doc, inner),
    }
}

fn matches_bool(doc: &JsonValue, clause: &BoolClause) -> bool {
    clause.must.iter().all(|c| matches_clause(doc, c))
        && !clause.must_not.iter().any(|c| matches_clause(doc, c))
        && (clause.should.is_empty() || clause.should.iter().any(|c| matches_clause(doc, c)))
}

fn strip_keyword(field: &str) -> &str {
    field
        .strip_suffix(KEYWORD_SUFFIX)
        .and_then(|f| f.strip_suffix('.'))
        .unwrap_or(field)
}

fn lookup<'a>(doc: &'a JsonValue, path: &str) -> Option<&'a JsonValue> {
    let mut current = doc;
    for part in path.split('.') {
        current = current.as_object()?.get(part)?;
    }

    Some(current)
}

/// All non-null values of a field, arrays are flattened.
fn field_values<'a>(doc: &'a JsonValue, field: &str) -> Vec<&'a JsonValue> {
    match lookup(doc, strip_keyword(field)) {
        None | Some(JsonValue::Null) => vec![],
        Some(JsonValue::Array(values)) => values.iter().filter(|v| !v.is_null()).collect(),
        Some(value) => vec![value],
    }
}

fn values_equal(a: &JsonValue, b: &JsonValue) -> bool {
    match (a, b) {
        (JsonValue::Number(a), JsonValue::Number(b)) => a.as_f64() == b.as_f64(),
        _ => a == b,
    }
}

fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn compare_values(a: &JsonValue, b: &JsonValue) -> Option<Ordering> {
    match (a, b) {
        (JsonValue::Number(a), JsonValue::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (JsonValue::String(a), JsonValue::String(b)) => {
            match (parse_datetime(a), parse_datetime(b)) {
                (Some(a), Some(b)) => Some(a.cmp(&b)),
                _ => Some(a.cmp(b)),
            }
        },
        (JsonValue::Bool(a), JsonValue::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn within_bounds(value: &JsonValue, bounds: &RangeBounds) -> bool {
    let check = |bound: &Option<JsonValue>, accept: fn(Ordering) -> bool| match bound {
        None => true,
        Some(bound) => compare_values(value, bound).map_or(false, accept),
    };

    check(&bounds.gt, |o| o == Ordering::Greater)
        && check(&bounds.gte, |o| o != Ordering::Less)
        && check(&bounds.lt, |o| o == Ordering::Less)
        && check(&bounds.lte, |o| o != Ordering::Greater)
}

fn as_text(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Checks if `needle` appears contiguously in `haystack`, optionally
/// treating the last token of the needle as a prefix.
fn contains_sequence(haystack: &[String], needle: &[String], prefix_last: bool) -> bool {
    if needle.is_empty() || needle.len() > haystack.len() {
        return false;
    }

    let last = needle.len() - 1;
    haystack.windows(needle.len()).any(|window| {
        window.iter().zip(needle).enumerate().all(|(i, (have, want))| {
            if prefix_last && i == last {
                have.starts_with(want.as_str())
            } else {
                have == want
            }
        })
    })
}

#[derive(Debug, Clone, PartialEq)]
enum WildcardPart {
    Literal(char),
    Any,
}

fn parse_wildcard(query: &str) -> Vec<WildcardPart> {
    let mut parts = vec![];
    let mut chars = query.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    parts.extend(escaped.to_lowercase().map(WildcardPart::Literal));
                }
            },
            '*' => parts.push(WildcardPart::Any),
            other => parts.extend(other.to_lowercase().map(WildcardPart::Literal)),
        }
    }

    parts
}

/// Matches the pattern against the whole value or any of its tokens.
fn matches_wildcard_text(text: &str, pattern: &[WildcardPart]) -> bool {
    let whole: Vec<char> = text.to_lowercase().chars().collect();
    if matches_wildcard(&whole, pattern) {
        return true;
    }

    tokenize(text).iter().any(|token| {
        let token: Vec<char> = token.chars().collect();
        matches_wildcard(&token, pattern)
    })
}

fn matches_wildcard(text: &[char], pattern: &[WildcardPart]) -> bool {
    match pattern.split_first() {
        None => text.is_empty(),
        Some((WildcardPart::Any, rest)) => {
            (0..=text.len()).any(|skip| matches_wildcard(&text[skip..], rest))
        },
        Some((WildcardPart::Literal(c), rest)) => match text.split_first() {
            Some((first, remaining)) if first == c => matches_wildcard(remaining, rest),
            _ => false,
        },
    }
}
