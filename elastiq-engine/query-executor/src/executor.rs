use std::any::type_name;
use std::convert::TryFrom;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use search_query::{
    Clause,
    FieldResolver,
    FieldVariant,
    QueryAggregator,
    QueryError,
    ResultShape,
    Validate,
};

use crate::error::ExecutionError;
use crate::request::{
    CompositeAggregation,
    CompositeSource,
    CountRequest,
    SearchRequest,
    SortField,
    SourceFilter,
    DEFAULT_MAX_RESULT_WINDOW,
    GROUP_SOURCE_PREFIX,
};
use crate::response::{Hit, SearchResponse};
use crate::results::{ExecutionResult, GroupKey, Grouping};
use crate::transcoder::{SerdeTranscoder, Transcoder};
use crate::transport::Transport;

/// The settings of a query executor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// The index every query is run against.
    pub index: String,

    /// The largest result window the backend allows,
    /// requests never ask for more documents than this.
    #[serde(default = "ExecutorConfig::default_max_result_window")]
    pub max_result_window: usize,

    /// The number of buckets fetched for a grouped query.
    ///
    /// Only the first page of buckets is ever returned, when unset
    /// the backend's default page size applies.
    #[serde(default)]
    pub group_bucket_size: Option<usize>,

    /// The number of documents fetched per group.
    #[serde(default)]
    pub group_hits_size: Option<usize>,
}

impl ExecutorConfig {
    pub fn new(index: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            max_result_window: DEFAULT_MAX_RESULT_WINDOW,
            group_bucket_size: None,
            group_hits_size: None,
        }
    }

    fn default_max_result_window() -> usize {
        DEFAULT_MAX_RESULT_WINDOW
    }
}

impl Validate for ExecutorConfig {
    fn validate(&self) -> Result<(), QueryError> {
        if self.index.trim().is_empty() {
            return Err(QueryError::InvalidConfig(
                "the index name must not be empty".to_string(),
            ));
        }

        if self.max_result_window == 0 {
            return Err(QueryError::InvalidConfig(
                "max result window must be at least 1".to_string(),
            ));
        }

        if self.group_bucket_size == Some(0) || self.group_hits_size == Some(0) {
            return Err(QueryError::InvalidConfig(
                "group sizes must be at least 1 when given".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builds backend requests out of aggregated queries, runs them
/// through the transport and reshapes the responses into records.
pub struct QueryExecutor<T, R> {
    config: ExecutorConfig,
    transport: T,
    resolver: R,
}

impl<T: Transport, R: FieldResolver> QueryExecutor<T, R> {
    pub fn new(config: ExecutorConfig, transport: T, resolver: R) -> Self {
        Self {
            config,
            transport,
            resolver,
        }
    }

    #[inline]
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    fn filter(&self, agg: &QueryAggregator) -> Clause {
        if agg.clauses().is_empty() {
            Clause::MatchAll
        } else {
            Clause::must(agg.clauses().to_vec())
        }
    }

    /// Builds the search request for the given query and result shape.
    pub fn build_search(
        &self,
        agg: &QueryAggregator,
        shape: ResultShape,
    ) -> Result<SearchRequest, QueryError> {
        let window = self.config.max_result_window;
        let (from, mut size) = match agg.offset() {
            None => (None, window),
            Some(skip) => (Some(skip), window.saturating_sub(skip)),
        };

        if let Some(take) = agg.limit() {
            size = take;
        }

        match shape {
            ResultShape::Single { .. } => size = size.min(2),
            ResultShape::First { .. } => size = size.min(1),
            _ => {},
        }

        let sort = agg
            .sort_keys()
            .iter()
            .map(|key| -> Result<SortField, QueryError> {
                let field = self
                    .resolver
                    .resolve_variant(&key.property, FieldVariant::Sortable)?;
                Ok(SortField {
                    field,
                    sort: key.sort,
                })
            })
            .collect::<Result<Vec<_>, QueryError>>()?;

        let source = match agg.projection() {
            Some(property) => Some(SourceFilter {
                includes: vec![self.resolver.resolve(property)?.name],
            }),
            None => None,
        };

        let mut request = SearchRequest {
            index: self.config.index.clone(),
            query: self.filter(agg),
            from,
            size,
            sort,
            source,
            aggregation: None,
        };

        if shape == ResultShape::Grouped {
            if agg.group_keys().is_empty() {
                return Err(QueryError::Unsupported(
                    "a grouped result requires at least one group_by property".to_string(),
                ));
            }

            let sources = agg
                .group_keys()
                .iter()
                .map(|property| -> Result<CompositeSource, QueryError> {
                    let field = self
                        .resolver
                        .resolve_variant(property, FieldVariant::Sortable)?;
                    Ok(CompositeSource::new(property, field))
                })
                .collect::<Result<Vec<_>, QueryError>>()?;

            // The groups carry the documents, top-level hits are not needed
            // and the ordering applies to the members of every group.
            request.from = None;
            request.size = 0;
            request.aggregation = Some(CompositeAggregation {
                sources,
                size: self.config.group_bucket_size,
                hits_size: self.config.group_hits_size,
                sort: std::mem::take(&mut request.sort),
            });
        }

        Ok(request)
    }

    /// Builds the count request for the given query, only the
    /// filter is taken into account.
    pub fn build_count(&self, agg: &QueryAggregator) -> CountRequest {
        CountRequest {
            index: self.config.index.clone(),
            query: self.filter(agg),
        }
    }

    /// Executes the query, decoding records through their
    /// `Deserialize` implementation.
    pub fn execute<D: DeserializeOwned>(
        &self,
        agg: &QueryAggregator,
        shape: ResultShape,
    ) -> Result<ExecutionResult<D>, ExecutionError> {
        self.execute_with(agg, shape, &SerdeTranscoder::<D>::default())
    }

    /// Executes the query, decoding records with the given transcoder.
    #[instrument(name = "execute-query", level = "debug", skip_all, fields(index = %self.config.index))]
    pub fn execute_with<D, C: Transcoder<D>>(
        &self,
        agg: &QueryAggregator,
        shape: ResultShape,
        transcoder: &C,
    ) -> Result<ExecutionResult<D>, ExecutionError> {
        let result = match shape {
            ResultShape::Collection => {
                let response = self.search(agg, shape)?;
                ExecutionResult::Collection(self.decode_hits(agg, response.hits.hits, transcoder)?)
            },
            ResultShape::Single { allow_empty } => {
                let response = self.search(agg, shape)?;
                let mut records = self.decode_hits(agg, response.hits.hits, transcoder)?;
                match records.len() {
                    0 if allow_empty => ExecutionResult::Single(None),
                    0 => return Err(ExecutionError::NotFound),
                    1 => ExecutionResult::Single(records.pop()),
                    n => return Err(ExecutionError::MultipleResults(n)),
                }
            },
            ResultShape::First { allow_empty } => {
                let response = self.search(agg, shape)?;
                let record = self
                    .decode_hits(agg, response.hits.hits, transcoder)?
                    .into_iter()
                    .next();

                if record.is_none() && !allow_empty {
                    return Err(ExecutionError::NotFound);
                }
                ExecutionResult::Single(record)
            },
            ResultShape::Count => ExecutionResult::Count(self.count_raw(agg)?),
            ResultShape::Grouped => {
                let response = self.search(agg, shape)?;
                ExecutionResult::Grouped(self.decode_groups(agg, response, transcoder)?)
            },
        };

        Ok(result)
    }

    /// Every record matching the query.
    pub fn collection<D: DeserializeOwned>(
        &self,
        agg: &QueryAggregator,
    ) -> Result<Vec<D>, ExecutionError> {
        let response = self.search(agg, ResultShape::Collection)?;
        self.decode_hits(agg, response.hits.hits, &SerdeTranscoder::<D>::default())
    }

    /// The only record matching the query.
    ///
    /// More than one match is always an error, no match at all is only
    /// an error if `allow_empty` is false.
    pub fn single<D: DeserializeOwned>(
        &self,
        agg: &QueryAggregator,
        allow_empty: bool,
    ) -> Result<Option<D>, ExecutionError> {
        match self.execute(agg, ResultShape::Single { allow_empty })? {
            ExecutionResult::Single(record) => Ok(record),
            _ => Ok(None),
        }
    }

    /// The first record matching the query.
    pub fn first<D: DeserializeOwned>(
        &self,
        agg: &QueryAggregator,
        allow_empty: bool,
    ) -> Result<Option<D>, ExecutionError> {
        match self.execute(agg, ResultShape::First { allow_empty })? {
            ExecutionResult::Single(record) => Ok(record),
            _ => Ok(None),
        }
    }

    /// The number of documents matching the query converted into
    /// the requested numeric type.
    pub fn count<N: TryFrom<u64>>(&self, agg: &QueryAggregator) -> Result<N, ExecutionError> {
        let count = self.count_raw(agg)?;
        N::try_from(count).map_err(|_| ExecutionError::CountOutOfRange {
            count,
            target: type_name::<N>(),
        })
    }

    /// The matching records grouped by the query's group-by properties.
    pub fn grouped<D: DeserializeOwned>(
        &self,
        agg: &QueryAggregator,
    ) -> Result<Vec<Grouping<D>>, ExecutionError> {
        let response = self.search(agg, ResultShape::Grouped)?;
        self.decode_groups(agg, response, &SerdeTranscoder::<D>::default())
    }

    fn search(
        &self,
        agg: &QueryAggregator,
        shape: ResultShape,
    ) -> Result<SearchResponse, ExecutionError> {
        let request = self.build_search(agg, shape)?;
        debug!(request = ?request, "compiled search request");

        self.transport
            .search(&request)
            .map_err(ExecutionError::Transport)
    }

    fn count_raw(&self, agg: &QueryAggregator) -> Result<u64, ExecutionError> {
        let request = self.build_count(agg);
        debug!(request = ?request, "compiled count request");

        self.transport
            .count(&request)
            .map_err(ExecutionError::Transport)
    }

    fn decode_hits<D, C: Transcoder<D>>(
        &self,
        agg: &QueryAggregator,
        hits: Vec<Hit>,
        transcoder: &C,
    ) -> Result<Vec<D>, ExecutionError> {
        let selected = match agg.projection() {
            Some(property) => Some(self.resolver.resolve(property)?.name),
            None => None,
        };

        let mut records = Vec::with_capacity(hits.len());
        for hit in hits {
            let raw = match selected.as_deref() {
                Some(field) => select_value(hit.source, field),
                None => hit.source,
            };

            records.push(transcoder.decode(raw)?);
        }

        Ok(records)
    }

    fn decode_groups<D, C: Transcoder<D>>(
        &self,
        agg: &QueryAggregator,
        response: SearchResponse,
        transcoder: &C,
    ) -> Result<Vec<Grouping<D>>, ExecutionError> {
        let composite = match response.aggregations {
            Some(aggregations) => aggregations.composite,
            None => return Ok(vec![]),
        };

        if let Some(after_key) = composite.after_key.as_ref() {
            warn!(
                after_key = ?after_key,
                returned = composite.buckets.len(),
                "more groups are available than were returned, only the first page is used"
            );
        }

        let mut groups = Vec::with_capacity(composite.buckets.len());
        for mut bucket in composite.buckets {
            let key = agg
                .group_keys()
                .iter()
                .map(|property| {
                    let source = format!("{}{}", GROUP_SOURCE_PREFIX, property);
                    let value = bucket.key.remove(&source).unwrap_or(JsonValue::Null);
                    (property.clone(), value)
                })
                .collect();

            let hits = bucket
                .data_composite
                .map(|top| top.hits.hits)
                .unwrap_or_default();

            groups.push(Grouping {
                key: GroupKey::new(key),
                members: self.decode_hits(agg, hits, transcoder)?,
            });
        }

        Ok(groups)
    }
}

/// Extracts the value of a projected field out of a returned source.
fn select_value(mut source: JsonValue, field: &str) -> JsonValue {
    for part in field.split('.') {
        source = match source {
            JsonValue::Object(mut map) => map.remove(part).unwrap_or(JsonValue::Null),
            _ => return JsonValue::Null,
        };
    }

    source
}
