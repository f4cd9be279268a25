use serde::Deserialize;

use crate::aggregator::{Directives, OrderBy, QueryAggregator};
use crate::ast::Predicate;
use crate::error::QueryError;
use crate::helpers::Validate;
use crate::schema::FieldResolver;

/// The kind of result a query should be materialized into.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResultShape {
    /// Every matching document. (Default)
    Collection,

    /// Exactly one document, more than one match is an error.
    Single {
        #[serde(default)]
        allow_empty: bool,
    },

    /// The first matching document.
    First {
        #[serde(default)]
        allow_empty: bool,
    },

    /// The number of matching documents.
    Count,

    /// The matching documents grouped by the group keys.
    Grouped,
}

impl Default for ResultShape {
    fn default() -> Self {
        Self::Collection
    }
}

/// A complete query given as JSON.
///
/// ```json
/// {
///     "filters": [{ "kind": "comparison", "property": "Age", "op": "gt", "value": 3 }],
///     "order_by": [{ "property": "Name", "sort": "desc" }],
///     "take": 10,
///     "shape": { "kind": "collection" }
/// }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryPayload {
    /// The filter stages, each one is ANDed with the previous ones.
    #[serde(default)]
    pub filters: Vec<Predicate>,

    #[serde(default)]
    pub skip: Option<usize>,

    #[serde(default)]
    pub take: Option<usize>,

    #[serde(default)]
    pub order_by: Vec<OrderBy>,

    #[serde(default)]
    pub group_by: Vec<String>,

    /// A property every result is projected onto.
    #[serde(default)]
    pub select: Option<String>,

    #[serde(default)]
    pub shape: ResultShape,
}

impl Validate for QueryPayload {
    fn validate(&self) -> Result<(), QueryError> {
        if self.shape == ResultShape::Grouped && self.group_by.is_empty() {
            return Err(QueryError::Unsupported(
                "a grouped result requires at least one group_by property".to_string(),
            ));
        }

        if self.shape != ResultShape::Grouped && !self.group_by.is_empty() {
            return Err(QueryError::Unsupported(
                "group_by can only be used with a grouped result".to_string(),
            ));
        }

        if self.shape == ResultShape::Count && self.select.is_some() {
            return Err(QueryError::Unsupported(
                "a counted result cannot be projected".to_string(),
            ));
        }

        Ok(())
    }
}

impl QueryPayload {
    /// Translates every filter stage and folds the payload into
    /// an aggregated query.
    pub fn into_aggregator<R: FieldResolver + ?Sized>(
        self,
        resolver: &R,
    ) -> Result<(QueryAggregator, ResultShape), QueryError> {
        self.validate()?;

        let mut aggregator = QueryAggregator::new();
        for predicate in self.filters.iter() {
            aggregator = aggregator.filter(resolver, predicate)?;
        }

        aggregator.merge(
            vec![],
            Directives {
                skip: self.skip,
                take: self.take,
                order_by: Some(self.order_by),
                group_by: self.group_by,
            },
        );

        if let Some(property) = self.select {
            aggregator = aggregator.select(property);
        }

        Ok((aggregator, self.shape))
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use serde_json::json;

    use super::*;
    use crate::schema::{FieldDeclaration, FieldType, IndexDeclaration, NamingConvention};

    #[test]
    fn test_payload_into_aggregator() -> Result<()> {
        let schema = IndexDeclaration::new("people", NamingConvention::Camel)
            .with_field("Name", FieldDeclaration::new(FieldType::Text))
            .with_field("Age", FieldDeclaration::new(FieldType::Numeric));

        let payload: QueryPayload = serde_json::from_value(json!({
            "filters": [
                { "kind": "comparison", "property": "Age", "op": "gt", "value": 3 },
                { "kind": "string_op", "method": "contains", "property": "Name", "pattern": "bo" },
            ],
            "skip": 1,
            "order_by": [{ "property": "Name", "sort": "desc" }],
            "select": "Name",
            "shape": { "kind": "first", "allow_empty": true },
        }))?;

        let (agg, shape) = payload.into_aggregator(&schema)?;
        assert_eq!(shape, ResultShape::First { allow_empty: true });
        assert_eq!(agg.clauses().len(), 2);
        assert_eq!(agg.offset(), Some(1));
        assert_eq!(agg.limit(), None);
        assert_eq!(agg.sort_keys(), &[OrderBy::desc("Name")]);
        assert_eq!(agg.projection(), Some("Name"));

        Ok(())
    }

    #[test]
    fn test_grouping_requires_keys() -> Result<()> {
        let payload: QueryPayload = serde_json::from_value(json!({ "shape": { "kind": "grouped" } }))?;
        assert!(payload.validate().is_err());

        let payload: QueryPayload = serde_json::from_value(json!({ "group_by": ["Name"] }))?;
        assert!(payload.validate().is_err());

        let payload: QueryPayload = serde_json::from_value(json!({}))?;
        assert_eq!(payload.shape, ResultShape::Collection);
        payload.validate()?;

        Ok(())
    }
}
