use serde::{Deserialize, Serialize};

use crate::ast::Predicate;
use crate::clause::Clause;
use crate::error::QueryError;
use crate::schema::FieldResolver;
use crate::translator::PredicateTranslator;

/// The direction of a sort key.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sort {
    Asc,
    Desc,
}

impl Default for Sort {
    fn default() -> Self {
        Self::Asc
    }
}

impl Sort {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// A single sort key of a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    /// The logical property to sort by.
    pub property: String,

    /// The sort direction. (Ascending by default)
    #[serde(default)]
    pub sort: Sort,
}

impl OrderBy {
    pub fn asc(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            sort: Sort::Asc,
        }
    }

    pub fn desc(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            sort: Sort::Desc,
        }
    }
}

/// The non-filter parts of a query stage.
#[derive(Debug, Clone, Default)]
pub struct Directives {
    pub skip: Option<usize>,
    pub take: Option<usize>,

    /// Replaces the current sort keys when set.
    pub order_by: Option<Vec<OrderBy>>,

    /// Appended to the current group keys.
    pub group_by: Vec<String>,
}

/// The accumulated state of a query built up over several stages.
///
/// Filter clauses of later stages are appended and ANDed with the
/// earlier ones, paging directives of later stages override earlier ones.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryAggregator {
    clauses: Vec<Clause>,
    skip: Option<usize>,
    take: Option<usize>,
    order_by: Vec<OrderBy>,
    group_by: Vec<String>,
    select: Option<String>,
}

impl QueryAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges the output of one translated stage into the query.
    pub fn merge(&mut self, clauses: Vec<Clause>, directives: Directives) {
        self.clauses.extend(clauses);

        if directives.skip.is_some() {
            self.skip = directives.skip;
        }

        if directives.take.is_some() {
            self.take = directives.take;
        }

        if let Some(order_by) = directives.order_by {
            self.order_by = order_by;
        }

        self.group_by.extend(directives.group_by);
    }

    /// Translates the predicate and ANDs it with the existing filters.
    pub fn filter<R: FieldResolver + ?Sized>(
        mut self,
        resolver: &R,
        predicate: &Predicate,
    ) -> Result<Self, QueryError> {
        let clauses = PredicateTranslator::new(resolver).translate(predicate)?;
        debug!(predicate = %predicate, clauses = clauses.len(), "merged filter stage");

        self.merge(clauses, Directives::default());
        Ok(self)
    }

    pub fn skip(mut self, n: usize) -> Self {
        self.skip = Some(n);
        self
    }

    pub fn take(mut self, n: usize) -> Self {
        self.take = Some(n);
        self
    }

    /// Replaces the sort keys with the given key.
    pub fn order_by(mut self, key: OrderBy) -> Self {
        self.order_by = vec![key];
        self
    }

    /// Adds a secondary sort key.
    pub fn then_by(mut self, key: OrderBy) -> Self {
        self.order_by.push(key);
        self
    }

    pub fn group_by(mut self, property: impl Into<String>) -> Self {
        self.group_by.push(property.into());
        self
    }

    /// Projects every result onto the value of a single property.
    pub fn select(mut self, property: impl Into<String>) -> Self {
        self.select = Some(property.into());
        self
    }

    #[inline]
    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    #[inline]
    pub fn offset(&self) -> Option<usize> {
        self.skip
    }

    #[inline]
    pub fn limit(&self) -> Option<usize> {
        self.take
    }

    #[inline]
    pub fn sort_keys(&self) -> &[OrderBy] {
        &self.order_by
    }

    #[inline]
    pub fn group_keys(&self) -> &[String] {
        &self.group_by
    }

    #[inline]
    pub fn projection(&self) -> Option<&str> {
        self.select.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;

    use super::*;
    use crate::schema::{FieldDeclaration, FieldType, IndexDeclaration, NamingConvention};

    fn schema() -> IndexDeclaration {
        IndexDeclaration::new("people", NamingConvention::Camel)
            .with_field("Name", FieldDeclaration::new(FieldType::Text))
            .with_field("Age", FieldDeclaration::new(FieldType::Numeric))
    }

    #[test]
    fn test_chained_filters_append() -> Result<()> {
        let schema = schema();
        let first = Predicate::eq("Name", "bob");
        let second = Predicate::gt("Age", 3);

        let chained = QueryAggregator::new()
            .filter(&schema, &first)?
            .filter(&schema, &second)?;

        let translator = PredicateTranslator::new(&schema);
        let mut expected = translator.translate(&first)?;
        expected.extend(translator.translate(&second)?);

        assert_eq!(chained.clauses(), expected.as_slice());
        Ok(())
    }

    #[test]
    fn test_always_true_filter_adds_nothing() -> Result<()> {
        let agg = QueryAggregator::new().filter(&schema(), &Predicate::constant(true))?;
        assert!(agg.clauses().is_empty());
        Ok(())
    }

    #[test]
    fn test_later_directives_override() {
        let mut agg = QueryAggregator::new().skip(5).take(10).order_by(OrderBy::asc("Name"));

        agg.merge(
            vec![],
            Directives {
                take: Some(2),
                order_by: Some(vec![OrderBy::desc("Age")]),
                group_by: vec!["Name".to_string()],
                ..Directives::default()
            },
        );

        assert_eq!(agg.offset(), Some(5));
        assert_eq!(agg.limit(), Some(2));
        assert_eq!(agg.sort_keys(), &[OrderBy::desc("Age")]);

        let agg = agg.group_by("Age").then_by(OrderBy::asc("Name"));
        assert_eq!(agg.group_keys(), &["Name".to_string(), "Age".to_string()]);
        assert_eq!(agg.sort_keys(), &[OrderBy::desc("Age"), OrderBy::asc("Name")]);
    }

    #[test]
    fn test_deserialize_order_by() -> Result<()> {
        let keys: Vec<OrderBy> = serde_json::from_value(serde_json::json!([
            { "property": "Name" },
            { "property": "Age", "sort": "desc" },
        ]))?;

        assert_eq!(keys, vec![OrderBy::asc("Name"), OrderBy::desc("Age")]);
        Ok(())
    }
}
