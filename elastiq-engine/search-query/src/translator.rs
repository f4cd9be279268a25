use std::mem;

use serde_json::Value as JsonValue;

use crate::ast::{ComparisonOp, LogicalOp, Normalized, Predicate, StringOpKind};
use crate::clause::{Clause, MultiMatchKind, RangeBounds, PHRASE_PREFIX_MAX_EXPANSIONS};
use crate::error::QueryError;
use crate::helpers::escape_query_string;
use crate::schema::{FieldKind, FieldResolver, FieldVariant, ResolvedField};
use crate::value::Value;

/// The mutable state of a single translation pass.
///
/// A fresh state is created for every call to
/// [`PredicateTranslator::translate`] and dropped once the pass is done.
#[derive(Debug, Default)]
struct TranslationState {
    /// Set by a negation that applies to the next produced clause.
    negated: bool,

    /// The clauses of the sub-term currently being built, these are
    /// ANDed together once the sub-term is closed.
    pending: Vec<Clause>,

    /// The groups of the OR chain currently being built.
    should: Vec<Clause>,

    /// The closed top-level groups, ANDed by the executor.
    finalized: Vec<Clause>,
}

impl TranslationState {
    fn push(&mut self, clause: Clause) {
        if mem::take(&mut self.negated) {
            self.pending.push(Clause::must_not(vec![clause]));
        } else {
            self.pending.push(clause);
        }
    }

    /// Takes the pending clauses as a single group.
    ///
    /// A single clause is returned as it is, several are wrapped
    /// in a `must` list.
    fn take_group(&mut self) -> Option<Clause> {
        match self.pending.len() {
            0 => None,
            1 => self.pending.pop(),
            _ => Some(Clause::must(mem::take(&mut self.pending))),
        }
    }

    /// Flushes the pending clauses into one finalized top-level group.
    fn close_sub_term(&mut self) {
        if !self.pending.is_empty() {
            let must = mem::take(&mut self.pending);
            self.finalized.push(Clause::must(must));
        }
    }
}

/// Translates predicate trees into backend query clauses.
///
/// The translator itself holds no state between calls, every call to
/// `translate` runs a separate pass.
pub struct PredicateTranslator<'a, R: ?Sized> {
    resolver: &'a R,
}

impl<'a, R: FieldResolver + ?Sized> PredicateTranslator<'a, R> {
    pub fn new(resolver: &'a R) -> Self {
        Self { resolver }
    }

    /// Translates the predicate into an ordered list of clauses which must
    /// all match.
    ///
    /// A predicate that always holds produces no clauses at all, one that
    /// never holds produces a single `match_none` clause.
    #[instrument(name = "translate-predicate", level = "trace", skip_all)]
    pub fn translate(&self, predicate: &Predicate) -> Result<Vec<Clause>, QueryError> {
        let predicate = match predicate.normalize()? {
            Normalized::Always => return Ok(Vec::new()),
            Normalized::Never => return Ok(vec![Clause::MatchNone]),
            Normalized::Expr(expr) => expr,
        };

        let mut state = TranslationState::default();
        self.visit(&predicate, &mut state)?;
        state.close_sub_term();

        Ok(state.finalized)
    }

    fn visit(&self, node: &Predicate, state: &mut TranslationState) -> Result<(), QueryError> {
        trace!(node = %node, "visiting predicate node");

        match node {
            Predicate::Logical {
                op: LogicalOp::And,
                left,
                right,
            } => {
                self.visit(left, state)?;
                self.visit(right, state)
            },
            Predicate::Logical {
                op: LogicalOp::Or, ..
            } => self.visit_or(node, state),
            Predicate::Not { operand } => self.visit_not(operand, state),
            Predicate::Comparison {
                property,
                op,
                value,
            } => self.visit_comparison(property, *op, value, state),
            Predicate::Property { property } => {
                self.visit_comparison(property, ComparisonOp::Eq, &Value::Bool(true), state)
            },
            Predicate::StringOp {
                op,
                property,
                pattern,
            } => {
                let clause = self.string_clause(*op, property, pattern)?;
                state.push(clause);
                Ok(())
            },
            Predicate::Membership {
                property,
                candidates,
            } => {
                let clause = self.membership_clause(property, candidates)?;
                state.push(clause);
                Ok(())
            },
            Predicate::Constant { .. }
            | Predicate::BoolComparison { .. }
            | Predicate::Call { .. } => Err(QueryError::unsupported(node)),
        }
    }

    /// Builds one `should` clause out of an OR chain.
    ///
    /// The clause lands where the OR node sits: in the pending clauses of
    /// the enclosing sub-term, or as its own group when the OR is the root.
    fn visit_or(&self, node: &Predicate, state: &mut TranslationState) -> Result<(), QueryError> {
        let outer_pending = mem::take(&mut state.pending);
        let outer_should = mem::take(&mut state.should);

        self.collect_disjuncts(node, state)?;

        let disjuncts = mem::replace(&mut state.should, outer_should);
        state.pending = outer_pending;
        if !disjuncts.is_empty() {
            state.push(Clause::should(disjuncts));
        }

        Ok(())
    }

    fn collect_disjuncts(
        &self,
        node: &Predicate,
        state: &mut TranslationState,
    ) -> Result<(), QueryError> {
        if let Predicate::Logical {
            op: LogicalOp::Or,
            left,
            right,
        } = node
        {
            self.collect_disjuncts(left, state)?;
            return self.collect_disjuncts(right, state);
        }

        // Each branch is its own sub-term.
        self.visit(node, state)?;
        if let Some(group) = state.take_group() {
            state.should.push(group);
        }

        Ok(())
    }

    fn visit_not(&self, operand: &Predicate, state: &mut TranslationState) -> Result<(), QueryError> {
        match operand {
            Predicate::Property { property } => {
                self.visit_comparison(property, ComparisonOp::Eq, &Value::Bool(false), state)
            },
            Predicate::Comparison {
                property,
                op: op @ (ComparisonOp::Eq | ComparisonOp::Ne),
                value: Value::Bool(flag),
            } => self.visit_comparison(property, *op, &Value::Bool(!flag), state),
            Predicate::StringOp { .. } | Predicate::Membership { .. } => {
                state.negated = true;
                self.visit(operand, state)
            },
            _ => {
                let outer_pending = mem::take(&mut state.pending);
                self.visit(operand, state)?;
                let inner = state.take_group();
                state.pending = outer_pending;

                if let Some(inner) = inner {
                    state.push(Clause::must_not(vec![inner]));
                }

                Ok(())
            },
        }
    }

    fn visit_comparison(
        &self,
        property: &str,
        op: ComparisonOp,
        value: &Value,
        state: &mut TranslationState,
    ) -> Result<(), QueryError> {
        let field = self.resolver.resolve(property)?;

        let clause = if value.is_null() {
            null_clause(field, op, property)?
        } else {
            comparison_clause(field, op, value, property)?
        };

        state.push(clause);
        Ok(())
    }

    fn string_clause(
        &self,
        op: StringOpKind,
        property: &str,
        pattern: &str,
    ) -> Result<Clause, QueryError> {
        let field = self.resolver.resolve(property)?;
        if !matches!(field.kind, FieldKind::Text | FieldKind::Identifier) {
            return Err(QueryError::unsupported(format!(
                "{}.{}({:?}) on a {} field",
                property,
                op.method_name(),
                pattern,
                field.kind
            )));
        }

        if pattern.trim().is_empty() {
            return Ok(Clause::Exists { field: field.name });
        }

        let clause = match op {
            StringOpKind::Contains => {
                let tokens: Vec<&str> = pattern.split_whitespace().collect();
                if tokens.len() == 1 {
                    Clause::QueryString {
                        fields: vec![field.name],
                        query: format!("*{}*", escape_query_string(tokens[0])),
                    }
                } else {
                    Clause::MultiMatch {
                        fields: vec![field.name],
                        query: tokens.join(" "),
                        kind: MultiMatchKind::PhrasePrefix,
                        max_expansions: Some(PHRASE_PREFIX_MAX_EXPANSIONS),
                    }
                }
            },
            StringOpKind::StartsWith => Clause::QueryString {
                fields: vec![field.name],
                query: format!("{}*", escape_query_string(pattern)),
            },
            StringOpKind::EndsWith => Clause::QueryString {
                fields: vec![field.name],
                query: format!("*{}", escape_query_string(pattern)),
            },
        };

        Ok(clause)
    }

    fn membership_clause(
        &self,
        property: &str,
        candidates: &[Value],
    ) -> Result<Clause, QueryError> {
        let field = self.resolver.resolve(property)?;
        let exact_name = self.resolver.resolve_variant(property, FieldVariant::Exact)?;

        let mut values = Vec::with_capacity(candidates.len());
        let mut accepts_null = false;
        for candidate in candidates {
            if candidate.is_null() {
                accepts_null = true;
                continue;
            }

            let term = candidate.to_term(&field.kind, property)?;
            if !values.contains(&term) {
                values.push(term);
            }
        }

        let terms = Clause::Terms {
            field: exact_name,
            values,
        };

        if !accepts_null {
            return Ok(terms);
        }

        let missing = Clause::must_not(vec![Clause::Exists { field: field.name }]);
        Ok(Clause::should(vec![terms, missing]))
    }
}

fn null_clause(field: ResolvedField, op: ComparisonOp, property: &str) -> Result<Clause, QueryError> {
    let exists = Clause::Exists { field: field.name };

    match op {
        ComparisonOp::Eq => Ok(Clause::must_not(vec![exists])),
        ComparisonOp::Ne => Ok(exists),
        _ => Err(QueryError::unsupported(format!(
            "{} {} null",
            property,
            op.as_str()
        ))),
    }
}

/// Produces the clause for a comparison according to the operator lexicon
/// of the field's declared type.
fn comparison_clause(
    field: ResolvedField,
    op: ComparisonOp,
    value: &Value,
    property: &str,
) -> Result<Clause, QueryError> {
    let term = value.to_term(&field.kind, property)?;
    let unsupported = || {
        QueryError::unsupported(format!(
            "{} {} {} (on a {} field)",
            property,
            op.as_str(),
            value,
            field.kind
        ))
    };

    let clause = match &field.kind {
        FieldKind::Text | FieldKind::Identifier => {
            let phrase = || Clause::MatchPhrase {
                field: field.name.clone(),
                query: term_as_string(&term),
            };

            match op {
                ComparisonOp::Eq => phrase(),
                ComparisonOp::Ne => Clause::must_not(vec![phrase()]),
                _ => return Err(unsupported()),
            }
        },
        FieldKind::Numeric => {
            let exact = || Clause::Term {
                field: field.name.clone(),
                value: term.clone(),
            };

            match op {
                ComparisonOp::Eq => Clause::must(vec![exact()]),
                ComparisonOp::Ne => Clause::must_not(vec![exact()]),
                op => Clause::must(vec![Clause::Range {
                    field: field.name.clone(),
                    bounds: range_bounds(op, term.clone()),
                }]),
            }
        },
        FieldKind::Boolean => {
            let flag = term.as_bool().unwrap_or_default();
            let flag = match op {
                ComparisonOp::Eq => flag,
                ComparisonOp::Ne => !flag,
                _ => return Err(unsupported()),
            };

            Clause::must(vec![Clause::Term {
                field: field.name.clone(),
                value: JsonValue::Bool(flag),
            }])
        },
        FieldKind::Datetime => {
            let exact = || Clause::Range {
                field: field.name.clone(),
                bounds: RangeBounds::exactly(term.clone()),
            };

            match op {
                ComparisonOp::Eq => exact(),
                ComparisonOp::Ne => Clause::must_not(vec![exact()]),
                op => Clause::Range {
                    field: field.name.clone(),
                    bounds: range_bounds(op, term.clone()),
                },
            }
        },
        FieldKind::Enum { .. } => {
            let exact = || Clause::Term {
                field: field.name.clone(),
                value: term.clone(),
            };

            match op {
                ComparisonOp::Eq => exact(),
                ComparisonOp::Ne => Clause::must_not(vec![exact()]),
                _ => return Err(unsupported()),
            }
        },
    };

    Ok(clause)
}

fn range_bounds(op: ComparisonOp, value: JsonValue) -> RangeBounds {
    let mut bounds = RangeBounds::default();
    match op {
        ComparisonOp::Gt => bounds.gt = Some(value),
        ComparisonOp::Ge => bounds.gte = Some(value),
        ComparisonOp::Lt => bounds.lt = Some(value),
        ComparisonOp::Le => bounds.lte = Some(value),
        ComparisonOp::Eq | ComparisonOp::Ne => return RangeBounds::exactly(value),
    }

    bounds
}

fn term_as_string(term: &JsonValue) -> String {
    match term {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use serde_json::json;
    use uuid::Uuid;

    use super::*;
    use crate::schema::{EnumRepr, FieldDeclaration, FieldType, IndexDeclaration, NamingConvention};

    fn sample_schema() -> IndexDeclaration {
        IndexDeclaration::new("sample-data", NamingConvention::Camel)
            .with_field("Name", FieldDeclaration::new(FieldType::Text).with_keyword())
            .with_field("Age", FieldDeclaration::new(FieldType::Numeric))
            .with_field("IsActive", FieldDeclaration::new(FieldType::Boolean))
            .with_field("CreatedAt", FieldDeclaration::new(FieldType::Datetime))
            .with_field("FolderId", FieldDeclaration::new(FieldType::Identifier))
            .with_field("TypeId", FieldDeclaration::new(FieldType::Identifier))
            .with_field(
                "Status",
                FieldDeclaration::enumeration(EnumRepr::Text, vec![("Draft", 0), ("Published", 1)]),
            )
            .with_field(
                "Level",
                FieldDeclaration::enumeration(EnumRepr::Integer, vec![("Low", 1), ("High", 2)]),
            )
    }

    fn translate(predicate: &Predicate) -> Result<Vec<JsonValue>> {
        let schema = sample_schema();
        let clauses = PredicateTranslator::new(&schema).translate(predicate)?;
        Ok(clauses.iter().map(Clause::to_json).collect())
    }

    #[test]
    fn test_root_leaf_is_wrapped_in_a_group() -> Result<()> {
        let clauses = translate(&Predicate::eq("Name", "bob"))?;
        assert_eq!(
            clauses,
            vec![json!({ "bool": { "must": [
                { "match_phrase": { "name": { "query": "bob" } } }
            ] } })]
        );

        Ok(())
    }

    #[test]
    fn test_and_chain_is_one_group() -> Result<()> {
        let predicate = Predicate::contains("Name", "4567").and(Predicate::eq("Age", 23));
        let clauses = translate(&predicate)?;

        assert_eq!(
            clauses,
            vec![json!({ "bool": { "must": [
                { "query_string": { "fields": ["name"], "query": "*4567*" } },
                { "bool": { "must": [ { "term": { "age": { "value": 23 } } } ] } },
            ] } })]
        );

        Ok(())
    }

    #[test]
    fn test_null_equality() -> Result<()> {
        let clauses = translate(&Predicate::is_null("FolderId"))?;
        assert_eq!(
            clauses,
            vec![json!({ "bool": { "must": [
                { "bool": { "must_not": [ { "exists": { "field": "folderId" } } ] } }
            ] } })]
        );

        let clauses = translate(&Predicate::is_not_null("FolderId"))?;
        assert_eq!(
            clauses,
            vec![json!({ "bool": { "must": [ { "exists": { "field": "folderId" } } ] } })]
        );

        assert!(translate(&Predicate::gt("FolderId", Value::Null)).is_err());
        Ok(())
    }

    #[test]
    fn test_or_of_sub_terms_keeps_precedence() -> Result<()> {
        let allowed_types = vec![Uuid::from_u128(1), Uuid::from_u128(2)];
        let allowed_folders = vec![Uuid::from_u128(10), Uuid::from_u128(11)];

        let predicate = Predicate::is_null("FolderId")
            .and(Predicate::is_in("TypeId", allowed_types.clone()))
            .or(Predicate::is_not_null("FolderId")
                .and(Predicate::is_in("FolderId", allowed_folders.clone())));

        let clauses = translate(&predicate)?;
        let ids = |ids: &[Uuid]| ids.iter().map(|id| json!(id.to_string())).collect::<Vec<_>>();

        assert_eq!(
            clauses,
            vec![json!({ "bool": { "must": [
                { "bool": { "should": [
                    { "bool": { "must": [
                        { "bool": { "must_not": [ { "exists": { "field": "folderId" } } ] } },
                        { "terms": { "typeId": ids(&allowed_types) } },
                    ] } },
                    { "bool": { "must": [
                        { "exists": { "field": "folderId" } },
                        { "terms": { "folderId": ids(&allowed_folders) } },
                    ] } },
                ] } }
            ] } })]
        );

        Ok(())
    }

    #[test]
    fn test_or_inside_and_stays_in_place() -> Result<()> {
        let predicate = Predicate::eq("Age", 3)
            .and(Predicate::eq("Name", "a").or(Predicate::eq("Name", "b")))
            .and(Predicate::eq("Name", "c").or(Predicate::eq("Name", "d")));

        let clauses = translate(&predicate)?;
        let phrase = |q: &str| json!({ "match_phrase": { "name": { "query": q } } });

        assert_eq!(
            clauses,
            vec![json!({ "bool": { "must": [
                { "bool": { "must": [ { "term": { "age": { "value": 3 } } } ] } },
                { "bool": { "should": [ phrase("a"), phrase("b") ] } },
                { "bool": { "should": [ phrase("c"), phrase("d") ] } },
            ] } })]
        );

        Ok(())
    }

    #[test]
    fn test_nested_or_flattens() -> Result<()> {
        let predicate = Predicate::eq("Name", "a")
            .or(Predicate::eq("Name", "b"))
            .or(Predicate::eq("Name", "c"));

        let clauses = translate(&predicate)?;
        assert_eq!(clauses.len(), 1);
        assert_eq!(clauses[0]["bool"]["must"][0]["bool"]["should"].as_array().map(Vec::len), Some(3));

        Ok(())
    }

    #[test]
    fn test_numeric_lexicon() -> Result<()> {
        let clauses = translate(&Predicate::ne("Age", 3))?;
        assert_eq!(
            clauses[0]["bool"]["must"][0],
            json!({ "bool": { "must_not": [ { "term": { "age": { "value": 3 } } } ] } })
        );

        let clauses = translate(&Predicate::ge("Age", 2.5))?;
        assert_eq!(
            clauses[0]["bool"]["must"][0],
            json!({ "bool": { "must": [ { "range": { "age": { "gte": 2.5 } } } ] } })
        );

        Ok(())
    }

    #[test]
    fn test_text_rejects_ordering() {
        assert!(matches!(
            translate(&Predicate::gt("Name", "a")).map_err(|e| e.downcast::<QueryError>()),
            Err(Ok(QueryError::Unsupported(_)))
        ));
    }

    #[test]
    fn test_boolean_lexicon() -> Result<()> {
        let term = |flag: bool| {
            json!({ "bool": { "must": [ { "term": { "isActive": { "value": flag } } } ] } })
        };

        assert_eq!(translate(&Predicate::property("IsActive"))?[0]["bool"]["must"][0], term(true));
        assert_eq!(translate(&Predicate::property("IsActive").not())?[0]["bool"]["must"][0], term(false));
        assert_eq!(translate(&Predicate::ne("IsActive", true))?[0]["bool"]["must"][0], term(false));
        assert_eq!(
            translate(&Predicate::eq("IsActive", true).not())?[0]["bool"]["must"][0],
            term(false)
        );

        Ok(())
    }

    #[test]
    fn test_datetime_lexicon() -> Result<()> {
        let at = "2020-01-02T03:04:05Z";

        let clauses = translate(&Predicate::eq("CreatedAt", at))?;
        assert_eq!(
            clauses[0]["bool"]["must"][0],
            json!({ "range": { "createdAt": { "gte": at, "lte": at } } })
        );

        let clauses = translate(&Predicate::lt("CreatedAt", at))?;
        assert_eq!(clauses[0]["bool"]["must"][0], json!({ "range": { "createdAt": { "lt": at } } }));

        let clauses = translate(&Predicate::ne("CreatedAt", at))?;
        assert_eq!(
            clauses[0]["bool"]["must"][0],
            json!({ "bool": { "must_not": [ { "range": { "createdAt": { "gte": at, "lte": at } } } ] } })
        );

        Ok(())
    }

    #[test]
    fn test_enum_lexicon() -> Result<()> {
        let clauses = translate(&Predicate::eq("Status", Value::Enum("Published".into())))?;
        assert_eq!(clauses[0]["bool"]["must"][0], json!({ "term": { "status": { "value": "Published" } } }));

        let clauses = translate(&Predicate::ne("Level", Value::Enum("High".into())))?;
        assert_eq!(
            clauses[0]["bool"]["must"][0],
            json!({ "bool": { "must_not": [ { "term": { "level": { "value": 2 } } } ] } })
        );

        assert!(translate(&Predicate::gt("Level", Value::Enum("High".into()))).is_err());
        Ok(())
    }

    #[test]
    fn test_string_operators() -> Result<()> {
        let clauses = translate(&Predicate::starts_with("Name", "ab"))?;
        assert_eq!(
            clauses[0]["bool"]["must"][0],
            json!({ "query_string": { "fields": ["name"], "query": "ab*" } })
        );

        let clauses = translate(&Predicate::ends_with("Name", "a:b"))?;
        assert_eq!(
            clauses[0]["bool"]["must"][0],
            json!({ "query_string": { "fields": ["name"], "query": "*a\\:b" } })
        );

        let clauses = translate(&Predicate::contains("Name", "hello  wor"))?;
        assert_eq!(
            clauses[0]["bool"]["must"][0],
            json!({ "multi_match": {
                "fields": ["name"],
                "query": "hello wor",
                "type": "phrase_prefix",
                "max_expansions": 200,
            } })
        );

        let clauses = translate(&Predicate::contains("Name", "x").not())?;
        assert_eq!(
            clauses[0]["bool"]["must"][0],
            json!({ "bool": { "must_not": [
                { "query_string": { "fields": ["name"], "query": "*x*" } }
            ] } })
        );

        assert!(translate(&Predicate::contains("Age", "1")).is_err());
        Ok(())
    }

    #[test]
    fn test_membership() -> Result<()> {
        let clauses = translate(&Predicate::is_in("Name", vec!["a", "b", "a"]))?;
        assert_eq!(
            clauses[0]["bool"]["must"][0],
            json!({ "terms": { "name.keyword": ["a", "b"] } })
        );

        let clauses = translate(&Predicate::is_in("Age", Vec::<i64>::new()))?;
        assert_eq!(clauses[0]["bool"]["must"][0], json!({ "terms": { "age": [] } }));

        let clauses = translate(&Predicate::is_in("FolderId", vec![Value::Null, Value::from(Uuid::nil())]))?;
        assert_eq!(
            clauses[0]["bool"]["must"][0],
            json!({ "bool": { "should": [
                { "terms": { "folderId": [Uuid::nil().to_string()] } },
                { "bool": { "must_not": [ { "exists": { "field": "folderId" } } ] } },
            ] } })
        );

        Ok(())
    }

    #[test]
    fn test_not_of_conjunction_negates_the_whole_group() -> Result<()> {
        let predicate = Predicate::eq("Name", "a").and(Predicate::eq("Name", "b")).not();
        let clauses = translate(&predicate)?;
        let phrase = |q: &str| json!({ "match_phrase": { "name": { "query": q } } });

        assert_eq!(
            clauses[0]["bool"]["must"][0],
            json!({ "bool": { "must_not": [
                { "bool": { "must": [ phrase("a"), phrase("b") ] } }
            ] } })
        );

        Ok(())
    }

    #[test]
    fn test_constants() -> Result<()> {
        assert!(translate(&Predicate::constant(true))?.is_empty());
        assert_eq!(translate(&Predicate::constant(false))?, vec![json!({ "match_none": {} })]);

        let predicate = Predicate::is_null("FolderId")
            .and(Predicate::constant(false).or(Predicate::is_in("TypeId", vec![Uuid::nil()])));
        let expected = Predicate::is_null("FolderId").and(Predicate::is_in("TypeId", vec![Uuid::nil()]));
        assert_eq!(translate(&predicate)?, translate(&expected)?);

        Ok(())
    }

    #[test]
    fn test_redundant_boolean_wrapping_is_invariant() -> Result<()> {
        let inner = Predicate::is_null("FolderId").and(Predicate::is_in("TypeId", vec![Uuid::nil()]));
        assert_eq!(translate(&inner.clone().equals(true))?, translate(&inner)?);

        let either = inner.clone().equals(true).or(Predicate::eq("Age", 3).equals(true));
        let plain = inner.or(Predicate::eq("Age", 3));
        assert_eq!(translate(&either)?, translate(&plain)?);

        Ok(())
    }

    #[test]
    fn test_translation_is_idempotent() -> Result<()> {
        let schema = sample_schema();
        let translator = PredicateTranslator::new(&schema);
        let predicate = Predicate::contains("Name", "abc")
            .or(Predicate::lt("Age", 4).and(Predicate::property("IsActive").not()));

        assert_eq!(translator.translate(&predicate)?, translator.translate(&predicate)?);
        Ok(())
    }

    #[test]
    fn test_unknown_property_fails() {
        let schema = sample_schema();
        let res = PredicateTranslator::new(&schema).translate(&Predicate::eq("Nope", 1));
        assert_eq!(res, Err(QueryError::UnknownProperty("Nope".into())));
    }
}
