#[macro_use]
extern crate tracing;

mod aggregator;
mod ast;
mod clause;
mod error;
mod helpers;
mod payload;
mod schema;
mod translator;
mod value;

pub use aggregator::{Directives, OrderBy, QueryAggregator, Sort};
pub use ast::{ComparisonOp, LogicalOp, Predicate, StringOpKind};
pub use clause::{BoolClause, Clause, MultiMatchKind, RangeBounds, PHRASE_PREFIX_MAX_EXPANSIONS};
pub use error::QueryError;
pub use helpers::{escape_query_string, Validate};
pub use payload::{QueryPayload, ResultShape};
pub use schema::{
    EnumRepr,
    FieldDeclaration,
    FieldKind,
    FieldResolver,
    FieldType,
    FieldVariant,
    IndexDeclaration,
    NamingConvention,
    ResolvedField,
    KEYWORD_SUFFIX,
};
pub use translator::PredicateTranslator;
pub use value::Value;
