use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum QueryError {
    #[error("the expression '{0}' is not supported by this query compiler")]
    Unsupported(String),

    #[error("unknown property: {0:?}")]
    UnknownProperty(String),

    #[error("invalid value given for property {property:?}: {reason}")]
    InvalidValue { property: String, reason: String },

    #[error("invalid index declaration: {0}")]
    InvalidSchema(String),

    #[error("invalid executor settings: {0}")]
    InvalidConfig(String),
}

impl QueryError {
    pub(crate) fn unsupported(description: impl ToString) -> Self {
        Self::Unsupported(description.to_string())
    }

    pub(crate) fn invalid_value(property: &str, reason: impl ToString) -> Self {
        Self::InvalidValue {
            property: property.to_string(),
            reason: reason.to_string(),
        }
    }
}
