use std::collections::BTreeMap;
use std::fmt;

use hashbrown::{HashMap, HashSet};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::error::QueryError;
use crate::helpers::Validate;

/// The sub-field suffix holding the untokenized form of a text field.
pub static KEYWORD_SUFFIX: &str = "keyword";

/// The declared semantic type of a field.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Identifier,
    Numeric,
    Boolean,
    Datetime,
    Enum,
}

/// How an enum field is stored in the index.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnumRepr {
    /// Members are stored by their name.
    Text,

    /// Members are stored by their integer value. (Default)
    Integer,
}

impl Default for EnumRepr {
    fn default() -> Self {
        Self::Integer
    }
}

/// The resolved type of a field, this is what the translator dispatches on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Identifier,
    Numeric,
    Boolean,
    Datetime,
    Enum {
        repr: EnumRepr,
        members: BTreeMap<String, i64>,
    },
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Text => "text",
            Self::Identifier => "identifier",
            Self::Numeric => "numeric",
            Self::Boolean => "boolean",
            Self::Datetime => "datetime",
            Self::Enum { .. } => "enum",
        };

        f.write_str(name)
    }
}

/// A single field declaration of an index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDeclaration {
    /// The semantic type of the field.
    #[serde(rename = "type")]
    kind: FieldType,

    /// Whether the field has an untokenized `.keyword` sub-field which
    /// is used for sorting, grouping and exact matches.
    #[serde(default)]
    keyword: bool,

    /// Overrides the indexed field name instead of deriving it
    /// from the naming convention.
    #[serde(default)]
    rename: Option<String>,

    /// The stored representation of enum members.
    #[serde(default)]
    repr: EnumRepr,

    /// The enum members and their integer values.
    #[serde(default)]
    members: BTreeMap<String, i64>,
}

impl FieldDeclaration {
    pub fn new(kind: FieldType) -> Self {
        Self {
            kind,
            keyword: false,
            rename: None,
            repr: EnumRepr::default(),
            members: BTreeMap::new(),
        }
    }

    pub fn enumeration<'a>(
        repr: EnumRepr,
        members: impl IntoIterator<Item = (&'a str, i64)>,
    ) -> Self {
        Self {
            repr,
            members: members
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
            ..Self::new(FieldType::Enum)
        }
    }

    pub fn with_keyword(mut self) -> Self {
        self.keyword = true;
        self
    }

    pub fn renamed(mut self, name: impl Into<String>) -> Self {
        self.rename = Some(name.into());
        self
    }

    #[inline]
    pub fn field_type(&self) -> FieldType {
        self.kind
    }

    #[inline]
    pub fn has_keyword(&self) -> bool {
        self.keyword
    }

    fn kind(&self) -> FieldKind {
        match self.kind {
            FieldType::Text => FieldKind::Text,
            FieldType::Identifier => FieldKind::Identifier,
            FieldType::Numeric => FieldKind::Numeric,
            FieldType::Boolean => FieldKind::Boolean,
            FieldType::Datetime => FieldKind::Datetime,
            FieldType::Enum => FieldKind::Enum {
                repr: self.repr,
                members: self.members.clone(),
            },
        }
    }
}

/// The casing convention used to derive indexed field names.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamingConvention {
    /// `FolderId` -> `folderId` (Default)
    Camel,

    /// `FolderId` -> `folder_id`
    Snake,

    /// Names are used as they are given.
    Verbatim,
}

impl Default for NamingConvention {
    fn default() -> Self {
        Self::Camel
    }
}

impl NamingConvention {
    pub fn apply(&self, property: &str) -> String {
        match self {
            Self::Verbatim => property.to_string(),
            Self::Camel => {
                let mut chars = property.chars();
                match chars.next() {
                    Some(first) => first.to_lowercase().chain(chars).collect(),
                    None => String::new(),
                }
            },
            Self::Snake => {
                let mut out = String::with_capacity(property.len() + 4);
                let mut prev_lower = false;
                for c in property.chars() {
                    if c.is_uppercase() {
                        if prev_lower {
                            out.push('_');
                        }
                        out.extend(c.to_lowercase());
                        prev_lower = false;
                    } else {
                        out.push(c);
                        prev_lower = c.is_lowercase() || c.is_ascii_digit();
                    }
                }
                out
            },
        }
    }
}

/// The secondary form of a field a clause or sort may need.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FieldVariant {
    /// The form the backend can sort and aggregate on.
    Sortable,

    /// The untokenized form used for exact matching.
    Exact,
}

/// A property resolved to its backend field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedField {
    /// The indexed field name.
    pub name: String,

    /// The declared type of the field.
    pub kind: FieldKind,
}

/// Maps logical property names onto the backend's indexed fields.
pub trait FieldResolver {
    /// Resolves the indexed field name and declared type of a property.
    fn resolve(&self, property: &str) -> Result<ResolvedField, QueryError>;

    /// Resolves the name of a secondary form of the property's field.
    ///
    /// Fields without such a form resolve to their plain name.
    fn resolve_variant(
        &self,
        property: &str,
        variant: FieldVariant,
    ) -> Result<String, QueryError>;
}

impl<T: FieldResolver + ?Sized> FieldResolver for &T {
    fn resolve(&self, property: &str) -> Result<ResolvedField, QueryError> {
        (**self).resolve(property)
    }

    fn resolve_variant(
        &self,
        property: &str,
        variant: FieldVariant,
    ) -> Result<String, QueryError> {
        (**self).resolve_variant(property, variant)
    }
}

/// A given index declaration that describes the fields a query can
/// reference and how they are laid out in the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexDeclaration {
    /// The name of the backend index.
    name: String,

    /// The naming convention applied to property names.
    #[serde(default)]
    naming: NamingConvention,

    /// The index's fields keyed by their logical property name.
    fields: HashMap<String, FieldDeclaration>,

    #[serde(skip)]
    resolved: OnceCell<HashMap<String, ResolvedField>>,
}

impl Validate for IndexDeclaration {
    fn validate(&self) -> Result<(), QueryError> {
        if self.name.trim().is_empty() {
            return Err(QueryError::InvalidSchema(
                "the index name must not be empty".to_string(),
            ));
        }

        let mut rejected_fields = vec![];
        for (property, field) in self.fields.iter() {
            let is_enum = field.kind == FieldType::Enum;
            if is_enum && field.members.is_empty() {
                rejected_fields.push(format!("{} (enum without members)", property));
            } else if !is_enum && !field.members.is_empty() {
                rejected_fields.push(format!("{} (members on a non-enum field)", property));
            }

            let has_text_form =
                matches!(field.kind, FieldType::Text | FieldType::Identifier);
            if field.keyword && !has_text_form {
                rejected_fields.push(format!("{} (keyword on a non-text field)", property));
            }
        }

        if !rejected_fields.is_empty() {
            rejected_fields.sort();
            return Err(QueryError::InvalidSchema(format!(
                "{} fields are incorrectly declared: {}",
                rejected_fields.len(),
                rejected_fields.join(", "),
            )));
        }

        let mut seen = HashSet::with_capacity(self.fields.len());
        let mut duplicates = vec![];
        for property in self.fields.keys() {
            let name = self.field_name(property);
            if !seen.insert(name.clone()) {
                duplicates.push(name);
            }
        }

        if !duplicates.is_empty() {
            duplicates.sort();
            return Err(QueryError::InvalidSchema(format!(
                "multiple properties resolve to the same field: {}",
                duplicates.join(", "),
            )));
        }

        Ok(())
    }
}

impl IndexDeclaration {
    pub fn new(name: impl Into<String>, naming: NamingConvention) -> Self {
        Self {
            name: name.into(),
            naming,
            fields: HashMap::new(),
            resolved: OnceCell::new(),
        }
    }

    /// Adds a field declaration, replacing any existing one.
    pub fn with_field(mut self, property: impl Into<String>, field: FieldDeclaration) -> Self {
        self.fields.insert(property.into(), field);
        self.resolved = OnceCell::new();
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    #[inline]
    pub fn fields(&self) -> &HashMap<String, FieldDeclaration> {
        &self.fields
    }

    pub fn has_field(&self, property: &str) -> bool {
        self.fields.contains_key(property)
    }

    fn field_name(&self, property: &str) -> String {
        match self.fields.get(property).and_then(|f| f.rename.as_ref()) {
            Some(rename) => rename.clone(),
            None => self.naming.apply(property),
        }
    }

    fn resolved(&self) -> &HashMap<String, ResolvedField> {
        self.resolved.get_or_init(|| {
            self.fields
                .iter()
                .map(|(property, field)| {
                    let resolved = ResolvedField {
                        name: self.field_name(property),
                        kind: field.kind(),
                    };

                    (property.clone(), resolved)
                })
                .collect()
        })
    }
}

impl FieldResolver for IndexDeclaration {
    fn resolve(&self, property: &str) -> Result<ResolvedField, QueryError> {
        self.resolved()
            .get(property)
            .cloned()
            .ok_or_else(|| QueryError::UnknownProperty(property.to_string()))
    }

    fn resolve_variant(
        &self,
        property: &str,
        variant: FieldVariant,
    ) -> Result<String, QueryError> {
        let field = self
            .fields
            .get(property)
            .ok_or_else(|| QueryError::UnknownProperty(property.to_string()))?;

        let name = self.field_name(property);
        if field.keyword {
            return Ok(format!("{}.{}", name, KEYWORD_SUFFIX));
        }

        match (variant, field.kind) {
            // Analyzed text has no doc values to sort or bucket on.
            (FieldVariant::Sortable, FieldType::Text) => Err(QueryError::unsupported(format!(
                "ordering or grouping by the text property {} without a keyword sub-field",
                property,
            ))),
            _ => Ok(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;

    use super::*;

    fn declaration() -> Result<IndexDeclaration> {
        let dec = serde_json::from_value(serde_json::json!({
            "name": "sample-data",
            "fields": {
                "Name": { "type": "text", "keyword": true },
                "FolderId": { "type": "identifier" },
                "Age": { "type": "numeric" },
                "CreatedAt": { "type": "datetime", "rename": "created" },
                "Status": {
                    "type": "enum",
                    "repr": "text",
                    "members": { "Draft": 0, "Published": 1 }
                },
            },
        }))?;

        Ok(dec)
    }

    #[test]
    fn test_naming_conventions() {
        assert_eq!(NamingConvention::Camel.apply("FolderId"), "folderId");
        assert_eq!(NamingConvention::Snake.apply("FolderId"), "folder_id");
        assert_eq!(NamingConvention::Snake.apply("HTTPStatus2Code"), "httpstatus2_code");
        assert_eq!(NamingConvention::Verbatim.apply("FolderId"), "FolderId");
    }

    #[test]
    fn test_resolve_fields() -> Result<()> {
        let dec = declaration()?;
        dec.validate()?;

        let name = dec.resolve("Name")?;
        assert_eq!(name.name, "name");
        assert_eq!(name.kind, FieldKind::Text);

        assert_eq!(dec.resolve("CreatedAt")?.name, "created");
        assert_eq!(dec.resolve_variant("Name", FieldVariant::Sortable)?, "name.keyword");
        assert_eq!(dec.resolve_variant("Age", FieldVariant::Sortable)?, "age");
        assert_eq!(dec.resolve_variant("Name", FieldVariant::Exact)?, "name.keyword");
        assert_eq!(dec.resolve_variant("FolderId", FieldVariant::Exact)?, "folderId");

        match dec.resolve("Status")?.kind {
            FieldKind::Enum { repr, members } => {
                assert_eq!(repr, EnumRepr::Text);
                assert_eq!(members.get("Published"), Some(&1));
            },
            other => panic!("expected an enum field, got {}", other),
        }

        assert_eq!(
            dec.resolve("Missing"),
            Err(QueryError::UnknownProperty("Missing".into()))
        );

        Ok(())
    }

    #[test]
    fn test_text_without_keyword_variants() -> Result<()> {
        let dec = IndexDeclaration::new("notes", NamingConvention::Camel)
            .with_field("Body", FieldDeclaration::new(FieldType::Text));

        assert_eq!(dec.resolve_variant("Body", FieldVariant::Exact)?, "body");
        assert!(matches!(
            dec.resolve_variant("Body", FieldVariant::Sortable),
            Err(QueryError::Unsupported(_))
        ));

        Ok(())
    }

    #[test]
    fn test_validate_rejects_bad_declarations() -> Result<()> {
        let dec: IndexDeclaration = serde_json::from_value(serde_json::json!({
            "name": "bad",
            "fields": {
                "Status": { "type": "enum" },
                "Age": { "type": "numeric", "keyword": true },
            },
        }))?;
        assert!(dec.validate().is_err());

        let dec = IndexDeclaration::new("clash", NamingConvention::Camel)
            .with_field("Name", FieldDeclaration::new(FieldType::Text))
            .with_field("name", FieldDeclaration::new(FieldType::Text));
        assert!(dec.validate().is_err());

        Ok(())
    }
}
