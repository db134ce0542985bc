//! Column references.
//!
//! A report names its columns with flat strings: `title` for a field on the
//! base entity, `users.name` for a field on a directly related entity. The
//! strings are parsed exactly once into [`ColumnRef`] so that nothing past
//! this module ever splits on dots again.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid"));

/// Returns true if `s` is usable as an entity or field name.
pub fn is_identifier(s: &str) -> bool {
    IDENTIFIER.is_match(s)
}

/// Errors raised while parsing a column reference.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ColumnRefError {
    #[error("empty column reference")]
    Empty,

    #[error("malformed column reference '{0}': expected 'field' or 'entity.field'")]
    Malformed(String),

    #[error("invalid identifier '{identifier}' in column reference '{reference}'")]
    InvalidIdentifier { reference: String, identifier: String },
}

/// A reference to a column, either on the base entity or on a related one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ColumnRef {
    /// Field on the report's base entity.
    Base(String),
    /// Field on an entity one foreign key away from the base entity.
    Related { entity: String, field: String },
}

impl ColumnRef {
    /// Parse `field` or `entity.field`.
    pub fn parse(s: &str) -> Result<Self, ColumnRefError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ColumnRefError::Empty);
        }

        let mut parts = s.split('.');
        let first = parts.next().unwrap_or_default();
        let second = parts.next();
        if parts.next().is_some() {
            return Err(ColumnRefError::Malformed(s.to_string()));
        }

        let check = |ident: &str| {
            if ident.is_empty() {
                Err(ColumnRefError::Malformed(s.to_string()))
            } else if !is_identifier(ident) {
                Err(ColumnRefError::InvalidIdentifier {
                    reference: s.to_string(),
                    identifier: ident.to_string(),
                })
            } else {
                Ok(())
            }
        };

        match second {
            None => {
                check(first)?;
                Ok(ColumnRef::Base(first.to_string()))
            }
            Some(field) => {
                check(first)?;
                check(field)?;
                Ok(ColumnRef::Related {
                    entity: first.to_string(),
                    field: field.to_string(),
                })
            }
        }
    }

    pub fn base(field: impl Into<String>) -> Self {
        ColumnRef::Base(field.into())
    }

    pub fn related(entity: impl Into<String>, field: impl Into<String>) -> Self {
        ColumnRef::Related {
            entity: entity.into(),
            field: field.into(),
        }
    }

    /// The bare field name, without any entity prefix.
    pub fn field(&self) -> &str {
        match self {
            ColumnRef::Base(field) => field,
            ColumnRef::Related { field, .. } => field,
        }
    }

    /// The related entity this reference points into, if any.
    pub fn related_entity(&self) -> Option<&str> {
        match self {
            ColumnRef::Base(_) => None,
            ColumnRef::Related { entity, .. } => Some(entity),
        }
    }

    /// The name this column carries in result rows: `title` or `users.name`.
    pub fn qualified_name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnRef::Base(field) => write!(f, "{}", field),
            ColumnRef::Related { entity, field } => write!(f, "{}.{}", entity, field),
        }
    }
}

impl FromStr for ColumnRef {
    type Err = ColumnRefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ColumnRef::parse(s)
    }
}

impl TryFrom<String> for ColumnRef {
    type Error = ColumnRefError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        ColumnRef::parse(&s)
    }
}

impl From<ColumnRef> for String {
    fn from(c: ColumnRef) -> Self {
        c.to_string()
    }
}

/// Parse a list of column strings, failing on the first bad one.
pub fn parse_columns<I, S>(columns: I) -> Result<Vec<ColumnRef>, ColumnRefError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    columns
        .into_iter()
        .map(|c| ColumnRef::parse(c.as_ref()))
        .collect()
}
