use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Prefix that marks a document as a design document.
pub const DESIGN_PREFIX: &str = "_design/";

/// Reasons an identifier can be rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    /// No database name was supplied.
    #[error("no database selected")]
    EmptyDatabase,

    /// The database name contains characters that are not allowed.
    #[error("illegal database name '{0}'")]
    IllegalDatabase(String),

    /// The document id is empty or reserved.
    #[error("invalid document id '{0}'")]
    InvalidDocId(String),
}

/// Name of a database (tenant).
///
/// Every document store and view operation takes the database explicitly;
/// there is no "current database" state.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DbName(String);

impl DbName {
    /// Validates and wraps a database name.
    ///
    /// Names must be non-empty, must not contain `/`, and must not start
    /// with `_` (that namespace is used by endpoints such as `_all_docs`).
    pub fn parse(name: impl Into<String>) -> Result<Self, IdError> {
        let name = name.into();
        if name.is_empty() {
            return Err(IdError::EmptyDatabase);
        }
        if name.starts_with('_') || name.contains('/') || name.chars().any(char::is_whitespace) {
            return Err(IdError::IllegalDatabase(name));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DbName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for DbName {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<DbName> for String {
    fn from(name: DbName) -> Self {
        name.0
    }
}

/// Identifier of a document within a database.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocId(String);

impl DocId {
    /// Validates and wraps a document id.
    ///
    /// Ids starting with `_` are reserved, except `_design/<name>`.
    pub fn parse(id: impl Into<String>) -> Result<Self, IdError> {
        let id = id.into();
        if id.is_empty() {
            return Err(IdError::InvalidDocId(id));
        }
        if id.starts_with('_') {
            match id.strip_prefix(DESIGN_PREFIX) {
                Some(name) if !name.is_empty() => {}
                _ => return Err(IdError::InvalidDocId(id)),
            }
        }
        Ok(Self(id))
    }

    /// Generates a fresh random id: a v4 UUID as 32 lowercase hex digits.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Builds the id of the design document called `name`.
    pub fn design(name: &str) -> Result<Self, IdError> {
        Self::parse(format!("{DESIGN_PREFIX}{name}"))
    }

    /// Returns true if this id names a design document.
    pub fn is_design(&self) -> bool {
        self.0.starts_with(DESIGN_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DocId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for DocId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<DocId> for String {
    fn from(id: DocId) -> Self {
        id.0
    }
}

/// Opaque version token of one immutable snapshot of a document.
///
/// A new etag is generated on every write; etags are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Etag(Uuid);

impl Etag {
    /// Generates a fresh version token.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for Etag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of one persisted change record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeId(Uuid);

impl ChangeId {
    /// Creates a new random change id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ChangeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ChangeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_name_rejects_empty_and_reserved() {
        assert_eq!(DbName::parse(""), Err(IdError::EmptyDatabase));
        assert!(matches!(
            DbName::parse("_all"),
            Err(IdError::IllegalDatabase(_))
        ));
        assert!(matches!(
            DbName::parse("a/b"),
            Err(IdError::IllegalDatabase(_))
        ));
        assert_eq!(DbName::parse("mydb").unwrap().as_str(), "mydb");
    }

    #[test]
    fn doc_id_design_detection() {
        let plain = DocId::parse("doc1").unwrap();
        assert!(!plain.is_design());

        let design = DocId::parse("_design/d1").unwrap();
        assert!(design.is_design());
        assert_eq!(DocId::design("d1").unwrap(), design);
    }

    #[test]
    fn doc_id_rejects_reserved_ids() {
        assert!(DocId::parse("").is_err());
        assert!(DocId::parse("_all_docs").is_err());
        assert!(DocId::parse("_design/").is_err());
    }

    #[test]
    fn generated_ids_are_unique_hex() {
        let a = DocId::generate();
        let b = DocId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 32);
        assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn etags_are_unique() {
        assert_ne!(Etag::generate(), Etag::generate());
    }

    #[test]
    fn doc_id_deserialization_validates() {
        let ok: DocId = serde_json::from_str("\"_design/x\"").unwrap();
        assert!(ok.is_design());
        assert!(serde_json::from_str::<DocId>("\"_bogus\"").is_err());
    }

    #[test]
    fn etag_serialization_roundtrip() {
        let etag = Etag::generate();
        let json = serde_json::to_string(&etag).unwrap();
        let back: Etag = serde_json::from_str(&json).unwrap();
        assert_eq!(etag, back);
    }
}
