use common::{DbName, DocId, Etag};
use serde_json::{Map, Value};

/// Equality filter over top-level record fields.
///
/// A record matches when every listed field is present and equal to the
/// given value. An empty filter matches every record of a kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanFilter {
    fields: Map<String, Value>,
}

impl ScanFilter {
    /// Creates an empty filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an equality condition.
    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(field.to_string(), value.into());
        self
    }

    /// Documents stored under a database.
    pub fn documents_in(database: &DbName) -> Self {
        Self::new().eq("database", database.as_str())
    }

    /// Design documents stored under a database.
    pub fn designs_in(database: &DbName) -> Self {
        Self::documents_in(database).eq("isDesign", true)
    }

    /// Pending change records of a database.
    pub fn changes_in(database: &DbName) -> Self {
        Self::new().eq("database", database.as_str())
    }

    /// Output rows of one view of one design.
    pub fn view_outputs(database: &DbName, design_id: &DocId, view: &str) -> Self {
        Self::new()
            .eq("database", database.as_str())
            .eq("designId", design_id.as_str())
            .eq("view", view)
    }

    /// Output rows computed from a given document version.
    pub fn outputs_of_doc_version(database: &DbName, version: &Etag) -> Self {
        Self::new()
            .eq("database", database.as_str())
            .eq("docVersion", version.to_string())
    }

    /// Output rows computed from a given design version.
    pub fn outputs_of_design_version(database: &DbName, version: &Etag) -> Self {
        Self::new()
            .eq("database", database.as_str())
            .eq("designVersion", version.to_string())
    }

    /// Returns true if `record` satisfies every condition.
    pub fn matches(&self, record: &Value) -> bool {
        self.fields
            .iter()
            .all(|(field, expected)| record.get(field) == Some(expected))
    }

    /// Returns true if the filter has no conditions.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the conditions as a JSON object, suitable for containment
    /// queries.
    pub fn as_json(&self) -> Value {
        Value::Object(self.fields.clone())
    }
}
