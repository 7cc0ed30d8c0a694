//! Design documents: named views and their compiled map functions.

use doc_store::Document;
use serde_json::Value;

use crate::script::{MapFunction, ScriptError};

/// One named view of a design document.
#[derive(Debug, Clone)]
pub struct CompiledView {
    pub name: String,
    pub map: MapFunction,
}

/// Compiles every view of a design document.
///
/// The body must carry `views: {name: {map: "<source>"}}`. Views are
/// returned ordered by name.
pub fn compile_design(design: &Document) -> Result<Vec<CompiledView>, ScriptError> {
    let Some(Value::Object(views)) = design.body.get("views") else {
        return Err(ScriptError::MissingViews);
    };

    views
        .iter()
        .map(|(name, view)| {
            let source = view
                .get("map")
                .and_then(Value::as_str)
                .ok_or_else(|| ScriptError::InvalidView {
                    view: name.clone(),
                    reason: "missing map function".to_string(),
                })?;
            let map = MapFunction::compile(source).map_err(|err| ScriptError::InvalidView {
                view: name.clone(),
                reason: err.to_string(),
            })?;
            Ok(CompiledView {
                name: name.clone(),
                map,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc_store::{DbName, DocId, record::into_object};
    use serde_json::json;

    fn design(body: Value) -> Document {
        Document::new(
            DbName::parse("mydb").unwrap(),
            DocId::parse("_design/d1").unwrap(),
            into_object(body).unwrap(),
        )
    }

    #[test]
    fn compiles_views_in_name_order() {
        let doc = design(json!({"views": {
            "b": {"map": "function(doc){ emit(1, 1) }"},
            "a": {"map": "doc => emit(doc._id, null)"}
        }}));
        let views = compile_design(&doc).unwrap();
        let names: Vec<_> = views.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn missing_views_is_an_error() {
        assert_eq!(
            compile_design(&design(json!({"language": "javascript"}))).unwrap_err(),
            ScriptError::MissingViews
        );
        assert_eq!(
            compile_design(&design(json!({"views": []}))).unwrap_err(),
            ScriptError::MissingViews
        );
    }

    #[test]
    fn view_without_map_is_invalid() {
        let err = compile_design(&design(json!({"views": {"v": {"reduce": "_count"}}})))
            .unwrap_err();
        assert!(matches!(err, ScriptError::InvalidView { view, .. } if view == "v"));
    }

    #[test]
    fn syntax_errors_name_the_view() {
        let err = compile_design(&design(json!({"views": {"broken": {"map": "function(doc){"}}})))
            .unwrap_err();
        assert!(matches!(err, ScriptError::InvalidView { view, .. } if view == "broken"));
    }

    #[test]
    fn empty_views_object_has_no_views() {
        assert!(compile_design(&design(json!({"views": {}}))).unwrap().is_empty());
    }
}
