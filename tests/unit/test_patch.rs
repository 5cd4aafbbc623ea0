#[cfg(test)]
mod tests {
    use serde_json::json;
    use uml_collab_api::models::DiagramPatch;

    #[test]
    fn test_canonical_object_form() {
        let value = json!({
            "classes": [{"id": "c1", "name": "User"}],
            "relations": [{"id": "r1", "type": "Asociación", "source": "c1", "target": "c2"}]
        });

        let patch = DiagramPatch::from_value(&value).unwrap();

        assert_eq!(patch.classes.len(), 1);
        assert_eq!(patch.relations.len(), 1);
        assert!(!patch.is_empty());
    }

    #[test]
    fn test_missing_arrays_default_to_empty() {
        let patch = DiagramPatch::from_value(&json!({})).unwrap();
        assert!(patch.is_empty());

        let patch = DiagramPatch::from_value(&json!({"classes": []})).unwrap();
        assert!(patch.relations.is_empty());
    }

    #[test]
    fn test_legacy_operation_array_form() {
        let value = json!([
            {"type": "add_class", "data": {"id": "c1", "name": "User", "x": 100, "y": 100}},
            {"type": "modify_class", "data": {"id": "c2", "name": "Order"}},
            {"type": "add_relation", "data": {"id": "r1", "type": "Asociación", "source": "c1", "target": "c2"}},
            {"type": "modify_relation", "data": {"id": "r2", "multiplicidadOrigen": "1"}}
        ]);

        let patch = DiagramPatch::from_value(&value).unwrap();

        assert_eq!(patch.classes.len(), 2);
        assert_eq!(patch.relations.len(), 2);
        assert_eq!(patch.classes[0].id, "c1");
        assert_eq!(patch.relations[1].multiplicidad_origen.as_deref(), Some("1"));
    }

    #[test]
    fn test_legacy_unknown_operations_are_skipped() {
        let value = json!([
            {"type": "delete_class", "data": {"id": "c1"}},
            {"type": "add_class", "data": {"id": "c2", "name": "Order"}},
            {"type": "add_class"}
        ]);

        let patch = DiagramPatch::from_value(&value).unwrap();

        assert_eq!(patch.classes.len(), 1);
        assert_eq!(patch.classes[0].id, "c2");
    }

    #[test]
    fn test_non_object_patch_is_a_caller_error() {
        assert!(DiagramPatch::from_value(&json!("not a patch")).is_err());
        assert!(DiagramPatch::from_value(&json!(42)).is_err());
        assert!(DiagramPatch::from_value(&json!(null)).is_err());
    }

    #[test]
    fn test_partial_entries_keep_omitted_fields_unset() {
        let value = json!({
            "classes": [{"id": "c1", "name": "User"}]
        });

        let patch = DiagramPatch::from_value(&value).unwrap();

        assert!(patch.classes[0].attributes.is_none());
        assert!(patch.classes[0].x.is_none());
    }
}
