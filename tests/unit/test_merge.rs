#[cfg(test)]
mod tests {
    use serde_json::json;
    use uml_collab_api::models::{DiagramContent, DiagramPatch};
    use uml_collab_api::services::merge_service::merge;

    fn content(value: serde_json::Value) -> DiagramContent {
        serde_json::from_value(value).unwrap()
    }

    fn patch(value: serde_json::Value) -> DiagramPatch {
        DiagramPatch::from_value(&value).unwrap()
    }

    /// The assistant scenario: update `c1` in place, append `c2` and `r1`.
    #[test]
    fn test_assistant_patch_scenario() {
        let base = content(json!({
            "classes": [{"id": "c1", "name": "User", "attributes": ["id (PK)"]}],
            "relations": []
        }));
        let proposal = patch(json!({
            "classes": [
                {"id": "c1", "name": "User", "attributes": ["id (PK)", "email"]},
                {"id": "c2", "name": "Order"}
            ],
            "relations": [
                {
                    "id": "r1",
                    "type": "Asociación",
                    "source": "c1",
                    "target": "c2",
                    "multiplicidadOrigen": "1",
                    "multiplicidadDestino": "1..*"
                }
            ]
        }));

        let merged = merge(&base, &proposal);

        assert_eq!(merged.classes.len(), 2);
        assert_eq!(
            merged.class("c1").unwrap().attributes,
            vec!["id (PK)".to_string(), "email".to_string()]
        );
        assert_eq!(merged.class("c2").unwrap().name, "Order");
        assert_eq!(merged.relations.len(), 1);
        assert_eq!(merged.relation("r1").unwrap().source, "c1");
    }

    #[test]
    fn test_merge_is_idempotent() {
        let base = content(json!({
            "classes": [{"id": "c1", "name": "User"}],
            "relations": []
        }));
        let proposal = patch(json!({
            "classes": [
                {"id": "c1", "name": "Usuario", "x": 50.0},
                {"id": "c2", "name": "Order"}
            ],
            "relations": [
                {"id": "r1", "type": "Composición", "source": "c1", "target": "c2"}
            ]
        }));

        let once = merge(&base, &proposal);
        let twice = merge(&once, &proposal);

        assert_eq!(once, twice);
    }

    #[test]
    fn test_merge_preserves_id_uniqueness() {
        let base = content(json!({
            "classes": [
                {"id": "c1", "name": "User"},
                {"id": "c2", "name": "Order"}
            ]
        }));
        let proposal = patch(json!({
            "classes": [
                {"id": "c1", "name": "Account"},
                {"id": "c2", "name": "Purchase"}
            ]
        }));

        let merged = merge(&base, &proposal);

        let mut ids: Vec<&str> = merged.classes.iter().map(|c| c.id.as_str()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), merged.classes.len());
    }

    #[test]
    fn test_merge_leaves_unrelated_fields_alone() {
        let base = content(json!({
            "classes": [{
                "id": "c1",
                "name": "User",
                "x": 120.0,
                "y": 80.0,
                "attributes": ["id (PK)", "email"],
                "methods": ["login()"]
            }]
        }));
        let proposal = patch(json!({
            "classes": [{"id": "c1", "name": "Account"}]
        }));

        let merged = merge(&base, &proposal);
        let account = merged.class("c1").unwrap();

        assert_eq!(account.name, "Account");
        assert_eq!(account.x, 120.0);
        assert_eq!(account.y, 80.0);
        assert_eq!(account.attributes, vec!["id (PK)", "email"]);
        assert_eq!(account.methods, vec!["login()"]);
    }

    #[test]
    fn test_merge_never_deletes() {
        let base = content(json!({
            "classes": [
                {"id": "c1", "name": "User"},
                {"id": "c2", "name": "Order"}
            ],
            "relations": [
                {"id": "r1", "type": "Asociación", "source": "c1", "target": "c2"}
            ]
        }));

        let merged = merge(&base, &patch(json!({"classes": [], "relations": []})));

        assert_eq!(merged.classes.len(), 2);
        assert_eq!(merged.relations.len(), 1);
    }

    #[test]
    fn test_merge_with_missing_arrays_on_base() {
        let base = content(json!({"titulo": "Sin título"}));
        let proposal = patch(json!({
            "classes": [{"id": "c1", "name": "User"}]
        }));

        let merged = merge(&base, &proposal);

        assert_eq!(merged.classes.len(), 1);
        assert!(merged.relations.is_empty());
        assert_eq!(merged.titulo.as_deref(), Some("Sin título"));
    }

    #[test]
    fn test_relation_type_spelling_survives_round_trip() {
        let base = DiagramContent::default();
        let proposal = patch(json!({
            "relations": [
                {"id": "r1", "type": "Generalización", "source": "a", "target": "b"},
                {"id": "r2", "type": "Muchos a Muchos", "source": "a", "target": "b"}
            ]
        }));

        let merged = merge(&base, &proposal);
        let json = serde_json::to_value(&merged).unwrap();

        assert_eq!(json["relations"][0]["type"], "Generalización");
        assert_eq!(json["relations"][1]["type"], "Muchos a Muchos");
    }
}
