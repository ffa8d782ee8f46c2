#[cfg(test)]
mod tests {
    use crate::declarations::{default_component_names, extract_component_names};

    #[test]
    fn test_extracts_in_declaration_order() {
        let manifest = r#"
            declare const Card: Widgets.Card;
            declare const Row: Widgets.Row;
            declare   const   Text :Widgets.Text;
        "#;
        let names = extract_component_names(manifest);
        assert_eq!(names.to_vec(), vec!["Card", "Row", "Text"]);
    }

    #[test]
    fn test_duplicates_collapse_to_first_occurrence() {
        let manifest = "declare const Box: Widgets.Box;\n\
                        declare const Text: Widgets.Text;\n\
                        declare const Box: Widgets.Box;";
        let names = extract_component_names(manifest);
        assert_eq!(names.to_vec(), vec!["Box", "Text"]);
    }

    #[test]
    fn test_empty_and_malformed_manifests_yield_empty_set() {
        for manifest in [
            "",
            "   \n\t",
            "declare const : Widgets.Card;",
            "declare let Card: Widgets.Card;",
            "const Card: Widgets.Card;",
            "declare const Card: Card;",
            "{{{ not a manifest",
        ] {
            assert!(extract_component_names(manifest).is_empty(), "{manifest:?}");
        }
    }

    #[test]
    fn test_surrounding_content_is_ignored() {
        let manifest = r#"
            // header comment
            declare namespace Widgets { type Card = unknown; }
            declare const Card: Widgets.Card; declare const Badge: Widgets.Badge;
            export {};
        "#;
        let names = extract_component_names(manifest);
        assert_eq!(names.to_vec(), vec!["Card", "Badge"]);
    }

    #[test]
    fn test_default_manifest_covers_vocabulary() {
        let names = default_component_names();
        for expected in ["Card", "Row", "Col", "Text", "Title", "Caption", "Box", "Transition"] {
            assert!(names.contains(expected), "missing {expected}");
        }
        assert!(!names.contains("Widgets"));
    }
}
