#[cfg(test)]
mod tests {
    use crate::dom::{Document, DomError, NodeType, SVG_NAMESPACE};

    #[test]
    fn test_blank_document_shape() {
        let mut doc = Document::new();
        let root = doc.document_id();
        assert_eq!(doc.node_type(root).unwrap(), NodeType::Document);
        let html = doc.document_element_id();
        assert_eq!(doc.node_name(html).unwrap(), "HTML");
        assert_eq!(doc.children(html).unwrap(), vec![doc.head_id(), doc.body_id()]);
        assert_eq!(doc.inner_html(doc.body_id()).unwrap(), "");
    }

    #[test]
    fn test_build_and_serialize_tree() {
        let mut doc = Document::new();
        let div = doc.create_element("DIV");
        doc.set_attribute(div, "class", "card").unwrap();
        let text = doc.create_text_node("a < b & c");
        doc.append_child(div, text).unwrap();
        let body = doc.body_id();
        doc.append_child(body, div).unwrap();

        assert_eq!(doc.node_name(div).unwrap(), "DIV");
        assert_eq!(
            doc.outer_html(div).unwrap(),
            r#"<div class="card">a &lt; b &amp; c</div>"#
        );
        assert_eq!(doc.inner_html(body).unwrap(), r#"<div class="card">a &lt; b &amp; c</div>"#);
        assert!(doc.is_connected(text).unwrap());
    }

    #[test]
    fn test_insert_before_and_remove() {
        let mut doc = Document::new();
        let list = doc.create_element("ul");
        let first = doc.create_element("li");
        let second = doc.create_element("li");
        doc.append_child(list, second).unwrap();
        doc.insert_before(list, first, Some(second)).unwrap();
        assert_eq!(doc.child_nodes(list).unwrap(), vec![first, second]);

        doc.remove_child(list, first).unwrap();
        assert_eq!(doc.child_nodes(list).unwrap(), vec![second]);
        assert_eq!(doc.parent(first).unwrap(), None);
        assert_eq!(doc.remove_child(list, first), Err(DomError::NotFound));

        doc.remove(second).unwrap();
        assert!(doc.child_nodes(list).unwrap().is_empty());
    }

    #[test]
    fn test_moving_a_node_detaches_it_from_old_parent() {
        let mut doc = Document::new();
        let a = doc.create_element("div");
        let b = doc.create_element("div");
        let child = doc.create_element("span");
        doc.append_child(a, child).unwrap();
        doc.append_child(b, child).unwrap();
        assert!(doc.child_nodes(a).unwrap().is_empty());
        assert_eq!(doc.parent(child).unwrap(), Some(b));
    }

    #[test]
    fn test_cannot_insert_ancestor_into_descendant() {
        let mut doc = Document::new();
        let outer = doc.create_element("div");
        let inner = doc.create_element("div");
        doc.append_child(outer, inner).unwrap();
        assert!(matches!(
            doc.append_child(inner, outer),
            Err(DomError::HierarchyRequest(_))
        ));
        let text = doc.create_text_node("x");
        assert!(matches!(
            doc.append_child(text, inner),
            Err(DomError::HierarchyRequest(_))
        ));
    }

    #[test]
    fn test_fragment_children_move_on_insert() {
        let mut doc = Document::new();
        let fragment = doc.create_document_fragment();
        assert_eq!(doc.node_type(fragment).unwrap(), NodeType::DocumentFragment);
        let one = doc.create_element("b");
        let two = doc.create_element("i");
        doc.append_child(fragment, one).unwrap();
        doc.append_child(fragment, two).unwrap();

        let host = doc.create_element("p");
        doc.append_child(host, fragment).unwrap();
        assert_eq!(doc.child_nodes(host).unwrap(), vec![one, two]);
        assert!(doc.child_nodes(fragment).unwrap().is_empty());
    }

    #[test]
    fn test_replace_child() {
        let mut doc = Document::new();
        let parent = doc.create_element("div");
        let old = doc.create_element("span");
        let new = doc.create_element("em");
        doc.append_child(parent, old).unwrap();
        doc.replace_child(parent, new, old).unwrap();
        assert_eq!(doc.child_nodes(parent).unwrap(), vec![new]);
        assert_eq!(doc.parent(old).unwrap(), None);
    }

    #[test]
    fn test_text_content_round_trip() {
        let mut doc = Document::new();
        let div = doc.create_element("div");
        doc.set_inner_html(div, "<b>bold</b> and <i>italic</i>").unwrap();
        assert_eq!(doc.text_content(div).unwrap().as_deref(), Some("bold and italic"));

        doc.set_text_content(div, "plain").unwrap();
        assert_eq!(doc.inner_html(div).unwrap(), "plain");
        doc.set_text_content(div, "").unwrap();
        assert!(doc.child_nodes(div).unwrap().is_empty());
        assert_eq!(doc.text_content(doc.document_id()).unwrap(), None);
    }

    #[test]
    fn test_comment_data_keeps_node_id() {
        let mut doc = Document::new();
        let div = doc.create_element("div");
        let comment = doc.create_comment("before");
        doc.append_child(div, comment).unwrap();
        doc.set_node_value(comment, "after").unwrap();
        assert_eq!(doc.node_value(comment).unwrap().as_deref(), Some("after"));
        assert_eq!(doc.child_nodes(div).unwrap(), vec![comment]);
        assert_eq!(doc.inner_html(div).unwrap(), "<!--after-->");
    }

    #[test]
    fn test_attributes() {
        let mut doc = Document::new();
        let el = doc.create_element("input");
        doc.set_attribute(el, "Type", "text").unwrap();
        doc.set_attribute(el, "value", "a").unwrap();
        doc.set_attribute(el, "value", "b").unwrap();
        assert_eq!(doc.get_attribute(el, "type").unwrap().as_deref(), Some("text"));
        assert_eq!(doc.attribute_names(el).unwrap(), vec!["type", "value"]);
        assert!(doc.has_attribute(el, "value").unwrap());
        doc.remove_attribute(el, "value").unwrap();
        assert!(!doc.has_attribute(el, "value").unwrap());
        assert_eq!(doc.get_attribute(el, "missing").unwrap(), None);
    }

    #[test]
    fn test_svg_elements_keep_case() {
        let mut doc = Document::new();
        let svg = doc.create_element_ns(SVG_NAMESPACE, "svg");
        let path = doc.create_element_ns(SVG_NAMESPACE, "linearGradient");
        doc.append_child(svg, path).unwrap();
        assert_eq!(doc.node_name(path).unwrap(), "linearGradient");
        assert_eq!(doc.namespace_uri(svg).unwrap().as_deref(), Some(SVG_NAMESPACE));
    }

    #[test]
    fn test_queries() {
        let mut doc = Document::new();
        let body = doc.body_id();
        doc.set_inner_html(
            body,
            r#"<section><p class="note big">one</p><p id="two">two</p></section>"#,
        )
        .unwrap();
        let by_id = doc.get_element_by_id("two").unwrap();
        assert_eq!(doc.text_content(by_id).unwrap().as_deref(), Some("two"));
        let by_class = doc.query_selector(body, ".big").unwrap().unwrap();
        assert_eq!(doc.text_content(by_class).unwrap().as_deref(), Some("one"));
        let by_tag = doc.query_selector(body, "SECTION").unwrap().unwrap();
        assert_eq!(doc.node_name(by_tag).unwrap(), "SECTION");
        assert_eq!(doc.query_selector(body, "#nope").unwrap(), None);
        assert_eq!(doc.get_element_by_id("nope"), None);
    }

    #[test]
    fn test_snapshot_is_detached_copy() {
        let mut doc = Document::new();
        let body = doc.body_id();
        let container = doc.create_element("div");
        doc.append_child(body, container).unwrap();
        doc.set_inner_html(container, r#"<article data-kind="card"><h1>Title</h1></article>"#)
            .unwrap();
        let first = doc.first_element_child(container).unwrap().unwrap();
        let snapshot = doc.snapshot(first).unwrap();

        doc.set_text_content(container, "").unwrap();

        assert_eq!(snapshot.tag_name, "ARTICLE");
        assert_eq!(snapshot.get_attribute("data-kind"), Some("card"));
        assert_eq!(snapshot.text_content, "Title");
        assert_eq!(snapshot.children.len(), 1);
        assert_eq!(
            snapshot.outer_html,
            r#"<article data-kind="card"><h1>Title</h1></article>"#
        );
    }

    #[test]
    fn test_snapshot_serializes_with_camel_case_keys() {
        let mut doc = Document::new();
        let body = doc.body_id();
        let container = doc.create_element("div");
        doc.append_child(body, container).unwrap();
        doc.set_inner_html(container, r#"<p id="x" class="note">hi</p>"#).unwrap();
        let first = doc.first_element_child(container).unwrap().unwrap();
        let snapshot = doc.snapshot(first).unwrap();

        let json = serde_json::to_value(&snapshot).unwrap();

        assert_eq!(json["tagName"], "P");
        assert_eq!(json["textContent"], "hi");
        assert_eq!(json["outerHtml"], r#"<p id="x" class="note">hi</p>"#);
        assert_eq!(json["attributes"], serde_json::json!({ "id": "x", "class": "note" }));
        let keys: Vec<&String> = json["attributes"].as_object().unwrap().keys().collect();
        assert_eq!(keys, ["id", "class"]);
        assert_eq!(json["children"], serde_json::json!([]));
    }

    #[test]
    fn test_sweep_releases_only_detached_nodes() {
        let mut doc = Document::new();
        let body = doc.body_id();
        let kept = doc.create_element("div");
        doc.append_child(body, kept).unwrap();
        let dropped = doc.create_element("div");
        let before = doc.tracked_nodes();

        let released = doc.sweep_detached();
        assert_eq!(released, vec![dropped]);
        assert_eq!(doc.tracked_nodes(), before - 1);
        assert!(doc.contains_id(kept));
        assert_eq!(doc.node_type(dropped), Err(DomError::UnknownNode(dropped)));
    }

    #[test]
    fn test_clear_empties_head_and_body() {
        let mut doc = Document::new();
        let body = doc.body_id();
        let div = doc.create_element("div");
        doc.append_child(body, div).unwrap();
        doc.clear();
        assert_eq!(doc.inner_html(body).unwrap(), "");
        assert!(!doc.contains_id(div));
        assert!(doc.contains_id(body));
    }
}
