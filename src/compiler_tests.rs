#[cfg(test)]
mod tests {
    use crate::compiler::compile_widget;
    use crate::config::{CompileOptions, CompilerOptions};
    use crate::error::{Result, WidgetError};
    use crate::ir::{Expr, FunctionBody, Pattern, Program, PropItem, PropKey, Stmt};
    use crate::transpile::{wrap_view_source, Transpiler};
    use serde_json::json;
    use std::rc::Rc;

    const CALENDAR_VIEW: &str = r#"<Card
  size="md"
  confirm={{ label: "Add to calendar", action: { type: "calendar.add" } }}
  cancel={{ label: "Discard", action: { type: "calendar.discard" } }}
>
  <Row align="start">
    <Col align="start" gap={1} width={80}>
      <Caption value={date.name} size="lg" color="secondary" />
      <Title value={date.number} size="3xl" />
    </Col>

    <Col flex="auto">
      {events.map((item) => (
        <Row
          key={item.id}
          padding={{x:3, y:2}}
          gap={3}
          radius="xl"
          background={item.isNew ? "none" : "surface-secondary"}
          border={
            item.isNew
              ? { size: 1, color: item.color, style: "dashed" }
              : undefined
          }
        >
          <Box width={4} height="40px" radius="full" background={item.color} />
          <Col>
            <Text value={item.title} />
            <Text value={item.time} size="sm" color="tertiary" />
          </Col>
        </Row>
      ))}
    </Col>
  </Row>
</Card>"#;

    fn calendar_state() -> serde_json::Value {
        json!({
            "date": { "name": "Friday", "number": "28" },
            "events": [
                { "id": "lunch", "time": "12:00 - 12:45 PM", "color": "red-400", "isNew": false, "title": "Lunch" },
                { "id": "q1-roadmap-review", "time": "1:00 - 2:00 PM", "color": "blue-400", "isNew": true, "title": "Q1 roadmap review" },
                { "id": "team-standup", "time": "3:30 - 4:00 PM", "color": "red-400", "isNew": false, "title": "Team standup" }
            ]
        })
    }

    fn compile(view: &str, state: serde_json::Value) -> Result<serde_json::Value> {
        compile_widget(view, &state, &CompileOptions::default()).map(|c| c.widget_tree)
    }

    fn render_error(view: &str, state: serde_json::Value) -> String {
        match compile(view, state) {
            Err(WidgetError::RenderExecution(message)) => message,
            other => panic!("expected RenderExecution, got {:?}", other),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // TREE SHAPE
    // ═══════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_title_from_state_field() {
        let tree = compile(r#"<Title value={label} />"#, json!({ "label": "Friday" })).unwrap();
        assert_eq!(tree, json!({ "type": "Title", "value": "Friday" }));
        assert!(tree.get("children").is_none());
    }

    #[test]
    fn test_list_mapping_keeps_source_order() {
        let view = r#"<ListView>{rows.map((row) => <ListViewItem key={row.id}><Text value={row.label} /></ListViewItem>)}</ListView>"#;
        let state = json!({ "rows": [
            { "id": "a", "label": "First" },
            { "id": "b", "label": "Second" },
            { "id": "c", "label": "Third" }
        ]});
        let tree = compile(view, state).unwrap();
        let children = tree["children"].as_array().unwrap();
        assert_eq!(children.len(), 3);
        let keys: Vec<&str> = children.iter().map(|c| c["key"].as_str().unwrap()).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
        assert_eq!(children[1]["children"], json!([{ "type": "Text", "value": "Second" }]));
    }

    #[test]
    fn test_transition_collapses_single_child() {
        let tree = compile(r#"<Transition><Text value="hi" /></Transition>"#, json!({})).unwrap();
        assert_eq!(tree["children"], json!({ "type": "Text", "value": "hi" }));

        let tree = compile(
            r#"<Transition><Text value="a" /><Text value="b" /></Transition>"#,
            json!({}),
        )
        .unwrap();
        assert_eq!(tree["children"].as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn test_single_child_stays_wrapped_for_other_components() {
        let tree = compile(r#"<Card><Text value="only" /></Card>"#, json!({})).unwrap();
        assert_eq!(tree["children"], json!([{ "type": "Text", "value": "only" }]));
    }

    #[test]
    fn test_non_widget_children_are_dropped() {
        let view = r#"<Col>
            plain text
            {42}
            {null}
            {false}
            {"string"}
            <Spacer />
        </Col>"#;
        let tree = compile(view, json!({})).unwrap();
        assert_eq!(tree, json!({ "type": "Col", "children": [{ "type": "Spacer" }] }));
    }

    #[test]
    fn test_children_key_omitted_without_widget_children() {
        let tree = compile(r#"<Row>{"text only"}</Row>"#, json!({})).unwrap();
        assert_eq!(tree, json!({ "type": "Row" }));
    }

    #[test]
    fn test_host_tag_children_are_filtered() {
        let tree = compile(r#"<Card><div><Text value="x" /></div></Card>"#, json!({})).unwrap();
        assert_eq!(tree, json!({ "type": "Card" }));

        let tree = compile(r#"<section id="s"><Text value="x" /></section>"#, json!({})).unwrap();
        assert_eq!(
            tree,
            json!({ "type": "section", "id": "s", "children": [{ "type": "Text", "value": "x" }] })
        );
    }

    #[test]
    fn test_fragment_returns_widget_array() {
        let tree = compile(r#"<><Text value="a" />skip<Divider /></>"#, json!({})).unwrap();
        assert_eq!(tree, json!([{ "type": "Text", "value": "a" }, { "type": "Divider" }]));
    }

    #[test]
    fn test_user_component_is_called_with_props() {
        let view = r#"(() => {
            const Greeting = ({ name }) => <Text value={`Hello, ${name}!`} />;
            return <Card><Greeting name={user} /></Card>;
        })()"#;
        let tree = compile(view, json!({ "user": "Ada" })).unwrap();
        assert_eq!(tree["children"], json!([{ "type": "Text", "value": "Hello, Ada!" }]));
    }

    #[test]
    fn test_calendar_view() {
        let tree = compile(CALENDAR_VIEW, calendar_state()).unwrap();
        assert_eq!(tree["type"], "Card");
        assert_eq!(tree["size"], "md");
        assert_eq!(tree["confirm"]["action"]["type"], "calendar.add");

        let row = &tree["children"][0];
        assert_eq!(row["type"], "Row");
        let header = &row["children"][0];
        assert_eq!(
            header["children"],
            json!([
                { "type": "Caption", "value": "Friday", "size": "lg", "color": "secondary" },
                { "type": "Title", "value": "28", "size": "3xl" }
            ])
        );

        let events = row["children"][1]["children"].as_array().unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0]["background"], "surface-secondary");
        assert!(events[0].get("border").is_none());
        assert_eq!(
            events[1]["border"],
            json!({ "size": 1, "color": "blue-400", "style": "dashed" })
        );
        assert_eq!(events[1]["padding"], json!({ "x": 3, "y": 2 }));
        assert_eq!(events[2]["children"][1]["children"][0]["value"], "Team standup");
    }

    #[test]
    fn test_compilation_is_deterministic() {
        let first = compile(CALENDAR_VIEW, calendar_state()).unwrap();
        let second = compile(CALENDAR_VIEW, calendar_state()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_state_is_not_mutated() {
        let state = json!({ "items": [3, 1, 2] });
        let view = r#"<Text value={items.sort().join(",")} />"#;
        let tree = compile(view, state.clone()).unwrap();
        assert_eq!(tree["value"], "1,2,3");
        assert_eq!(state, json!({ "items": [3, 1, 2] }));
    }

    #[test]
    fn test_component_names_are_returned() {
        let compiled = compile_widget(
            r#"<Badge label="new" />"#,
            &json!({}),
            &CompileOptions::default().with_declarations(
                "declare const Badge: Widgets.Badge;\ndeclare const Icon: Widgets.Icon;",
            ),
        )
        .unwrap();
        assert_eq!(compiled.component_names, vec!["Badge", "Icon"]);
        assert_eq!(compiled.widget_tree, json!({ "type": "Badge", "label": "new" }));
    }

    #[test]
    fn test_undeclared_component_is_a_render_error() {
        let options = CompileOptions::default()
            .with_declarations("declare const Text: Widgets.Text;");
        let err = compile_widget(r#"<Card />"#, &json!({}), &options).unwrap_err();
        assert!(matches!(err, WidgetError::RenderExecution(ref m) if m == "Card is not defined"));
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // VIEW LANGUAGE
    // ═══════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_expressions_inside_props() {
        let view = r#"<Text
            value={`${items.length} items, total ${items.reduce((sum, i) => sum + i.price, 0).toFixed(2)}`}
            size={items.length > 2 ? "lg" : "sm"}
            muted={!items.some((i) => i.price > 100)}
            label={owner?.name ?? "anonymous"}
        />"#;
        let state = json!({
            "items": [{ "price": 1.5 }, { "price": 2 }, { "price": 10.25 }],
            "owner": null
        });
        let tree = compile(view, state).unwrap();
        assert_eq!(tree["value"], "3 items, total 13.75");
        assert_eq!(tree["size"], "lg");
        assert_eq!(tree["muted"], true);
        assert_eq!(tree["label"], "anonymous");
    }

    #[test]
    fn test_spread_props_and_conditionals() {
        let view = r#"<Col>
            {flags.showTitle && <Title {...titleProps} size="sm" />}
            {flags.showBadge ? <Badge label="on" /> : null}
        </Col>"#;
        let state = json!({
            "flags": { "showTitle": true, "showBadge": false },
            "titleProps": { "value": "Hi", "size": "lg" }
        });
        let tree = compile(view, state).unwrap();
        assert_eq!(
            tree["children"],
            json!([{ "type": "Title", "value": "Hi", "size": "sm" }])
        );
    }

    #[test]
    fn test_block_bodies_and_loops() {
        let view = r#"(() => {
            const out = [];
            for (const [label, count] of Object.entries(totals)) {
                if (count === 0) continue;
                out.push(<Text value={label.toUpperCase() + ":" + count} />);
            }
            return <Col>{out}</Col>;
        })()"#;
        let state = json!({ "totals": { "a": 2, "b": 0, "c": 5 } });
        let tree = compile(view, state).unwrap();
        assert_eq!(
            tree["children"],
            json!([
                { "type": "Text", "value": "A:2" },
                { "type": "Text", "value": "C:5" }
            ])
        );
    }

    #[test]
    fn test_try_catch_recovers_inside_view() {
        let view = r#"(() => {
            let label;
            try {
                label = missing.deep.value;
            } catch (e) {
                label = e.message;
            }
            return <Text value={label} />;
        })()"#;
        let tree = compile(view, json!({ "missing": {} })).unwrap();
        assert_eq!(tree["value"], "Cannot read properties of undefined (reading 'value')");
    }

    #[test]
    fn test_entities_and_whitespace_in_attributes() {
        let tree = compile(r#"<Text value="Tom &amp; Jerry" />"#, json!({})).unwrap();
        assert_eq!(tree["value"], "Tom & Jerry");
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_empty_source_is_invalid_input() {
        for source in ["", "   \n\t "] {
            let err = compile_widget(source, &json!({}), &CompileOptions::default()).unwrap_err();
            assert!(matches!(err, WidgetError::InvalidInput(_)));
            assert_eq!(err.to_string(), "viewSource must be a non-empty string.");
        }
    }

    #[test]
    fn test_undeclared_state_field_is_a_render_error() {
        let message = render_error(r#"<Title value={missing} />"#, json!({}));
        assert_eq!(message, "missing is not defined");
    }

    #[test]
    fn test_thrown_error_message_is_forwarded() {
        let message = render_error(
            r#"(() => { throw new Error("boom"); })()"#,
            json!({}),
        );
        assert_eq!(message, "boom");
    }

    #[test]
    fn test_calling_a_non_function_is_a_render_error() {
        let message = render_error(r#"<Text value={user.name()} />"#, json!({ "user": { "name": "x" } }));
        assert_eq!(message, "user.name is not a function");
    }

    #[test]
    fn test_trailing_semicolon_is_accepted() {
        let tree = compile("<Text value=\"a\" />;  \n", json!({})).unwrap();
        assert_eq!(tree, json!({ "type": "Text", "value": "a" }));
        assert_eq!(
            wrap_view_source("<Divider />;;\n"),
            "render((state) => { with (state) { return (\n<Divider />\n) } })"
        );
    }

    #[test]
    fn test_oversized_array_fails_the_render() {
        let message = render_error(
            "(() => { const a = []; a[4294967294] = 1; return <Text value={a.length} />; })()",
            json!({}),
        );
        assert_eq!(
            message,
            "Array length 4294967295 exceeds the supported maximum of 4194304"
        );

        let message = render_error(
            "(() => { const a = []; a.length = 4294967296; return <Text />; })()",
            json!({}),
        );
        assert_eq!(message, "Invalid array length");

        let message = render_error("<Text value={Array(2 ** 40).length} />", json!({}));
        assert_eq!(message, "Invalid array length");
    }

    #[test]
    fn test_oversized_strings_fail_the_render() {
        for view in [
            r#"<Text value={"x".padStart(2 ** 31)} />"#,
            r#"<Text value={"ab".repeat(2 ** 30)} />"#,
        ] {
            assert_eq!(render_error(view, json!({})), "Invalid string length");
        }
    }

    #[test]
    fn test_syntax_error_surfaces_when_executed() {
        let err = compile(r#"<Card"#, json!({})).unwrap_err();
        assert!(matches!(err, WidgetError::RenderExecution(_)));
    }

    struct EmptyTranspiler;

    impl Transpiler for EmptyTranspiler {
        fn transpile(&self, _source: &str, _options: &CompilerOptions) -> Result<Program> {
            Ok(Program::default())
        }
    }

    #[test]
    fn test_missing_render_call() {
        let options = CompileOptions::default().with_transpiler(Rc::new(EmptyTranspiler));
        let err = compile_widget("<Card />", &json!({}), &options).unwrap_err();
        assert!(matches!(err, WidgetError::NoRenderCall));
        assert_eq!(err.to_string(), "No render() call found in view");
    }

    /// Builds `render((state) => Title({ value: state.heading }))` directly.
    struct HandWrittenTranspiler;

    impl Transpiler for HandWrittenTranspiler {
        fn transpile(&self, _source: &str, _options: &CompilerOptions) -> Result<Program> {
            let props = Expr::Object(vec![PropItem::Property {
                key: PropKey::Static("value".to_string()),
                value: Expr::member(Expr::ident("state"), "heading"),
            }]);
            let body = FunctionBody::Expr(Expr::call(Expr::ident("Title"), vec![props]));
            let callback = Expr::arrow(vec![Pattern::Ident("state".to_string())], body);
            Ok(Program {
                body: vec![Stmt::Expr(Expr::call(Expr::ident("render"), vec![callback]))],
            })
        }
    }

    #[test]
    fn test_injected_transpiler_is_used() {
        let options = CompileOptions::default().with_transpiler(Rc::new(HandWrittenTranspiler));
        let compiled = compile_widget("ignored", &json!({ "heading": "Hi" }), &options).unwrap();
        assert_eq!(compiled.widget_tree, json!({ "type": "Title", "value": "Hi" }));
    }

    #[test]
    fn test_custom_pragma_names() {
        let compiler_options = CompilerOptions::default()
            .merged(&json!({ "jsxFactory": "h", "jsxFragmentFactory": "Frag" }))
            .unwrap();
        let options = CompileOptions {
            compiler_options,
            ..CompileOptions::default()
        };
        let tree = compile_widget(r#"<><Divider /></>"#, &json!({}), &options)
            .unwrap()
            .widget_tree;
        assert_eq!(tree, json!([{ "type": "Divider" }]));
    }
}
