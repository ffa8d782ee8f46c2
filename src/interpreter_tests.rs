#[cfg(all(test, feature = "oxc"))]
mod tests {
    use crate::config::CompilerOptions;
    use crate::interpreter::{Interpreter, Scope};
    use crate::transpile::{OxcTranspiler, Transpiler};
    use crate::value::{Exception, Value};
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Runs `source` and returns whatever it passed to `emit(...)`.
    fn run(source: &str) -> Result<serde_json::Value, Exception> {
        let program = OxcTranspiler
            .transpile(source, &CompilerOptions::default())
            .unwrap();
        let mut interp = Interpreter::new();
        let emitted = Rc::new(RefCell::new(Value::Undefined));
        let sink = Rc::clone(&emitted);
        interp.define_global(
            "emit",
            Value::native("emit", move |_, _, args| {
                *sink.borrow_mut() = args.first().cloned().unwrap_or_default();
                Ok(Value::Undefined)
            }),
        );
        interp.run(&program)?;
        let value = emitted.borrow().clone();
        Ok(value.to_json().unwrap_or(serde_json::Value::Null))
    }

    fn run_err(source: &str) -> String {
        run(source).unwrap_err().message()
    }

    #[test]
    fn test_scope_lookup_and_shadowing() {
        let root = Scope::root();
        root.declare("a", Value::Number(1.0), true);
        let inner = root.child(true);
        inner.declare("a", Value::Number(2.0), true);
        assert!(matches!(inner.lookup("a"), Some(Value::Number(n)) if n == 2.0));
        assert!(matches!(root.lookup("a"), Some(Value::Number(n)) if n == 1.0));
        assert!(inner.lookup("missing").is_none());
    }

    #[test]
    fn test_arithmetic_and_strings() {
        assert_eq!(run("emit(1 + 2 * 3)").unwrap(), json!(7));
        assert_eq!(run("emit('a' + 1 + 2)").unwrap(), json!("a12"));
        assert_eq!(run("emit(`x=${1 + 1}`)").unwrap(), json!("x=2"));
        assert_eq!(run("emit(7 % 3 === 1 && 2 ** 3 === 8)").unwrap(), json!(true));
    }

    #[test]
    fn test_closures_capture_bindings() {
        let source = r#"
            function counter() {
                let n = 0;
                return () => { n += 1; return n; };
            }
            const next = counter();
            next(); next();
            emit(next());
        "#;
        assert_eq!(run(source).unwrap(), json!(3));
    }

    #[test]
    fn test_destructuring_defaults_and_rest() {
        let source = r#"
            const { a, b = 5, ...rest } = { a: 1, c: 3, d: 4 };
            const [first, , third = 9, ...tail] = [10, 20, undefined, 40, 50];
            emit({ a, b, rest, first, third, tail });
        "#;
        assert_eq!(
            run(source).unwrap(),
            json!({ "a": 1, "b": 5, "rest": { "c": 3, "d": 4 }, "first": 10, "third": 9, "tail": [40, 50] })
        );
    }

    #[test]
    fn test_with_resolves_object_fields_first() {
        let source = r#"
            const label = "outer";
            const state = { label: "inner" };
            with (state) { emit(label); }
        "#;
        assert_eq!(run(source).unwrap(), json!("inner"));
    }

    #[test]
    fn test_with_sees_inherited_object_members() {
        let source = r#"
            const state = { a: 1 };
            with (state) { emit([toString(), hasOwnProperty("a"), hasOwnProperty("b")]); }
        "#;
        assert_eq!(run(source).unwrap(), json!(["[object Object]", true, false]));
    }

    #[test]
    fn test_strings_index_by_utf16_code_unit() {
        let source = r#"
            const face = "😀";
            emit({
                lengths: 'é'.length + face.length,
                padded: "é".padStart(3, "-"),
                index: "a😀b".indexOf("b"),
                sliced: "😀ab".slice(2),
                chars: "héllo".split(""),
            });
        "#;
        assert_eq!(
            run(source).unwrap(),
            json!({
                "lengths": 3,
                "padded": "--é",
                "index": 3,
                "sliced": "ab",
                "chars": ["h", "é", "l", "l", "o"],
            })
        );
    }

    #[test]
    fn test_number_to_string_matches_engine_output() {
        let source = r#"
            emit([
                String(123456789012345680000),
                String(2 ** 53 + 2),
                String(1e21),
                String(-1.5e-7),
                String(0.000001),
                String(123.456),
                String(-0),
            ]);
        "#;
        assert_eq!(
            run(source).unwrap(),
            json!([
                "123456789012345680000",
                "9007199254740994",
                "1e+21",
                "-1.5e-7",
                "0.000001",
                "123.456",
                "0",
            ])
        );
    }

    #[test]
    fn test_const_assignment_throws() {
        assert_eq!(
            run_err("const x = 1; x = 2;"),
            "Assignment to constant variable."
        );
    }

    #[test]
    fn test_reference_errors() {
        assert_eq!(run_err("emit(nope)"), "nope is not defined");
        assert_eq!(run("emit(typeof nope)").unwrap(), json!("undefined"));
    }

    #[test]
    fn test_property_access_on_undefined() {
        assert_eq!(
            run_err("const o = {}; emit(o.a.b)"),
            "Cannot read properties of undefined (reading 'b')"
        );
        assert_eq!(run("const o = {}; emit(o.a?.b ?? 'fallback')").unwrap(), json!("fallback"));
    }

    #[test]
    fn test_array_methods() {
        let source = r#"
            const xs = [3, 1, 2];
            emit({
                mapped: xs.map((x) => x * 2),
                filtered: xs.filter((x) => x > 1),
                sum: xs.reduce((acc, x) => acc + x, 0),
                sorted: [...xs].sort((a, b) => a - b),
                joined: xs.join("-"),
                found: xs.find((x) => x === 2),
                flat: [[1], [2, [3]]].flat(),
                original: xs,
            });
        "#;
        assert_eq!(
            run(source).unwrap(),
            json!({
                "mapped": [6, 2, 4],
                "filtered": [3, 2],
                "sum": 6,
                "sorted": [1, 2, 3],
                "joined": "3-1-2",
                "found": 2,
                "flat": [1, 2, [3]],
                "original": [3, 1, 2],
            })
        );
    }

    #[test]
    fn test_string_and_number_methods() {
        let source = r#"
            emit([
                " Hi ".trim().toUpperCase(),
                "a,b,c".split(","),
                "7".padStart(3, "0"),
                (1.005).toFixed(1),
                (255).toString(16),
                "hello".startsWith("he"),
            ]);
        "#;
        assert_eq!(
            run(source).unwrap(),
            json!(["HI", ["a", "b", "c"], "007", "1.0", "ff", true])
        );
    }

    #[test]
    fn test_loops_and_control_flow() {
        let source = r#"
            const out = [];
            for (const n of [1, 2, 3, 4, 5]) {
                if (n === 2) continue;
                if (n === 5) break;
                out.push(n);
            }
            emit(out);
        "#;
        assert_eq!(run(source).unwrap(), json!([1, 3, 4]));
    }

    #[test]
    fn test_try_catch_finally() {
        let source = r#"
            const log = [];
            try {
                throw new TypeError("bad");
            } catch (e) {
                log.push(e.name + ": " + e.message);
            } finally {
                log.push("done");
            }
            emit(log);
        "#;
        assert_eq!(run(source).unwrap(), json!(["TypeError: bad", "done"]));
    }

    #[test]
    fn test_builtins() {
        let source = r#"
            emit({
                max: Math.max(1, 9, 3),
                keys: Object.keys({ x: 1, y: 2 }),
                json: JSON.stringify({ a: [1, "b"] }),
                parsed: JSON.parse('{"k": true}'),
                int: parseInt("42px"),
                isArray: Array.isArray([]),
                nan: isNaN(Number("x")),
            });
        "#;
        assert_eq!(
            run(source).unwrap(),
            json!({
                "max": 9,
                "keys": ["x", "y"],
                "json": "{\"a\":[1,\"b\"]}",
                "parsed": { "k": true },
                "int": 42,
                "isArray": true,
                "nan": true,
            })
        );
    }

    #[test]
    fn test_calling_non_function() {
        assert_eq!(
            run_err("const user = { name: 'x' }; user.name()"),
            "user.name is not a function"
        );
    }
}
