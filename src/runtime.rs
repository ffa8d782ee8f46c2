//! Widget runtime: the names a compiled view program runs against.
//!
//! The runtime provides the `render` registration, the JSX pragma pair and
//! one factory per declared component. Factories build plain widget nodes;
//! children that are not widget nodes are dropped.

use crate::config::CompilerOptions;
use crate::declarations::ComponentNameSet;
use crate::error::{Result, WidgetError};
use crate::interpreter::Interpreter;
use crate::value::{Exception, PropertyMap, Value};
use std::cell::RefCell;
use std::rc::Rc;

/// The only node type whose single child is stored unwrapped.
const TRANSITION: &str = "Transition";

pub struct WidgetRuntime {
    names: Rc<ComponentNameSet>,
    captured: Rc<RefCell<Option<Value>>>,
    render: Value,
    jsx: Value,
    fragment: Value,
    factories: Vec<(String, Value)>,
}

pub fn create_runtime(names: &ComponentNameSet) -> WidgetRuntime {
    let names = Rc::new(names.clone());
    let captured = Rc::new(RefCell::new(None));

    let render = {
        let captured = Rc::clone(&captured);
        Value::native("render", move |_, _, args| {
            *captured.borrow_mut() = Some(args.first().cloned().unwrap_or_default());
            Ok(Value::Undefined)
        })
    };

    let fragment = {
        let names = Rc::clone(&names);
        Value::native("Fragment", move |interp, _, args| {
            let props = args.first().cloned().unwrap_or_default();
            let children = match interp.get_property(&props, "children")? {
                Value::Undefined => Value::array(Vec::new()),
                other => other,
            };
            Ok(Value::array(collect_children(&names, &[children])))
        })
    };

    let jsx = {
        let names = Rc::clone(&names);
        let fragment = fragment.clone();
        Value::native("jsx", move |interp, _, args| {
            let tag = args.first().cloned().unwrap_or_default();
            let props = args.get(1).cloned().unwrap_or_default();
            let children = args.get(2..).unwrap_or_default();

            if tag.strict_equals(&fragment) {
                let mut fragment_props = PropertyMap::new();
                fragment_props.insert("children".to_string(), Value::array(children.to_vec()));
                return interp.call(
                    &fragment,
                    Value::Undefined,
                    vec![Value::object(fragment_props)],
                );
            }
            let props = if props.truthy() {
                props
            } else {
                Value::object(PropertyMap::new())
            };
            if let Value::Function(_) = tag {
                let mut call_args = vec![props];
                call_args.extend(children.iter().cloned());
                return interp.call(&tag, Value::Undefined, call_args);
            }

            let mut node = PropertyMap::new();
            node.insert("type".to_string(), Value::string(&tag.to_js_string()));
            spread_into(&mut node, &props);
            let widget_children = collect_children(&names, children);
            if !widget_children.is_empty() {
                node.insert("children".to_string(), Value::array(widget_children));
            }
            Ok(Value::object(node))
        })
    };

    let factories = names
        .iter()
        .map(|name| (name.to_string(), component_factory(name, &names)))
        .collect();

    WidgetRuntime {
        names,
        captured,
        render,
        jsx,
        fragment,
        factories,
    }
}

fn component_factory(name: &str, names: &Rc<ComponentNameSet>) -> Value {
    let component = name.to_string();
    let names = Rc::clone(names);
    Value::native(name, move |_, _, args| {
        let props = match args.first() {
            None | Some(Value::Undefined) => Value::object(PropertyMap::new()),
            Some(other) => other.clone(),
        };
        let children = args.get(1..).unwrap_or_default();

        let mut node = PropertyMap::new();
        node.insert("type".to_string(), Value::string(&component));
        spread_into(&mut node, &props);
        let mut widget_children = collect_children(&names, children);
        if !widget_children.is_empty() {
            let value = if component == TRANSITION && widget_children.len() == 1 {
                widget_children.remove(0)
            } else {
                Value::array(widget_children)
            };
            node.insert("children".to_string(), value);
        }
        Ok(Value::object(node))
    })
}

/// Object spread of `props` onto `node`; later keys overwrite earlier ones.
fn spread_into(node: &mut PropertyMap, props: &Value) {
    match props {
        Value::Object(map) => {
            for (key, value) in map.borrow().iter() {
                node.insert(key.clone(), value.clone());
            }
        }
        Value::Array(items) => {
            for (i, value) in items.borrow().iter().enumerate() {
                node.insert(i.to_string(), value.clone());
            }
        }
        Value::String(s) => {
            for (i, unit) in Value::string_units(s).into_iter().enumerate() {
                node.insert(i.to_string(), unit);
            }
        }
        _ => {}
    }
}

/// Flattens nested arrays and keeps only nodes whose `type` is a declared component.
fn collect_children(names: &ComponentNameSet, children: &[Value]) -> Vec<Value> {
    let mut flat = Vec::new();
    flatten_into(children, &mut flat);
    flat.into_iter()
        .filter(|child| is_widget_node(names, child))
        .collect()
}

fn flatten_into(items: &[Value], out: &mut Vec<Value>) {
    for item in items {
        match item {
            Value::Array(inner) => {
                let inner = inner.borrow().clone();
                flatten_into(&inner, out);
            }
            other => out.push(other.clone()),
        }
    }
}

fn is_widget_node(names: &ComponentNameSet, value: &Value) -> bool {
    match value {
        Value::Object(map) => matches!(
            map.borrow().get("type"),
            Some(Value::String(kind)) if names.contains(kind)
        ),
        _ => false,
    }
}

impl WidgetRuntime {
    pub fn component_names(&self) -> &ComponentNameSet {
        &self.names
    }

    /// The names visible to a compiled view program, in binding order.
    /// Pragmas are bound under the configured factory names.
    pub fn bindings(&self, options: &CompilerOptions) -> Vec<(String, Value)> {
        let mut bindings = vec![
            ("render".to_string(), self.render.clone()),
            (options.jsx_factory.clone(), self.jsx.clone()),
            (options.jsx_fragment_factory.clone(), self.fragment.clone()),
        ];
        bindings.extend(self.factories.iter().cloned());
        bindings
    }

    pub fn install(&self, interp: &Interpreter, options: &CompilerOptions) {
        for (name, value) in self.bindings(options) {
            interp.define_global(&name, value);
        }
    }

    pub fn has_render(&self) -> bool {
        self.captured.borrow().is_some()
    }

    /// Calls the captured render callback with `state`.
    pub fn invoke_render(&self, interp: &mut Interpreter, state: Value) -> Result<Value> {
        let render = self
            .captured
            .borrow()
            .clone()
            .ok_or(WidgetError::NoRenderCall)?;
        interp
            .call(&render, Value::Undefined, vec![state])
            .map_err(render_error)
    }
}

impl Drop for WidgetRuntime {
    fn drop(&mut self) {
        // The captured callback closes over the scope that holds `render`.
        self.captured.borrow_mut().take();
    }
}

pub(crate) fn render_error(exception: Exception) -> WidgetError {
    WidgetError::RenderExecution(exception.message())
}
