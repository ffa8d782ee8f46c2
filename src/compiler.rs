//! View compiler: view source plus state in, widget tree out.
//!
//! Every call re-transpiles and re-evaluates; nothing is cached between
//! calls, so identical inputs always produce identical trees.

use crate::config::CompileOptions;
use crate::declarations::{default_component_names, extract_component_names};
use crate::error::{Result, WidgetError};
use crate::interpreter::Interpreter;
use crate::runtime::{create_runtime, render_error};
use crate::transpile::{resolve_transpiler, wrap_view_source};
use crate::value::Value;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledWidget {
    pub widget_tree: serde_json::Value,
    pub component_names: Vec<String>,
}

pub fn compile_widget(
    view_source: &str,
    state: &serde_json::Value,
    options: &CompileOptions,
) -> Result<CompiledWidget> {
    if view_source.trim().is_empty() {
        return Err(WidgetError::empty_view_source());
    }

    let transpiler = resolve_transpiler(options.transpiler.clone())?;
    let compiler_options = &options.compiler_options;
    let names = match &options.declarations {
        Some(manifest) => extract_component_names(manifest),
        None => default_component_names(),
    };

    let program = transpiler.transpile(&wrap_view_source(view_source), compiler_options)?;

    let runtime = create_runtime(&names);
    let mut interp = Interpreter::new();
    runtime.install(&interp, compiler_options);
    interp.run(&program).map_err(render_error)?;

    let tree = runtime.invoke_render(&mut interp, Value::from_json(state))?;
    log::trace!("compiled view into {:?}", tree);

    Ok(CompiledWidget {
        widget_tree: tree.to_json().unwrap_or(serde_json::Value::Null),
        component_names: names.to_vec(),
    })
}
