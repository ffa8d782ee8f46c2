//! # Widget Native
//!
//! Compiles widget view source into a structural widget tree and renders the
//! same source to HTML inside a sandboxed preview engine.
//!
//! ## Pipeline
//!
//! 1. **Declarations**: the manifest (`declare const Name: Widgets.Type;`) fixes the
//!    closed set of component names. It is never inferred from view source.
//! 2. **Compiler**: the view is wrapped in a `render((state) => { with (state) ... })`
//!    harness, lowered to IR and evaluated against a runtime that exposes only
//!    `render`, the JSX pragma pair and one factory per component name.
//! 3. **Renderer**: a cached sandbox (emulated document, timers, capabilities and a
//!    loaded engine bundle) mounts the view into a throwaway container, waits for
//!    the engine to commit, captures markup and tears the mount down.
//!
//! ## Invariants
//!
//! - `children` is omitted when no widget child survives filtering; only
//!   `Transition` stores a single child unwrapped.
//! - Compiling identical input twice yields equal trees.
//! - A render never leaves its container attached to the document.

#[cfg(feature = "napi")]
use napi_derive::napi;

mod builtins;
pub mod bundle;
pub mod compiler;
pub mod config;
pub mod crypto;
pub mod declarations;
pub mod dom;
pub mod engine;
pub mod environment;
pub mod error;
pub mod interpreter;
pub mod ir;
#[cfg(feature = "oxc")]
mod jsx_lowerer;
pub mod logging;
pub mod renderer;
pub mod runtime;
#[cfg(feature = "quickjs")]
pub mod script;
pub mod timers;
pub mod transpile;
pub mod value;

#[cfg(test)]
mod bundle_tests;
#[cfg(test)]
mod compiler_tests;
#[cfg(test)]
mod declarations_tests;
#[cfg(test)]
mod dom_tests;
#[cfg(test)]
mod interpreter_tests;
#[cfg(test)]
mod renderer_tests;
#[cfg(test)]
mod timers_tests;

pub use compiler::{compile_widget, CompiledWidget};
pub use config::{BundleConfig, CompileOptions, CompilerOptions, RenderOptions};
pub use declarations::{extract_component_names, ComponentNameSet};
pub use dom::ElementSnapshot;
pub use engine::{EngineLoader, PreviewEngine};
pub use environment::{BrowserEnvironment, Capability};
pub use error::{Result, WidgetError};
pub use logging::{init_logging, LoggingConfig};
pub use renderer::{
    preview_sandbox, render_widget_to_dom, render_widget_to_html, render_widget_to_html_blocking,
    reset_sandbox, PreviewService, RenderedWidget,
};
pub use runtime::{create_runtime, WidgetRuntime};
pub use transpile::Transpiler;

// ═══════════════════════════════════════════════════════════════════════════════
// NODE BINDINGS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(feature = "napi")]
#[derive(Debug, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct NativeCompileOptions {
    compiler_options: Option<serde_json::Value>,
    declarations: Option<String>,
}

#[cfg(feature = "napi")]
fn to_napi_error(error: WidgetError) -> napi::Error {
    napi::Error::from_reason(format!("{}: {}", error.kind(), error))
}

/// Returns the compiled widget as a JSON string.
#[cfg(feature = "napi")]
#[napi]
pub fn compile_widget_native(
    view_source: String,
    state_json: Option<String>,
    options_json: Option<String>,
) -> napi::Result<String> {
    let state = match state_json.as_deref() {
        Some(json) if !json.trim().is_empty() => serde_json::from_str(json)
            .map_err(|e| to_napi_error(WidgetError::InvalidInput(e.to_string())))?,
        _ => serde_json::Value::Object(Default::default()),
    };
    let native: NativeCompileOptions = match options_json.as_deref() {
        Some(json) if !json.trim().is_empty() => serde_json::from_str(json)
            .map_err(|e| to_napi_error(WidgetError::InvalidInput(e.to_string())))?,
        _ => NativeCompileOptions::default(),
    };

    let mut options = CompileOptions::default();
    if let Some(overrides) = &native.compiler_options {
        options.compiler_options = options
            .compiler_options
            .merged(overrides)
            .map_err(to_napi_error)?;
    }
    options.declarations = native.declarations;

    let compiled = compile_widget(&view_source, &state, &options).map_err(to_napi_error)?;
    serde_json::to_string(&compiled).map_err(|e| napi::Error::from_reason(e.to_string()))
}

/// Renders the view through the cached preview sandbox and returns its markup.
/// The sandbox is bound to the calling thread, so this runs synchronously.
#[cfg(feature = "napi")]
#[napi]
pub fn render_widget_to_html_native(
    view_source: String,
    state_json: Option<String>,
    options_json: Option<String>,
) -> napi::Result<String> {
    let state = parse_native_json(state_json.as_deref())?
        .unwrap_or_else(|| serde_json::Value::Object(Default::default()));
    let options = match parse_native_json(options_json.as_deref())? {
        Some(value) => RenderOptions::from_json(&value).map_err(to_napi_error)?,
        None => RenderOptions::default(),
    };
    render_widget_to_html_blocking(&view_source, &state, &options).map_err(to_napi_error)
}

#[cfg(feature = "napi")]
#[napi]
pub fn reset_sandbox_native() {
    reset_sandbox();
}

#[cfg(feature = "napi")]
fn parse_native_json(json: Option<&str>) -> napi::Result<Option<serde_json::Value>> {
    match json {
        Some(json) if !json.trim().is_empty() => serde_json::from_str(json)
            .map(Some)
            .map_err(|e| to_napi_error(WidgetError::InvalidInput(e.to_string()))),
        _ => Ok(None),
    }
}

#[cfg(feature = "napi")]
#[napi]
pub fn extract_component_names_native(manifest: String) -> Vec<String> {
    extract_component_names(&manifest).to_vec()
}
