//! View harness and transpiler resolution.

use crate::config::CompilerOptions;
use crate::error::Result;
use crate::ir::{Expr, Program, Stmt};
use std::rc::Rc;

/// Converts harness source (JSX-like script) into an executable [`Program`].
///
/// Implementations must not report diagnostics as errors: a source that
/// cannot be parsed lowers to a program that throws when executed.
pub trait Transpiler {
    fn transpile(&self, source: &str, options: &CompilerOptions) -> Result<Program>;
}

/// Wraps view source in the render registration harness. The state object is
/// brought into lexical scope with `with`, so bare field names resolve.
/// Trailing semicolons are dropped so a view may end its expression with one.
pub fn wrap_view_source(view_source: &str) -> String {
    let expression = view_source.trim_end_matches(|c: char| c == ';' || c.is_whitespace());
    format!(
        "render((state) => {{ with (state) {{ return (\n{}\n) }} }})",
        expression
    )
}

impl Program {
    /// A program whose only effect is throwing a `SyntaxError` with `message`.
    pub fn throwing(message: impl Into<String>) -> Self {
        Program {
            body: vec![Stmt::Expr(Expr::Unsupported(message.into()))],
        }
    }
}

/// Injected transpiler first, then the built-in one when compiled in.
pub fn resolve_transpiler(injected: Option<Rc<dyn Transpiler>>) -> Result<Rc<dyn Transpiler>> {
    if let Some(transpiler) = injected {
        return Ok(transpiler);
    }
    default_transpiler()
}

#[cfg(feature = "oxc")]
fn default_transpiler() -> Result<Rc<dyn Transpiler>> {
    Ok(Rc::new(OxcTranspiler))
}

#[cfg(not(feature = "oxc"))]
fn default_transpiler() -> Result<Rc<dyn Transpiler>> {
    Err(crate::error::WidgetError::MissingDependency(
        "compileWidget requires a transpiler. Enable the `oxc` feature or provide one through CompileOptions::transpiler."
            .to_string(),
    ))
}

// ═══════════════════════════════════════════════════════════════════════════════
// OXC TRANSPILER
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(feature = "oxc")]
#[derive(Debug, Default, Clone, Copy)]
pub struct OxcTranspiler;

#[cfg(feature = "oxc")]
impl Transpiler for OxcTranspiler {
    fn transpile(&self, source: &str, options: &CompilerOptions) -> Result<Program> {
        use crate::jsx_lowerer::JsxLowerer;
        use oxc_allocator::Allocator;
        use oxc_parser::Parser;
        use oxc_span::SourceType;

        let allocator = Allocator::default();
        // Script goal: the harness relies on `with`, which modules reject.
        let source_type = SourceType::cjs()
            .with_jsx(true)
            .with_typescript(options.typescript);
        let ret = Parser::new(&allocator, source, source_type).parse();

        if !ret.errors.is_empty() {
            log::debug!("suppressed {} transpile diagnostics", ret.errors.len());
        }
        if ret.panicked || (!ret.errors.is_empty() && ret.program.body.is_empty()) {
            let message = ret
                .errors
                .first()
                .map(|e| e.to_string())
                .unwrap_or_else(|| "Unexpected token".to_string());
            return Ok(Program::throwing(message));
        }

        let lowerer = JsxLowerer::new(&options.jsx_factory, &options.jsx_fragment_factory);
        Ok(lowerer.lower_program(&ret.program))
    }
}
