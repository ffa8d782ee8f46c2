//! Caller-facing options for compiling and rendering widgets.

use crate::environment::BrowserEnvironment;
use crate::error::Result;
use crate::transpile::Transpiler;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

pub const DEFAULT_JSX_FACTORY: &str = "__jsx";
pub const DEFAULT_JSX_FRAGMENT_FACTORY: &str = "__Fragment";
pub const BUNDLE_DIR_ENV: &str = "WIDGET_BUNDLE_DIR";
pub const DEFAULT_BUNDLE_FILES: [&str; 3] = ["index-chunk-1.js", "index-chunk-2.js", "index-chunk-3.js"];

// ═══════════════════════════════════════════════════════════════════════════════
// COMPILER OPTIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Transpile settings for the view harness. Unknown keys are kept in `extra`
/// so caller mappings survive a merge untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompilerOptions {
    pub jsx_factory: String,
    pub jsx_fragment_factory: String,
    pub no_lib: bool,
    pub target: String,
    pub module: String,
    pub jsx: String,
    /// Accept type annotations inside view source.
    pub typescript: bool,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            jsx_factory: DEFAULT_JSX_FACTORY.to_string(),
            jsx_fragment_factory: DEFAULT_JSX_FRAGMENT_FACTORY.to_string(),
            no_lib: true,
            target: "ESNext".to_string(),
            module: "ESNext".to_string(),
            jsx: "react".to_string(),
            typescript: false,
            extra: serde_json::Map::new(),
        }
    }
}

impl CompilerOptions {
    /// Overlays a caller mapping onto these options. Caller keys win.
    pub fn merged(&self, overrides: &serde_json::Value) -> Result<Self> {
        let mut base = serde_json::to_value(self)?;
        if let (Some(base_map), Some(extra)) = (base.as_object_mut(), overrides.as_object()) {
            for (key, value) in extra {
                base_map.insert(key.clone(), value.clone());
            }
        }
        Ok(serde_json::from_value(base)?)
    }
}

#[derive(Clone, Default)]
pub struct CompileOptions {
    /// Replaces the built-in transpiler.
    pub transpiler: Option<Rc<dyn Transpiler>>,
    pub compiler_options: CompilerOptions,
    /// Declaration manifest text. Falls back to the bundled widget manifest.
    pub declarations: Option<String>,
}

impl CompileOptions {
    pub fn with_declarations(mut self, declarations: impl Into<String>) -> Self {
        self.declarations = Some(declarations.into());
        self
    }

    pub fn with_transpiler(mut self, transpiler: Rc<dyn Transpiler>) -> Self {
        self.transpiler = Some(transpiler);
        self
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RENDER OPTIONS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BundleConfig {
    pub bundle_dir: PathBuf,
    pub bundle_files: Vec<String>,
    /// Directory the rewritten dynamic imports resolve against. Defaults to `bundle_dir`.
    pub bundle_base_dir: Option<PathBuf>,
}

impl Default for BundleConfig {
    fn default() -> Self {
        let bundle_dir = std::env::var_os(BUNDLE_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("bundle"));
        Self {
            bundle_dir,
            bundle_files: DEFAULT_BUNDLE_FILES.iter().map(|f| f.to_string()).collect(),
            bundle_base_dir: None,
        }
    }
}

#[derive(Clone, Default)]
pub struct RenderOptions {
    /// Pre-built browser environment. Constructed internally when absent.
    pub window: Option<Rc<BrowserEnvironment>>,
    pub bundle: BundleConfig,
    /// Settle delay between mount and markup capture.
    pub flush_delay: Duration,
    pub inspect: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RenderSettings {
    bundle_dir: Option<PathBuf>,
    bundle_files: Option<Vec<String>>,
    bundle_base_dir: Option<PathBuf>,
    flush_delay: Option<f64>,
    inspect: Option<bool>,
}

impl RenderOptions {
    /// Reads `{ bundleDir, bundleFiles, bundleBaseDir, flushDelay, inspect }`.
    /// `flushDelay` is in milliseconds; negative values clamp to zero.
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        let settings: RenderSettings = serde_json::from_value(value.clone())?;
        let mut options = RenderOptions::default();
        if let Some(dir) = settings.bundle_dir {
            options.bundle.bundle_dir = dir;
        }
        if let Some(files) = settings.bundle_files {
            options.bundle.bundle_files = files;
        }
        options.bundle.bundle_base_dir = settings.bundle_base_dir;
        if let Some(ms) = settings.flush_delay {
            options.flush_delay = Duration::from_millis(ms.max(0.0) as u64);
        }
        options.inspect = settings.inspect.unwrap_or(false);
        Ok(options)
    }

    pub fn with_flush_delay(mut self, delay: Duration) -> Self {
        self.flush_delay = delay;
        self
    }

    pub fn with_window(mut self, window: Rc<BrowserEnvironment>) -> Self {
        self.window = Some(window);
        self
    }
}
