//! Engine bundle assembly.
//!
//! The prebuilt chunks are ES modules. The sandbox has no module loader, so
//! the concatenated source is rewritten into a classic script: relative
//! dynamic imports are anchored to the bundle directory and top-level
//! `export { .. }` statements are removed.

use crate::config::BundleConfig;
use crate::error::{Result, WidgetError};
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use sha2::{Digest, Sha256};
use std::path::Path;

pub const BUNDLE_BASE_BINDING: &str = "__MARKETPLACE_BUNDLE_BASE__";

lazy_static! {
    static ref DYNAMIC_IMPORT_RE: Regex =
        Regex::new(r#"import\(\s*(?:'(\.{1,2}/[^'"]+?)'|"(\.{1,2}/[^'"]+?)")\)"#).unwrap();
    static ref EXPORT_STATEMENT_RE: Regex =
        Regex::new(r"(?m)^\s*export\s*\{[^}]*\};?\s*$").unwrap();
}

/// Reads, concatenates and rewrites the configured chunks.
pub fn build_bundle_source(config: &BundleConfig) -> Result<String> {
    let mut chunks = Vec::with_capacity(config.bundle_files.len());
    for file in &config.bundle_files {
        let path = Path::new(file);
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            config.bundle_dir.join(path)
        };
        let chunk = std::fs::read_to_string(&path).map_err(|source| WidgetError::Io {
            path: path.clone(),
            source,
        })?;
        chunks.push(chunk);
    }

    let base_dir = config
        .bundle_base_dir
        .as_deref()
        .unwrap_or(&config.bundle_dir);
    let base_url = normalize_base_url(base_dir);

    let source = format!(
        "const {} = {};\n{}",
        BUNDLE_BASE_BINDING,
        serde_json::to_string(&base_url)?,
        chunks.join("\n")
    );
    let source = strip_export_statements(&rewrite_dynamic_imports(&source));

    log::debug!(
        "built preview bundle from {} chunk(s), sha256 {}",
        chunks.len(),
        &fingerprint(&source)[..12]
    );
    Ok(source)
}

/// `file://` URL of `dir` with exactly one trailing slash and forward slashes.
pub fn normalize_base_url(dir: &Path) -> String {
    let dir = dir.to_string_lossy().replace('\\', "/");
    let mut url = format!("file://{}", dir);
    if !url.ends_with('/') {
        url.push('/');
    }
    url
}

/// `import('./x.js')` becomes `import(new URL('./x.js', BASE).href)`.
pub fn rewrite_dynamic_imports(source: &str) -> String {
    DYNAMIC_IMPORT_RE
        .replace_all(source, |caps: &Captures| {
            let specifier = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str())
                .unwrap_or_default()
                .replace('\\', "/");
            format!(
                "import(new URL('{}', {}).href)",
                specifier, BUNDLE_BASE_BINDING
            )
        })
        .into_owned()
}

pub fn strip_export_statements(source: &str) -> String {
    EXPORT_STATEMENT_RE.replace_all(source, "").into_owned()
}

pub fn fingerprint(source: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    format!("{:x}", hasher.finalize())
}
