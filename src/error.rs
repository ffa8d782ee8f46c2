//! Error taxonomy shared by the compiler and the sandbox renderer.

use std::path::PathBuf;
use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════════════
// ERROR MESSAGES
// ═══════════════════════════════════════════════════════════════════════════════

pub const MSG_EMPTY_VIEW_SOURCE: &str = "viewSource must be a non-empty string.";
pub const MSG_NO_RENDER_CALL: &str = "No render() call found in view";
pub const MSG_PREVIEW_UNDEFINED: &str =
    "Failed to initialize preview bundle: __MARKETPLACE_WIDGET_PREVIEW is undefined.";

#[derive(Debug, Error)]
pub enum WidgetError {
    /// Bad or empty view source.
    #[error("{0}")]
    InvalidInput(String),

    /// Transpiler or sandbox engine unavailable and not injected.
    #[error("{0}")]
    MissingDependency(String),

    #[error("{}", MSG_NO_RENDER_CALL)]
    NoRenderCall,

    /// The view source threw while executing. Carries the original message.
    #[error("{0}")]
    RenderExecution(String),

    /// The engine bundle did not expose its integration entry point.
    #[error("{0}")]
    BundleInitialization(String),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl WidgetError {
    pub fn empty_view_source() -> Self {
        WidgetError::InvalidInput(MSG_EMPTY_VIEW_SOURCE.to_string())
    }

    /// Stable kind name, used by the Node bindings to rebuild typed errors.
    pub fn kind(&self) -> &'static str {
        match self {
            WidgetError::InvalidInput(_) => "InvalidInputError",
            WidgetError::MissingDependency(_) => "MissingDependencyError",
            WidgetError::NoRenderCall => "NoRenderCallError",
            WidgetError::RenderExecution(_) => "RenderExecutionError",
            WidgetError::BundleInitialization(_) | WidgetError::Io { .. } => {
                "BundleInitializationError"
            }
            WidgetError::Json(_) => "InvalidInputError",
        }
    }
}

pub type Result<T> = std::result::Result<T, WidgetError>;
