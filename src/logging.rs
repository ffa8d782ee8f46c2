//! Logger setup for hosts that do not bring their own `log` backend.
//!
//! Script `console.*` output is logged under [`SANDBOX_TARGET`], so a bundle's
//! chatter can be turned down without hiding the crate's own messages.

use std::sync::OnceLock;

/// Log target for messages forwarded from the sandbox console.
pub const SANDBOX_TARGET: &str = "widget_native::sandbox";

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// `env_logger` filter directives. Falls back to `RUST_LOG`, then `info`.
    pub filter: Option<String>,
    /// Overrides the level of [`SANDBOX_TARGET`] on top of `filter`.
    pub sandbox_level: Option<log::LevelFilter>,
    pub write_style: env_logger::WriteStyle,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: None,
            sandbox_level: None,
            write_style: env_logger::WriteStyle::Auto,
        }
    }
}

impl LoggingConfig {
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_sandbox_level(mut self, level: log::LevelFilter) -> Self {
        self.sandbox_level = Some(level);
        self
    }

    /// Directive string handed to `env_logger`. `env_filter` is the value of
    /// `RUST_LOG`, if set.
    pub fn directives(&self, env_filter: Option<&str>) -> String {
        let base = self
            .filter
            .as_deref()
            .or(env_filter)
            .filter(|f| !f.trim().is_empty())
            .unwrap_or("info");
        match self.sandbox_level {
            Some(level) => format!("{},{}={}", base, SANDBOX_TARGET, level.as_str().to_lowercase()),
            None => base.to_string(),
        }
    }
}

static INSTALLED: OnceLock<bool> = OnceLock::new();

/// Installs the `env_logger` backend on first call. Returns whether the
/// crate's logger is the active one; `false` when the host already set a
/// different logger. Later calls return the first outcome and ignore `config`.
pub fn init_logging(config: LoggingConfig) -> bool {
    *INSTALLED.get_or_init(|| {
        let env_filter = std::env::var("RUST_LOG").ok();
        let installed = env_logger::Builder::new()
            .parse_filters(&config.directives(env_filter.as_deref()))
            .write_style(config.write_style)
            .try_init()
            .is_ok();
        if installed {
            log::debug!("logging initialized");
        }
        installed
    })
}
