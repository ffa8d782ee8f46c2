//! Engine seam between the renderer and whatever executes the bundle.
//!
//! The renderer only drives mounts, timers and jobs through these traits, so
//! tests can swap in a stub loader and count constructions.

use crate::config::BundleConfig;
use crate::dom::NodeId;
use crate::environment::BrowserEnvironment;
use crate::error::Result;
use crate::timers::TimerId;
use serde::Serialize;
use std::rc::Rc;

pub type MountHandle = u32;

/// Props handed to the bundle's integration component.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MountProps {
    pub view: String,
    pub state: serde_json::Value,
    pub inspect: bool,
}

pub trait PreviewEngine {
    /// Mounts the integration component into `container`.
    fn mount(&mut self, container: NodeId, props: &MountProps) -> Result<MountHandle>;

    fn unmount(&mut self, handle: MountHandle) -> Result<()>;

    /// Runs the script callback registered for a due timer.
    fn fire_timer(&mut self, id: TimerId) -> Result<()>;

    /// Drains the microtask queue.
    fn run_pending_jobs(&mut self) -> Result<()>;
}

pub trait EngineLoader {
    /// Executes the bundle inside a fresh context bound to `env`.
    fn load(&self, env: &Rc<BrowserEnvironment>, bundle: &BundleConfig) -> Result<Box<dyn PreviewEngine>>;
}

/// The built-in QuickJS loader, when compiled in.
pub fn default_loader() -> Result<Rc<dyn EngineLoader>> {
    #[cfg(feature = "quickjs")]
    {
        Ok(Rc::new(crate::script::QuickJsLoader::default()))
    }
    #[cfg(not(feature = "quickjs"))]
    {
        Err(crate::error::WidgetError::MissingDependency(
            "no script engine available: enable the `quickjs` feature or inject an EngineLoader"
                .to_string(),
        ))
    }
}
