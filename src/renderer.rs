//! Sandbox renderer: mounts a view into the preview bundle and captures
//! the committed markup.
//!
//! A [`PreviewService`] owns at most one sandbox (environment plus loaded
//! engine). The sandbox is built on first use and kept until [`reset`]. Each
//! render gets its own container under `<body>`, which is always unmounted
//! and detached before the call returns.
//!
//! [`reset`]: PreviewService::reset

use crate::config::RenderOptions;
use crate::dom::{DomError, ElementSnapshot, NodeId};
use crate::engine::{default_loader, EngineLoader, MountProps, PreviewEngine};
use crate::environment::BrowserEnvironment;
use crate::error::{Result, WidgetError};
use crate::timers::{TimerOwner, TimerTask};
use serde::Serialize;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;

pub const MSG_ENVIRONMENT_CLOSED: &str = "environment is closed";

/// Markup of one render plus a detached copy of its root element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedWidget {
    pub html: String,
    pub element: Option<ElementSnapshot>,
}

/// A ready sandbox: the environment and the engine that loaded the bundle.
pub struct Sandbox {
    env: Rc<BrowserEnvironment>,
    engine: RefCell<Box<dyn PreviewEngine>>,
    next_render: Cell<TimerOwner>,
    /// Timer failures raised while another render was driving the loop,
    /// waiting for the render that owns the timer to pick them up.
    failures: RefCell<HashMap<TimerOwner, WidgetError>>,
}

impl Sandbox {
    fn new(env: Rc<BrowserEnvironment>, engine: Box<dyn PreviewEngine>) -> Self {
        Self {
            env,
            engine: RefCell::new(engine),
            next_render: Cell::new(0),
            failures: RefCell::new(HashMap::new()),
        }
    }

    pub fn environment(&self) -> &Rc<BrowserEnvironment> {
        &self.env
    }

    fn begin_render(&self) -> TimerOwner {
        let id = self.next_render.get().wrapping_add(1);
        self.next_render.set(id);
        id
    }

    /// Runs `f` on the engine with timers it schedules charged to `owner`.
    fn on_behalf_of<R>(
        &self,
        owner: Option<TimerOwner>,
        f: impl FnOnce(&mut Box<dyn PreviewEngine>) -> Result<R>,
    ) -> Result<R> {
        let previous = self.env.timers().set_owner(owner);
        let result = {
            let mut engine = self.engine.borrow_mut();
            f(&mut engine)
        };
        self.env.timers().set_owner(previous);
        result
    }

    fn take_failure(&self, render: TimerOwner) -> Result<()> {
        match self.failures.borrow_mut().remove(&render) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[derive(Default)]
pub struct PreviewService {
    loader: Option<Rc<dyn EngineLoader>>,
    sandbox: RefCell<Option<Rc<Sandbox>>>,
}

impl PreviewService {
    /// Uses the built-in engine loader.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_loader(loader: Rc<dyn EngineLoader>) -> Self {
        Self {
            loader: Some(loader),
            sandbox: RefCell::new(None),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.sandbox.borrow().is_some()
    }

    /// Returns the cached sandbox, building it on first use.
    ///
    /// Construction never suspends, so callers interleaved on one thread
    /// observe either no sandbox or the finished one.
    pub fn ensure_ready(&self, options: &RenderOptions) -> Result<Rc<Sandbox>> {
        if let Some(sandbox) = self.sandbox.borrow().as_ref() {
            return Ok(Rc::clone(sandbox));
        }

        let env = match &options.window {
            Some(window) => Rc::clone(window),
            None => Rc::new(BrowserEnvironment::new()),
        };
        let patched = env.patch_missing_capabilities();
        log::debug!("patched {} capabilities into the preview environment", patched.len());

        let loader = match &self.loader {
            Some(loader) => Rc::clone(loader),
            None => default_loader()?,
        };
        let engine = loader.load(&env, &options.bundle)?;

        let sandbox = Rc::new(Sandbox::new(env, engine));
        *self.sandbox.borrow_mut() = Some(Rc::clone(&sandbox));
        log::info!(
            "preview sandbox ready (bundle dir {})",
            options.bundle.bundle_dir.display()
        );
        Ok(sandbox)
    }

    /// Drops the cached sandbox and closes its environment.
    pub fn reset(&self) {
        if let Some(sandbox) = self.sandbox.borrow_mut().take() {
            sandbox.env.close();
            log::info!("preview sandbox reset");
        }
    }

    pub async fn render_widget_to_html(
        &self,
        view_source: &str,
        state: &serde_json::Value,
        options: &RenderOptions,
    ) -> Result<String> {
        Ok(self.render_widget_to_dom(view_source, state, options).await?.html)
    }

    /// Drives [`Self::render_widget_to_html`] on a current-thread runtime.
    /// Must not be called from inside another runtime.
    pub fn render_widget_to_html_blocking(
        &self,
        view_source: &str,
        state: &serde_json::Value,
        options: &RenderOptions,
    ) -> Result<String> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(|e| WidgetError::RenderExecution(format!("failed to start render runtime: {}", e)))?;
        runtime.block_on(self.render_widget_to_html(view_source, state, options))
    }

    pub async fn render_widget_to_dom(
        &self,
        view_source: &str,
        state: &serde_json::Value,
        options: &RenderOptions,
    ) -> Result<RenderedWidget> {
        let sandbox = self.ensure_ready(options)?;
        if sandbox.env.is_closed() {
            return Err(WidgetError::RenderExecution(MSG_ENVIRONMENT_CLOSED.to_string()));
        }

        let container = {
            let mut document = sandbox.env.document_mut();
            let container = document.create_element("div");
            let body = document.body_id();
            document.append_child(body, container).map_err(dom_error)?;
            container
        };

        let props = MountProps {
            view: view_source.to_string(),
            state: match state {
                serde_json::Value::Object(_) | serde_json::Value::Array(_) => state.clone(),
                _ => serde_json::Value::Object(Default::default()),
            },
            inspect: options.inspect,
        };

        let outcome = mount_and_capture(&sandbox, container, &props, options.flush_delay).await;

        if let Err(error) = sandbox.env.document_mut().remove(container) {
            log::warn!("failed to detach preview container: {}", error);
        }
        outcome
    }
}

async fn mount_and_capture(
    sandbox: &Sandbox,
    container: NodeId,
    props: &MountProps,
    flush_delay: Duration,
) -> Result<RenderedWidget> {
    let render = sandbox.begin_render();
    let outcome = mount_owned(sandbox, render, container, props, flush_delay).await;
    sandbox.failures.borrow_mut().remove(&render);
    outcome
}

async fn mount_owned(
    sandbox: &Sandbox,
    render: TimerOwner,
    container: NodeId,
    props: &MountProps,
    flush_delay: Duration,
) -> Result<RenderedWidget> {
    let owner = Some(render);
    let handle = sandbox.on_behalf_of(owner, |engine| engine.mount(container, props))?;

    let captured = async {
        sandbox.on_behalf_of(owner, |engine| engine.run_pending_jobs())?;
        settle(sandbox, render, flush_delay).await?;
        sandbox.take_failure(render)?;
        capture(&sandbox.env, container)
    }
    .await;

    let unmounted = sandbox.on_behalf_of(owner, |engine| engine.unmount(handle));
    match (captured, unmounted) {
        (Ok(rendered), Ok(())) => Ok(rendered),
        (Ok(_), Err(error)) => Err(error),
        (Err(error), Ok(())) => Err(error),
        (Err(error), Err(cleanup)) => {
            log::warn!("unmount after failed render also failed: {}", cleanup);
            Err(error)
        }
    }
}

/// Runs the sandbox event loop until `delay` has elapsed. Script timers that
/// come due in the meantime fire in order, each followed by its jobs.
///
/// A failing timer owned by another render is parked for that render and
/// does not fail this one.
async fn settle(sandbox: &Sandbox, render: TimerOwner, delay: Duration) -> Result<()> {
    let (signal, mut settled) = oneshot::channel();
    let signal_id = sandbox.env.timers().schedule(delay, TimerTask::Signal(signal));

    loop {
        sandbox.take_failure(render)?;
        loop {
            let Some(timer) = sandbox.env.timers().pop_due(Instant::now()) else {
                break;
            };
            match timer.task {
                TimerTask::Signal(signal) => {
                    let _ = signal.send(());
                    if timer.id == signal_id {
                        return Ok(());
                    }
                }
                TimerTask::Script => {
                    let fired = sandbox.on_behalf_of(timer.owner, |engine| {
                        engine.fire_timer(timer.id)?;
                        engine.run_pending_jobs()
                    });
                    match (fired, timer.owner) {
                        (Ok(()), _) => {}
                        (Err(error), Some(owner)) if owner != render => {
                            log::warn!(
                                "timer {} of render {} failed during render {}: {}",
                                timer.id,
                                owner,
                                render,
                                error
                            );
                            sandbox.failures.borrow_mut().entry(owner).or_insert(error);
                        }
                        (Err(error), _) => return Err(error),
                    }
                }
            }
        }

        // Another render's loop may have fired our signal, or the
        // environment was closed underneath us.
        match settled.try_recv() {
            Ok(()) | Err(oneshot::error::TryRecvError::Closed) => return Ok(()),
            Err(oneshot::error::TryRecvError::Empty) => {}
        }

        let next_due = sandbox.env.timers().next_due();
        match next_due {
            Some(due) => {
                tokio::select! {
                    _ = &mut settled => return Ok(()),
                    _ = tokio::time::sleep_until(due) => {}
                }
            }
            None => {
                let _ = (&mut settled).await;
                return Ok(());
            }
        }
    }
}

fn capture(env: &BrowserEnvironment, container: NodeId) -> Result<RenderedWidget> {
    let mut document = env.document_mut();
    let html = document.inner_html(container).map_err(dom_error)?;
    let element = match document.first_element_child(container).map_err(dom_error)? {
        Some(first) => Some(document.snapshot(first).map_err(dom_error)?),
        None => None,
    };
    Ok(RenderedWidget { html, element })
}

fn dom_error(error: DomError) -> WidgetError {
    WidgetError::RenderExecution(error.to_string())
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROCESS-WIDE SERVICE
// ═══════════════════════════════════════════════════════════════════════════════

thread_local! {
    static DEFAULT_SERVICE: Rc<PreviewService> = Rc::new(PreviewService::new());
}

fn default_service() -> Rc<PreviewService> {
    DEFAULT_SERVICE.with(Rc::clone)
}

pub async fn render_widget_to_html(
    view_source: &str,
    state: &serde_json::Value,
    options: &RenderOptions,
) -> Result<String> {
    default_service()
        .render_widget_to_html(view_source, state, options)
        .await
}

pub fn render_widget_to_html_blocking(
    view_source: &str,
    state: &serde_json::Value,
    options: &RenderOptions,
) -> Result<String> {
    default_service().render_widget_to_html_blocking(view_source, state, options)
}

pub async fn render_widget_to_dom(
    view_source: &str,
    state: &serde_json::Value,
    options: &RenderOptions,
) -> Result<RenderedWidget> {
    default_service()
        .render_widget_to_dom(view_source, state, options)
        .await
}

/// Cached sandbox of the default service, built on first call.
pub fn preview_sandbox(options: &RenderOptions) -> Result<Rc<Sandbox>> {
    default_service().ensure_ready(options)
}

pub fn reset_sandbox() {
    default_service().reset();
}
