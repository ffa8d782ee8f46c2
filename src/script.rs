//! QuickJS-backed preview engine.
//!
//! The bundle runs in a fresh `rquickjs` context. The only bridge back to the
//! host is a bag of DOM, timer and logging functions that close over the
//! shared [`BrowserEnvironment`]; the prelude wraps them into browser globals
//! and never leaves the bag reachable from script.

use crate::bundle::build_bundle_source;
use crate::config::BundleConfig;
use crate::dom::{DomResult, NodeId};
use crate::engine::{EngineLoader, MountHandle, MountProps, PreviewEngine};
use crate::environment::BrowserEnvironment;
use crate::error::{Result, WidgetError, MSG_PREVIEW_UNDEFINED};
use crate::logging::SANDBOX_TARGET;
use crate::timers::{TimerId, TimerTask};
use rquickjs::context::EvalOptions;
use rquickjs::{CaughtError, Coerced, Context, Ctx, Exception, Function, Object, Runtime, Value};
use std::rc::Rc;
use std::time::{Duration, Instant};

const PRELUDE: &str = include_str!("sandbox_prelude.js");
const PREVIEW_GLOBAL: &str = "__MARKETPLACE_WIDGET_PREVIEW";
const SANDBOX_GLOBAL: &str = "__widgetSandbox";

/// Largest delay a timer accepts, in milliseconds.
const MAX_TIMER_DELAY_MS: f64 = 2_147_483_647.0;

#[derive(Debug, Default, Clone)]
pub struct QuickJsLoader {
    /// Heap cap for the script runtime in bytes. Unlimited when `None`.
    pub memory_limit: Option<usize>,
}

impl EngineLoader for QuickJsLoader {
    fn load(&self, env: &Rc<BrowserEnvironment>, bundle: &BundleConfig) -> Result<Box<dyn PreviewEngine>> {
        let source = build_bundle_source(bundle)?;

        let runtime = Runtime::new().map_err(init_error)?;
        if let Some(limit) = self.memory_limit {
            runtime.set_memory_limit(limit);
        }
        let context = Context::full(&runtime).map_err(init_error)?;

        context.with(|ctx| -> Result<()> {
            install_prelude(&ctx, env)
                .map_err(|e| WidgetError::BundleInitialization(caught_message(&ctx, e)))?;
            let mut options = EvalOptions::default();
            options.strict = false;
            ctx.eval_with_options::<(), _>(source, options)
                .map_err(|e| WidgetError::BundleInitialization(caught_message(&ctx, e)))?;
            Ok(())
        })?;

        let mut engine = QuickJsEngine {
            runtime,
            context,
            env: Rc::clone(env),
            mounts: 0,
        };
        engine.run_pending_jobs()?;

        let ready = engine.context.with(|ctx| {
            ctx.globals()
                .get::<_, Value>(PREVIEW_GLOBAL)
                .map(|preview| preview.is_object())
                .unwrap_or(false)
        });
        if !ready {
            return Err(WidgetError::BundleInitialization(MSG_PREVIEW_UNDEFINED.to_string()));
        }

        log::info!("preview bundle loaded into QuickJS sandbox");
        Ok(Box::new(engine))
    }
}

pub struct QuickJsEngine {
    runtime: Runtime,
    context: Context,
    env: Rc<BrowserEnvironment>,
    mounts: usize,
}

impl QuickJsEngine {
    fn with_sandbox<R, F>(&self, f: F) -> Result<R>
    where
        F: for<'js> FnOnce(Object<'js>) -> rquickjs::Result<R>,
    {
        self.context.with(|ctx| {
            ctx.globals()
                .get::<_, Object>(SANDBOX_GLOBAL)
                .and_then(f)
                .map_err(|e| WidgetError::RenderExecution(caught_message(&ctx, e)))
        })
    }

    /// Forgets script wrappers for nodes that left the document.
    fn release_detached(&self) -> Result<()> {
        let released = self.env.document_mut().sweep_detached();
        if released.is_empty() {
            return Ok(());
        }
        self.with_sandbox(|sandbox| {
            let release: Function = sandbox.get("release")?;
            release.call::<_, ()>((released,))
        })
    }
}

impl PreviewEngine for QuickJsEngine {
    fn mount(&mut self, container: NodeId, props: &MountProps) -> Result<MountHandle> {
        let state = serde_json::to_string(&props.state)?;
        let handle = self.with_sandbox(|sandbox| {
            let mount: Function = sandbox.get("mount")?;
            mount.call::<_, u32>((container, props.view.as_str(), state, props.inspect))
        })?;
        self.mounts += 1;
        Ok(handle)
    }

    fn unmount(&mut self, handle: MountHandle) -> Result<()> {
        let result = self.with_sandbox(|sandbox| {
            let unmount: Function = sandbox.get("unmount")?;
            unmount.call::<_, ()>((handle,))
        });
        self.mounts = self.mounts.saturating_sub(1);
        result?;
        self.run_pending_jobs()?;
        // Nodes created by an in-flight render may still be detached.
        if self.mounts == 0 {
            self.release_detached()?;
        }
        Ok(())
    }

    fn fire_timer(&mut self, id: TimerId) -> Result<()> {
        self.with_sandbox(|sandbox| {
            let fire: Function = sandbox.get("fireTimer")?;
            fire.call::<_, ()>((id,))
        })
    }

    fn run_pending_jobs(&mut self) -> Result<()> {
        loop {
            match self.runtime.execute_pending_job() {
                Ok(true) => continue,
                Ok(false) => return Ok(()),
                Err(_) => {
                    let message = self
                        .context
                        .with(|ctx| caught_message(&ctx, rquickjs::Error::Exception));
                    return Err(WidgetError::RenderExecution(message));
                }
            }
        }
    }
}

fn init_error(error: rquickjs::Error) -> WidgetError {
    WidgetError::BundleInitialization(format!("failed to start script engine: {}", error))
}

/// Message of the pending exception, or of the engine error itself.
fn caught_message(ctx: &Ctx<'_>, error: rquickjs::Error) -> String {
    match CaughtError::from_error(ctx, error) {
        CaughtError::Exception(exception) => exception
            .message()
            .unwrap_or_else(|| exception.to_string()),
        CaughtError::Value(value) => value
            .get::<Coerced<String>>()
            .map(|s| s.0)
            .unwrap_or_else(|_| "uncaught exception".to_string()),
        CaughtError::Error(error) => error.to_string(),
    }
}

fn throw_dom<'js, T>(ctx: &Ctx<'js>, result: DomResult<T>) -> rquickjs::Result<T> {
    result.map_err(|e| Exception::throw_message(ctx, &e.to_string()))
}

// ═══════════════════════════════════════════════════════════════════════════════
// HOST BRIDGE
// ═══════════════════════════════════════════════════════════════════════════════

fn install_prelude<'js>(ctx: &Ctx<'js>, env: &Rc<BrowserEnvironment>) -> rquickjs::Result<()> {
    let host = host_bridge(ctx, env)?;
    let capabilities: Vec<String> = env
        .capabilities()
        .iter()
        .map(|c| format!("{:?}", c))
        .collect();
    let mut options = EvalOptions::default();
    options.strict = false;
    let installer: Function = ctx.eval_with_options(PRELUDE, options)?;
    installer.call::<_, ()>((host, capabilities, env.url().to_string()))
}

fn host_bridge<'js>(ctx: &Ctx<'js>, env: &Rc<BrowserEnvironment>) -> rquickjs::Result<Object<'js>> {
    let host = Object::new(ctx.clone())?;

    // Document roots.
    {
        let env = Rc::clone(env);
        host.set("documentId", Function::new(ctx.clone(), move || env.document().document_id())?)?;
    }
    {
        let env = Rc::clone(env);
        host.set(
            "documentElement",
            Function::new(ctx.clone(), move || env.document().document_element_id())?,
        )?;
    }
    {
        let env = Rc::clone(env);
        host.set("head", Function::new(ctx.clone(), move || env.document().head_id())?)?;
    }
    {
        let env = Rc::clone(env);
        host.set("body", Function::new(ctx.clone(), move || env.document().body_id())?)?;
    }

    // Creation.
    {
        let env = Rc::clone(env);
        host.set(
            "createElement",
            Function::new(ctx.clone(), move |tag: String| env.document_mut().create_element(&tag))?,
        )?;
    }
    {
        let env = Rc::clone(env);
        host.set(
            "createElementNS",
            Function::new(ctx.clone(), move |namespace: String, tag: String| {
                env.document_mut().create_element_ns(&namespace, &tag)
            })?,
        )?;
    }
    {
        let env = Rc::clone(env);
        host.set(
            "createTextNode",
            Function::new(ctx.clone(), move |data: String| env.document_mut().create_text_node(&data))?,
        )?;
    }
    {
        let env = Rc::clone(env);
        host.set(
            "createComment",
            Function::new(ctx.clone(), move |data: String| env.document_mut().create_comment(&data))?,
        )?;
    }
    {
        let env = Rc::clone(env);
        host.set(
            "createFragment",
            Function::new(ctx.clone(), move || env.document_mut().create_document_fragment())?,
        )?;
    }

    // Inspection.
    {
        let env = Rc::clone(env);
        host.set(
            "nodeType",
            Function::new(ctx.clone(), move |ctx: Ctx<'js>, id: NodeId| {
                throw_dom(&ctx, env.document().node_type(id)).map(|t| t as u32)
            })?,
        )?;
    }
    {
        let env = Rc::clone(env);
        host.set(
            "nodeName",
            Function::new(ctx.clone(), move |ctx: Ctx<'js>, id: NodeId| {
                throw_dom(&ctx, env.document().node_name(id))
            })?,
        )?;
    }
    {
        let env = Rc::clone(env);
        host.set(
            "namespaceURI",
            Function::new(ctx.clone(), move |ctx: Ctx<'js>, id: NodeId| {
                throw_dom(&ctx, env.document().namespace_uri(id))
            })?,
        )?;
    }
    {
        let env = Rc::clone(env);
        host.set(
            "parentNode",
            Function::new(ctx.clone(), move |ctx: Ctx<'js>, id: NodeId| {
                throw_dom(&ctx, env.document_mut().parent(id))
            })?,
        )?;
    }
    {
        let env = Rc::clone(env);
        host.set(
            "childNodes",
            Function::new(ctx.clone(), move |ctx: Ctx<'js>, id: NodeId| {
                throw_dom(&ctx, env.document_mut().child_nodes(id))
            })?,
        )?;
    }
    {
        let env = Rc::clone(env);
        host.set(
            "children",
            Function::new(ctx.clone(), move |ctx: Ctx<'js>, id: NodeId| {
                throw_dom(&ctx, env.document_mut().children(id))
            })?,
        )?;
    }
    {
        let env = Rc::clone(env);
        host.set(
            "isConnected",
            Function::new(ctx.clone(), move |ctx: Ctx<'js>, id: NodeId| {
                throw_dom(&ctx, env.document().is_connected(id))
            })?,
        )?;
    }
    {
        let env = Rc::clone(env);
        host.set(
            "contains",
            Function::new(ctx.clone(), move |ctx: Ctx<'js>, id: NodeId, other: NodeId| {
                throw_dom(&ctx, env.document().contains(id, other))
            })?,
        )?;
    }

    // Mutation.
    {
        let env = Rc::clone(env);
        host.set(
            "appendChild",
            Function::new(ctx.clone(), move |ctx: Ctx<'js>, parent: NodeId, child: NodeId| {
                throw_dom(&ctx, env.document_mut().append_child(parent, child))
            })?,
        )?;
    }
    {
        let env = Rc::clone(env);
        host.set(
            "insertBefore",
            Function::new(
                ctx.clone(),
                move |ctx: Ctx<'js>, parent: NodeId, child: NodeId, reference: Option<NodeId>| {
                    throw_dom(&ctx, env.document_mut().insert_before(parent, child, reference))
                },
            )?,
        )?;
    }
    {
        let env = Rc::clone(env);
        host.set(
            "removeChild",
            Function::new(ctx.clone(), move |ctx: Ctx<'js>, parent: NodeId, child: NodeId| {
                throw_dom(&ctx, env.document_mut().remove_child(parent, child))
            })?,
        )?;
    }
    {
        let env = Rc::clone(env);
        host.set(
            "replaceChild",
            Function::new(
                ctx.clone(),
                move |ctx: Ctx<'js>, parent: NodeId, next: NodeId, previous: NodeId| {
                    throw_dom(&ctx, env.document_mut().replace_child(parent, next, previous))
                },
            )?,
        )?;
    }
    {
        let env = Rc::clone(env);
        host.set(
            "remove",
            Function::new(ctx.clone(), move |ctx: Ctx<'js>, id: NodeId| {
                throw_dom(&ctx, env.document_mut().remove(id))
            })?,
        )?;
    }

    // Character data.
    {
        let env = Rc::clone(env);
        host.set(
            "getTextContent",
            Function::new(ctx.clone(), move |ctx: Ctx<'js>, id: NodeId| {
                throw_dom(&ctx, env.document().text_content(id))
            })?,
        )?;
    }
    {
        let env = Rc::clone(env);
        host.set(
            "setTextContent",
            Function::new(ctx.clone(), move |ctx: Ctx<'js>, id: NodeId, text: String| {
                throw_dom(&ctx, env.document_mut().set_text_content(id, &text))
            })?,
        )?;
    }
    {
        let env = Rc::clone(env);
        host.set(
            "getNodeValue",
            Function::new(ctx.clone(), move |ctx: Ctx<'js>, id: NodeId| {
                throw_dom(&ctx, env.document().node_value(id))
            })?,
        )?;
    }
    {
        let env = Rc::clone(env);
        host.set(
            "setNodeValue",
            Function::new(ctx.clone(), move |ctx: Ctx<'js>, id: NodeId, value: String| {
                throw_dom(&ctx, env.document_mut().set_node_value(id, &value))
            })?,
        )?;
    }

    // Attributes.
    {
        let env = Rc::clone(env);
        host.set(
            "getAttribute",
            Function::new(ctx.clone(), move |ctx: Ctx<'js>, id: NodeId, name: String| {
                throw_dom(&ctx, env.document().get_attribute(id, &name))
            })?,
        )?;
    }
    {
        let env = Rc::clone(env);
        host.set(
            "setAttribute",
            Function::new(
                ctx.clone(),
                move |ctx: Ctx<'js>, id: NodeId, name: String, value: String| {
                    throw_dom(&ctx, env.document_mut().set_attribute(id, &name, &value))
                },
            )?,
        )?;
    }
    {
        let env = Rc::clone(env);
        host.set(
            "removeAttribute",
            Function::new(ctx.clone(), move |ctx: Ctx<'js>, id: NodeId, name: String| {
                throw_dom(&ctx, env.document_mut().remove_attribute(id, &name))
            })?,
        )?;
    }
    {
        let env = Rc::clone(env);
        host.set(
            "hasAttribute",
            Function::new(ctx.clone(), move |ctx: Ctx<'js>, id: NodeId, name: String| {
                throw_dom(&ctx, env.document().has_attribute(id, &name))
            })?,
        )?;
    }
    {
        let env = Rc::clone(env);
        host.set(
            "attributeNames",
            Function::new(ctx.clone(), move |ctx: Ctx<'js>, id: NodeId| {
                throw_dom(&ctx, env.document().attribute_names(id))
            })?,
        )?;
    }

    // Markup and queries.
    {
        let env = Rc::clone(env);
        host.set(
            "getInnerHTML",
            Function::new(ctx.clone(), move |ctx: Ctx<'js>, id: NodeId| {
                throw_dom(&ctx, env.document().inner_html(id))
            })?,
        )?;
    }
    {
        let env = Rc::clone(env);
        host.set(
            "setInnerHTML",
            Function::new(ctx.clone(), move |ctx: Ctx<'js>, id: NodeId, html: String| {
                throw_dom(&ctx, env.document_mut().set_inner_html(id, &html))
            })?,
        )?;
    }
    {
        let env = Rc::clone(env);
        host.set(
            "getOuterHTML",
            Function::new(ctx.clone(), move |ctx: Ctx<'js>, id: NodeId| {
                throw_dom(&ctx, env.document().outer_html(id))
            })?,
        )?;
    }
    {
        let env = Rc::clone(env);
        host.set(
            "getElementById",
            Function::new(ctx.clone(), move |id: String| env.document_mut().get_element_by_id(&id))?,
        )?;
    }
    {
        let env = Rc::clone(env);
        host.set(
            "querySelector",
            Function::new(ctx.clone(), move |ctx: Ctx<'js>, scope: NodeId, selector: String| {
                throw_dom(&ctx, env.document_mut().query_selector(scope, &selector))
            })?,
        )?;
    }

    // Timers.
    {
        let env = Rc::clone(env);
        host.set(
            "setTimer",
            Function::new(ctx.clone(), move |delay: f64| {
                let delay = if delay.is_finite() {
                    delay.clamp(0.0, MAX_TIMER_DELAY_MS)
                } else {
                    0.0
                };
                env.timers()
                    .schedule(Duration::from_secs_f64(delay / 1000.0), TimerTask::Script)
            })?,
        )?;
    }
    {
        let env = Rc::clone(env);
        host.set(
            "clearTimer",
            Function::new(ctx.clone(), move |id: TimerId| {
                env.timers().cancel(id);
            })?,
        )?;
    }
    {
        let origin = Instant::now();
        host.set(
            "now",
            Function::new(ctx.clone(), move || origin.elapsed().as_secs_f64() * 1000.0)?,
        )?;
    }

    // Crypto and logging.
    {
        let env = Rc::clone(env);
        host.set(
            "randomUUID",
            Function::new(ctx.clone(), move |ctx: Ctx<'js>| {
                env.random_uuid().ok_or_else(|| {
                    Exception::throw_message(&ctx, "crypto.randomUUID is not available")
                })
            })?,
        )?;
    }
    host.set(
        "log",
        Function::new(ctx.clone(), move |level: String, message: String| {
            let level = match level.as_str() {
                "error" => log::Level::Error,
                "warn" => log::Level::Warn,
                "debug" => log::Level::Debug,
                "trace" => log::Level::Trace,
                _ => log::Level::Info,
            };
            log::log!(target: SANDBOX_TARGET, level, "{}", message);
        })?,
    )?;

    Ok(host)
}
