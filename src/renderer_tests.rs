#[cfg(test)]
mod tests {
    use crate::config::{BundleConfig, RenderOptions};
    use crate::dom::NodeId;
    use crate::engine::{EngineLoader, MountHandle, MountProps, PreviewEngine};
    use crate::environment::BrowserEnvironment;
    use crate::error::{Result, WidgetError, MSG_PREVIEW_UNDEFINED};
    use crate::renderer::{PreviewService, MSG_ENVIRONMENT_CLOSED};
    use crate::timers::{TimerId, TimerTask};
    use serde_json::json;
    use std::cell::Cell;
    use std::collections::HashMap;
    use std::rc::Rc;
    use std::time::Duration;

    /// Commits `<section class="widget">{view}</section>` from a timer, the
    /// way a concurrent root commits after `render()` returns.
    struct StubEngine {
        env: Rc<BrowserEnvironment>,
        next_handle: MountHandle,
        mounts: HashMap<MountHandle, (NodeId, TimerId)>,
        commits: HashMap<TimerId, (NodeId, String)>,
    }

    impl PreviewEngine for StubEngine {
        fn mount(&mut self, container: NodeId, props: &MountProps) -> Result<MountHandle> {
            if props.view.contains("throw-on-mount") {
                return Err(WidgetError::RenderExecution("stub mount failed".to_string()));
            }
            let delay = if props.view.contains("slow") {
                Duration::from_millis(20)
            } else {
                Duration::ZERO
            };
            let timer = self.env.timers().schedule(delay, TimerTask::Script);
            self.commits.insert(
                timer,
                (container, format!(r#"<section class="widget">{}</section>"#, props.view)),
            );
            self.next_handle += 1;
            self.mounts.insert(self.next_handle, (container, timer));
            Ok(self.next_handle)
        }

        fn unmount(&mut self, handle: MountHandle) -> Result<()> {
            if let Some((container, timer)) = self.mounts.remove(&handle) {
                self.env.timers().cancel(timer);
                self.commits.remove(&timer);
                self.env
                    .document_mut()
                    .set_text_content(container, "")
                    .map_err(|e| WidgetError::RenderExecution(e.to_string()))?;
            }
            Ok(())
        }

        fn fire_timer(&mut self, id: TimerId) -> Result<()> {
            let Some((container, html)) = self.commits.remove(&id) else {
                return Ok(());
            };
            if html.contains("throw-on-commit") {
                return Err(WidgetError::RenderExecution("stub commit failed".to_string()));
            }
            if html.contains("block") {
                // Holds the loop so other mounts' timers come due meanwhile.
                std::thread::sleep(Duration::from_millis(40));
            }
            self.env
                .document_mut()
                .set_inner_html(container, &html)
                .map_err(|e| WidgetError::RenderExecution(e.to_string()))
        }

        fn run_pending_jobs(&mut self) -> Result<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct CountingLoader {
        loads: Rc<Cell<usize>>,
        fail: bool,
    }

    impl EngineLoader for CountingLoader {
        fn load(&self, env: &Rc<BrowserEnvironment>, _bundle: &BundleConfig) -> Result<Box<dyn PreviewEngine>> {
            self.loads.set(self.loads.get() + 1);
            if self.fail {
                return Err(WidgetError::BundleInitialization(MSG_PREVIEW_UNDEFINED.to_string()));
            }
            Ok(Box::new(StubEngine {
                env: Rc::clone(env),
                next_handle: 0,
                mounts: HashMap::new(),
                commits: HashMap::new(),
            }))
        }
    }

    fn service() -> (PreviewService, Rc<Cell<usize>>) {
        let loader = CountingLoader::default();
        let loads = Rc::clone(&loader.loads);
        (PreviewService::with_loader(Rc::new(loader)), loads)
    }

    fn body_html(service: &PreviewService) -> String {
        let sandbox = service.ensure_ready(&RenderOptions::default()).unwrap();
        let document = sandbox.environment().document();
        document.inner_html(document.body_id()).unwrap()
    }

    #[tokio::test]
    async fn test_renders_markup_and_detaches_container() {
        let (service, _) = service();
        let rendered = service
            .render_widget_to_dom("Hello", &json!({}), &RenderOptions::default())
            .await
            .unwrap();

        assert_eq!(rendered.html, r#"<section class="widget">Hello</section>"#);
        let element = rendered.element.unwrap();
        assert_eq!(element.tag_name, "SECTION");
        assert_eq!(element.get_attribute("class"), Some("widget"));
        assert_eq!(body_html(&service), "");
    }

    #[tokio::test]
    async fn test_html_variant_matches_dom_variant() {
        let (service, _) = service();
        let html = service
            .render_widget_to_html("Card", &json!({"a": 1}), &RenderOptions::default())
            .await
            .unwrap();
        assert_eq!(html, r#"<section class="widget">Card</section>"#);
    }

    #[tokio::test]
    async fn test_failed_mount_still_detaches_container() {
        let (service, _) = service();
        let err = service
            .render_widget_to_html("throw-on-mount", &json!({}), &RenderOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, WidgetError::RenderExecution(ref m) if m == "stub mount failed"));
        assert_eq!(body_html(&service), "");
    }

    #[tokio::test]
    async fn test_failure_while_settling_unmounts_and_detaches() {
        let (service, _) = service();
        let err = service
            .render_widget_to_html("throw-on-commit", &json!({}), &RenderOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "RenderExecutionError");
        assert_eq!(body_html(&service), "");

        // The sandbox survives a failed render.
        let html = service
            .render_widget_to_html("ok", &json!({}), &RenderOptions::default())
            .await
            .unwrap();
        assert_eq!(html, r#"<section class="widget">ok</section>"#);
    }

    #[tokio::test]
    async fn test_concurrent_first_renders_build_once() {
        let (service, loads) = service();
        let options = RenderOptions::default();
        let state = json!({});
        let (a, b) = tokio::join!(
            service.render_widget_to_html("A", &state, &options),
            service.render_widget_to_html("B", &state, &options),
        );
        assert_eq!(a.unwrap(), r#"<section class="widget">A</section>"#);
        assert_eq!(b.unwrap(), r#"<section class="widget">B</section>"#);
        assert_eq!(loads.get(), 1);
        assert_eq!(body_html(&service), "");
    }

    #[tokio::test]
    async fn test_failing_timer_is_charged_to_its_own_render() {
        let (service, _) = service();
        let state = json!({});
        let failing_options = RenderOptions::default().with_flush_delay(Duration::from_millis(200));
        let blocking_options = RenderOptions::default().with_flush_delay(Duration::from_millis(100));

        // The blocking render's loop ends up firing the failing render's commit.
        let failing = service.render_widget_to_html("slow throw-on-commit", &state, &failing_options);
        let blocking = async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            service
                .render_widget_to_html("block", &state, &blocking_options)
                .await
        };
        let (failing, blocking) = tokio::join!(failing, blocking);

        assert!(matches!(failing, Err(WidgetError::RenderExecution(ref m)) if m == "stub commit failed"));
        assert_eq!(blocking.unwrap(), r#"<section class="widget">block</section>"#);
        assert_eq!(body_html(&service), "");
    }

    #[test]
    fn test_blocking_render_runs_outside_a_runtime() {
        let (service, _) = service();
        let html = service
            .render_widget_to_html_blocking("Hello", &json!({}), &RenderOptions::default())
            .unwrap();
        assert_eq!(html, r#"<section class="widget">Hello</section>"#);
        assert_eq!(body_html(&service), "");
    }

    #[tokio::test]
    async fn test_settle_delay_controls_capture() {
        let (service, _) = service();
        let early = service
            .render_widget_to_html("slow", &json!({}), &RenderOptions::default())
            .await
            .unwrap();
        assert_eq!(early, "");

        let options = RenderOptions::default().with_flush_delay(Duration::from_millis(60));
        let settled = service
            .render_widget_to_html("slow", &json!({}), &options)
            .await
            .unwrap();
        assert_eq!(settled, r#"<section class="widget">slow</section>"#);
    }

    #[tokio::test]
    async fn test_reset_forces_rebuild() {
        let (service, loads) = service();
        service
            .render_widget_to_html("x", &json!({}), &RenderOptions::default())
            .await
            .unwrap();
        assert!(service.is_ready());

        service.reset();
        assert!(!service.is_ready());
        service
            .render_widget_to_html("x", &json!({}), &RenderOptions::default())
            .await
            .unwrap();
        assert_eq!(loads.get(), 2);
    }

    #[tokio::test]
    async fn test_reset_closes_injected_window() {
        let (service, _) = service();
        let window = Rc::new(BrowserEnvironment::new());
        let options = RenderOptions::default().with_window(Rc::clone(&window));
        service
            .render_widget_to_html("x", &json!({}), &options)
            .await
            .unwrap();
        assert!(!window.capabilities().is_empty());

        service.reset();
        assert!(window.is_closed());

        let err = service
            .render_widget_to_html("x", &json!({}), &options)
            .await
            .unwrap_err();
        assert!(matches!(err, WidgetError::RenderExecution(ref m) if m == MSG_ENVIRONMENT_CLOSED));
    }

    #[tokio::test]
    async fn test_bundle_failure_leaves_service_uninitialized() {
        let loader = CountingLoader {
            fail: true,
            ..Default::default()
        };
        let loads = Rc::clone(&loader.loads);
        let service = PreviewService::with_loader(Rc::new(loader));

        for _ in 0..2 {
            let err = service
                .render_widget_to_html("x", &json!({}), &RenderOptions::default())
                .await
                .unwrap_err();
            assert_eq!(err.to_string(), MSG_PREVIEW_UNDEFINED);
        }
        assert!(!service.is_ready());
        assert_eq!(loads.get(), 2);
    }
}
