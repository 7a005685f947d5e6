use std::sync::Arc;

use executor::exec::priority::DropHandle;
use executor::exec::Monitor;
use tracing::debug;

use crate::error::RenderError;
use crate::pdf::Document;

use super::{PageRenderer, RenderRequest, RenderedPage};

pub type RenderResult = Result<RenderedPage, RenderError>;

type Executor = executor::exec::priority::Executor<RenderPriority>;
type TaskHandle = DropHandle<RenderPriority, RenderResult>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum RenderPriority {
    Low,
    High,
}

impl executor::exec::priority::Priority for RenderPriority {
    fn count() -> u8 {
        2
    }

    fn from_value(value: u8) -> Option<Self> {
        match value {
            0 => Some(RenderPriority::Low),
            1 => Some(RenderPriority::High),
            _ => None,
        }
    }

    fn as_value(&self) -> u8 {
        match self {
            RenderPriority::Low => 0,
            RenderPriority::High => 1,
        }
    }
}

struct Pending {
    request: RenderRequest,
    task: TaskHandle,
}

enum Backend {
    Inline { ready: Option<RenderResult> },
    Pool { exec: Executor, prefetch: Option<Pending> },
}

/// Runs page renders in the background, keeping at most one current request.
///
/// Requesting a different page or resolution supersedes the current one. The
/// superseded task is canceled if it is still queued. If it is already
/// running, its result is dropped once it completes.
///
/// With zero threads, rendering happens inline on the requesting thread and
/// the result is handed out by the next [`poll()`][Self::poll()].
pub struct RenderScheduler<M = ()> {
    renderer: PageRenderer,
    monitor: M,
    backend: Backend,
    current: Option<Pending>,
}

impl<M> RenderScheduler<M>
where
    M: Monitor + Clone + Send + Sync + 'static,
{
    pub fn new(renderer: PageRenderer, num_threads: u32, monitor: M) -> Self {
        let backend = if num_threads == 0 {
            Backend::Inline { ready: None }
        } else {
            Backend::Pool {
                exec: Executor::new(num_threads),
                prefetch: None,
            }
        };

        Self {
            renderer,
            monitor,
            backend,
            current: None,
        }
    }

    pub fn renderer(&self) -> &PageRenderer {
        &self.renderer
    }

    /// The request whose result will be handed out next, if any.
    pub fn current_request(&self) -> Option<RenderRequest> {
        match &self.backend {
            Backend::Inline { ready: Some(Ok(page)) } => Some(page.request),
            _ => self.current.as_ref().map(|p| p.request),
        }
    }

    /// Whether a result is outstanding or waiting to be picked up.
    pub fn is_pending(&self) -> bool {
        match &self.backend {
            Backend::Inline { ready } => ready.is_some(),
            Backend::Pool { .. } => self.current.is_some(),
        }
    }

    /// Make `request` the current render, superseding any previous one.
    pub fn request(&mut self, document: Arc<dyn Document>, request: RenderRequest) {
        if self.current.as_ref().map(|p| p.request) == Some(request) {
            return;
        }

        match &mut self.backend {
            Backend::Inline { ready } => {
                debug!(
                    page = request.page_index,
                    dpi = request.target_dpi,
                    "rendering inline"
                );

                *ready = Some(self.renderer.render_page(&*document, request));
            }
            Backend::Pool { exec, prefetch } => {
                // promote a matching prefetch instead of rendering twice
                if prefetch.as_ref().map(|p| p.request) == Some(request) {
                    if let Some(pending) = prefetch.take() {
                        debug!(page = request.page_index, "promoting prefetched render");

                        pending.task.set_priority(RenderPriority::High);
                        self.current = Some(pending);
                        return;
                    }
                }

                if let Some(old) = &self.current {
                    debug!(
                        page = old.request.page_index,
                        dpi = old.request.target_dpi,
                        "superseding render"
                    );
                }

                debug!(
                    page = request.page_index,
                    dpi = request.target_dpi,
                    "requesting render"
                );

                let task = Self::submit(
                    exec,
                    &self.renderer,
                    &self.monitor,
                    document,
                    request,
                    RenderPriority::High,
                );

                // replacing the handle cancels the superseded task
                self.current = Some(Pending { request, task });
            }
        }
    }

    /// Render `request` at low priority so that a later
    /// [`request()`][Self::request()] for it can pick up the result.
    ///
    /// Has no effect when rendering inline.
    pub fn prefetch(&mut self, document: Arc<dyn Document>, request: RenderRequest) {
        let Backend::Pool { exec, prefetch } = &mut self.backend else {
            return;
        };

        if self.current.as_ref().map(|p| p.request) == Some(request)
            || prefetch.as_ref().map(|p| p.request) == Some(request)
        {
            return;
        }

        debug!(
            page = request.page_index,
            dpi = request.target_dpi,
            "prefetching page"
        );

        let task = Self::submit(
            exec,
            &self.renderer,
            &self.monitor,
            document,
            request,
            RenderPriority::Low,
        );

        *prefetch = Some(Pending { request, task });
    }

    /// Take the result of the current render if it has completed.
    pub fn poll(&mut self) -> Option<RenderResult> {
        if let Backend::Inline { ready } = &mut self.backend {
            return ready.take();
        }

        if !self.current.as_ref()?.task.is_finished() {
            return None;
        }

        self.current.take().map(|pending| pending.task.join())
    }

    /// Block until the current render has completed and return its result.
    pub fn wait(&mut self) -> Option<RenderResult> {
        if let Backend::Inline { ready } = &mut self.backend {
            return ready.take();
        }

        self.current.take().map(|pending| pending.task.join())
    }

    /// Drop all outstanding renders, including prefetches.
    pub fn cancel(&mut self) {
        self.current = None;

        match &mut self.backend {
            Backend::Inline { ready } => *ready = None,
            Backend::Pool { prefetch, .. } => *prefetch = None,
        }
    }

    fn submit(
        exec: &Executor,
        renderer: &PageRenderer,
        monitor: &M,
        document: Arc<dyn Document>,
        request: RenderRequest,
        priority: RenderPriority,
    ) -> TaskHandle {
        let renderer = renderer.clone();

        exec.submit_with(monitor.clone(), priority, move || {
            renderer.render_page(&*document, request)
        })
        .cancel_on_drop()
    }
}
