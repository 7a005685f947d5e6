//! Viewport state machine tying together transform, rendering and
//! highlighting.

use std::sync::Arc;

use executor::exec::Monitor;
use nalgebra::{vector, Vector2};
use tracing::{debug, trace, warn};

use crate::config::Config;
use crate::error::{ConfigError, RenderError};
use crate::pdf::Document;

pub mod highlight;
pub mod input;
pub mod render;
pub mod transform;

use self::highlight::{HighlightCompositor, HighlightRegion, HighlightSource};
use self::input::ScrollEvent;
use self::render::{
    PageBitmap, PageRenderer, RenderRequest, RenderResult, RenderScheduler, RenderedPage,
};
use self::transform::{Scrollable, ViewportState, ViewportTransform, Zoomable};

/// Everything a display surface needs to draw the current page.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Index of the page shown by `bitmap`.
    pub page_index: usize,

    /// Rendered page with highlights composited on top.
    pub bitmap: PageBitmap,

    pub state: ViewportState,

    /// Position of the upper left bitmap corner on screen.
    pub content_origin: Vector2<f64>,

    /// Size of the bitmap on screen.
    pub content_size: Vector2<f64>,
}

enum State {
    Empty,
    Ready(Ready),
}

struct Ready {
    document: Arc<dyn Document>,
    page_index: usize,
    page: Option<RenderedPage>,
    composited: Option<PageBitmap>,
}

pub struct DocumentViewport<M = ()> {
    config: Config,
    dpi: f64,
    transform: ViewportTransform,
    scheduler: RenderScheduler<M>,
    compositor: HighlightCompositor,
    highlights: Arc<[HighlightRegion]>,
    state: State,
}

impl DocumentViewport<()> {
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        Self::with_monitor(config, ())
    }
}

impl<M> DocumentViewport<M>
where
    M: Monitor + Clone + Send + Sync + 'static,
{
    /// Create a viewport whose render tasks report to `monitor`, e.g. to wake
    /// up the UI loop so that it calls [`poll()`][Self::poll()].
    pub fn with_monitor(config: Config, monitor: M) -> Result<Self, ConfigError> {
        config.validate()?;

        let renderer = PageRenderer::new(config.render);
        let scheduler = RenderScheduler::new(renderer, config.render_threads, monitor);

        Ok(Self {
            dpi: config.dpi,
            transform: ViewportTransform::new((config.scale_min, config.scale_max)),
            scheduler,
            compositor: HighlightCompositor::new(config.highlight_color),
            highlights: Arc::from(Vec::new()),
            state: State::Empty,
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn transform(&self) -> &ViewportTransform {
        &self.transform
    }

    pub fn document(&self) -> Option<&Arc<dyn Document>> {
        match &self.state {
            State::Ready(ready) => Some(&ready.document),
            State::Empty => None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.state, State::Ready(_))
    }

    pub fn page_count(&self) -> usize {
        self.document().map(|doc| doc.page_count()).unwrap_or(0)
    }

    /// Index of the page being shown or rendered.
    pub fn current_page_index(&self) -> Option<usize> {
        match &self.state {
            State::Ready(ready) => Some(ready.page_index),
            State::Empty => None,
        }
    }

    pub fn current_scale(&self) -> f64 {
        self.transform.scale()
    }

    pub fn render_dpi(&self) -> f64 {
        self.dpi
    }

    /// Whether a render for the current page is outstanding.
    pub fn is_rendering(&self) -> bool {
        self.scheduler.is_pending()
    }

    pub fn search_results(&self) -> &[HighlightRegion] {
        &self.highlights
    }

    /// Show a new document, starting at its first page.
    ///
    /// Search results belong to the previous document and are dropped.
    pub fn load_document(&mut self, document: Arc<dyn Document>) -> Result<(), RenderError> {
        debug!(pages = document.page_count(), "loading document");

        self.scheduler.cancel();
        self.highlights = Arc::from(Vec::new());
        self.transform.reset();

        self.state = State::Ready(Ready {
            document,
            page_index: 0,
            page: None,
            composited: None,
        });

        self.rerender_current_page()
    }

    /// Drop the document and any outstanding renders.
    pub fn close(&mut self) {
        if let State::Ready(_) = self.state {
            debug!("closing document");
        }

        self.scheduler.cancel();
        self.highlights = Arc::from(Vec::new());
        self.state = State::Empty;
    }

    /// The latest composited bitmap, if a page has been rendered.
    pub fn display_current_page(&self) -> Option<PageBitmap> {
        match &self.state {
            State::Ready(ready) => ready.composited.clone(),
            State::Empty => None,
        }
    }

    fn rerender_current_page(&mut self) -> Result<(), RenderError> {
        let State::Ready(ready) = &self.state else {
            return Ok(());
        };

        if ready.document.page_count() == 0 {
            debug!("document has no pages, nothing to render");
            return Ok(());
        }

        let request = RenderRequest {
            page_index: ready.page_index,
            target_dpi: self.dpi,
        };

        self.scheduler.request(ready.document.clone(), request);

        // inline renders are available right away
        if self.config.render_threads == 0 {
            self.poll()?;
        }

        Ok(())
    }

    /// Navigate to the given page. Out-of-range indices are clamped to the
    /// first or last page.
    pub fn go_to_page(&mut self, index: i64) -> Result<(), RenderError> {
        let State::Ready(ready) = &mut self.state else {
            return Ok(());
        };

        let count = ready.document.page_count();
        if count == 0 {
            return Ok(());
        }

        let target = index.clamp(0, count as i64 - 1) as usize;
        if target == ready.page_index {
            return Ok(());
        }

        debug!(from = ready.page_index, to = target, requested = index, "changing page");

        ready.page_index = target;
        self.rerender_current_page()
    }

    pub fn next_page(&mut self) -> Result<(), RenderError> {
        match self.current_page_index() {
            Some(index) => self.go_to_page(index as i64 + 1),
            None => Ok(()),
        }
    }

    pub fn previous_page(&mut self) -> Result<(), RenderError> {
        match self.current_page_index() {
            Some(index) => self.go_to_page(index as i64 - 1),
            None => Ok(()),
        }
    }

    /// Handle a scroll event: zoom at the pointer with Ctrl held, otherwise
    /// flip pages.
    pub fn on_scroll(&mut self, event: ScrollEvent) -> Result<(), RenderError> {
        if event.ctrl_held {
            self.zoom_at(event.delta.y, event.point);
            return Ok(());
        }

        if event.delta.y < 0.0 {
            self.next_page()
        } else if event.delta.y > 0.0 {
            self.previous_page()
        } else {
            Ok(())
        }
    }

    /// Replace the highlighted regions and re-composite the current page.
    pub fn set_search_results<I>(&mut self, regions: I)
    where
        I: IntoIterator<Item = HighlightRegion>,
    {
        self.highlights = regions.into_iter().collect();

        debug!(regions = self.highlights.len(), "updated search results");

        self.composite();
    }

    /// Take a fresh snapshot of the regions provided by `source`.
    pub fn sync_highlights<S>(&mut self, source: &S)
    where
        S: HighlightSource + ?Sized,
    {
        self.set_search_results(source.current_highlight_regions());
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.transform.resize_viewport(width, height);
        self.update_content_size();
    }

    pub fn set_zoom(&mut self, scale: f64) {
        self.transform.set_scale(scale);
    }

    /// Zoom by the given wheel delta, keeping the content under `point`
    /// fixed. Returns `false` if the zoom was rejected.
    pub fn zoom_at(&mut self, wheel_delta: f64, point: Vector2<f64>) -> bool {
        self.transform
            .zoom_at(wheel_delta, point, self.config.zoom_intensity)
    }

    pub fn scroll_by(&mut self, dx: f64, dy: f64) {
        self.transform.scroll_by(vector![dx, dy]);
    }

    /// Change the rasterization resolution and re-render the current page.
    pub fn set_render_dpi(&mut self, dpi: f64) -> Result<(), RenderError> {
        if !dpi.is_finite() || dpi <= 0.0 {
            return Err(RenderError::InvalidResolution(dpi));
        }

        if dpi == self.dpi {
            return Ok(());
        }

        debug!(from = self.dpi, to = dpi, "changing render resolution");

        self.dpi = dpi;
        self.rerender_current_page()
    }

    /// Apply a finished render, if there is one. Returns whether the
    /// displayed page changed.
    pub fn poll(&mut self) -> Result<bool, RenderError> {
        match self.scheduler.poll() {
            Some(result) => self.apply(result),
            None => Ok(false),
        }
    }

    /// Block until the outstanding render, if any, has been applied.
    pub fn wait(&mut self) -> Result<bool, RenderError> {
        match self.scheduler.wait() {
            Some(result) => self.apply(result),
            None => Ok(false),
        }
    }

    /// The frame to display, if a page has been rendered.
    pub fn frame(&self) -> Option<Frame> {
        let State::Ready(ready) = &self.state else {
            return None;
        };

        let page = ready.page.as_ref()?;
        let bitmap = ready.composited.clone()?;

        Some(Frame {
            page_index: page.request.page_index,
            bitmap,
            state: self.transform.state(),
            content_origin: self.transform.content_origin(),
            content_size: self.transform.content_bounds(),
        })
    }

    fn apply(&mut self, result: RenderResult) -> Result<bool, RenderError> {
        let State::Ready(ready) = &mut self.state else {
            return Ok(false);
        };

        let page = match result {
            Ok(page) => page,
            Err(err) => {
                warn!(page = ready.page_index, error = %err, "failed to render page");
                return Err(err);
            }
        };

        trace!(
            page = page.request.page_index,
            width = page.bitmap.width(),
            height = page.bitmap.height(),
            "applying rendered page"
        );

        let next = RenderRequest {
            page_index: page.request.page_index + 1,
            target_dpi: page.request.target_dpi,
        };
        let document = ready.document.clone();

        ready.page = Some(page);

        self.composite();
        self.update_content_size();

        if self.config.prefetch && next.page_index < document.page_count() {
            self.scheduler.prefetch(document, next);
        }

        Ok(true)
    }

    fn composite(&mut self) {
        let State::Ready(ready) = &mut self.state else {
            return;
        };

        if let Some(page) = &ready.page {
            ready.composited = Some(self.compositor.composite(
                &page.bitmap,
                page.request.page_index,
                page.crop_height,
                &self.highlights,
            ));
        }
    }

    fn update_content_size(&mut self) {
        let State::Ready(Ready { page: Some(page), .. }) = &self.state else {
            return;
        };

        let size = vector![page.bitmap.width() as f64, page.bitmap.height() as f64];
        let viewport = self.transform.viewport_bounds();

        let size = if self.config.fit_height && viewport.y > 0.0 && size.y > 0.0 {
            size * (viewport.y / size.y)
        } else {
            size
        };

        self.transform.set_content_size(size.x, size.y);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use std::time::Duration;

    use crate::core::highlight::HIGHLIGHT_COLOR;
    use crate::core::render::Color;
    use crate::pdf::{MemoryDocument, MemoryPage};

    fn init_logging() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    }

    fn inline_config() -> Config {
        Config {
            dpi: 72.0,
            render_threads: 0,
            prefetch: false,
            ..Config::default()
        }
    }

    fn viewport(config: Config, document: &Arc<MemoryDocument>) -> DocumentViewport {
        let mut vp = DocumentViewport::new(config).unwrap();
        vp.resize(800.0, 600.0);
        vp.load_document(document.clone()).unwrap();
        vp
    }

    fn corner(vp: &DocumentViewport) -> Option<Color> {
        vp.frame().and_then(|f| f.bitmap.pixel(0, 0))
    }

    #[test]
    fn page_index_is_clamped() {
        init_logging();

        let doc = Arc::new(MemoryDocument::uniform(10, 100.0, 100.0));
        let mut vp = viewport(inline_config(), &doc);

        vp.go_to_page(-5).unwrap();
        assert_eq!(vp.current_page_index(), Some(0));

        vp.go_to_page(50).unwrap();
        assert_eq!(vp.current_page_index(), Some(9));
        assert_eq!(vp.frame().unwrap().page_index, 9);

        vp.next_page().unwrap();
        assert_eq!(vp.current_page_index(), Some(9));
    }

    #[test]
    fn same_page_is_not_rendered_again() {
        let doc = Arc::new(MemoryDocument::uniform(3, 100.0, 100.0));
        let mut vp = viewport(inline_config(), &doc);

        vp.go_to_page(0).unwrap();
        vp.go_to_page(-1).unwrap();
        assert_eq!(doc.render_count(), 1);
    }

    #[test]
    fn latest_page_request_is_displayed() {
        init_logging();

        let mut pages = MemoryDocument::uniform(10, 100.0, 100.0).pages().to_vec();
        pages[3] = pages[3].clone().with_delay(Duration::from_millis(200));
        let doc = Arc::new(MemoryDocument::new(pages));

        let config = Config {
            dpi: 72.0,
            prefetch: false,
            ..Config::default()
        };

        let mut vp = viewport(config, &doc);
        assert!(vp.wait().unwrap());

        vp.go_to_page(3).unwrap();
        vp.go_to_page(5).unwrap();
        assert!(vp.is_rendering());

        assert!(vp.wait().unwrap());
        assert_eq!(vp.frame().unwrap().page_index, 5);
        assert_eq!(corner(&vp), Some(MemoryDocument::page_color(5)));

        // the superseded render never shows up
        std::thread::sleep(Duration::from_millis(300));
        assert!(!vp.poll().unwrap());
        assert_eq!(vp.frame().unwrap().page_index, 5);
        assert!(!vp.is_rendering());
    }

    #[test]
    fn scroll_flips_pages() {
        let doc = Arc::new(MemoryDocument::uniform(3, 100.0, 100.0));
        let mut vp = viewport(inline_config(), &doc);
        let point = vector![10.0, 10.0];

        vp.on_scroll(ScrollEvent::new(vector![0.0, 1.0], point, false)).unwrap();
        assert_eq!(vp.current_page_index(), Some(0));

        vp.on_scroll(ScrollEvent::new(vector![0.0, -1.0], point, false)).unwrap();
        assert_eq!(vp.current_page_index(), Some(1));

        vp.on_scroll(ScrollEvent::new(vector![3.0, 0.0], point, false)).unwrap();
        assert_eq!(vp.current_page_index(), Some(1));

        vp.on_scroll(ScrollEvent::new(vector![0.0, 1.0], point, false)).unwrap();
        assert_eq!(vp.current_page_index(), Some(0));
    }

    #[test]
    fn ctrl_scroll_zooms_without_rendering() {
        let doc = Arc::new(MemoryDocument::uniform(3, 100.0, 100.0));
        let mut vp = viewport(inline_config(), &doc);
        let renders = doc.render_count();

        vp.on_scroll(ScrollEvent::new(vector![0.0, 50.0], vector![400.0, 300.0], true))
            .unwrap();

        assert!((vp.current_scale() - std::f64::consts::E).abs() < 1e-12);
        assert_eq!(vp.current_page_index(), Some(0));
        assert_eq!(doc.render_count(), renders);

        vp.set_zoom(1e6);
        assert_eq!(vp.current_scale(), 10.0);
        vp.scroll_by(-50.0, 20.0);
        assert_eq!(vp.frame().unwrap().state.scale, 10.0);
        assert_eq!(doc.render_count(), renders);
    }

    #[test]
    fn search_results_are_composited_without_rendering() {
        let doc = Arc::new(MemoryDocument::uniform(2, 100.0, 100.0));
        let mut vp = viewport(inline_config(), &doc);
        let paper = MemoryDocument::page_color(0);

        vp.set_search_results([
            HighlightRegion::new(0, 10.0, 80.0, 10.0, 10.0),
            HighlightRegion::new(1, 50.0, 50.0, 10.0, 10.0),
        ]);

        let frame = vp.frame().unwrap();
        assert_eq!(frame.bitmap.pixel(15, 15), Some(HIGHLIGHT_COLOR.over(paper)));
        assert_eq!(frame.bitmap.pixel(55, 45), Some(paper));
        assert_eq!(doc.render_count(), 1);

        vp.set_search_results(Vec::new());
        assert_eq!(vp.frame().unwrap().bitmap.pixel(15, 15), Some(paper));
        assert_eq!(doc.render_count(), 1);
    }

    #[test]
    fn highlights_follow_page_changes() {
        struct Session(Vec<HighlightRegion>);

        impl HighlightSource for Session {
            fn current_highlight_regions(&self) -> Vec<HighlightRegion> {
                self.0.clone()
            }
        }

        let doc = Arc::new(MemoryDocument::uniform(2, 100.0, 100.0));
        let mut vp = viewport(inline_config(), &doc);

        vp.sync_highlights(&Session(vec![HighlightRegion::new(1, 0.0, 0.0, 100.0, 100.0)]));
        assert_eq!(corner(&vp), Some(MemoryDocument::page_color(0)));

        vp.next_page().unwrap();
        assert_eq!(
            corner(&vp),
            Some(HIGHLIGHT_COLOR.over(MemoryDocument::page_color(1)))
        );
    }

    #[test]
    fn render_error_keeps_last_bitmap() {
        init_logging();

        let doc = Arc::new(MemoryDocument::new(vec![
            MemoryPage::new(100.0, 100.0),
            MemoryPage::new(100.0, 100.0).malformed(),
        ]));
        let mut vp = viewport(inline_config(), &doc);

        let err = vp.go_to_page(1).unwrap_err();
        assert!(matches!(err, RenderError::Rasterize { page: 1, .. }));

        assert_eq!(vp.current_page_index(), Some(1));
        assert_eq!(vp.frame().unwrap().page_index, 0);
    }

    #[test]
    fn load_resets_view_and_search_results() {
        let doc = Arc::new(MemoryDocument::uniform(3, 100.0, 100.0));
        let mut vp = viewport(inline_config(), &doc);

        vp.set_search_results([HighlightRegion::new(0, 0.0, 0.0, 10.0, 10.0)]);
        vp.go_to_page(2).unwrap();
        vp.set_zoom(3.0);

        vp.load_document(Arc::new(MemoryDocument::uniform(1, 50.0, 50.0))).unwrap();

        assert!(vp.search_results().is_empty());
        assert_eq!(vp.current_page_index(), Some(0));
        assert_eq!(vp.current_scale(), 1.0);
        assert_eq!(vp.page_count(), 1);
        assert_eq!(vp.frame().unwrap().bitmap.width(), 50);
    }

    #[test]
    fn empty_document_renders_nothing() {
        let mut vp = DocumentViewport::new(inline_config()).unwrap();
        vp.load_document(Arc::new(MemoryDocument::new(Vec::new()))).unwrap();

        assert!(vp.is_loaded());
        assert!(vp.frame().is_none());
        assert!(!vp.is_rendering());

        vp.go_to_page(3).unwrap();
        assert_eq!(vp.current_page_index(), Some(0));
    }

    #[test]
    fn close_returns_to_empty() {
        let doc = Arc::new(MemoryDocument::uniform(3, 100.0, 100.0));
        let mut vp = viewport(Config::default(), &doc);

        vp.close();

        assert!(!vp.is_loaded());
        assert!(!vp.is_rendering());
        assert!(vp.frame().is_none());
        assert_eq!(vp.page_count(), 0);
        assert_eq!(vp.current_page_index(), None);

        vp.go_to_page(1).unwrap();
        assert!(!vp.wait().unwrap());
    }

    #[test]
    fn resolution_change_rerenders() {
        let doc = Arc::new(MemoryDocument::uniform(1, 100.0, 100.0));
        let mut vp = viewport(inline_config(), &doc);

        vp.set_render_dpi(144.0).unwrap();
        assert_eq!(vp.frame().unwrap().bitmap.width(), 200);
        assert_eq!(doc.render_count(), 2);

        vp.set_render_dpi(144.0).unwrap();
        assert_eq!(doc.render_count(), 2);

        assert!(matches!(
            vp.set_render_dpi(0.0),
            Err(RenderError::InvalidResolution(_))
        ));
        assert_eq!(vp.render_dpi(), 144.0);
    }

    #[test]
    fn content_is_fitted_to_viewport_height() {
        let doc = Arc::new(MemoryDocument::uniform(1, 612.0, 792.0));

        let config = Config {
            dpi: 144.0,
            ..inline_config()
        };
        let vp = viewport(config.clone(), &doc);
        let size = vp.transform().content_size();
        assert!((size.x - 1224.0 * 600.0 / 1584.0).abs() < 1e-9);
        assert!((size.y - 600.0).abs() < 1e-9);

        let config = Config {
            fit_height: false,
            ..config
        };
        let vp = viewport(config, &doc);
        assert_eq!(vp.transform().content_size(), vector![1224.0, 1584.0]);
    }

    #[test]
    fn next_page_is_prefetched() {
        let doc = Arc::new(MemoryDocument::uniform(2, 100.0, 100.0));

        let config = Config {
            dpi: 72.0,
            ..Config::default()
        };
        let mut vp = viewport(config, &doc);

        assert!(vp.wait().unwrap());
        vp.next_page().unwrap();
        assert!(vp.wait().unwrap());

        assert_eq!(corner(&vp), Some(MemoryDocument::page_color(1)));
        assert_eq!(doc.render_count(), 2);
    }

    #[test]
    fn current_page_is_displayed_without_rendering() {
        let doc = Arc::new(MemoryDocument::uniform(2, 100.0, 100.0));
        let mut vp = viewport(inline_config(), &doc);
        vp.set_search_results([HighlightRegion::new(0, 0.0, 0.0, 10.0, 10.0)]);

        let shown = vp.display_current_page().unwrap();
        assert!(shown.shares_pixels(&vp.frame().unwrap().bitmap));
        assert!(vp.display_current_page().unwrap().shares_pixels(&shown));
        assert_eq!(doc.render_count(), 1);

        vp.close();
        assert!(vp.display_current_page().is_none());
    }

    #[test]
    fn zoom_and_pan_reuse_composited_bitmap() {
        let doc = Arc::new(MemoryDocument::uniform(2, 100.0, 100.0));
        let mut vp = viewport(inline_config(), &doc);
        vp.set_search_results([HighlightRegion::new(0, 10.0, 10.0, 20.0, 20.0)]);

        let before = vp.frame().unwrap();

        assert!(vp.zoom_at(30.0, vector![100.0, 100.0]));
        vp.scroll_by(25.0, -10.0);
        vp.resize(1024.0, 768.0);

        let after = vp.frame().unwrap();
        assert!(after.bitmap.shares_pixels(&before.bitmap));
        assert_ne!(after.state, before.state);
        assert_eq!(doc.render_count(), 1);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = Config {
            zoom_intensity: 0.0,
            ..Config::default()
        };

        assert!(matches!(
            DocumentViewport::new(config),
            Err(ConfigError::ZoomIntensity(_))
        ));
    }
}
