use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use nalgebra::vector;

use pageview::config::Config;
use pageview::core::highlight::HighlightRegion;
use pageview::core::input::ScrollEvent;
use pageview::core::DocumentViewport;
use pageview::pdf::MemoryDocument;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let mut args = std::env::args_os().skip(1);
    let output = args.next().map(PathBuf::from).unwrap_or_else(|| "page.png".into());
    let page: i64 = match args.next() {
        Some(arg) => arg.to_string_lossy().parse()?,
        None => 0,
    };

    // US letter pages with synthetic text lines
    let document = Arc::new(MemoryDocument::uniform(10, 612.0, 792.0));

    let mut viewport = DocumentViewport::new(Config::default())?;
    viewport.resize(800.0, 600.0);
    viewport.load_document(document)?;
    viewport.go_to_page(page)?;

    let index = viewport.current_page_index().unwrap_or(0);
    viewport.set_search_results([
        HighlightRegion::new(index, 72.0, 708.0, 200.0, 8.0),
        HighlightRegion::new(index, 72.0, 600.0, 120.0, 8.0),
    ]);

    viewport.on_scroll(ScrollEvent::new(vector![0.0, 20.0], vector![400.0, 300.0], true))?;
    viewport.wait()?;

    let frame = viewport.frame().ok_or("no page rendered")?;

    tracing::info!(
        page = frame.page_index,
        scale = frame.state.scale,
        width = frame.bitmap.width(),
        height = frame.bitmap.height(),
        "rendered frame"
    );

    let image = image::RgbaImage::from_raw(
        frame.bitmap.width(),
        frame.bitmap.height(),
        frame.bitmap.pixels().to_vec(),
    )
    .ok_or("bitmap size mismatch")?;

    image.save(&output)?;
    println!("{}", output.display());

    Ok(())
}
