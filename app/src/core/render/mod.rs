mod interop;
pub use interop::{BitmapFormat, Color, PageBitmap, RawImage};

mod renderer;
pub use renderer::{PageRenderer, RenderFlags, RenderOptions, RenderRequest, RenderedPage};

mod scheduler;
pub use scheduler::{RenderPriority, RenderResult, RenderScheduler};
