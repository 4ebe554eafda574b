pub mod resize;
pub mod viewport;
pub mod window;

pub use resize::{ResizeSignal, SizeWatcher};
pub use viewport::Viewport;
pub use window::{RowView, WindowRenderer};
