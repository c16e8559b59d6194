// Raster output: fill state, glyph drawing, the sheet painter and PNG encoding.
// CPU-bound; callers on the async runtime go through tokio::task::spawn_blocking.

pub mod encode;
pub mod fill;
pub mod sheet;
pub mod text;

pub use fill::FillState;
pub use sheet::{SheetRenderer, TitleAlign};
