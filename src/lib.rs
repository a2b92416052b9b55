#![warn(clippy::all, rust_2018_idioms)]

pub mod app;
pub mod color;
pub mod config;
pub mod error;
pub mod event;
pub mod export;
pub mod history;
pub mod input;
pub mod persistence;
pub mod renderer;
pub mod session;
pub mod stroke;
pub mod tools;

pub use app::SketchApp;
pub use config::CanvasConfig;
pub use error::SessionError;
pub use event::{CanvasEvent, Repaint};
pub use history::DrawingLog;
pub use input::{InputHandler, PointerInput};
pub use renderer::{Renderer, Surface};
pub use session::Session;
pub use stroke::{MutableStroke, Stroke, StrokeRef, StrokeStyle};
pub use tools::{ToolKind, ToolState};
