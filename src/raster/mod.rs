//! Raster rendering of static figures: scene construction and plotters drawing.

mod compile;
mod draw;
mod scene;

pub use compile::compile;
pub use draw::{render_png, render_svg};
pub use scene::{DrawCommand, Legend, LegendKind, Marker, PanelScene, PointShape, Scale, SceneGraph};
