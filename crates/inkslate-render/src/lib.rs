//! Inkslate Render Library
//!
//! Backends for Inkslate command logs. The default raster surface uses
//! `vello_cpu` so it runs headless; SVG output needs no rendering engine.

pub mod decoder;
mod renderer;
pub mod svg;

#[cfg(feature = "cpu-renderer")]
mod vello_impl;

pub use decoder::ImageCrateDecoder;
pub use renderer::{LogRenderer, RenderResult, RendererError};
pub use svg::{SvgExport, SvgRenderer, export_svg};

#[cfg(feature = "cpu-renderer")]
pub use vello_impl::{PngRenderer, VelloCpuSurface};
