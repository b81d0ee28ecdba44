//! Sphereboard Render Library
//!
//! Renderer abstraction and implementations for Sphereboard.
//! The default implementation uses Vello for GPU-accelerated rendering.

pub mod paths;
mod renderer;

#[cfg(feature = "vello-renderer")]
mod vello_impl;

pub use renderer::{
    EditingView, ElementRenderer, RenderContext, RenderResult, Renderer, RendererError,
};

#[cfg(feature = "vello-renderer")]
pub use vello_impl::VelloRenderer;
