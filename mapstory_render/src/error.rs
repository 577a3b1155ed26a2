// Copyright 2025 the Mapstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use mapstory_tile::TileError;

/// Failure reported by a feature or raster source.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Free-form failure from the source implementation.
    #[error("{0}")]
    Message(String),
    /// I/O failure while reading the underlying store.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// Failure in a tile-backed source.
    #[error(transparent)]
    Tile(#[from] TileError),
    /// A raster read returned the wrong number of bytes.
    #[error("raster has {actual} bytes, expected {expected}")]
    RasterSize {
        /// Bytes implied by the requested size and pixel format.
        expected: usize,
        /// Bytes delivered.
        actual: usize,
    },
}

impl SourceError {
    /// A [`SourceError::Message`] from anything displayable.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }
}

/// Errors raised by the renderer.
///
/// Only [`Renderer::init`](crate::Renderer::init) and `render_png` return
/// these directly.
/// During [`Renderer::render`](crate::Renderer::render) they are caught at
/// the layer boundary, logged, and counted in
/// [`RenderStats`](crate::RenderStats).
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// A render option is out of range.
    #[error("invalid render option {name}: {value}")]
    InvalidOption {
        /// Option name.
        name: &'static str,
        /// Offending value.
        value: f64,
    },
    /// A layer's source failed.
    #[error("layer {layer}: {source}")]
    Source {
        /// Layer name.
        layer: String,
        /// Underlying failure.
        #[source]
        source: SourceError,
    },
    /// A tile layer's pyramid could not be built.
    #[error("layer {layer}: {source}")]
    Tiles {
        /// Layer name.
        layer: String,
        /// Underlying failure.
        #[source]
        source: TileError,
    },
    /// The finished bitmap could not be encoded.
    #[cfg(feature = "cpu")]
    #[error("failed to encode output: {0}")]
    Encode(String),
}
