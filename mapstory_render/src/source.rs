// Copyright 2025 the Mapstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use kurbo::Rect;
use mapstory_geom::Geometry;

use crate::SourceError;

/// Features yielded by a [`FeatureSource`] query.
pub type FeatureIter<'s, F> = Box<dyn Iterator<Item = Result<(F, Geometry), SourceError>> + 's>;

/// A provider of vector features, such as a GeoPackage feature table.
pub trait FeatureSource<F> {
    /// Name used in log messages.
    fn name(&self) -> &str;

    /// Features whose geometry may intersect `bounds` (world units).
    ///
    /// Returning extra features is allowed; the renderer draws whatever it
    /// is given. A failing item aborts the layer.
    ///
    /// # Errors
    ///
    /// Any failure to start the query.
    fn query(&self, bounds: Rect) -> Result<FeatureIter<'_, F>, SourceError>;
}

/// Pixel format of a [`Raster`].
#[derive(Clone, PartialEq, Eq)]
pub enum RasterData {
    /// Straight-alpha RGBA8, 4 bytes per pixel.
    Rgba8(Vec<u8>),
    /// 8-bit gray, 1 byte per pixel, drawn opaque.
    Gray8(Vec<u8>),
}

impl core::fmt::Debug for RasterData {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Rgba8(b) => f.debug_tuple("Rgba8").field(&b.len()).finish(),
            Self::Gray8(b) => f.debug_tuple("Gray8").field(&b.len()).finish(),
        }
    }
}

/// A block of raster pixels, rows from north to south.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Raster {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixels.
    pub data: RasterData,
}

impl Raster {
    /// Converts to straight-alpha RGBA8.
    ///
    /// # Errors
    ///
    /// Fails when the byte count does not match the size and format.
    pub fn into_rgba8(self) -> Result<Vec<u8>, SourceError> {
        let pixels = self.width as usize * self.height as usize;
        match self.data {
            RasterData::Rgba8(bytes) => {
                if bytes.len() != pixels * 4 {
                    return Err(SourceError::RasterSize {
                        expected: pixels * 4,
                        actual: bytes.len(),
                    });
                }
                Ok(bytes)
            }
            RasterData::Gray8(bytes) => {
                if bytes.len() != pixels {
                    return Err(SourceError::RasterSize {
                        expected: pixels,
                        actual: bytes.len(),
                    });
                }
                Ok(bytes.iter().flat_map(|&v| [v, v, v, 255]).collect())
            }
        }
    }
}

/// A provider of non-tiled raster imagery.
pub trait RasterSource {
    /// Name used in log messages.
    fn name(&self) -> &str;

    /// World bounds of the imagery.
    fn bounds(&self) -> Rect;

    /// Reads `bounds` (world units) resampled to `width` × `height` pixels.
    ///
    /// # Errors
    ///
    /// Any failure to read the imagery.
    fn read(&self, bounds: Rect, width: u32, height: u32) -> Result<Raster, SourceError>;
}

#[cfg(test)]
mod tests {
    use super::{Raster, RasterData};
    use crate::SourceError;

    #[test]
    fn gray_expands_to_opaque_rgba() {
        let raster = Raster {
            width: 2,
            height: 1,
            data: RasterData::Gray8(vec![10, 200]),
        };
        assert_eq!(
            raster.into_rgba8().unwrap(),
            vec![10, 10, 10, 255, 200, 200, 200, 255]
        );
    }

    #[test]
    fn wrong_size_is_rejected() {
        let raster = Raster {
            width: 2,
            height: 2,
            data: RasterData::Rgba8(vec![0; 12]),
        };
        assert!(matches!(
            raster.into_rgba8(),
            Err(SourceError::RasterSize {
                expected: 16,
                actual: 12
            })
        ));
    }
}
