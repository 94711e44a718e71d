//! Raster images
use crate::{
    error::{Error, Result},
    traits::BitEq,
};

/// Interleaved 8-bit image
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Image {
    width: usize,
    height: usize,
    channels: usize,
    pixels: Vec<u8>,
}

impl BitEq for Image {
    fn bit_eq(&self, other: &Self) -> bool {
        self == other
    }
}

impl Image {
    /// Create an image from interleaved pixel data
    pub fn new(width: usize, height: usize, channels: usize, pixels: Vec<u8>) -> Result<Self> {
        if pixels.len() != width * height * channels {
            return Err(Error::InvalidInput(format!(
                "a {width}x{height} image with {channels} channels needs {} bytes, got {}",
                width * height * channels,
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            channels,
            pixels,
        })
    }

    /// Width in pixels
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in pixels
    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of interleaved channels
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Interleaved pixel data
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Does the pixel data match the dimensions?
    pub fn is_consistent(&self) -> bool {
        self.pixels.len() == self.width * self.height * self.channels
    }

    /// Number of bytes in one row
    pub fn row_len(&self) -> usize {
        self.width * self.channels
    }

    /// Value of channel `c` at `(row, col)`
    pub fn get(&self, row: usize, col: usize, c: usize) -> u8 {
        self.pixels[(row * self.width + col) * self.channels + c]
    }
}
