// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use std::fmt::Debug;

use crate::error::{Error, Result};
use crate::util::tracing_wrappers::*;

/// Destination for decoded pixels, written one row at a time, top to
/// bottom. `set_size` is called once, before the first row; rows are
/// `width * channels` interleaved 8-bit samples.
pub trait PixelSink {
    fn set_size(&mut self, width: usize, height: usize, channels: usize) -> Result<()>;
    fn write_row(&mut self, y: usize, row: &[u8]) -> Result<()>;
}

/// An owned interleaved 8-bit image, the default pixel sink.
#[derive(Default)]
pub struct Image {
    size: (usize, usize),
    channels: usize,
    data: Vec<u8>,
}

impl Debug for Image {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Image {}x{} ({} channels)",
            self.size.0, self.size.1, self.channels
        )
    }
}

impl Image {
    #[instrument(err)]
    pub fn new(size: (usize, usize), channels: usize) -> Result<Image> {
        let (xsize, ysize) = size;
        // These limits let us not worry about overflows.
        if xsize as u64 >= i64::MAX as u64 / 8 || ysize as u64 >= i64::MAX as u64 / 8 {
            return Err(Error::ImageSizeTooLarge(xsize, ysize));
        }
        if xsize == 0 || ysize == 0 {
            return Err(Error::InvalidImageSize(xsize, ysize));
        }
        let total_size = xsize
            .checked_mul(ysize)
            .and_then(|s| s.checked_mul(channels))
            .ok_or(Error::ImageSizeTooLarge(xsize, ysize))?;
        debug!("trying to allocate image");
        let mut data = Vec::new();
        data.try_reserve_exact(total_size)?;
        data.resize(total_size, 0);
        Ok(Image {
            size,
            channels,
            data,
        })
    }

    pub fn size(&self) -> (usize, usize) {
        self.size
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn row(&self, y: usize) -> &[u8] {
        let stride = self.size.0 * self.channels;
        &self.data[y * stride..(y + 1) * stride]
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}

impl PixelSink for Image {
    fn set_size(&mut self, width: usize, height: usize, channels: usize) -> Result<()> {
        *self = Image::new((width, height), channels)?;
        Ok(())
    }

    fn write_row(&mut self, y: usize, row: &[u8]) -> Result<()> {
        let stride = self.size.0 * self.channels;
        debug_assert_eq!(row.len(), stride);
        self.data[y * stride..(y + 1) * stride].copy_from_slice(row);
        Ok(())
    }
}
