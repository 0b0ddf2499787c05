// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use crate::error::{Error, Result};
use crate::headers::frame::FrameHeader;

pub const BLOCK_SIZE: usize = 64;

/// Natural (row-major) position of the i-th coefficient in zig-zag order.
/// The zig-zag permutation is applied while decoding the entropy stream;
/// blocks are always stored in natural order.
pub const NATURAL_ORDER: [usize; BLOCK_SIZE] = [
    0, 1, 8, 16, 9, 2, 3, 10, 17, 24, 32, 25, 18, 11, 4, 5, 12, 19, 26, 33, 40, 48, 41, 34, 27, 20,
    13, 6, 7, 14, 21, 28, 35, 42, 49, 56, 57, 50, 43, 36, 29, 22, 15, 23, 30, 37, 44, 51, 58, 59,
    52, 45, 38, 31, 39, 46, 53, 60, 61, 54, 47, 55, 62, 63,
];

/// Quantized DCT coefficients for every component of a frame.
///
/// Each component owns a dense `blocks_x x blocks_y` grid of 8x8 blocks,
/// padded out to whole MCUs, with each block stored as 64 natural-order
/// values. Sequential scans fill each block once; progressive scans refine
/// blocks in place across scans.
#[derive(Debug)]
pub struct CoefficientStorage {
    planes: Vec<Vec<i32>>,
    blocks_x: Vec<usize>,
    blocks_y: Vec<usize>,
}

impl CoefficientStorage {
    /// Allocates zeroed grids sized from the frame's MCU grid and the
    /// per-component sampling factors.
    pub fn new(frame: &FrameHeader) -> Result<CoefficientStorage> {
        let mut planes = Vec::with_capacity(frame.components.len());
        let mut blocks_x = Vec::with_capacity(frame.components.len());
        let mut blocks_y = Vec::with_capacity(frame.components.len());
        for component in &frame.components {
            let (bx, by) = component.blocks;
            let total = bx
                .checked_mul(by)
                .and_then(|blocks| blocks.checked_mul(BLOCK_SIZE))
                .ok_or(Error::ImageSizeTooLarge(bx, by))?;
            let mut plane = Vec::new();
            plane.try_reserve_exact(total)?;
            plane.resize(total, 0);
            planes.push(plane);
            blocks_x.push(bx);
            blocks_y.push(by);
        }
        Ok(CoefficientStorage {
            planes,
            blocks_x,
            blocks_y,
        })
    }

    pub fn blocks_x(&self, component: usize) -> usize {
        self.blocks_x[component]
    }

    pub fn blocks_y(&self, component: usize) -> usize {
        self.blocks_y[component]
    }

    pub fn block(&self, component: usize, bx: usize, by: usize) -> &[i32] {
        let offset = (by * self.blocks_x[component] + bx) * BLOCK_SIZE;
        &self.planes[component][offset..offset + BLOCK_SIZE]
    }

    /// Mutable access to one block; block coordinates outside the grid are a
    /// decoder bug surfaced as an error rather than a panic.
    pub fn block_mut(&mut self, component: usize, bx: usize, by: usize) -> Result<&mut [i32]> {
        if bx >= self.blocks_x[component] || by >= self.blocks_y[component] {
            return Err(Error::InvalidMcuCoordinate(bx, by));
        }
        let offset = (by * self.blocks_x[component] + bx) * BLOCK_SIZE;
        Ok(&mut self.planes[component][offset..offset + BLOCK_SIZE])
    }
}
