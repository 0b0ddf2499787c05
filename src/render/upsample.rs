// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use crate::decode::Upsampling;

/// Produces image-resolution rows of one component from its subsampled
/// plane.
///
/// Nearest-neighbour replication is the baseline for any sampling ratio;
/// the triangle filter (3:1 tent weights, the usual bilinear choice for
/// chroma) kicks in for exact 2x factors when selected.
pub struct Upsampler<'a> {
    plane: &'a [u8],
    stride: usize,
    size: (usize, usize),
    h_samp: usize,
    v_samp: usize,
    max_h: usize,
    max_v: usize,
    triangle_h: bool,
    triangle_v: bool,
}

impl<'a> Upsampler<'a> {
    pub fn new(
        plane: &'a [u8],
        stride: usize,
        size: (usize, usize),
        samp: (usize, usize),
        max_samp: (usize, usize),
        mode: Upsampling,
    ) -> Upsampler<'a> {
        let triangle = mode == Upsampling::Triangle;
        Upsampler {
            plane,
            stride,
            size,
            h_samp: samp.0,
            v_samp: samp.1,
            max_h: max_samp.0,
            max_v: max_samp.1,
            triangle_h: triangle && max_samp.0 == 2 * samp.0,
            triangle_v: triangle && max_samp.1 == 2 * samp.1,
        }
    }

    fn at(&self, x: usize, y: usize) -> u32 {
        self.plane[y * self.stride + x] as u32
    }

    /// Source position pair and weight for one axis: either a single
    /// nearest sample (weight 1) or a 3:1 pair for the triangle filter.
    fn axis(i: usize, samp: usize, max: usize, triangle: bool, limit: usize) -> (usize, usize, u32) {
        if triangle {
            let near = (i / 2).min(limit - 1);
            let far = if i % 2 == 0 {
                near.saturating_sub(1)
            } else {
                (near + 1).min(limit - 1)
            };
            (near, far, 3)
        } else {
            let near = (i * samp / max).min(limit - 1);
            (near, near, 1)
        }
    }

    pub fn row_into(&self, y: usize, out: &mut [u8]) {
        let (y0, y1, wy) = Self::axis(y, self.v_samp, self.max_v, self.triangle_v, self.size.1);
        for (x, px) in out.iter_mut().enumerate() {
            let (x0, x1, wx) = Self::axis(x, self.h_samp, self.max_h, self.triangle_h, self.size.0);
            *px = match (wx, wy) {
                (1, 1) => self.at(x0, y0) as u8,
                (3, 1) => ((3 * self.at(x0, y0) + self.at(x1, y0) + 2) >> 2) as u8,
                (1, 3) => ((3 * self.at(x0, y0) + self.at(x0, y1) + 2) >> 2) as u8,
                _ => {
                    let near = 9 * self.at(x0, y0);
                    let edges = 3 * (self.at(x1, y0) + self.at(x0, y1));
                    ((near + edges + self.at(x1, y1) + 8) >> 4) as u8
                }
            };
        }
    }
}
