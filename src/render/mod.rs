// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Post-processing: dequantize, inverse DCT, upsample, color convert, and
//! stream rows into the pixel sink. Runs once the entropy-coded scans have
//! fully populated the coefficient store, which is immutable from here on.

pub mod color;
pub mod idct;
pub mod upsample;

use crate::coefficients::CoefficientStorage;
use crate::decode::{PixelFormat, Upsampling};
use crate::error::{Error, Result};
use crate::headers::frame::{ColorSpace, FrameHeader};
use crate::headers::quant::QuantTables;
use crate::image::PixelSink;
use crate::util::tracing_wrappers::*;
use upsample::Upsampler;

/// Renders the frame into `sink`, row by row. The image edge blocks carry
/// padding out to whole MCUs; rows and columns beyond the declared size are
/// truncated here.
pub fn render_frame<S: PixelSink>(
    frame: &FrameHeader,
    quant: &QuantTables,
    coefficients: &CoefficientStorage,
    upsampling: Upsampling,
    format: PixelFormat,
    sink: &mut S,
) -> Result<()> {
    if format == PixelFormat::Cmyk8 && frame.color_space.component_count() != 4 {
        return Err(Error::BadOutputFormat(format));
    }
    debug!(?format, ?upsampling, "rendering frame");

    let mut planes = Vec::with_capacity(frame.components.len());
    for (c, component) in frame.components.iter().enumerate() {
        let dequant = idct::prescale(quant.get(component.quant_idx)?);
        let stride = component.blocks.0 * 8;
        let mut plane = Vec::new();
        plane.try_reserve_exact(stride * component.blocks.1 * 8)?;
        plane.resize(stride * component.blocks.1 * 8, 0);
        for by in 0..component.blocks.1 {
            for bx in 0..component.blocks.0 {
                let offset = by * 8 * stride + bx * 8;
                idct::idct_block(
                    coefficients.block(c, bx, by),
                    &dequant,
                    &mut plane[offset..],
                    stride,
                );
            }
        }
        planes.push(plane);
    }

    let samplers: Vec<Upsampler> = frame
        .components
        .iter()
        .zip(planes.iter())
        .map(|(component, plane)| {
            Upsampler::new(
                plane,
                component.blocks.0 * 8,
                component.size,
                (
                    component.h_samp_factor as usize,
                    component.v_samp_factor as usize,
                ),
                (frame.max_h_samp as usize, frame.max_v_samp as usize),
                upsampling,
            )
        })
        .collect();

    sink.set_size(frame.width, frame.height, format.channels())?;
    let mut component_rows = vec![vec![0u8; frame.width]; frame.components.len()];
    let mut out_row = vec![0u8; frame.width * format.channels()];
    for y in 0..frame.height {
        for (sampler, row) in samplers.iter().zip(component_rows.iter_mut()) {
            sampler.row_into(y, row);
        }
        convert_row(frame.color_space, format, &component_rows, &mut out_row)?;
        sink.write_row(y, &out_row)?;
    }
    Ok(())
}

fn convert_row(
    color_space: ColorSpace,
    format: PixelFormat,
    component_rows: &[Vec<u8>],
    out: &mut [u8],
) -> Result<()> {
    match format {
        PixelFormat::Rgba8 => {
            for (x, px) in out.chunks_exact_mut(4).enumerate() {
                let rgb = match color_space {
                    ColorSpace::Grayscale => {
                        let g = component_rows[0][x];
                        [g, g, g]
                    }
                    ColorSpace::YCbCr => color::ycbcr_to_rgb(
                        component_rows[0][x],
                        component_rows[1][x],
                        component_rows[2][x],
                    ),
                    ColorSpace::Rgb => [
                        component_rows[0][x],
                        component_rows[1][x],
                        component_rows[2][x],
                    ],
                    ColorSpace::Cmyk => color::cmyk_to_rgb(
                        component_rows[0][x],
                        component_rows[1][x],
                        component_rows[2][x],
                        component_rows[3][x],
                    ),
                    ColorSpace::Ycck => {
                        let [c, m, ye, k] = color::ycck_to_cmyk(
                            component_rows[0][x],
                            component_rows[1][x],
                            component_rows[2][x],
                            component_rows[3][x],
                        );
                        color::cmyk_to_rgb(c, m, ye, k)
                    }
                };
                px[..3].copy_from_slice(&rgb);
                px[3] = 255;
            }
        }
        PixelFormat::Cmyk8 => {
            for (x, px) in out.chunks_exact_mut(4).enumerate() {
                let cmyk = match color_space {
                    ColorSpace::Cmyk => [
                        component_rows[0][x],
                        component_rows[1][x],
                        component_rows[2][x],
                        component_rows[3][x],
                    ],
                    ColorSpace::Ycck => color::ycck_to_cmyk(
                        component_rows[0][x],
                        component_rows[1][x],
                        component_rows[2][x],
                        component_rows[3][x],
                    ),
                    _ => return Err(Error::BadOutputFormat(format)),
                };
                px.copy_from_slice(&cmyk);
            }
        }
    }
    Ok(())
}
