// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use crate::error::{Error, Result};
use crate::headers::app::{AdobeColorTransform, AdobeInfo};
use crate::input::{BitstreamInput, ByteSource};
use crate::markers;
use crate::util::tracing_wrappers::*;

/// Color interpretation of the decoded components.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    Grayscale,
    YCbCr,
    Rgb,
    /// Four inverted-sense ink components, as written by Adobe encoders.
    Cmyk,
    /// CMYK with the CMY channels stored as YCbCr.
    Ycck,
}

impl ColorSpace {
    pub fn component_count(self) -> usize {
        match self {
            ColorSpace::Grayscale => 1,
            ColorSpace::YCbCr | ColorSpace::Rgb => 3,
            ColorSpace::Cmyk | ColorSpace::Ycck => 4,
        }
    }
}

/// Per-component frame data from SOF plus the grid geometry derived from it.
#[derive(Debug, Clone)]
pub struct Component {
    /// Component id on the wire, referenced by SOS.
    pub id: u8,
    pub h_samp_factor: u8,
    pub v_samp_factor: u8,
    /// Quantization table slot bound by SOF.
    pub quant_idx: u8,
    /// Component size in samples: `ceil(image * samp / samp_max)`.
    pub size: (usize, usize),
    /// Block grid padded out to whole MCUs.
    pub blocks: (usize, usize),
}

/// Frame-wide state established by SOF0/SOF1/SOF2.
#[derive(Debug, Clone)]
pub struct FrameHeader {
    pub is_progressive: bool,
    /// SOF0; restricts Huffman table slots to 0 and 1.
    pub is_baseline: bool,
    pub width: usize,
    pub height: usize,
    pub max_h_samp: u8,
    pub max_v_samp: u8,
    /// Image size in MCUs.
    pub mcus: (usize, usize),
    pub color_space: ColorSpace,
    pub components: Vec<Component>,
}

impl FrameHeader {
    /// Parses an SOF0/SOF1/SOF2 payload. The Adobe APP14 state seen so far
    /// feeds the color-space deduction.
    pub fn read<I: BitstreamInput>(
        source: &mut ByteSource<I>,
        remaining: usize,
        marker: u8,
        adobe: Option<&AdobeInfo>,
    ) -> Result<FrameHeader> {
        if remaining < 6 {
            return Err(Error::SegmentLengthMismatch(marker));
        }
        let precision = source.read_byte()?;
        if precision != 8 {
            return Err(Error::UnsupportedPrecision(precision));
        }
        let height = source.read_u16()? as usize;
        let width = source.read_u16()? as usize;
        if width == 0 || height == 0 {
            return Err(Error::InvalidImageSize(width, height));
        }
        let num_components = source.read_byte()?;
        if remaining < 6 + 3 * num_components as usize {
            return Err(Error::SegmentLengthMismatch(marker));
        }
        let color_space = deduce_color_space(num_components, adobe)?;

        let mut raw = Vec::with_capacity(num_components as usize);
        for _ in 0..num_components {
            let id = source.read_byte()?;
            let samp = source.read_byte()?;
            let (h, v) = (samp >> 4, samp & 0x0F);
            if !(1..=4).contains(&h) || !(1..=4).contains(&v) {
                return Err(Error::BadSamplingFactor(h, v));
            }
            let quant_idx = source.read_byte()?;
            if quant_idx > 3 {
                return Err(Error::BadTq(quant_idx));
            }
            raw.push((id, h, v, quant_idx));
        }
        source.skip(remaining - 6 - 3 * num_components as usize)?;

        let max_h_samp = raw.iter().map(|&(_, h, _, _)| h).max().unwrap_or(1);
        let max_v_samp = raw.iter().map(|&(_, _, v, _)| v).max().unwrap_or(1);
        let mcus = (
            width.div_ceil(8 * max_h_samp as usize),
            height.div_ceil(8 * max_v_samp as usize),
        );
        let components = raw
            .into_iter()
            .map(|(id, h, v, quant_idx)| Component {
                id,
                h_samp_factor: h,
                v_samp_factor: v,
                quant_idx,
                size: (
                    (width * h as usize).div_ceil(max_h_samp as usize),
                    (height * v as usize).div_ceil(max_v_samp as usize),
                ),
                blocks: (mcus.0 * h as usize, mcus.1 * v as usize),
            })
            .collect();

        let header = FrameHeader {
            is_progressive: marker == markers::SOF2,
            is_baseline: marker == markers::SOF0,
            width,
            height,
            max_h_samp,
            max_v_samp,
            mcus,
            color_space,
            components,
        };
        info!(
            width,
            height,
            ?color_space,
            progressive = header.is_progressive,
            mcus = ?header.mcus,
            "frame"
        );
        Ok(header)
    }

    pub fn component_by_id(&self, id: u8) -> Option<usize> {
        self.components.iter().position(|c| c.id == id)
    }
}

/// Color-space deduction from the component count and the Adobe marker.
/// JFIF streams carry YCbCr; Adobe streams say which transform they used.
fn deduce_color_space(num_components: u8, adobe: Option<&AdobeInfo>) -> Result<ColorSpace> {
    let transform = adobe.map(|a| a.color_transform);
    match (num_components, transform) {
        (1, _) => Ok(ColorSpace::Grayscale),
        (3, None) | (3, Some(AdobeColorTransform::YCbCr)) => Ok(ColorSpace::YCbCr),
        (3, Some(AdobeColorTransform::Unknown)) => Ok(ColorSpace::Rgb),
        (4, Some(AdobeColorTransform::Ycck)) => Ok(ColorSpace::Ycck),
        (4, _) => Ok(ColorSpace::Cmyk),
        (n, t) => Err(Error::UnsupportedColorMode(n, t)),
    }
}
