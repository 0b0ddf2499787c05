// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! The decoded image's metadata record, plus the resolution assignment
//! rules. EXIF handling is limited to the three resolution tags; the full
//! profile is handed to the caller verbatim.

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::headers::app::{DensityUnit, JfifInfo};
use crate::headers::frame::ColorSpace;
use crate::util::tracing_wrappers::*;

/// What the decoder knows about an image besides its pixels.
#[derive(Debug, Clone)]
pub struct ImageInfo {
    pub width: usize,
    pub height: usize,
    pub color_space: ColorSpace,
    pub progressive: bool,
    /// DPI; 0 when the stream does not say.
    pub horizontal_resolution: f64,
    pub vertical_resolution: f64,
    pub exif_profile: Option<Vec<u8>>,
    pub icc_profile: Option<Vec<u8>>,
}

/// Picks the image resolution in DPI: EXIF X/YResolution wins when present
/// and positive, then JFIF densities, else 0.
pub fn resolve_resolution(jfif: Option<&JfifInfo>, exif: Option<&[u8]>) -> (f64, f64) {
    if let Some((x, y)) = exif.and_then(exif_resolution) {
        if x > 0.0 && y > 0.0 {
            return (x, y);
        }
    }
    match jfif {
        Some(info) => {
            let scale = match info.density_unit {
                DensityUnit::DotsPerInch => 1.0,
                DensityUnit::DotsPerCm => 2.54,
                // Densities are only an aspect ratio.
                DensityUnit::None => return (0.0, 0.0),
            };
            (
                info.x_density as f64 * scale,
                info.y_density as f64 * scale,
            )
        }
        None => (0.0, 0.0),
    }
}

const TAG_X_RESOLUTION: u16 = 0x011A;
const TAG_Y_RESOLUTION: u16 = 0x011B;
const TAG_RESOLUTION_UNIT: u16 = 0x0128;
const TYPE_SHORT: u16 = 3;
const TYPE_RATIONAL: u16 = 5;

/// Walks IFD0 of the EXIF TIFF stream for XResolution, YResolution and
/// ResolutionUnit. Anything malformed just yields `None`; EXIF problems
/// never fail a decode.
fn exif_resolution(data: &[u8]) -> Option<(f64, f64)> {
    let big_endian = match data.get(0..2)? {
        b"MM" => true,
        b"II" => false,
        _ => return None,
    };
    let read_u16 = |offset: usize| -> Option<u16> {
        let bytes = data.get(offset..offset + 2)?;
        Some(if big_endian {
            BigEndian::read_u16(bytes)
        } else {
            LittleEndian::read_u16(bytes)
        })
    };
    let read_u32 = |offset: usize| -> Option<u32> {
        let bytes = data.get(offset..offset + 4)?;
        Some(if big_endian {
            BigEndian::read_u32(bytes)
        } else {
            LittleEndian::read_u32(bytes)
        })
    };
    let read_rational = |offset: usize| -> Option<f64> {
        let numerator = read_u32(offset)?;
        let denominator = read_u32(offset + 4)?;
        if denominator == 0 {
            return None;
        }
        Some(numerator as f64 / denominator as f64)
    };

    if read_u16(2)? != 42 {
        return None;
    }
    let ifd = read_u32(4)? as usize;
    let entries = read_u16(ifd)? as usize;
    let mut x_resolution = None;
    let mut y_resolution = None;
    let mut unit = 2u16; // inches unless said otherwise
    for i in 0..entries {
        let entry = ifd + 2 + i * 12;
        let tag = read_u16(entry)?;
        let value_type = read_u16(entry + 2)?;
        let count = read_u32(entry + 4)?;
        match tag {
            TAG_X_RESOLUTION | TAG_Y_RESOLUTION if value_type == TYPE_RATIONAL && count >= 1 => {
                let value_offset = read_u32(entry + 8)? as usize;
                let value = read_rational(value_offset)?;
                if tag == TAG_X_RESOLUTION {
                    x_resolution = Some(value);
                } else {
                    y_resolution = Some(value);
                }
            }
            TAG_RESOLUTION_UNIT if value_type == TYPE_SHORT => {
                // Inline value, left-justified in the 4-byte field.
                unit = read_u16(entry + 8)?;
            }
            _ => {}
        }
    }
    let scale = if unit == 3 { 2.54 } else { 1.0 };
    let resolution = (x_resolution? * scale, y_resolution? * scale);
    debug!(?resolution, unit, "EXIF resolution");
    Some(resolution)
}

#[cfg(test)]
pub(crate) fn exif_with_resolution(x: (u32, u32), y: (u32, u32), unit: u16) -> Vec<u8> {
    // Little-endian TIFF with one IFD holding the three resolution tags.
    let mut data = Vec::new();
    data.extend_from_slice(b"II");
    data.extend_from_slice(&42u16.to_le_bytes());
    data.extend_from_slice(&8u32.to_le_bytes());
    data.extend_from_slice(&3u16.to_le_bytes());
    let rational_area = 8 + 2 + 3 * 12 + 4;
    for (tag, offset) in [(TAG_X_RESOLUTION, 0u32), (TAG_Y_RESOLUTION, 8u32)] {
        data.extend_from_slice(&tag.to_le_bytes());
        data.extend_from_slice(&TYPE_RATIONAL.to_le_bytes());
        data.extend_from_slice(&1u32.to_le_bytes());
        data.extend_from_slice(&(rational_area as u32 + offset).to_le_bytes());
    }
    data.extend_from_slice(&TAG_RESOLUTION_UNIT.to_le_bytes());
    data.extend_from_slice(&TYPE_SHORT.to_le_bytes());
    data.extend_from_slice(&1u32.to_le_bytes());
    data.extend_from_slice(&unit.to_le_bytes());
    data.extend_from_slice(&0u16.to_le_bytes());
    data.extend_from_slice(&0u32.to_le_bytes()); // no further IFDs
    for value in [x.0, x.1, y.0, y.1] {
        data.extend_from_slice(&value.to_le_bytes());
    }
    data
}
