// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! APP0/APP1/APP2/APP14 recognition and payload handoff. Payload internals
//! (EXIF IFDs, ICC profile contents) are not interpreted here beyond what
//! resolution assignment needs; unrecognized payloads are skipped.

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

use crate::error::Result;
use crate::input::{BitstreamInput, ByteSource};
use crate::util::tracing_wrappers::*;

const JFIF_IDENTIFIER: [u8; 5] = *b"JFIF\0";
const EXIF_IDENTIFIER: [u8; 6] = *b"Exif\0\0";
const ICC_IDENTIFIER: [u8; 12] = *b"ICC_PROFILE\0";
const ADOBE_IDENTIFIER: [u8; 5] = *b"Adobe";

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
#[repr(u8)]
pub enum DensityUnit {
    /// Densities are an aspect ratio only.
    None = 0,
    DotsPerInch = 1,
    DotsPerCm = 2,
}

/// JFIF data from an APP0 segment.
#[derive(Debug, Clone)]
pub struct JfifInfo {
    pub version: (u8, u8),
    pub density_unit: DensityUnit,
    pub x_density: u16,
    pub y_density: u16,
}

/// Color transform declared by an Adobe APP14 segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
#[repr(u8)]
pub enum AdobeColorTransform {
    /// RGB for 3 components, CMYK for 4.
    Unknown = 0,
    YCbCr = 1,
    Ycck = 2,
}

#[derive(Debug, Clone)]
pub struct AdobeInfo {
    pub color_transform: AdobeColorTransform,
}

/// APP0: returns JFIF version and densities when the segment carries the
/// JFIF identifier. Segments too short for the identifier are skipped
/// whole; identified segments truncated before the density fields yield no
/// JFIF data but are still consumed exactly.
pub fn read_app0<I: BitstreamInput>(
    source: &mut ByteSource<I>,
    remaining: usize,
) -> Result<Option<JfifInfo>> {
    if remaining < JFIF_IDENTIFIER.len() {
        source.skip(remaining)?;
        return Ok(None);
    }
    let mut identifier = [0u8; 5];
    source.read_full(&mut identifier)?;
    if identifier != JFIF_IDENTIFIER {
        source.skip(remaining - identifier.len())?;
        return Ok(None);
    }
    if remaining < 12 {
        warn!(remaining, "JFIF segment truncated before density fields");
        source.skip(remaining - identifier.len())?;
        return Ok(None);
    }
    let version = (source.read_byte()?, source.read_byte()?);
    let unit = source.read_byte()?;
    let x_density = source.read_u16()?;
    let y_density = source.read_u16()?;
    source.skip(remaining - 12)?;
    let density_unit = DensityUnit::from_u8(unit).unwrap_or_else(|| {
        warn!(unit, "unknown JFIF density unit");
        DensityUnit::None
    });
    debug!(
        major = version.0,
        minor = version.1,
        ?density_unit,
        x_density,
        y_density,
        "JFIF"
    );
    Ok(Some(JfifInfo {
        version,
        density_unit,
        x_density,
        y_density,
    }))
}

/// APP1: returns the EXIF payload (the TIFF stream following the
/// identifier) verbatim. With `ignore_metadata` the payload is skipped.
pub fn read_app1<I: BitstreamInput>(
    source: &mut ByteSource<I>,
    remaining: usize,
    ignore_metadata: bool,
) -> Result<Option<Vec<u8>>> {
    if remaining < EXIF_IDENTIFIER.len() {
        source.skip(remaining)?;
        return Ok(None);
    }
    let mut identifier = [0u8; 6];
    source.read_full(&mut identifier)?;
    let payload = remaining - identifier.len();
    if identifier != EXIF_IDENTIFIER || ignore_metadata {
        source.skip(payload)?;
        return Ok(None);
    }
    let mut blob = vec![0u8; payload];
    source.read_full(&mut blob)?;
    debug!(bytes = blob.len(), "EXIF profile");
    Ok(Some(blob))
}

/// APP2: appends one `ICC_PROFILE` chunk to `icc`. Chunks arrive split
/// across segments, each with a sequence/count byte pair after the
/// identifier; payloads are concatenated in arrival order.
pub fn read_app2<I: BitstreamInput>(
    source: &mut ByteSource<I>,
    remaining: usize,
    ignore_metadata: bool,
    icc: &mut Option<Vec<u8>>,
) -> Result<()> {
    if remaining < ICC_IDENTIFIER.len() + 2 {
        source.skip(remaining)?;
        return Ok(());
    }
    let mut identifier = [0u8; 12];
    source.read_full(&mut identifier)?;
    if identifier != ICC_IDENTIFIER || ignore_metadata {
        source.skip(remaining - identifier.len())?;
        return Ok(());
    }
    let chunk_index = source.read_byte()?;
    let chunk_count = source.read_byte()?;
    let payload = remaining - ICC_IDENTIFIER.len() - 2;
    let blob = icc.get_or_insert_with(Vec::new);
    let offset = blob.len();
    blob.try_reserve(payload)?;
    blob.resize(offset + payload, 0);
    source.read_full(&mut blob[offset..])?;
    debug!(chunk_index, chunk_count, bytes = payload, "ICC chunk");
    Ok(())
}

/// APP14: returns the Adobe color transform when the segment carries the
/// `Adobe` identifier.
pub fn read_app14<I: BitstreamInput>(
    source: &mut ByteSource<I>,
    remaining: usize,
) -> Result<Option<AdobeInfo>> {
    if remaining < 12 {
        source.skip(remaining)?;
        return Ok(None);
    }
    let mut identifier = [0u8; 5];
    source.read_full(&mut identifier)?;
    if identifier != ADOBE_IDENTIFIER {
        source.skip(remaining - 5)?;
        return Ok(None);
    }
    // Version, flags0, flags1.
    source.skip(6)?;
    let transform = source.read_byte()?;
    source.skip(remaining - 12)?;
    let color_transform = AdobeColorTransform::from_u8(transform).unwrap_or_else(|| {
        warn!(transform, "unknown Adobe color transform");
        AdobeColorTransform::Unknown
    });
    debug!(?color_transform, "Adobe");
    Ok(Some(AdobeInfo { color_transform }))
}
