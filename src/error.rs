// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use std::collections::TryReserveError;

use thiserror::Error;

use crate::huffman::TableClass;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Missing SOI marker at start of stream")]
    MissingSoi,
    #[error("Missing SOF marker")]
    MissingSof,
    #[error("Multiple SOF markers")]
    MultipleSof,
    #[error("No entropy-coded scan before EOI")]
    MissingScan,
    #[error("SOS before SOF")]
    SosBeforeSof,
    #[error("Unsupported frame type {0:#04x}")]
    UnsupportedFrameType(u8),
    #[error("Unsupported sample precision {0}")]
    UnsupportedPrecision(u8),
    #[error("Unsupported color mode: {0} components, Adobe transform {1:?}")]
    UnsupportedColorMode(u8, Option<crate::headers::app::AdobeColorTransform>),
    #[error("Segment {0:#04x} declares a length its payload does not match")]
    SegmentLengthMismatch(u8),
    #[error("Invalid quantization table destination Tq={0}")]
    BadTq(u8),
    #[error("Invalid quantization table precision Pq={0}")]
    BadPq(u8),
    #[error("Invalid Huffman table class Tc={0}")]
    BadTc(u8),
    #[error("Invalid Huffman table destination Th={0}")]
    BadTh(u8),
    #[error("Invalid sampling factors {0}x{1}")]
    BadSamplingFactor(u8, u8),
    #[error("Scan references component id {0} not declared in the frame")]
    BadScanComponent(u8),
    #[error("Invalid spectral selection {ss}..{se} with approximation {ah}/{al}")]
    BadSpectralSelection { ss: u8, se: u8, ah: u8, al: u8 },
    #[error("Ill-formed Huffman table (over-subscribed or empty code lengths)")]
    InvalidHuffmanTable,
    #[error("No {0:?} Huffman table in slot {1}")]
    MissingHuffmanTable(TableClass, u8),
    #[error("No quantization table in slot {0}")]
    MissingQuantTable(u8),
    #[error("Bad Huffman code in entropy-coded data")]
    BadHuffmanCode,
    #[error("Bad restart marker: expected RST{expected}, found {found:#04x}")]
    BadRestartMarker { expected: u8, found: u8 },
    #[error("Unexpected marker {0:#04x}")]
    UnexpectedMarker(u8),
    #[error("Block coordinate ({0}, {1}) outside the component grid")]
    InvalidMcuCoordinate(usize, usize),
    #[error("Unexpected end of stream")]
    UnexpectedEof,
    #[error("Image size too large: {0}x{1}")]
    ImageSizeTooLarge(usize, usize),
    #[error("Invalid image size: {0}x{1}")]
    InvalidImageSize(usize, usize),
    #[error("Output format {0:?} requires a 4-component image")]
    BadOutputFormat(crate::decode::PixelFormat),
    #[error("Out of memory: {0}")]
    OutOfMemory(#[from] TryReserveError),
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
