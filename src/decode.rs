// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Decoder entry points: the marker parse loop that feeds the segment
//! handlers and the scan decoder, followed by post-processing into a pixel
//! sink.

use crate::coefficients::CoefficientStorage;
use crate::error::{Error, Result};
use crate::headers::app::{self, AdobeInfo, JfifInfo};
use crate::headers::frame::FrameHeader;
use crate::headers::quant::QuantTables;
use crate::headers::scan::ScanHeader;
use crate::huffman::HuffmanTables;
use crate::image::{Image, PixelSink};
use crate::input::{BitstreamInput, ByteSource};
use crate::markers;
use crate::metadata::{self, ImageInfo};
use crate::render;
use crate::scan;
use crate::util::tracing_wrappers::*;

/// Chroma upsampling filter; nearest-neighbour replication unless the
/// triangle filter is asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Upsampling {
    #[default]
    Nearest,
    Triangle,
}

/// Layout of the pixels handed to the sink. Both formats are four
/// interleaved 8-bit samples per pixel; `Cmyk8` keeps the inverted-sense
/// ink values of 4-component images instead of converting them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PixelFormat {
    #[default]
    Rgba8,
    Cmyk8,
}

impl PixelFormat {
    pub fn channels(self) -> usize {
        match self {
            PixelFormat::Rgba8 | PixelFormat::Cmyk8 => 4,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DecoderOptions {
    /// Skip APP1/APP2 payloads instead of retaining them. Pixel output is
    /// unaffected.
    pub ignore_metadata: bool,
    pub upsampling: Upsampling,
    pub pixel_format: PixelFormat,
}

/// A decoded image: pixels plus everything the stream said about them.
#[derive(Debug)]
pub struct DecodedImage {
    pub info: ImageInfo,
    pub format: PixelFormat,
    pub image: Image,
}

/// Single-use JPEG decoder over a pull-style byte source. All tables,
/// coefficient grids and scratch buffers live and die with the instance.
pub struct Decoder<I: BitstreamInput> {
    source: ByteSource<I>,
    options: DecoderOptions,
    quant: QuantTables,
    huffman: HuffmanTables,
    restart_interval: usize,
    frame: Option<FrameHeader>,
    coefficients: Option<CoefficientStorage>,
    scans_decoded: usize,
    jfif: Option<JfifInfo>,
    adobe: Option<AdobeInfo>,
    exif: Option<Vec<u8>>,
    icc: Option<Vec<u8>>,
}

impl<I: BitstreamInput> Decoder<I> {
    pub fn new(input: I) -> Decoder<I> {
        Decoder::new_with_options(input, DecoderOptions::default())
    }

    pub fn new_with_options(input: I, options: DecoderOptions) -> Decoder<I> {
        Decoder {
            source: ByteSource::new(input),
            options,
            quant: QuantTables::default(),
            huffman: HuffmanTables::default(),
            restart_interval: 0,
            frame: None,
            coefficients: None,
            scans_decoded: 0,
            jfif: None,
            adobe: None,
            exif: None,
            icc: None,
        }
    }

    /// Decodes the stream into an owned image in the configured pixel
    /// format.
    pub fn decode(self) -> Result<DecodedImage> {
        let format = self.options.pixel_format;
        let mut image = Image::default();
        let info = self.decode_into(&mut image)?;
        Ok(DecodedImage {
            info,
            format,
            image,
        })
    }

    /// Decodes the stream, streaming rows into a caller-supplied sink.
    pub fn decode_into<S: PixelSink>(mut self, sink: &mut S) -> Result<ImageInfo> {
        self.parse(false)?;
        if self.scans_decoded == 0 {
            return Err(Error::MissingScan);
        }
        let info = self.image_info()?;
        let frame = self.frame.as_ref().ok_or(Error::MissingSof)?;
        let coefficients = self.coefficients.as_ref().ok_or(Error::MissingSof)?;
        render::render_frame(
            frame,
            &self.quant,
            coefficients,
            self.options.upsampling,
            self.options.pixel_format,
            sink,
        )?;
        Ok(info)
    }

    /// Parses up to and including SOF: enough to report dimensions, color
    /// space and resolution without touching entropy-coded data.
    pub fn parse_metadata(mut self) -> Result<ImageInfo> {
        self.parse(true)?;
        self.image_info()
    }

    fn image_info(&self) -> Result<ImageInfo> {
        let frame = self.frame.as_ref().ok_or(Error::MissingSof)?;
        let (horizontal_resolution, vertical_resolution) =
            metadata::resolve_resolution(self.jfif.as_ref(), self.exif.as_deref());
        Ok(ImageInfo {
            width: frame.width,
            height: frame.height,
            color_space: frame.color_space,
            progressive: frame.is_progressive,
            horizontal_resolution,
            vertical_resolution,
            exif_profile: self.exif.clone(),
            icc_profile: self.icc.clone(),
        })
    }

    /// The marker loop. Segment payload handling is delegated; every
    /// handler consumes exactly the declared payload. With `metadata_only`
    /// the loop stops right after SOF, whether or not a JFIF marker was
    /// seen.
    fn parse(&mut self, metadata_only: bool) -> Result<()> {
        let first = self.source.next_marker().map_err(|e| match e {
            Error::UnexpectedMarker(_) => Error::MissingSoi,
            other => other,
        })?;
        if first != markers::SOI {
            return Err(Error::MissingSoi);
        }
        loop {
            let marker = self.source.next_marker()?;
            if markers::is_rst(marker) {
                // Encoders may emit one more restart marker after the last
                // restart interval of a scan.
                debug!(marker, "stray restart marker between segments");
                continue;
            }
            if marker == markers::EOI {
                return Ok(());
            }
            if markers::is_parameterless(marker) || marker == 0x00 {
                return Err(Error::UnexpectedMarker(marker));
            }
            let length = self.source.read_u16()? as usize;
            if length < 2 {
                return Err(Error::SegmentLengthMismatch(marker));
            }
            let remaining = length - 2;
            match marker {
                markers::DQT => self.quant.read_dqt(&mut self.source, remaining)?,
                markers::DHT => {
                    let baseline = self.frame.as_ref().is_some_and(|f| f.is_baseline);
                    self.huffman.read_dht(&mut self.source, remaining, baseline)?
                }
                markers::DRI => {
                    if remaining < 2 {
                        return Err(Error::SegmentLengthMismatch(marker));
                    }
                    self.restart_interval = self.source.read_u16()? as usize;
                    self.source.skip(remaining - 2)?;
                    debug!(interval = self.restart_interval, "restart interval");
                }
                markers::SOS => {
                    let frame = self.frame.as_ref().ok_or(Error::SosBeforeSof)?;
                    let scan_header = ScanHeader::read(&mut self.source, remaining, frame)?;
                    let coefficients = self.coefficients.as_mut().ok_or(Error::SosBeforeSof)?;
                    scan::decode_scan(
                        &mut self.source,
                        frame,
                        &scan_header,
                        &self.huffman,
                        self.restart_interval,
                        coefficients,
                    )?;
                    self.scans_decoded += 1;
                }
                m if markers::is_sof(m) => {
                    if !matches!(m, markers::SOF0 | markers::SOF1 | markers::SOF2) {
                        return Err(Error::UnsupportedFrameType(m));
                    }
                    if self.frame.is_some() {
                        return Err(Error::MultipleSof);
                    }
                    let frame =
                        FrameHeader::read(&mut self.source, remaining, m, self.adobe.as_ref())?;
                    self.coefficients = Some(CoefficientStorage::new(&frame)?);
                    self.frame = Some(frame);
                    if metadata_only {
                        return Ok(());
                    }
                }
                m if m == markers::APP0 => {
                    if let Some(jfif) = app::read_app0(&mut self.source, remaining)? {
                        self.jfif.get_or_insert(jfif);
                    }
                }
                m if m == markers::APP0 + 1 => {
                    let exif =
                        app::read_app1(&mut self.source, remaining, self.options.ignore_metadata)?;
                    if let Some(exif) = exif {
                        self.exif.get_or_insert(exif);
                    }
                }
                m if m == markers::APP0 + 2 => {
                    app::read_app2(
                        &mut self.source,
                        remaining,
                        self.options.ignore_metadata,
                        &mut self.icc,
                    )?;
                }
                m if m == markers::APP0 + 14 => {
                    if let Some(adobe) = app::read_app14(&mut self.source, remaining)? {
                        self.adobe.get_or_insert(adobe);
                    }
                }
                m if markers::is_app(m) || m == markers::COM => {
                    debug!(marker = m, bytes = remaining, "skipping segment");
                    self.source.skip(remaining)?;
                }
                m => return Err(Error::UnexpectedMarker(m)),
            }
        }
    }
}
