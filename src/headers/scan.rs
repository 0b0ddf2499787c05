// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use crate::error::{Error, Result};
use crate::headers::frame::FrameHeader;
use crate::input::{BitstreamInput, ByteSource};
use crate::util::tracing_wrappers::*;

/// One component's entry in a scan, with the Huffman slots the scan binds.
#[derive(Debug, Clone)]
pub struct ScanComponent {
    /// Index into `FrameHeader::components`.
    pub component: usize,
    pub dc_tbl_idx: u8,
    pub ac_tbl_idx: u8,
}

/// Parsed SOS header: the scanned components plus the spectral band and
/// successive-approximation bit positions for progressive frames.
#[derive(Debug, Clone)]
pub struct ScanHeader {
    pub components: Vec<ScanComponent>,
    pub ss: u8,
    pub se: u8,
    pub ah: u8,
    pub al: u8,
}

impl ScanHeader {
    pub fn read<I: BitstreamInput>(
        source: &mut ByteSource<I>,
        remaining: usize,
        frame: &FrameHeader,
    ) -> Result<ScanHeader> {
        if remaining < 1 {
            return Err(Error::SegmentLengthMismatch(crate::markers::SOS));
        }
        let ns = source.read_byte()?;
        if !(1..=4).contains(&ns) || remaining < 4 + 2 * ns as usize {
            return Err(Error::SegmentLengthMismatch(crate::markers::SOS));
        }
        let mut components = Vec::with_capacity(ns as usize);
        for _ in 0..ns {
            let id = source.read_byte()?;
            let component = frame
                .component_by_id(id)
                .ok_or(Error::BadScanComponent(id))?;
            if components.iter().any(|c: &ScanComponent| c.component == component) {
                return Err(Error::BadScanComponent(id));
            }
            let td_ta = source.read_byte()?;
            let (dc_tbl_idx, ac_tbl_idx) = (td_ta >> 4, td_ta & 0x0F);
            if dc_tbl_idx > 3 || ac_tbl_idx > 3 {
                return Err(Error::BadTh(td_ta));
            }
            components.push(ScanComponent {
                component,
                dc_tbl_idx,
                ac_tbl_idx,
            });
        }
        let ss = source.read_byte()?;
        let se = source.read_byte()?;
        let ah_al = source.read_byte()?;
        let (ah, al) = (ah_al >> 4, ah_al & 0x0F);
        source.skip(remaining - 4 - 2 * ns as usize)?;

        let header = ScanHeader {
            components,
            ss,
            se,
            ah,
            al,
        };
        header.validate(frame)?;
        debug!(
            ns,
            ss, se, ah, al,
            progressive = frame.is_progressive,
            "scan"
        );
        Ok(header)
    }

    fn validate(&self, frame: &FrameHeader) -> Result<()> {
        let bad = || Error::BadSpectralSelection {
            ss: self.ss,
            se: self.se,
            ah: self.ah,
            al: self.al,
        };
        if !frame.is_progressive {
            // Sequential scans always cover the full band in one pass.
            if self.ss != 0 || self.se != 63 || self.ah != 0 || self.al != 0 {
                return Err(bad());
            }
            return Ok(());
        }
        if self.se > 63 || self.al > 13 || self.ah > 13 {
            return Err(bad());
        }
        if self.ss == 0 {
            // DC scan, possibly interleaved.
            if self.se != 0 {
                return Err(bad());
            }
        } else {
            // AC scans cover one component at a time.
            if self.se < self.ss || self.components.len() != 1 {
                return Err(bad());
            }
        }
        // Each refinement pass moves the approximation down by one bit.
        if self.ah != 0 && self.ah != self.al + 1 {
            return Err(bad());
        }
        Ok(())
    }
}
