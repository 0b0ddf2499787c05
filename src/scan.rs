// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Entropy-coded scan decoding.
//!
//! One MCU loop serves every scan kind. Sequential scans decode full blocks;
//! progressive scans visit the same blocks repeatedly across scans, first
//! placing approximated coefficients (successive approximation high bits,
//! shifted left by `Al`) and then refining one bit per scan. Interleaved
//! scans walk the frame MCU grid; single-component scans walk the
//! component's own block grid.

use crate::bit_reader::BitReader;
use crate::coefficients::{CoefficientStorage, NATURAL_ORDER};
use crate::error::{Error, Result};
use crate::headers::frame::FrameHeader;
use crate::headers::scan::ScanHeader;
use crate::huffman::{HuffmanTable, HuffmanTables, TableClass};
use crate::input::{BitstreamInput, ByteSource};
use crate::markers;
use crate::util::tracing_wrappers::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockMode {
    Sequential,
    DcFirst,
    DcRefine,
    AcFirst,
    AcRefine,
}

/// Decodes the entropy-coded data following one SOS header into the
/// coefficient store, consuming restart markers along the way. The byte
/// source is left positioned at the first byte after the scan's data.
pub fn decode_scan<I: BitstreamInput>(
    source: &mut ByteSource<I>,
    frame: &FrameHeader,
    scan: &ScanHeader,
    tables: &HuffmanTables,
    restart_interval: usize,
    coefficients: &mut CoefficientStorage,
) -> Result<()> {
    let mode = if !frame.is_progressive {
        BlockMode::Sequential
    } else if scan.ss == 0 {
        if scan.ah == 0 {
            BlockMode::DcFirst
        } else {
            BlockMode::DcRefine
        }
    } else if scan.ah == 0 {
        BlockMode::AcFirst
    } else {
        BlockMode::AcRefine
    };
    let needs_dc = matches!(mode, BlockMode::Sequential | BlockMode::DcFirst);
    let needs_ac = matches!(
        mode,
        BlockMode::Sequential | BlockMode::AcFirst | BlockMode::AcRefine
    );

    let mut dc_tables = Vec::with_capacity(scan.components.len());
    let mut ac_tables = Vec::with_capacity(scan.components.len());
    for sc in &scan.components {
        dc_tables.push(if needs_dc {
            Some(tables.get(TableClass::Dc, sc.dc_tbl_idx)?)
        } else {
            None
        });
        ac_tables.push(if needs_ac {
            Some(tables.get(TableClass::Ac, sc.ac_tbl_idx)?)
        } else {
            None
        });
    }

    let decoder = ScanDecoder {
        reader: BitReader::new(source),
        frame,
        scan,
        mode,
        dc_tables,
        ac_tables,
        ss: scan.ss as usize,
        se: scan.se as usize,
        al: scan.al as usize,
        preds: [0; 4],
        eob_run: 0,
    };
    decoder.run(restart_interval, coefficients)
}

struct ScanDecoder<'a, 'b, I> {
    reader: BitReader<'a, I>,
    frame: &'b FrameHeader,
    scan: &'b ScanHeader,
    mode: BlockMode,
    dc_tables: Vec<Option<&'b HuffmanTable>>,
    ac_tables: Vec<Option<&'b HuffmanTable>>,
    ss: usize,
    se: usize,
    al: usize,
    /// DC predictors, one per scan component; reset at restarts.
    preds: [i32; 4],
    /// Remaining blocks of the current progressive EOB run.
    eob_run: u32,
}

impl<'b, I: BitstreamInput> ScanDecoder<'_, 'b, I> {
    fn run(mut self, restart_interval: usize, coefficients: &mut CoefficientStorage) -> Result<()> {
        let interleaved = self.scan.components.len() > 1;
        let (mcus_x, mcus_y) = if interleaved {
            self.frame.mcus
        } else {
            // Single-component scans cover the component's own grid, without
            // the MCU padding of interleaved scans.
            let comp = &self.frame.components[self.scan.components[0].component];
            (comp.size.0.div_ceil(8), comp.size.1.div_ceil(8))
        };
        trace!(mcus_x, mcus_y, interleaved, mode = ?self.mode, "scan geometry");

        let mut until_restart = restart_interval;
        let mut next_restart = 0u8;
        for my in 0..mcus_y {
            for mx in 0..mcus_x {
                if restart_interval != 0 && until_restart == 0 {
                    self.restart(next_restart)?;
                    next_restart = (next_restart + 1) & 7;
                    until_restart = restart_interval;
                }
                if interleaved {
                    for idx in 0..self.scan.components.len() {
                        let component = self.scan.components[idx].component;
                        let (h, v) = {
                            let c = &self.frame.components[component];
                            (c.h_samp_factor as usize, c.v_samp_factor as usize)
                        };
                        for by in 0..v {
                            for bx in 0..h {
                                let block =
                                    coefficients.block_mut(component, mx * h + bx, my * v + by)?;
                                self.decode_block(idx, block)?;
                            }
                        }
                    }
                } else {
                    let component = self.scan.components[0].component;
                    let block = coefficients.block_mut(component, mx, my)?;
                    self.decode_block(0, block)?;
                }
                if restart_interval != 0 {
                    until_restart -= 1;
                }
            }
        }
        Ok(())
    }

    /// Expects a byte-aligned RSTn with the next index in the 0..7 cycle,
    /// then resets the per-scan entropy state.
    fn restart(&mut self, expected: u8) -> Result<()> {
        let found = match self.reader.read_marker() {
            Ok(code) => code,
            Err(Error::UnexpectedMarker(byte)) => {
                return Err(Error::BadRestartMarker {
                    expected,
                    found: byte,
                })
            }
            Err(e) => return Err(e),
        };
        if found != markers::RST0 + expected {
            return Err(Error::BadRestartMarker { expected, found });
        }
        self.preds = [0; 4];
        self.eob_run = 0;
        Ok(())
    }

    fn dc_table(&self, idx: usize) -> Result<&'b HuffmanTable> {
        self.dc_tables[idx].ok_or(Error::MissingHuffmanTable(
            TableClass::Dc,
            self.scan.components[idx].dc_tbl_idx,
        ))
    }

    fn ac_table(&self, idx: usize) -> Result<&'b HuffmanTable> {
        self.ac_tables[idx].ok_or(Error::MissingHuffmanTable(
            TableClass::Ac,
            self.scan.components[idx].ac_tbl_idx,
        ))
    }

    fn decode_block(&mut self, idx: usize, block: &mut [i32]) -> Result<()> {
        match self.mode {
            BlockMode::Sequential => self.decode_sequential(idx, block),
            BlockMode::DcFirst => self.decode_dc_first(idx, block),
            BlockMode::DcRefine => self.decode_dc_refine(block),
            BlockMode::AcFirst => self.decode_ac_first(idx, block),
            BlockMode::AcRefine => self.decode_ac_refine(idx, block),
        }
    }

    /// Full-band block: DC difference plus run-length coded AC.
    fn decode_sequential(&mut self, idx: usize, block: &mut [i32]) -> Result<()> {
        let dc = self.dc_table(idx)?;
        let t = dc.decode(&mut self.reader)? as usize;
        if t > 15 {
            return Err(Error::BadHuffmanCode);
        }
        let diff = if t == 0 {
            0
        } else {
            self.reader.receive_extend(t)?
        };
        self.preds[idx] += diff;
        block[0] = self.preds[idx];

        let ac = self.ac_table(idx)?;
        let mut k = 1usize;
        while k < 64 {
            let rs = ac.decode(&mut self.reader)?;
            let (r, s) = ((rs >> 4) as usize, (rs & 0x0F) as usize);
            if s == 0 {
                if r == 15 {
                    k += 16;
                    continue;
                }
                break; // end of block
            }
            k += r;
            if k > 63 {
                return Err(Error::BadHuffmanCode);
            }
            block[NATURAL_ORDER[k]] = self.reader.receive_extend(s)?;
            k += 1;
        }
        Ok(())
    }

    /// First DC scan of a progressive frame: the approximated DC, shifted
    /// into place.
    fn decode_dc_first(&mut self, idx: usize, block: &mut [i32]) -> Result<()> {
        let dc = self.dc_table(idx)?;
        let t = dc.decode(&mut self.reader)? as usize;
        if t > 15 {
            return Err(Error::BadHuffmanCode);
        }
        let diff = if t == 0 {
            0
        } else {
            self.reader.receive_extend(t)?
        };
        self.preds[idx] += diff;
        block[0] = self.preds[idx] << self.al;
        Ok(())
    }

    /// DC refinement: one raw bit ORed into bit position `Al`.
    fn decode_dc_refine(&mut self, block: &mut [i32]) -> Result<()> {
        if self.reader.receive(1)? != 0 {
            block[0] |= 1 << self.al;
        }
        Ok(())
    }

    /// First AC scan of a band: run-length coded coefficients with EOB runs
    /// spanning whole blocks.
    fn decode_ac_first(&mut self, idx: usize, block: &mut [i32]) -> Result<()> {
        if self.eob_run > 0 {
            self.eob_run -= 1;
            return Ok(());
        }
        let ac = self.ac_table(idx)?;
        let mut k = self.ss;
        while k <= self.se {
            let rs = ac.decode(&mut self.reader)?;
            let (r, s) = ((rs >> 4) as usize, (rs & 0x0F) as usize);
            if s == 0 {
                if r != 15 {
                    // EOBn: this block is the first of the run.
                    self.eob_run = (1u32 << r) - 1;
                    if r > 0 {
                        self.eob_run += self.reader.receive(r)? as u32;
                    }
                    break;
                }
                k += 16;
                continue;
            }
            k += r;
            if k > self.se {
                return Err(Error::BadHuffmanCode);
            }
            block[NATURAL_ORDER[k]] = self.reader.receive_extend(s)? << self.al;
            k += 1;
        }
        Ok(())
    }

    /// AC refinement, ITU T.81 G.1.2.3: correction bits for coefficients
    /// that are already nonzero, interleaved with the zero runs and EOB runs
    /// that position newly nonzero coefficients.
    fn decode_ac_refine(&mut self, idx: usize, block: &mut [i32]) -> Result<()> {
        let ac = self.ac_table(idx)?;
        let p1 = 1i32 << self.al;
        let m1 = -(1i32 << self.al);
        let mut k = self.ss;
        if self.eob_run == 0 {
            'band: while k <= self.se {
                let rs = ac.decode(&mut self.reader)?;
                let (mut r, s) = ((rs >> 4) as usize, (rs & 0x0F) as usize);
                let mut value = 0i32;
                if s == 0 {
                    if r != 15 {
                        self.eob_run = 1u32 << r;
                        if r > 0 {
                            self.eob_run += self.reader.receive(r)? as u32;
                        }
                        break 'band;
                    }
                    // ZRL: advance over 16 zero-history coefficients.
                } else {
                    if s != 1 {
                        return Err(Error::BadHuffmanCode);
                    }
                    value = if self.reader.receive(1)? != 0 { p1 } else { m1 };
                }
                while k <= self.se {
                    let coef = &mut block[NATURAL_ORDER[k]];
                    if *coef != 0 {
                        if self.reader.receive(1)? != 0 && (*coef & p1) == 0 {
                            *coef += if *coef >= 0 { p1 } else { m1 };
                        }
                    } else if r == 0 {
                        if value != 0 {
                            *coef = value;
                        }
                        k += 1;
                        continue 'band;
                    } else {
                        r -= 1;
                    }
                    k += 1;
                }
            }
        }
        if self.eob_run > 0 {
            // Inside an EOB run only the already nonzero coefficients of the
            // band receive correction bits.
            while k <= self.se {
                let coef = &mut block[NATURAL_ORDER[k]];
                if *coef != 0 && self.reader.receive(1)? != 0 && (*coef & p1) == 0 {
                    *coef += if *coef >= 0 { p1 } else { m1 };
                }
                k += 1;
            }
            self.eob_run -= 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headers::scan::ScanHeader;

    fn gray_frame(width: u8, height: u8) -> FrameHeader {
        let payload = [8u8, 0, height, 0, width, 1, 1, 0x11, 0];
        let mut src = ByteSource::new(&payload[..]);
        FrameHeader::read(&mut src, payload.len(), markers::SOF0, None).unwrap()
    }

    /// DC table with the single symbol 2 (code '0'), AC table with the
    /// single symbol 0x00 / end-of-block (code '0').
    fn trivial_tables() -> HuffmanTables {
        let mut counts = [0u8; 16];
        counts[0] = 1;
        let mut payload = vec![0x00u8];
        payload.extend_from_slice(&counts);
        payload.push(0x02);
        payload.push(0x10);
        payload.extend_from_slice(&counts);
        payload.push(0x00);
        let len = payload.len();
        let mut tables = HuffmanTables::default();
        let mut src = ByteSource::new(&payload[..]);
        tables.read_dht(&mut src, len, true).unwrap();
        tables
    }

    fn sequential_scan(frame: &FrameHeader) -> ScanHeader {
        let payload = [1u8, 1, 0x00, 0, 63, 0];
        let mut src = ByteSource::new(&payload[..]);
        ScanHeader::read(&mut src, payload.len(), frame).unwrap()
    }

    #[test]
    fn dc_predictor_accumulates() {
        let frame = gray_frame(16, 8);
        let tables = trivial_tables();
        let scan = sequential_scan(&frame);
        let mut coefficients = CoefficientStorage::new(&frame).unwrap();
        // Two MCUs, each: DC symbol '0' (category 2), bits '10' (diff +2),
        // then EOB '0'. 01000100 -> 0x44.
        let data = [0x44u8];
        let mut src = ByteSource::new(&data[..]);
        decode_scan(&mut src, &frame, &scan, &tables, 0, &mut coefficients).unwrap();
        assert_eq!(coefficients.block(0, 0, 0)[0], 2);
        // Without a restart the second DC difference stacks on the first.
        assert_eq!(coefficients.block(0, 1, 0)[0], 4);
    }

    #[test]
    fn restart_resets_dc_predictor() {
        let frame = gray_frame(16, 8);
        let tables = trivial_tables();
        let scan = sequential_scan(&frame);
        let mut coefficients = CoefficientStorage::new(&frame).unwrap();
        // MCU, padded to a byte, RST0, MCU.
        let data = [0x4Fu8, 0xFF, 0xD0, 0x4F];
        let mut src = ByteSource::new(&data[..]);
        decode_scan(&mut src, &frame, &scan, &tables, 1, &mut coefficients).unwrap();
        assert_eq!(coefficients.block(0, 0, 0)[0], 2);
        assert_eq!(coefficients.block(0, 1, 0)[0], 2);
    }

    #[test]
    fn wrong_restart_index() {
        let frame = gray_frame(16, 8);
        let tables = trivial_tables();
        let scan = sequential_scan(&frame);
        let mut coefficients = CoefficientStorage::new(&frame).unwrap();
        let data = [0x4Fu8, 0xFF, 0xD3, 0x4F];
        let mut src = ByteSource::new(&data[..]);
        assert!(matches!(
            decode_scan(&mut src, &frame, &scan, &tables, 1, &mut coefficients),
            Err(Error::BadRestartMarker {
                expected: 0,
                found: 0xD3
            })
        ));
    }

    #[test]
    fn missing_table_is_reported_at_scan_start() {
        let frame = gray_frame(8, 8);
        let tables = HuffmanTables::default();
        let scan = sequential_scan(&frame);
        let mut coefficients = CoefficientStorage::new(&frame).unwrap();
        let data = [0x00u8];
        let mut src = ByteSource::new(&data[..]);
        assert!(matches!(
            decode_scan(&mut src, &frame, &scan, &tables, 0, &mut coefficients),
            Err(Error::MissingHuffmanTable(TableClass::Dc, 0))
        ));
    }
}
