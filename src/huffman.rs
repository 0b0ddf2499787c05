// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Canonical Huffman tables for entropy-coded scans.
//!
//! A table is built from the DHT wire form: 16 per-length code counts and a
//! symbol list. Codes are assigned canonically (increasing value within a
//! length, doubled between lengths), so two tables built from identical
//! histograms and symbol lists decode identically.

use crate::bit_reader::BitReader;
use crate::error::{Error, Result};
use crate::input::{BitstreamInput, ByteSource};
use crate::markers;
use crate::util::tracing_wrappers::*;

pub const MAX_CODE_LENGTH: usize = 16;

/// Table class from the high nibble of the DHT class/destination byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableClass {
    Dc,
    Ac,
}

#[derive(Debug, Clone)]
pub struct HuffmanTable {
    /// Smallest code of each length, shifted into canonical order.
    mincode: [i32; MAX_CODE_LENGTH],
    /// Largest code of each length, -1 where the length is unused.
    maxcode: [i32; MAX_CODE_LENGTH],
    /// Index of the first symbol of each length in `values`.
    valptr: [usize; MAX_CODE_LENGTH],
    values: Vec<u8>,
}

impl HuffmanTable {
    /// Builds the canonical table for `counts[l]` codes of length `l + 1`
    /// bits and the symbols they map to, in order.
    pub fn build(counts: &[u8; MAX_CODE_LENGTH], values: Vec<u8>) -> Result<HuffmanTable> {
        let total: usize = counts.iter().map(|&c| c as usize).sum();
        if total == 0 || total != values.len() {
            return Err(Error::InvalidHuffmanTable);
        }
        let mut mincode = [0i32; MAX_CODE_LENGTH];
        let mut maxcode = [-1i32; MAX_CODE_LENGTH];
        let mut valptr = [0usize; MAX_CODE_LENGTH];
        let mut code = 0i32;
        let mut idx = 0usize;
        for (len, &count) in counts.iter().enumerate() {
            if code as u32 + count as u32 > (1u32 << (len + 1)) {
                // More codes than a prefix code of this depth can hold.
                return Err(Error::InvalidHuffmanTable);
            }
            if count > 0 {
                mincode[len] = code;
                valptr[len] = idx;
                idx += count as usize;
                code += count as i32;
                maxcode[len] = code - 1;
            }
            code <<= 1;
        }
        Ok(HuffmanTable {
            mincode,
            maxcode,
            valptr,
            values,
        })
    }

    /// Decodes one symbol, reading up to 16 bits.
    pub fn decode<I: BitstreamInput>(&self, reader: &mut BitReader<I>) -> Result<u8> {
        let mut code = 0i32;
        for len in 0..MAX_CODE_LENGTH {
            code = (code << 1) | reader.receive(1)?;
            if code <= self.maxcode[len] {
                let offset = (code - self.mincode[len]) as usize;
                return Ok(self.values[self.valptr[len] + offset]);
            }
        }
        Err(Error::BadHuffmanCode)
    }
}

/// The eight DHT destination slots: four per class.
#[derive(Debug, Default)]
pub struct HuffmanTables {
    dc: [Option<HuffmanTable>; 4],
    ac: [Option<HuffmanTable>; 4],
}

impl HuffmanTables {
    pub fn get(&self, class: TableClass, index: u8) -> Result<&HuffmanTable> {
        let slot = match class {
            TableClass::Dc => &self.dc[index as usize],
            TableClass::Ac => &self.ac[index as usize],
        };
        slot.as_ref()
            .ok_or(Error::MissingHuffmanTable(class, index))
    }

    /// Parses one DHT segment payload of `remaining` bytes, which may define
    /// several tables. `baseline` restricts destinations to slots 0 and 1.
    pub fn read_dht<I: BitstreamInput>(
        &mut self,
        source: &mut ByteSource<I>,
        mut remaining: usize,
        baseline: bool,
    ) -> Result<()> {
        while remaining > 0 {
            if remaining < 17 {
                return Err(Error::SegmentLengthMismatch(markers::DHT));
            }
            let tc_th = source.read_byte()?;
            let (tc, th) = (tc_th >> 4, tc_th & 0x0F);
            if tc > 1 {
                return Err(Error::BadTc(tc));
            }
            if th > 3 || (baseline && th > 1) {
                return Err(Error::BadTh(th));
            }
            let mut counts = [0u8; MAX_CODE_LENGTH];
            source.read_full(&mut counts)?;
            let total: usize = counts.iter().map(|&c| c as usize).sum();
            remaining -= 17;
            if remaining < total {
                return Err(Error::SegmentLengthMismatch(markers::DHT));
            }
            let mut values = vec![0u8; total];
            source.read_full(&mut values)?;
            remaining -= total;
            let table = HuffmanTable::build(&counts, values)?;
            let class = if tc == 0 { TableClass::Dc } else { TableClass::Ac };
            debug!(?class, slot = th, codes = total, "defined Huffman table");
            match class {
                TableClass::Dc => self.dc[th as usize] = Some(table),
                TableClass::Ac => self.ac[th as usize] = Some(table),
            }
        }
        Ok(())
    }
}
