// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use crate::coefficients::{BLOCK_SIZE, NATURAL_ORDER};
use crate::error::{Error, Result};
use crate::input::{BitstreamInput, ByteSource};
use crate::markers;
use crate::util::tracing_wrappers::*;

/// One quantization table, stored in natural order. Entries are divisors
/// the encoder applied; the post-processor multiplies them back in.
#[derive(Debug, Clone)]
pub struct QuantTable {
    pub values: [u16; BLOCK_SIZE],
}

/// The four DQT destination slots. Populated only by DQT segments and
/// read-only afterwards.
#[derive(Debug, Default)]
pub struct QuantTables([Option<QuantTable>; 4]);

impl QuantTables {
    pub fn get(&self, index: u8) -> Result<&QuantTable> {
        self.0[index as usize]
            .as_ref()
            .ok_or(Error::MissingQuantTable(index))
    }

    /// Parses one DQT segment payload of `remaining` bytes, which may define
    /// several tables. The declared length must match the table contents
    /// exactly.
    pub fn read_dqt<I: BitstreamInput>(
        &mut self,
        source: &mut ByteSource<I>,
        mut remaining: usize,
    ) -> Result<()> {
        while remaining > 0 {
            let pq_tq = source.read_byte()?;
            remaining -= 1;
            let (pq, tq) = (pq_tq >> 4, pq_tq & 0x0F);
            if pq > 1 {
                return Err(Error::BadPq(pq));
            }
            if tq > 3 {
                return Err(Error::BadTq(tq));
            }
            let needed = if pq == 1 { 2 * BLOCK_SIZE } else { BLOCK_SIZE };
            if remaining < needed {
                return Err(Error::SegmentLengthMismatch(markers::DQT));
            }
            let mut values = [0u16; BLOCK_SIZE];
            for k in 0..BLOCK_SIZE {
                let raw = if pq == 1 {
                    source.read_u16()?
                } else {
                    source.read_byte()? as u16
                };
                // The wire carries zig-zag order; storage is natural order.
                values[NATURAL_ORDER[k]] = raw;
            }
            remaining -= needed;
            debug!(slot = tq, precision = pq, "defined quantization table");
            self.0[tq as usize] = Some(QuantTable { values });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eight_bit_table_in_zig_zag_order() {
        // Payload: Pq=0 Tq=1, then the values 0..63 in stream order.
        let mut payload = vec![0x01u8];
        payload.extend(0..64u8);
        let len = payload.len();
        let mut tables = QuantTables::default();
        let mut src = ByteSource::new(&payload[..]);
        tables.read_dqt(&mut src, len).unwrap();
        let table = tables.get(1).unwrap();
        // Stream position k lands at natural position NATURAL_ORDER[k].
        assert_eq!(table.values[0], 0);
        assert_eq!(table.values[1], 1);
        assert_eq!(table.values[8], 2);
        assert_eq!(table.values[16], 9);
        assert_eq!(table.values[63], 63);
        assert!(matches!(tables.get(0), Err(Error::MissingQuantTable(0))));
    }

    #[test]
    fn sixteen_bit_table() {
        let mut payload = vec![0x10u8];
        for i in 0..64u16 {
            payload.extend_from_slice(&(0x100 + i).to_be_bytes());
        }
        let len = payload.len();
        let mut tables = QuantTables::default();
        let mut src = ByteSource::new(&payload[..]);
        tables.read_dqt(&mut src, len).unwrap();
        assert_eq!(tables.get(0).unwrap().values[0], 0x100);
        assert_eq!(tables.get(0).unwrap().values[1], 0x101);
    }

    #[test]
    fn declared_length_must_match_contents() {
        let mut payload = vec![0x00u8];
        payload.extend(std::iter::repeat(1u8).take(63)); // one byte short
        let len = payload.len();
        let mut tables = QuantTables::default();
        let mut src = ByteSource::new(&payload[..]);
        assert!(matches!(
            tables.read_dqt(&mut src, len),
            Err(Error::SegmentLengthMismatch(markers::DQT))
        ));
    }

    #[test]
    fn bad_destination_and_precision() {
        let mut tables = QuantTables::default();
        let payload = [0x04u8];
        let mut src = ByteSource::new(&payload[..]);
        assert!(matches!(tables.read_dqt(&mut src, 1), Err(Error::BadTq(4))));
        let payload = [0x20u8];
        let mut src = ByteSource::new(&payload[..]);
        assert!(matches!(tables.read_dqt(&mut src, 1), Err(Error::BadPq(2))));
    }
}
