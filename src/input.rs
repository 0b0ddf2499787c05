// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use std::io::{BufRead, BufReader, Read};

use byteorder::ByteOrder;

use crate::error::{Error, Result};
use crate::util::tracing_wrappers::*;

/// A pull-style source of bitstream bytes. No seeking is required.
pub trait BitstreamInput {
    /// Fills `buf` with more bytes, returning the number of bytes written.
    /// Returning 0 means end of stream.
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize>;

    /// Skips `bytes` bytes of input. The provided implementation just uses
    /// `read`, but in some cases this can be implemented faster.
    fn skip(&mut self, bytes: usize) -> std::io::Result<usize> {
        let mut left = bytes;
        const BUF_SIZE: usize = 1024;
        let mut skip_buf = [0; BUF_SIZE];
        while left > 0 {
            let num = self.read(&mut skip_buf[..left.min(BUF_SIZE)])?;
            if num == 0 {
                break;
            }
            left -= num;
        }
        Ok(bytes - left)
    }
}

impl BitstreamInput for &[u8] {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        Read::read(self, buf)
    }

    fn skip(&mut self, bytes: usize) -> std::io::Result<usize> {
        let num = bytes.min(self.len());
        self.consume(num);
        Ok(num)
    }
}

impl<R: Read> BitstreamInput for BufReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        Read::read(self, buf)
    }
}

const BUFFER_SIZE: usize = 4096;

/// Buffered byte-level view of a [`BitstreamInput`].
///
/// This is the byte layer of the input processor: exact-length reads, skips
/// and marker scanning. The bit layer ([`crate::bit_reader::BitReader`]) sits
/// on top of it while an entropy-coded segment is active.
pub struct ByteSource<I> {
    input: I,
    buf: [u8; BUFFER_SIZE],
    pos: usize,
    end: usize,
}

impl<I: BitstreamInput> ByteSource<I> {
    pub fn new(input: I) -> ByteSource<I> {
        ByteSource {
            input,
            buf: [0; BUFFER_SIZE],
            pos: 0,
            end: 0,
        }
    }

    /// Refills the internal buffer; returns false at end of stream.
    fn fill(&mut self) -> Result<bool> {
        debug_assert!(self.pos == self.end);
        self.pos = 0;
        self.end = self.input.read(&mut self.buf)?;
        Ok(self.end > 0)
    }

    pub fn read_byte(&mut self) -> Result<u8> {
        if self.pos == self.end && !self.fill()? {
            return Err(Error::UnexpectedEof);
        }
        let b = self.buf[self.pos];
        self.pos += 1;
        Ok(b)
    }

    /// Reads a big-endian 16-bit value, as used by segment lengths and most
    /// header fields.
    pub fn read_u16(&mut self) -> Result<u16> {
        let buf = [self.read_byte()?, self.read_byte()?];
        Ok(byteorder::BigEndian::read_u16(&buf))
    }

    /// Exact-length read; fails fast on premature end of stream.
    pub fn read_full(&mut self, out: &mut [u8]) -> Result<()> {
        let mut written = 0;
        while written < out.len() {
            if self.pos == self.end && !self.fill()? {
                return Err(Error::UnexpectedEof);
            }
            let num = (out.len() - written).min(self.end - self.pos);
            out[written..written + num].copy_from_slice(&self.buf[self.pos..self.pos + num]);
            self.pos += num;
            written += num;
        }
        Ok(())
    }

    pub fn skip(&mut self, bytes: usize) -> Result<()> {
        let buffered = (self.end - self.pos).min(bytes);
        self.pos += buffered;
        let left = bytes - buffered;
        if left > 0 && self.input.skip(left)? < left {
            return Err(Error::UnexpectedEof);
        }
        Ok(())
    }

    /// Reads the next marker code. The next byte must be `0xFF`; any number
    /// of `0xFF` fill bytes before the marker id is tolerated. The returned
    /// code may be `0x00` (a stuffed byte); callers outside entropy-coded
    /// data must treat that as a protocol violation.
    pub fn next_marker(&mut self) -> Result<u8> {
        let b = self.read_byte()?;
        if b != 0xFF {
            trace!(byte = b, "expected marker, found data byte");
            return Err(Error::UnexpectedMarker(b));
        }
        loop {
            let code = self.read_byte()?;
            if code != 0xFF {
                return Ok(code);
            }
        }
    }
}
