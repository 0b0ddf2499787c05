// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Segment payload parsers. Every parser consumes exactly the number of
//! bytes the segment's length field declared, skipping trailing bytes it
//! does not understand.

pub mod app;
pub mod frame;
pub mod quant;
pub mod scan;
