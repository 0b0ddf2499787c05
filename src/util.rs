// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

pub mod tracing_wrappers {
    #[allow(unused_imports)]
    pub use tracing::{debug, error, info, instrument, trace, warn};
}
