/*
 * Copyright (C) 2015-2023 IoT.bzh Company
 * Author: Fulup Ar Foll <fulup@iot.bzh>
 *
 * License: $RP_BEGIN_LICENSE$ SPDX:MIT https://opensource.org/licenses/MIT $RP_END_LICENSE$
 */

#![doc(
    html_logo_url = "https://iot.bzh/images/defaults/company/512-479-max-transp.png",
    html_favicon_url = "https://iot.bzh/images/defaults/favicon.ico"
)]

//! C encoder/decoder source generator for CAN signal databases.
//!
//! The input is an in-memory [`data::Database`] (messages, signals, optional
//! multiplexer tree); the output is a pair of C text artifacts (header and
//! source) with branchless bit packing/unpacking routines per message.

#[path = "cgen-data.rs"]
pub mod data;

#[path = "cgen-error.rs"]
pub mod error;

#[path = "cgen-names.rs"]
pub mod names;

#[path = "cgen-types.rs"]
pub mod types;

#[path = "cgen-bits.rs"]
pub mod bits;

#[path = "cgen-encode.rs"]
pub mod encode;

#[path = "cgen-decode.rs"]
pub mod decode;

#[path = "cgen-gencode.rs"]
pub mod gencode;

pub use crate::data::*;
pub use crate::gencode::*;

/// Convenience re-exports for `use cangen::prelude::*;`.
pub mod prelude {
    pub use crate::bits::*;
    pub use crate::data::*;
    pub use crate::error::*;
    pub use crate::gencode::*;
    pub use crate::names::*;
    pub use crate::types::*;
}
