/*
 * Copyright (C) 2015-2023 IoT.bzh Company
 * Author: Fulup Ar Foll <fulup@iot.bzh>
 *
 * License: $RP_BEGIN_LICENSE$ SPDX:MIT https://opensource.org/licenses/MIT $RP_END_LICENSE$
 */

use thiserror::Error;

/// Fatal generation errors. Generation is all-or-nothing: any of these
/// aborts the pass without producing artifacts.
#[derive(Debug, Error)]
pub enum CodeGenError {
    /// The builder was run without a database name.
    #[error("setting database name is mandatory")]
    MissingDatabaseName,

    /// Two signals that can be active at the same time claim the same bit.
    #[error("message:{message} signal:{signal} overlaps an already packed bit")]
    OverlappingSignals { message: String, signal: String },

    /// A signal-tree entry names a signal the message does not declare.
    #[error("message:{message} signal:{signal} not found in message signal list")]
    UnknownSignal { message: String, signal: String },
}

/// Non-fatal per-signal notices collected during a generation pass.
///
/// A warned signal is dropped from the generated struct and from the
/// encode/decode bodies; the rest of the message is generated normally.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Warning {
    #[error("message:{message} signal:{signal}: floating point signal not 32 or 64 bits")]
    UnsupportedFloatWidth {
        message: String,
        signal: String,
        size: u64,
    },

    #[error("message:{message} signal:{signal}: signal lengths over 64 bits are not supported")]
    UnsupportedLength {
        message: String,
        signal: String,
        size: u64,
    },
}
