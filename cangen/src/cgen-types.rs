/*
 * Copyright (C) 2015-2023 IoT.bzh Company
 * Author: Fulup Ar Foll <fulup@iot.bzh>
 *
 * License: $RP_BEGIN_LICENSE$ SPDX:MIT https://opensource.org/licenses/MIT $RP_END_LICENSE$
 */

use crate::data::Signal;

/// Concrete C storage type backing one signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CType {
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Int8,
    Int16,
    Int32,
    Int64,
    Float,
    Double,
}

impl CType {
    pub fn name(self) -> &'static str {
        match self {
            CType::Uint8 => "uint8_t",
            CType::Uint16 => "uint16_t",
            CType::Uint32 => "uint32_t",
            CType::Uint64 => "uint64_t",
            CType::Int8 => "int8_t",
            CType::Int16 => "int16_t",
            CType::Int32 => "int32_t",
            CType::Int64 => "int64_t",
            CType::Float => "float",
            CType::Double => "double",
        }
    }

    /// Literal suffix appended to numeric constants of this type so emitted
    /// comparisons are performed at the right width.
    pub fn suffix(self) -> &'static str {
        match self {
            CType::Uint8 | CType::Uint16 | CType::Uint32 => "u",
            CType::Uint64 => "ull",
            CType::Int64 => "ll",
            CType::Float => "f",
            CType::Int8 | CType::Int16 | CType::Int32 | CType::Double => "",
        }
    }

    /// Natural representable minimum, `None` for floats.
    pub fn minimum(self) -> Option<f64> {
        match self {
            CType::Int8 => Some(-128.0),
            CType::Int16 => Some(-32768.0),
            CType::Int32 => Some(-2147483648.0),
            CType::Int64 => Some(-9223372036854775808.0),
            CType::Uint8 | CType::Uint16 | CType::Uint32 | CType::Uint64 => Some(0.0),
            CType::Float | CType::Double => None,
        }
    }

    /// Natural representable maximum, `None` for floats.
    pub fn maximum(self) -> Option<f64> {
        match self {
            CType::Int8 => Some(127.0),
            CType::Int16 => Some(32767.0),
            CType::Int32 => Some(2147483647.0),
            CType::Int64 => Some(9223372036854775807.0),
            CType::Uint8 => Some(255.0),
            CType::Uint16 => Some(65535.0),
            CType::Uint32 => Some(4294967295.0),
            CType::Uint64 => Some(18446744073709551615.0),
            CType::Float | CType::Double => None,
        }
    }

    pub fn is_float(self) -> bool {
        matches!(self, CType::Float | CType::Double)
    }
}

/// Map a signal shape to its storage type: floats need width 32 or 64, the
/// integer path picks the smallest fitting fixed width up to 64 bits.
/// `None` means the signal has no generated representation.
pub fn resolve_type(signal: &Signal) -> Option<CType> {
    if signal.is_float {
        return match signal.size {
            32 => Some(CType::Float),
            64 => Some(CType::Double),
            _ => None,
        };
    }

    let ctype = match signal.size {
        1..=8 => {
            if signal.is_signed() {
                CType::Int8
            } else {
                CType::Uint8
            }
        }
        9..=16 => {
            if signal.is_signed() {
                CType::Int16
            } else {
                CType::Uint16
            }
        }
        17..=32 => {
            if signal.is_signed() {
                CType::Int32
            } else {
                CType::Uint32
            }
        }
        33..=64 => {
            if signal.is_signed() {
                CType::Int64
            } else {
                CType::Uint64
            }
        }
        _ => return None,
    };
    Some(ctype)
}

/// Render a numeric constant: integral values without fraction digits
/// (with a forced `.0` for float-typed literals), others as-is.
pub fn format_decimal(value: f64, is_float: bool) -> String {
    if value == value.trunc() && value.abs() < 2e19 {
        let value = value as i128;
        if is_float {
            format!("{}.0", value)
        } else {
            format!("{}", value)
        }
    } else {
        format!("{}", value)
    }
}
