/*
 * Copyright (C) 2015-2023 IoT.bzh Company
 * Author: Fulup Ar Foll <fulup@iot.bzh>
 *
 * License: $RP_BEGIN_LICENSE$ SPDX:MIT https://opensource.org/licenses/MIT $RP_END_LICENSE$
 */

use std::fmt;

use crate::data::{ByteOrder, Signal};

/// Which way the bits move: scatter a field into bytes (encode) or gather
/// bytes into a field (decode). Same geometry, inverted shifts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Encode,
    Decode,
}

/// One shift operation as it appears in the emitted statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftOp {
    Left(u64),
    Right(u64),
}

impl fmt::Display for ShiftOp {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShiftOp::Left(count) => write!(fmt, "<< {}", count),
            ShiftOp::Right(count) => write!(fmt, ">> {}", count),
        }
    }
}

/// One (byte index, shift, mask) unit of a signal's layout. `mask` selects
/// exactly the bits of byte `index` belonging to this chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub index: usize,
    pub shift: ShiftOp,
    pub mask: u8,
}

/// Decompose a signal's bit span into per-byte segments, ordered by byte
/// index. Concatenating the segment bit ranges reconstructs the signal's
/// full span with no gap or overlap.
pub fn signal_segments(signal: &Signal, direction: Direction) -> Vec<Segment> {
    let mut index = (signal.start_bit / 8) as usize;
    let mut pos = signal.start_bit % 8;
    let mut left = signal.size;
    let mut segments = Vec::new();

    while left > 0 {
        let length;
        let shift: i64;
        let mask: u8;

        match signal.byte_order {
            ByteOrder::BigEndian => {
                if left > pos + 1 {
                    // High-order chunk: significance continues into the
                    // next byte, restarting at bit 7.
                    length = pos + 1;
                    shift = -((left - length) as i64);
                    mask = ((1u16 << length) - 1) as u8;
                    pos = 7;
                } else {
                    length = left;
                    shift = (pos + 1 - length) as i64;
                    mask = (((1u16 << length) - 1) << (pos + 1 - length)) as u8;
                }
            }
            ByteOrder::LittleEndian => {
                shift = left as i64 - signal.size as i64 + pos as i64;
                if left >= 8 - pos {
                    length = 8 - pos;
                    mask = (((1u16 << length) - 1) << pos) as u8;
                    pos = 0;
                } else {
                    length = left;
                    mask = (((1u16 << length) - 1) << pos) as u8;
                }
            }
        }

        let shift = match (direction, shift >= 0) {
            (Direction::Encode, true) => ShiftOp::Left(shift as u64),
            (Direction::Encode, false) => ShiftOp::Right(shift.unsigned_abs()),
            (Direction::Decode, true) => ShiftOp::Right(shift as u64),
            (Direction::Decode, false) => ShiftOp::Left(shift.unsigned_abs()),
        };

        segments.push(Segment { index, shift, mask });
        left -= length;
        index += 1;
    }

    segments
}
