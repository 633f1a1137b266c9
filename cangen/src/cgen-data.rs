/*
 * Copyright (C) 2015-2023 IoT.bzh Company
 * Author: Fulup Ar Foll <fulup@iot.bzh>
 *
 * License: $RP_BEGIN_LICENSE$ SPDX:MIT https://opensource.org/licenses/MIT $RP_END_LICENSE$
 */

use std::collections::BTreeMap;

use crate::bits::{signal_segments, Direction};
use crate::error::CodeGenError;

/// Signal byte order on the wire.
///
/// Big endian uses Motorola bit-significant numbering (start bit is the most
/// significant bit); little endian uses Intel byte-significant numbering
/// (start bit is the least significant bit).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    LittleEndian,
    BigEndian,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Signed,
    Unsigned,
}

/// Enumerated raw values, keyed by raw integer value. Map order (ascending
/// value) is the emission order of the generated choice defines.
pub type Choices = BTreeMap<i64, String>;

/// One named, bit-addressed field within a message.
///
/// `start_bit` is a 0-based bit index into the message byte array; `size` is
/// the width in bits (`>= 1`). Physical value = raw * factor + offset.
#[derive(Debug, Clone)]
pub struct Signal {
    pub name: String,
    pub start_bit: u64,
    pub size: u64,
    pub byte_order: ByteOrder,
    pub value_type: ValueType,
    pub is_float: bool,
    pub factor: f64,
    pub offset: f64,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub unit: Option<String>,
    pub comment: Option<String>,
    pub choices: Option<Choices>,
}

impl Signal {
    pub fn new(name: &str, start_bit: u64, size: u64, byte_order: ByteOrder) -> Self {
        Signal {
            name: name.to_owned(),
            start_bit,
            size,
            byte_order,
            value_type: ValueType::Unsigned,
            is_float: false,
            factor: 1.0,
            offset: 0.0,
            min: None,
            max: None,
            unit: None,
            comment: None,
            choices: None,
        }
    }

    pub fn signed(mut self) -> Self {
        self.value_type = ValueType::Signed;
        self
    }

    /// Mark as an IEEE float signal. Only 32/64 bit widths resolve to a
    /// generated type; other widths are dropped with a warning.
    pub fn float(mut self) -> Self {
        self.is_float = true;
        self
    }

    pub fn scaling(mut self, factor: f64, offset: f64) -> Self {
        self.factor = factor;
        self.offset = offset;
        self
    }

    /// Set both physical bounds. The fields are public; set `min`/`max`
    /// directly for a one-sided bound.
    pub fn range(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    pub fn unit(mut self, unit: &str) -> Self {
        self.unit = Some(unit.to_owned());
        self
    }

    pub fn comment(mut self, comment: &str) -> Self {
        self.comment = Some(comment.to_owned());
        self
    }

    pub fn choices(mut self, choices: Choices) -> Self {
        self.choices = Some(choices);
        self
    }

    pub fn is_signed(&self) -> bool {
        self.value_type == ValueType::Signed
    }
}

/// One node of a message's signal tree.
///
/// A `Mux` node stands in for its discriminator: `selector` names a signal
/// declared in the message's signal list that gets no `Sig` leaf of its own.
/// The node packs/unpacks the discriminator itself, then dispatches on its
/// value to activate one branch of signals per multiplexer id. Branches may
/// nest further `Mux` nodes.
#[derive(Debug, Clone)]
pub enum SignalNode {
    Sig(String),
    Mux {
        selector: String,
        branches: BTreeMap<u64, Vec<SignalNode>>,
    },
}

/// CAN frame identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MessageId(pub u32);

impl MessageId {
    pub fn to_u32(self) -> u32 {
        self.0
    }
}

/// One fixed-layout message. `size` is the wire length in bytes; zero is
/// allowed and generates fixed no-op encode/decode routines.
#[derive(Debug, Clone)]
pub struct Message {
    pub name: String,
    pub id: MessageId,
    pub size: u64,
    pub signals: Vec<Signal>,
    pub tree: Vec<SignalNode>,
}

impl Message {
    /// Build a message with a flat signal tree (every signal a plain leaf,
    /// in declaration order). Use [`Message::with_tree`] for multiplexing.
    pub fn new(name: &str, id: u32, size: u64, signals: Vec<Signal>) -> Self {
        let tree = signals
            .iter()
            .map(|signal| SignalNode::Sig(signal.name.clone()))
            .collect();
        Message {
            name: name.to_owned(),
            id: MessageId(id),
            size,
            signals,
            tree,
        }
    }

    pub fn with_tree(mut self, tree: Vec<SignalNode>) -> Self {
        self.tree = tree;
        self
    }

    pub fn signal_by_name(&self, name: &str) -> Option<&Signal> {
        self.signals.iter().find(|signal| signal.name == name)
    }

    /// Reject layouts where two simultaneously active signals claim the same
    /// bit. Signals in sibling multiplexer branches may legally share bits;
    /// each branch is checked against its ancestors only.
    pub(crate) fn check_overlaps(&self) -> Result<(), CodeGenError> {
        let mut occupied = BTreeMap::new();
        self.check_level(&self.tree, &mut occupied)
    }

    fn check_level(
        &self,
        nodes: &[SignalNode],
        occupied: &mut BTreeMap<usize, u8>,
    ) -> Result<(), CodeGenError> {
        for node in nodes {
            match node {
                SignalNode::Sig(name) => self.claim_bits(name, occupied)?,
                SignalNode::Mux { selector, branches } => {
                    self.claim_bits(selector, occupied)?;
                    for branch in branches.values() {
                        let mut scoped = occupied.clone();
                        self.check_level(branch, &mut scoped)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn claim_bits(
        &self,
        name: &str,
        occupied: &mut BTreeMap<usize, u8>,
    ) -> Result<(), CodeGenError> {
        let Some(signal) = self.signal_by_name(name) else {
            return Err(CodeGenError::UnknownSignal {
                message: self.name.clone(),
                signal: name.to_owned(),
            });
        };

        for segment in signal_segments(signal, Direction::Encode) {
            let cell = occupied.entry(segment.index).or_insert(0);
            if *cell & segment.mask != 0 {
                return Err(CodeGenError::OverlappingSignals {
                    message: self.name.clone(),
                    signal: name.to_owned(),
                });
            }
            *cell |= segment.mask;
        }
        Ok(())
    }
}

/// Immutable database snapshot. Message declaration order determines the
/// emission order in the generated artifacts.
#[derive(Debug, Clone, Default)]
pub struct Database {
    pub messages: Vec<Message>,
}

impl Database {
    pub fn new(messages: Vec<Message>) -> Self {
        Database { messages }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn two_bit(name: &str, start_bit: u64) -> Signal {
        Signal::new(name, start_bit, 2, ByteOrder::LittleEndian)
    }

    #[test]
    fn flat_tree_follows_signal_order() {
        let msg = Message::new(
            "M",
            1,
            1,
            vec![two_bit("B", 2), two_bit("A", 0)],
        );
        let names: Vec<&str> = msg
            .tree
            .iter()
            .map(|node| match node {
                SignalNode::Sig(name) => name.as_str(),
                SignalNode::Mux { .. } => panic!("no mux expected"),
            })
            .collect();
        assert_eq!(names, ["B", "A"]);
    }

    #[test]
    fn overlap_in_flat_layout_is_rejected() {
        let msg = Message::new("M", 1, 1, vec![two_bit("A", 0), two_bit("B", 1)]);
        assert!(matches!(
            msg.check_overlaps(),
            Err(CodeGenError::OverlappingSignals { .. })
        ));
    }

    #[test]
    fn overlap_across_mux_branches_is_legal() {
        let signals = vec![two_bit("Sel", 0), two_bit("A", 2), two_bit("B", 2)];
        let mut branches = BTreeMap::new();
        branches.insert(0, vec![SignalNode::Sig("A".to_owned())]);
        branches.insert(1, vec![SignalNode::Sig("B".to_owned())]);
        let msg = Message::new("M", 1, 1, signals).with_tree(vec![SignalNode::Mux {
            selector: "Sel".to_owned(),
            branches,
        }]);
        assert!(msg.check_overlaps().is_ok());
    }

    #[test]
    fn branch_signal_overlapping_selector_is_rejected() {
        let signals = vec![two_bit("Sel", 0), two_bit("A", 1)];
        let mut branches = BTreeMap::new();
        branches.insert(0, vec![SignalNode::Sig("A".to_owned())]);
        let msg = Message::new("M", 1, 1, signals).with_tree(vec![SignalNode::Mux {
            selector: "Sel".to_owned(),
            branches,
        }]);
        assert!(matches!(
            msg.check_overlaps(),
            Err(CodeGenError::OverlappingSignals { .. })
        ));
    }

    #[test]
    fn unknown_tree_leaf_is_reported() {
        let msg = Message::new("M", 1, 1, vec![two_bit("A", 0)])
            .with_tree(vec![SignalNode::Sig("Nope".to_owned())]);
        assert!(matches!(
            msg.check_overlaps(),
            Err(CodeGenError::UnknownSignal { .. })
        ));
    }

    #[test]
    fn unknown_mux_selector_is_reported() {
        let msg = Message::new("M", 1, 1, vec![two_bit("A", 0)]).with_tree(vec![SignalNode::Mux {
            selector: "Ghost".to_owned(),
            branches: BTreeMap::new(),
        }]);
        assert!(matches!(
            msg.check_overlaps(),
            Err(CodeGenError::UnknownSignal { .. })
        ));
    }
}
