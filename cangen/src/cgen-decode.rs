/*
 * Copyright (C) 2015-2023 IoT.bzh Company
 * Author: Fulup Ar Foll <fulup@iot.bzh>
 *
 * License: $RP_BEGIN_LICENSE$ SPDX:MIT https://opensource.org/licenses/MIT $RP_END_LICENSE$
 */

use std::collections::BTreeMap;

use crate::bits::{signal_segments, Direction};
use crate::data::{Message, SignalNode};
use crate::error::CodeGenError;
use crate::names::snake_ident;
use crate::types::resolve_type;

/// Assemble the decode body of one message: temporary float accumulators and
/// the unpack statements, as two newline-joined blocks.
pub(crate) fn format_decode_code(message: &Message) -> Result<(String, String), CodeGenError> {
    let mut variable_lines = Vec::new();
    let body_lines = decode_level(message, &message.tree, &mut variable_lines)?;

    if !variable_lines.is_empty() {
        variable_lines.push(String::new());
        variable_lines.push(String::new());
    }

    Ok((variable_lines.join("\n"), body_lines.join("\n")))
}

/// Format one decode level of a signal tree: plain signals in declaration
/// order, then multiplexer dispatches, then float reinterpretations.
fn decode_level(
    message: &Message,
    nodes: &[SignalNode],
    variable_lines: &mut Vec<String>,
) -> Result<Vec<String>, CodeGenError> {
    let mut body_lines: Vec<String> = Vec::new();
    let mut conversion_lines = Vec::new();
    let mut muxes_lines: Vec<String> = Vec::new();

    for node in nodes {
        match node {
            SignalNode::Sig(name) => decode_signal(
                message,
                name,
                &mut body_lines,
                variable_lines,
                &mut conversion_lines,
            )?,
            SignalNode::Mux { selector, branches } => {
                let mux_lines = decode_mux(
                    message,
                    selector,
                    branches,
                    &mut body_lines,
                    variable_lines,
                    &mut conversion_lines,
                )?;
                if !muxes_lines.is_empty() {
                    muxes_lines.push(String::new());
                }
                muxes_lines.extend(mux_lines);
            }
        }
    }

    if !conversion_lines.is_empty() {
        conversion_lines.push(String::new());
    }

    if let Some(last) = body_lines.last() {
        if !last.is_empty() {
            body_lines.push(String::new());
        }
    }

    if !muxes_lines.is_empty() {
        muxes_lines.push(String::new());
    }

    let mut lines = body_lines;
    lines.extend(muxes_lines);
    lines.extend(conversion_lines);

    if !lines.is_empty() {
        lines.insert(0, String::new());
    }

    Ok(lines)
}

fn decode_signal(
    message: &Message,
    name: &str,
    body_lines: &mut Vec<String>,
    variable_lines: &mut Vec<String>,
    conversion_lines: &mut Vec<String>,
) -> Result<(), CodeGenError> {
    let Some(signal) = message.signal_by_name(name) else {
        return Err(CodeGenError::UnknownSignal {
            message: message.name.clone(),
            signal: name.to_owned(),
        });
    };

    if resolve_type(signal).is_none() {
        return Ok(());
    }

    let signal_name = snake_ident(name);
    let type_length: u64 = match signal.size {
        1..=8 => 8,
        9..=16 => 16,
        17..=32 => 32,
        _ => 64,
    };

    for segment in signal_segments(signal, Direction::Decode) {
        let line = if signal.is_float {
            format!(
                "    {} |= ((uint{}_t)(src_p[{}] & 0x{:02x}) {});",
                signal_name, type_length, segment.index, segment.mask, segment.shift
            )
        } else {
            format!(
                "    dst_p->{} |= ((uint{}_t)(src_p[{}] & 0x{:02x}) {});",
                signal_name, type_length, segment.index, segment.mask, segment.shift
            )
        };
        body_lines.push(line);
    }

    if signal.is_float {
        let (word, conversion) = if signal.size == 32 {
            ("uint32_t", "itof")
        } else {
            ("uint64_t", "itod")
        };
        variable_lines.push(format!("    {} {} = 0;", word, signal_name));
        conversion_lines.push(format!(
            "    dst_p->{0} = {1}({0});",
            signal_name, conversion
        ));
    } else if signal.is_signed() && type_length > signal.size {
        // Propagate the sign bit into the unused high-order bits of the
        // storage type.
        let mask = ((1u64 << (type_length - signal.size)) - 1) << signal.size;
        body_lines.push(String::new());
        body_lines.push(format!(
            "    if (dst_p->{} & (1 << {})) {{",
            signal_name,
            signal.size - 1
        ));
        body_lines.push(format!("        dst_p->{} |= 0x{:x};", signal_name, mask));
        body_lines.push("    }".to_owned());
        body_lines.push(String::new());
    }

    Ok(())
}

fn decode_mux(
    message: &Message,
    selector: &str,
    branches: &BTreeMap<u64, Vec<SignalNode>>,
    body_lines: &mut Vec<String>,
    variable_lines: &mut Vec<String>,
    conversion_lines: &mut Vec<String>,
) -> Result<Vec<String>, CodeGenError> {
    decode_signal(
        message,
        selector,
        body_lines,
        variable_lines,
        conversion_lines,
    )?;

    let mut lines = vec![format!("switch (dst_p->{}) {{", snake_ident(selector))];

    for (mux_id, branch) in branches {
        let branch_lines = decode_level(message, branch, variable_lines)?;
        lines.push(String::new());
        lines.push(format!("case {}:", mux_id));
        lines.extend(strip_blank_lines(&branch_lines));
        lines.push("    break;".to_owned());
    }

    lines.push(String::new());
    lines.push("default:".to_owned());
    lines.push("    break;".to_owned());
    lines.push("}".to_owned());

    Ok(lines
        .iter()
        .map(|line| format!("    {}", line).trim_end().to_owned())
        .collect())
}

fn strip_blank_lines(lines: &[String]) -> Vec<String> {
    let start = lines.iter().position(|line| !line.is_empty());
    let end = lines.iter().rposition(|line| !line.is_empty());
    match (start, end) {
        (Some(start), Some(end)) => lines[start..=end].to_vec(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::data::{ByteOrder, Signal};

    fn motohawk_message() -> Message {
        Message::new(
            "ExampleMessage",
            496,
            8,
            vec![
                Signal::new("Enable", 7, 1, ByteOrder::BigEndian),
                Signal::new("AverageRadius", 6, 6, ByteOrder::BigEndian).scaling(0.1, 0.0),
                Signal::new("Temperature", 0, 12, ByteOrder::BigEndian)
                    .signed()
                    .scaling(0.01, 250.0),
            ],
        )
    }

    #[test]
    fn unpack_statements_with_sign_extension() {
        let (variables, body) = format_decode_code(&motohawk_message()).unwrap();
        assert_eq!(variables, "");
        assert_eq!(
            body,
            "\n    dst_p->enable |= ((uint8_t)(src_p[0] & 0x80) >> 7);\n\
             \x20   dst_p->average_radius |= ((uint8_t)(src_p[0] & 0x7e) >> 1);\n\
             \x20   dst_p->temperature |= ((uint16_t)(src_p[0] & 0x01) << 11);\n\
             \x20   dst_p->temperature |= ((uint16_t)(src_p[1] & 0xff) << 3);\n\
             \x20   dst_p->temperature |= ((uint16_t)(src_p[2] & 0xe0) >> 5);\n\
             \n\
             \x20   if (dst_p->temperature & (1 << 11)) {\n\
             \x20       dst_p->temperature |= 0xf000;\n\
             \x20   }\n"
        );
    }

    #[test]
    fn exactly_filled_storage_needs_no_sign_extension() {
        let message = Message::new(
            "Full",
            1,
            2,
            vec![Signal::new("Word", 0, 16, ByteOrder::LittleEndian).signed()],
        );
        let (_, body) = format_decode_code(&message).unwrap();
        assert!(!body.contains("if (dst_p->word"));
    }

    #[test]
    fn float_signal_reinterprets_after_merge() {
        let message = Message::new(
            "Sensor",
            1,
            8,
            vec![Signal::new("Reading", 0, 64, ByteOrder::LittleEndian).float()],
        );
        let (variables, body) = format_decode_code(&message).unwrap();
        assert_eq!(variables, "    uint64_t reading = 0;\n\n");
        assert!(body.contains("    reading |= ((uint64_t)(src_p[0] & 0xff) >> 0);"));
        assert!(body.contains("    reading |= ((uint64_t)(src_p[7] & 0xff) << 56);"));
        assert!(body.ends_with("\n    dst_p->reading = itod(reading);\n"));
    }

    #[test]
    fn mux_dispatch_on_decoded_selector() {
        let signals = vec![
            Signal::new("Selector", 0, 8, ByteOrder::LittleEndian),
            Signal::new("BranchZero", 8, 8, ByteOrder::LittleEndian),
            Signal::new("BranchOne", 8, 8, ByteOrder::LittleEndian),
        ];
        let mut branches = BTreeMap::new();
        branches.insert(0, vec![SignalNode::Sig("BranchZero".to_owned())]);
        branches.insert(1, vec![SignalNode::Sig("BranchOne".to_owned())]);
        let message = Message::new("Muxed", 2, 2, signals).with_tree(vec![SignalNode::Mux {
            selector: "Selector".to_owned(),
            branches,
        }]);

        let (_, body) = format_decode_code(&message).unwrap();
        assert_eq!(
            body,
            "\n    dst_p->selector |= ((uint8_t)(src_p[0] & 0xff) >> 0);\n\
             \n\
             \x20   switch (dst_p->selector) {\n\
             \n\
             \x20   case 0:\n\
             \x20       dst_p->branch_zero |= ((uint8_t)(src_p[1] & 0xff) >> 0);\n\
             \x20       break;\n\
             \n\
             \x20   case 1:\n\
             \x20       dst_p->branch_one |= ((uint8_t)(src_p[1] & 0xff) >> 0);\n\
             \x20       break;\n\
             \n\
             \x20   default:\n\
             \x20       break;\n\
             \x20   }\n"
        );
        // The selector is unpacked once, by the mux dispatch itself.
        assert_eq!(
            body.matches("dst_p->selector |= ((uint8_t)(src_p[0] & 0xff) >> 0);")
                .count(),
            1
        );
    }
}
