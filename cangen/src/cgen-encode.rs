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

/// Assemble the encode body of one message: temporary float declarations and
/// the per-byte OR-assignment statements, as two newline-joined blocks.
pub(crate) fn format_encode_code(message: &Message) -> Result<(String, String), CodeGenError> {
    let mut variable_lines = Vec::new();
    let body_lines = encode_level(message, &message.tree, &mut variable_lines)?;

    if !variable_lines.is_empty() {
        variable_lines.push(String::new());
        variable_lines.push(String::new());
    }

    Ok((variable_lines.join("\n"), body_lines.join("\n")))
}

/// Format one encode level of a signal tree. Statements of all plain signals
/// at this level are grouped by ascending destination byte index; multiplexer
/// dispatches follow.
fn encode_level(
    message: &Message,
    nodes: &[SignalNode],
    variable_lines: &mut Vec<String>,
) -> Result<Vec<String>, CodeGenError> {
    let mut body_per_index: BTreeMap<usize, Vec<String>> = BTreeMap::new();
    let mut conversion_lines = Vec::new();
    let mut muxes_lines = Vec::new();

    for node in nodes {
        match node {
            SignalNode::Sig(name) => encode_signal(
                message,
                name,
                &mut body_per_index,
                variable_lines,
                &mut conversion_lines,
            )?,
            SignalNode::Mux { selector, branches } => muxes_lines.extend(encode_mux(
                message,
                selector,
                branches,
                &mut body_per_index,
                variable_lines,
                &mut conversion_lines,
            )?),
        }
    }

    if !conversion_lines.is_empty() {
        conversion_lines.push(String::new());
    }

    let mut lines = conversion_lines;
    lines.extend(body_per_index.into_values().flatten());
    lines.extend(muxes_lines);

    if !lines.is_empty() {
        lines.insert(0, String::new());
        lines.push(String::new());
    }

    Ok(lines)
}

fn encode_signal(
    message: &Message,
    name: &str,
    body_per_index: &mut BTreeMap<usize, Vec<String>>,
    variable_lines: &mut Vec<String>,
    conversion_lines: &mut Vec<String>,
) -> Result<(), CodeGenError> {
    let Some(signal) = message.signal_by_name(name) else {
        return Err(CodeGenError::UnknownSignal {
            message: message.name.clone(),
            signal: name.to_owned(),
        });
    };

    // Unrepresentable shapes have no struct member to read from.
    if resolve_type(signal).is_none() {
        return Ok(());
    }

    let signal_name = snake_ident(name);

    if signal.is_float {
        let (word, conversion) = if signal.size == 32 {
            ("uint32_t", "ftoi")
        } else {
            ("uint64_t", "dtoi")
        };
        variable_lines.push(format!("    {} {};", word, signal_name));
        conversion_lines.push(format!(
            "    {0} = {1}(src_p->{0});",
            signal_name, conversion
        ));
    }

    for segment in signal_segments(signal, Direction::Encode) {
        let line = if signal.is_float {
            format!(
                "    dst_p[{}] |= (({} {}) & 0x{:02x});",
                segment.index, signal_name, segment.shift, segment.mask
            )
        } else {
            format!(
                "    dst_p[{}] |= ((src_p->{} {}) & 0x{:02x});",
                segment.index, signal_name, segment.shift, segment.mask
            )
        };
        body_per_index.entry(segment.index).or_default().push(line);
    }

    Ok(())
}

fn encode_mux(
    message: &Message,
    selector: &str,
    branches: &BTreeMap<u64, Vec<SignalNode>>,
    body_per_index: &mut BTreeMap<usize, Vec<String>>,
    variable_lines: &mut Vec<String>,
    conversion_lines: &mut Vec<String>,
) -> Result<Vec<String>, CodeGenError> {
    encode_signal(
        message,
        selector,
        body_per_index,
        variable_lines,
        conversion_lines,
    )?;

    let mut lines = vec![
        String::new(),
        format!("switch (src_p->{}) {{", snake_ident(selector)),
    ];

    for (mux_id, branch) in branches {
        let body_lines = encode_level(message, branch, variable_lines)?;
        lines.push(String::new());
        lines.push(format!("case {}:", mux_id));

        if body_lines.len() > 2 {
            lines.extend(body_lines[1..body_lines.len() - 1].iter().cloned());
        }

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
