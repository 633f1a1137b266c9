/*
 * Copyright (C) 2015-2023 IoT.bzh Company
 * Author: Fulup Ar Foll <fulup@iot.bzh>
 *
 * License: $RP_BEGIN_LICENSE$ SPDX:MIT https://opensource.org/licenses/MIT $RP_END_LICENSE$
 */

use crate::data::{Database, Message, Signal};
use crate::decode::format_decode_code;
use crate::encode::format_encode_code;
use crate::error::{CodeGenError, Warning};
use crate::names::{macro_ident, snake_ident, unique_choices};
use crate::types::{format_decimal, resolve_type, CType};

const IDT0: &str = "";
const IDT1: &str = "    ";
const IDT2: &str = "        ";

#[macro_export]
macro_rules! code_output {
 ($code:ident, $indent:ident, $format:expr, $( $args:expr ),*) => {
    $code.output ($indent,  format! ($format, $($args),*))
 };
 ($code:ident, $indent:ident,$format:expr) => {
    $code.output ($indent, $format)
 }
}

/// In-memory code buffer. Lines go through [`Text2Str`] with an explicit
/// indent prefix; preassembled multi-line fragments go through `raw`.
pub struct CodeText {
    text: String,
}

impl CodeText {
    pub fn new() -> Self {
        CodeText {
            text: String::new(),
        }
    }

    pub fn raw(&mut self, text: &str) {
        self.text.push_str(text);
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

impl Default for CodeText {
    fn default() -> Self {
        Self::new()
    }
}

pub trait Text2Str<T> {
    /// Write a line with indentation.
    fn write(&mut self, indent: &str, text: T);
}

impl Text2Str<&str> for CodeText {
    fn write(&mut self, indent: &str, text: &str) {
        self.text.push_str(indent);
        self.text.push_str(text);
        self.text.push('\n');
    }
}

impl Text2Str<String> for CodeText {
    fn write(&mut self, indent: &str, text: String) {
        Self::write(self, indent, text.as_str())
    }
}

impl CodeText {
    fn output<T>(&mut self, indent: &str, text: T)
    where
        CodeText: Text2Str<T>,
    {
        Self::write(self, indent, text)
    }
}

/// Generated artifacts: the C header, the C source and the non-fatal
/// notices collected while producing them.
#[derive(Debug)]
pub struct GenOutput {
    pub header: String,
    pub source: String,
    pub warnings: Vec<Warning>,
}

/// C source generator for one CAN database.
///
/// `database_name` prefixes every define, struct and function; it is
/// mandatory. `header_name` is the file name the source `#include`s and
/// defaults to `{database_name}.h`.
pub struct CodeGen<'a> {
    database: &'a Database,
    database_name: Option<String>,
    header_name: Option<String>,
}

impl<'a> CodeGen<'a> {
    #[must_use]
    pub fn new(database: &'a Database) -> Self {
        CodeGen {
            database,
            database_name: None,
            header_name: None,
        }
    }

    pub fn database_name(&mut self, name: &str) -> &mut Self {
        self.database_name = Some(name.to_owned());
        self
    }

    pub fn header_name(&mut self, name: &str) -> &mut Self {
        self.header_name = Some(name.to_owned());
        self
    }

    /// Generate the header and source artifacts. Output is deterministic:
    /// same database, same text.
    pub fn generate(&self) -> Result<GenOutput, CodeGenError> {
        let Some(database_name) = &self.database_name else {
            return Err(CodeGenError::MissingDatabaseName);
        };

        for message in &self.database.messages {
            message.check_overlaps()?;
        }

        let header_name = match &self.header_name {
            Some(name) => name.clone(),
            None => format!("{}.h", database_name),
        };

        let mut warnings = Vec::new();
        let messages = &self.database.messages;

        let frame_id_defines = gen_frame_id_defines(database_name, messages);
        let choices_defines = gen_choices_defines(database_name, messages);

        let structs = messages
            .iter()
            .map(|message| struct_block(database_name, message, &mut warnings))
            .collect::<Vec<_>>()
            .join("\n");

        let declarations = messages
            .iter()
            .map(|message| declaration_block(database_name, message))
            .collect::<Vec<_>>()
            .join("\n");

        let definitions = messages
            .iter()
            .map(|message| definition_block(database_name, message))
            .collect::<Result<Vec<_>, CodeGenError>>()?
            .join("\n");

        let header = render_header(
            database_name,
            &frame_id_defines,
            &choices_defines,
            &structs,
            &declarations,
        );
        let source = render_source(&header_name, &definitions);

        Ok(GenOutput {
            header,
            source,
            warnings,
        })
    }
}

fn render_header(
    database_name: &str,
    frame_id_defines: &str,
    choices_defines: &str,
    structs: &str,
    declarations: &str,
) -> String {
    let guard = format!("{}_H", database_name.to_uppercase());
    let mut code = CodeText::new();

    code_output!(code, IDT0, "#ifndef {}", guard);
    code_output!(code, IDT0, "#define {}", guard);
    code_output!(code, IDT0, "");
    code_output!(code, IDT0, "#include <stdint.h>");
    code_output!(code, IDT0, "#include <stdbool.h>");
    code_output!(code, IDT0, "#include <unistd.h>");
    code_output!(code, IDT0, "");
    code_output!(code, IDT0, "#ifndef EINVAL");
    code_output!(code, IDT0, "#    define EINVAL -22");
    code_output!(code, IDT0, "#endif");
    code_output!(code, IDT0, "");
    code.raw(frame_id_defines);
    code.raw("\n");
    code_output!(code, IDT0, "");
    code.raw(choices_defines);
    code.raw("\n");
    code_output!(code, IDT0, "");
    code.raw(structs);
    code_output!(code, IDT0, "");
    code.raw(declarations);
    code_output!(code, IDT0, "");
    code_output!(code, IDT0, "#endif");

    code.into_text()
}

fn render_source(header_name: &str, definitions: &str) -> String {
    let mut code = CodeText::new();

    code_output!(code, IDT0, "#include <string.h>");
    code_output!(code, IDT0, "");
    code_output!(code, IDT0, "#include \"{}\"", header_name);
    code_output!(code, IDT0, "");
    code_output!(code, IDT0, "#define UNUSED(x) (void)(x)");
    code_output!(code, IDT0, "");
    code_output!(code, IDT0, "#define ftoi(value) (*((uint32_t *)(&(value))))");
    code_output!(code, IDT0, "#define itof(value) (*((float *)(&(value))))");
    code_output!(code, IDT0, "#define dtoi(value) (*((uint64_t *)(&(value))))");
    code_output!(code, IDT0, "#define itod(value) (*((double *)(&(value))))");
    code_output!(code, IDT0, "");
    code.raw(definitions);

    code.into_text()
}

fn gen_frame_id_defines(database_name: &str, messages: &[Message]) -> String {
    messages
        .iter()
        .map(|message| {
            format!(
                "#define {}_{}_FRAME_ID (0x{:02x}u)",
                database_name.to_uppercase(),
                macro_ident(&message.name),
                message.id.to_u32()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn gen_choices_defines(database_name: &str, messages: &[Message]) -> String {
    let mut blocks = Vec::new();

    for message in messages {
        let message_macro = macro_ident(&message.name);

        for signal in &message.signals {
            let Some(choices) = &signal.choices else {
                continue;
            };

            let signal_macro = macro_ident(&signal.name);
            let lines: Vec<String> = unique_choices(choices)
                .iter()
                .map(|(value, name)| {
                    let literal = if signal.is_signed() {
                        format!("({})", value)
                    } else {
                        format!("({}u)", value)
                    };
                    format!(
                        "#define {}_{}_{}_{}_CHOICE {}",
                        database_name.to_uppercase(),
                        message_macro,
                        signal_macro,
                        name,
                        literal
                    )
                })
                .collect();
            blocks.push(lines.join("\n"));
        }
    }

    blocks.join("\n\n")
}

fn struct_block(database_name: &str, message: &Message, warnings: &mut Vec<Warning>) -> String {
    let mut comments = Vec::new();
    let mut members = Vec::new();

    for signal in &message.signals {
        match resolve_type(signal) {
            Some(ctype) => {
                comments.push(signal_comment(signal));
                members.push(format!("    {} {};", ctype.name(), snake_ident(&signal.name)));
            }
            None => warnings.push(unsupported_warning(message, signal)),
        }
    }

    // ISO C forbids empty structs.
    if comments.is_empty() {
        comments.push(" * @param dummy Dummy signal in empty message.".to_owned());
    }

    if members.is_empty() {
        members.push("    uint8_t dummy;".to_owned());
    }

    let mut code = CodeText::new();
    code_output!(code, IDT0, "/**");
    code_output!(code, IDT0, " * Signals in message {}.", message.name);
    code_output!(code, IDT0, " *");
    for comment in &comments {
        code.raw(comment);
        code.raw("\n");
    }
    code_output!(code, IDT0, " */");
    code_output!(
        code,
        IDT0,
        "struct {}_{}_t {{",
        database_name,
        snake_ident(&message.name)
    );
    for member in &members {
        code.raw(member);
        code.raw("\n");
    }
    code_output!(code, IDT0, "};");

    code.into_text()
}

fn declaration_block(database_name: &str, message: &Message) -> String {
    let message_name = snake_ident(&message.name);
    let mut code = CodeText::new();

    code_output!(code, IDT0, "/**");
    code_output!(code, IDT0, " * Encode message {}.", message.name);
    code_output!(code, IDT0, " *");
    code_output!(code, IDT0, " * @param[out] dst_p Buffer to encode the message into.");
    code_output!(code, IDT0, " * @param[in] src_p Data to encode.");
    code_output!(code, IDT0, " * @param[in] size Size of dst_p.");
    code_output!(code, IDT0, " *");
    code_output!(code, IDT0, " * @return Size of encoded data, or negative error code.");
    code_output!(code, IDT0, " */");
    code_output!(code, IDT0, "ssize_t {}_{}_encode(", database_name, message_name);
    code_output!(code, IDT1, "uint8_t *dst_p,");
    code_output!(code, IDT1, "struct {}_{}_t *src_p,", database_name, message_name);
    code_output!(code, IDT1, "size_t size);");
    code_output!(code, IDT0, "");
    code_output!(code, IDT0, "/**");
    code_output!(code, IDT0, " * Decode message {}.", message.name);
    code_output!(code, IDT0, " *");
    code_output!(code, IDT0, " * @param[out] dst_p Object to decode the message into.");
    code_output!(code, IDT0, " * @param[in] src_p Message to decode.");
    code_output!(code, IDT0, " * @param[in] size Size of src_p.");
    code_output!(code, IDT0, " *");
    code_output!(code, IDT0, " * @return zero(0) or negative error code.");
    code_output!(code, IDT0, " */");
    code_output!(code, IDT0, "int {}_{}_decode(", database_name, message_name);
    code_output!(code, IDT1, "struct {}_{}_t *dst_p,", database_name, message_name);
    code_output!(code, IDT1, "uint8_t *src_p,");
    code_output!(code, IDT1, "size_t size);");
    code_output!(code, IDT0, "");

    for (count, check) in range_checks(message).iter().enumerate() {
        if count > 0 {
            code_output!(code, IDT0, "");
        }
        code_output!(code, IDT0, "/**");
        code_output!(code, IDT0, " * Check that given signal is in allowed range.");
        code_output!(code, IDT0, " *");
        code_output!(code, IDT0, " * @param[in] value Signal to check.");
        code_output!(code, IDT0, " *");
        code_output!(code, IDT0, " * @return true if in range, false otherwise.");
        code_output!(code, IDT0, " */");
        code_output!(
            code,
            IDT0,
            "bool {}_{}_{}_is_in_range({} value);",
            database_name,
            message_name,
            check.signal_name,
            check.ctype.name()
        );
    }

    code.into_text()
}

fn definition_block(database_name: &str, message: &Message) -> Result<String, CodeGenError> {
    let message_name = snake_ident(&message.name);
    let mut code = CodeText::new();

    if message.size > 0 {
        let (encode_variables, encode_body) = format_encode_code(message)?;
        let (decode_variables, decode_body) = format_decode_code(message)?;
        let no_input = encode_body.is_empty();

        code_output!(code, IDT0, "ssize_t {}_{}_encode(", database_name, message_name);
        code_output!(code, IDT1, "uint8_t *dst_p,");
        code_output!(code, IDT1, "struct {}_{}_t *src_p,", database_name, message_name);
        code_output!(code, IDT1, "size_t size)");
        code_output!(code, IDT0, "{");
        if no_input {
            code_output!(code, IDT1, "UNUSED(src_p);");
            code_output!(code, IDT0, "");
        }
        code.raw(&encode_variables);
        code_output!(code, IDT1, "if (size < {}) {{", message.size);
        code_output!(code, IDT2, "return (-EINVAL);");
        code_output!(code, IDT1, "}");
        code_output!(code, IDT0, "");
        code_output!(code, IDT1, "memset(&dst_p[0], 0, {});", message.size);
        code.raw(&encode_body);
        code.raw("\n");
        code_output!(code, IDT1, "return ({});", message.size);
        code_output!(code, IDT0, "}");
        code_output!(code, IDT0, "");
        code_output!(code, IDT0, "int {}_{}_decode(", database_name, message_name);
        code_output!(code, IDT1, "struct {}_{}_t *dst_p,", database_name, message_name);
        code_output!(code, IDT1, "uint8_t *src_p,");
        code_output!(code, IDT1, "size_t size)");
        code_output!(code, IDT0, "{");
        if no_input {
            code_output!(code, IDT1, "UNUSED(src_p);");
            code_output!(code, IDT0, "");
        }
        code.raw(&decode_variables);
        code_output!(code, IDT1, "if (size < {}) {{", message.size);
        code_output!(code, IDT2, "return (-EINVAL);");
        code_output!(code, IDT1, "}");
        code_output!(code, IDT0, "");
        code_output!(code, IDT1, "memset(dst_p, 0, sizeof(*dst_p));");
        code.raw(&decode_body);
        code.raw("\n");
        code_output!(code, IDT1, "return (0);");
        code_output!(code, IDT0, "}");
    } else {
        // Zero-length messages get a fixed no-op pair.
        code_output!(code, IDT0, "ssize_t {}_{}_encode(", database_name, message_name);
        code_output!(code, IDT1, "uint8_t *dst_p,");
        code_output!(code, IDT1, "struct {}_{}_t *src_p,", database_name, message_name);
        code_output!(code, IDT1, "size_t size)");
        code_output!(code, IDT0, "{");
        code_output!(code, IDT1, "UNUSED(dst_p);");
        code_output!(code, IDT1, "UNUSED(src_p);");
        code_output!(code, IDT1, "UNUSED(size);");
        code_output!(code, IDT0, "");
        code_output!(code, IDT1, "return (0);");
        code_output!(code, IDT0, "}");
        code_output!(code, IDT0, "");
        code_output!(code, IDT0, "int {}_{}_decode(", database_name, message_name);
        code_output!(code, IDT1, "struct {}_{}_t *dst_p,", database_name, message_name);
        code_output!(code, IDT1, "uint8_t *src_p,");
        code_output!(code, IDT1, "size_t size)");
        code_output!(code, IDT0, "{");
        code_output!(code, IDT1, "UNUSED(src_p);");
        code_output!(code, IDT1, "UNUSED(size);");
        code_output!(code, IDT0, "");
        code_output!(code, IDT1, "memset(dst_p, 0, sizeof(*dst_p));");
        code_output!(code, IDT0, "");
        code_output!(code, IDT1, "return (0);");
        code_output!(code, IDT0, "}");
    }

    code_output!(code, IDT0, "");

    for (count, check) in range_checks(message).iter().enumerate() {
        if count > 0 {
            code_output!(code, IDT0, "");
        }
        code_output!(
            code,
            IDT0,
            "bool {}_{}_{}_is_in_range({} value)",
            database_name,
            message_name,
            check.signal_name,
            check.ctype.name()
        );
        code_output!(code, IDT0, "{");
        if check.check == "true" {
            code_output!(code, IDT1, "UNUSED(value);");
            code_output!(code, IDT0, "");
        }
        code_output!(code, IDT1, "return ({});", check.check);
        code_output!(code, IDT0, "}");
    }

    Ok(code.into_text())
}

struct RangeCheck {
    signal_name: String,
    ctype: CType,
    check: String,
}

/// Synthesize the raw-value range predicate of every representable signal.
///
/// Physical bounds are mapped back to raw values; a bound that coincides
/// with or exceeds the storage type's natural bound is dropped. Both bounds
/// dropped yields the constant `true`.
fn range_checks(message: &Message) -> Vec<RangeCheck> {
    let mut checks = Vec::new();

    for signal in &message.signals {
        let Some(ctype) = resolve_type(signal) else {
            continue;
        };

        let scale = signal.factor;
        let suffix = ctype.suffix();

        // A zero scale cannot be mapped back to the raw domain.
        if scale == 0.0 {
            checks.push(RangeCheck {
                signal_name: snake_ident(&signal.name),
                ctype,
                check: "true".to_owned(),
            });
            continue;
        }

        let offset = signal.offset / scale;

        let low = signal.min.and_then(|min| {
            let minimum = round_close(min / scale - offset);
            match ctype.minimum() {
                Some(bound) if minimum <= bound => None,
                _ => Some(format!(
                    "value >= {}{}",
                    format_decimal(minimum, signal.is_float),
                    suffix
                )),
            }
        });

        let high = signal.max.and_then(|max| {
            let maximum = round_close(max / scale - offset);
            match ctype.maximum() {
                Some(bound) if maximum >= bound => None,
                _ => Some(format!(
                    "value <= {}{}",
                    format_decimal(maximum, signal.is_float),
                    suffix
                )),
            }
        });

        let check = match (low, high) {
            (Some(low), Some(high)) => format!("({}) && ({})", low, high),
            (Some(single), None) | (None, Some(single)) => single,
            (None, None) => "true".to_owned(),
        };

        checks.push(RangeCheck {
            signal_name: snake_ident(&signal.name),
            ctype,
            check,
        });
    }

    checks
}

fn signal_comment(signal: &Signal) -> String {
    format!(
        " * @param {} Value as on the CAN bus.\n\
         {} *            Range: {}\n\
         \x20*            Scale: {}\n\
         \x20*            Offset: {}",
        snake_ident(&signal.name),
        format_comment(signal.comment.as_deref()),
        format_range(signal),
        signal.factor,
        signal.offset
    )
}

fn format_comment(comment: Option<&str>) -> String {
    match comment {
        Some(comment) if !comment.is_empty() => comment
            .lines()
            .map(|line| format!(" *            {}\n", line.trim_end()))
            .collect(),
        _ => String::new(),
    }
}

/// Render `raw..raw (phys..phys unit)` with one-sided variants, or `-` when
/// the signal carries no bound at all.
fn format_range(signal: &Signal) -> String {
    let scale = signal.factor;
    if scale == 0.0 {
        return "-".to_owned();
    }

    let offset = signal.offset;
    let unit = signal.unit.as_deref().unwrap_or("-");
    let raw = |bound: f64| format_decimal(round_close((bound - offset) / scale), false);

    match (signal.min, signal.max) {
        (Some(min), Some(max)) => {
            format!("{}..{} ({}..{} {})", raw(min), raw(max), min, max, unit)
        }
        (Some(min), None) => format!("{}.. ({}.. {})", raw(min), min, unit),
        (None, Some(max)) => format!("..{} (..{} {})", raw(max), max, unit),
        (None, None) => "-".to_owned(),
    }
}

/// Snap a scaled bound to the nearest integer when it sits within floating
/// point noise of it. Divisions like `5 / 0.1` land at 49.999...96 and must
/// still print as 50.
fn round_close(value: f64) -> f64 {
    let rounded = value.round();
    if (value - rounded).abs() <= 1e-9 * value.abs().max(1.0) {
        rounded
    } else {
        value
    }
}

fn unsupported_warning(message: &Message, signal: &Signal) -> Warning {
    if signal.is_float {
        Warning::UnsupportedFloatWidth {
            message: message.name.clone(),
            signal: signal.name.clone(),
            size: signal.size,
        }
    } else {
        Warning::UnsupportedLength {
            message: message.name.clone(),
            signal: signal.name.clone(),
            size: signal.size,
        }
    }
}
