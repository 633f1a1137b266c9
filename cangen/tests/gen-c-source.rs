/*
 * Copyright (C) 2015-2023 IoT.bzh Company
 * Author: Fulup Ar Foll <fulup@iot.bzh>
 *
 * License: $RP_BEGIN_LICENSE$ SPDX:MIT https://opensource.org/licenses/MIT $RP_END_LICENSE$
 */

use cangen::prelude::*;
use std::collections::BTreeMap;

fn motohawk_database() -> Database {
    Database::new(vec![Message::new(
        "ExampleMessage",
        496,
        8,
        vec![
            Signal::new("Enable", 7, 1, ByteOrder::BigEndian),
            Signal::new("AverageRadius", 6, 6, ByteOrder::BigEndian)
                .scaling(0.1, 0.0)
                .range(0.0, 5.0)
                .unit("m"),
            Signal::new("Temperature", 0, 12, ByteOrder::BigEndian)
                .signed()
                .scaling(0.01, 250.0)
                .range(229.52, 270.47)
                .unit("degK"),
        ],
    )])
}

const MOTOHAWK_HEADER: &str = r#"#ifndef MOTOHAWK_H
#define MOTOHAWK_H

#include <stdint.h>
#include <stdbool.h>
#include <unistd.h>

#ifndef EINVAL
#    define EINVAL -22
#endif

#define MOTOHAWK_EXAMPLE_MESSAGE_FRAME_ID (0x1f0u)



/**
 * Signals in message ExampleMessage.
 *
 * @param enable Value as on the CAN bus.
 *            Range: -
 *            Scale: 1
 *            Offset: 0
 * @param average_radius Value as on the CAN bus.
 *            Range: 0..50 (0..5 m)
 *            Scale: 0.1
 *            Offset: 0
 * @param temperature Value as on the CAN bus.
 *            Range: -2048..2047 (229.52..270.47 degK)
 *            Scale: 0.01
 *            Offset: 250
 */
struct motohawk_example_message_t {
    uint8_t enable;
    uint8_t average_radius;
    int16_t temperature;
};

/**
 * Encode message ExampleMessage.
 *
 * @param[out] dst_p Buffer to encode the message into.
 * @param[in] src_p Data to encode.
 * @param[in] size Size of dst_p.
 *
 * @return Size of encoded data, or negative error code.
 */
ssize_t motohawk_example_message_encode(
    uint8_t *dst_p,
    struct motohawk_example_message_t *src_p,
    size_t size);

/**
 * Decode message ExampleMessage.
 *
 * @param[out] dst_p Object to decode the message into.
 * @param[in] src_p Message to decode.
 * @param[in] size Size of src_p.
 *
 * @return zero(0) or negative error code.
 */
int motohawk_example_message_decode(
    struct motohawk_example_message_t *dst_p,
    uint8_t *src_p,
    size_t size);

/**
 * Check that given signal is in allowed range.
 *
 * @param[in] value Signal to check.
 *
 * @return true if in range, false otherwise.
 */
bool motohawk_example_message_enable_is_in_range(uint8_t value);

/**
 * Check that given signal is in allowed range.
 *
 * @param[in] value Signal to check.
 *
 * @return true if in range, false otherwise.
 */
bool motohawk_example_message_average_radius_is_in_range(uint8_t value);

/**
 * Check that given signal is in allowed range.
 *
 * @param[in] value Signal to check.
 *
 * @return true if in range, false otherwise.
 */
bool motohawk_example_message_temperature_is_in_range(int16_t value);

#endif
"#;

const MOTOHAWK_SOURCE: &str = r#"#include <string.h>

#include "motohawk.h"

#define UNUSED(x) (void)(x)

#define ftoi(value) (*((uint32_t *)(&(value))))
#define itof(value) (*((float *)(&(value))))
#define dtoi(value) (*((uint64_t *)(&(value))))
#define itod(value) (*((double *)(&(value))))

ssize_t motohawk_example_message_encode(
    uint8_t *dst_p,
    struct motohawk_example_message_t *src_p,
    size_t size)
{
    if (size < 8) {
        return (-EINVAL);
    }

    memset(&dst_p[0], 0, 8);

    dst_p[0] |= ((src_p->enable << 7) & 0x80);
    dst_p[0] |= ((src_p->average_radius << 1) & 0x7e);
    dst_p[0] |= ((src_p->temperature >> 11) & 0x01);
    dst_p[1] |= ((src_p->temperature >> 3) & 0xff);
    dst_p[2] |= ((src_p->temperature << 5) & 0xe0);

    return (8);
}

int motohawk_example_message_decode(
    struct motohawk_example_message_t *dst_p,
    uint8_t *src_p,
    size_t size)
{
    if (size < 8) {
        return (-EINVAL);
    }

    memset(dst_p, 0, sizeof(*dst_p));

    dst_p->enable |= ((uint8_t)(src_p[0] & 0x80) >> 7);
    dst_p->average_radius |= ((uint8_t)(src_p[0] & 0x7e) >> 1);
    dst_p->temperature |= ((uint16_t)(src_p[0] & 0x01) << 11);
    dst_p->temperature |= ((uint16_t)(src_p[1] & 0xff) << 3);
    dst_p->temperature |= ((uint16_t)(src_p[2] & 0xe0) >> 5);

    if (dst_p->temperature & (1 << 11)) {
        dst_p->temperature |= 0xf000;
    }

    return (0);
}

bool motohawk_example_message_enable_is_in_range(uint8_t value)
{
    UNUSED(value);

    return (true);
}

bool motohawk_example_message_average_radius_is_in_range(uint8_t value)
{
    return (value <= 50u);
}

bool motohawk_example_message_temperature_is_in_range(int16_t value)
{
    return ((value >= -2048) && (value <= 2047));
}
"#;

#[test]
fn motohawk_header_matches_reference() {
    let database = motohawk_database();
    let output = CodeGen::new(&database)
        .database_name("motohawk")
        .generate()
        .unwrap();

    assert_eq!(output.header, MOTOHAWK_HEADER);
    assert!(output.warnings.is_empty());
}

#[test]
fn motohawk_source_matches_reference() {
    let database = motohawk_database();
    let output = CodeGen::new(&database)
        .database_name("motohawk")
        .generate()
        .unwrap();

    assert_eq!(output.source, MOTOHAWK_SOURCE);
}

#[test]
fn header_name_overrides_include() {
    let database = motohawk_database();
    let output = CodeGen::new(&database)
        .database_name("motohawk")
        .header_name("generated/motohawk_can.h")
        .generate()
        .unwrap();

    assert!(output
        .source
        .contains("#include \"generated/motohawk_can.h\"\n"));
}

#[test]
fn multiplexed_message_dispatches_on_selector() {
    let mut choices = Choices::new();
    choices.insert(0, "Command".to_owned());
    choices.insert(1, "Response".to_owned());

    let signals = vec![
        Signal::new("Multiplexor", 0, 8, ByteOrder::LittleEndian).choices(choices),
        Signal::new("CommandWord", 8, 16, ByteOrder::LittleEndian),
        Signal::new("ResponseWord", 8, 16, ByteOrder::LittleEndian).signed(),
    ];
    let mut branches = BTreeMap::new();
    branches.insert(0, vec![SignalNode::Sig("CommandWord".to_owned())]);
    branches.insert(1, vec![SignalNode::Sig("ResponseWord".to_owned())]);
    let database = Database::new(vec![Message::new("Exchange", 0x200, 3, signals).with_tree(
        vec![SignalNode::Mux {
            selector: "Multiplexor".to_owned(),
            branches,
        }],
    )]);

    let output = CodeGen::new(&database)
        .database_name("bus")
        .generate()
        .unwrap();

    assert!(output.header.contains(
        "#define BUS_EXCHANGE_MULTIPLEXOR_COMMAND_CHOICE (0u)\n\
         #define BUS_EXCHANGE_MULTIPLEXOR_RESPONSE_CHOICE (1u)"
    ));
    assert!(output.header.contains("    uint16_t command_word;\n"));
    assert!(output.header.contains("    int16_t response_word;\n"));

    assert!(output.source.contains(
        "    switch (src_p->multiplexor) {\n\
         \n\
         \x20   case 0:\n\
         \x20       dst_p[1] |= ((src_p->command_word << 0) & 0xff);\n\
         \x20       dst_p[2] |= ((src_p->command_word >> 8) & 0xff);\n\
         \x20       break;\n\
         \n\
         \x20   case 1:\n\
         \x20       dst_p[1] |= ((src_p->response_word << 0) & 0xff);\n\
         \x20       dst_p[2] |= ((src_p->response_word >> 8) & 0xff);\n\
         \x20       break;\n\
         \n\
         \x20   default:\n\
         \x20       break;\n\
         \x20   }"
    ));
    assert!(output.source.contains(
        "    switch (dst_p->multiplexor) {\n\
         \n\
         \x20   case 0:\n\
         \x20       dst_p->command_word |= ((uint16_t)(src_p[1] & 0xff) >> 0);\n\
         \x20       dst_p->command_word |= ((uint16_t)(src_p[2] & 0xff) << 8);\n\
         \x20       break;\n"
    ));

    // The selector is packed and unpacked exactly once, by the dispatch itself.
    assert_eq!(
        output
            .source
            .matches("dst_p[0] |= ((src_p->multiplexor << 0) & 0xff);")
            .count(),
        1
    );
    assert_eq!(
        output
            .source
            .matches("dst_p->multiplexor |= ((uint8_t)(src_p[0] & 0xff) >> 0);")
            .count(),
        1
    );
}

#[test]
fn zero_length_message_has_fixed_definitions() {
    let database = Database::new(vec![Message::new("Heartbeat", 3, 0, vec![])]);
    let output = CodeGen::new(&database)
        .database_name("bus")
        .generate()
        .unwrap();

    assert!(output.header.contains("    uint8_t dummy;\n"));
    assert!(output.source.contains(
        "int bus_heartbeat_decode(\n\
         \x20   struct bus_heartbeat_t *dst_p,\n\
         \x20   uint8_t *src_p,\n\
         \x20   size_t size)\n\
         {\n\
         \x20   UNUSED(src_p);\n\
         \x20   UNUSED(size);\n\
         \n\
         \x20   memset(dst_p, 0, sizeof(*dst_p));\n\
         \n\
         \x20   return (0);\n\
         }\n"
    ));
}

#[test]
fn overlapping_signals_abort_generation() {
    let database = Database::new(vec![Message::new(
        "Clash",
        1,
        1,
        vec![
            Signal::new("A", 0, 4, ByteOrder::LittleEndian),
            Signal::new("B", 2, 4, ByteOrder::LittleEndian),
        ],
    )]);
    let error = CodeGen::new(&database)
        .database_name("bus")
        .generate()
        .unwrap_err();

    assert!(matches!(
        error,
        CodeGenError::OverlappingSignals { .. }
    ));
}

#[test]
fn double_signal_round_trips_through_reinterpretation() {
    let database = Database::new(vec![Message::new(
        "Sensor",
        7,
        8,
        vec![Signal::new("Reading", 0, 64, ByteOrder::LittleEndian).float()],
    )]);
    let output = CodeGen::new(&database)
        .database_name("bus")
        .generate()
        .unwrap();

    assert!(output.header.contains("    double reading;\n"));
    assert!(output.source.contains("    uint64_t reading;\n"));
    assert!(output.source.contains("    reading = dtoi(src_p->reading);\n"));
    assert!(output.source.contains("    dst_p->reading = itod(reading);\n"));
    assert!(output.source.contains("    uint64_t reading = 0;\n"));
}
