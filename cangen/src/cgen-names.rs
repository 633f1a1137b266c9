/*
 * Copyright (C) 2015-2023 IoT.bzh Company
 * Author: Fulup Ar Foll <fulup@iot.bzh>
 *
 * License: $RP_BEGIN_LICENSE$ SPDX:MIT https://opensource.org/licenses/MIT $RP_END_LICENSE$
 */

use std::collections::BTreeMap;

use heck::ToSnakeCase;

use crate::data::Choices;

/// Replace every character outside `[A-Za-z0-9_]` with an underscore.
pub fn canonical(value: &str) -> String {
    value
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Canonical lowercase identifier for a display name: camel-case boundaries
/// split with underscores, separator runs collapsed, leftovers canonicalized.
pub fn snake_ident(value: &str) -> String {
    canonical(&value.to_snake_case())
}

/// Uppercase macro-style identifier for a display name.
pub fn macro_ident(value: &str) -> String {
    snake_ident(value).to_uppercase()
}

/// Deduplicate the generated names of a choice table.
///
/// Colliding names first get their raw value appended, then trailing
/// underscores until unique. Post-condition: no two returned names are equal.
pub fn unique_choices(choices: &Choices) -> BTreeMap<i64, String> {
    let items: BTreeMap<i64, String> = choices
        .iter()
        .map(|(value, name)| (*value, macro_ident(name)))
        .collect();

    let count = |name: &str| items.values().filter(|n| n.as_str() == name).count();

    let mut unique: BTreeMap<i64, String> = items
        .iter()
        .filter(|(_, name)| count(name) == 1)
        .map(|(value, name)| (*value, name.clone()))
        .collect();

    for (value, name) in &items {
        if count(name) > 1 {
            let mut name = format!("{}{}", name, canonical(&format!("_{}", value)));
            while unique.values().any(|used| *used == name) {
                name.push('_');
            }
            unique.insert(*value, name);
        }
    }

    unique
}
