//! Code → label tables for categorical fields.
//!
//! Sessions only ever store the integer code. Labels exist for display and
//! for reverse lookup from a submitted label.

use serde::Serialize;

/// One option of a categorical field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Category {
    pub code: i64,
    pub label: &'static str,
}

const fn cat(code: i64, label: &'static str) -> Category {
    Category { code, label }
}

pub const YES_NO: &[Category] = &[cat(0, "No"), cat(1, "Yes")];

pub const MARITAL_STATUS: &[Category] = &[
    cat(1, "Single"),
    cat(2, "Married/Cohabitating"),
    cat(3, "Separated/Divorced"),
    cat(4, "Widow"),
];

pub const OCCUPATIONAL_PATTERN: &[Category] = &[
    cat(1, "Professional/Executive"),
    cat(2, "Business"),
    cat(3, "Technician"),
    cat(4, "Laborer"),
    cat(5, "Housewife"),
    cat(6, "Student"),
    cat(7, "Pensioned"),
    cat(8, "Unemployed"),
    cat(9, "Other"),
];

pub const PAIN_INTENSITY: &[Category] = &[cat(-1, "Low"), cat(0, "Moderate"), cat(1, "High")];

pub const CYCLE_REGULARITY: &[Category] = &[
    cat(-1, "Not Applicable"),
    cat(1, "Regular"),
    cat(2, "Irregular"),
];

/// Label for `code`, if the code belongs to the table.
pub fn label_for(options: &[Category], code: i64) -> Option<&'static str> {
    options.iter().find(|c| c.code == code).map(|c| c.label)
}

/// Reverse lookup. Case-insensitive on the label.
pub fn code_for_label(options: &[Category], label: &str) -> Option<i64> {
    options
        .iter()
        .find(|c| c.label.eq_ignore_ascii_case(label.trim()))
        .map(|c| c.code)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    const ALL: &[(&str, &[Category])] = &[
        ("yes_no", YES_NO),
        ("marital_status", MARITAL_STATUS),
        ("occupational_pattern", OCCUPATIONAL_PATTERN),
        ("pain_intensity", PAIN_INTENSITY),
        ("cycle_regularity", CYCLE_REGULARITY),
    ];

    #[test]
    fn every_code_has_a_label() {
        for (name, table) in ALL {
            for c in *table {
                let label = label_for(table, c.code).unwrap();
                assert!(!label.is_empty(), "{name}: code {} has empty label", c.code);
            }
        }
    }

    #[test]
    fn tables_are_bijective() {
        for (name, table) in ALL {
            let codes: HashSet<i64> = table.iter().map(|c| c.code).collect();
            let labels: HashSet<&str> = table.iter().map(|c| c.label).collect();
            assert_eq!(codes.len(), table.len(), "{name}: duplicate code");
            assert_eq!(labels.len(), table.len(), "{name}: duplicate label");

            for c in *table {
                assert_eq!(code_for_label(table, c.label), Some(c.code));
            }
        }
    }

    #[test]
    fn unknown_code_and_label() {
        assert_eq!(label_for(MARITAL_STATUS, 0), None);
        assert_eq!(label_for(PAIN_INTENSITY, 2), None);
        assert_eq!(code_for_label(YES_NO, "maybe"), None);
    }

    #[test]
    fn reverse_lookup_ignores_case() {
        assert_eq!(code_for_label(MARITAL_STATUS, "married/cohabitating"), Some(2));
        assert_eq!(code_for_label(CYCLE_REGULARITY, " Irregular "), Some(2));
    }
}
