use serde::Serialize;
use std::collections::BTreeMap;
use tracing::warn;

/// Static rule for one data-quality flag reported by the converter.
///
/// A reported value equal to `flag_condition` means the check failed and the
/// warning applies; any other value means the check passed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlagRule {
    pub name: &'static str,
    pub pass: &'static str,
    pub warning: &'static str,
    pub flag_condition: i64,
    pub reason_required: bool,
}

pub const FLAG_RULES: &[FlagRule] = &[
    FlagRule {
        name: "face_present",
        pass: "There are face stimuli flags",
        warning: "No face flags! There might be a connection issue between \
                  the E-prime and Netstation computers. Be sure to open \
                  Netstation BEFORE E-prime, and check that the stm+ and \
                  fix+ flags are showing up in Netstation while the task is \
                  running.",
        flag_condition: 0,
        reason_required: false,
    },
    FlagRule {
        name: "face_num",
        pass: "The number of face stimuli flags is correct.",
        warning: "Missing face flag! This might mean the task was quit \
                  early. Please explain what happened:",
        flag_condition: 0,
        reason_required: true,
    },
    FlagRule {
        name: "VEP_present",
        pass: "There are VEP stimuli flags",
        warning: "No VEP flags! There might be a connection issue between \
                  the E-prime and Netstation computers. Be sure to open \
                  Netstation BEFORE E-prime, and check that the ch1+ and \
                  ch2+ flags are showing up in Netstation while the task is \
                  running.",
        flag_condition: 0,
        reason_required: false,
    },
    FlagRule {
        name: "VEP_num",
        pass: "The number of VEP flags is correct",
        warning: "Missing VEP flag! This might mean the task was quit \
                  early. Please explain what happened:",
        flag_condition: 0,
        reason_required: true,
    },
];

pub fn flag_rule(name: &str) -> Option<&'static FlagRule> {
    FLAG_RULES.iter().find(|rule| rule.name == name)
}

/// One reviewed flag, carrying the UI label for it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlagFinding {
    pub flag: String,
    pub label: String,
    /// Whether the UI must collect a free-text reason for this finding
    pub reason_required: bool,
}

/// Parsed flag report split into failed and passed checks
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FlagReview {
    pub errors: Vec<FlagFinding>,
    pub passed: Vec<FlagFinding>,
}

/// Compare a parsed flag report against the static rules table
pub fn review_flags(flags: &BTreeMap<String, i64>) -> FlagReview {
    let mut review = FlagReview::default();

    for (name, value) in flags {
        let Some(rule) = flag_rule(name) else {
            warn!(flag = %name, "Converter reported an unknown flag");
            continue;
        };

        if *value == rule.flag_condition {
            review.errors.push(FlagFinding {
                flag: name.clone(),
                label: rule.warning.to_string(),
                reason_required: rule.reason_required,
            });
        } else {
            review.passed.push(FlagFinding {
                flag: name.clone(),
                label: rule.pass.to_string(),
                reason_required: false,
            });
        }
    }

    review
}
