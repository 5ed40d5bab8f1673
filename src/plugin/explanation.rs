use crate::log::{LogLevel, Logger};
use crate::plugin::state::Plugin;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Info,
    Error,
}

impl Severity {
    pub fn level(self) -> LogLevel {
        match self {
            Severity::Success => LogLevel::Success,
            Severity::Info => LogLevel::Info,
            Severity::Error => LogLevel::Error,
        }
    }
}

/// A status line held on a plugin until the caller decides to print it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Explanation {
    pub severity: Severity,
    pub message: String,
}

impl Explanation {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }

    pub fn emit(&self, logger: &dyn Logger) {
        logger.log(self.severity.level(), format_args!("{}", self.message));
    }
}

struct Condition {
    outcome: Option<bool>,
    positive: &'static str,
    negative: &'static str,
}

/// Status of a plugin from the checks that ran, in priority order:
/// ready, nothing checked, everything failed, broken structure, other.
pub fn derive_explanation(plugin: &Plugin) -> Explanation {
    let conditions = [
        Condition {
            outcome: plugin.is_valid,
            positive: "valid structure",
            negative: "invalid structure",
        },
        Condition {
            outcome: plugin.is_owned,
            positive: "owned by you",
            negative: "not owned by you",
        },
        Condition {
            outcome: plugin.is_registry_present,
            positive: "present in registry",
            negative: "not in registry",
        },
    ];

    let line = |message: &str| format!("{}: {message}", plugin.name);

    if conditions.iter().all(|c| c.outcome == Some(true)) {
        return Explanation::new(Severity::Success, line("ready for synchronization"));
    }
    if conditions.iter().all(|c| c.outcome.is_none()) {
        return Explanation::new(Severity::Info, line("no checks performed"));
    }

    let positives: Vec<&str> = conditions
        .iter()
        .filter(|c| c.outcome == Some(true))
        .map(|c| c.positive)
        .collect();
    let negatives: Vec<&str> = conditions
        .iter()
        .filter(|c| c.outcome == Some(false))
        .map(|c| c.negative)
        .collect();

    if negatives.len() == conditions.len() {
        return Explanation::new(Severity::Error, line(&negatives.join(" and ")));
    }

    let message = match (positives.is_empty(), negatives.is_empty()) {
        (true, _) => negatives.join(" and "),
        (false, true) => positives.join(" and "),
        (false, false) => format!("{} but {}", positives.join(" and "), negatives.join(" and ")),
    };

    let severity = if plugin.is_valid == Some(false) {
        Severity::Error
    } else {
        Severity::Info
    };
    Explanation::new(severity, line(&message))
}
