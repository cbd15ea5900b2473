use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Per-application restoration rule.
///
/// Each flag independently toggles one restoration axis. Rules are stored as
/// a JSON array under the `window-app-configs` settings key; the first rule
/// whose pattern matches a window's class identifier is authoritative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Rule {
    /// Literal class identifier or regular-expression source
    pub class_pattern: String,
    /// Interpret `class_pattern` as a regular expression
    pub is_regex: bool,
    pub restore_size: bool,
    pub restore_position: bool,
    pub restore_maximized: bool,
    pub restore_workspace: bool,
    pub restore_minimized: bool,
    pub restore_above: bool,
    pub restore_sticky: bool,
    /// When restoring the workspace, also activate it
    pub switch_to_workspace: bool,
}

impl Default for Rule {
    fn default() -> Self {
        Rule {
            class_pattern: String::new(),
            is_regex: false,
            restore_size: false,
            restore_position: false,
            restore_maximized: false,
            restore_workspace: false,
            restore_minimized: false,
            restore_above: false,
            restore_sticky: false,
            switch_to_workspace: false,
        }
    }
}

impl Rule {
    /// Build a literal-match rule for the given class identifier
    pub fn for_class(class_pattern: impl Into<String>) -> Self {
        Rule {
            class_pattern: class_pattern.into(),
            ..Rule::default()
        }
    }

    /// Check whether this rule matches the given class identifier.
    ///
    /// A rule whose pattern fails to compile as a regex never matches; the
    /// failure is not propagated so a bad user pattern cannot break matching
    /// for the rest of the list.
    pub fn matches(&self, class_id: &str) -> bool {
        if !self.is_regex {
            return self.class_pattern == class_id;
        }

        match Regex::new(&self.class_pattern) {
            Ok(regex) => regex.is_match(class_id),
            Err(err) => {
                debug!(
                    pattern = %self.class_pattern,
                    error = %err,
                    "Ignoring rule with invalid regex pattern"
                );
                false
            }
        }
    }

    /// Whether any restoration axis is enabled at all
    pub fn any_axis_enabled(&self) -> bool {
        self.restore_size
            || self.restore_position
            || self.restore_maximized
            || self.restore_workspace
            || self.restore_minimized
            || self.restore_above
            || self.restore_sticky
    }
}

/// Return the first rule in `rules` matching `class_id`, by list order.
pub fn match_rule<'a>(class_id: &str, rules: &'a [Rule]) -> Option<&'a Rule> {
    rules.iter().find(|rule| rule.matches(class_id))
}
