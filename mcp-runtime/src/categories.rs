use std::collections::BTreeSet;
use std::fmt;

pub const DEFAULT_ENABLED_TOOLS: &str = "profile,sources,logs,admin";

/// Tool groups that can be switched on or off per process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ToolCategory {
    Profile,
    Sources,
    Logs,
    Admin,
}

impl ToolCategory {
    pub const ALL: [ToolCategory; 4] = [
        ToolCategory::Profile,
        ToolCategory::Sources,
        ToolCategory::Logs,
        ToolCategory::Admin,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ToolCategory::Profile => "profile",
            ToolCategory::Sources => "sources",
            ToolCategory::Logs => "logs",
            ToolCategory::Admin => "admin",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        ToolCategory::ALL
            .into_iter()
            .find(|category| category.as_str() == raw)
    }
}

impl fmt::Display for ToolCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryDecision {
    Active,
    NotEnabled,
    Disabled,
}

/// Which categories this process serves. Fixed at startup.
///
/// A category is active when it appears in the enabled list and its disable
/// flag is off. The two reasons for being inactive are kept apart so startup
/// logs say which knob to turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCategoryEnablement {
    enabled: BTreeSet<ToolCategory>,
    disabled: BTreeSet<ToolCategory>,
}

impl Default for ToolCategoryEnablement {
    fn default() -> Self {
        Self::new(DEFAULT_ENABLED_TOOLS, [])
    }
}

impl ToolCategoryEnablement {
    /// `enabled_tools` is the comma separated list from `--enabled-tools`.
    /// Items are trimmed; names that match no category are ignored.
    pub fn new(enabled_tools: &str, disabled: impl IntoIterator<Item = ToolCategory>) -> Self {
        let enabled = enabled_tools
            .split(',')
            .map(str::trim)
            .filter_map(ToolCategory::parse)
            .collect();
        Self {
            enabled,
            disabled: disabled.into_iter().collect(),
        }
    }

    pub fn decision(&self, category: ToolCategory) -> CategoryDecision {
        if !self.enabled.contains(&category) {
            CategoryDecision::NotEnabled
        } else if self.disabled.contains(&category) {
            CategoryDecision::Disabled
        } else {
            CategoryDecision::Active
        }
    }

    pub fn is_active(&self, category: ToolCategory) -> bool {
        self.decision(category) == CategoryDecision::Active
    }

    /// Active categories in registration order, logging every skipped one.
    pub fn active_categories(&self) -> Vec<ToolCategory> {
        let mut active = Vec::new();
        for category in ToolCategory::ALL {
            match self.decision(category) {
                CategoryDecision::Active => active.push(category),
                CategoryDecision::NotEnabled => tracing::info!(
                    event = "mcp.category.skipped",
                    category = %category,
                    reason = "not_enabled",
                    "{category} tools not enabled"
                ),
                CategoryDecision::Disabled => tracing::info!(
                    event = "mcp.category.skipped",
                    category = %category,
                    reason = "disabled",
                    "{category} tools disabled"
                ),
            }
        }
        active
    }
}
