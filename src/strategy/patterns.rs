use regex::Regex;

use crate::error::CrawlError;

/// Labels that lead towards a policy, in English and German.
pub const NAVIGATION: &str = r"(?i)(privacy|datenschutz|privatsph(ä|ae)re|data\s+protection)";

/// Second, narrower hop after a navigation keyword was followed.
pub const NARROW: &str = r"(Daten|Privacy)";

pub const REGISTRATION: &str = r"(?i)(sign\s?up|register|registrieren|log\s?in|anmelden)";

/// Intermediate menu entries that commonly hide the policy link.
pub const HELP_ABOUT: &str = r"(?i)(hilfe|help|über|about)";

/// Sub-list entry inside a compact menu.
pub const COMPACT_ENTRY: &str = r"[Dd]aten";

/// Resource id of the panel of an incidental dialog.
pub const DIALOG_PANEL: &str = r".*:id/parentPanel$";

pub const DRAWER_CLASS: &str = r".*\.DrawerLayout$";

/// Drawer entries worth following, tried in this order.
pub const DRAWER_KEYWORDS: &[&str] = &[
    "daten",
    "data",
    "privat",
    "privacy",
    "hilfe",
    "help",
    "info",
    "einstellung",
    "setting",
    "über",
    "about",
];

/// Page text that moves a page to the front of a prioritized frontier.
pub const ANCHORS: &[&str] = &["datenschutz", "privacy"];

/// The compiled label patterns the strategies share.
#[derive(Debug, Clone)]
pub struct KeywordPatterns {
    pub navigation: Regex,
    pub narrow: Regex,
    pub registration: Regex,
    pub help_about: Regex,
    pub compact_entry: Regex,
    pub dialog_panel: Regex,
    pub drawer_class: Regex,
}

impl KeywordPatterns {
    pub fn compile() -> Result<Self, CrawlError> {
        Ok(Self {
            navigation: compile(NAVIGATION)?,
            narrow: compile(NARROW)?,
            registration: compile(REGISTRATION)?,
            help_about: compile(HELP_ABOUT)?,
            compact_entry: compile(COMPACT_ENTRY)?,
            dialog_panel: compile(DIALOG_PANEL)?,
            drawer_class: compile(DRAWER_CLASS)?,
        })
    }

    pub fn anchors() -> Vec<String> {
        ANCHORS.iter().map(|a| a.to_string()).collect()
    }
}

fn compile(pattern: &str) -> Result<Regex, CrawlError> {
    Regex::new(pattern).map_err(|e| CrawlError::Configuration(format!("invalid pattern {pattern:?}: {e}")))
}
