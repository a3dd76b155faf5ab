//! RunnerOptions - Announcement formatting and label policy

use super::case::Case;

/// Default marker placed on both sides of an announced label.
pub const DEFAULT_MARKER: &str = "===";

/// Default number of blank lines written before an announcement.
pub const DEFAULT_PADDING: usize = 2;

/// Options for [`CaseRunner`](super::CaseRunner)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerOptions {
    /// Marker placed on both sides of the label
    pub marker: String,
    /// Blank lines written before each announcement
    pub padding: usize,
    /// Treat empty `description`/`prefix` strings as missing
    pub empty_is_absent: bool,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            marker: DEFAULT_MARKER.to_string(),
            padding: DEFAULT_PADDING,
            empty_is_absent: false,
        }
    }
}

impl RunnerOptions {
    /// Create options with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the announcement marker
    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = marker.into();
        self
    }

    /// Set the number of blank lines before announcements
    pub fn with_padding(mut self, padding: usize) -> Self {
        self.padding = padding;
        self
    }

    /// Choose whether empty strings count as missing
    pub fn with_empty_is_absent(mut self, empty_is_absent: bool) -> Self {
        self.empty_is_absent = empty_is_absent;
        self
    }

    /// The announcement line for `label`
    pub fn announcement(&self, label: &str) -> String {
        if self.marker.is_empty() {
            label.to_string()
        } else {
            format!("{marker} {label} {marker}", marker = self.marker)
        }
    }

    /// The prefix the case runs under, if any
    pub fn prefix_for<'c>(&self, case: &'c Case) -> Option<&'c str> {
        self.present(case.prefix())
    }

    /// The label announced for the case, if any
    pub fn label_for<'c>(&self, case: &'c Case) -> Option<&'c str> {
        self.present(case.description())
            .or_else(|| self.present(case.prefix()))
    }

    fn present<'c>(&self, value: Option<&'c str>) -> Option<&'c str> {
        value.filter(|v| !(self.empty_is_absent && v.is_empty()))
    }
}
