use std::fmt;

/// What happened to one claimed frontier item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageOutcome {
    /// Fetched and written to the mirror
    Saved,

    /// Fetch, path mapping or write failed; nothing (or a partial record) kept
    Failed,

    /// Out of scope or disallowed by robots.txt; never fetched
    Skipped,
}

impl PageOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Saved)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Saved => "saved",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

impl fmt::Display for PageOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
