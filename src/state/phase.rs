//! Crawl session phase definitions
//!
//! A session moves strictly forward: `Idle → Seeding → Running → Draining → Done`.
//! `Done` is also reachable from `Idle` and `Seeding`, for sessions that end
//! before any worker starts.

use std::fmt;

/// The lifecycle phase of one crawl session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CrawlPhase {
    /// Created, nothing started
    #[default]
    Idle,

    /// Pushing the start URL into the frontier
    Seeding,

    /// Workers are claiming and processing items
    Running,

    /// The frontier reported empty-and-idle (or was cancelled); workers are exiting
    Draining,

    /// Terminal; the summary is available
    Done,
}

impl CrawlPhase {
    /// Returns true if moving from `self` to `next` is legal
    pub fn can_transition_to(&self, next: CrawlPhase) -> bool {
        use CrawlPhase::*;
        matches!(
            (self, next),
            (Idle, Seeding)
                | (Seeding, Running)
                | (Running, Draining)
                | (Draining, Done)
                | (Idle, Done)
                | (Seeding, Done)
        )
    }

    /// Returns true for the terminal phase
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Seeding => "seeding",
            Self::Running => "running",
            Self::Draining => "draining",
            Self::Done => "done",
        }
    }

    /// Returns all phases in lifecycle order
    pub fn all_phases() -> [Self; 5] {
        [
            Self::Idle,
            Self::Seeding,
            Self::Running,
            Self::Draining,
            Self::Done,
        ]
    }
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_path_is_legal() {
        let phases = CrawlPhase::all_phases();
        for pair in phases.windows(2) {
            assert!(
                pair[0].can_transition_to(pair[1]),
                "{} -> {} should be legal",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn test_no_backwards_or_self_transitions() {
        let phases = CrawlPhase::all_phases();
        for (i, from) in phases.iter().enumerate() {
            for to in &phases[..=i] {
                assert!(!from.can_transition_to(*to), "{} -> {} should be illegal", from, to);
            }
        }
    }

    #[test]
    fn test_no_skipping_running() {
        assert!(!CrawlPhase::Idle.can_transition_to(CrawlPhase::Running));
        assert!(!CrawlPhase::Seeding.can_transition_to(CrawlPhase::Draining));
        assert!(!CrawlPhase::Running.can_transition_to(CrawlPhase::Done));
    }

    #[test]
    fn test_early_abort_reaches_done() {
        assert!(CrawlPhase::Idle.can_transition_to(CrawlPhase::Done));
        assert!(CrawlPhase::Seeding.can_transition_to(CrawlPhase::Done));
    }

    #[test]
    fn test_done_is_terminal() {
        assert!(CrawlPhase::Done.is_terminal());
        for phase in CrawlPhase::all_phases() {
            assert!(!CrawlPhase::Done.can_transition_to(phase));
        }
        assert!(!CrawlPhase::Running.is_terminal());
    }

    #[test]
    fn test_display_and_default() {
        assert_eq!(CrawlPhase::default(), CrawlPhase::Idle);
        assert_eq!(CrawlPhase::Draining.to_string(), "draining");
    }
}
