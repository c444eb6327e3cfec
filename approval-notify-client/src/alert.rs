//! Decides when the backlog deserves a popup.
//!
//! A popup is raised for the first non-empty backlog seen by a monitoring
//! session and then only when the total grows. Equal or shrinking totals, an
//! empty backlog and failed fetches stay quiet.

use approval_notify_shared::ApprovalCounts;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Fire,
    Hold,
}

impl Decision {
    pub fn fires(self) -> bool {
        matches!(self, Decision::Fire)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No successful fetch yet.
    Idle,
    /// Exactly one successful fetch observed.
    Primed,
    Monitoring,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationState {
    previous_total: Option<u32>,
    has_fired_first_alert: bool,
    observed: u64,
}

impl NotificationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn previous_total(&self) -> Option<u32> {
        self.previous_total
    }

    pub fn has_fired_first_alert(&self) -> bool {
        self.has_fired_first_alert
    }

    pub fn phase(&self) -> Phase {
        match self.observed {
            0 => Phase::Idle,
            1 => Phase::Primed,
            _ => Phase::Monitoring,
        }
    }

    /// Feed one cycle's fetch result. `None` is a cycle that produced no
    /// usable data: nothing changes and nothing fires.
    pub fn observe(&mut self, fetched: Option<&ApprovalCounts>) -> Decision {
        let Some(counts) = fetched else {
            return Decision::Hold;
        };
        let total = counts.total;
        let decision = match self.previous_total {
            _ if counts.is_empty() => Decision::Hold,
            None => {
                self.has_fired_first_alert = true;
                Decision::Fire
            }
            Some(prev) if total > prev => Decision::Fire,
            Some(_) => Decision::Hold,
        };
        self.previous_total = Some(total);
        self.observed = self.observed.saturating_add(1);
        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn totals(seq: &[Option<u32>]) -> Vec<Decision> {
        let mut st = NotificationState::new();
        seq.iter()
            .map(|t| {
                let counts = t.map(|n| ApprovalCounts::new(n, 0, 0));
                st.observe(counts.as_ref())
            })
            .collect()
    }

    use Decision::{Fire, Hold};

    #[test]
    fn fires_on_first_and_on_each_increase() {
        let got = totals(&[Some(14), Some(14), Some(20), Some(18), Some(25)]);
        assert_eq!(got, vec![Fire, Hold, Fire, Hold, Fire]);
    }

    #[test]
    fn empty_backlog_never_fires() {
        let got = totals(&[Some(0), Some(0), Some(3), Some(0), Some(0)]);
        assert_eq!(got, vec![Hold, Hold, Fire, Hold, Hold]);
    }

    #[test]
    fn growth_after_empty_backlog_fires_again() {
        // 0 resets the baseline, so any later backlog counts as an increase.
        let got = totals(&[Some(5), Some(0), Some(2)]);
        assert_eq!(got, vec![Fire, Hold, Fire]);
    }

    #[test]
    fn no_data_leaves_state_untouched() {
        let mut st = NotificationState::new();
        assert_eq!(st.observe(None), Hold);
        assert_eq!(st.phase(), Phase::Idle);
        assert_eq!(st.previous_total(), None);

        assert_eq!(st.observe(Some(&ApprovalCounts::new(4, 1, 0))), Fire);
        let before = st.clone();
        assert_eq!(st.observe(None), Hold);
        assert_eq!(st, before);
        assert_eq!(st.previous_total(), Some(4));
    }

    #[test]
    fn no_data_between_equal_totals_does_not_refire() {
        let got = totals(&[None, Some(7), None, None, Some(7), Some(8)]);
        assert_eq!(got, vec![Hold, Fire, Hold, Hold, Hold, Fire]);
    }

    #[test]
    fn phases_advance_on_successful_fetches_only() {
        let mut st = NotificationState::new();
        st.observe(None);
        assert_eq!(st.phase(), Phase::Idle);
        st.observe(Some(&ApprovalCounts::new(1, 0, 0)));
        assert_eq!(st.phase(), Phase::Primed);
        assert!(st.has_fired_first_alert());
        st.observe(Some(&ApprovalCounts::new(1, 0, 0)));
        assert_eq!(st.phase(), Phase::Monitoring);
    }

    #[test]
    fn first_fetch_empty_does_not_mark_first_alert() {
        let mut st = NotificationState::new();
        assert_eq!(st.observe(Some(&ApprovalCounts::default())), Hold);
        assert!(!st.has_fired_first_alert());
        assert_eq!(st.previous_total(), Some(0));
    }

    #[test]
    fn inconsistent_sub_counts_are_accepted() {
        let mut st = NotificationState::new();
        assert_eq!(st.observe(Some(&ApprovalCounts::new(1, 9, 9))), Fire);
    }
}
