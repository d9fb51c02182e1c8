use crate::error::PlanError;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capacity {
    pub major: String,
    pub max_projects: u32,
    pub current_count: u32,
}

impl Capacity {
    pub fn new(major: impl Into<String>, max_projects: u32) -> Self {
        Capacity {
            major: major.into(),
            max_projects,
            current_count: 0,
        }
    }

    pub fn is_full(&self) -> bool {
        self.current_count >= self.max_projects
    }

    pub fn remaining(&self) -> u32 {
        self.max_projects.saturating_sub(self.current_count)
    }
}

/// Per-major project quotas of a term.
///
/// Reservations are counted in `current_count`, which never exceeds
/// `max_projects`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapacityLedger {
    entries: Vec<Capacity>,
}

impl CapacityLedger {
    pub fn new() -> Self {
        CapacityLedger::default()
    }

    pub fn get(&self, major: &str) -> Option<&Capacity> {
        self.entries.iter().find(|c| c.major == major)
    }

    fn get_mut(&mut self, major: &str) -> Option<&mut Capacity> {
        self.entries.iter_mut().find(|c| c.major == major)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Capacity> {
        self.entries.iter()
    }

    /// Take one seat for `major`. Fails if the major has no quota or the
    /// quota is exhausted.
    pub fn try_reserve(&mut self, major: &str) -> bool {
        match self.get_mut(major) {
            Some(capacity) if !capacity.is_full() => {
                capacity.current_count += 1;
                true
            }
            _ => false,
        }
    }

    /// Give back a seat taken by `try_reserve`.
    pub fn release(&mut self, major: &str) -> bool {
        match self.get_mut(major) {
            Some(capacity) if capacity.current_count > 0 => {
                capacity.current_count -= 1;
                true
            }
            _ => false,
        }
    }

    /// Create the quota for `major`, or change its maximum while keeping
    /// the seats already taken.
    pub fn set_capacity(&mut self, major: &str, max_projects: u32) -> Result<(), PlanError> {
        match self.get_mut(major) {
            Some(capacity) => {
                if max_projects < capacity.current_count {
                    return Err(PlanError::CapacityBelowCount {
                        major: major.to_owned(),
                        current: capacity.current_count,
                        requested: max_projects,
                    });
                }
                capacity.max_projects = max_projects;
            }
            None => self.entries.push(Capacity::new(major, max_projects)),
        }
        Ok(())
    }
}

impl FromIterator<Capacity> for CapacityLedger {
    fn from_iter<I: IntoIterator<Item = Capacity>>(iter: I) -> Self {
        let mut ledger = CapacityLedger::new();
        for capacity in iter {
            match ledger.get_mut(&capacity.major) {
                Some(existing) => *existing = capacity,
                None => ledger.entries.push(capacity),
            }
        }
        ledger
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn third_reservation_exceeds_capacity_of_two() {
        let mut ledger = CapacityLedger::new();
        ledger.set_capacity("CS", 2).unwrap();
        assert!(ledger.try_reserve("CS"));
        assert!(ledger.try_reserve("CS"));
        assert!(!ledger.try_reserve("CS"));
        assert_eq!(ledger.get("CS").unwrap().current_count, 2);
    }

    #[test]
    fn unknown_major_cannot_reserve() {
        let mut ledger: CapacityLedger = [Capacity::new("EE", 3)].into_iter().collect();
        assert!(!ledger.try_reserve("CS"));
        assert!(ledger.get("CS").is_none());
    }

    #[test]
    fn zero_capacity_is_always_full() {
        let mut ledger: CapacityLedger = [Capacity::new("CS", 0)].into_iter().collect();
        assert!(!ledger.try_reserve("CS"));
    }

    #[test]
    fn set_capacity_keeps_current_count() {
        let mut ledger = CapacityLedger::new();
        ledger.set_capacity("CS", 1).unwrap();
        assert!(ledger.try_reserve("CS"));
        assert!(!ledger.try_reserve("CS"));
        ledger.set_capacity("CS", 3).unwrap();
        let cs = ledger.get("CS").unwrap();
        assert_eq!((cs.current_count, cs.max_projects, cs.remaining()), (1, 3, 2));
        assert!(ledger.try_reserve("CS"));
        assert!(matches!(
            ledger.set_capacity("CS", 1),
            Err(PlanError::CapacityBelowCount { current: 2, .. })
        ));
    }

    #[test]
    fn release_frees_a_seat() {
        let mut ledger: CapacityLedger = [Capacity::new("CS", 1)].into_iter().collect();
        assert!(!ledger.release("CS"));
        assert!(ledger.try_reserve("CS"));
        assert!(ledger.release("CS"));
        assert!(ledger.try_reserve("CS"));
        assert!(!ledger.release("EE"));
    }

    #[test]
    fn count_never_exceeds_max() {
        let mut ledger = CapacityLedger::new();
        ledger.set_capacity("CS", 5).unwrap();
        ledger.set_capacity("EE", 2).unwrap();
        for i in 0..40 {
            let major = if i % 3 == 0 { "EE" } else { "CS" };
            ledger.try_reserve(major);
            if i % 7 == 0 {
                ledger.release(major);
            }
            assert!(ledger.iter().all(|c| c.current_count <= c.max_projects));
        }
    }
}
