use super::{Professor, ProfessorId};
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Load {
    pub supervisees: u32,
    pub examinees: u32,
    pub max_examinees: Option<u32>,
}

impl Load {
    pub fn has_examiner_room(&self) -> bool {
        self.max_examinees.is_none_or(|max| self.examinees < max)
    }
}

/// Supervision and examination counters of the faculty pool, threaded
/// through an allocation run. Professors keep the order in which they
/// were given, which is the tie-break order between equal loads.
#[derive(Clone, Debug, Default)]
pub struct FacultyLoads {
    order: Vec<ProfessorId>,
    loads: HashMap<ProfessorId, Load>,
}

impl FacultyLoads {
    pub fn new(professors: &[Professor]) -> FacultyLoads {
        let mut order = Vec::with_capacity(professors.len());
        let mut loads = HashMap::with_capacity(professors.len());
        for p in professors {
            if loads
                .insert(
                    p.id,
                    Load {
                        supervisees: p.current_supervisees,
                        examinees: p.current_examinees,
                        max_examinees: p.max_examinees,
                    },
                )
                .is_none()
            {
                order.push(p.id);
            }
        }
        FacultyLoads { order, loads }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    #[cfg(test)]
    pub fn faculty(&self) -> &[ProfessorId] {
        &self.order
    }

    #[cfg(test)]
    pub fn load(&self, professor: ProfessorId) -> Option<Load> {
        self.loads.get(&professor).copied()
    }

    fn load_mut(&mut self, professor: ProfessorId) -> &mut Load {
        self.loads
            .get_mut(&professor)
            .expect("professor is not part of the faculty pool")
    }

    // `min_by_key` keeps the first of several minima, so ties resolve in
    // input order.
    pub fn least_loaded_supervisor(&self) -> Option<ProfessorId> {
        self.order
            .iter()
            .copied()
            .min_by_key(|p| self.loads[p].supervisees)
    }

    pub fn eligible_examiners(
        &self,
        excluding: Option<ProfessorId>,
    ) -> impl Iterator<Item = ProfessorId> + '_ {
        self.order
            .iter()
            .copied()
            .filter(move |&p| Some(p) != excluding && self.loads[&p].has_examiner_room())
    }

    pub fn least_loaded_examiner(&self, excluding: Option<ProfessorId>) -> Option<ProfessorId> {
        self.eligible_examiners(excluding)
            .min_by_key(|p| self.loads[p].examinees)
    }

    pub fn add_supervisee(&mut self, professor: ProfessorId) -> u32 {
        let load = self.load_mut(professor);
        load.supervisees += 1;
        load.supervisees
    }

    pub fn add_examinee(&mut self, professor: ProfessorId) -> u32 {
        let load = self.load_mut(professor);
        assert!(
            load.has_examiner_room(),
            "professor {professor} is at examiner capacity"
        );
        load.examinees += 1;
        load.examinees
    }

    // No workflow cancels an assignment yet, so the two release operations
    // are only reachable from tests.

    /// Undo one supervision. Returns `false` if the counter is already zero.
    #[allow(dead_code)]
    pub fn release_supervisee(&mut self, professor: ProfessorId) -> bool {
        let load = self.load_mut(professor);
        if load.supervisees == 0 {
            return false;
        }
        load.supervisees -= 1;
        true
    }

    /// Undo one examination. Returns `false` if the counter is already zero.
    #[allow(dead_code)]
    pub fn release_examinee(&mut self, professor: ProfessorId) -> bool {
        let load = self.load_mut(professor);
        if load.examinees == 0 {
            return false;
        }
        load.examinees -= 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn professor(id: i64, supervisees: u32, examinees: u32, max: Option<u32>) -> Professor {
        Professor {
            current_supervisees: supervisees,
            current_examinees: examinees,
            max_examinees: max,
            ..Professor::new(ProfessorId(id), format!("P{id}"))
        }
    }

    #[test]
    fn ties_go_to_input_order() {
        let mut loads = FacultyLoads::new(&[
            professor(3, 1, 0, None),
            professor(1, 0, 0, None),
            professor(2, 0, 0, None),
        ]);
        assert_eq!(loads.least_loaded_supervisor(), Some(ProfessorId(1)));
        loads.add_supervisee(ProfessorId(1));
        assert_eq!(loads.least_loaded_supervisor(), Some(ProfessorId(2)));
        loads.add_supervisee(ProfessorId(2));
        assert_eq!(loads.least_loaded_supervisor(), Some(ProfessorId(3)));
    }

    #[test]
    fn duplicates_are_ignored() {
        let loads = FacultyLoads::new(&[professor(1, 0, 0, None), professor(1, 5, 0, None)]);
        assert_eq!(loads.len(), 1);
        assert_eq!(loads.load(ProfessorId(1)).unwrap().supervisees, 5);
    }

    #[test]
    fn examiner_capacity_and_exclusion() {
        let mut loads = FacultyLoads::new(&[
            professor(1, 0, 0, None),
            professor(2, 0, 0, Some(1)),
            professor(3, 0, 0, Some(0)),
        ]);
        assert_eq!(
            loads.eligible_examiners(None).collect::<Vec<_>>(),
            vec![ProfessorId(1), ProfessorId(2)]
        );
        assert_eq!(
            loads.least_loaded_examiner(Some(ProfessorId(1))),
            Some(ProfessorId(2))
        );
        loads.add_examinee(ProfessorId(2));
        assert_eq!(loads.least_loaded_examiner(Some(ProfessorId(1))), None);
        assert!(loads.release_examinee(ProfessorId(2)));
        assert!(!loads.release_examinee(ProfessorId(2)));
        assert_eq!(
            loads.least_loaded_examiner(Some(ProfessorId(1))),
            Some(ProfessorId(2))
        );
    }

    #[test]
    fn release_supervisee_stops_at_zero() {
        let mut loads = FacultyLoads::new(&[professor(1, 1, 0, None)]);
        assert!(loads.release_supervisee(ProfessorId(1)));
        assert!(!loads.release_supervisee(ProfessorId(1)));
        assert_eq!(loads.add_supervisee(ProfessorId(1)), 1);
    }
}
