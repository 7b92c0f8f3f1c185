use crate::filter::ActivityFilter;
use crate::models::{ActivityRecord, Teacher};
use crate::seed;

/// Source of activity records. Order of returned records is unspecified.
pub trait RecordStore {
    async fn query(&self, filter: &ActivityFilter) -> anyhow::Result<Vec<ActivityRecord>>;

    async fn find_teacher(&self, teacher_id: &str) -> anyhow::Result<Option<Teacher>>;
}

/// Snapshot held in memory, with an optional roster of teachers who may have no activity yet.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Vec<ActivityRecord>,
    roster: Vec<Teacher>,
}

impl MemoryStore {
    pub fn new(records: Vec<ActivityRecord>) -> Self {
        Self {
            records,
            roster: Vec::new(),
        }
    }

    pub fn with_roster(mut self, roster: Vec<Teacher>) -> Self {
        self.roster = roster;
        self
    }

    pub fn demo() -> anyhow::Result<Self> {
        Ok(Self::new(seed::demo_records()?).with_roster(seed::demo_teachers()))
    }
}

impl RecordStore for MemoryStore {
    async fn query(&self, filter: &ActivityFilter) -> anyhow::Result<Vec<ActivityRecord>> {
        Ok(filter.apply(&self.records))
    }

    async fn find_teacher(&self, teacher_id: &str) -> anyhow::Result<Option<Teacher>> {
        let listed = self
            .roster
            .iter()
            .find(|teacher| teacher.teacher_id == teacher_id)
            .cloned();
        let seen = || {
            self.records
                .iter()
                .find(|record| record.teacher_id == teacher_id)
                .map(|record| Teacher {
                    teacher_id: record.teacher_id.clone(),
                    name: record.teacher_name.clone(),
                })
        };
        Ok(listed.or_else(seen))
    }
}
