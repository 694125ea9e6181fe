use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::{persist_json, Applied, BlobStore, WEEKLY_SCHEDULE_KEY};

pub const MAX_DAY: u8 = 7;
pub const MAX_PERIOD: u8 = 10;

/// One cell of the teacher's weekly timetable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleSlot {
    pub day: u8,
    pub period: u8,
    pub label: String,
}

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("day must be between 1 and 7")]
    DayOutOfRange,
    #[error("period must be between 1 and 10")]
    PeriodOutOfRange,
    #[error("label must not be empty")]
    EmptyLabel,
}

fn check_bounds(day: u8, period: u8) -> Result<(), ScheduleError> {
    if day == 0 || day > MAX_DAY {
        return Err(ScheduleError::DayOutOfRange);
    }
    if period == 0 || period > MAX_PERIOD {
        return Err(ScheduleError::PeriodOutOfRange);
    }
    Ok(())
}

pub struct ScheduleLoadOutcome {
    pub store: ScheduleStore,
    pub warnings: Vec<String>,
}

pub struct ScheduleStore {
    slots: Vec<ScheduleSlot>,
}

impl ScheduleStore {
    pub fn load(blob: &dyn BlobStore) -> ScheduleLoadOutcome {
        let mut warnings = Vec::new();
        let slots = match blob.read(WEEKLY_SCHEDULE_KEY) {
            Ok(Some(text)) => match serde_json::from_str(&text) {
                Ok(v) => v,
                Err(e) => {
                    warnings.push(format!("weekly schedule corrupt, starting empty: {}", e));
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warnings.push(format!("weekly schedule unreadable, starting empty: {}", e));
                Vec::new()
            }
        };
        ScheduleLoadOutcome {
            store: Self { slots },
            warnings,
        }
    }

    fn persist(&self, blob: &dyn BlobStore) -> Option<String> {
        persist_json(blob, WEEKLY_SCHEDULE_KEY, &self.slots, "weekly schedule")
    }

    pub fn slots(&self) -> &[ScheduleSlot] {
        &self.slots
    }

    pub fn set_slot(
        &mut self,
        blob: &dyn BlobStore,
        day: u8,
        period: u8,
        label: &str,
    ) -> Result<Applied<ScheduleSlot>, ScheduleError> {
        check_bounds(day, period)?;
        let label = label.trim();
        if label.is_empty() {
            return Err(ScheduleError::EmptyLabel);
        }
        let slot = ScheduleSlot {
            day,
            period,
            label: label.to_string(),
        };
        match self
            .slots
            .iter_mut()
            .find(|s| s.day == day && s.period == period)
        {
            Some(existing) => *existing = slot.clone(),
            None => self.slots.push(slot.clone()),
        }
        Ok(Applied {
            value: slot,
            persist_warning: self.persist(blob),
        })
    }

    pub fn clear_slot(
        &mut self,
        blob: &dyn BlobStore,
        day: u8,
        period: u8,
    ) -> Result<Applied<bool>, ScheduleError> {
        check_bounds(day, period)?;
        let Some(pos) = self
            .slots
            .iter()
            .position(|s| s.day == day && s.period == period)
        else {
            return Ok(Applied {
                value: false,
                persist_warning: None,
            });
        };
        self.slots.remove(pos);
        Ok(Applied {
            value: true,
            persist_warning: self.persist(blob),
        })
    }
}
