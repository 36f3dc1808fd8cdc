use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{ProviderError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityQuery {
    pub property_id: String,
    pub start_date: NaiveDate,
    /// Exclusive.
    pub end_date: NaiveDate,
    /// Empty means "any room type".
    #[serde(default)]
    pub room_type_ids: Vec<String>,
}

impl AvailabilityQuery {
    pub fn new(property_id: impl Into<String>, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            property_id: property_id.into(),
            start_date,
            end_date,
            room_type_ids: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_room_types<I, S>(mut self, room_type_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.room_type_ids = room_type_ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.property_id.trim().is_empty() {
            return Err(ProviderError::InvalidParams {
                reason: "propertyId must not be empty".into(),
            });
        }
        if self.end_date < self.start_date {
            return Err(ProviderError::InvalidParams {
                reason: format!(
                    "endDate {} is before startDate {}",
                    self.end_date, self.start_date
                ),
            });
        }
        if self.room_type_ids.iter().any(|id| id.trim().is_empty()) {
            return Err(ProviderError::InvalidParams {
                reason: "roomTypeIds must not contain empty ids".into(),
            });
        }
        Ok(())
    }

    /// Every date in `[start_date, end_date)`.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start_date
            .iter_days()
            .take_while(|d| *d < self.end_date)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityEntry {
    pub date: NaiveDate,
    pub room_type_id: String,
    pub available_units: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityResult {
    pub availability: Vec<AvailabilityEntry>,
}

impl AvailabilityResult {
    pub fn len(&self) -> usize {
        self.availability.len()
    }

    pub fn is_empty(&self) -> bool {
        self.availability.is_empty()
    }

    /// Units for one (date, room type) pair, if the provider reported it.
    pub fn units_for(&self, date: NaiveDate, room_type_id: &str) -> Option<u32> {
        self.availability
            .iter()
            .find(|e| e.date == date && e.room_type_id == room_type_id)
            .map(|e| e.available_units)
    }
}
