//! Seen-appointment state and persistence backends.
//!
//! The persisted state is a mapping from doctor name to the dates that have
//! already triggered a notification. Backends expose a load-everything /
//! merge-one-doctor pair of operations; a merge write must only touch the
//! entry for the given doctor so that independent runs never clobber each
//! other's history.
//!
//! At most one sniper instance is assumed to run at a time against a given
//! store. Two concurrent runs may both observe the same appointment as
//! unknown and notify twice; there is no conditional-write guard.

pub mod firestore;
pub mod local;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

// Re-export for convenience
pub use firestore::FirestoreStore;
pub use local::LocalStore;

/// In-memory copy of the notified (doctor, date) pairs.
///
/// Physically a doctor → date-sequence mapping for persistence simplicity;
/// [`SeenAppointments::record`] enforces set semantics per doctor.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct SeenAppointments {
    entries: BTreeMap<String, Vec<String>>,
}

impl SeenAppointments {
    pub fn new() -> Self {
        Self::default()
    }

    /// True iff a notification was already sent for this (doctor, date) pair.
    pub fn is_known(&self, doctor_name: &str, date: &str) -> bool {
        self.entries
            .get(doctor_name)
            .is_some_and(|dates| dates.iter().any(|d| d == date))
    }

    /// Record a notified pair, returning `false` when it was already present.
    ///
    /// Duplicates are rejected here, so the persisted date lists can only
    /// grow by genuinely new entries even if a call-site guard is skipped.
    pub fn record(&mut self, doctor_name: &str, date: &str) -> bool {
        if self.is_known(doctor_name, date) {
            return false;
        }
        self.entries
            .entry(doctor_name.to_string())
            .or_default()
            .push(date.to_string());
        true
    }

    /// Notified dates for one doctor, in recording order.
    pub fn dates_for(&self, doctor_name: &str) -> &[String] {
        match self.entries.get(doctor_name) {
            Some(dates) => dates.as_slice(),
            None => &[],
        }
    }

    /// Replace one doctor's date list wholesale. Used by store backends
    /// when materializing a merge.
    pub fn set_dates(&mut self, doctor_name: &str, dates: Vec<String>) {
        self.entries.insert(doctor_name.to_string(), dates);
    }

    pub fn doctor_count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate doctors and their recorded dates.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.entries.iter()
    }
}

/// Trait for seen-appointment storage backends.
#[async_trait]
pub trait SeenStore: Send + Sync {
    /// Load the full persisted mapping; empty when no prior state exists.
    ///
    /// A read failure is fatal to the run; there is no retry.
    async fn load(&self) -> Result<SeenAppointments>;

    /// Persist one doctor's full date list.
    ///
    /// Merge semantics: the write must only touch the entry for
    /// `doctor_name`, leaving every other doctor's history intact.
    async fn merge(&self, doctor_name: &str, dates: &[String]) -> Result<()>;
}
