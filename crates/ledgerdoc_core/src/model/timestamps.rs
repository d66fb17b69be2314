//! Created/updated timestamp policy.
//!
//! # Responsibility
//! - Produce stamped copies of documents before they are written.
//! - Provide the clock abstraction used for "now".
//!
//! # Invariants
//! - Caller documents are never mutated; stamping returns a new value.
//! - A field that is missing or null counts as unset.
//! - Insert defaults `updatedAt` to the (possibly caller-supplied) `createdAt`.
//! - "Now" has millisecond precision.

use crate::ion::{IonStruct, IonValue};
use chrono::{DateTime, SubsecRound, Utc};

pub const CREATED_AT_FIELD: &str = "createdAt";
pub const UPDATED_AT_FIELD: &str = "updatedAt";

/// Source of the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock truncated to milliseconds.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now().trunc_subsecs(3)
    }
}

/// Clock pinned to one instant, for deterministic callers and tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Returns a copy with `createdAt` and `updatedAt` guaranteed present.
pub fn stamp_for_insert(document: &IonStruct, now: DateTime<Utc>) -> IonStruct {
    let mut stamped = document.clone();
    if is_unset(&stamped, CREATED_AT_FIELD) {
        stamped.insert(CREATED_AT_FIELD, now);
    }
    if is_unset(&stamped, UPDATED_AT_FIELD) {
        let created_at = stamped
            .get(CREATED_AT_FIELD)
            .cloned()
            .unwrap_or_else(|| IonValue::from(now));
        stamped.insert(UPDATED_AT_FIELD, created_at);
    }
    stamped
}

/// Returns a copy with `updatedAt` guaranteed present.
pub fn stamp_for_update(document: &IonStruct, now: DateTime<Utc>) -> IonStruct {
    let mut stamped = document.clone();
    if is_unset(&stamped, UPDATED_AT_FIELD) {
        stamped.insert(UPDATED_AT_FIELD, now);
    }
    stamped
}

fn is_unset(document: &IonStruct, field: &str) -> bool {
    document.get(field).map_or(true, IonValue::is_null)
}
