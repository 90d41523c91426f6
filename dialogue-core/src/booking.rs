use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::extract::NationalId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookingKind {
    Flight,
    Hotel,
}

impl BookingKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            BookingKind::Flight => "VOO",
            BookingKind::Hotel => "HTL",
        }
    }
}

/// Human-readable reservation code: kind prefix, last four ID digits and a
/// `ddmmHHMM` stamp. Two bookings by the same person in the same minute
/// collide; this is a display code, not an identifier.
pub fn reservation_code(kind: BookingKind, national_id: &NationalId, at: DateTime<Utc>) -> String {
    format!(
        "{}{}{}",
        kind.prefix(),
        national_id.last_four_digits(),
        at.format("%d%m%H%M")
    )
}
