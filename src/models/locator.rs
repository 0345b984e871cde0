//! Composite doctor locator identifier.

use std::str::FromStr;

use crate::error::AppError;

/// Wildcard sentinel meaning "no filter on this dimension".
const WILDCARD: &str = "-1";

/// Filter for the portal availability query.
///
/// Parsed from the `city*service*clinic*doctor` form used in the
/// configuration file. Clinic and doctor accept the wildcard sentinel
/// `-1`; a wildcard component is omitted from the portal request entirely
/// rather than sent as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoctorLocator {
    /// City identifier
    pub city_id: String,

    /// Service (examination type) identifier
    pub service_id: String,

    /// Clinic identifier, `None` when unfiltered
    pub clinic_id: Option<String>,

    /// Doctor identifier, `None` when unfiltered
    pub doctor_id: Option<String>,
}

impl FromStr for DoctorLocator {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split('*').collect();
        if parts.len() != 4 {
            return Err(AppError::locator(
                s,
                format!(
                    "expected 4 '*'-separated fields (city*service*clinic*doctor), got {}",
                    parts.len()
                ),
            ));
        }
        if parts[0].is_empty() || parts[1].is_empty() {
            return Err(AppError::locator(s, "city and service ids must not be empty"));
        }

        Ok(Self {
            city_id: parts[0].to_string(),
            service_id: parts[1].to_string(),
            clinic_id: optional_component(parts[2]),
            doctor_id: optional_component(parts[3]),
        })
    }
}

fn optional_component(raw: &str) -> Option<String> {
    if raw == WILDCARD {
        None
    } else {
        Some(raw.to_string())
    }
}
