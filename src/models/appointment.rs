//! Appointment data structure.

use serde::{Deserialize, Serialize};

/// An available appointment slot fetched from the patient portal.
///
/// Two appointments describe the same notifiable event iff `doctor_name`
/// and `date` are equal; `clinic_name` is descriptive only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Appointment {
    /// Visit date as formatted by the portal (opaque, never reparsed)
    pub date: String,

    /// Clinic display name
    pub clinic_name: String,

    /// Doctor display name; partition key for the seen-appointment state
    pub doctor_name: String,
}

impl Appointment {
    /// Format the appointment for a notification using a template.
    ///
    /// Supported placeholders:
    /// - `{AppointmentDate}`, `{ClinicPublicName}`, `{DoctorName}`, `{title}`
    pub fn format(&self, template: &str, title: &str) -> String {
        template
            .replace("{AppointmentDate}", &self.date)
            .replace("{ClinicPublicName}", &self.clinic_name)
            .replace("{DoctorName}", &self.doctor_name)
            .replace("{title}", title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_appointment() -> Appointment {
        Appointment {
            date: "2024-05-01 10:00".to_string(),
            clinic_name: "Centrum Medyczne X".to_string(),
            doctor_name: "Dr. A".to_string(),
        }
    }

    #[test]
    fn test_format() {
        let appointment = sample_appointment();
        let result = appointment.format(
            "New visit! {AppointmentDate} at {ClinicPublicName} - {DoctorName} ({title})",
            "LuxMedSniper",
        );
        assert_eq!(
            result,
            "New visit! 2024-05-01 10:00 at Centrum Medyczne X - Dr. A (LuxMedSniper)"
        );
    }

    #[test]
    fn test_format_ignores_unknown_placeholders() {
        let appointment = sample_appointment();
        let result = appointment.format("{DoctorName} {unknown}", "t");
        assert_eq!(result, "Dr. A {unknown}");
    }
}
