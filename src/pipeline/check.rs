// src/pipeline/check.rs

//! One polling cycle: fetch available terms, diff against the seen state,
//! persist and notify the new ones.

use crate::error::Result;
use crate::models::{Appointment, SniperConfig};
use crate::services::{Notifier, PortalClient};
use crate::storage::{SeenAppointments, SeenStore};

/// Summary of one polling cycle.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    /// Appointments returned by the portal
    pub fetched: usize,
    /// Appointments that were already in the seen state
    pub known: usize,
    /// Appointments recorded and handed to the notifier this cycle
    pub notified: usize,
}

/// Run one full polling cycle against the live portal.
pub async fn run(
    portal: &PortalClient,
    config: &SniperConfig,
    store: &dyn SeenStore,
    notifier: &dyn Notifier,
) -> Result<CheckOutcome> {
    let locator = config.doctor_locator()?;
    let appointments = portal
        .available_terms(&locator, config.lookup_time_days)
        .await?;

    let mut seen = store.load().await?;
    run_check(&appointments, &mut seen, store, notifier).await
}

/// Diff the fetched appointments against the seen state.
///
/// Each new (doctor, date) pair is persisted before its notification is
/// dispatched, so a crash in between can drop a notification but never
/// repeat one on the next run. A persistence failure aborts the cycle;
/// pairs already recorded stay recorded.
pub async fn run_check(
    appointments: &[Appointment],
    seen: &mut SeenAppointments,
    store: &dyn SeenStore,
    notifier: &dyn Notifier,
) -> Result<CheckOutcome> {
    let mut outcome = CheckOutcome {
        fetched: appointments.len(),
        ..CheckOutcome::default()
    };

    if appointments.is_empty() {
        log::info!("No appointments found.");
        return Ok(outcome);
    }

    for appointment in appointments {
        log::info!(
            "Appointment found! {} at {} - {}",
            appointment.date,
            appointment.clinic_name,
            appointment.doctor_name
        );

        if seen.is_known(&appointment.doctor_name, &appointment.date) {
            log::info!("Notification was already sent.");
            outcome.known += 1;
            continue;
        }

        seen.record(&appointment.doctor_name, &appointment.date);
        store
            .merge(
                &appointment.doctor_name,
                seen.dates_for(&appointment.doctor_name),
            )
            .await?;

        notifier.notify(appointment).await;
        outcome.notified += 1;
        log::info!(
            "Notification sent! {} at {} - {}",
            appointment.date,
            appointment.clinic_name,
            appointment.doctor_name
        );
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use crate::error::AppError;
    use crate::models::PushoverConfig;
    use crate::services::PushoverNotifier;
    use crate::storage::LocalStore;

    /// Shared call-order log; the ordering test hands one instance to both
    /// doubles.
    type EventLog = Arc<Mutex<Vec<String>>>;

    /// Store double that keeps state in memory and records call order.
    #[derive(Default)]
    struct MemoryStore {
        state: Mutex<SeenAppointments>,
        events: EventLog,
        fail_writes: bool,
    }

    #[async_trait]
    impl SeenStore for MemoryStore {
        async fn load(&self) -> Result<SeenAppointments> {
            Ok(self.state.lock().unwrap().clone())
        }

        async fn merge(&self, doctor_name: &str, dates: &[String]) -> Result<()> {
            if self.fail_writes {
                return Err(AppError::storage("memory", "write refused"));
            }
            self.events
                .lock()
                .unwrap()
                .push(format!("merge:{doctor_name}"));
            self.state
                .lock()
                .unwrap()
                .set_dates(doctor_name, dates.to_vec());
            Ok(())
        }
    }

    /// Notifier double that records which appointments were dispatched.
    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<Appointment>>,
        events: EventLog,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify(&self, appointment: &Appointment) {
            self.events
                .lock()
                .unwrap()
                .push(format!("notify:{}", appointment.doctor_name));
            self.sent.lock().unwrap().push(appointment.clone());
        }
    }

    fn appointment(doctor: &str, date: &str) -> Appointment {
        Appointment {
            date: date.to_string(),
            clinic_name: "X".to_string(),
            doctor_name: doctor.to_string(),
        }
    }

    #[tokio::test]
    async fn test_new_appointment_is_recorded_and_notified() {
        let store = MemoryStore::default();
        let notifier = RecordingNotifier::default();
        let mut seen = SeenAppointments::new();

        let appointments = [appointment("Dr. A", "2024-05-01 10:00")];
        let outcome = run_check(&appointments, &mut seen, &store, &notifier)
            .await
            .unwrap();

        assert_eq!(outcome.notified, 1);
        assert_eq!(outcome.known, 0);
        assert_eq!(notifier.sent.lock().unwrap().len(), 1);

        let persisted = store.load().await.unwrap();
        assert_eq!(persisted.dates_for("Dr. A"), ["2024-05-01 10:00"]);
    }

    #[tokio::test]
    async fn test_known_appointment_is_skipped() {
        let store = MemoryStore::default();
        let notifier = RecordingNotifier::default();
        let mut seen = SeenAppointments::new();
        seen.record("Dr. A", "2024-05-01 10:00");

        let appointments = [appointment("Dr. A", "2024-05-01 10:00")];
        let outcome = run_check(&appointments, &mut seen, &store, &notifier)
            .await
            .unwrap();

        assert_eq!(outcome.known, 1);
        assert_eq!(outcome.notified, 0);
        assert!(notifier.sent.lock().unwrap().is_empty());
        assert!(store.events.lock().unwrap().is_empty());
        assert_eq!(seen.dates_for("Dr. A"), ["2024-05-01 10:00"]);
    }

    #[tokio::test]
    async fn test_mixed_repeat_and_new() {
        let store = MemoryStore::default();
        let notifier = RecordingNotifier::default();
        let mut seen = SeenAppointments::new();
        seen.record("Dr. A", "2024-05-01 10:00");

        let appointments = [
            appointment("Dr. A", "2024-05-01 10:00"),
            appointment("Dr. A", "2024-05-02 09:00"),
        ];
        let outcome = run_check(&appointments, &mut seen, &store, &notifier)
            .await
            .unwrap();

        assert_eq!(outcome.known, 1);
        assert_eq!(outcome.notified, 1);
        assert_eq!(
            seen.dates_for("Dr. A"),
            ["2024-05-01 10:00", "2024-05-02 09:00"]
        );
        let sent = notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].date, "2024-05-02 09:00");
    }

    #[tokio::test]
    async fn test_empty_fetch_short_circuits() {
        let store = MemoryStore::default();
        let notifier = RecordingNotifier::default();
        let mut seen = SeenAppointments::new();

        let outcome = run_check(&[], &mut seen, &store, &notifier).await.unwrap();

        assert_eq!(outcome.fetched, 0);
        assert!(store.events.lock().unwrap().is_empty());
        assert!(notifier.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_persist_happens_before_dispatch() {
        let events = EventLog::default();
        let store = MemoryStore {
            events: Arc::clone(&events),
            ..MemoryStore::default()
        };
        let notifier = RecordingNotifier {
            events: Arc::clone(&events),
            ..RecordingNotifier::default()
        };
        let mut seen = SeenAppointments::new();

        let appointments = [
            appointment("Dr. A", "2024-05-01 10:00"),
            appointment("Dr. B", "2024-05-03 11:00"),
        ];
        run_check(&appointments, &mut seen, &store, &notifier)
            .await
            .unwrap();

        assert_eq!(
            *events.lock().unwrap(),
            [
                "merge:Dr. A",
                "notify:Dr. A",
                "merge:Dr. B",
                "notify:Dr. B"
            ]
        );
    }

    #[tokio::test]
    async fn test_write_failure_aborts_cycle() {
        let store = MemoryStore {
            fail_writes: true,
            ..MemoryStore::default()
        };
        let notifier = RecordingNotifier::default();
        let mut seen = SeenAppointments::new();

        let appointments = [appointment("Dr. A", "2024-05-01 10:00")];
        let result = run_check(&appointments, &mut seen, &store, &notifier).await;

        assert!(result.is_err());
        // Nothing was dispatched for the pair whose persist failed.
        assert!(notifier.sent.lock().unwrap().is_empty());
        // The in-memory record survives; the run is aborted without rollback.
        assert!(seen.is_known("Dr. A", "2024-05-01 10:00"));
    }

    #[tokio::test]
    async fn test_failing_channel_does_not_fail_the_cycle() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let tmp = tempfile::TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path().join("seen.json"));
        let notifier = PushoverNotifier::with_url(
            reqwest::Client::new(),
            format!("{}/1/messages.json", server.uri()),
            PushoverConfig {
                user_key: "u".to_string(),
                api_token: "t".to_string(),
                title: "t".to_string(),
                message_template: "{DoctorName} {AppointmentDate}".to_string(),
            },
        );
        let mut seen = SeenAppointments::new();

        let appointments = [appointment("Dr. A", "2024-05-01 10:00")];
        let outcome = run_check(&appointments, &mut seen, &store, &notifier)
            .await
            .unwrap();

        // Delivery failed silently; the pair is still recorded as notified.
        assert_eq!(outcome.notified, 1);
        let persisted = store.load().await.unwrap();
        assert!(persisted.is_known("Dr. A", "2024-05-01 10:00"));
    }
}
