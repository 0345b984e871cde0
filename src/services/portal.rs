// src/services/portal.rs

//! LuxMed patient portal client.
//!
//! Logs in against the mobile API and queries currently available
//! appointment terms for a doctor locator.

use std::time::Duration;

use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, AUTHORIZATION, USER_AGENT};
use reqwest::Client;
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::models::{Appointment, DoctorLocator};

const BASE_URL: &str = "https://portalpacjenta.luxmed.pl/PatientPortalMobileAPI";

/// Fixed payer/language parameters used by the mobile portal API.
const PAYER_ID: &str = "123";
const LANGUAGE_ID: &str = "10";

const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";
const TIMEOUT_SECS: u64 = 30;

/// Client for the patient portal mobile API.
///
/// Holds the bearer token obtained at login; construct with
/// [`PortalClient::login`].
pub struct PortalClient {
    client: Client,
    base_url: String,
    authorization: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    token_type: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TermsResponse {
    #[serde(default)]
    available_visits_term_presentation: Vec<Term>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Term {
    visit_date: VisitDate,
    clinic: NamedEntity,
    doctor: NamedEntity,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct VisitDate {
    formatted_date: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct NamedEntity {
    name: String,
}

impl From<Term> for Appointment {
    fn from(term: Term) -> Self {
        Self {
            date: term.visit_date.formatted_date,
            clinic_name: term.clinic.name,
            doctor_name: term.doctor.name,
        }
    }
}

/// Session headers mimicking the mobile patient portal app.
fn session_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        "Custom-User-Agent",
        HeaderValue::from_static(
            "PatientPortal; 4.14.0; 4380E6AC-D291-4895-8B1B-F774C318BD7D; iOS; 13.5.1; iPhone8,1",
        ),
    );
    headers.insert(
        USER_AGENT,
        HeaderValue::from_static(
            "PatientPortal/4.14.0 (pl.luxmed.pp.LUX-MED; build:853; iOS 13.5.1) Alamofire/4.9.1",
        ),
    );
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static("en;q=1.0, en-PL;q=0.9, pl-PL;q=0.8, ru-PL;q=0.7, uk-PL;q=0.6"),
    );
    headers
}

impl PortalClient {
    /// Log in to the portal and return an authenticated client.
    ///
    /// Login failure is fatal; there is no retry.
    pub async fn login(email: &str, password: &str) -> Result<Self> {
        Self::login_at(BASE_URL, email, password).await
    }

    /// Log in against a custom base URL.
    pub async fn login_at(base_url: &str, email: &str, password: &str) -> Result<Self> {
        let client = Client::builder()
            .default_headers(session_headers())
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .build()?;

        let form = [
            ("grant_type", "password"),
            ("client_id", "iPhone"),
            ("username", email),
            ("password", password),
        ];
        let response = client
            .post(format!("{base_url}/api/token"))
            .form(&form)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(AppError::auth(format!(
                "portal login failed with status {}",
                response.status()
            )));
        }
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AppError::auth(format!("portal login response not understood: {e}")))?;

        log::info!("Successfully logged in!");

        Ok(Self {
            client,
            base_url: base_url.to_string(),
            authorization: format!("{} {}", token.token_type, token.access_token),
        })
    }

    /// Fetch all currently available appointment terms for the locator.
    ///
    /// The lookup window runs from now to now + `lookup_days`. Wildcard
    /// locator components are left out of the query entirely.
    pub async fn available_terms(
        &self,
        locator: &DoctorLocator,
        lookup_days: u32,
    ) -> Result<Vec<Appointment>> {
        let from = Utc::now();
        let to = from + chrono::Duration::days(i64::from(lookup_days));
        let lookup = lookup_days.to_string();

        let mut query: Vec<(&str, String)> = vec![
            ("cityId", locator.city_id.clone()),
            ("payerId", PAYER_ID.to_string()),
            ("serviceId", locator.service_id.clone()),
            ("languageId", LANGUAGE_ID.to_string()),
            ("FromDate", from.format(DATE_FORMAT).to_string()),
            ("ToDate", to.format(DATE_FORMAT).to_string()),
            ("searchDatePreset", lookup),
        ];
        if let Some(clinic_id) = &locator.clinic_id {
            query.push(("clinicId", clinic_id.clone()));
        }
        if let Some(doctor_id) = &locator.doctor_id {
            query.push(("doctorId", doctor_id.clone()));
        }

        let response = self
            .client
            .get(format!("{}/api/visits/available-terms", self.base_url))
            .header(AUTHORIZATION, &self.authorization)
            .query(&query)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(AppError::portal(
                "available-terms",
                format!("status {}", response.status()),
            ));
        }

        let terms: TermsResponse = response.json().await?;
        Ok(terms
            .available_visits_term_presentation
            .into_iter()
            .map(Appointment::from)
            .collect())
    }
}
