use std::borrow::Cow;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::TrialScoutError;

const CTGOV_BASE: &str = "https://clinicaltrials.gov/api/v2";
const CTGOV_API: &str = "clinicaltrials.gov";
pub const CTGOV_BASE_ENV: &str = "TRIALSCOUT_CTGOV_BASE";

pub const VERSION_TIMEOUT: Duration = Duration::from_secs(20);
pub const SEARCH_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct ClinicalTrialsClient {
    client: reqwest::Client,
    base: Cow<'static, str>,
}

#[derive(Debug, Clone)]
pub struct CtGovSearchParams {
    /// Free-text `query.term`; the condition, optionally followed by a location hint.
    pub term: String,
    pub page_size: usize,
}

impl ClinicalTrialsClient {
    pub fn new() -> Result<Self, TrialScoutError> {
        Ok(Self {
            client: crate::sources::http_client()?,
            base: crate::sources::env_base(CTGOV_BASE, CTGOV_BASE_ENV),
        })
    }

    pub fn with_base(base: impl Into<String>) -> Result<Self, TrialScoutError> {
        Ok(Self {
            client: crate::sources::http_client()?,
            base: Cow::Owned(base.into()),
        })
    }

    pub fn base(&self) -> &str {
        self.base.as_ref()
    }

    fn endpoint(&self, path: &str) -> String {
        crate::sources::join_endpoint(self.base.as_ref(), path)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        req: reqwest::RequestBuilder,
        timeout: Duration,
    ) -> Result<T, TrialScoutError> {
        let resp = req
            .timeout(timeout)
            .send()
            .await
            .map_err(|err| TrialScoutError::from_send(CTGOV_API, timeout, err))?;
        let status = resp.status();
        let bytes = crate::sources::read_limited_body(resp, CTGOV_API, timeout).await?;
        if !status.is_success() {
            let excerpt = crate::sources::body_excerpt(&bytes);
            return Err(TrialScoutError::Api {
                api: CTGOV_API.to_string(),
                message: format!("HTTP {status}: {excerpt}"),
            });
        }
        serde_json::from_slice(&bytes).map_err(|source| TrialScoutError::ApiJson {
            api: CTGOV_API.to_string(),
            source,
        })
    }

    /// Fetches the registry's API version and data snapshot timestamp.
    pub async fn version(&self) -> Result<CtGovVersion, TrialScoutError> {
        let url = self.endpoint("version");
        debug!(%url, "fetching registry version");
        self.get_json(self.client.get(&url), VERSION_TIMEOUT).await
    }

    /// Runs a single-page study search. Only the first page is ever requested.
    pub async fn search(
        &self,
        params: &CtGovSearchParams,
    ) -> Result<CtGovSearchResponse, TrialScoutError> {
        let url = self.endpoint("studies");
        let page_size = params.page_size.to_string();
        debug!(term = %params.term, page_size = params.page_size, "searching studies");

        let req = self.client.get(&url).query(&[
            ("format", "json"),
            ("query.term", params.term.as_str()),
            ("pageSize", page_size.as_str()),
        ]);
        self.get_json(req, SEARCH_TIMEOUT).await
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CtGovVersion {
    pub api_version: Option<String>,
    pub data_timestamp: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CtGovSearchResponse {
    #[serde(default)]
    pub studies: Vec<CtGovStudy>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CtGovStudy {
    pub protocol_section: Option<CtGovProtocolSection>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CtGovProtocolSection {
    pub identification_module: Option<CtGovIdentificationModule>,
    pub status_module: Option<CtGovStatusModule>,
    pub description_module: Option<CtGovDescriptionModule>,
    pub conditions_module: Option<CtGovConditionsModule>,
    pub design_module: Option<CtGovDesignModule>,
    pub eligibility_module: Option<CtGovEligibilityModule>,
    pub contacts_locations_module: Option<CtGovContactsLocationsModule>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CtGovIdentificationModule {
    pub nct_id: Option<String>,
    pub brief_title: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CtGovStatusModule {
    pub overall_status: Option<String>,
    pub start_date_struct: Option<serde_json::Value>,
    pub completion_date_struct: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CtGovDescriptionModule {
    pub brief_summary: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CtGovConditionsModule {
    pub conditions: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CtGovDesignModule {
    pub phases: Option<serde_json::Value>,
    pub study_type: Option<String>,
    pub design_info: Option<CtGovDesignInfo>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CtGovDesignInfo {
    pub primary_purpose: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CtGovEligibilityModule {
    pub eligibility_criteria: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CtGovContactsLocationsModule {
    pub locations: Option<Vec<CtGovLocation>>,
}

/// One study site. Only `state` and `country` are interpreted; everything else
/// (facility, city, contacts, geo point, ...) rides along untouched.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct CtGovLocation {
    pub state: Option<String>,
    pub country: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn search_builds_expected_params() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/studies"))
            .and(query_param("format", "json"))
            .and(query_param("query.term", "breast cancer California"))
            .and(query_param("pageSize", "24"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "studies": [
                    {
                        "protocolSection": {
                            "identificationModule": { "nctId": "NCT00000001" }
                        }
                    }
                ],
                "nextPageToken": "abc"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = ClinicalTrialsClient::with_base(server.uri()).unwrap();
        let resp = client
            .search(&CtGovSearchParams {
                term: "breast cancer California".into(),
                page_size: 24,
            })
            .await
            .unwrap();
        assert_eq!(resp.studies.len(), 1);
        assert_eq!(resp.next_page_token.as_deref(), Some("abc"));
    }

    #[tokio::test]
    async fn search_treats_missing_studies_key_as_empty() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/studies"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let client = ClinicalTrialsClient::with_base(server.uri()).unwrap();
        let resp = client
            .search(&CtGovSearchParams {
                term: "melanoma".into(),
                page_size: 4,
            })
            .await
            .unwrap();
        assert!(resp.studies.is_empty());
    }

    #[tokio::test]
    async fn search_surfaces_non_success_status_with_body_excerpt() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/studies"))
            .respond_with(ResponseTemplate::new(400).set_body_string("invalid pageSize"))
            .expect(1)
            .mount(&server)
            .await;

        let client = ClinicalTrialsClient::with_base(server.uri()).unwrap();
        let err = client
            .search(&CtGovSearchParams {
                term: "melanoma".into(),
                page_size: 4,
            })
            .await
            .expect_err("400 must fail");
        let msg = err.to_string();
        assert!(msg.contains("HTTP 400"), "unexpected error: {msg}");
        assert!(msg.contains("invalid pageSize"), "unexpected error: {msg}");
    }

    #[tokio::test]
    async fn search_rejects_malformed_json() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/studies"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let client = ClinicalTrialsClient::with_base(server.uri()).unwrap();
        let err = client
            .search(&CtGovSearchParams {
                term: "melanoma".into(),
                page_size: 4,
            })
            .await
            .expect_err("html body must fail");
        assert!(matches!(err, TrialScoutError::ApiJson { .. }));
    }

    #[tokio::test]
    async fn version_parses_api_version_and_timestamp() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/version"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "apiVersion": "2.0.3",
                "dataTimestamp": "2026-10-14T09:00:05"
            })))
            .mount(&server)
            .await;

        let client = ClinicalTrialsClient::with_base(server.uri()).unwrap();
        let version = client.version().await.unwrap();
        assert_eq!(version.api_version.as_deref(), Some("2.0.3"));
        assert_eq!(
            version.data_timestamp.as_deref(),
            Some("2026-10-14T09:00:05")
        );
    }

    #[test]
    fn location_keeps_unknown_fields() {
        let location: CtGovLocation = serde_json::from_value(serde_json::json!({
            "facility": "UCSF",
            "city": "San Francisco",
            "state": "California",
            "country": "United States",
            "geoPoint": { "lat": 37.77, "lon": -122.42 }
        }))
        .unwrap();
        assert_eq!(location.state.as_deref(), Some("California"));
        assert_eq!(location.country.as_deref(), Some("United States"));
        assert_eq!(location.extra["facility"], "UCSF");
        assert!(location.extra.contains_key("geoPoint"));
    }
}
