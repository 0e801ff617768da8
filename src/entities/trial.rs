use std::cmp::Reverse;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::TrialScoutError;
use crate::sources::clinicaltrials::{ClinicalTrialsClient, CtGovSearchParams};
use crate::transform;

/// The only overall status surfaced to patients. Everything else is dropped.
pub const RECRUITING_STATUS: &str = "RECRUITING";

/// Raw records fetched per requested trial, to survive the recruiting-only filter.
pub const OVERFETCH_MULTIPLIER: usize = 4;

pub const MIN_TRIAL_LIMIT: usize = 1;
pub const MAX_TRIAL_LIMIT: usize = 10;
pub const DEFAULT_TRIAL_LIMIT: usize = 6;

/// Flat per-trial record projected from one registry study.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrialBrief {
    pub nct_id: Option<String>,
    pub title: Option<String>,
    pub overall_status: Option<String>,
    #[serde(default)]
    pub conditions: Vec<String>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub eligibility: String,
    pub phase: Option<serde_json::Value>,
    pub study_type: Option<String>,
    pub primary_purpose: Option<String>,
    #[serde(default)]
    pub locations: Vec<TrialLocation>,
    #[serde(default)]
    pub start_date: serde_json::Value,
    #[serde(default)]
    pub completion_date: serde_json::Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrialLocation {
    pub state: Option<String>,
    pub country: Option<String>,
    #[serde(flatten)]
    pub other: serde_json::Map<String, serde_json::Value>,
}

impl TrialBrief {
    pub fn is_recruiting(&self) -> bool {
        self.overall_status
            .as_deref()
            .is_some_and(|status| status.trim().to_uppercase() == RECRUITING_STATUS)
    }

    /// True when any site's state or country contains `needle` (already lower-cased).
    fn has_location_match(&self, needle: &str) -> bool {
        self.locations.iter().any(|loc| {
            [loc.state.as_deref(), loc.country.as_deref()]
                .into_iter()
                .flatten()
                .any(|field| field.to_lowercase().contains(needle))
        })
    }
}

/// One patient request. `limit` is expected to be clamped by the caller.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub condition: String,
    pub location_hint: Option<String>,
    pub limit: usize,
    pub prefer_recruiting: bool,
}

impl SearchQuery {
    pub fn new(condition: impl Into<String>, location_hint: Option<String>, limit: usize) -> Self {
        Self {
            condition: condition.into(),
            location_hint: normalize_hint(location_hint.as_deref()),
            limit,
            prefer_recruiting: true,
        }
    }

    /// `query.term` sent to the registry: the condition, then the location hint if any.
    pub fn term(&self) -> String {
        match self.location_hint.as_deref() {
            Some(hint) => format!("{} {hint}", self.condition.trim()),
            None => self.condition.trim().to_string(),
        }
    }

    pub fn page_size(&self) -> usize {
        self.limit.saturating_mul(OVERFETCH_MULTIPLIER)
    }
}

fn normalize_hint(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Clamps a requested trial count into `MIN_TRIAL_LIMIT..=MAX_TRIAL_LIMIT`.
pub fn clamp_limit(requested: i64) -> usize {
    requested.clamp(MIN_TRIAL_LIMIT as i64, MAX_TRIAL_LIMIT as i64) as usize
}

/// Keeps recruiting trials, floats location matches to the front, and truncates.
///
/// The reorder is a stable sort on a boolean key, so trials within the matching
/// and non-matching groups keep the registry's order. An empty hint skips it.
pub fn filter_and_rank(
    briefs: Vec<TrialBrief>,
    location_hint: Option<&str>,
    limit: usize,
) -> Vec<TrialBrief> {
    let fetched = briefs.len();
    let mut recruiting = briefs
        .into_iter()
        .filter(TrialBrief::is_recruiting)
        .collect::<Vec<_>>();
    debug!(fetched, recruiting = recruiting.len(), "applied recruiting filter");

    if let Some(needle) = normalize_hint(location_hint).map(|hint| hint.to_lowercase()) {
        recruiting.sort_by_key(|brief| Reverse(brief.has_location_match(&needle)));
    }

    recruiting.truncate(limit);
    recruiting
}

/// Searches the registry once and returns at most `query.limit` recruiting briefs.
///
/// Fewer results than requested is a normal outcome; no follow-up page is fetched.
///
/// # Errors
///
/// Returns an error when the registry request fails or returns malformed JSON.
pub async fn search_patient_friendly(
    client: &ClinicalTrialsClient,
    query: &SearchQuery,
) -> Result<Vec<TrialBrief>, TrialScoutError> {
    if query.limit == 0 {
        return Ok(Vec::new());
    }

    let resp = client
        .search(&CtGovSearchParams {
            term: query.term(),
            page_size: query.page_size(),
        })
        .await?;

    let briefs = resp
        .studies
        .iter()
        .map(transform::trial::from_ctgov_study)
        .collect::<Vec<_>>();
    let ranked = filter_and_rank(briefs, query.location_hint.as_deref(), query.limit);
    info!(
        condition = %query.condition,
        requested = query.limit,
        returned = ranked.len(),
        prefer_recruiting = query.prefer_recruiting,
        "trial search complete"
    );
    Ok(ranked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn brief(nct_id: &str, status: &str, sites: &[(&str, &str)]) -> TrialBrief {
        TrialBrief {
            nct_id: Some(nct_id.to_string()),
            overall_status: Some(status.to_string()),
            locations: sites
                .iter()
                .map(|(state, country)| TrialLocation {
                    state: Some(state.to_string()),
                    country: Some(country.to_string()),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }
    }

    fn ids(briefs: &[TrialBrief]) -> Vec<&str> {
        briefs
            .iter()
            .map(|b| b.nct_id.as_deref().unwrap_or_default())
            .collect()
    }

    #[test]
    fn keeps_only_recruiting_regardless_of_case_and_whitespace() {
        let input = vec![
            brief("NCT1", "RECRUITING", &[]),
            brief("NCT2", "COMPLETED", &[]),
            brief("NCT3", "  recruiting ", &[]),
            brief("NCT4", "NOT_YET_RECRUITING", &[]),
            brief("NCT5", "ACTIVE_NOT_RECRUITING", &[]),
            TrialBrief {
                nct_id: Some("NCT6".into()),
                ..Default::default()
            },
        ];
        let out = filter_and_rank(input, None, 10);
        assert_eq!(ids(&out), vec!["NCT1", "NCT3"]);
    }

    #[test]
    fn location_match_floats_second_recruiting_study_first() {
        let input = vec![
            brief("NCT-A", "RECRUITING", &[("Texas", "United States")]),
            brief("NCT-B", "COMPLETED", &[("California", "United States")]),
            brief("NCT-C", "RECRUITING", &[("California", "United States")]),
        ];
        let out = filter_and_rank(input, Some("California"), 2);
        assert_eq!(ids(&out), vec!["NCT-C", "NCT-A"]);
    }

    #[test]
    fn location_reorder_is_stable_within_groups() {
        let input = vec![
            brief("NCT1", "RECRUITING", &[("Ontario", "Canada")]),
            brief("NCT2", "RECRUITING", &[("Oregon", "United States")]),
            brief("NCT3", "RECRUITING", &[("Bavaria", "Germany")]),
            brief("NCT4", "RECRUITING", &[("", "Canada")]),
            brief("NCT5", "RECRUITING", &[]),
        ];
        let out = filter_and_rank(input, Some("canada"), 10);
        assert_eq!(ids(&out), vec!["NCT1", "NCT4", "NCT2", "NCT3", "NCT5"]);
    }

    #[test]
    fn hint_matches_state_or_country_substring_case_insensitively() {
        let input = vec![
            brief("NCT1", "RECRUITING", &[("Bavaria", "Germany")]),
            brief("NCT2", "RECRUITING", &[("New South Wales", "AUSTRALIA")]),
        ];
        let out = filter_and_rank(input, Some("austral"), 10);
        assert_eq!(ids(&out), vec!["NCT2", "NCT1"]);
    }

    #[test]
    fn empty_or_blank_hint_keeps_registry_order() {
        let input = vec![
            brief("NCT1", "RECRUITING", &[("Texas", "United States")]),
            brief("NCT2", "RECRUITING", &[("California", "United States")]),
        ];
        assert_eq!(
            ids(&filter_and_rank(input.clone(), None, 10)),
            vec!["NCT1", "NCT2"]
        );
        assert_eq!(
            ids(&filter_and_rank(input, Some("   "), 10)),
            vec!["NCT1", "NCT2"]
        );
    }

    #[test]
    fn limit_bounds_output() {
        let input = (1..=5)
            .map(|i| brief(&format!("NCT{i}"), "RECRUITING", &[]))
            .chain([brief("NCT9", "WITHDRAWN", &[])])
            .collect::<Vec<_>>();

        for limit in 0..8 {
            let out = filter_and_rank(input.clone(), None, limit);
            assert_eq!(out.len(), limit.min(5), "limit={limit}");
        }
        assert!(filter_and_rank(input, Some("Texas"), 0).is_empty());
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert!(filter_and_rank(Vec::new(), Some("California"), 5).is_empty());
    }

    #[test]
    fn clamp_limit_bounds_requested_count() {
        assert_eq!(clamp_limit(-3), 1);
        assert_eq!(clamp_limit(0), 1);
        assert_eq!(clamp_limit(7), 7);
        assert_eq!(clamp_limit(25), 10);
    }

    #[test]
    fn query_term_appends_location_hint() {
        let query = SearchQuery::new("breast cancer", Some(" California ".into()), 3);
        assert_eq!(query.term(), "breast cancer California");
        assert_eq!(query.page_size(), 12);
        assert!(query.prefer_recruiting);

        let no_hint = SearchQuery::new("melanoma", Some("".into()), 3);
        assert_eq!(no_hint.term(), "melanoma");
        assert!(no_hint.location_hint.is_none());
    }

    #[tokio::test]
    async fn search_patient_friendly_overfetches_filters_and_ranks() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/studies"))
            .and(query_param("query.term", "lymphoma California"))
            .and(query_param("pageSize", "8"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "studies": [
                    {
                        "protocolSection": {
                            "identificationModule": { "nctId": "NCT00000001" },
                            "statusModule": { "overallStatus": "RECRUITING" },
                            "contactsLocationsModule": {
                                "locations": [{ "state": "Texas", "country": "United States" }]
                            }
                        }
                    },
                    {
                        "protocolSection": {
                            "identificationModule": { "nctId": "NCT00000002" },
                            "statusModule": { "overallStatus": "COMPLETED" },
                            "contactsLocationsModule": {
                                "locations": [{ "state": "California", "country": "United States" }]
                            }
                        }
                    },
                    {
                        "protocolSection": {
                            "identificationModule": { "nctId": "NCT00000003" },
                            "statusModule": { "overallStatus": "RECRUITING" },
                            "contactsLocationsModule": {
                                "locations": [{ "state": "California", "country": "United States" }]
                            }
                        }
                    },
                    {}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = ClinicalTrialsClient::with_base(server.uri()).unwrap();
        let query = SearchQuery::new("lymphoma", Some("California".into()), 2);
        let out = search_patient_friendly(&client, &query).await.unwrap();
        assert_eq!(ids(&out), vec!["NCT00000003", "NCT00000001"]);
    }

    #[tokio::test]
    async fn search_patient_friendly_returns_short_result_sets_silently() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/studies"))
            .and(query_param("pageSize", "40"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "studies": [
                    {
                        "protocolSection": {
                            "identificationModule": { "nctId": "NCT00000001" },
                            "statusModule": { "overallStatus": "Recruiting" }
                        }
                    }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = ClinicalTrialsClient::with_base(server.uri()).unwrap();
        let query = SearchQuery::new("asthma", None, 10);
        let out = search_patient_friendly(&client, &query).await.unwrap();
        assert_eq!(ids(&out), vec!["NCT00000001"]);
    }
}
