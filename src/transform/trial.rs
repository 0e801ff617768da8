use crate::entities::trial::{TrialBrief, TrialLocation};
use crate::sources::clinicaltrials::{CtGovLocation, CtGovStudy};

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

fn to_location(loc: &CtGovLocation) -> TrialLocation {
    TrialLocation {
        state: loc.state.clone(),
        country: loc.country.clone(),
        other: loc.extra.clone(),
    }
}

/// Projects a registry study onto a [`TrialBrief`]. Never fails: any missing
/// module or field becomes an empty string, empty list, `None`, or `{}`.
pub fn from_ctgov_study(study: &CtGovStudy) -> TrialBrief {
    let section = study.protocol_section.as_ref();
    let ident = section.and_then(|p| p.identification_module.as_ref());
    let status = section.and_then(|p| p.status_module.as_ref());
    let design = section.and_then(|p| p.design_module.as_ref());

    TrialBrief {
        nct_id: ident.and_then(|m| m.nct_id.clone()),
        title: ident.and_then(|m| m.brief_title.clone()),
        overall_status: status.and_then(|m| m.overall_status.clone()),
        conditions: section
            .and_then(|p| p.conditions_module.as_ref())
            .and_then(|m| m.conditions.clone())
            .unwrap_or_default(),
        summary: section
            .and_then(|p| p.description_module.as_ref())
            .and_then(|m| m.brief_summary.clone())
            .unwrap_or_default(),
        eligibility: section
            .and_then(|p| p.eligibility_module.as_ref())
            .and_then(|m| m.eligibility_criteria.clone())
            .unwrap_or_default(),
        phase: design.and_then(|m| m.phases.clone()),
        study_type: design.and_then(|m| m.study_type.clone()),
        primary_purpose: design
            .and_then(|m| m.design_info.as_ref())
            .and_then(|info| info.primary_purpose.clone()),
        locations: section
            .and_then(|p| p.contacts_locations_module.as_ref())
            .and_then(|m| m.locations.as_ref())
            .map(|locs| locs.iter().map(to_location).collect())
            .unwrap_or_default(),
        start_date: status
            .and_then(|m| m.start_date_struct.clone())
            .unwrap_or_else(empty_object),
        completion_date: status
            .and_then(|m| m.completion_date_struct.clone())
            .unwrap_or_else(empty_object),
    }
}
