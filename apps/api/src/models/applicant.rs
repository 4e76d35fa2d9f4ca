use serde::{Deserialize, Serialize};

/// The submitting business, as seen by the ranking pipeline.
///
/// Only `particularities` and `improvement_goals` drive relevance; the
/// identification fields are carried through to the upstream XML and the
/// webhook untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplicantProfile {
    pub company_name: String,
    pub vat_number: String,
    pub legal_form: String,
    pub business_type: String,
    pub size: String,
    pub sector_code: String,
    pub province: String,
    pub email: String,
    pub particularities: String,
    pub improvement_goals: String,
}

impl ApplicantProfile {
    /// Free text used as the applicant side of every relevance comparison.
    pub fn combined_text(&self) -> String {
        let particularities = self.particularities.trim();
        let goals = self.improvement_goals.trim();
        match (particularities.is_empty(), goals.is_empty()) {
            (true, true) => String::new(),
            (false, true) => particularities.to_string(),
            (true, false) => goals.to_string(),
            (false, false) => format!("{particularities} {goals}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(particularities: &str, goals: &str) -> ApplicantProfile {
        ApplicantProfile {
            particularities: particularities.to_string(),
            improvement_goals: goals.to_string(),
            ..ApplicantProfile::default()
        }
    }

    #[test]
    fn test_combined_text_joins_with_space() {
        assert_eq!(
            profile("Artigiani del legno", "digitalizzare il magazzino").combined_text(),
            "Artigiani del legno digitalizzare il magazzino"
        );
    }

    #[test]
    fn test_combined_text_skips_blank_field() {
        assert_eq!(profile("  ", "export").combined_text(), "export");
        assert_eq!(profile("export", "").combined_text(), "export");
        assert!(profile("", " ").combined_text().is_empty());
    }
}
