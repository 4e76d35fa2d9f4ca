//! Inbound submission and its upstream XML form.

use quick_xml::escape::escape;
use serde::Deserialize;

use crate::models::applicant::ApplicantProfile;

/// Body of `POST /api/process`. Field names follow the form that posts it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Submission {
    pub nome_azienda: Option<String>,
    pub piva: Option<String>,
    pub particolarita: Option<String>,
    pub aspetti_da_migliorare: Option<String>,
    pub forma_giuridica: Option<String>,
    pub tipologia_azienda: Option<String>,
    pub dimensioni: Option<String>,
    pub codice_ateco: Option<String>,
    pub provincia: Option<String>,
    pub email: Option<String>,
}

impl Submission {
    pub fn into_profile(self) -> ApplicantProfile {
        ApplicantProfile {
            company_name: self.nome_azienda.unwrap_or_default(),
            vat_number: self.piva.unwrap_or_default(),
            legal_form: self.forma_giuridica.unwrap_or_default(),
            business_type: self.tipologia_azienda.unwrap_or_default(),
            size: self.dimensioni.unwrap_or_default(),
            sector_code: self.codice_ateco.unwrap_or_default(),
            province: self.provincia.unwrap_or_default(),
            email: self.email.unwrap_or_default(),
            particularities: self.particolarita.unwrap_or_default(),
            improvement_goals: self.aspetti_da_migliorare.unwrap_or_default(),
        }
    }
}

/// Serialises the profile in the shape the matching service ingests.
pub fn profile_to_xml(profile: &ApplicantProfile) -> String {
    let fields = [
        ("PartitaIva", &profile.vat_number),
        ("CompanyName", &profile.company_name),
        ("FormaGiuridica", &profile.legal_form),
        ("Tipologia", &profile.business_type),
        ("DimensioniAzienda", &profile.size),
        ("CodiceIstatAteco", &profile.sector_code),
        ("Provincia", &profile.province),
        ("Particolarita", &profile.particularities),
        ("Email", &profile.email),
    ];

    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<Businesses>\n  <Business>\n");
    for (tag, value) in fields {
        xml.push_str(&format!("    <{tag}>{}</{tag}>\n", escape(value.as_str())));
    }
    xml.push_str("  </Business>\n</Businesses>");
    xml
}
