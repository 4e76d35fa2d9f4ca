//! Candidate Extractor — turns the upstream response tree into bando records.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ranking::xml::XmlElement;

/// Placeholder used when a bando entry carries no name.
pub const NAME_NOT_AVAILABLE: &str = "N/A";

const NAME_FIELD: &str = "nomebando";

/// Which sheet link the upstream response is read from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceField {
    /// `schedasintetica` — the brief sheet.
    #[default]
    Brief,
    /// `schedacompleta` — the full sheet.
    Full,
}

impl ReferenceField {
    pub fn tag(self) -> &'static str {
        match self {
            ReferenceField::Brief => "schedasintetica",
            ReferenceField::Full => "schedacompleta",
        }
    }
}

impl fmt::Display for ReferenceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for ReferenceField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "schedasintetica" | "brief" => Ok(ReferenceField::Brief),
            "schedacompleta" | "full" => Ok(ReferenceField::Full),
            other => Err(format!(
                "unknown reference field '{other}' (expected schedasintetica or schedacompleta)"
            )),
        }
    }
}

/// One funding opportunity found in the upstream response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateRecord {
    pub name: String,
    /// Link to the bando sheet. May be empty or point at a non-PDF resource.
    pub document_reference: String,
}

impl CandidateRecord {
    pub fn new(name: impl Into<String>, document_reference: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            document_reference: document_reference.into(),
        }
    }

    /// Only references ending in a literal ".pdf" are downloaded.
    pub fn has_pdf_reference(&self) -> bool {
        self.document_reference.ends_with(".pdf")
    }
}

/// Visits every `container_tag` element in document order and reads the
/// name and sheet link from each.
pub fn extract_candidates(
    root: &XmlElement,
    container_tag: &str,
    reference_field: ReferenceField,
) -> Vec<CandidateRecord> {
    root.descendants(container_tag)
        .into_iter()
        .map(|node| {
            let name = node
                .first_descendant_text(NAME_FIELD)
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| NAME_NOT_AVAILABLE.to_string());
            let document_reference = node
                .first_descendant_text(reference_field.tag())
                .unwrap_or_default();
            CandidateRecord::new(name, document_reference)
        })
        .collect()
}
