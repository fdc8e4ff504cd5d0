use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use super::ocr::{MockOcrEngine, OcrEngine, OcrResult};
use crate::progress::{Progressable, Tracked};
use crate::status::{ApplicationStatus, DocumentStatus, StatusMachine};

/// Identifier wrapper for permit applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationId(pub String);

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier wrapper for uploaded documents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(pub String);

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Public reference quoted to citizens, `RP-<year>-<6 digits>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferenceNumber(pub String);

impl fmt::Display for ReferenceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whole Jamaican dollars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fee(pub u32);

impl fmt::Display for Fee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.0.to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (index, digit) in digits.chars().enumerate() {
            if index > 0 && (digits.len() - index) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(digit);
        }
        write!(f, "JMD ${grouped}")
    }
}

/// Permits and licenses issued through the portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationKind {
    RoadOpeningPermit,
    DrivewayAccessLicense,
    UtilityExcavationPermit,
    OversizeVehiclePermit,
    RoadClosurePermit,
}

impl ApplicationKind {
    pub const fn ordered() -> [Self; 5] {
        [
            Self::RoadOpeningPermit,
            Self::DrivewayAccessLicense,
            Self::UtilityExcavationPermit,
            Self::OversizeVehiclePermit,
            Self::RoadClosurePermit,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::RoadOpeningPermit => "Road Opening Permit",
            Self::DrivewayAccessLicense => "Driveway Access License",
            Self::UtilityExcavationPermit => "Utility Excavation Permit",
            Self::OversizeVehiclePermit => "Oversize Vehicle Permit",
            Self::RoadClosurePermit => "Road Closure Permit",
        }
    }

    pub const fn base_fee(self) -> Fee {
        match self {
            Self::RoadOpeningPermit => Fee(15_000),
            Self::DrivewayAccessLicense => Fee(8_500),
            Self::UtilityExcavationPermit => Fee(25_000),
            Self::OversizeVehiclePermit => Fee(12_000),
            Self::RoadClosurePermit => Fee(18_000),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentCategory {
    Identification,
    SitePlan,
    ProofOfOwnership,
    InsuranceCertificate,
    TrafficManagementPlan,
    Other,
}

impl DocumentCategory {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Identification => "Identification",
            Self::SitePlan => "Site Plan",
            Self::ProofOfOwnership => "Proof of Ownership",
            Self::InsuranceCertificate => "Insurance Certificate",
            Self::TrafficManagementPlan => "Traffic Management Plan",
            Self::Other => "Other",
        }
    }
}

/// A citizen's request for a permit or license.
#[derive(Debug, Clone, Serialize)]
pub struct Application {
    pub id: ApplicationId,
    pub reference_number: ReferenceNumber,
    pub kind: ApplicationKind,
    pub applicant: String,
    pub location: String,
    pub submitted_on: NaiveDate,
    pub assigned_officer: Option<String>,
    pub fee: Fee,
    pub document_ids: Vec<DocumentId>,
    pub status: StatusMachine<ApplicationStatus>,
}

impl Progressable for Application {
    type Status = ApplicationStatus;

    fn machine(&self) -> &StatusMachine<ApplicationStatus> {
        &self.status
    }

    fn machine_mut(&mut self) -> &mut StatusMachine<ApplicationStatus> {
        &mut self.status
    }
}

impl Tracked for Application {
    type Id = ApplicationId;

    fn id(&self) -> &ApplicationId {
        &self.id
    }
}

/// An uploaded file and its processing state.
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    pub id: DocumentId,
    pub application_id: Option<ApplicationId>,
    pub name: String,
    pub size_bytes: u64,
    pub content_type: String,
    pub category: DocumentCategory,
    pub uploaded_at: DateTime<Utc>,
    pub ocr: Option<OcrResult>,
    pub status: StatusMachine<DocumentStatus>,
}

impl Document {
    pub fn ocr_confidence(&self) -> Option<u8> {
        self.ocr.as_ref().map(|result| result.confidence)
    }
}

impl Progressable for Document {
    type Status = DocumentStatus;

    fn machine(&self) -> &StatusMachine<DocumentStatus> {
        &self.status
    }

    fn machine_mut(&mut self) -> &mut StatusMachine<DocumentStatus> {
        &mut self.status
    }

    fn on_completed(&mut self, rng: &mut StdRng) {
        let result = MockOcrEngine.recognize(self, rng);
        self.ocr = Some(result);
    }
}

impl Tracked for Document {
    type Id = DocumentId;

    fn id(&self) -> &DocumentId {
        &self.id
    }
}

/// Citizen-provided fields for a new application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationSubmission {
    pub kind: ApplicationKind,
    pub applicant: String,
    pub location: String,
    /// Overrides the kind's base fee, e.g. for waived or discounted applications.
    #[serde(default)]
    pub fee: Option<Fee>,
}

/// Metadata for an uploaded file. Content never reaches the portal core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentUpload {
    pub name: String,
    pub size_bytes: u64,
    #[serde(default)]
    pub content_type: Option<String>,
    pub category: DocumentCategory,
    #[serde(default)]
    pub application_id: Option<ApplicationId>,
}

/// Sequential identifiers for one portal instance.
#[derive(Debug, Default)]
pub struct IdSequence {
    applications: AtomicU64,
    documents: AtomicU64,
    references: AtomicU64,
}

impl IdSequence {
    pub fn next_application(&self) -> ApplicationId {
        let id = self.applications.fetch_add(1, Ordering::Relaxed) + 1;
        ApplicationId(format!("app-{id:06}"))
    }

    pub fn next_document(&self) -> DocumentId {
        let id = self.documents.fetch_add(1, Ordering::Relaxed) + 1;
        DocumentId(format!("doc-{id:06}"))
    }

    pub fn next_reference(&self, submitted_on: NaiveDate) -> ReferenceNumber {
        let id = self.references.fetch_add(1, Ordering::Relaxed) + 1;
        ReferenceNumber(format!("RP-{}-{id:06}", submitted_on.year()))
    }
}
