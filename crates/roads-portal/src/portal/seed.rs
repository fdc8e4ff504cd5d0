//! Mock records loaded when a portal starts.

use chrono::{Duration as DateSpan, NaiveDate, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;

use super::domain::{Application, ApplicationKind, Document, DocumentCategory, IdSequence};
use super::ocr::{MockOcrEngine, OcrEngine};
use crate::status::{ApplicationStatus, DocumentStatus, Lifecycle, StatusMachine};

const APPLICANTS: [&str; 6] = [
    "Marcia Brown",
    "Devon Campbell",
    "Andre Williams",
    "Shanice Reid",
    "Kemar Thompson",
    "Tanya Gordon",
];

const LOCATIONS: [&str; 6] = [
    "Hope Road, St. Andrew",
    "Spanish Town Road, St. Catherine",
    "Main Street, Ocho Rios, St. Ann",
    "Barnett Street, Montego Bay, St. James",
    "Manchester Road, Mandeville",
    "Port Antonio Square, Portland",
];

const OFFICERS: [&str; 3] = ["Officer N. Clarke", "Officer P. Henry", "Officer J. Morgan"];

/// Records ready to be inserted into a portal.
#[derive(Debug, Clone, Default)]
pub struct MockPortalData {
    pub applications: Vec<Application>,
    pub documents: Vec<Document>,
}

/// Builds one application per lifecycle state and a document per document state.
///
/// In-flight records come with partial progress so their timers pick up mid-way.
pub fn mock_portal(ids: &IdSequence, rng: &mut StdRng, today: NaiveDate) -> MockPortalData {
    let statuses = [
        (ApplicationStatus::Submitted, None),
        (ApplicationStatus::PendingPayment, None),
        (ApplicationStatus::UnderReview, Some(rng.gen_range(10..=60))),
        (ApplicationStatus::Approved, None),
        (ApplicationStatus::Rejected, None),
    ];

    let mut applications = Vec::with_capacity(statuses.len());
    for (index, (status, progress)) in statuses.into_iter().enumerate() {
        let kind = ApplicationKind::ordered()[index % ApplicationKind::ordered().len()];
        let submitted_on = today - DateSpan::days(i64::from(rng.gen_range(1..=30u8)));
        let assigned_officer = (status.rank() >= ApplicationStatus::UnderReview.rank())
            .then(|| OFFICERS.choose(rng).map(|officer| officer.to_string()))
            .flatten();

        applications.push(Application {
            id: ids.next_application(),
            reference_number: ids.next_reference(submitted_on),
            kind,
            applicant: APPLICANTS[index % APPLICANTS.len()].to_string(),
            location: LOCATIONS[index % LOCATIONS.len()].to_string(),
            submitted_on,
            assigned_officer,
            fee: kind.base_fee(),
            document_ids: Vec::new(),
            status: StatusMachine::seeded(status, progress),
        });
    }

    let specs = [
        (
            "national-id.jpg",
            "image/jpeg",
            DocumentCategory::Identification,
            DocumentStatus::Pending,
            None,
        ),
        (
            "site-plan.pdf",
            "application/pdf",
            DocumentCategory::SitePlan,
            DocumentStatus::Processing,
            Some(rng.gen_range(5..=50)),
        ),
        (
            "land-title.pdf",
            "application/pdf",
            DocumentCategory::ProofOfOwnership,
            DocumentStatus::Approved,
            None,
        ),
        (
            "liability-cover.pdf",
            "application/pdf",
            DocumentCategory::InsuranceCertificate,
            DocumentStatus::Verified,
            None,
        ),
        (
            "lane-closure.png",
            "image/png",
            DocumentCategory::TrafficManagementPlan,
            DocumentStatus::Expired,
            None,
        ),
    ];

    let mut documents = Vec::with_capacity(specs.len());
    for (index, (name, content_type, category, status, progress)) in
        specs.into_iter().enumerate()
    {
        let owner_index = index % applications.len();
        let owner = &mut applications[owner_index];
        let mut document = Document {
            id: ids.next_document(),
            application_id: Some(owner.id.clone()),
            name: name.to_string(),
            size_bytes: rng.gen_range(40_000..=2_500_000),
            content_type: content_type.to_string(),
            category,
            uploaded_at: Utc::now() - DateSpan::hours(i64::from(rng.gen_range(1..=240u16))),
            ocr: None,
            status: StatusMachine::seeded(status, progress),
        };
        if matches!(
            status,
            DocumentStatus::Approved | DocumentStatus::Verified | DocumentStatus::Expired
        ) {
            document.ocr = Some(MockOcrEngine.recognize(&document, rng));
        }
        owner.document_ids.push(document.id.clone());
        documents.push(document);
    }

    MockPortalData {
        applications,
        documents,
    }
}
