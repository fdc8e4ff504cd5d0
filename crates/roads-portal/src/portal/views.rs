use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use super::domain::{
    Application, ApplicationId, ApplicationKind, Document, DocumentCategory, DocumentId, Fee,
    ReferenceNumber,
};
use crate::status::{
    ApplicationStatus, DocumentStatus, Language, StatusDisplay, StatusPresentation,
};
use crate::sync::{SyncState, SyncStatus};

/// Serialized summary of an application for status queries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplicationView {
    pub id: ApplicationId,
    pub reference_number: ReferenceNumber,
    pub kind: ApplicationKind,
    pub kind_label: &'static str,
    pub applicant: String,
    pub location: String,
    pub submitted_on: NaiveDate,
    pub assigned_officer: Option<String>,
    pub fee: Fee,
    pub status: ApplicationStatus,
    pub progress: Option<u8>,
    pub display: StatusDisplay,
    pub document_ids: Vec<DocumentId>,
}

impl ApplicationView {
    pub fn new(application: &Application, language: Language) -> Self {
        let status = application.status.status();
        Self {
            id: application.id.clone(),
            reference_number: application.reference_number.clone(),
            kind: application.kind,
            kind_label: application.kind.label(),
            applicant: application.applicant.clone(),
            location: application.location.clone(),
            submitted_on: application.submitted_on,
            assigned_officer: application.assigned_officer.clone(),
            fee: application.fee,
            status,
            progress: application.status.progress().map(|p| p.value()),
            display: status.display(language),
            document_ids: application.document_ids.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentView {
    pub id: DocumentId,
    pub application_id: Option<ApplicationId>,
    pub name: String,
    pub size_bytes: u64,
    pub content_type: String,
    pub category: DocumentCategory,
    pub category_label: &'static str,
    pub uploaded_at: DateTime<Utc>,
    pub status: DocumentStatus,
    pub progress: Option<u8>,
    pub ocr_confidence: Option<u8>,
    pub extracted_text: Option<String>,
    pub needs_review: bool,
    pub display: StatusDisplay,
}

impl DocumentView {
    pub fn new(document: &Document, language: Language) -> Self {
        let status = document.status.status();
        Self {
            id: document.id.clone(),
            application_id: document.application_id.clone(),
            name: document.name.clone(),
            size_bytes: document.size_bytes,
            content_type: document.content_type.clone(),
            category: document.category,
            category_label: document.category.label(),
            uploaded_at: document.uploaded_at,
            status,
            progress: document.status.progress().map(|p| p.value()),
            ocr_confidence: document.ocr_confidence(),
            extracted_text: document
                .ocr
                .as_ref()
                .map(|result| result.extracted_text.clone()),
            needs_review: document.ocr.as_ref().is_some_and(|result| result.needs_review()),
            display: status.display(language),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncView {
    pub status: SyncStatus,
    pub online: bool,
    pub pending_changes: u32,
    pub failed_attempts: u32,
    pub last_sync_time: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub can_retry: bool,
    pub display: StatusDisplay,
}

impl SyncView {
    pub fn new(state: &SyncState, language: Language) -> Self {
        let status = state.status();
        Self {
            status,
            online: state.is_online(),
            pending_changes: state.pending_changes(),
            failed_attempts: state.failed_attempts(),
            last_sync_time: state.last_sync_time(),
            last_error: state.last_error().map(str::to_string),
            can_retry: status == SyncStatus::Error,
            display: status.display(language),
        }
    }
}
