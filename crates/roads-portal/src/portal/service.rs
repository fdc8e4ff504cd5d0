use std::cmp::Reverse;
use std::sync::Mutex;

use chrono::{NaiveDate, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use super::domain::{
    Application, ApplicationId, ApplicationSubmission, Document, DocumentId, DocumentUpload,
    IdSequence,
};
use super::seed::{mock_portal, MockPortalData};
use super::validation::{validate_submission, UploadPolicy, ValidationError};
use crate::config::PortalConfig;
use crate::progress::{EntityTracker, TrackerError};
use crate::status::{
    lookup, ApplicationStatus, DocumentStatus, Language, StatusDisplay, StatusKind,
    StatusMachine, TransitionError,
};
use crate::sync::{RemoteSink, SimulatedRemote, SyncError, SyncReconciler, SyncState};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortalError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("application '{0}' not found")]
    ApplicationNotFound(ApplicationId),
    #[error("document '{0}' not found")]
    DocumentNotFound(DocumentId),
    #[error("'{0}' already exists")]
    Conflict(String),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Sync(SyncError),
    #[error("portal has been disposed")]
    Disposed,
}

impl From<SyncError> for PortalError {
    fn from(error: SyncError) -> Self {
        match error {
            SyncError::Disposed => Self::Disposed,
            other => Self::Sync(other),
        }
    }
}

impl PortalError {
    fn from_tracker(error: TrackerError, not_found: impl FnOnce() -> PortalError) -> Self {
        match error {
            TrackerError::NotFound(_) => not_found(),
            TrackerError::Conflict(id) => Self::Conflict(id),
            TrackerError::Disposed => Self::Disposed,
            TrackerError::Transition(error) => Self::Transition(error),
        }
    }
}

/// Service composing the application and document trackers with the sync reconciler.
///
/// Every mutation made through the service counts as one pending change for sync. Progress made
/// by timers does not.
pub struct PortalService<R: RemoteSink = SimulatedRemote> {
    ids: IdSequence,
    applications: EntityTracker<Application>,
    documents: EntityTracker<Document>,
    sync: SyncReconciler<R>,
    uploads: UploadPolicy,
    language: Language,
    rng: Mutex<StdRng>,
}

impl PortalService<SimulatedRemote> {
    /// Builds a portal backed by the simulated remote, seeded from `config.seed` when present.
    pub fn from_config(config: &PortalConfig) -> Self {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let remote =
            SimulatedRemote::new(config.sync.failure_rate, StdRng::seed_from_u64(rng.gen()));
        Self::new(config, remote, rng)
    }
}

impl<R: RemoteSink> PortalService<R> {
    pub fn new(config: &PortalConfig, remote: R, mut rng: StdRng) -> Self {
        let applications = EntityTracker::new(config.progress, StdRng::seed_from_u64(rng.gen()));
        let documents = EntityTracker::new(config.progress, StdRng::seed_from_u64(rng.gen()));
        Self {
            ids: IdSequence::default(),
            applications,
            documents,
            sync: SyncReconciler::new(remote, config.sync),
            uploads: UploadPolicy::new(config.upload_max_bytes),
            language: config.language,
            rng: Mutex::new(rng),
        }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn upload_policy(&self) -> &UploadPolicy {
        &self.uploads
    }

    /// Loads mock applications and documents. Seeding is not a user change and is not synced.
    pub fn seed(&self, today: NaiveDate) -> Result<MockPortalData, PortalError> {
        let data = {
            let mut rng = self.rng.lock().expect("portal rng mutex poisoned");
            mock_portal(&self.ids, &mut rng, today)
        };

        for application in &data.applications {
            self.applications
                .insert(application.clone())
                .map_err(|error| application_error(error, &application.id))?;
        }
        for document in &data.documents {
            self.documents
                .insert(document.clone())
                .map_err(|error| document_error(error, &document.id))?;
        }

        info!(
            applications = data.applications.len(),
            documents = data.documents.len(),
            "mock portal data seeded"
        );
        Ok(data)
    }

    pub fn submit_application(
        &self,
        submission: ApplicationSubmission,
    ) -> Result<Application, PortalError> {
        validate_submission(&submission)?;
        let submitted_on = Utc::now().date_naive();
        let application = Application {
            id: self.ids.next_application(),
            reference_number: self.ids.next_reference(submitted_on),
            kind: submission.kind,
            applicant: submission.applicant.trim().to_string(),
            location: submission.location.trim().to_string(),
            submitted_on,
            assigned_officer: None,
            fee: submission.fee.unwrap_or_else(|| submission.kind.base_fee()),
            document_ids: Vec::new(),
            status: StatusMachine::new(),
        };

        let id = application.id.clone();
        let application = self
            .applications
            .insert(application)
            .map_err(|error| application_error(error, &id))?;
        info!(
            id = %application.id,
            reference = %application.reference_number,
            kind = application.kind.label(),
            "application submitted"
        );
        self.note_change()?;
        Ok(application)
    }

    pub fn get_application(&self, id: &ApplicationId) -> Result<Application, PortalError> {
        self.applications
            .get(id)
            .map_err(|error| application_error(error, id))
    }

    /// Applications, newest submission first.
    pub fn list_applications(&self, status: Option<ApplicationStatus>) -> Vec<Application> {
        let mut applications: Vec<Application> = self
            .applications
            .list()
            .into_iter()
            .filter(|application| {
                status.map_or(true, |wanted| application.status.status() == wanted)
            })
            .collect();
        applications.sort_by_key(|application| {
            (Reverse(application.submitted_on), Reverse(application.id.0.clone()))
        });
        applications
    }

    pub fn transition_application(
        &self,
        id: &ApplicationId,
        status: ApplicationStatus,
    ) -> Result<Application, PortalError> {
        let application = self
            .applications
            .set_status(id, status)
            .map_err(|error| application_error(error, id))?;
        self.note_change()?;
        Ok(application)
    }

    /// Moves an application into review; its progress then advances on the timer.
    pub fn begin_review(&self, id: &ApplicationId) -> Result<Application, PortalError> {
        self.transition_application(id, ApplicationStatus::UnderReview)
    }

    pub fn reject_application(&self, id: &ApplicationId) -> Result<Application, PortalError> {
        self.transition_application(id, ApplicationStatus::Rejected)
    }

    pub fn upload_document(&self, upload: DocumentUpload) -> Result<Document, PortalError> {
        let mime = self.uploads.validate(&upload)?;
        if let Some(application_id) = &upload.application_id {
            self.get_application(application_id)?;
        }

        let document = Document {
            id: self.ids.next_document(),
            application_id: upload.application_id.clone(),
            name: upload.name.trim().to_string(),
            size_bytes: upload.size_bytes,
            content_type: mime.essence_str().to_string(),
            category: upload.category,
            uploaded_at: Utc::now(),
            ocr: None,
            status: StatusMachine::new(),
        };
        let id = document.id.clone();
        let document = self
            .documents
            .insert(document)
            .map_err(|error| document_error(error, &id))?;

        if let Some(application_id) = &document.application_id {
            let document_id = document.id.clone();
            self.applications
                .update(application_id, move |application| {
                    application.document_ids.push(document_id)
                })
                .map_err(|error| application_error(error, application_id))?;
        }

        info!(
            id = %document.id,
            name = %document.name,
            content_type = %document.content_type,
            "document uploaded"
        );
        self.note_change()?;
        Ok(document)
    }

    /// Starts processing a pending document at 0%.
    pub fn process_document(&self, id: &DocumentId) -> Result<Document, PortalError> {
        self.transition_document(id, DocumentStatus::Processing)
    }

    pub fn transition_document(
        &self,
        id: &DocumentId,
        status: DocumentStatus,
    ) -> Result<Document, PortalError> {
        let document = self
            .documents
            .set_status(id, status)
            .map_err(|error| document_error(error, id))?;
        self.note_change()?;
        Ok(document)
    }

    pub fn get_document(&self, id: &DocumentId) -> Result<Document, PortalError> {
        self.documents
            .get(id)
            .map_err(|error| document_error(error, id))
    }

    /// Documents, most recent upload first, optionally limited to one application.
    pub fn list_documents(&self, application: Option<&ApplicationId>) -> Vec<Document> {
        let mut documents: Vec<Document> = self
            .documents
            .list()
            .into_iter()
            .filter(|document| {
                application.map_or(true, |wanted| {
                    document.application_id.as_ref() == Some(wanted)
                })
            })
            .collect();
        documents.sort_by_key(|document| {
            (Reverse(document.uploaded_at), Reverse(document.id.0.clone()))
        });
        documents
    }

    pub fn sync_status(&self) -> SyncState {
        self.sync.snapshot()
    }

    pub fn set_connectivity(&self, online: bool) -> Result<SyncState, PortalError> {
        Ok(self.sync.set_online(online)?)
    }

    /// Records a change made outside the portal service, e.g. a field note captured offline.
    pub fn record_change(&self) -> Result<SyncState, PortalError> {
        Ok(self.sync.record_change()?)
    }

    pub fn retry_sync(&self) -> Result<SyncState, PortalError> {
        Ok(self.sync.retry()?)
    }

    pub fn status_display(&self, kind: StatusKind, raw: &str) -> StatusDisplay {
        lookup(kind, raw, self.language)
    }

    /// Progress timers plus the sync task, if running.
    pub fn active_timers(&self) -> usize {
        self.applications.active_timers()
            + self.documents.active_timers()
            + usize::from(self.sync.has_active_task())
    }

    pub fn is_disposed(&self) -> bool {
        self.sync.is_disposed()
    }

    /// Cancels every timer. Records stay readable; mutations fail with [`PortalError::Disposed`].
    pub fn dispose(&self) {
        self.applications.dispose();
        self.documents.dispose();
        self.sync.dispose();
        debug!("portal disposed");
    }

    fn note_change(&self) -> Result<(), PortalError> {
        self.sync.record_change()?;
        Ok(())
    }
}

fn application_error(error: TrackerError, id: &ApplicationId) -> PortalError {
    PortalError::from_tracker(error, || PortalError::ApplicationNotFound(id.clone()))
}

fn document_error(error: TrackerError, id: &DocumentId) -> PortalError {
    PortalError::from_tracker(error, || PortalError::DocumentNotFound(id.clone()))
}
