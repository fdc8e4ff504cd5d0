//! Applications, documents and the portal service that ties them to progress timers and sync.

pub mod domain;
pub mod ocr;
pub mod router;
pub mod seed;
pub mod service;
pub mod validation;
pub mod views;

#[cfg(test)]
mod tests;

pub use domain::{
    Application, ApplicationId, ApplicationKind, ApplicationSubmission, Document,
    DocumentCategory, DocumentId, DocumentUpload, Fee, IdSequence, ReferenceNumber,
};
pub use ocr::{MockOcrEngine, OcrEngine, OcrResult};
pub use router::portal_router;
pub use seed::{mock_portal, MockPortalData};
pub use service::{PortalError, PortalService};
pub use validation::{UploadPolicy, ValidationError};
pub use views::{ApplicationView, DocumentView, SyncView};
