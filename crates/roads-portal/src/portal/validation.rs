use mime::Mime;

use super::domain::{ApplicationSubmission, DocumentUpload};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("applicant name is required")]
    MissingApplicant,
    #[error("work location is required")]
    MissingLocation,
    #[error("file name is required")]
    MissingFileName,
    #[error("'{name}' is empty")]
    EmptyFile { name: String },
    #[error("'{name}' is {size_bytes} bytes; the limit is {limit_bytes} bytes")]
    TooLarge {
        name: String,
        size_bytes: u64,
        limit_bytes: u64,
    },
    #[error("file type '{content_type}' is not accepted; upload a PDF, JPEG or PNG")]
    UnsupportedType { content_type: String },
}

/// Client-side upload rules: size cap and accepted media types.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    max_bytes: u64,
    accepted: Vec<Mime>,
}

impl UploadPolicy {
    pub fn new(max_bytes: u64) -> Self {
        Self {
            max_bytes,
            accepted: vec![mime::APPLICATION_PDF, mime::IMAGE_JPEG, mime::IMAGE_PNG],
        }
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Checks an upload and returns its resolved media type.
    ///
    /// A declared content type wins; otherwise the type is guessed from the file extension.
    pub fn validate(&self, upload: &DocumentUpload) -> Result<Mime, ValidationError> {
        let name = upload.name.trim();
        if name.is_empty() {
            return Err(ValidationError::MissingFileName);
        }
        if upload.size_bytes == 0 {
            return Err(ValidationError::EmptyFile {
                name: name.to_string(),
            });
        }
        if upload.size_bytes > self.max_bytes {
            return Err(ValidationError::TooLarge {
                name: name.to_string(),
                size_bytes: upload.size_bytes,
                limit_bytes: self.max_bytes,
            });
        }

        let resolved = match upload.content_type.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => raw.parse::<Mime>().ok(),
            _ => mime_guess::from_path(name).first(),
        };

        match resolved {
            Some(mime)
                if self
                    .accepted
                    .iter()
                    .any(|accepted| accepted.essence_str() == mime.essence_str()) =>
            {
                Ok(mime)
            }
            Some(mime) => Err(ValidationError::UnsupportedType {
                content_type: mime.essence_str().to_string(),
            }),
            None => Err(ValidationError::UnsupportedType {
                content_type: upload
                    .content_type
                    .clone()
                    .unwrap_or_else(|| "unknown".to_string()),
            }),
        }
    }
}

pub fn validate_submission(submission: &ApplicationSubmission) -> Result<(), ValidationError> {
    if submission.applicant.trim().is_empty() {
        return Err(ValidationError::MissingApplicant);
    }
    if submission.location.trim().is_empty() {
        return Err(ValidationError::MissingLocation);
    }
    Ok(())
}
