//! Static display metadata for every status value.
//!
//! Lookups by raw string never fail: unknown values resolve to the default entry of their kind.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::application::ApplicationStatus;
use super::document::DocumentStatus;
use super::machine::Lifecycle;
use crate::sync::SyncStatus;

/// Display language for labels and descriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    English,
    Spanish,
}

impl Language {
    pub fn from_code(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "en" | "en-jm" | "en-us" | "english" => Some(Self::English),
            "es" | "spanish" | "espanol" | "español" => Some(Self::Spanish),
            _ => None,
        }
    }

    pub const fn code(self) -> &'static str {
        match self {
            Self::English => "en",
            Self::Spanish => "es",
        }
    }

    const fn index(self) -> usize {
        match self {
            Self::English => 0,
            Self::Spanish => 1,
        }
    }
}

/// Icon, color class, and localized text for one status value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusDisplay {
    pub key: &'static str,
    pub icon: &'static str,
    pub color: &'static str,
    pub label: &'static str,
    pub description: &'static str,
}

struct Entry {
    icon: &'static str,
    color: &'static str,
    label: [&'static str; 2],
    description: [&'static str; 2],
}

impl Entry {
    fn resolve(&self, key: &'static str, language: Language) -> StatusDisplay {
        StatusDisplay {
            key,
            icon: self.icon,
            color: self.color,
            label: self.label[language.index()],
            description: self.description[language.index()],
        }
    }
}

/// Status values that carry display metadata.
pub trait StatusPresentation: Copy {
    fn display(self, language: Language) -> StatusDisplay;
}

impl StatusPresentation for ApplicationStatus {
    fn display(self, language: Language) -> StatusDisplay {
        let entry = match self {
            ApplicationStatus::Submitted => &Entry {
                icon: "file-text",
                color: "bg-blue-100 text-blue-800",
                label: ["Submitted", "Enviada"],
                description: [
                    "Your application has been received.",
                    "Su solicitud ha sido recibida.",
                ],
            },
            ApplicationStatus::PendingPayment => &Entry {
                icon: "credit-card",
                color: "bg-orange-100 text-orange-800",
                label: ["Pending Payment", "Pago pendiente"],
                description: [
                    "The application fee must be paid before review.",
                    "Debe pagar la tarifa antes de la revisión.",
                ],
            },
            ApplicationStatus::UnderReview => &Entry {
                icon: "eye",
                color: "bg-yellow-100 text-yellow-800",
                label: ["Under Review", "En revisión"],
                description: [
                    "An officer is reviewing your application.",
                    "Un oficial está revisando su solicitud.",
                ],
            },
            ApplicationStatus::Approved => &Entry {
                icon: "check-circle",
                color: "bg-green-100 text-green-800",
                label: ["Approved", "Aprobada"],
                description: [
                    "Your permit has been approved.",
                    "Su permiso ha sido aprobado.",
                ],
            },
            ApplicationStatus::Rejected => &Entry {
                icon: "x-circle",
                color: "bg-red-100 text-red-800",
                label: ["Rejected", "Rechazada"],
                description: [
                    "The application was not approved.",
                    "La solicitud no fue aprobada.",
                ],
            },
        };
        entry.resolve(self.key(), language)
    }
}

impl StatusPresentation for DocumentStatus {
    fn display(self, language: Language) -> StatusDisplay {
        let entry = match self {
            DocumentStatus::Pending => &Entry {
                icon: "clock",
                color: "bg-yellow-100 text-yellow-800",
                label: ["Pending", "Pendiente"],
                description: [
                    "Waiting to be processed.",
                    "En espera de procesamiento.",
                ],
            },
            DocumentStatus::Processing => &Entry {
                icon: "loader",
                color: "bg-blue-100 text-blue-800",
                label: ["Processing", "Procesando"],
                description: [
                    "Text extraction and checks are running.",
                    "Se está extrayendo el texto y verificando.",
                ],
            },
            DocumentStatus::Approved => &Entry {
                icon: "check-circle",
                color: "bg-green-100 text-green-800",
                label: ["Approved", "Aprobado"],
                description: [
                    "The document passed automated checks.",
                    "El documento pasó las verificaciones automáticas.",
                ],
            },
            DocumentStatus::Verified => &Entry {
                icon: "shield-check",
                color: "bg-emerald-100 text-emerald-800",
                label: ["Verified", "Verificado"],
                description: [
                    "Confirmed by a records officer.",
                    "Confirmado por un oficial de registros.",
                ],
            },
            DocumentStatus::Expired => &Entry {
                icon: "calendar-x",
                color: "bg-gray-100 text-gray-800",
                label: ["Expired", "Vencido"],
                description: [
                    "The document is no longer valid. Upload a current copy.",
                    "El documento ya no es válido. Suba una copia vigente.",
                ],
            },
            DocumentStatus::Rejected => &Entry {
                icon: "x-circle",
                color: "bg-red-100 text-red-800",
                label: ["Rejected", "Rechazado"],
                description: [
                    "The document could not be accepted.",
                    "El documento no pudo ser aceptado.",
                ],
            },
        };
        entry.resolve(self.key(), language)
    }
}

impl StatusPresentation for SyncStatus {
    fn display(self, language: Language) -> StatusDisplay {
        let entry = match self {
            SyncStatus::Synced => &Entry {
                icon: "cloud",
                color: "bg-green-100 text-green-800",
                label: ["Synced", "Sincronizado"],
                description: [
                    "All changes are saved.",
                    "Todos los cambios están guardados.",
                ],
            },
            SyncStatus::Syncing => &Entry {
                icon: "refresh-cw",
                color: "bg-blue-100 text-blue-800",
                label: ["Syncing", "Sincronizando"],
                description: [
                    "Uploading local changes.",
                    "Subiendo cambios locales.",
                ],
            },
            SyncStatus::Pending => &Entry {
                icon: "wifi-off",
                color: "bg-yellow-100 text-yellow-800",
                label: ["Pending", "Pendiente"],
                description: [
                    "Changes will sync when the connection returns.",
                    "Los cambios se sincronizarán al volver la conexión.",
                ],
            },
            SyncStatus::Error => &Entry {
                icon: "alert-triangle",
                color: "bg-red-100 text-red-800",
                label: ["Sync Error", "Error de sincronización"],
                description: [
                    "Sync failed. Retry to send pending changes.",
                    "La sincronización falló. Reintente para enviar los cambios.",
                ],
            },
        };
        entry.resolve(self.key(), language)
    }
}

/// Which status table a lookup targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    Application,
    Document,
    Sync,
}

impl StatusKind {
    pub fn default_display(self, language: Language) -> StatusDisplay {
        match self {
            Self::Application => ApplicationStatus::Submitted.display(language),
            Self::Document => DocumentStatus::Pending.display(language),
            Self::Sync => SyncStatus::Synced.display(language),
        }
    }
}

impl fmt::Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Application => "application",
            Self::Document => "document",
            Self::Sync => "sync",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown status kind '{0}'")]
pub struct UnknownStatusKind(pub String);

impl FromStr for StatusKind {
    type Err = UnknownStatusKind;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "application" | "applications" => Ok(Self::Application),
            "document" | "documents" => Ok(Self::Document),
            "sync" => Ok(Self::Sync),
            _ => Err(UnknownStatusKind(raw.to_string())),
        }
    }
}

/// Resolves a raw status string, falling back to the kind's default entry.
pub fn lookup(kind: StatusKind, raw: &str, language: Language) -> StatusDisplay {
    let resolved = match kind {
        StatusKind::Application => raw
            .parse::<ApplicationStatus>()
            .ok()
            .map(|status| status.display(language)),
        StatusKind::Document => raw
            .parse::<DocumentStatus>()
            .ok()
            .map(|status| status.display(language)),
        StatusKind::Sync => raw
            .parse::<SyncStatus>()
            .ok()
            .map(|status| status.display(language)),
    };

    resolved.unwrap_or_else(|| {
        debug!(%kind, raw, "unrecognized status; using default display entry");
        kind.default_display(language)
    })
}
