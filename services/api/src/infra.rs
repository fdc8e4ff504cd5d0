use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use roads_portal::config::PortalConfig;
use roads_portal::error::AppError;
use roads_portal::portal::PortalService;
use roads_portal::status::Language;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Builds the portal and loads its mock records for `today`.
pub(crate) fn seeded_portal(
    config: &PortalConfig,
    today: NaiveDate,
) -> Result<Arc<PortalService>, AppError> {
    let portal = PortalService::from_config(config);
    portal.seed(today)?;
    Ok(Arc::new(portal))
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn parse_language(raw: &str) -> Result<Language, String> {
    Language::from_code(raw).ok_or_else(|| format!("unsupported language '{raw}' (use en or es)"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_date_reports_bad_input() {
        assert_eq!(
            parse_date(" 2025-07-01 "),
            Ok(NaiveDate::from_ymd_opt(2025, 7, 1).expect("valid date"))
        );
        let err = parse_date("01/07/2025").expect_err("wrong format");
        assert!(err.contains("YYYY-MM-DD"));
    }

    #[test]
    fn parse_language_accepts_codes() {
        assert_eq!(parse_language("ES"), Ok(Language::Spanish));
        assert!(parse_language("fr").is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn seeded_portal_has_records() {
        let config = PortalConfig {
            seed: Some(5),
            ..PortalConfig::default()
        };
        let today = NaiveDate::from_ymd_opt(2025, 7, 1).expect("valid date");
        let portal = seeded_portal(&config, today).expect("seeded");
        assert!(!portal.list_applications(None).is_empty());
        assert!(!portal.list_documents(None).is_empty());
        portal.dispose();
    }
}
