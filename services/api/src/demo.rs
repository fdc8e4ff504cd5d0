use crate::infra::parse_language;
use clap::Args;
use roads_portal::config::{AppConfig, PortalConfig};
use roads_portal::error::AppError;
use roads_portal::portal::{
    Application, ApplicationKind, ApplicationSubmission, Document, DocumentCategory,
    DocumentUpload, PortalService,
};
use roads_portal::status::{lookup, Language, Lifecycle, StatusKind, StatusPresentation};
use roads_portal::sync::{RemoteSink, SyncState, SyncStatus};
use std::time::Duration;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Seed for mock data and simulated randomness.
    #[arg(long)]
    pub(crate) seed: Option<u64>,
    /// Display language (en or es). Defaults to APP_LANGUAGE.
    #[arg(long, value_parser = parse_language)]
    pub(crate) language: Option<Language>,
    /// Progress timer tick in milliseconds. Defaults to PORTAL_TICK_MS.
    #[arg(long)]
    pub(crate) tick_ms: Option<u64>,
    /// Skip the offline/online sync cycle.
    #[arg(long)]
    pub(crate) skip_sync: bool,
}

#[derive(Args, Debug)]
pub(crate) struct StatusArgs {
    /// Status table: application, document or sync
    pub(crate) kind: StatusKind,
    /// Raw status value; unknown values resolve to the table's default entry
    pub(crate) value: String,
    /// Display language (en or es). Defaults to APP_LANGUAGE.
    #[arg(long, value_parser = parse_language)]
    pub(crate) language: Option<Language>,
}

pub(crate) fn run_status_lookup(args: StatusArgs) -> Result<(), AppError> {
    let language = match args.language {
        Some(language) => language,
        None => AppConfig::load()?.portal.language,
    };
    let display = lookup(args.kind, &args.value, language);
    match serde_json::to_string_pretty(&display) {
        Ok(json) => println!("{json}"),
        Err(err) => println!("Status display unavailable: {err}"),
    }
    Ok(())
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        seed,
        language,
        tick_ms,
        skip_sync,
    } = args;

    let mut config = AppConfig::load()?.portal;
    if seed.is_some() {
        config.seed = seed;
    }
    if let Some(language) = language {
        config.language = language;
    }
    if let Some(tick_ms) = tick_ms {
        config.progress.tick = Duration::from_millis(tick_ms.max(1));
    }

    println!("Roads Portal status demo");
    let portal = PortalService::from_config(&config);
    let summary = run_scenario(&portal, &config, !skip_sync).await;
    portal.dispose();
    let summary = summary?;

    println!(
        "\nFinished: document {} | application {} | timers still running: {}",
        label(&summary.document, config.language),
        summary
            .application
            .status
            .status()
            .display(config.language)
            .label,
        portal.active_timers()
    );
    Ok(())
}

#[derive(Debug)]
pub(crate) struct DemoSummary {
    pub(crate) document: Document,
    pub(crate) application: Application,
    pub(crate) sync: Option<SyncState>,
}

fn label(document: &Document, language: Language) -> &'static str {
    document.status.status().display(language).label
}

/// Polls every `interval` until `done` holds or `limit` polls have passed.
async fn wait_until<T>(
    interval: Duration,
    limit: u32,
    mut poll: impl FnMut() -> Result<T, AppError>,
    done: impl Fn(&T) -> bool,
) -> Result<T, AppError> {
    let mut current = poll()?;
    for _ in 0..limit {
        if done(&current) {
            break;
        }
        tokio::time::sleep(interval).await;
        current = poll()?;
    }
    Ok(current)
}

pub(crate) async fn run_scenario<R: RemoteSink>(
    portal: &PortalService<R>,
    config: &PortalConfig,
    include_sync: bool,
) -> Result<DemoSummary, AppError> {
    let language = config.language;
    let tick = config.progress.tick;
    let tick_budget = config.progress.max_ticks() + 2;

    println!("\nApplication intake");
    let application = portal.submit_application(ApplicationSubmission {
        kind: ApplicationKind::RoadOpeningPermit,
        applicant: "Marcia Brown".to_string(),
        location: "Old Hope Road, St. Andrew".to_string(),
        fee: None,
    })?;
    println!(
        "- {} {} for {} | fee {}",
        application.reference_number,
        application.kind.label(),
        application.applicant,
        application.fee
    );

    println!("\nDocument processing");
    let document = portal.upload_document(DocumentUpload {
        name: "site-plan.pdf".to_string(),
        size_bytes: 482_000,
        content_type: None,
        category: DocumentCategory::SitePlan,
        application_id: Some(application.id.clone()),
    })?;
    println!(
        "- uploaded {} ({}) -> {}",
        document.name,
        document.content_type,
        label(&document, language)
    );

    portal.process_document(&document.id)?;
    let mut last_progress = None;
    let document = wait_until(
        tick,
        tick_budget,
        || {
            let current = portal.get_document(&document.id)?;
            let progress = current.status.progress();
            if current.status.is_in_flight() && progress != last_progress {
                if let Some(progress) = progress {
                    println!("  {} {}", label(&current, language), progress);
                }
                last_progress = progress;
            }
            Ok(current)
        },
        |current: &Document| !current.status.is_in_flight(),
    )
    .await?;
    println!("- {} -> {}", document.name, label(&document, language));
    if let Some(ocr) = &document.ocr {
        println!(
            "  OCR {}% confidence{}: {}",
            ocr.confidence,
            if ocr.needs_review() { " (needs review)" } else { "" },
            ocr.extracted_text
        );
    }

    println!("\nApplication review");
    portal.begin_review(&application.id)?;
    let application = wait_until(
        tick,
        tick_budget,
        || Ok(portal.get_application(&application.id)?),
        |current: &Application| !current.status.is_in_flight(),
    )
    .await?;
    let status = application.status.status();
    println!(
        "- {} -> {} ({})",
        application.reference_number,
        status.display(language).label,
        status.key()
    );

    let sync = if include_sync {
        Some(run_sync_cycle(portal, config).await?)
    } else {
        None
    };

    Ok(DemoSummary {
        document,
        application,
        sync,
    })
}

async fn run_sync_cycle<R: RemoteSink>(
    portal: &PortalService<R>,
    config: &PortalConfig,
) -> Result<SyncState, AppError> {
    let language = config.language;
    let delay = config.sync.sync_delay;
    let print = |state: &SyncState| {
        println!(
            "- {} | online {} | {} pending change(s)",
            state.status().display(language).label,
            state.is_online(),
            state.pending_changes()
        );
    };

    println!("\nField sync");
    let settled = |state: &SyncState| state.status() != SyncStatus::Syncing;
    let state = wait_until(delay, 20, || Ok(portal.sync_status()), settled).await?;
    print(&state);

    portal.set_connectivity(false)?;
    portal.record_change()?;
    let state = portal.record_change()?;
    println!("Connection lost, capturing field notes offline");
    print(&state);

    portal.set_connectivity(true)?;
    println!("Connection restored");
    let mut state = wait_until(delay, 20, || Ok(portal.sync_status()), settled).await?;
    if state.status() == SyncStatus::Error {
        println!(
            "  sync failed: {}; retrying",
            state.last_error().unwrap_or("unknown error")
        );
        portal.retry_sync()?;
        state = wait_until(delay, 20, || Ok(portal.sync_status()), settled).await?;
    }
    print(&state);
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use roads_portal::status::{ApplicationStatus, DocumentStatus};
    use roads_portal::sync::SyncSettings;

    fn config() -> PortalConfig {
        PortalConfig {
            sync: SyncSettings {
                failure_rate: 0.0,
                ..SyncSettings::default()
            },
            seed: Some(42),
            ..PortalConfig::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn scenario_runs_every_record_to_completion() {
        let config = config();
        let portal = PortalService::from_config(&config);

        let summary = run_scenario(&portal, &config, true)
            .await
            .expect("scenario completes");

        assert_eq!(summary.document.status.status(), DocumentStatus::Approved);
        assert!(summary.document.ocr.is_some());
        assert_eq!(
            summary.application.status.status(),
            ApplicationStatus::Approved
        );
        assert_eq!(summary.application.document_ids, vec![summary.document.id]);
        let sync = summary.sync.expect("sync cycle ran");
        assert_eq!(sync.status(), SyncStatus::Synced);
        assert_eq!(sync.pending_changes(), 0);

        portal.dispose();
        assert_eq!(portal.active_timers(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn scenario_can_skip_the_sync_cycle() {
        let config = config();
        let portal = PortalService::from_config(&config);
        let summary = run_scenario(&portal, &config, false)
            .await
            .expect("scenario completes");
        assert!(summary.sync.is_none());
    }
}
