use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use support_intake::assignment::Staff;
use support_intake::classifier::LlmClassifier;
use support_intake::config::{IntakeConfig, RecorderConfig};
use support_intake::intake::{IntakeDeps, IntakeFlow, IntakeRouteState, intake_routes};
use support_intake::llm::create_provider;
use support_intake::notifier::SmtpNotifier;
use support_intake::recorder::sheets::ServiceAccountKey;
use support_intake::recorder::{LibSqlRecorder, Recorder, SheetsConfig, SheetsRecorder};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    let config = IntakeConfig::from_env().context("Failed to load configuration")?;

    // Initialize tracing; the guard flushes the file writer on exit
    let (file_layer, _log_guard) = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "support-intake.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .init();

    eprintln!("📨 Support Intake v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {} ({:?})", config.llm.model, config.llm.backend);

    // ── Staff ───────────────────────────────────────────────────────────
    let staff = Staff::load(&config.staff_file)
        .with_context(|| format!("Failed to load staff file {}", config.staff_file.display()))?;
    eprintln!(
        "   Departments: {}",
        staff.roster.department_names().join(", ")
    );

    // ── Classifier ──────────────────────────────────────────────────────
    let llm = create_provider(&config.llm)?;
    let departments = staff
        .roster
        .department_names()
        .into_iter()
        .map(String::from)
        .collect();
    let classifier = Arc::new(LlmClassifier::new(llm, departments));

    // ── Ticket log ──────────────────────────────────────────────────────
    let recorder: Arc<dyn Recorder> = match &config.recorder {
        RecorderConfig::Sheets {
            key_file,
            spreadsheet_id,
            sheet_name,
            api_base,
            timeout,
        } => {
            let key = ServiceAccountKey::load(key_file).with_context(|| {
                format!("Failed to read service account key {}", key_file.display())
            })?;
            eprintln!("   Log: Google Sheet {spreadsheet_id} ({sheet_name})");
            Arc::new(SheetsRecorder::new(SheetsConfig {
                key,
                spreadsheet_id: spreadsheet_id.clone(),
                sheet_name: sheet_name.clone(),
                api_base: api_base.clone(),
                timeout: *timeout,
            })?)
        }
        RecorderConfig::LibSql { path } => {
            eprintln!("   Log: libSQL {}", path.display());
            Arc::new(LibSqlRecorder::new_local(path).await?)
        }
    };

    // ── Flow ────────────────────────────────────────────────────────────
    eprintln!("   SMTP: {}:{}", config.smtp.host, config.smtp.port);
    let flow = IntakeFlow::start(IntakeDeps {
        classifier,
        recorder,
        notifier: Arc::new(SmtpNotifier::new(config.smtp.clone())),
        staff,
    })
    .await
    .context("Ticket log is not usable")?;

    let app = intake_routes(IntakeRouteState {
        flow: Arc::new(flow),
    });

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port))
        .await
        .with_context(|| format!("Failed to bind port {}", config.port))?;
    eprintln!("   Form: http://0.0.0.0:{}/\n", config.port);
    tracing::info!(port = config.port, "Support intake server started");

    axum::serve(listener, app).await?;
    Ok(())
}
