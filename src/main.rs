use clap::Parser;
use opensrv_mysql::{AsyncMysqlIntermediary, IntermediaryOptions};
use sqlstub::auth::stage2_from_password;
use sqlstub::backend::Backend;
use sqlstub::{Fixture, StatementHandler};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Fake MySQL server answering from canned results.
#[derive(Debug, Parser)]
#[command(name = "sqlstub", version)]
struct Args {
    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1:3306")]
    listen: SocketAddr,

    /// JSON fixture with detection rules and canned results.
    #[arg(long)]
    fixture: Option<PathBuf>,

    /// Require this password; any credentials are accepted when absent.
    #[arg(long)]
    password: Option<String>,

    /// Extra query detection pattern, checked after the fixture's own.
    #[arg(long = "query-pattern")]
    query_patterns: Vec<String>,

    /// Count reported for updates no fixture entry matches.
    #[arg(long)]
    default_update_count: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut fixture = match &args.fixture {
        Some(path) => Fixture::load(path)?,
        None => Fixture::default(),
    };
    fixture.query_detection.extend(args.query_patterns.iter().cloned());
    if let Some(count) = args.default_update_count {
        fixture.default_update_count = count;
    }
    let handler: Arc<dyn StatementHandler> = Arc::new(fixture.dispatcher()?);
    let password = args.password.as_deref().map(|p| stage2_from_password(p.as_bytes()));

    let listener = TcpListener::bind(args.listen).await?;
    let local_addr = listener.local_addr()?;
    let conn_id = Arc::new(AtomicU32::new(1));
    info!(rules = fixture.query_detection.len(), "fixture ready");
    eprintln!("sqlstub listening on {local_addr}");

    loop {
        let (stream, peer) = listener.accept().await?;
        let handler = Arc::clone(&handler);
        let id = conn_id.fetch_add(1, Ordering::Relaxed);
        tokio::spawn(async move {
            info!(%peer, conn = id, "client connected");
            let (r, w) = tokio::io::split(stream);
            let backend = Backend::new(handler, password, id);
            let opts = IntermediaryOptions {
                process_use_statement_on_query: false,
                reject_connection_on_dbname_absence: false,
            };
            if let Err(e) = AsyncMysqlIntermediary::run_with_options(backend, r, w, &opts).await {
                error!(conn = id, error = ?e, "connection error");
            }
        });
    }
}
