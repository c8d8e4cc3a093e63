use crate::config::Config;
use crate::seace::SeaceRunner;
use crate::seace::chrome::ChromeLauncher;
use crate::seace::layout::SeaceLayout;
use crate::state::AppState;
use crate::web::create_router;
use anyhow::Context;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

/// Main application struct containing all necessary components
pub struct App {
    config: Config,
    app_state: AppState,
}

impl App {
    pub fn new(config: Config) -> Self {
        let settings = config.run_settings();
        let launcher = Arc::new(ChromeLauncher::new(config.chrome_options()));
        let runner = SeaceRunner::new(launcher, SeaceLayout::default(), settings);
        let app_state = AppState::new(runner, config.auth_token());

        info!(
            target_url = config.seace_url.as_str(),
            debug_dir = %config.debug_dir.display(),
            headless = config.headless,
            auth = app_state.auth_token.is_some(),
            max_pages = config.max_pages,
            "runner configured"
        );

        App { config, app_state }
    }

    /// Serve until a shutdown signal arrives. In-flight runs finish before
    /// the process exits.
    pub async fn run(self) -> ExitCode {
        match self.serve().await {
            Ok(()) => {
                info!("server stopped");
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!(error = ?e, "server failed");
                ExitCode::FAILURE
            }
        }
    }

    async fn serve(self) -> anyhow::Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.port));
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind {addr}"))?;
        info!(%addr, "listening");

        let router = create_router(self.app_state, self.config.request_timeout);
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("server error")
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received ctrl-c, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
