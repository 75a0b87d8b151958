//! Startup and shutdown of the workers and the listener

use crate::config::MotdConfig;
use crate::error::{Result, ServerError};
use crate::listener::TcpServer;
use crate::workers::{spawn_ingestion, spawn_retention, IngestionWorker, RetentionWorker};
use motd_cache::CacheStore;
use motd_providers::{GiphyClient, XkcdClient};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tracing::{error, info, warn};

/// A configured server that has not started yet
pub struct App {
    config: MotdConfig,
    cache: Arc<CacheStore>,
    ingestion: IngestionWorker,
}

impl App {
    /// Assemble an app from parts. The cache must already be initialised.
    pub fn new(config: MotdConfig, cache: Arc<CacheStore>, ingestion: IngestionWorker) -> Self {
        Self {
            config,
            cache,
            ingestion,
        }
    }

    /// Initialise the cache directory and build the providers `config` enables
    pub async fn from_config(config: MotdConfig) -> Result<Self> {
        let cache = Arc::new(CacheStore::new(config.cache_dir.clone()));
        cache.init().await?;

        let mut ingestion = IngestionWorker::new(cache.clone());
        if !config.giphy_tags.is_empty() {
            let giphy = GiphyClient::from_key_file(&config.giphy_api_key_file, config.max_file_size)?;
            ingestion = ingestion.with_tagged(Arc::new(giphy), config.giphy_tags.clone());
        }
        if config.xkcd_enabled {
            ingestion = ingestion.with_captioned(Arc::new(XkcdClient::new()));
        }
        if ingestion.is_idle() {
            warn!("No content providers configured, serving existing cache entries only");
        }

        Ok(Self::new(config, cache, ingestion))
    }

    /// Bind the listener, then start the workers and the accept loop.
    ///
    /// Nothing is spawned if binding fails.
    pub async fn start(self) -> Result<RunningApp> {
        let App {
            config,
            cache,
            ingestion,
        } = self;

        let server = TcpServer::bind(&config.listen_host, config.listen_port, cache.clone()).await?;
        let local_addr = server.local_addr()?;

        let (stop_workers, workers_rx) = watch::channel(false);
        let (stop_listener, listener_rx) = watch::channel(false);

        let retention = RetentionWorker::new(cache, config.cache_max_files);
        let workers = vec![
            spawn_ingestion(ingestion, config.download_interval, workers_rx.clone()),
            spawn_retention(retention, config.cleanup_interval, workers_rx),
        ];
        let listener = tokio::spawn(server.serve(listener_rx));

        info!(address = %local_addr, cache_dir = ?config.cache_dir, "motd server running");

        Ok(RunningApp {
            local_addr,
            stop_workers,
            stop_listener,
            workers,
            listener,
        })
    }
}

/// Handles to a started server
pub struct RunningApp {
    local_addr: SocketAddr,
    stop_workers: watch::Sender<bool>,
    stop_listener: watch::Sender<bool>,
    workers: Vec<JoinHandle<()>>,
    listener: JoinHandle<Result<()>>,
}

impl RunningApp {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serve until `signal` resolves or the listener fails, then shut down.
    pub async fn run_until<S>(mut self, signal: S) -> Result<()>
    where
        S: Future<Output = ()>,
    {
        let exited = tokio::select! {
            _ = signal => None,
            joined = &mut self.listener => Some(joined),
        };

        match exited {
            None => {
                info!("Shutdown requested");
                self.shutdown().await
            }
            Some(joined) => {
                self.halt_workers().await;
                let result = flatten(joined);
                if let Err(e) = &result {
                    error!(error = %e, "Listener failed");
                }
                result
            }
        }
    }

    /// Stop the workers and wait for them, then close the listener and wait
    /// for open connections to finish.
    pub async fn shutdown(mut self) -> Result<()> {
        self.halt_workers().await;
        let _ = self.stop_listener.send(true);
        let result = flatten(self.listener.await);
        info!("motd server stopped");
        result
    }

    async fn halt_workers(&mut self) {
        let _ = self.stop_workers.send(true);
        for handle in self.workers.drain(..) {
            if let Err(e) = handle.await {
                error!(error = %e, "Worker task failed");
            }
        }
    }
}

fn flatten(joined: std::result::Result<Result<()>, JoinError>) -> Result<()> {
    joined.map_err(|e| ServerError::Task(e.to_string()))?
}
