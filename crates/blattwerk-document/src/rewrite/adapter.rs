// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Rewrite adapter — async, byte-oriented front for one shared rewrite engine.
//
// The engine is started on first use; concurrent first callers wait on the
// same start-up rather than each starting their own. Every call stages its
// data under fresh working names and removes them again on every exit path.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use blattwerk_core::config::EngineConfig;
use blattwerk_core::error::BlattwerkError;
use blattwerk_core::types::CompressionTier;
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument, warn};

use super::engine::{LopdfRewriteEngine, RewriteCommand, RewriteEngine, RewriteError};

type EngineLoader = dyn Fn() -> Result<Arc<dyn RewriteEngine>, RewriteError> + Send + Sync;

static SHARED: OnceLock<Arc<RewriteAdapter>> = OnceLock::new();

pub struct RewriteAdapter {
    engine: OnceCell<Arc<dyn RewriteEngine>>,
    loader: Arc<EngineLoader>,
    /// Source of unique working-file names.
    next_slot: AtomicU64,
}

impl RewriteAdapter {
    /// Adapter that starts its engine with `loader` on first use.
    pub fn new<F>(loader: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn RewriteEngine>, RewriteError> + Send + Sync + 'static,
    {
        Self {
            engine: OnceCell::new(),
            loader: Arc::new(loader),
            next_slot: AtomicU64::new(1),
        }
    }

    /// Adapter over the lopdf engine, with scratch storage under `config.work_dir`.
    pub fn lopdf(config: &EngineConfig) -> Self {
        let work_dir = config.work_dir.clone();
        Self::new(move || {
            let engine = LopdfRewriteEngine::new(work_dir.as_deref())?;
            Ok(Arc::new(engine) as Arc<dyn RewriteEngine>)
        })
    }

    /// The process-wide adapter. The first caller's configuration wins.
    pub fn shared(config: &EngineConfig) -> Arc<Self> {
        Arc::clone(SHARED.get_or_init(|| Arc::new(Self::lopdf(config))))
    }

    /// Whether the engine has finished starting.
    pub fn is_initialised(&self) -> bool {
        self.engine.initialized()
    }

    async fn engine(&self) -> Result<Arc<dyn RewriteEngine>, BlattwerkError> {
        let engine = self
            .engine
            .get_or_try_init(|| async {
                info!("Starting rewrite engine");
                let loader = Arc::clone(&self.loader);
                let engine = tokio::task::spawn_blocking(move || loader())
                    .await
                    .map_err(|err| {
                        BlattwerkError::Internal(format!("rewrite engine start-up aborted: {err}"))
                    })??;
                Ok::<_, BlattwerkError>(engine)
            })
            .await?;
        Ok(Arc::clone(engine))
    }

    /// Remove encryption from `bytes`. `None` tries the empty password.
    #[instrument(skip_all, fields(bytes_len = bytes.len(), has_password = password.is_some()))]
    pub async fn decrypt(
        &self,
        bytes: Vec<u8>,
        password: Option<&str>,
    ) -> Result<Vec<u8>, BlattwerkError> {
        let password = password.unwrap_or_default().to_string();
        self.execute(bytes, move |input, output| RewriteCommand::Decrypt {
            input,
            output,
            password,
        })
        .await
    }

    /// Recompress an already-decrypted document.
    ///
    /// Every tier currently runs the same conservative strategy.
    #[instrument(skip_all, fields(bytes_len = bytes.len(), tier = ?tier))]
    pub async fn recompress(
        &self,
        bytes: Vec<u8>,
        tier: CompressionTier,
    ) -> Result<Vec<u8>, BlattwerkError> {
        debug!(?tier, "Recompressing with the standard strategy");
        self.execute(bytes, |input, output| RewriteCommand::Recompress { input, output })
            .await
    }

    async fn execute<F>(&self, bytes: Vec<u8>, command: F) -> Result<Vec<u8>, BlattwerkError>
    where
        F: FnOnce(String, String) -> RewriteCommand + Send + 'static,
    {
        let engine = self.engine().await?;
        let slot = self.next_slot.fetch_add(1, Ordering::Relaxed);

        tokio::task::spawn_blocking(move || -> Result<Vec<u8>, RewriteError> {
            let files = WorkingFiles::new(engine.as_ref(), slot);
            engine.write_file(&files.input, &bytes)?;
            engine.run(&command(files.input.clone(), files.output.clone()))?;
            let output = engine.read_file(&files.output)?;
            if output.is_empty() {
                return Err(RewriteError::MissingOutput(files.output.clone()));
            }
            Ok(output)
        })
        .await
        .map_err(|err| BlattwerkError::Internal(format!("rewrite task aborted: {err}")))?
        .map_err(BlattwerkError::from)
    }
}

/// Input/output names for one call; both are removed on drop.
struct WorkingFiles<'a> {
    engine: &'a dyn RewriteEngine,
    input: String,
    output: String,
}

impl<'a> WorkingFiles<'a> {
    fn new(engine: &'a dyn RewriteEngine, slot: u64) -> Self {
        Self {
            engine,
            input: format!("in-{slot}.pdf"),
            output: format!("out-{slot}.pdf"),
        }
    }
}

impl Drop for WorkingFiles<'_> {
    fn drop(&mut self) {
        for name in [&self.input, &self.output] {
            if let Err(err) = self.engine.remove_file(name) {
                warn!(name = %name, %err, "Failed to remove working file");
            }
        }
    }
}
