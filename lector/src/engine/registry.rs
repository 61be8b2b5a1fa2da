//! Engine ownership and lifecycle.
//!
//! The registry is the only shared mutable state in the service. Under the
//! cached policy it retains one engine per canonical language for the
//! process lifetime; under the ephemeral policy every request gets a fresh
//! instance that is dropped on release, keeping peak memory bounded to the
//! in-flight recognitions.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::EnginePolicy;
use crate::error::{LectorError, Result};
use crate::imaging::RasterImage;
use crate::lang::CanonicalLanguage;
use crate::models::RecognitionLine;

use super::{Engine, EngineFactory};

/// A cached engine sits behind its own async mutex: the engine is not
/// reentrant, and the gate capacity may be above one.
type SharedEngine = Arc<Mutex<Box<dyn Engine>>>;

/// A live engine checked out of the registry for one recognition.
pub enum EngineHandle {
    /// Retained instance; the registry keeps a reference after release.
    Cached(SharedEngine),
    /// Exclusively owned instance; disposed when released.
    Ephemeral(Option<Box<dyn Engine>>),
}

impl EngineHandle {
    /// Drive the engine on a blocking task. Cached handles lock their
    /// per-language mutex for the duration; ephemeral handles move the
    /// engine into the task and take it back for disposal accounting.
    pub async fn recognize(&mut self, image: &RasterImage) -> Result<Vec<RecognitionLine>> {
        match self {
            EngineHandle::Cached(slot) => {
                let slot = Arc::clone(slot);
                let image = image.clone();
                tokio::task::spawn_blocking(move || {
                    let mut engine = slot.blocking_lock();
                    engine.recognize(&image)
                })
                .await
                .map_err(|e| LectorError::Recognition(format!("recognition task panicked: {e}")))?
            }
            EngineHandle::Ephemeral(engine_slot) => {
                let engine = engine_slot.take().ok_or_else(|| {
                    LectorError::Recognition("ephemeral engine already consumed".to_string())
                })?;
                let image = image.clone();
                let (result, engine) = tokio::task::spawn_blocking(move || {
                    let mut engine = engine;
                    let result = engine.recognize(&image);
                    (result, engine)
                })
                .await
                .map_err(|e| LectorError::Recognition(format!("recognition task panicked: {e}")))?;
                *engine_slot = Some(engine);
                result
            }
        }
    }
}

pub struct EngineRegistry {
    policy: EnginePolicy,
    factory: Arc<dyn EngineFactory>,
    engines: Mutex<HashMap<CanonicalLanguage, SharedEngine>>,
    built: AtomicU64,
    disposed: AtomicU64,
}

impl EngineRegistry {
    pub fn new(policy: EnginePolicy, factory: Arc<dyn EngineFactory>) -> Self {
        Self {
            policy,
            factory,
            engines: Mutex::new(HashMap::new()),
            built: AtomicU64::new(0),
            disposed: AtomicU64::new(0),
        }
    }

    /// Check out an engine for `lang`. Cached policy reuses or constructs
    /// and retains; ephemeral policy always constructs. Construction
    /// failures surface as `EngineUnavailable` and are never retried here.
    pub async fn acquire(&self, lang: CanonicalLanguage) -> Result<EngineHandle> {
        match self.policy {
            EnginePolicy::Cached => {
                {
                    let engines = self.engines.lock().await;
                    if let Some(existing) = engines.get(&lang) {
                        return Ok(EngineHandle::Cached(Arc::clone(existing)));
                    }
                }

                // Construct outside the map lock; model assets load from
                // disk and must not stall unrelated languages.
                let engine = self.build(lang).await?;

                let mut engines = self.engines.lock().await;
                match engines.get(&lang) {
                    Some(existing) => {
                        // Lost a construction race; the first insert wins.
                        self.disposed.fetch_add(1, Ordering::Relaxed);
                        debug!(language = %lang, "Discarding duplicate engine from construction race");
                        Ok(EngineHandle::Cached(Arc::clone(existing)))
                    }
                    None => {
                        let shared: SharedEngine = Arc::new(Mutex::new(engine));
                        engines.insert(lang, Arc::clone(&shared));
                        Ok(EngineHandle::Cached(shared))
                    }
                }
            }
            EnginePolicy::Ephemeral => {
                let engine = self.build(lang).await?;
                Ok(EngineHandle::Ephemeral(Some(engine)))
            }
        }
    }

    /// Return a handle. No-op for cached handles; ephemeral handles are
    /// dropped here, making their memory eligible for reclamation. Must be
    /// called on every pipeline exit path, including failures.
    pub fn release(&self, handle: EngineHandle) {
        match handle {
            EngineHandle::Cached(_) => {}
            EngineHandle::Ephemeral(engine) => {
                drop(engine);
                self.disposed.fetch_add(1, Ordering::Relaxed);
                debug!("Ephemeral engine disposed");
            }
        }
    }

    async fn build(&self, lang: CanonicalLanguage) -> Result<Box<dyn Engine>> {
        let factory = Arc::clone(&self.factory);
        let engine = tokio::task::spawn_blocking(move || factory.build(lang))
            .await
            .map_err(|e| {
                LectorError::EngineUnavailable(format!("engine construction task panicked: {e}"))
            })??;

        self.built.fetch_add(1, Ordering::Relaxed);
        info!(language = %lang, policy = %self.policy, "Engine constructed");
        Ok(engine)
    }

    pub fn policy(&self) -> EnginePolicy {
        self.policy
    }

    pub fn engines_built(&self) -> u64 {
        self.built.load(Ordering::Relaxed)
    }

    pub fn engines_disposed(&self) -> u64 {
        self.disposed.load(Ordering::Relaxed)
    }

    pub async fn cached_count(&self) -> usize {
        self.engines.lock().await.len()
    }
}
