//! Backend runtime activation
//!
//! Runtimes are loaded on first use and shared by every media element that
//! holds the same [`Activator`]; [`Activator::global`] is the process-wide
//! one. Concurrent activations of one kind wait on a single load. A failed
//! load is not cached, so the next activation tries again.

use crate::{
    backend::{BackendKind, BackendRuntime, RuntimeLoader},
    error::{Error, Result},
};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument, warn};

type RuntimeCell = Arc<OnceCell<Arc<dyn BackendRuntime>>>;

/// Loads and memoizes backend runtimes
pub struct Activator {
    loaders: RwLock<HashMap<BackendKind, Arc<dyn RuntimeLoader>>>,
    runtimes: Mutex<HashMap<BackendKind, RuntimeCell>>,
}

impl Activator {
    pub fn new() -> Self {
        Self {
            loaders: RwLock::new(HashMap::new()),
            runtimes: Mutex::new(HashMap::new()),
        }
    }

    /// Process-wide activator. Loaders registered here serve every element
    /// created with it, and each runtime loads once per process.
    pub fn global() -> Arc<Activator> {
        static GLOBAL: OnceLock<Arc<Activator>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(Activator::new())).clone()
    }

    /// Register the loader for a backend kind, replacing any previous one.
    /// A runtime already loaded for the kind stays in use.
    pub fn register(&self, loader: Arc<dyn RuntimeLoader>) {
        let kind = loader.kind();
        debug!(backend = %kind, "Runtime loader registered");
        self.loaders.write().insert(kind, loader);
    }

    /// Builder-style [`register`](Self::register)
    pub fn with_loader(self, loader: Arc<dyn RuntimeLoader>) -> Self {
        self.register(loader);
        self
    }

    /// A loader is registered for `kind`
    pub fn supports(&self, kind: BackendKind) -> bool {
        self.loaders.read().contains_key(&kind)
    }

    pub fn registered(&self) -> Vec<BackendKind> {
        let mut kinds: Vec<BackendKind> = self.loaders.read().keys().copied().collect();
        kinds.sort();
        kinds
    }

    /// Runtime for `kind` has finished loading
    pub fn is_loaded(&self, kind: BackendKind) -> bool {
        self.runtimes
            .lock()
            .get(&kind)
            .is_some_and(|cell| cell.initialized())
    }

    /// Load the runtime for `kind`, or return the one already loaded
    #[instrument(skip(self))]
    pub async fn activate(&self, kind: BackendKind) -> Result<Arc<dyn BackendRuntime>> {
        let loader = self
            .loaders
            .read()
            .get(&kind)
            .cloned()
            .ok_or_else(|| Error::Capability(format!("no runtime registered for {}", kind)))?;

        let cell = self.runtimes.lock().entry(kind).or_default().clone();
        if let Some(runtime) = cell.get() {
            return Ok(runtime.clone());
        }

        let runtime = cell
            .get_or_try_init(|| async move {
                info!(backend = %kind, "Loading backend runtime");
                loader.load().await.map_err(|err| {
                    warn!(backend = %kind, error = %err, "Backend runtime failed to load");
                    match err {
                        Error::Network(_) => err,
                        other => Error::Network(other.to_string()),
                    }
                })
            })
            .await?;

        Ok(runtime.clone())
    }
}

impl Default for Activator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Activator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Activator")
            .field("registered", &self.registered())
            .finish()
    }
}
