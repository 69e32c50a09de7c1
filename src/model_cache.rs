//! Memoising factory for model handles.
//!
//! Building a provider client is not free (HTTP client, TLS config), so one
//! handle is built per distinct `(model, web_enabled)` pair and reused for
//! every later request with the same pair.

use crate::config::ModelId;
use crate::error::RadNoteError;
use crate::pipeline::llm::{GeminiVisionModel, VisionModel};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Cache key: everything that changes how a handle is constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModelKey {
    pub model: ModelId,
    pub web_enabled: bool,
}

/// Builds a model handle for a key.
pub trait ModelFactory: Send + Sync {
    fn create(&self, key: &ModelKey) -> Result<Arc<dyn VisionModel>, RadNoteError>;
}

/// Production factory: Gemini handles via `edgequake-llm`.
pub struct GeminiFactory;

impl ModelFactory for GeminiFactory {
    fn create(&self, key: &ModelKey) -> Result<Arc<dyn VisionModel>, RadNoteError> {
        Ok(Arc::new(GeminiVisionModel::new(key.model, key.web_enabled)?))
    }
}

/// Handles built so far, keyed by [`ModelKey`].
pub struct ModelCache {
    factory: Arc<dyn ModelFactory>,
    handles: HashMap<ModelKey, Arc<dyn VisionModel>>,
}

impl ModelCache {
    pub fn new(factory: Arc<dyn ModelFactory>) -> Self {
        Self {
            factory,
            handles: HashMap::new(),
        }
    }

    /// Return the cached handle for `key`, building it on first use.
    ///
    /// A failed build is not cached; the next call tries again.
    pub fn get_or_create(&mut self, key: ModelKey) -> Result<Arc<dyn VisionModel>, RadNoteError> {
        if let Some(handle) = self.handles.get(&key) {
            return Ok(Arc::clone(handle));
        }
        debug!("Building model handle for {:?}", key);
        let handle = self.factory.create(&key)?;
        self.handles.insert(key, Arc::clone(&handle));
        Ok(handle)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

impl Default for ModelCache {
    fn default() -> Self {
        Self::new(Arc::new(GeminiFactory))
    }
}
