use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tracing::{debug, info};

use crate::api_map::ApiMap;
use crate::source::Source;
use crate::type_checker::TypeChecker;

/// Holds the sources of a project and publishes an [`ApiMap`] snapshot of
/// them.
///
/// Every change builds a complete new snapshot and swaps it in. Readers keep
/// whichever snapshot they took for as long as they hold the `Arc`.
#[derive(Debug)]
pub struct Library {
    sources: Mutex<BTreeMap<String, Arc<Source>>>,
    current: RwLock<Arc<ApiMap>>,
}

impl Default for Library {
    fn default() -> Self {
        Self::new()
    }
}

impl Library {
    pub fn new() -> Self {
        Self {
            sources: Mutex::new(BTreeMap::new()),
            current: RwLock::new(Arc::new(ApiMap::from_sources(Vec::new()))),
        }
    }

    /// A library holding `sources`, built once.
    pub fn load(sources: impl IntoIterator<Item = Source>) -> Self {
        let sources: BTreeMap<String, Arc<Source>> = sources
            .into_iter()
            .map(|source| (source.filename().to_string(), Arc::new(source)))
            .collect();
        let api_map = build(&sources);
        info!(sources = sources.len(), "library loaded");
        Self {
            sources: Mutex::new(sources),
            current: RwLock::new(api_map),
        }
    }

    /// Adds or replaces a source and publishes a new snapshot.
    pub fn update(&self, source: Source) {
        let mut sources = self.sources.lock().unwrap_or_else(PoisonError::into_inner);
        debug!(filename = source.filename(), "updating source");
        sources.insert(source.filename().to_string(), Arc::new(source));
        self.publish(build(&sources));
    }

    /// Drops a source. Returns false when the library did not hold it.
    pub fn remove(&self, filename: &str) -> bool {
        let mut sources = self.sources.lock().unwrap_or_else(PoisonError::into_inner);
        if sources.remove(filename).is_none() {
            return false;
        }
        debug!(filename, "removed source");
        self.publish(build(&sources));
        true
    }

    pub fn contains(&self, filename: &str) -> bool {
        self.sources
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(filename)
    }

    pub fn filenames(&self) -> Vec<String> {
        self.sources
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Arc<ApiMap> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// A checker for `filename` bound to the current snapshot.
    pub fn type_checker(&self, filename: &str) -> TypeChecker {
        TypeChecker::new(filename, self.snapshot())
    }

    fn publish(&self, api_map: Arc<ApiMap>) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = api_map;
    }
}

fn build(sources: &BTreeMap<String, Arc<Source>>) -> Arc<ApiMap> {
    Arc::new(ApiMap::from_sources(sources.values().cloned().collect()))
}
