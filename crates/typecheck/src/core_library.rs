//! Built-in Ruby namespaces.
//!
//! The stubs in `core/core.rb` go through the same parser and mapper as user
//! code, once per process. Every snapshot shares the resulting pins.

use std::sync::Arc;

use once_cell::sync::Lazy;
use tracing::{debug, warn};

use crate::pin::Pin;
use crate::source::Source;
use crate::source_map::SourceMap;

/// Filename recorded on core pins.
pub const CORE_FILENAME: &str = "<core>";

const CORE_SOURCE: &str = include_str!("../core/core.rb");

static CORE_PINS: Lazy<Vec<Arc<Pin>>> = Lazy::new(|| {
    let source = Arc::new(Source::load_string(CORE_SOURCE, CORE_FILENAME));
    if !source.is_parsed() {
        warn!("core library stubs did not parse cleanly");
    }
    let map = SourceMap::map(source);
    // The stub file's own root namespace pin is not part of the library.
    let pins: Vec<Arc<Pin>> = map.pins().iter().skip(1).cloned().collect();
    debug!(pins = pins.len(), "loaded core library");
    pins
});

pub fn pins() -> &'static [Arc<Pin>] {
    &CORE_PINS
}
