use std::fmt;
use std::sync::Arc;

use crate::fault::FaultSink;

/// Per-promise construction settings.
///
/// There is no process-wide default: a promise only reports to the sink it
/// was built with. Promises derived through [`crate::Promise::then`] inherit
/// the configuration of their source.
#[derive(Clone, Default)]
pub struct Config {
    pub(crate) fault_sink: Option<Arc<dyn FaultSink>>,
}

impl Config {
    pub fn with_fault_sink(sink: impl FaultSink + 'static) -> Self {
        Self {
            fault_sink: Some(Arc::new(sink)),
        }
    }

    /// Share one sink between several configurations.
    pub fn with_shared_fault_sink(sink: Arc<dyn FaultSink>) -> Self {
        Self {
            fault_sink: Some(sink),
        }
    }

    pub fn has_fault_sink(&self) -> bool {
        self.fault_sink.is_some()
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("fault_sink", &self.fault_sink.is_some())
            .finish()
    }
}
