//! Runtime configuration

use std::io::Write;
use std::sync::{Arc, Mutex};

/// Where `print` and `println` write
#[derive(Debug, Clone, Default)]
pub enum OutputSink {
    #[default]
    Stdout,
    /// Collects the output, used by tests and embedders
    Buffer(Arc<Mutex<String>>),
}

impl OutputSink {
    /// A buffer sink and the handle to read it back
    pub fn buffer() -> (Self, Arc<Mutex<String>>) {
        let buffer = Arc::new(Mutex::new(String::new()));
        (Self::Buffer(Arc::clone(&buffer)), buffer)
    }

    pub fn write(&self, text: &str) {
        match self {
            Self::Stdout => {
                let mut stdout = std::io::stdout().lock();
                if let Err(error) = stdout.write_all(text.as_bytes()).and_then(|_| stdout.flush()) {
                    tracing::warn!(%error, "failed to write program output");
                }
            }
            Self::Buffer(buffer) => match buffer.lock() {
                Ok(mut buffer) => buffer.push_str(text),
                Err(poisoned) => poisoned.into_inner().push_str(text),
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Re-specialisations after which a call site stops caching
    pub megamorphic_threshold: usize,
    /// Nested method invocations allowed on one thread
    pub max_call_depth: usize,
    pub output: OutputSink,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            megamorphic_threshold: 8,
            max_call_depth: 1024,
            output: OutputSink::Stdout,
        }
    }
}

impl RuntimeConfig {
    pub fn with_output(mut self, output: OutputSink) -> Self {
        self.output = output;
        self
    }

    pub fn with_megamorphic_threshold(mut self, threshold: usize) -> Self {
        self.megamorphic_threshold = threshold;
        self
    }

    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }
}
