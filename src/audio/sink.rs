use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;

/// Streaming encoder for captured audio
///
/// Chunks are written as they arrive from the capture ring; `finalize` flushes
/// headers and closes the file.
#[async_trait(?Send)]
pub trait AudioSink {
    /// Target file being written
    fn path(&self) -> &Path;

    /// Write interleaved f32 samples (moved, not copied)
    fn write_chunk(&mut self, samples: Vec<f32>) -> Result<()>;

    /// Finalize and close the sink
    async fn finalize(&mut self) -> Result<()>;
}
