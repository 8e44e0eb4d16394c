use std::{
    io::{self, SeekFrom},
    path::Path,
};

use thiserror::Error;
use tokio::{
    fs::File,
    io::{AsyncBufReadExt, AsyncSeekExt, BufReader},
    sync::mpsc::Sender,
};

use crate::cfg::Target;

/// Capacity of the URL queue between the file reader and the request
/// builder.
pub const URL_QUEUE_CAPACITY: usize = 1000;

/// An error raised by a background producer.
///
/// Every variant is terminal: production stops at the first bad item and
/// the orchestrator decides whether to tear the process down.
#[derive(Debug, Error)]
pub enum SourceError {
    /// A full pass over the URL file yielded no URLs.
    #[error("URL file contains no URLs")]
    EmptyFile,
    /// Reading the URL file failed mid-pass.
    #[error("failed to read URL file: {0}")]
    Read(#[from] io::Error),
    /// A URL failed to parse during request construction.
    #[error("invalid URL {url:?}: {reason}")]
    InvalidUrl {
        url: String,
        #[source]
        reason: http::uri::InvalidUri,
    },
}

/// Where the request builder gets its URLs from.
#[derive(Debug)]
pub enum UrlSource {
    /// Every request reuses the same configured URL.
    Fixed(String),
    /// URLs are replayed from a file, indefinitely.
    File(CyclicFileSource),
}

impl UrlSource {
    /// Resolves the target into a source, opening the URL file when one is
    /// configured. A file that cannot be opened is a startup error.
    pub async fn from_target(target: &Target) -> io::Result<Self> {
        let m = match target {
            Target::Url(url) => Self::Fixed(url.clone()),
            Target::File(path) => Self::File(CyclicFileSource::open(path).await?),
        };

        Ok(m)
    }
}

/// A URL producer that replays a file's non-empty lines indefinitely.
///
/// The file is re-read on every pass, so edits made while the run is in
/// flight are picked up on the next cycle. The handle stays open for the
/// lifetime of the producer; within a pass lines are delivered strictly in
/// file order, and every pass repeats the order of the previous one.
#[derive(Debug)]
pub struct CyclicFileSource {
    file: File,
}

impl CyclicFileSource {
    /// Opens the URL file.
    pub async fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::open(path).await?;

        Ok(Self { file })
    }

    /// Feeds URLs into the queue until the consumer goes away.
    ///
    /// A send on a full queue blocks, which throttles reading to the
    /// consumption rate downstream. Returns `Ok` only when the receiving
    /// side of the queue has been dropped.
    pub async fn run(mut self, tx: Sender<String>) -> Result<(), SourceError> {
        loop {
            self.file.seek(SeekFrom::Start(0)).await?;

            let mut produced = 0u64;
            let mut lines = BufReader::new(&mut self.file).lines();
            while let Some(line) = lines.next_line().await? {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                if tx.send(line.to_string()).await.is_err() {
                    return Ok(());
                }
                produced += 1;
            }

            // Rewinding over a file with no usable lines would spin forever.
            if produced == 0 {
                return Err(SourceError::EmptyFile);
            }
        }
    }
}
