use crate::error::{Error, Result};
use crate::queue::LineSender;
use crate::shutdown::ShutdownSignal;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::SplitStream;

/// An opened access log. Opening happens before any worker starts so an
/// unreadable source fails the run up front.
pub struct LogSource {
    path: PathBuf,
    file: Option<File>,
}

impl LogSource {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = Self::open_file(&path).await?;
        Ok(Self {
            path,
            file: Some(file),
        })
    }

    async fn open_file(path: &Path) -> Result<File> {
        File::open(path).await.map_err(|source| Error::Source {
            path: path.to_path_buf(),
            source,
        })
    }

    /// The file for the next pass: the one opened up front, then a fresh
    /// handle on every later call.
    async fn next_pass(&mut self) -> Result<BufReader<File>> {
        let file = match self.file.take() {
            Some(file) => file,
            None => Self::open_file(&self.path).await?,
        };
        Ok(BufReader::new(file))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpOutcome {
    /// The source was read to the end (every pass, when repeating).
    Finished { lines: u64, passes: u64 },
    /// Shutdown was raised or every worker went away first.
    Interrupted { lines: u64, passes: u64 },
}

impl PumpOutcome {
    pub fn lines(&self) -> u64 {
        match self {
            Self::Finished { lines, .. } | Self::Interrupted { lines, .. } => *lines,
        }
    }
}

enum PassEnd {
    Eof(u64),
    Stopped(u64),
}

/// Feeds the queue from `source`, once or (with `repeat`) until interrupted.
/// Dropping `lines` on return closes the queue.
pub async fn run(
    mut source: LogSource,
    repeat: bool,
    lines: LineSender,
    mut shutdown: ShutdownSignal,
) -> Result<PumpOutcome> {
    let mut total = 0;
    let mut passes = 0;

    loop {
        let reader = source.next_pass().await?;
        passes += 1;
        log::debug!("Reading {} (pass {})", source.path().display(), passes);

        match pump_reader(reader, &lines, &mut shutdown).await? {
            PassEnd::Stopped(n) => {
                return Ok(PumpOutcome::Interrupted {
                    lines: total + n,
                    passes,
                });
            }
            PassEnd::Eof(n) => {
                total += n;
                if !repeat {
                    break;
                }
                if n == 0 {
                    log::warn!(
                        "{} is empty, not repeating",
                        source.path().display()
                    );
                    break;
                }
            }
        }
    }

    Ok(PumpOutcome::Finished {
        lines: total,
        passes,
    })
}

async fn pump_reader<R>(reader: R, lines: &LineSender, shutdown: &mut ShutdownSignal) -> Result<PassEnd>
where
    R: AsyncBufRead + Unpin,
{
    let mut segments = SplitStream::new(reader.split(b'\n'));
    let mut sent = 0;

    loop {
        let segment = tokio::select! {
            biased;
            _ = shutdown.wait() => return Ok(PassEnd::Stopped(sent)),
            segment = segments.next() => segment,
        };
        let Some(segment) = segment else {
            return Ok(PassEnd::Eof(sent));
        };

        let line = decode_line(segment?);
        tokio::select! {
            biased;
            _ = shutdown.wait() => return Ok(PassEnd::Stopped(sent)),
            res = lines.send(line) => {
                if res.is_err() {
                    return Ok(PassEnd::Stopped(sent));
                }
            }
        }
        sent += 1;
    }
}

fn decode_line(mut bytes: Vec<u8>) -> String {
    if bytes.last() == Some(&b'\r') {
        bytes.pop();
    }
    match String::from_utf8(bytes) {
        Ok(line) => line,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    }
}
