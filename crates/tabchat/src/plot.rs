//! The plot slot: a single shared file the agent may write an image into.
//!
//! The slot behaves as a one-slot mailbox. Each `ask` must empty it with
//! [`PlotSlot::clear`] before the agent runs; the returned [`ClearedSlot`] is
//! the only way to ask whether *this* run produced an artifact. Reading the
//! current artifact ([`PlotSlot::read`]) is last-write-wins and carries no
//! request identity.
//!
//! The slot is not locked. Two overlapping `ask` calls against one slot will
//! clobber each other's artifacts, so callers must keep at most one in flight.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::SlotError;

/// Default file name the agent is told to save plots under.
pub const DEFAULT_PLOT_FILE: &str = "output.png";

#[derive(Debug, Clone)]
pub struct PlotSlot {
    path: PathBuf,
}

/// Proof that the slot was emptied before an agent run.
#[must_use = "a cleared slot is only useful for checking what the next agent run produced"]
#[derive(Debug)]
pub struct ClearedSlot<'a> {
    slot: &'a PlotSlot,
}

/// Bytes of the current artifact together with the media type to serve it as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlotImage {
    pub bytes: Vec<u8>,
    pub media_type: &'static str,
}

impl PlotSlot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Removes any existing artifact. A missing artifact is not an error.
    pub async fn clear(&self) -> Result<ClearedSlot<'_>, SlotError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => debug!(path = %self.path.display(), "removed previous plot artifact"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(source) => {
                return Err(SlotError::Clear {
                    path: self.path.clone(),
                    source,
                });
            }
        }
        Ok(ClearedSlot { slot: self })
    }

    /// Returns the current artifact, or `None` when the slot is empty.
    pub async fn read(&self) -> Result<Option<PlotImage>, SlotError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(PlotImage {
                bytes,
                media_type: media_type_for(&self.path),
            })),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(SlotError::Read {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

impl ClearedSlot<'_> {
    /// Whether an artifact appeared since the slot was cleared.
    pub async fn produced(self) -> bool {
        match tokio::fs::try_exists(&self.slot.path).await {
            Ok(exists) => exists,
            Err(e) => {
                warn!(path = %self.slot.path.display(), error = %e, "could not inspect plot slot");
                false
            }
        }
    }
}

fn media_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}
