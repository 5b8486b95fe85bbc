use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use anyhow::{anyhow, Context, Result};
use image::RgbaImage;

use crate::session::Session;

/// Where a new base image comes from.
pub enum ImageSource {
    Path(PathBuf),
    Bytes { name: String, bytes: Vec<u8> },
}

impl ImageSource {
    pub fn describe(&self) -> String {
        match self {
            ImageSource::Path(path) => path.display().to_string(),
            ImageSource::Bytes { name, .. } => name.clone(),
        }
    }
}

pub fn is_image_mime(mime: &str) -> bool {
    mime.starts_with("image/")
}

/// Decodes an in-memory file, rejecting anything that is not an image.
pub fn decode_bytes(bytes: &[u8]) -> Result<RgbaImage> {
    let format = image::guess_format(bytes).context("not a recognised image format")?;
    let image = image::load_from_memory_with_format(bytes, format)
        .with_context(|| format!("cannot decode {format:?} image"))?;
    Ok(image.to_rgba8())
}

pub fn decode_path(path: &Path) -> Result<RgbaImage> {
    let bytes = std::fs::read(path).with_context(|| format!("cannot read {}", path.display()))?;
    decode_bytes(&bytes).with_context(|| format!("cannot load {}", path.display()))
}

fn decode(source: ImageSource) -> Result<RgbaImage> {
    match source {
        ImageSource::Path(path) => decode_path(&path),
        ImageSource::Bytes { name, bytes } => {
            decode_bytes(&bytes).with_context(|| format!("cannot load {name}"))
        }
    }
}

/// Background decode whose result is picked up by polling from the UI loop.
pub struct DecodeTask {
    rx: Receiver<Result<RgbaImage>>,
    label: String,
}

impl DecodeTask {
    pub fn spawn(source: ImageSource) -> Self {
        let label = source.describe();
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            // The receiver is gone when a newer load replaced this one.
            let _ = tx.send(decode(source));
        });
        Self { rx, label }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn try_finish(&self) -> Option<Result<RgbaImage>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(anyhow!("decoder thread stopped"))),
        }
    }
}

/// Holds the single outstanding decode; starting a new one drops the old.
#[derive(Default)]
pub struct Ingest {
    task: Option<DecodeTask>,
}

impl Ingest {
    pub fn start(&mut self, source: ImageSource) {
        log::info!("loading {}", source.describe());
        self.task = Some(DecodeTask::spawn(source));
    }

    pub fn is_busy(&self) -> bool {
        self.task.is_some()
    }

    /// Applies a finished decode to `session`. Failures leave the session
    /// untouched and are returned for reporting.
    pub fn poll(&mut self, session: &mut Session) -> Option<Result<()>> {
        let result = self.task.as_ref()?.try_finish()?;
        let task = self.task.take()?;
        Some(match result {
            Ok(pixels) => {
                session.load_image(pixels);
                Ok(())
            }
            Err(err) => {
                log::warn!("ignoring {}: {err:#}", task.label());
                Err(err)
            }
        })
    }
}
