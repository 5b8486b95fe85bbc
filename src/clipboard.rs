use std::borrow::Cow;

use anyhow::{anyhow, Context, Result};
use arboard::{Clipboard, ImageData};
use image::RgbaImage;

/// Result of copying an export to the system clipboard.
pub enum CopyOutcome {
    Copied,
    /// The clipboard refused the image; the caller shows it for manual copy.
    ManualCopy(RgbaImage),
}

/// Lazily opened system clipboard. The handle is kept alive because some
/// platforms drop clipboard contents together with their owner.
#[derive(Default)]
pub struct SystemClipboard {
    inner: Option<Clipboard>,
}

impl SystemClipboard {
    fn handle(&mut self) -> Result<&mut Clipboard> {
        if self.inner.is_none() {
            self.inner = Some(Clipboard::new().context("clipboard unavailable")?);
        }
        self.inner
            .as_mut()
            .ok_or_else(|| anyhow!("clipboard unavailable"))
    }

    pub fn read_image(&mut self) -> Result<RgbaImage> {
        let data = self
            .handle()?
            .get_image()
            .context("no image on the clipboard")?;
        from_image_data(data)
    }

    pub fn write_image(&mut self, image: &RgbaImage) -> Result<()> {
        self.handle()?
            .set_image(to_image_data(image))
            .context("clipboard rejected the image")
    }

    /// Copies `image`, handing it back for manual copy when that fails.
    pub fn copy_or_fallback(&mut self, image: RgbaImage) -> CopyOutcome {
        match self.write_image(&image) {
            Ok(()) => {
                log::info!("copied {}x{} image to clipboard", image.width(), image.height());
                CopyOutcome::Copied
            }
            Err(err) => {
                log::warn!("clipboard write failed, falling back to manual copy: {err:#}");
                // A broken handle is reopened on the next attempt.
                self.inner = None;
                CopyOutcome::ManualCopy(image)
            }
        }
    }
}

fn to_image_data(image: &RgbaImage) -> ImageData<'_> {
    ImageData {
        width: image.width() as usize,
        height: image.height() as usize,
        bytes: Cow::Borrowed(image.as_raw()),
    }
}

fn from_image_data(data: ImageData<'_>) -> Result<RgbaImage> {
    RgbaImage::from_raw(data.width as u32, data.height as u32, data.bytes.into_owned())
        .ok_or_else(|| anyhow!("clipboard image has invalid shape"))
}
