//! Process and render surfaces.
//!
//! The process surface holds the camera frame at native video resolution; the
//! render surface is what the visitor sees, sized to its container. Resize
//! handling is registered once per session and dropped on teardown.

use image::{Rgba, RgbaImage};

use super::types::Dimensions;
use super::CameraError;

pub const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

#[derive(Debug, Clone)]
pub struct Surface {
    image: RgbaImage,
}

impl Surface {
    pub fn new(size: Dimensions) -> Self {
        Self {
            image: RgbaImage::from_pixel(size.width, size.height, WHITE),
        }
    }

    pub fn size(&self) -> Dimensions {
        Dimensions::new(self.image.width(), self.image.height())
    }

    /// Reallocates to `size`, cleared to opaque white.
    pub fn resize(&mut self, size: Dimensions) {
        self.image = RgbaImage::from_pixel(size.width, size.height, WHITE);
    }

    pub fn clear(&mut self) {
        for pixel in self.image.pixels_mut() {
            *pixel = WHITE;
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn image_mut(&mut self) -> &mut RgbaImage {
        &mut self.image
    }
}

#[derive(Debug, Clone)]
pub struct Surfaces {
    pub process: Surface,
    pub render: Surface,
}

#[derive(Debug, Default)]
pub struct CanvasManager {
    surfaces: Option<Surfaces>,
    container: Option<Dimensions>,
    resize_registered: bool,
}

impl CanvasManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates both surfaces. `video` must carry measured dimensions.
    ///
    /// Returns true when this call registered the resize handling; repeated
    /// setups reuse the existing registration.
    pub fn setup(
        &mut self,
        video: Option<Dimensions>,
        container: Dimensions,
    ) -> Result<bool, CameraError> {
        let video = video
            .filter(|d| !d.is_empty())
            .ok_or(CameraError::UnknownVideoDimensions)?;

        self.surfaces = Some(Surfaces {
            process: Surface::new(video),
            render: Surface::new(container),
        });
        self.container = Some(container);

        let newly_registered = !self.resize_registered;
        self.resize_registered = true;
        Ok(newly_registered)
    }

    /// Re-derives both surfaces after the container changed size. Ignored
    /// unless resize handling is registered.
    pub fn on_resize(&mut self, container: Dimensions, video: Option<Dimensions>) -> bool {
        if !self.resize_registered {
            return false;
        }
        let Some(surfaces) = self.surfaces.as_mut() else {
            return false;
        };

        self.container = Some(container);
        surfaces.render.resize(container);
        match video {
            Some(video) => surfaces.process.resize(video),
            None => surfaces.process.clear(),
        }
        true
    }

    /// Matches the process surface to a newly bound stream.
    pub fn on_video_changed(&mut self, video: Dimensions) {
        if let Some(surfaces) = self.surfaces.as_mut() {
            if surfaces.process.size() != video {
                surfaces.process.resize(video);
            }
        }
    }

    pub fn teardown(&mut self) {
        self.surfaces = None;
        self.container = None;
        self.resize_registered = false;
    }

    pub fn is_resize_registered(&self) -> bool {
        self.resize_registered
    }

    pub fn container(&self) -> Option<Dimensions> {
        self.container
    }

    pub fn surfaces(&self) -> Option<&Surfaces> {
        self.surfaces.as_ref()
    }

    pub fn surfaces_mut(&mut self) -> Option<&mut Surfaces> {
        self.surfaces.as_mut()
    }
}
