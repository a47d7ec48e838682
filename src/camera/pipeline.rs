use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use serde::Serialize;

use super::state::ProcessorState;
use super::surfaces::Surfaces;
use super::text;
use super::CameraError;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = false;

use crate::{log_debug, log_error};

pub const NO_PERMISSION_ADVISORY: &str =
    "[No permission to use camera, check your browser settings]";

const ADVISORY_COLOR: Rgba<u8> = Rgba([0, 0, 255, 255]);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TickOutcome {
    Rendered,
    Advisory,
    Paused,
}

/// Where the process surface lands on the render surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Fits the process surface to the render height, keeping its aspect ratio,
/// and centres it horizontally. Negative `x` means the sides get cropped.
pub fn composite_placement(process: (u32, u32), render: (u32, u32)) -> Option<Placement> {
    let (pw, ph) = (f64::from(process.0), f64::from(process.1));
    let (rw, rh) = (f64::from(render.0), f64::from(render.1));
    if pw == 0.0 || ph == 0.0 {
        return None;
    }

    let width = rh * (pw / ph);
    Some(Placement {
        x: (rw - width) / 2.0,
        y: 0.0,
        width,
        height: rh,
    })
}

/// One pass of the frame pipeline.
pub fn tick(state: &mut ProcessorState) -> Result<TickOutcome, CameraError> {
    if !state.running {
        return Ok(TickOutcome::Paused);
    }

    let permission = state.video_permission;
    let frame = if permission {
        let video = state.video.as_ref().ok_or_else(|| {
            log_error!("Tick without a bound video stream");
            CameraError::MissingVideo
        })?;
        Some(video.current_frame().ok_or(CameraError::MissingFrame)?)
    } else {
        None
    };

    let surfaces = state
        .canvas
        .surfaces_mut()
        .ok_or(CameraError::MissingSurfaces)?;
    surfaces.process.clear();

    let outcome = match frame {
        None => {
            text::draw_centered(
                surfaces.process.image_mut(),
                NO_PERMISSION_ADVISORY,
                ADVISORY_COLOR,
                1,
            );
            TickOutcome::Advisory
        }
        Some(frame) => {
            draw_frame(surfaces.process.image_mut(), &frame);
            TickOutcome::Rendered
        }
    };

    composite(surfaces);
    log_debug!("Tick finished: {:?}", outcome);
    Ok(outcome)
}

fn draw_frame(target: &mut RgbaImage, frame: &RgbaImage) {
    if frame.dimensions() == target.dimensions() {
        target.copy_from_slice(frame.as_raw());
        return;
    }
    let (width, height) = target.dimensions();
    let scaled = imageops::resize(frame, width, height, FilterType::Triangle);
    imageops::replace(target, &scaled, 0, 0);
}

/// Clears the render surface and draws the process surface onto it.
fn composite(surfaces: &mut Surfaces) {
    let process = surfaces.process.image();
    let render_size = surfaces.render.image().dimensions();
    surfaces.render.clear();

    let Some(placement) = composite_placement(process.dimensions(), render_size) else {
        return;
    };
    let width = placement.width.round() as u32;
    let height = placement.height.round() as u32;
    if width == 0 || height == 0 {
        return;
    }

    let scaled = imageops::resize(process, width, height, FilterType::Triangle);
    imageops::overlay(
        surfaces.render.image_mut(),
        &scaled,
        placement.x.round() as i64,
        placement.y.round() as i64,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::backend::video_channel;
    use crate::camera::surfaces::WHITE;
    use crate::camera::types::Dimensions;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);

    #[test]
    fn wide_video_is_centred_in_wider_container() {
        let placement = composite_placement((1280, 720), (900, 480)).unwrap();
        assert!((placement.width - 853.333).abs() < 0.01);
        assert!((placement.x - 23.333).abs() < 0.01);
        assert_eq!(placement.y, 0.0);
        assert_eq!(placement.height, 480.0);
    }

    #[test]
    fn narrow_container_crops_the_sides() {
        let placement = composite_placement((1280, 720), (400, 480)).unwrap();
        assert!(placement.x < 0.0);
        assert!(composite_placement((0, 720), (400, 480)).is_none());
    }

    #[test]
    fn paused_tick_draws_nothing() {
        let mut state = ProcessorState::new(2);
        state.running = false;
        assert_eq!(tick(&mut state), Ok(TickOutcome::Paused));
    }

    #[test]
    fn missing_preconditions_are_typed_errors() {
        let mut state = ProcessorState::new(2);
        assert_eq!(tick(&mut state), Err(CameraError::MissingVideo));

        let (_feed, handle) = video_channel("cam");
        state.video = Some(handle);
        assert_eq!(tick(&mut state), Err(CameraError::MissingFrame));
    }

    #[test]
    fn frame_is_letterboxed_onto_white() {
        let (feed, handle) = video_channel("cam");
        feed.publish_metadata(Dimensions::new(40, 20));
        feed.publish_frame(RgbaImage::from_pixel(40, 20, RED));

        let mut state = ProcessorState::new(2);
        state.video = Some(handle);
        state
            .canvas
            .setup(Some(Dimensions::new(40, 20)), Dimensions::new(60, 20))
            .unwrap();

        assert_eq!(tick(&mut state), Ok(TickOutcome::Rendered));
        let render = state.canvas.surfaces().unwrap().render.image();
        assert_eq!(render.get_pixel(0, 10), &WHITE);
        assert_eq!(render.get_pixel(59, 10), &WHITE);
        assert_eq!(render.get_pixel(30, 10), &RED);
    }

    #[test]
    fn denied_permission_renders_advisory() {
        let mut state = ProcessorState::new(2);
        state.video_permission = false;
        state
            .canvas
            .setup(Some(Dimensions::new(640, 480)), Dimensions::new(640, 480))
            .unwrap();

        assert_eq!(tick(&mut state), Ok(TickOutcome::Advisory));
        let process = state.canvas.surfaces().unwrap().process.image();
        assert!(process.pixels().any(|p| *p == ADVISORY_COLOR));
    }
}
