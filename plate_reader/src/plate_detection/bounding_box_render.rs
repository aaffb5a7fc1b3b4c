//! Overlay of the per-vehicle best readings onto video frames.
//!
//! For every record of a frame the vehicle gets corner borders and the plate
//! a rectangle. If the vehicle has a best reading with a crop, the crop is
//! pasted above the vehicle with the plate text on a white band above it.
//! A record whose overlay does not fit in the frame is skipped; the frame
//! and the run carry on.

use super::{AssociationRecord, BBox};
use crate::config::RenderConfig;
use crate::error::Result;

use log::warn;
use std::collections::HashMap;

/// Color as `(b, g, r)`.
pub type Color = (u8, u8, u8);

const WHITE: Color = (255, 255, 255);
const BLACK: Color = (0, 0, 0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl PixelRect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Pixel rect spanning the truncated corners of `bbox`.
    pub fn from_bbox(bbox: &BBox) -> Self {
        let (x1, y1) = (bbox.x1 as i32, bbox.y1 as i32);
        Self::new(x1, y1, bbox.x2 as i32 - x1, bbox.y2 as i32 - y1)
    }

    pub fn fits_in(&self, width: i32, height: i32) -> bool {
        self.width > 0
            && self.height > 0
            && self.x >= 0
            && self.y >= 0
            && self.x + self.width <= width
            && self.y + self.height <= height
    }
}

/// Drawing surface for one frame.
pub trait OverlayCanvas {
    type Image;

    /// `(width, height)` in pixels.
    fn size(&self) -> (i32, i32);

    fn draw_line(&mut self, from: (i32, i32), to: (i32, i32), color: Color, thickness: i32) -> Result<()>;

    /// A negative thickness fills the rectangle.
    fn draw_rectangle(&mut self, rect: PixelRect, color: Color, thickness: i32) -> Result<()>;

    /// Copy `image` into `at`, which has the image's size.
    fn paste(&mut self, image: &Self::Image, at: PixelRect) -> Result<()>;

    /// `(width, height)` of `text` once drawn.
    fn text_size(&self, text: &str, font_scale: f64, thickness: i32) -> Result<(i32, i32)>;

    fn put_text(
        &mut self,
        text: &str,
        origin: (i32, i32),
        font_scale: f64,
        color: Color,
        thickness: i32,
    ) -> Result<()>;

    /// Eight corner strokes of `line_x` by `line_y` pixels around `bbox`.
    fn draw_border(
        &mut self,
        bbox: &BBox,
        color: Color,
        thickness: i32,
        line_x: i32,
        line_y: i32,
    ) -> Result<()> {
        let PixelRect { x, y, width, height } = PixelRect::from_bbox(bbox);
        let (x1, y1, x2, y2) = (x, y, x + width, y + height);
        let strokes = [
            ((x1, y1), (x1, y1 + line_y)),
            ((x1, y1), (x1 + line_x, y1)),
            ((x1, y2), (x1, y2 - line_y)),
            ((x1, y2), (x1 + line_x, y2)),
            ((x2, y1), (x2 - line_x, y1)),
            ((x2, y1), (x2, y1 + line_y)),
            ((x2, y2), (x2, y2 - line_y)),
            ((x2, y2), (x2 - line_x, y2)),
        ];
        for (from, to) in strokes {
            self.draw_line(from, to, color, thickness)?;
        }
        Ok(())
    }
}

/// The best reading of one vehicle, ready to paste.
#[derive(Debug, Clone)]
pub struct PlateOverlay<I> {
    pub text: String,
    pub crop: I,
    pub width: i32,
    pub height: i32,
}

/// Size of the plate crop once scaled to `crop_height`, keeping its aspect
/// ratio. `None` for a degenerate box.
pub fn crop_size(plate_bbox: &BBox, crop_height: i32) -> Option<(i32, i32)> {
    let (w, h) = (plate_bbox.width(), plate_bbox.height());
    if w <= 0.0 || h <= 0.0 {
        return None;
    }
    let width = (w * crop_height as f64 / h) as i32;
    (width > 0).then_some((width, crop_height))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayPlan {
    pub crop: PixelRect,
    pub band: PixelRect,
    pub text_origin: (i32, i32),
}

/// Place a `crop_size` crop centered above `car_bbox`, the text band on top
/// of it and `text_size` text centered in the band. Fails when the crop or
/// the band leaves the `frame_size` frame.
pub fn plan_overlay(
    car_bbox: &BBox,
    crop_size: (i32, i32),
    text_size: (i32, i32),
    frame_size: (i32, i32),
    config: &RenderConfig,
) -> std::result::Result<OverlayPlan, String> {
    let (crop_w, crop_h) = crop_size;
    let (text_w, text_h) = text_size;
    let center_x2 = car_bbox.x1 + car_bbox.x2;
    let car_top = car_bbox.y1 as i32;

    let crop_x = ((center_x2 - crop_w as f64) / 2.0) as i32;
    let crop = PixelRect::new(crop_x, car_top - crop_h - config.crop_gap, crop_w, crop_h);
    let band = PixelRect::new(
        crop_x,
        crop.y - config.text_band_height,
        crop_w,
        config.text_band_height,
    );
    let text_origin = (
        ((center_x2 - text_w as f64) / 2.0) as i32,
        band.y + config.text_band_height / 2 + text_h / 2,
    );

    let (frame_w, frame_h) = frame_size;
    if !crop.fits_in(frame_w, frame_h) {
        return Err(format!("plate crop {:?} falls outside the {}x{} frame", crop, frame_w, frame_h));
    }
    if !band.fits_in(frame_w, frame_h) {
        return Err(format!("text band {:?} falls outside the {}x{} frame", band, frame_w, frame_h));
    }

    Ok(OverlayPlan {
        crop,
        band,
        text_origin,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    Rendered,
    Skipped(String),
}

pub struct BoundingBoxRender<I> {
    config: RenderConfig,
    overlays: HashMap<i64, PlateOverlay<I>>,
}

impl<I> BoundingBoxRender<I> {
    pub fn new(config: RenderConfig, overlays: HashMap<i64, PlateOverlay<I>>) -> Self {
        Self { config, overlays }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Draw one record. Never fails; problems come back as `Skipped`.
    pub fn render_record<C>(&self, canvas: &mut C, record: &AssociationRecord) -> RenderOutcome
    where
        C: OverlayCanvas<Image = I>,
    {
        match self.try_render_record(canvas, record) {
            Ok(outcome) => outcome,
            Err(e) => RenderOutcome::Skipped(e.to_string()),
        }
    }

    fn try_render_record<C>(&self, canvas: &mut C, record: &AssociationRecord) -> Result<RenderOutcome>
    where
        C: OverlayCanvas<Image = I>,
    {
        let config = &self.config;
        canvas.draw_border(
            &record.car_bbox,
            config.car_color,
            config.car_thickness,
            config.car_line_length_x,
            config.car_line_length_y,
        )?;
        canvas.draw_rectangle(
            PixelRect::from_bbox(&record.plate_bbox),
            config.plate_color,
            config.plate_thickness,
        )?;

        let Some(overlay) = self.overlays.get(&record.car_id) else {
            return Ok(RenderOutcome::Rendered);
        };

        let text_size = canvas.text_size(&overlay.text, config.font_scale, config.font_thickness)?;
        let plan = match plan_overlay(
            &record.car_bbox,
            (overlay.width, overlay.height),
            text_size,
            canvas.size(),
            config,
        ) {
            Ok(plan) => plan,
            Err(reason) => return Ok(RenderOutcome::Skipped(reason)),
        };

        canvas.paste(&overlay.crop, plan.crop)?;
        canvas.draw_rectangle(plan.band, WHITE, -1)?;
        canvas.put_text(
            &overlay.text,
            plan.text_origin,
            config.font_scale,
            BLACK,
            config.font_thickness,
        )?;
        Ok(RenderOutcome::Rendered)
    }

    /// Draw every record of one frame, continuing past skipped records.
    pub fn render_frame<'a, C, R>(&self, canvas: &mut C, frame: u64, records: R) -> Vec<RenderOutcome>
    where
        C: OverlayCanvas<Image = I>,
        R: IntoIterator<Item = &'a AssociationRecord>,
    {
        records
            .into_iter()
            .map(|record| {
                let outcome = self.render_record(canvas, record);
                if let RenderOutcome::Skipped(reason) = &outcome {
                    warn!("Frame {}: skipped overlay for car {}: {}", frame, record.car_id, reason);
                }
                outcome
            })
            .collect()
    }
}

#[cfg(feature = "vision")]
pub use self::opencv_canvas::plate_overlay;

#[cfg(feature = "vision")]
mod opencv_canvas {
    use super::{crop_size, Color, OverlayCanvas, PixelRect, PlateOverlay};
    use crate::config::RenderConfig;
    use crate::error::Result;
    use crate::plate_detection::best_reading::BestReading;

    use opencv::core::{Point, Rect, Scalar, Size};
    use opencv::imgproc::{
        get_text_size, line, put_text, rectangle, resize, FONT_HERSHEY_SIMPLEX, INTER_LINEAR, LINE_8,
    };
    use opencv::prelude::{Mat, MatTraitConst};

    fn scalar((b, g, r): Color) -> Scalar {
        Scalar::new(b as f64, g as f64, r as f64, 0.0)
    }

    fn rect(r: PixelRect) -> Rect {
        Rect::new(r.x, r.y, r.width, r.height)
    }

    impl OverlayCanvas for Mat {
        type Image = Mat;

        fn size(&self) -> (i32, i32) {
            (self.cols(), self.rows())
        }

        fn draw_line(&mut self, from: (i32, i32), to: (i32, i32), color: Color, thickness: i32) -> Result<()> {
            line(
                self,
                Point::new(from.0, from.1),
                Point::new(to.0, to.1),
                scalar(color),
                thickness,
                LINE_8,
                0,
            )?;
            Ok(())
        }

        fn draw_rectangle(&mut self, at: PixelRect, color: Color, thickness: i32) -> Result<()> {
            rectangle(self, rect(at), scalar(color), thickness, LINE_8, 0)?;
            Ok(())
        }

        fn paste(&mut self, image: &Mat, at: PixelRect) -> Result<()> {
            let mut target = Mat::roi(self, rect(at))?;
            image.copy_to(&mut target)?;
            Ok(())
        }

        fn text_size(&self, text: &str, font_scale: f64, thickness: i32) -> Result<(i32, i32)> {
            let mut baseline = 0;
            let size = get_text_size(text, FONT_HERSHEY_SIMPLEX, font_scale, thickness, &mut baseline)?;
            Ok((size.width, size.height))
        }

        fn put_text(
            &mut self,
            text: &str,
            origin: (i32, i32),
            font_scale: f64,
            color: Color,
            thickness: i32,
        ) -> Result<()> {
            put_text(
                self,
                text,
                Point::new(origin.0, origin.1),
                FONT_HERSHEY_SIMPLEX,
                font_scale,
                scalar(color),
                thickness,
                LINE_8,
                false,
            )?;
            Ok(())
        }
    }

    /// Cut the best reading's plate out of `frame` and scale it for pasting.
    /// `None` when the plate box is degenerate or leaves the frame.
    pub fn plate_overlay(
        frame: &Mat,
        best: &BestReading,
        config: &RenderConfig,
    ) -> Result<Option<PlateOverlay<Mat>>> {
        let Some((width, height)) = crop_size(&best.plate_bbox, config.crop_height) else {
            return Ok(None);
        };
        let plate = PixelRect::from_bbox(&best.plate_bbox);
        if !plate.fits_in(frame.cols(), frame.rows()) {
            return Ok(None);
        }

        let cropped = Mat::roi(frame, rect(plate))?;
        let mut crop = Mat::default();
        resize(&cropped, &mut crop, Size::new(width, height), 0.0, 0.0, INTER_LINEAR)?;
        Ok(Some(PlateOverlay {
            text: best.text.clone(),
            crop,
            width,
            height,
        }))
    }
}
