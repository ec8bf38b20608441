//! Frame input adaptation: ROI pixel blocks and their reduction to one reflectance sample.

use std::time::Duration;

use crate::config::RoiConfig;

/// Interleaved 8-bit pixels in BGR order (3 channels) or grayscale (1 channel).
#[derive(Debug, Clone, PartialEq)]
pub struct RoiPixels {
    pub width: usize,
    pub height: usize,
    pub channels: usize,
    pub data: Vec<u8>,
}

impl RoiPixels {
    pub fn new(width: usize, height: usize, channels: usize, data: Vec<u8>) -> Option<Self> {
        if width == 0 || height == 0 || !(channels == 1 || channels == 3) {
            return None;
        }
        if data.len() != width * height * channels {
            return None;
        }
        Some(Self {
            width,
            height,
            channels,
            data,
        })
    }

    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    /// Mean of the green channel; grayscale blocks use their only channel.
    pub fn green_mean(&self) -> f64 {
        let channel = if self.channels == 3 { 1 } else { 0 };
        let sum: u64 = self
            .data
            .iter()
            .skip(channel)
            .step_by(self.channels)
            .map(|&v| v as u64)
            .sum();
        sum as f64 / self.pixel_count() as f64
    }

    /// Mean luma, each pixel converted with 0.299 R + 0.587 G + 0.114 B and rounded.
    pub fn gray_mean(&self) -> f64 {
        if self.channels == 1 {
            return self.green_mean();
        }
        let sum: f64 = self
            .data
            .chunks_exact(3)
            .map(|px| {
                let (b, g, r) = (px[0] as f64, px[1] as f64, px[2] as f64);
                (0.299 * r + 0.587 * g + 0.114 * b).round()
            })
            .sum();
        sum / self.pixel_count() as f64
    }
}

/// A region as delivered by the capture collaborator: raw pixels or an already reduced mean.
#[derive(Debug, Clone, PartialEq)]
pub enum RoiInput {
    Pixels(RoiPixels),
    Mean(f64),
}

impl RoiInput {
    pub fn pulse_sample(&self) -> f64 {
        match self {
            RoiInput::Pixels(pixels) => pixels.green_mean(),
            RoiInput::Mean(value) => *value,
        }
    }

    pub fn breath_sample(&self) -> f64 {
        match self {
            RoiInput::Pixels(pixels) => pixels.gray_mean(),
            RoiInput::Mean(value) => *value,
        }
    }
}

/// One captured frame. `timestamp` is measured on the source's own clock.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub timestamp: Duration,
    /// Forehead region; `None` when no face was detected.
    pub pulse_roi: Option<RoiInput>,
    /// Lower-face region.
    pub breath_roi: Option<RoiInput>,
}

impl Frame {
    pub fn no_face(timestamp: Duration) -> Self {
        Self {
            timestamp,
            pulse_roi: None,
            breath_roi: None,
        }
    }

    pub fn from_means(timestamp: Duration, pulse: Option<f64>, breath: Option<f64>) -> Self {
        Self {
            timestamp,
            pulse_roi: pulse.map(RoiInput::Mean),
            breath_roi: breath.map(RoiInput::Mean),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

/// Face bounding box reported by the detection collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceBox {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl FaceBox {
    /// Top band of the face, full width.
    pub fn forehead(&self, roi: &RoiConfig) -> Rect {
        let end = (self.height as f64 * roi.forehead_fraction) as usize;
        Rect {
            x: self.x,
            y: self.y,
            width: self.width,
            height: end,
        }
    }

    /// From `lower_face_start` of the height down to the bottom of the box.
    pub fn lower_face(&self, roi: &RoiConfig) -> Rect {
        let start = (self.height as f64 * roi.lower_face_start) as usize;
        Rect {
            x: self.x,
            y: self.y + start,
            width: self.width,
            height: self.height.saturating_sub(start),
        }
    }
}

/// Full BGR video frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl Image {
    /// `None` unless `data` holds exactly `width * height` BGR pixels.
    pub fn new(width: usize, height: usize, data: Vec<u8>) -> Option<Self> {
        if width == 0 || height == 0 || data.len() != width * height * 3 {
            return None;
        }
        Some(Self {
            width,
            height,
            data,
        })
    }

    /// Copies the part of `rect` that lies inside the image; `None` if nothing does.
    pub fn crop(&self, rect: Rect) -> Option<RoiPixels> {
        let x_end = (rect.x + rect.width).min(self.width);
        let y_end = (rect.y + rect.height).min(self.height);
        if rect.x >= x_end || rect.y >= y_end {
            return None;
        }

        let width = x_end - rect.x;
        let height = y_end - rect.y;
        let mut data = Vec::with_capacity(width * height * 3);
        for row in rect.y..y_end {
            let start = (row * self.width + rect.x) * 3;
            data.extend_from_slice(self.data.get(start..start + width * 3)?);
        }
        RoiPixels::new(width, height, 3, data)
    }

    /// Builds the per-frame input from the first detected face, if any.
    pub fn frame_for_faces(&self, timestamp: Duration, faces: &[FaceBox], roi: &RoiConfig) -> Frame {
        match faces.first() {
            Some(face) => Frame {
                timestamp,
                pulse_roi: self.crop(face.forehead(roi)).map(RoiInput::Pixels),
                breath_roi: self.crop(face.lower_face(roi)).map(RoiInput::Pixels),
            },
            None => Frame::no_face(timestamp),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_image(width: usize, height: usize, bgr: [u8; 3]) -> Image {
        let data = (0..width * height).flat_map(|_| bgr).collect();
        Image::new(width, height, data).unwrap()
    }

    #[test]
    fn image_rejects_mismatched_buffer() {
        assert!(Image::new(4, 4, vec![0; 47]).is_none());
        assert!(Image::new(0, 4, vec![]).is_none());
        let image = Image::new(2, 3, vec![0; 18]).unwrap();
        let whole = image
            .crop(Rect {
                x: 0,
                y: 0,
                width: 10,
                height: 10,
            })
            .unwrap();
        assert_eq!((whole.width, whole.height), (2, 3));
    }

    #[test]
    fn green_mean_reads_middle_channel() {
        let pixels = RoiPixels::new(2, 1, 3, vec![10, 100, 200, 20, 50, 210]).unwrap();
        assert_eq!(pixels.green_mean(), 75.0);
    }

    #[test]
    fn gray_mean_uses_luma_weights() {
        let pixels = RoiPixels::new(1, 1, 3, vec![0, 0, 255]).unwrap();
        assert_eq!(pixels.gray_mean(), (0.299f64 * 255.0).round());
        let gray = RoiPixels::new(2, 1, 1, vec![10, 30]).unwrap();
        assert_eq!(gray.gray_mean(), 20.0);
    }

    #[test]
    fn rejects_bad_shapes() {
        assert!(RoiPixels::new(2, 2, 3, vec![0; 11]).is_none());
        assert!(RoiPixels::new(0, 2, 3, vec![]).is_none());
        assert!(RoiPixels::new(1, 1, 2, vec![0, 0]).is_none());
    }

    #[test]
    fn face_split_matches_fractions() {
        let face = FaceBox {
            x: 10,
            y: 20,
            width: 100,
            height: 100,
        };
        let roi = RoiConfig::default();
        assert_eq!(
            face.forehead(&roi),
            Rect {
                x: 10,
                y: 20,
                width: 100,
                height: 15
            }
        );
        assert_eq!(
            face.lower_face(&roi),
            Rect {
                x: 10,
                y: 90,
                width: 100,
                height: 30
            }
        );
    }

    #[test]
    fn crop_clamps_to_image() {
        let image = solid_image(4, 4, [1, 2, 3]);
        let roi = image
            .crop(Rect {
                x: 2,
                y: 2,
                width: 10,
                height: 10,
            })
            .unwrap();
        assert_eq!((roi.width, roi.height), (2, 2));
        assert_eq!(roi.green_mean(), 2.0);
        assert!(image
            .crop(Rect {
                x: 5,
                y: 0,
                width: 1,
                height: 1
            })
            .is_none());
    }

    #[test]
    fn frame_without_faces_has_no_rois() {
        let image = solid_image(8, 8, [0, 128, 0]);
        let frame = image.frame_for_faces(Duration::ZERO, &[], &RoiConfig::default());
        assert_eq!(frame, Frame::no_face(Duration::ZERO));

        let face = FaceBox {
            x: 0,
            y: 0,
            width: 8,
            height: 8,
        };
        let frame = image.frame_for_faces(Duration::ZERO, &[face], &RoiConfig::default());
        // 8 * 0.15 truncates to a single row.
        let pulse = frame.pulse_roi.unwrap();
        assert_eq!(pulse.pulse_sample(), 128.0);
        assert!(frame.breath_roi.is_some());
    }
}
