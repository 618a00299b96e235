use image::{imageops, Rgb, RgbImage};

/// The mapping between a frame and its letterboxed copy: scaled to fit the model input while
/// keeping the aspect ratio, centred and padded with black.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
  scale: f32,
  pad_x: u32,
  pad_y: u32,
  width: u32,
  height: u32,
}

impl Letterbox {
  pub fn new(source_width: u32, source_height: u32, target_width: u32, target_height: u32) -> Letterbox {
    let scale = (target_width as f32 / source_width as f32).min(target_height as f32 / source_height as f32);
    let width = ((source_width as f32 * scale).round() as u32).clamp(1, target_width);
    let height = ((source_height as f32 * scale).round() as u32).clamp(1, target_height);

    Letterbox {
      scale,
      pad_x: (target_width - width) / 2,
      pad_y: (target_height - height) / 2,
      width,
      height,
    }
  }

  /// Translate a coordinate of the letterboxed image back to the source frame.
  pub fn to_source(&self, x: f32, y: f32) -> (f32, f32) {
    (
      (x - self.pad_x as f32) / self.scale,
      (y - self.pad_y as f32) / self.scale,
    )
  }
}

/// Resize `frame` into a `target_width` x `target_height` canvas without distorting it.
pub fn letterbox(frame: &RgbImage, target_width: u32, target_height: u32) -> (RgbImage, Letterbox) {
  let letterbox = Letterbox::new(frame.width(), frame.height(), target_width, target_height);

  let resized = imageops::resize(
    frame,
    letterbox.width,
    letterbox.height,
    imageops::FilterType::Triangle,
  );
  let mut canvas = RgbImage::from_pixel(target_width, target_height, Rgb([0, 0, 0]));
  imageops::replace(&mut canvas, &resized, letterbox.pad_x as i64, letterbox.pad_y as i64);

  (canvas, letterbox)
}

/// Crop the region `(x, y, width, height)` clamped to the frame and resize it to the model input.
///
/// Returns `None` when nothing of the region lies inside the frame.
pub fn crop_resized(
  frame: &RgbImage,
  (x, y, width, height): (f32, f32, f32, f32),
  target_width: u32,
  target_height: u32,
) -> Option<RgbImage> {
  let x0 = x.clamp(0.0, frame.width() as f32) as u32;
  let y0 = y.clamp(0.0, frame.height() as f32) as u32;
  let x1 = (x + width).clamp(0.0, frame.width() as f32) as u32;
  let y1 = (y + height).clamp(0.0, frame.height() as f32) as u32;
  if x1 <= x0 || y1 <= y0 {
    return None;
  }

  let crop = imageops::crop_imm(frame, x0, y0, x1 - x0, y1 - y0).to_image();
  Some(imageops::resize(
    &crop,
    target_width,
    target_height,
    imageops::FilterType::Triangle,
  ))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[derive(Debug)]
  struct Case {
    x: f32,
    y: f32,
    source_width: u32,
    source_height: u32,
    target_width: u32,
    target_height: u32,
    expected_x: f32,
    expected_y: f32,
  }

  #[test]
  fn test_to_source() {
    let cases = vec![
      // square frame, no padding
      Case {
        x: 320.0,
        y: 320.0,
        source_width: 1280,
        source_height: 1280,
        target_width: 640,
        target_height: 640,
        expected_x: 640.0,
        expected_y: 640.0,
      },
      // wide frame, top left of the content
      Case {
        x: 0.0,
        y: 140.0,
        source_width: 1920,
        source_height: 1080,
        target_width: 640,
        target_height: 640,
        expected_x: 0.0,
        expected_y: 0.0,
      },
      // wide frame, bottom right of the content
      Case {
        x: 640.0,
        y: 500.0,
        source_width: 1920,
        source_height: 1080,
        target_width: 640,
        target_height: 640,
        expected_x: 1920.0,
        expected_y: 1080.0,
      },
      // tall frame, middle
      Case {
        x: 320.0,
        y: 320.0,
        source_width: 768,
        source_height: 1024,
        target_width: 640,
        target_height: 640,
        expected_x: 384.0,
        expected_y: 512.0,
      },
      // tall frame, top left of the content
      Case {
        x: 80.0,
        y: 0.0,
        source_width: 768,
        source_height: 1024,
        target_width: 640,
        target_height: 640,
        expected_x: 0.0,
        expected_y: 0.0,
      },
    ];

    for test_case in cases {
      let letterbox = Letterbox::new(
        test_case.source_width,
        test_case.source_height,
        test_case.target_width,
        test_case.target_height,
      );
      let (x, y) = letterbox.to_source(test_case.x, test_case.y);
      assert!((x - test_case.expected_x).abs() < 1e-3, "to_source: {test_case:?} gave {x}");
      assert!((y - test_case.expected_y).abs() < 1e-3, "to_source: {test_case:?} gave {y}");
    }
  }

  #[test]
  fn test_letterbox_pads_with_black() {
    let frame = RgbImage::from_pixel(200, 100, Rgb([255, 255, 255]));
    let (boxed, _) = letterbox(&frame, 64, 64);

    assert_eq!(boxed.dimensions(), (64, 64));
    assert_eq!(boxed.get_pixel(32, 2), &Rgb([0, 0, 0]));
    assert_eq!(boxed.get_pixel(32, 32), &Rgb([255, 255, 255]));
    assert_eq!(boxed.get_pixel(32, 61), &Rgb([0, 0, 0]));
  }

  #[test]
  fn test_crop_resized() {
    let frame = RgbImage::from_pixel(100, 100, Rgb([10, 20, 30]));

    let crop = crop_resized(&frame, (90.0, 90.0, 40.0, 40.0), 16, 8).unwrap();
    assert_eq!(crop.dimensions(), (16, 8));
    assert_eq!(crop.get_pixel(0, 0), &Rgb([10, 20, 30]));

    assert!(crop_resized(&frame, (120.0, 0.0, 10.0, 10.0), 16, 8).is_none());
  }
}
