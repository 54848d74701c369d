//! Drawing detections onto a copy of the source image.

use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;

use crate::{fonts::LabelFont, Detection};

pub const BOX_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
pub const TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);
/// Outline thickness in pixels, drawn inward from the box edge.
pub const BOX_STROKE: i32 = 3;

// Gap between the label background and the top of the box.
const LABEL_GAP: i32 = 5;

/// `"{label} {percent}%"` with one decimal.
pub fn label_text(detection: &Detection) -> String {
    format!("{} {:.1}%", detection.label, detection.confidence_percent())
}

/// Top-left corner and size of the label background for a detection.
///
/// The label sits directly above the box and is pushed down to `y = 0` when
/// there is no room above.
pub fn label_rect(detection: &Detection, font: &LabelFont) -> Rect {
    let (text_width, text_height) = font.text_size(&label_text(detection));
    let [x1, y1, _, _] = pixel_corners(detection);

    let label_y = (y1 - text_height as i32 - LABEL_GAP).max(0);
    Rect::at(x1, label_y).of_size(text_width + 5, text_height + 3)
}

/// Render every detection onto a fresh RGB copy of `img`.
pub fn annotate(img: &DynamicImage, detections: &[Detection], font: &LabelFont) -> RgbImage {
    let mut canvas = img.to_rgb8();

    for detection in detections {
        draw_box(&mut canvas, detection);

        let label = label_rect(detection, font);
        draw_filled_rect_mut(&mut canvas, label, BOX_COLOR);

        if let LabelFont::Loaded { font, scale } = font {
            draw_text_mut(
                &mut canvas,
                TEXT_COLOR,
                label.left() + 2,
                label.top() + 1,
                *scale,
                font,
                &label_text(detection),
            );
        }
    }

    canvas
}

fn draw_box(canvas: &mut RgbImage, detection: &Detection) {
    let [x1, y1, x2, y2] = pixel_corners(detection);
    let (width, height) = (x2 - x1 + 1, y2 - y1 + 1);

    for inset in 0..BOX_STROKE {
        let (w, h) = (width - 2 * inset, height - 2 * inset);
        if w <= 0 || h <= 0 {
            break;
        }
        let rect = Rect::at(x1 + inset, y1 + inset).of_size(w as u32, h as u32);
        draw_hollow_rect_mut(canvas, rect, BOX_COLOR);
    }
}

fn pixel_corners(detection: &Detection) -> [i32; 4] {
    detection.corners().map(|c| c.round() as i32)
}
