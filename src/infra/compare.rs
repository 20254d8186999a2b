//! Pixel comparison between two snapshot images.
//!
//! Counts differing pixels and composes a review artifact laid out
//! left-to-right as base, current, difference mask. The composition is a
//! pure function of the two inputs, so identical inputs always produce
//! byte-identical artifacts.

use crate::domain::CompareError;
use image::{ImageFormat, Rgba, RgbaImage};
use std::path::Path;

const MASK_MATCH: Rgba<u8> = Rgba([255, 255, 255, 255]);
const MASK_DIFF: Rgba<u8> = Rgba([204, 0, 0, 255]);

/// Outcome of comparing one pair of images.
#[derive(Debug)]
pub struct Comparison {
    /// Number of differing pixels over the union of both extents; pixels
    /// outside the shared region always count as differing.
    pub differing_pixels: u64,
    composed: RgbaImage,
}

impl Comparison {
    /// Write the composed artifact as PNG.
    pub fn write_artifact(&self, path: &Path) -> Result<(), CompareError> {
        self.composed
            .save_with_format(path, ImageFormat::Png)
            .map_err(|e| CompareError::Artifact {
                path: path.display().to_string(),
                source: e.into(),
            })
    }
}

/// Compare two images pixel by pixel.
pub fn compare_images(base: &Path, current: &Path) -> Result<Comparison, CompareError> {
    let base_img = load(base)?;
    let current_img = load(current)?;

    let (bw, bh) = base_img.dimensions();
    let (cw, ch) = current_img.dimensions();
    let union_w = bw.max(cw);
    let union_h = bh.max(ch);

    let mut differing = 0u64;
    let mut mask = RgbaImage::from_pixel(union_w, union_h, MASK_MATCH);
    for y in 0..union_h {
        for x in 0..union_w {
            let in_base = x < bw && y < bh;
            let in_current = x < cw && y < ch;
            let same = in_base
                && in_current
                && base_img.get_pixel(x, y) == current_img.get_pixel(x, y);
            if !same {
                differing += 1;
                mask.put_pixel(x, y, MASK_DIFF);
            }
        }
    }

    // Compose base | current | mask on one canvas.
    let mut composed = RgbaImage::from_pixel(bw + cw + union_w, union_h, MASK_MATCH);
    blit(&mut composed, &base_img, 0);
    blit(&mut composed, &current_img, bw);
    blit(&mut composed, &mask, bw + cw);

    Ok(Comparison {
        differing_pixels: differing,
        composed,
    })
}

fn blit(canvas: &mut RgbaImage, source: &RgbaImage, offset_x: u32) {
    for (x, y, pixel) in source.enumerate_pixels() {
        canvas.put_pixel(offset_x + x, y, *pixel);
    }
}

fn load(path: &Path) -> Result<RgbaImage, CompareError> {
    image::open(path)
        .map(|img| img.to_rgba8())
        .map_err(|e| CompareError::Image {
            path: path.display().to_string(),
            source: e.into(),
        })
}
