//! Layers and layer groups. A layer owns an RGBA pixel buffer positioned on
//! the canvas by an integer offset, plus an optional grayscale mask that
//! attenuates its alpha during compositing.

use image::{GrayImage, Luma, Rgba, RgbaImage};

use crate::blend::{self, BlendMode};
use crate::geom::Point;

#[derive(Clone, Debug)]
pub struct Layer {
    pub name: String,
    pixels: RgbaImage,
    pub offset: Point,
    pub visible: bool,
    pub locked: bool,
    opacity: f32,
    pub blend_mode: BlendMode,
    mask: Option<GrayImage>,
}

impl Layer {
    /// A transparent layer of the given size.
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self::from_image(name, RgbaImage::new(width, height))
    }

    /// A layer filled with a solid color.
    pub fn filled(name: impl Into<String>, width: u32, height: u32, color: Rgba<u8>) -> Self {
        Self::from_image(name, RgbaImage::from_pixel(width, height, color))
    }

    pub fn from_image(name: impl Into<String>, pixels: RgbaImage) -> Self {
        Self {
            name: name.into(),
            pixels,
            offset: Point::default(),
            visible: true,
            locked: false,
            opacity: 1.0,
            blend_mode: BlendMode::Normal,
            mask: None,
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut RgbaImage {
        &mut self.pixels
    }

    /// Replace the pixel buffer, e.g. after a transform resize.
    pub fn set_pixels(&mut self, pixels: RgbaImage) {
        self.pixels = pixels;
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn set_opacity(&mut self, opacity: f32) {
        self.opacity = opacity.clamp(0.0, 1.0);
    }

    pub fn mask(&self) -> Option<&GrayImage> {
        self.mask.as_ref()
    }

    pub fn mask_mut(&mut self) -> Option<&mut GrayImage> {
        self.mask.as_mut()
    }

    /// Attach a new all-white mask (everything fully opaque). Replaces any
    /// existing mask.
    pub fn create_mask(&mut self) {
        let (w, h) = self.pixels.dimensions();
        self.mask = Some(GrayImage::from_pixel(w, h, Luma([255])));
    }

    pub fn delete_mask(&mut self) {
        self.mask = None;
    }

    /// Bake the mask into the pixel alpha channel and discard it.
    pub fn apply_mask(&mut self) {
        let Some(mask) = self.mask.take() else {
            return;
        };
        let (pw, ph) = self.pixels.dimensions();
        let (mw, mh) = mask.dimensions();
        if mw == 0 || mh == 0 {
            return;
        }
        for y in 0..ph {
            for x in 0..pw {
                let m = mask_sample(&mask, x, y, pw, ph, mw, mh);
                let px = self.pixels.get_pixel_mut(x, y);
                px[3] = ((px[3] as f32) * (m as f32 / 255.0)) as u8;
            }
        }
    }

    /// Composite this layer onto `target`. The layer's pixels are translated
    /// by its offset; anything outside the target clips away. Effective
    /// per-pixel opacity is `layer opacity * mask value`.
    pub fn render(&self, target: &mut RgbaImage) {
        let th = target.height();
        let tw = target.width() as usize;
        let raw: &mut [u8] = target.as_mut();
        for (ty, row) in raw.chunks_exact_mut(tw * 4).enumerate() {
            if ty as u32 >= th {
                break;
            }
            self.render_row(ty as u32, row);
        }
    }

    /// Composite this layer into one raw RGBA row of a target image.
    /// `row` holds `width * 4` bytes of target row `ty`. Used by both the
    /// serial render above and the document's row-parallel composite.
    pub(crate) fn render_row(&self, ty: u32, row: &mut [u8]) {
        if !self.visible {
            return;
        }
        let (pw, ph) = self.pixels.dimensions();
        if pw == 0 || ph == 0 {
            return;
        }
        let py = ty as i64 - self.offset.y as i64;
        if py < 0 || py >= ph as i64 {
            return;
        }
        let py = py as u32;
        let mask_dims = self.mask.as_ref().map(|m| m.dimensions());
        let tw = (row.len() / 4) as u32;

        for tx in 0..tw {
            let px = tx as i64 - self.offset.x as i64;
            if px < 0 || px >= pw as i64 {
                continue;
            }
            let src = *self.pixels.get_pixel(px as u32, py);
            if src[3] == 0 {
                continue;
            }
            let mut opacity = self.opacity;
            if let Some(mask) = &self.mask
                && let Some((mw, mh)) = mask_dims
                && mw > 0
                && mh > 0
            {
                let m = mask_sample(mask, px as u32, py, pw, ph, mw, mh);
                opacity *= m as f32 / 255.0;
            }
            if opacity <= 0.0 {
                continue;
            }
            let i = tx as usize * 4;
            let dst = Rgba([row[i], row[i + 1], row[i + 2], row[i + 3]]);
            let out = blend::blend_pixel(dst, src, self.blend_mode, opacity);
            row[i..i + 4].copy_from_slice(&out.0);
        }
    }
}

/// Nearest-neighbor mask lookup, scaled when the mask and pixel buffer
/// dimensions differ.
fn mask_sample(mask: &GrayImage, x: u32, y: u32, pw: u32, ph: u32, mw: u32, mh: u32) -> u8 {
    let mx = if mw == pw { x } else { (x as u64 * mw as u64 / pw as u64) as u32 };
    let my = if mh == ph { y } else { (y as u64 * mh as u64 / ph as u64) as u32 };
    mask.get_pixel(mx.min(mw - 1), my.min(mh - 1))[0]
}

/// Organizational grouping of layers. Groups never affect compositing;
/// rendering always walks the document's flat layer list.
#[derive(Clone, Debug)]
pub struct LayerGroup {
    pub name: String,
    pub visible: bool,
    pub expanded: bool,
    /// Indices into the owning document's layer list, bottom to top.
    pub layers: Vec<usize>,
    pub groups: Vec<LayerGroup>,
}

impl LayerGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            visible: true,
            expanded: true,
            layers: Vec::new(),
            groups: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_opacity_setter_clamps() {
        let mut layer = Layer::new("l", 2, 2);
        layer.set_opacity(3.0);
        assert_eq!(layer.opacity(), 1.0);
        layer.set_opacity(-1.0);
        assert_eq!(layer.opacity(), 0.0);
    }

    #[test]
    fn test_create_mask_is_all_white() {
        let mut layer = Layer::new("l", 3, 2);
        layer.create_mask();
        let mask = layer.mask().unwrap();
        assert_eq!(mask.dimensions(), (3, 2));
        assert!(mask.pixels().all(|p| p[0] == 255));
    }

    #[test]
    fn test_apply_mask_bakes_alpha_and_discards() {
        let mut layer = Layer::filled("l", 2, 1, Rgba([10, 20, 30, 200]));
        layer.create_mask();
        layer.mask_mut().unwrap().put_pixel(1, 0, Luma([127]));
        layer.apply_mask();
        assert!(layer.mask().is_none());
        assert_eq!(layer.pixels().get_pixel(0, 0)[3], 200);
        let expected = (200.0 * 127.0 / 255.0) as u8;
        assert_eq!(layer.pixels().get_pixel(1, 0)[3], expected);
    }

    #[test]
    fn test_render_respects_offset_and_clips() {
        let mut layer = Layer::filled("l", 2, 2, Rgba([255, 0, 0, 255]));
        layer.offset = Point::new(3, 3);
        let mut target = RgbaImage::new(4, 4);
        layer.render(&mut target);
        // Only the (3,3) corner of the layer lands inside the target.
        assert_eq!(*target.get_pixel(3, 3), Rgba([255, 0, 0, 255]));
        assert_eq!(*target.get_pixel(2, 2), Rgba([0, 0, 0, 0]));
        assert_eq!(*target.get_pixel(0, 0), Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn test_invisible_layer_renders_nothing() {
        let mut layer = Layer::filled("l", 2, 2, Rgba([255, 0, 0, 255]));
        layer.visible = false;
        let mut target = RgbaImage::new(2, 2);
        layer.render(&mut target);
        assert!(target.pixels().all(|p| p[3] == 0));
    }

    #[test]
    fn test_mask_attenuates_render() {
        let mut layer = Layer::filled("l", 1, 1, Rgba([0, 0, 255, 255]));
        layer.create_mask();
        layer.mask_mut().unwrap().put_pixel(0, 0, Luma([0]));
        let mut target = RgbaImage::from_pixel(1, 1, Rgba([255, 0, 0, 255]));
        layer.render(&mut target);
        // Fully masked pixel leaves the target untouched.
        assert_eq!(*target.get_pixel(0, 0), Rgba([255, 0, 0, 255]));
    }
}
