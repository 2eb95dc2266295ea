//! The document: a canvas size, a background color, and a flat stack of
//! layers composited bottom to top.

use image::{Rgba, RgbaImage};
use rayon::prelude::*;

use crate::history::{HistoryManager, HistoryState};
use crate::layer::{Layer, LayerGroup};

pub const DEFAULT_BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);

#[derive(Clone, Debug)]
pub struct Document {
    width: u32,
    height: u32,
    pub background_color: Rgba<u8>,
    layers: Vec<Layer>,
    groups: Vec<LayerGroup>,
    active_layer: Option<usize>,
}

impl Document {
    /// A new document with a single locked background layer filled with the
    /// background color. That layer is active.
    pub fn new(width: u32, height: u32, background_color: Rgba<u8>) -> Self {
        let mut background = Layer::filled("Background", width, height, background_color);
        background.locked = true;
        Self {
            width,
            height,
            background_color,
            layers: vec![background],
            groups: Vec::new(),
            active_layer: Some(0),
        }
    }

    /// A document sized to `image`, holding it as a locked background layer.
    pub fn from_image(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        let mut background = Layer::from_image("Background", image);
        background.locked = true;
        Self {
            width,
            height,
            background_color: DEFAULT_BACKGROUND,
            layers: vec![background],
            groups: Vec::new(),
            active_layer: Some(0),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Change the canvas size. Layer buffers are untouched; they simply clip
    /// differently against the new canvas.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    // ------------------------------------------------------------------
    // Layer stack
    // ------------------------------------------------------------------

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn layer(&self, index: usize) -> Option<&Layer> {
        self.layers.get(index)
    }

    pub fn layer_mut(&mut self, index: usize) -> Option<&mut Layer> {
        self.layers.get_mut(index)
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active_layer
    }

    pub fn active_layer(&self) -> Option<&Layer> {
        self.layers.get(self.active_layer?)
    }

    pub fn active_layer_mut(&mut self) -> Option<&mut Layer> {
        let index = self.active_layer?;
        self.layers.get_mut(index)
    }

    /// Out-of-range indices are ignored.
    pub fn set_active_layer(&mut self, index: usize) {
        if index < self.layers.len() {
            self.active_layer = Some(index);
        }
    }

    /// Append on top of the stack; the new layer becomes active.
    pub fn add_layer(&mut self, layer: Layer) {
        self.layers.push(layer);
        self.active_layer = Some(self.layers.len() - 1);
    }

    /// Insert at `index` (clamped to the top); the new layer becomes active.
    pub fn insert_layer(&mut self, index: usize, layer: Layer) {
        let index = index.min(self.layers.len());
        self.layers.insert(index, layer);
        self.active_layer = Some(index);
    }

    /// Remove the layer at `index`. Refuses when it is the last remaining
    /// layer or the index is out of range. Returns whether a layer was
    /// removed.
    pub fn remove_layer(&mut self, index: usize) -> bool {
        if self.layers.len() <= 1 || index >= self.layers.len() {
            return false;
        }
        self.layers.remove(index);
        self.active_layer = match self.active_layer {
            Some(a) if a == index => Some(self.layers.len() - 1),
            Some(a) if a > index => Some(a - 1),
            other => other,
        };
        true
    }

    /// Reorder a layer within the stack, keeping the active layer's identity.
    /// Out-of-range indices make this a no-op.
    pub fn move_layer(&mut self, from: usize, to: usize) {
        if from >= self.layers.len() || to >= self.layers.len() || from == to {
            return;
        }
        let layer = self.layers.remove(from);
        self.layers.insert(to, layer);
        self.active_layer = self.active_layer.map(|a| {
            if a == from {
                to
            } else if from < a && a <= to {
                a - 1
            } else if to <= a && a < from {
                a + 1
            } else {
                a
            }
        });
    }

    // ------------------------------------------------------------------
    // Groups (organizational only; never affect compositing)
    // ------------------------------------------------------------------

    pub fn groups(&self) -> &[LayerGroup] {
        &self.groups
    }

    pub fn groups_mut(&mut self) -> &mut Vec<LayerGroup> {
        &mut self.groups
    }

    pub fn add_group(&mut self, group: LayerGroup) {
        self.groups.push(group);
    }

    // ------------------------------------------------------------------
    // Compositing
    // ------------------------------------------------------------------

    /// Flatten the document at its own size.
    pub fn render(&self) -> RgbaImage {
        self.render_to_image(self.width, self.height)
    }

    /// Flatten into a buffer of the given size: fill with the background
    /// color, then composite every layer bottom to top. Rows are processed
    /// in parallel.
    pub fn render_to_image(&self, width: u32, height: u32) -> RgbaImage {
        let mut out = RgbaImage::from_pixel(width, height, self.background_color);
        if width == 0 || height == 0 {
            return out;
        }
        let row_bytes = width as usize * 4;
        let raw: &mut [u8] = out.as_mut();
        raw.par_chunks_mut(row_bytes)
            .enumerate()
            .for_each(|(ty, row)| {
                for layer in &self.layers {
                    layer.render_row(ty as u32, row);
                }
            });
        out
    }

    // ------------------------------------------------------------------
    // History integration
    // ------------------------------------------------------------------

    /// Step back one history state. Returns whether anything changed.
    pub fn undo(&mut self, history: &mut HistoryManager) -> bool {
        if let Some(state) = history.undo() {
            self.restore(state);
            true
        } else {
            false
        }
    }

    /// Step forward one history state. Returns whether anything changed.
    pub fn redo(&mut self, history: &mut HistoryManager) -> bool {
        if let Some(state) = history.redo() {
            self.restore(state);
            true
        } else {
            false
        }
    }

    /// Replace this document's content with a snapshot's. The document's
    /// size and background are not part of the snapshot.
    pub fn restore(&mut self, state: &HistoryState) {
        self.layers = state.layers().to_vec();
        self.groups = state.groups().to_vec();
        self.active_layer = match state.active_layer() {
            Some(i) if !self.layers.is_empty() => Some(i.min(self.layers.len() - 1)),
            _ => None,
        };
    }
}
