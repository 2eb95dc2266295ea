//! The editing session: one document, its history, and the tool set, wired
//! together behind the pointer/key event boundary a frontend drives.
//!
//! History snapshots are taken on pointer release, once per completed
//! gesture, using the description the tool reports.

use image::{Rgba, RgbaImage};

use crate::document::Document;
use crate::history::HistoryManager;
use crate::layer::Layer;
use crate::tools::{Key, PointerEvent, ToolKind, ToolSet};

type ChangeListener = Box<dyn FnMut()>;

pub struct EditorSession {
    pub document: Document,
    pub history: HistoryManager,
    pub tools: ToolSet,
    change_listeners: Vec<ChangeListener>,
}

impl EditorSession {
    /// A fresh document with the baseline state already in history, so the
    /// first gesture can be undone back to the blank canvas.
    pub fn new(width: u32, height: u32, background: Rgba<u8>) -> Self {
        let document = Document::new(width, height, background);
        let mut history = HistoryManager::new();
        history.push_state(&document, "New Document");
        Self {
            document,
            history,
            tools: ToolSet::new(),
            change_listeners: Vec::new(),
        }
    }

    /// A session editing a loaded image.
    pub fn from_image(image: RgbaImage) -> Self {
        let document = Document::from_image(image);
        let mut history = HistoryManager::new();
        history.push_state(&document, "Load Image");
        Self {
            document,
            history,
            tools: ToolSet::new(),
            change_listeners: Vec::new(),
        }
    }

    pub fn active_tool(&self) -> ToolKind {
        self.tools.active_tool()
    }

    pub fn set_active_tool(&mut self, kind: ToolKind) {
        self.tools.set_active_tool(kind);
    }

    /// Invoked after any gesture or history step that changed the composite.
    pub fn add_change_listener(&mut self, listener: ChangeListener) {
        self.change_listeners.push(listener);
    }

    // -- event boundary (positions already in image space) -------------

    pub fn pointer_pressed(&mut self, event: PointerEvent) {
        self.tools.on_press(&mut self.document, &event);
    }

    pub fn pointer_moved(&mut self, event: PointerEvent) {
        self.tools.on_move(&mut self.document, &event);
    }

    pub fn pointer_released(&mut self, event: PointerEvent) {
        if let Some(description) = self.tools.on_release(&mut self.document, &event) {
            self.history.push_state(&self.document, description);
            self.notify_changed();
        }
    }

    pub fn key_pressed(&mut self, key: Key) {
        self.tools.on_key(key);
    }

    // -- layer and history operations ----------------------------------

    /// Add a transparent canvas-sized layer on top and record it.
    pub fn add_layer(&mut self, name: &str) {
        let layer = Layer::new(name, self.document.width(), self.document.height());
        self.document.add_layer(layer);
        self.history.push_state(&self.document, "Add Layer");
        self.notify_changed();
    }

    /// Remove the layer at `index` if the stack allows it, recording the
    /// change. Returns whether a layer was removed.
    pub fn remove_layer(&mut self, index: usize) -> bool {
        if self.document.remove_layer(index) {
            self.history.push_state(&self.document, "Remove Layer");
            self.notify_changed();
            true
        } else {
            false
        }
    }

    pub fn undo(&mut self) -> bool {
        if self.document.undo(&mut self.history) {
            self.notify_changed();
            true
        } else {
            false
        }
    }

    pub fn redo(&mut self) -> bool {
        if self.document.redo(&mut self.history) {
            self.notify_changed();
            true
        } else {
            false
        }
    }

    pub fn render(&self) -> RgbaImage {
        self.document.render()
    }

    fn notify_changed(&mut self) {
        for listener in &mut self.change_listeners {
            listener();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    use std::cell::Cell;
    use std::rc::Rc;

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

    fn session_with_paint_layer() -> EditorSession {
        let mut session = EditorSession::new(32, 32, WHITE);
        session.add_layer("Paint");
        session
    }

    #[test]
    fn test_new_session_seeds_history() {
        let session = EditorSession::new(16, 16, WHITE);
        assert_eq!(session.history.len(), 1);
        assert_eq!(session.history.current_description(), Some("New Document"));
        assert!(!session.history.can_undo());
    }

    #[test]
    fn test_release_pushes_one_snapshot_per_gesture() {
        let mut session = session_with_paint_layer();
        assert_eq!(session.history.len(), 2);
        session.pointer_pressed(PointerEvent::primary(5, 5));
        session.pointer_moved(PointerEvent::primary(10, 10));
        assert_eq!(session.history.len(), 2); // nothing until release
        session.pointer_released(PointerEvent::primary(10, 10));
        assert_eq!(session.history.len(), 3);
        assert_eq!(session.history.current_description(), Some("Brush Stroke"));
    }

    #[test]
    fn test_undo_restores_pixels_and_redo_reapplies() {
        let mut session = session_with_paint_layer();
        let blank = session.render();
        session.pointer_pressed(PointerEvent::primary(16, 16));
        session.pointer_released(PointerEvent::primary(16, 16));
        let painted = session.render();
        assert_ne!(blank, painted);

        assert!(session.undo());
        assert_eq!(session.render(), blank);
        assert!(session.redo());
        assert_eq!(session.render(), painted);
        assert!(!session.redo());
    }

    #[test]
    fn test_gesture_after_undo_discards_redo() {
        let mut session = session_with_paint_layer();
        session.pointer_pressed(PointerEvent::primary(4, 4));
        session.pointer_released(PointerEvent::primary(4, 4));
        assert!(session.undo());
        assert!(session.history.can_redo());
        session.pointer_pressed(PointerEvent::primary(20, 20));
        session.pointer_released(PointerEvent::primary(20, 20));
        assert!(!session.history.can_redo());
    }

    #[test]
    fn test_change_listener_fires_on_gesture_and_undo() {
        let mut session = session_with_paint_layer();
        let count = Rc::new(Cell::new(0u32));
        let sink = count.clone();
        session.add_change_listener(Box::new(move || sink.set(sink.get() + 1)));
        session.pointer_pressed(PointerEvent::primary(8, 8));
        session.pointer_released(PointerEvent::primary(8, 8));
        assert_eq!(count.get(), 1);
        session.undo();
        assert_eq!(count.get(), 2);
        session.undo(); // at the baseline already after add_layer undo
        session.undo();
        assert_eq!(count.get(), 3);
    }

    #[test]
    fn test_remove_layer_refuses_last() {
        let mut session = EditorSession::new(8, 8, WHITE);
        assert!(!session.remove_layer(0));
        assert_eq!(session.history.len(), 1);
    }

    #[test]
    fn test_from_image_session() {
        let img = RgbaImage::from_pixel(5, 4, Rgba([1, 2, 3, 255]));
        let session = EditorSession::from_image(img.clone());
        assert_eq!(session.document.layer_count(), 1);
        assert!(session.document.layer(0).unwrap().locked);
        assert_eq!(session.render(), img);
        assert_eq!(session.history.current_description(), Some("Load Image"));
    }
}
