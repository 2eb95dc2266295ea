//! Bounded snapshot undo history. Each state is a full deep copy of the
//! document's layer stack; pushing while undone truncates the redo tail,
//! and the stack evicts its oldest state past the cap.

use crate::document::Document;
use crate::layer::{Layer, LayerGroup};

pub const MAX_HISTORY_STATES: usize = 50;

/// One saved document state. Layers are deep copies, masks included.
#[derive(Clone, Debug)]
pub struct HistoryState {
    layers: Vec<Layer>,
    groups: Vec<LayerGroup>,
    active_layer: Option<usize>,
    description: String,
}

impl HistoryState {
    fn capture(document: &Document, description: &str) -> Self {
        Self {
            layers: document.layers().to_vec(),
            groups: document.groups().to_vec(),
            active_layer: document.active_index(),
            description: description.to_string(),
        }
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn groups(&self) -> &[LayerGroup] {
        &self.groups
    }

    pub fn active_layer(&self) -> Option<usize> {
        self.active_layer
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

type Observer = Box<dyn FnMut(bool, bool)>;

#[derive(Default)]
pub struct HistoryManager {
    states: Vec<HistoryState>,
    /// Index of the current state. Only meaningful while `states` is
    /// non-empty.
    current: usize,
    observers: Vec<Observer>,
}

impl HistoryManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn can_undo(&self) -> bool {
        !self.states.is_empty() && self.current > 0
    }

    pub fn can_redo(&self) -> bool {
        !self.states.is_empty() && self.current < self.states.len() - 1
    }

    pub fn current_index(&self) -> Option<usize> {
        if self.states.is_empty() { None } else { Some(self.current) }
    }

    /// Snapshot descriptions, oldest to newest.
    pub fn descriptions(&self) -> Vec<&str> {
        self.states.iter().map(|s| s.description.as_str()).collect()
    }

    pub fn current_description(&self) -> Option<&str> {
        self.states.get(self.current).map(|s| s.description.as_str())
    }

    /// Observers are invoked with `(can_undo, can_redo)` after every stack
    /// mutation.
    pub fn add_observer(&mut self, observer: Observer) {
        self.observers.push(observer);
    }

    /// Snapshot the document. Any redo states beyond the current index are
    /// discarded first; the oldest state is evicted once the stack exceeds
    /// [`MAX_HISTORY_STATES`].
    pub fn push_state(&mut self, document: &Document, description: &str) {
        if !self.states.is_empty() {
            self.states.truncate(self.current + 1);
        }
        self.states.push(HistoryState::capture(document, description));
        self.current = self.states.len() - 1;
        if self.states.len() > MAX_HISTORY_STATES {
            self.states.remove(0);
            self.current -= 1;
        }
        self.notify();
    }

    /// Step back, returning the snapshot to restore. `None` when already at
    /// the oldest state.
    pub fn undo(&mut self) -> Option<&HistoryState> {
        if !self.can_undo() {
            return None;
        }
        self.current -= 1;
        self.notify();
        self.states.get(self.current)
    }

    /// Step forward, returning the snapshot to restore. `None` when already
    /// at the newest state.
    pub fn redo(&mut self) -> Option<&HistoryState> {
        if !self.can_redo() {
            return None;
        }
        self.current += 1;
        self.notify();
        self.states.get(self.current)
    }

    pub fn clear(&mut self) {
        self.states.clear();
        self.current = 0;
        self.notify();
    }

    fn notify(&mut self) {
        let undo = self.can_undo();
        let redo = self.can_redo();
        for observer in &mut self.observers {
            observer(undo, redo);
        }
    }
}
