//! Tools and pointer interaction. The active tool is a plain enum and all
//! dispatch is a `match` in [`ToolSet`]; each tool keeps its transient
//! gesture state in its own struct.
//!
//! Positions in [`PointerEvent`] are already mapped to image space. Tools
//! only mutate the active layer, and only while it is unlocked; release
//! handlers report a description when the gesture changed pixels so the
//! caller can snapshot history.

use std::collections::VecDeque;

use image::{Rgba, RgbaImage, imageops};

use crate::blend::{self, BlendMode};
use crate::document::Document;
use crate::geom::{Point, Rect};
use crate::selection::Region;

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PointerButton {
    #[default]
    Primary,
    Secondary,
    Middle,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub alt: bool,
    pub ctrl: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PointerEvent {
    /// Position in image space; may lie outside the canvas.
    pub pos: Point,
    pub button: PointerButton,
    pub modifiers: Modifiers,
}

impl PointerEvent {
    pub fn primary(x: i32, y: i32) -> Self {
        Self {
            pos: Point::new(x, y),
            button: PointerButton::Primary,
            modifiers: Modifiers::default(),
        }
    }

    pub fn primary_alt(x: i32, y: i32) -> Self {
        Self {
            modifiers: Modifiers { alt: true, ..Modifiers::default() },
            ..Self::primary(x, y)
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    Escape,
}

// ---------------------------------------------------------------------------
// Tool identity
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ToolKind {
    #[default]
    Brush,
    Eraser,
    MarqueeRect,
    MarqueeEllipse,
    Lasso,
    MagicWand,
    CloneStamp,
    Transform,
}

impl ToolKind {
    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::Brush => "Brush",
            ToolKind::Eraser => "Eraser",
            ToolKind::MarqueeRect => "Rectangular Marquee",
            ToolKind::MarqueeEllipse => "Elliptical Marquee",
            ToolKind::Lasso => "Lasso",
            ToolKind::MagicWand => "Magic Wand",
            ToolKind::CloneStamp => "Clone Stamp",
            ToolKind::Transform => "Transform",
        }
    }
}

// ---------------------------------------------------------------------------
// Tool options (persist across gestures; numeric setters clamp)
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug)]
pub struct BrushOptions {
    size: i32,
    pub color: Rgba<u8>,
    hardness: f32,
    opacity: f32,
    flow: f32,
}

impl Default for BrushOptions {
    fn default() -> Self {
        Self {
            size: 20,
            color: Rgba([0, 0, 0, 255]),
            hardness: 1.0,
            opacity: 1.0,
            flow: 1.0,
        }
    }
}

impl BrushOptions {
    pub fn size(&self) -> i32 {
        self.size
    }

    pub fn set_size(&mut self, size: i32) {
        self.size = size.max(1);
    }

    pub fn hardness(&self) -> f32 {
        self.hardness
    }

    pub fn set_hardness(&mut self, hardness: f32) {
        self.hardness = hardness.clamp(0.0, 1.0);
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn set_opacity(&mut self, opacity: f32) {
        self.opacity = opacity.clamp(0.0, 1.0);
    }

    pub fn flow(&self) -> f32 {
        self.flow
    }

    pub fn set_flow(&mut self, flow: f32) {
        self.flow = flow.clamp(0.0, 1.0);
    }
}

/// Eraser options. No flow: every dab erases at full strength times opacity.
#[derive(Clone, Copy, Debug)]
pub struct EraserOptions {
    size: i32,
    hardness: f32,
    opacity: f32,
}

impl Default for EraserOptions {
    fn default() -> Self {
        Self { size: 20, hardness: 1.0, opacity: 1.0 }
    }
}

impl EraserOptions {
    pub fn size(&self) -> i32 {
        self.size
    }

    pub fn set_size(&mut self, size: i32) {
        self.size = size.max(1);
    }

    pub fn hardness(&self) -> f32 {
        self.hardness
    }

    pub fn set_hardness(&mut self, hardness: f32) {
        self.hardness = hardness.clamp(0.0, 1.0);
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn set_opacity(&mut self, opacity: f32) {
        self.opacity = opacity.clamp(0.0, 1.0);
    }
}

#[derive(Clone, Copy, Debug)]
pub struct CloneOptions {
    size: i32,
    hardness: f32,
    opacity: f32,
}

impl Default for CloneOptions {
    fn default() -> Self {
        Self { size: 20, hardness: 1.0, opacity: 1.0 }
    }
}

impl CloneOptions {
    pub fn size(&self) -> i32 {
        self.size
    }

    pub fn set_size(&mut self, size: i32) {
        self.size = size.max(1);
    }

    pub fn hardness(&self) -> f32 {
        self.hardness
    }

    pub fn set_hardness(&mut self, hardness: f32) {
        self.hardness = hardness.clamp(0.0, 1.0);
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn set_opacity(&mut self, opacity: f32) {
        self.opacity = opacity.clamp(0.0, 1.0);
    }
}

#[derive(Clone, Copy, Debug)]
pub struct WandOptions {
    tolerance: i32,
}

impl Default for WandOptions {
    fn default() -> Self {
        Self { tolerance: 32 }
    }
}

impl WandOptions {
    pub fn tolerance(&self) -> i32 {
        self.tolerance
    }

    pub fn set_tolerance(&mut self, tolerance: i32) {
        self.tolerance = tolerance.clamp(0, 255);
    }
}

// ---------------------------------------------------------------------------
// Per-tool gesture state
// ---------------------------------------------------------------------------

#[derive(Default)]
struct StrokeState {
    active: bool,
    last: Point,
    /// True once any dab of the gesture landed on the pixel buffer; a
    /// stroke that clipped away entirely records no history entry.
    touched: bool,
}

#[derive(Default)]
struct MarqueeState {
    selecting: bool,
    start: Point,
}

#[derive(Default)]
struct LassoState {
    tracing: bool,
    points: Vec<Point>,
}

#[derive(Default)]
struct CloneStampState {
    source_set: bool,
    cloning: bool,
    source: Point,
    last_dest: Point,
    /// Frozen copy of the layer taken when the source was set; stamps sample
    /// from here so a stroke never reads its own output.
    snapshot: Option<RgbaImage>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TransformMode {
    Move,
    ScaleTopLeft,
    ScaleTop,
    ScaleTopRight,
    ScaleRight,
    ScaleBottomRight,
    ScaleBottom,
    ScaleBottomLeft,
    ScaleLeft,
    Rotate,
}

impl TransformMode {
    fn is_scale(&self) -> bool {
        !matches!(self, TransformMode::Move | TransformMode::Rotate)
    }
}

#[derive(Default)]
struct TransformState {
    active: bool,
    mode: Option<TransformMode>,
    start: Point,
    original: Rect,
    current: Rect,
    /// Rotation is bookkeeping only; it never resamples pixels.
    angle: f32,
    grab_angle: f32,
    base_angle: f32,
}

const HANDLE_HALF: i32 = 4;
const ROTATE_HANDLE_GAP: i32 = 20;

// ---------------------------------------------------------------------------
// ToolSet: options, state, and event dispatch for all tools
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct ToolSet {
    active: ToolKind,
    pub brush: BrushOptions,
    pub eraser: EraserOptions,
    pub clone: CloneOptions,
    pub wand: WandOptions,
    selection: Option<Region>,
    stroke: StrokeState,
    marquee: MarqueeState,
    lasso: LassoState,
    stamp: CloneStampState,
    transform: TransformState,
}

impl ToolSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_tool(&self) -> ToolKind {
        self.active
    }

    /// Switch tools, abandoning any in-progress gesture. Options and the
    /// current selection survive the switch.
    pub fn set_active_tool(&mut self, kind: ToolKind) {
        if self.active == kind {
            return;
        }
        self.active = kind;
        self.stroke = StrokeState::default();
        self.marquee = MarqueeState::default();
        self.lasso = LassoState::default();
        self.stamp.cloning = false;
        self.transform = TransformState {
            angle: self.transform.angle,
            ..TransformState::default()
        };
    }

    pub fn selection(&self) -> Option<&Region> {
        self.selection.as_ref()
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    /// Floating transform bounds while a transform gesture is live.
    pub fn transform_bounds(&self) -> Option<Rect> {
        if self.transform.active { Some(self.transform.current) } else { None }
    }

    pub fn rotation_angle(&self) -> f32 {
        self.transform.angle
    }

    // -- dispatch ------------------------------------------------------

    pub fn on_press(&mut self, document: &mut Document, event: &PointerEvent) {
        match self.active {
            ToolKind::Brush => self.brush_press(document, event),
            ToolKind::Eraser => self.eraser_press(document, event),
            ToolKind::MarqueeRect | ToolKind::MarqueeEllipse => self.marquee_press(event),
            ToolKind::Lasso => self.lasso_press(event),
            ToolKind::MagicWand => self.wand_press(document, event),
            ToolKind::CloneStamp => self.stamp_press(document, event),
            ToolKind::Transform => self.transform_press(document, event),
        }
    }

    pub fn on_move(&mut self, document: &mut Document, event: &PointerEvent) {
        match self.active {
            ToolKind::Brush => self.brush_move(document, event),
            ToolKind::Eraser => self.eraser_move(document, event),
            ToolKind::MarqueeRect | ToolKind::MarqueeEllipse => self.marquee_move(event),
            ToolKind::Lasso => self.lasso_move(event),
            ToolKind::MagicWand => {}
            ToolKind::CloneStamp => self.stamp_move(document, event),
            ToolKind::Transform => self.transform_move(event),
        }
    }

    /// Finish the gesture. Returns a history description when the document
    /// was mutated.
    pub fn on_release(&mut self, document: &mut Document, event: &PointerEvent) -> Option<&'static str> {
        match self.active {
            ToolKind::Brush => {
                let painted = self.stroke.active && self.stroke.touched;
                self.stroke.active = false;
                self.stroke.touched = false;
                painted.then_some("Brush Stroke")
            }
            ToolKind::Eraser => {
                let erased = self.stroke.active && self.stroke.touched;
                self.stroke.active = false;
                self.stroke.touched = false;
                erased.then_some("Eraser")
            }
            ToolKind::MarqueeRect | ToolKind::MarqueeEllipse => {
                self.marquee_release(event);
                None
            }
            ToolKind::Lasso => {
                self.lasso_release();
                None
            }
            ToolKind::MagicWand => None,
            ToolKind::CloneStamp => {
                let was = self.stamp.cloning;
                self.stamp.cloning = false;
                was.then_some("Clone Stamp")
            }
            ToolKind::Transform => self.transform_release(document),
        }
    }

    pub fn on_key(&mut self, key: Key) {
        if key == Key::Escape && self.transform.active {
            // Cancel: snap back to the original bounds, nothing is applied.
            self.transform.current = self.transform.original;
            self.transform.angle = self.transform.base_angle;
            self.transform.active = false;
            self.transform.mode = None;
        }
    }

    // -- brush / eraser ------------------------------------------------

    fn brush_press(&mut self, document: &mut Document, event: &PointerEvent) {
        if event.button != PointerButton::Primary {
            return;
        }
        let opts = self.brush;
        let Some(layer) = document.active_layer_mut() else {
            return;
        };
        if layer.locked {
            return;
        }
        self.stroke.active = true;
        self.stroke.last = event.pos;
        // The press dab ignores flow; flow shapes stroke buildup only.
        self.stroke.touched = stamp_dab(
            layer.pixels_mut(),
            event.pos,
            opts.size,
            opts.hardness,
            opts.color,
            opts.opacity,
        );
    }

    fn brush_move(&mut self, document: &mut Document, event: &PointerEvent) {
        if !self.stroke.active {
            return;
        }
        let opts = self.brush;
        let Some(layer) = document.active_layer_mut() else {
            return;
        };
        if layer.locked {
            return;
        }
        let alpha = opts.opacity * opts.flow;
        let from = self.stroke.last;
        for pos in interpolate(from, event.pos) {
            self.stroke.touched |=
                stamp_dab(layer.pixels_mut(), pos, opts.size, opts.hardness, opts.color, alpha);
        }
        self.stroke.last = event.pos;
    }

    fn eraser_press(&mut self, document: &mut Document, event: &PointerEvent) {
        if event.button != PointerButton::Primary {
            return;
        }
        let opts = self.eraser;
        let Some(layer) = document.active_layer_mut() else {
            return;
        };
        if layer.locked {
            return;
        }
        self.stroke.active = true;
        self.stroke.last = event.pos;
        self.stroke.touched =
            erase_dab(layer.pixels_mut(), event.pos, opts.size, opts.hardness, opts.opacity);
    }

    fn eraser_move(&mut self, document: &mut Document, event: &PointerEvent) {
        if !self.stroke.active {
            return;
        }
        let opts = self.eraser;
        let Some(layer) = document.active_layer_mut() else {
            return;
        };
        if layer.locked {
            return;
        }
        let from = self.stroke.last;
        for pos in interpolate(from, event.pos) {
            self.stroke.touched |=
                erase_dab(layer.pixels_mut(), pos, opts.size, opts.hardness, opts.opacity);
        }
        self.stroke.last = event.pos;
    }

    // -- marquee -------------------------------------------------------

    fn marquee_press(&mut self, event: &PointerEvent) {
        if event.button != PointerButton::Primary {
            return;
        }
        self.selection = None;
        self.marquee.selecting = true;
        self.marquee.start = event.pos;
    }

    fn marquee_move(&mut self, event: &PointerEvent) {
        if !self.marquee.selecting {
            return;
        }
        self.selection = Some(self.marquee_region(event.pos));
    }

    fn marquee_release(&mut self, event: &PointerEvent) {
        if !self.marquee.selecting {
            return;
        }
        self.marquee.selecting = false;
        self.selection = Some(self.marquee_region(event.pos));
    }

    fn marquee_region(&self, pos: Point) -> Region {
        let rect = Rect::from_points(self.marquee.start, pos);
        match self.active {
            ToolKind::MarqueeEllipse => Region::from_ellipse(rect),
            _ => Region::from_rect(rect),
        }
    }

    // -- lasso ---------------------------------------------------------

    fn lasso_press(&mut self, event: &PointerEvent) {
        if event.button != PointerButton::Primary {
            return;
        }
        self.selection = None;
        self.lasso.tracing = true;
        self.lasso.points.clear();
        self.lasso.points.push(event.pos);
    }

    fn lasso_move(&mut self, event: &PointerEvent) {
        if self.lasso.tracing {
            self.lasso.points.push(event.pos);
        }
    }

    fn lasso_release(&mut self) {
        if !self.lasso.tracing {
            return;
        }
        self.lasso.tracing = false;
        // Fewer than three points cannot close into a polygon.
        self.selection = if self.lasso.points.len() > 2 {
            Some(Region::from_polygon(&self.lasso.points))
        } else {
            None
        };
        self.lasso.points.clear();
    }

    // -- magic wand ----------------------------------------------------

    fn wand_press(&mut self, document: &Document, event: &PointerEvent) {
        if event.button != PointerButton::Primary {
            return;
        }
        let canvas = Rect::from_size(0, 0, document.width() as i32, document.height() as i32);
        if !canvas.contains(event.pos) {
            return;
        }
        let Some(layer) = document.active_layer() else {
            return;
        };
        let (w, h) = layer.pixels().dimensions();
        let buffer = Rect::from_size(0, 0, w as i32, h as i32);
        if !buffer.contains(event.pos) {
            return;
        }
        self.selection = Some(flood_fill(layer.pixels(), event.pos, self.wand.tolerance));
    }

    // -- clone stamp ---------------------------------------------------

    fn stamp_press(&mut self, document: &mut Document, event: &PointerEvent) {
        if event.button != PointerButton::Primary {
            return;
        }
        if event.modifiers.alt {
            // Alt-press only designates the sampling source.
            if let Some(layer) = document.active_layer() {
                self.stamp.source = event.pos;
                self.stamp.source_set = true;
                self.stamp.snapshot = Some(layer.pixels().clone());
            }
            return;
        }
        let opts = self.clone;
        let Some(layer) = document.active_layer_mut() else {
            return;
        };
        if layer.locked {
            return;
        }
        if !self.stamp.source_set {
            // No source chosen yet: default it to the press position.
            self.stamp.source = event.pos;
            self.stamp.source_set = true;
            self.stamp.snapshot = Some(layer.pixels().clone());
        }
        self.stamp.cloning = true;
        self.stamp.last_dest = event.pos;
        if let Some(snapshot) = &self.stamp.snapshot {
            clone_dab(
                snapshot,
                layer.pixels_mut(),
                self.stamp.source,
                event.pos,
                opts.size,
                opts.hardness,
                opts.opacity,
            );
        }
    }

    fn stamp_move(&mut self, document: &mut Document, event: &PointerEvent) {
        if !self.stamp.cloning || !self.stamp.source_set {
            return;
        }
        let opts = self.clone;
        let Some(layer) = document.active_layer_mut() else {
            return;
        };
        if layer.locked {
            return;
        }
        // The source follows the destination at a constant offset.
        let delta = event.pos - self.stamp.last_dest;
        self.stamp.source = self.stamp.source + delta;
        self.stamp.last_dest = event.pos;
        if let Some(snapshot) = &self.stamp.snapshot {
            clone_dab(
                snapshot,
                layer.pixels_mut(),
                self.stamp.source,
                event.pos,
                opts.size,
                opts.hardness,
                opts.opacity,
            );
        }
    }

    // -- transform -----------------------------------------------------

    fn transform_press(&mut self, document: &Document, event: &PointerEvent) {
        if event.button != PointerButton::Primary {
            return;
        }
        let Some(bounds) = self.resolve_transform_bounds(document) else {
            return;
        };
        let Some(mode) = hit_test(event.pos, bounds) else {
            return;
        };
        self.transform.active = true;
        self.transform.mode = Some(mode);
        self.transform.start = event.pos;
        self.transform.original = bounds;
        self.transform.current = bounds;
        self.transform.base_angle = self.transform.angle;
        if mode == TransformMode::Rotate {
            self.transform.grab_angle = angle_about(bounds.center(), event.pos);
        }
    }

    fn transform_move(&mut self, event: &PointerEvent) {
        if !self.transform.active {
            return;
        }
        let Some(mode) = self.transform.mode else {
            return;
        };
        let delta = event.pos - self.transform.start;
        let o = self.transform.original;
        let mut c = o;
        match mode {
            TransformMode::Move => {
                c = o.translated(delta.x, delta.y);
            }
            TransformMode::ScaleTopLeft => {
                c.left = o.left + delta.x;
                c.top = o.top + delta.y;
            }
            TransformMode::ScaleTop => c.top = o.top + delta.y,
            TransformMode::ScaleTopRight => {
                c.right = o.right + delta.x;
                c.top = o.top + delta.y;
            }
            TransformMode::ScaleRight => c.right = o.right + delta.x,
            TransformMode::ScaleBottomRight => {
                c.right = o.right + delta.x;
                c.bottom = o.bottom + delta.y;
            }
            TransformMode::ScaleBottom => c.bottom = o.bottom + delta.y,
            TransformMode::ScaleBottomLeft => {
                c.left = o.left + delta.x;
                c.bottom = o.bottom + delta.y;
            }
            TransformMode::ScaleLeft => c.left = o.left + delta.x,
            TransformMode::Rotate => {
                let now = angle_about(o.center(), event.pos);
                self.transform.angle =
                    self.transform.base_angle + (now - self.transform.grab_angle).to_degrees();
            }
        }
        // A drag past the opposite edge inverts the box; keep it normalized.
        self.transform.current = if mode.is_scale() { c.normalized() } else { c };
    }

    fn transform_release(&mut self, document: &mut Document) -> Option<&'static str> {
        if !self.transform.active {
            return None;
        }
        self.transform.active = false;
        let mode = self.transform.mode.take()?;
        let original = self.transform.original;
        let current = self.transform.current;

        let layer = document.active_layer_mut()?;
        if layer.locked {
            return None;
        }
        match mode {
            TransformMode::Move => {
                let delta = Point::new(current.left - original.left, current.top - original.top);
                layer.offset = layer.offset + delta;
                Some("Transform")
            }
            TransformMode::Rotate => {
                // Angle bookkeeping only; pixels are left untouched.
                None
            }
            _ => {
                let (w, h) = (current.width(), current.height());
                if w < 1 || h < 1 {
                    return None;
                }
                // Aspect ratio is deliberately not preserved.
                let resized = imageops::resize(
                    layer.pixels(),
                    w as u32,
                    h as u32,
                    imageops::FilterType::Triangle,
                );
                layer.set_pixels(resized);
                layer.offset = Point::new(current.left, current.top);
                Some("Transform")
            }
        }
    }

    /// Selection bounds when a selection exists, else the active layer's
    /// footprint on the canvas.
    fn resolve_transform_bounds(&self, document: &Document) -> Option<Rect> {
        if let Some(region) = &self.selection
            && let Some(bounds) = region.bounds()
        {
            return Some(bounds);
        }
        let layer = document.active_layer()?;
        Some(Rect::from_size(
            layer.offset.x,
            layer.offset.y,
            layer.width() as i32,
            layer.height() as i32,
        ))
    }
}

// ---------------------------------------------------------------------------
// Transform hit testing
// ---------------------------------------------------------------------------

fn handle_zone(p: Point) -> Rect {
    Rect::from_size(p.x - HANDLE_HALF, p.y - HANDLE_HALF, HANDLE_HALF * 2, HANDLE_HALF * 2)
}

fn hit_test(pos: Point, bounds: Rect) -> Option<TransformMode> {
    let cx = bounds.left + bounds.width() / 2;
    let cy = bounds.top + bounds.height() / 2;
    let handles = [
        (Point::new(bounds.left, bounds.top), TransformMode::ScaleTopLeft),
        (Point::new(bounds.right, bounds.top), TransformMode::ScaleTopRight),
        (Point::new(bounds.left, bounds.bottom), TransformMode::ScaleBottomLeft),
        (Point::new(bounds.right, bounds.bottom), TransformMode::ScaleBottomRight),
        (Point::new(cx, bounds.top), TransformMode::ScaleTop),
        (Point::new(cx, bounds.bottom), TransformMode::ScaleBottom),
        (Point::new(bounds.left, cy), TransformMode::ScaleLeft),
        (Point::new(bounds.right, cy), TransformMode::ScaleRight),
        (Point::new(cx, bounds.top - ROTATE_HANDLE_GAP), TransformMode::Rotate),
    ];
    for (p, mode) in handles {
        if handle_zone(p).contains(pos) {
            return Some(mode);
        }
    }
    if bounds.contains(pos) {
        return Some(TransformMode::Move);
    }
    None
}

fn angle_about(center: Point, pos: Point) -> f32 {
    ((pos.y - center.y) as f32).atan2((pos.x - center.x) as f32)
}

// ---------------------------------------------------------------------------
// Dab rasterization
// ---------------------------------------------------------------------------

/// Dab centers along a stroke segment: `max(|dx|, |dy|)` evenly spaced
/// steps, both endpoints included, so adjacent dabs always touch.
fn interpolate(from: Point, to: Point) -> Vec<Point> {
    let steps = (to.x - from.x).abs().max((to.y - from.y).abs());
    if steps == 0 {
        return vec![to];
    }
    (0..=steps)
        .map(|i| {
            let t = i as f32 / steps as f32;
            Point::new(
                (from.x as f32 + t * (to.x - from.x) as f32).round() as i32,
                (from.y as f32 + t * (to.y - from.y) as f32).round() as i32,
            )
        })
        .collect()
}

/// Radial coverage of a dab at `dist` from its center. Hard brushes are a
/// flat disc; soft brushes hold full strength out to the `hardness` fraction
/// of the radius, then fall off linearly to the rim.
fn dab_falloff(dist: f32, radius: f32, hardness: f32) -> f32 {
    if dist > radius {
        return 0.0;
    }
    if hardness >= 1.0 {
        return 1.0;
    }
    let t = dist / radius;
    if t <= hardness {
        1.0
    } else {
        ((1.0 - t) / (1.0 - hardness)).clamp(0.0, 1.0)
    }
}

/// Returns whether any pixel of the dab landed inside the buffer.
fn stamp_dab(
    pixels: &mut RgbaImage,
    center: Point,
    size: i32,
    hardness: f32,
    color: Rgba<u8>,
    alpha: f32,
) -> bool {
    let radius = size.max(1) as f32 / 2.0;
    let (w, h) = pixels.dimensions();
    let reach = radius.ceil() as i32;
    let mut landed = false;
    for dy in -reach..=reach {
        for dx in -reach..=reach {
            let x = center.x + dx;
            let y = center.y + dy;
            if x < 0 || y < 0 || x >= w as i32 || y >= h as i32 {
                continue;
            }
            let dist = ((dx * dx + dy * dy) as f32).sqrt();
            let coverage = dab_falloff(dist, radius, hardness);
            if coverage <= 0.0 {
                continue;
            }
            landed = true;
            let a = (color[3] as f32 / 255.0) * alpha.clamp(0.0, 1.0) * coverage;
            if a <= 0.0 {
                continue;
            }
            let src = Rgba([color[0], color[1], color[2], (a * 255.0).round() as u8]);
            let dst = *pixels.get_pixel(x as u32, y as u32);
            let out = blend::blend_pixel(dst, src, BlendMode::Normal, 1.0);
            pixels.put_pixel(x as u32, y as u32, out);
        }
    }
    landed
}

/// Returns whether any pixel of the dab landed inside the buffer.
fn erase_dab(pixels: &mut RgbaImage, center: Point, size: i32, hardness: f32, strength: f32) -> bool {
    let radius = size.max(1) as f32 / 2.0;
    let (w, h) = pixels.dimensions();
    let reach = radius.ceil() as i32;
    let mut landed = false;
    for dy in -reach..=reach {
        for dx in -reach..=reach {
            let x = center.x + dx;
            let y = center.y + dy;
            if x < 0 || y < 0 || x >= w as i32 || y >= h as i32 {
                continue;
            }
            let dist = ((dx * dx + dy * dy) as f32).sqrt();
            let coverage = dab_falloff(dist, radius, hardness);
            if coverage <= 0.0 {
                continue;
            }
            landed = true;
            let dst = *pixels.get_pixel(x as u32, y as u32);
            let out = blend::erase_pixel(dst, strength.clamp(0.0, 1.0) * coverage);
            pixels.put_pixel(x as u32, y as u32, out);
        }
    }
    landed
}

/// Copy a `size x size` patch from the frozen snapshot onto the live pixels.
/// Source and destination clip independently against their buffers, so a
/// partial overlap degrades to the intersecting sub-rectangle.
fn clone_dab(
    snapshot: &RgbaImage,
    pixels: &mut RgbaImage,
    source: Point,
    dest: Point,
    size: i32,
    hardness: f32,
    opacity: f32,
) {
    let size = size.max(1);
    let half = size / 2;
    let radius = size as f32 / 2.0;
    let (sw, sh) = snapshot.dimensions();
    let (dw, dh) = pixels.dimensions();
    for py in 0..size {
        for px in 0..size {
            let sx = source.x - half + px;
            let sy = source.y - half + py;
            if sx < 0 || sy < 0 || sx >= sw as i32 || sy >= sh as i32 {
                continue;
            }
            let dx = dest.x - half + px;
            let dy = dest.y - half + py;
            if dx < 0 || dy < 0 || dx >= dw as i32 || dy >= dh as i32 {
                continue;
            }
            let coverage = if hardness >= 1.0 {
                1.0
            } else {
                let dist = (px as f32 + 0.5 - radius).hypot(py as f32 + 0.5 - radius);
                dab_falloff(dist, radius, hardness)
            };
            if coverage <= 0.0 {
                continue;
            }
            let src = *snapshot.get_pixel(sx as u32, sy as u32);
            let dst = *pixels.get_pixel(dx as u32, dy as u32);
            let out = blend::blend_pixel(dst, src, BlendMode::Normal, opacity * coverage);
            pixels.put_pixel(dx as u32, dy as u32, out);
        }
    }
}

// ---------------------------------------------------------------------------
// Flood fill (magic wand)
// ---------------------------------------------------------------------------

/// 4-connected BFS from `seed`. A pixel joins the region when its Manhattan
/// RGB distance from the seed color is within `tolerance * 3`.
fn flood_fill(image: &RgbaImage, seed: Point, tolerance: i32) -> Region {
    let (w, h) = image.dimensions();
    let (wi, hi) = (w as i32, h as i32);
    let idx = |x: i32, y: i32| (y as usize) * w as usize + x as usize;

    let seed_color = *image.get_pixel(seed.x as u32, seed.y as u32);
    let limit = tolerance * 3;

    let mut visited = vec![false; (w * h) as usize];
    let mut selected = vec![false; (w * h) as usize];
    let mut queue = VecDeque::new();
    visited[idx(seed.x, seed.y)] = true;
    queue.push_back(seed);

    while let Some(p) = queue.pop_front() {
        let c = image.get_pixel(p.x as u32, p.y as u32);
        let diff = (c[0] as i32 - seed_color[0] as i32).abs()
            + (c[1] as i32 - seed_color[1] as i32).abs()
            + (c[2] as i32 - seed_color[2] as i32).abs();
        if diff > limit {
            continue;
        }
        selected[idx(p.x, p.y)] = true;
        for (dx, dy) in [(1, 0), (-1, 0), (0, 1), (0, -1)] {
            let nx = p.x + dx;
            let ny = p.y + dy;
            if nx < 0 || ny < 0 || nx >= wi || ny >= hi || visited[idx(nx, ny)] {
                continue;
            }
            visited[idx(nx, ny)] = true;
            queue.push_back(Point::new(nx, ny));
        }
    }

    let mut region = Region::new();
    for y in 0..hi {
        let mut x = 0;
        while x < wi {
            if selected[idx(x, y)] {
                let start = x;
                while x < wi && selected[idx(x, y)] {
                    x += 1;
                }
                region.push_span(y, start, x);
            } else {
                x += 1;
            }
        }
    }
    region
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    use crate::layer::Layer;

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
    const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

    /// A document with an unlocked, transparent paint layer on top.
    fn doc_with_paint_layer(w: u32, h: u32) -> Document {
        let mut doc = Document::new(w, h, WHITE);
        doc.add_layer(Layer::new("Paint", w, h));
        doc
    }

    fn drag(tools: &mut ToolSet, doc: &mut Document, path: &[(i32, i32)]) -> Option<&'static str> {
        let (fx, fy) = path[0];
        tools.on_press(doc, &PointerEvent::primary(fx, fy));
        for &(x, y) in &path[1..] {
            tools.on_move(doc, &PointerEvent::primary(x, y));
        }
        let (lx, ly) = *path.last().unwrap();
        tools.on_release(doc, &PointerEvent::primary(lx, ly))
    }

    #[test]
    fn test_brush_stroke_has_no_gaps() {
        let mut doc = doc_with_paint_layer(64, 64);
        let mut tools = ToolSet::new();
        tools.brush.set_size(4);
        let desc = drag(&mut tools, &mut doc, &[(5, 5), (40, 20)]);
        assert_eq!(desc, Some("Brush Stroke"));
        // Every interpolated dab center along the segment must be painted.
        let layer = doc.layer(1).unwrap();
        for pos in interpolate(Point::new(5, 5), Point::new(40, 20)) {
            let px = layer.pixels().get_pixel(pos.x as u32, pos.y as u32);
            assert!(px[3] > 0, "gap at {:?}", pos);
        }
    }

    #[test]
    fn test_brush_respects_locked_layer() {
        let mut doc = Document::new(16, 16, WHITE); // only the locked background
        let mut tools = ToolSet::new();
        let before = doc.render();
        let desc = drag(&mut tools, &mut doc, &[(4, 4), (10, 10)]);
        assert_eq!(desc, None);
        assert_eq!(doc.render(), before);
    }

    #[test]
    fn test_brush_off_canvas_is_safe() {
        let mut doc = doc_with_paint_layer(8, 8);
        let mut tools = ToolSet::new();
        drag(&mut tools, &mut doc, &[(-50, -50), (60, 60)]);
        // No panic, and the pass through the canvas left paint behind.
        assert!(doc.layer(1).unwrap().pixels().get_pixel(4, 4)[3] > 0);
    }

    #[test]
    fn test_fully_clipped_stroke_records_nothing() {
        let mut doc = doc_with_paint_layer(8, 8);
        let mut tools = ToolSet::new();
        tools.brush.set_size(4);
        // Every dab stays far outside the buffer.
        let desc = drag(&mut tools, &mut doc, &[(-40, -40), (-30, -44)]);
        assert_eq!(desc, None);

        tools.set_active_tool(ToolKind::Eraser);
        tools.eraser.set_size(4);
        let desc = drag(&mut tools, &mut doc, &[(50, 50), (60, 44)]);
        assert_eq!(desc, None);
    }

    #[test]
    fn test_soft_brush_fades_toward_rim() {
        let mut doc = doc_with_paint_layer(32, 32);
        let mut tools = ToolSet::new();
        tools.brush.set_size(16);
        tools.brush.set_hardness(0.2);
        drag(&mut tools, &mut doc, &[(16, 16)]);
        let px = doc.layer(1).unwrap().pixels();
        let center = px.get_pixel(16, 16)[3];
        let rim = px.get_pixel(16 + 7, 16)[3];
        assert!(center > rim, "center {} rim {}", center, rim);
        assert!(rim < 64);
    }

    #[test]
    fn test_eraser_cuts_alpha() {
        let mut doc = doc_with_paint_layer(16, 16);
        doc.active_layer_mut()
            .unwrap()
            .pixels_mut()
            .pixels_mut()
            .for_each(|p| *p = BLACK);
        let mut tools = ToolSet::new();
        tools.set_active_tool(ToolKind::Eraser);
        tools.eraser.set_size(6);
        let desc = drag(&mut tools, &mut doc, &[(8, 8)]);
        assert_eq!(desc, Some("Eraser"));
        assert_eq!(doc.layer(1).unwrap().pixels().get_pixel(8, 8)[3], 0);
        assert_eq!(doc.layer(1).unwrap().pixels().get_pixel(0, 0)[3], 255);
    }

    #[test]
    fn test_marquee_rect_normalizes_drag_direction() {
        let mut doc = doc_with_paint_layer(32, 32);
        let mut tools = ToolSet::new();
        tools.set_active_tool(ToolKind::MarqueeRect);
        drag(&mut tools, &mut doc, &[(20, 20), (10, 5)]);
        let region = tools.selection().unwrap();
        assert_eq!(region.bounds(), Some(Rect::new(10, 5, 21, 21)));
        assert!(region.contains(15, 10));
    }

    #[test]
    fn test_marquee_ellipse_misses_box_corners() {
        let mut doc = doc_with_paint_layer(64, 64);
        let mut tools = ToolSet::new();
        tools.set_active_tool(ToolKind::MarqueeEllipse);
        drag(&mut tools, &mut doc, &[(0, 0), (39, 19)]);
        let region = tools.selection().unwrap();
        assert!(region.contains(20, 10));
        assert!(!region.contains(0, 0));
        assert!(!region.contains(39, 19));
    }

    #[test]
    fn test_lasso_needs_three_points() {
        let mut doc = doc_with_paint_layer(32, 32);
        let mut tools = ToolSet::new();
        tools.set_active_tool(ToolKind::Lasso);
        drag(&mut tools, &mut doc, &[(5, 5), (20, 5)]);
        assert!(tools.selection().is_none());

        drag(&mut tools, &mut doc, &[(5, 5), (20, 5), (12, 20)]);
        let region = tools.selection().unwrap();
        assert!(region.contains(12, 8));
    }

    #[test]
    fn test_wand_uniform_image_selects_everything() {
        let mut doc = doc_with_paint_layer(10, 8);
        let mut tools = ToolSet::new();
        tools.set_active_tool(ToolKind::MagicWand);
        tools.wand.set_tolerance(0);
        tools.on_press(&mut doc, &PointerEvent::primary(3, 3));
        assert_eq!(tools.selection().unwrap().pixel_count(), 80);
    }

    #[test]
    fn test_wand_stops_at_color_boundary() {
        let mut doc = doc_with_paint_layer(10, 10);
        {
            let px = doc.active_layer_mut().unwrap().pixels_mut();
            for y in 0..10 {
                for x in 0..10 {
                    px.put_pixel(x, y, if x < 5 { BLACK } else { WHITE });
                }
            }
        }
        let mut tools = ToolSet::new();
        tools.set_active_tool(ToolKind::MagicWand);
        tools.wand.set_tolerance(0);
        tools.on_press(&mut doc, &PointerEvent::primary(2, 2));
        let region = tools.selection().unwrap();
        assert_eq!(region.pixel_count(), 50);
        assert!(region.contains(4, 9));
        assert!(!region.contains(5, 0));
    }

    #[test]
    fn test_wand_outside_canvas_is_noop() {
        let mut doc = doc_with_paint_layer(8, 8);
        let mut tools = ToolSet::new();
        tools.set_active_tool(ToolKind::MagicWand);
        tools.on_press(&mut doc, &PointerEvent::primary(-1, 3));
        assert!(tools.selection().is_none());
        tools.on_press(&mut doc, &PointerEvent::primary(8, 0));
        assert!(tools.selection().is_none());
    }

    #[test]
    fn test_clone_source_tracks_destination() {
        let mut doc = doc_with_paint_layer(64, 64);
        let mut tools = ToolSet::new();
        tools.set_active_tool(ToolKind::CloneStamp);
        tools.on_press(&mut doc, &PointerEvent::primary_alt(10, 10));
        tools.on_press(&mut doc, &PointerEvent::primary(30, 30));
        tools.on_move(&mut doc, &PointerEvent::primary(35, 32));
        tools.on_move(&mut doc, &PointerEvent::primary(41, 40));
        // Source moved by the same total vector as the destination.
        assert_eq!(tools.stamp.source, Point::new(21, 20));
        let desc = tools.on_release(&mut doc, &PointerEvent::primary(41, 40));
        assert_eq!(desc, Some("Clone Stamp"));
    }

    #[test]
    fn test_clone_copies_from_frozen_snapshot() {
        let mut doc = doc_with_paint_layer(32, 32);
        {
            let px = doc.active_layer_mut().unwrap().pixels_mut();
            for y in 0..4 {
                for x in 0..4 {
                    px.put_pixel(x, y, BLACK);
                }
            }
        }
        let mut tools = ToolSet::new();
        tools.set_active_tool(ToolKind::CloneStamp);
        tools.clone.set_size(4);
        tools.on_press(&mut doc, &PointerEvent::primary_alt(2, 2));
        tools.on_press(&mut doc, &PointerEvent::primary(20, 20));
        tools.on_release(&mut doc, &PointerEvent::primary(20, 20));
        // The black patch landed at the destination.
        assert_eq!(*doc.layer(1).unwrap().pixels().get_pixel(20, 20), BLACK);
    }

    #[test]
    fn test_clone_without_source_uses_press_position() {
        let mut doc = doc_with_paint_layer(32, 32);
        let mut tools = ToolSet::new();
        tools.set_active_tool(ToolKind::CloneStamp);
        tools.on_press(&mut doc, &PointerEvent::primary(12, 12));
        assert!(tools.stamp.source_set);
        assert_eq!(tools.stamp.source, Point::new(12, 12));
    }

    #[test]
    fn test_transform_move_bakes_offset() {
        let mut doc = doc_with_paint_layer(32, 32);
        let mut tools = ToolSet::new();
        tools.set_active_tool(ToolKind::Transform);
        // Grab the interior, drag by (6, 3).
        tools.on_press(&mut doc, &PointerEvent::primary(16, 16));
        tools.on_move(&mut doc, &PointerEvent::primary(22, 19));
        let desc = tools.on_release(&mut doc, &PointerEvent::primary(22, 19));
        assert_eq!(desc, Some("Transform"));
        assert_eq!(doc.layer(1).unwrap().offset, Point::new(6, 3));
    }

    #[test]
    fn test_transform_scale_resizes_buffer() {
        let mut doc = doc_with_paint_layer(32, 32);
        let mut tools = ToolSet::new();
        tools.set_active_tool(ToolKind::Transform);
        // Grab the bottom-right corner handle and pull it in to (16, 16).
        tools.on_press(&mut doc, &PointerEvent::primary(32, 32));
        tools.on_move(&mut doc, &PointerEvent::primary(16, 16));
        let desc = tools.on_release(&mut doc, &PointerEvent::primary(16, 16));
        assert_eq!(desc, Some("Transform"));
        let layer = doc.layer(1).unwrap();
        assert_eq!(layer.pixels().dimensions(), (16, 16));
        assert_eq!(layer.offset, Point::new(0, 0));
    }

    #[test]
    fn test_transform_rotate_never_touches_pixels() {
        let mut doc = doc_with_paint_layer(32, 32);
        doc.active_layer_mut()
            .unwrap()
            .pixels_mut()
            .put_pixel(3, 5, BLACK);
        let before = doc.layer(1).unwrap().pixels().clone();
        let mut tools = ToolSet::new();
        tools.set_active_tool(ToolKind::Transform);
        // Rotate handle sits 20 px above the top-center of the bounds.
        tools.on_press(&mut doc, &PointerEvent::primary(16, -20));
        tools.on_move(&mut doc, &PointerEvent::primary(32, 0));
        let desc = tools.on_release(&mut doc, &PointerEvent::primary(32, 0));
        assert_eq!(desc, None);
        assert!(tools.rotation_angle() != 0.0);
        assert_eq!(*doc.layer(1).unwrap().pixels(), before);
    }

    #[test]
    fn test_transform_escape_cancels() {
        let mut doc = doc_with_paint_layer(32, 32);
        let mut tools = ToolSet::new();
        tools.set_active_tool(ToolKind::Transform);
        tools.on_press(&mut doc, &PointerEvent::primary(16, 16));
        tools.on_move(&mut doc, &PointerEvent::primary(30, 30));
        tools.on_key(Key::Escape);
        let desc = tools.on_release(&mut doc, &PointerEvent::primary(30, 30));
        assert_eq!(desc, None);
        assert_eq!(doc.layer(1).unwrap().offset, Point::new(0, 0));
    }

    #[test]
    fn test_transform_uses_selection_bounds() {
        let mut doc = doc_with_paint_layer(64, 64);
        let mut tools = ToolSet::new();
        tools.set_active_tool(ToolKind::MarqueeRect);
        drag(&mut tools, &mut doc, &[(10, 10), (29, 29)]);
        tools.set_active_tool(ToolKind::Transform);
        tools.on_press(&mut doc, &PointerEvent::primary(15, 15));
        assert_eq!(tools.transform_bounds(), Some(Rect::new(10, 10, 30, 30)));
        tools.on_key(Key::Escape);
    }

    #[test]
    fn test_option_setters_clamp() {
        let mut tools = ToolSet::new();
        tools.brush.set_hardness(2.0);
        assert_eq!(tools.brush.hardness(), 1.0);
        tools.brush.set_flow(-0.5);
        assert_eq!(tools.brush.flow(), 0.0);
        tools.brush.set_size(0);
        assert_eq!(tools.brush.size(), 1);
        tools.wand.set_tolerance(400);
        assert_eq!(tools.wand.tolerance(), 255);
        tools.wand.set_tolerance(-3);
        assert_eq!(tools.wand.tolerance(), 0);
    }

    #[test]
    fn test_tool_switch_abandons_gesture_keeps_selection() {
        let mut doc = doc_with_paint_layer(32, 32);
        let mut tools = ToolSet::new();
        tools.set_active_tool(ToolKind::MarqueeRect);
        drag(&mut tools, &mut doc, &[(0, 0), (9, 9)]);
        tools.set_active_tool(ToolKind::Brush);
        assert!(tools.selection().is_some());
        assert!(!tools.stroke.active);
    }
}
