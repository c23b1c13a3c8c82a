//! Marker layer synchronization.
//!
//! The [`MapSyncEngine`] owns the visual marker layer: an arena of
//! [`Marker`]s plus an id-indexed lookup. It exposes exactly three reactions
//! and nothing else mutates marker state:
//!
//! 1. **Content change** ([`MapSyncEngine::sync_points`]) -- when the content
//!    key (ids plus coordinates rounded to 5 decimals) differs from the
//!    rendered one, the layer is cleared and rebuilt from scratch. This is the
//!    only path that creates or destroys markers.
//! 2. **Viewport fit** -- part of a rebuild: the view snaps to the bounds of
//!    all points, but only when the key differs from the last fitted key and
//!    the point set is non-empty.
//! 3. **Selection change** ([`MapSyncEngine::sync_selection`]) -- restyles at
//!    most two markers (the previous and the new selection) and flies toward
//!    the new one. Never rebuilds.
//!
//! Marker handles carry the layer generation they were issued for, so a
//! click on a marker from a previous layer resolves to nothing.

use std::collections::BTreeMap;
use std::time::Duration;

use eonet_types::{EventId, GeoBounds, LatLon, MapPoint, MarkerVisualState};
use tracing::debug;

use crate::viewport::MapSurface;

/// Padding kept clear around fitted bounds, in pixels.
pub const FIT_PADDING_PX: u32 = 20;

/// Minimum zoom used when flying to a selected marker.
pub const FOCUS_MIN_ZOOM: f64 = 5.0;

/// Duration of the fly-to animation for a selection.
pub const FOCUS_DURATION: Duration = Duration::from_millis(800);

/// Circle-marker appearance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerStyle {
    /// Radius in pixels.
    pub radius: f64,
    /// Stroke colour.
    pub stroke: &'static str,
    /// Stroke width in pixels.
    pub weight: f64,
    /// Fill colour.
    pub fill: &'static str,
    /// Fill opacity in `[0, 1]`.
    pub fill_opacity: f64,
}

/// Appearance of an unselected marker.
pub const NORMAL_STYLE: MarkerStyle = MarkerStyle {
    radius: 6.0,
    stroke: "#0f172a",
    weight: 2.0,
    fill: "#38bdf8",
    fill_opacity: 0.85,
};

/// Appearance of the selected marker.
pub const SELECTED_STYLE: MarkerStyle = MarkerStyle {
    radius: 10.0,
    stroke: "#ffffff",
    weight: 3.0,
    fill: "#f59e0b",
    fill_opacity: 0.95,
};

impl MarkerStyle {
    /// Style for a visual state.
    pub const fn for_state(state: MarkerVisualState) -> Self {
        match state {
            MarkerVisualState::Normal => NORMAL_STYLE,
            MarkerVisualState::Selected => SELECTED_STYLE,
        }
    }
}

/// Opaque reference to a marker in a specific layer generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MarkerHandle {
    layer: u64,
    slot: usize,
}

/// One marker on the layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    event_id: EventId,
    label: String,
    position: LatLon,
    state: MarkerVisualState,
    style: MarkerStyle,
    z_index: u64,
    label_open: bool,
}

impl Marker {
    /// Event this marker represents; reported on click.
    pub const fn event_id(&self) -> &EventId {
        &self.event_id
    }

    /// Tooltip text.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Marker position.
    pub const fn position(&self) -> LatLon {
        self.position
    }

    /// Current visual state.
    pub const fn state(&self) -> MarkerVisualState {
        self.state
    }

    /// Current style.
    pub const fn style(&self) -> MarkerStyle {
        self.style
    }

    /// Stacking order; higher draws on top.
    pub const fn z_index(&self) -> u64 {
        self.z_index
    }

    /// Whether the tooltip is shown.
    pub const fn label_open(&self) -> bool {
        self.label_open
    }
}

/// What one reaction did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderReport {
    /// The marker layer was rebuilt.
    pub rebuilt: bool,
    /// The viewport was fitted to the point set.
    pub fitted: bool,
    /// The viewport flew toward a newly selected marker.
    pub focused: bool,
    /// Markers whose visual state changed, in change order.
    pub restyled: Vec<EventId>,
}

impl RenderReport {
    fn merge(mut self, other: Self) -> Self {
        self.rebuilt |= other.rebuilt;
        self.fitted |= other.fitted;
        self.focused |= other.focused;
        self.restyled.extend(other.restyled);
        self
    }
}

/// Running counters, useful for verifying redraw minimality.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Full layer rebuilds.
    pub layer_rebuilds: u64,
    /// Viewport fits.
    pub viewport_fits: u64,
    /// Fly-to moves toward a selection.
    pub focus_moves: u64,
    /// Individual marker restyles.
    pub restyles: u64,
}

/// Stable identity of a point set: ids plus coordinates rounded to 5 places.
pub fn content_key(points: &[MapPoint]) -> String {
    points
        .iter()
        .map(|p| format!("{}:{:.5},{:.5}", p.id, p.lat, p.lon))
        .collect::<Vec<_>>()
        .join("|")
}

/// Owner of the marker layer and its view.
#[derive(Debug)]
pub struct MapSyncEngine<S: MapSurface> {
    surface: S,
    markers: Vec<Marker>,
    by_id: BTreeMap<EventId, usize>,
    layer: u64,
    next_z: u64,
    rendered_key: Option<String>,
    last_fit_key: Option<String>,
    last_selected: Option<EventId>,
    stats: EngineStats,
}

impl<S: MapSurface> MapSyncEngine<S> {
    /// Mount an engine on a surface with an empty layer.
    pub const fn new(surface: S) -> Self {
        Self {
            surface,
            markers: Vec::new(),
            by_id: BTreeMap::new(),
            layer: 0,
            next_z: 0,
            rendered_key: None,
            last_fit_key: None,
            last_selected: None,
            stats: EngineStats {
                layer_rebuilds: 0,
                viewport_fits: 0,
                focus_moves: 0,
                restyles: 0,
            },
        }
    }

    // -------------------------------------------------------------------
    // Reactions
    // -------------------------------------------------------------------

    /// Run both reactions for one render cycle: content first, then
    /// selection.
    pub fn render(&mut self, points: &[MapPoint], selected: Option<&EventId>) -> RenderReport {
        let content = self.sync_points(points);
        let selection = self.sync_selection(selected);
        content.merge(selection)
    }

    /// Content-change reaction: rebuild the layer if the point set changed.
    ///
    /// After a rebuild the current selection, if it is still on the map, is
    /// re-highlighted in place without moving the view.
    pub fn sync_points(&mut self, points: &[MapPoint]) -> RenderReport {
        let key = content_key(points);
        if self.rendered_key.as_deref() == Some(key.as_str()) {
            return RenderReport::default();
        }

        self.rebuild(points);
        let mut report = RenderReport {
            rebuilt: true,
            ..RenderReport::default()
        };

        if let Some(id) = self.last_selected.clone()
            && self.promote(&id).is_some()
        {
            report.restyled.push(id);
        }

        report.fitted = self.fit_viewport(&key, points);
        self.rendered_key = Some(key);
        report
    }

    /// Selection-change reaction: demote the previous marker, promote the
    /// new one and fly toward it.
    ///
    /// A selection with no marker (an event without a point) changes no
    /// visuals but is still remembered.
    pub fn sync_selection(&mut self, selected: Option<&EventId>) -> RenderReport {
        if self.last_selected.as_ref() == selected {
            return RenderReport::default();
        }

        let mut report = RenderReport::default();
        if let Some(prev) = self.last_selected.take()
            && self.demote(&prev)
        {
            report.restyled.push(prev);
        }

        if let Some(id) = selected
            && let Some(position) = self.promote(id)
        {
            report.restyled.push(id.clone());
            self.focus(position);
            report.focused = true;
        }

        debug!(
            selected = selected.map(EventId::as_str),
            restyled = report.restyled.len(),
            "selection synced"
        );
        self.last_selected = selected.cloned();
        report
    }

    /// Release every marker and forget all render memory.
    ///
    /// Handles issued before teardown stop resolving.
    pub fn teardown(&mut self) {
        self.markers.clear();
        self.by_id.clear();
        self.layer = self.layer.saturating_add(1);
        self.next_z = 0;
        self.rendered_key = None;
        self.last_fit_key = None;
        self.last_selected = None;
        debug!("map layer torn down");
    }

    // -------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------

    /// Resolve a click on a marker to the event id it reports.
    pub fn click(&self, handle: MarkerHandle) -> Option<EventId> {
        if handle.layer != self.layer {
            return None;
        }
        self.markers.get(handle.slot).map(|m| m.event_id.clone())
    }

    /// Handle of the marker for an event in the current layer.
    pub fn handle_for(&self, id: &EventId) -> Option<MarkerHandle> {
        self.by_id.get(id).map(|&slot| MarkerHandle {
            layer: self.layer,
            slot,
        })
    }

    /// Marker for an event, if it is on the map.
    pub fn marker(&self, id: &EventId) -> Option<&Marker> {
        self.by_id.get(id).and_then(|&slot| self.markers.get(slot))
    }

    /// All markers in insertion order.
    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    /// The marker currently in the selected state, if any.
    pub fn selected_marker(&self) -> Option<&Marker> {
        self.markers
            .iter()
            .find(|m| m.state == MarkerVisualState::Selected)
    }

    /// Content key of the last fit, if any.
    pub fn last_fit_key(&self) -> Option<&str> {
        self.last_fit_key.as_deref()
    }

    /// Selection the engine last rendered.
    pub const fn last_selected(&self) -> Option<&EventId> {
        self.last_selected.as_ref()
    }

    /// Running counters.
    pub const fn stats(&self) -> EngineStats {
        self.stats
    }

    /// The surface being driven.
    pub const fn surface(&self) -> &S {
        &self.surface
    }

    // -------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------

    fn rebuild(&mut self, points: &[MapPoint]) {
        self.markers.clear();
        self.by_id.clear();
        self.layer = self.layer.saturating_add(1);
        self.next_z = 0;

        for point in points {
            if self.by_id.contains_key(&point.id) {
                continue;
            }
            let slot = self.markers.len();
            self.markers.push(Marker {
                event_id: point.id.clone(),
                label: point.title.clone(),
                position: point.position(),
                state: MarkerVisualState::Normal,
                style: NORMAL_STYLE,
                z_index: self.next_z,
                label_open: false,
            });
            self.next_z = self.next_z.saturating_add(1);
            self.by_id.insert(point.id.clone(), slot);
        }

        self.stats.layer_rebuilds = self.stats.layer_rebuilds.saturating_add(1);
        debug!(markers = self.markers.len(), layer = self.layer, "marker layer rebuilt");
    }

    fn fit_viewport(&mut self, key: &str, points: &[MapPoint]) -> bool {
        if self.last_fit_key.as_deref() == Some(key) {
            return false;
        }
        let Some(bounds) = GeoBounds::enclosing(points.iter().map(MapPoint::position)) else {
            return false;
        };
        self.surface.fit_bounds(bounds, FIT_PADDING_PX);
        self.last_fit_key = Some(key.to_owned());
        self.stats.viewport_fits = self.stats.viewport_fits.saturating_add(1);
        debug!(points = points.len(), zoom = self.surface.zoom(), "viewport fitted");
        true
    }

    /// Put a marker in the selected state and raise it; returns its position.
    fn promote(&mut self, id: &EventId) -> Option<LatLon> {
        let slot = *self.by_id.get(id)?;
        let z = self.next_z;
        let marker = self.markers.get_mut(slot)?;
        marker.state = MarkerVisualState::Selected;
        marker.style = SELECTED_STYLE;
        marker.z_index = z;
        marker.label_open = true;
        let position = marker.position;
        self.next_z = self.next_z.saturating_add(1);
        self.stats.restyles = self.stats.restyles.saturating_add(1);
        Some(position)
    }

    fn demote(&mut self, id: &EventId) -> bool {
        let Some(marker) = self
            .by_id
            .get(id)
            .copied()
            .and_then(|slot| self.markers.get_mut(slot))
        else {
            return false;
        };
        marker.state = MarkerVisualState::Normal;
        marker.style = NORMAL_STYLE;
        marker.label_open = false;
        self.stats.restyles = self.stats.restyles.saturating_add(1);
        true
    }

    fn focus(&mut self, position: LatLon) {
        let zoom = self.surface.zoom().max(FOCUS_MIN_ZOOM);
        self.surface.fly_to(position, zoom, FOCUS_DURATION);
        self.stats.focus_moves = self.stats.focus_moves.saturating_add(1);
    }
}
