//! Map surface abstraction and a headless Web-Mercator viewport.
//!
//! The [`MapSyncEngine`](crate::map_sync::MapSyncEngine) drives the visible
//! region through the [`MapSurface`] trait. [`Viewport`] implements it
//! without a browser by computing the centre and zoom a slippy map would
//! settle on, using 256px tiles and integer zoom snapping.

use std::f64::consts::PI;
use std::time::Duration;

use eonet_types::{GeoBounds, LatLon};

/// Latitude limit of the Web-Mercator projection.
const MAX_MERCATOR_LAT: f64 = 85.051_128_779_806_59;

/// Width of one tile in pixels at zoom 0.
const TILE_SIZE: f64 = 256.0;

/// Initial view centre.
pub const INITIAL_CENTER: LatLon = LatLon::new(0.0, 0.0);

/// Initial zoom level.
pub const INITIAL_ZOOM: f64 = 2.0;

/// Deepest zoom the tile layer serves.
pub const DEFAULT_MAX_ZOOM: f64 = 18.0;

/// Something that can show a region of the world.
pub trait MapSurface {
    /// Current zoom level.
    fn zoom(&self) -> f64;

    /// Current view centre.
    fn center(&self) -> LatLon;

    /// Show the whole of `bounds`, keeping `padding_px` clear on every side.
    fn fit_bounds(&mut self, bounds: GeoBounds, padding_px: u32);

    /// Animate the view to `center` at `zoom`.
    fn fly_to(&mut self, center: LatLon, zoom: f64, duration: Duration);
}

/// Headless viewport over a fixed-size map container.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    center: LatLon,
    zoom: f64,
    width_px: u32,
    height_px: u32,
    min_zoom: f64,
    max_zoom: f64,
    last_animation: Option<Duration>,
}

impl Viewport {
    /// A viewport of the given container size at the initial view.
    pub const fn new(width_px: u32, height_px: u32) -> Self {
        Self {
            center: INITIAL_CENTER,
            zoom: INITIAL_ZOOM,
            width_px,
            height_px,
            min_zoom: 0.0,
            max_zoom: DEFAULT_MAX_ZOOM,
            last_animation: None,
        }
    }

    /// Container size in pixels.
    pub const fn size(&self) -> (u32, u32) {
        (self.width_px, self.height_px)
    }

    /// Duration of the most recent fly-to animation.
    pub const fn last_animation(&self) -> Option<Duration> {
        self.last_animation
    }

    /// Zoom level at which `bounds` fits inside the padded container.
    pub fn bounds_zoom(&self, bounds: GeoBounds, padding_px: u32) -> f64 {
        let pad = f64::from(padding_px) * 2.0;
        let avail_x = (f64::from(self.width_px) - pad).max(1.0);
        let avail_y = (f64::from(self.height_px) - pad).max(1.0);

        let (west, north) = project(LatLon::new(bounds.north, bounds.west));
        let (east, south) = project(LatLon::new(bounds.south, bounds.east));
        let span_x = (east - west).abs();
        let span_y = (south - north).abs();

        let scale = (avail_x / span_x).min(avail_y / span_y);
        scale.log2().floor().clamp(self.min_zoom, self.max_zoom)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(800, 320)
    }
}

impl MapSurface for Viewport {
    fn zoom(&self) -> f64 {
        self.zoom
    }

    fn center(&self) -> LatLon {
        self.center
    }

    fn fit_bounds(&mut self, bounds: GeoBounds, padding_px: u32) {
        let (west, north) = project(LatLon::new(bounds.north, bounds.west));
        let (east, south) = project(LatLon::new(bounds.south, bounds.east));
        self.center = unproject((west + east) / 2.0, (north + south) / 2.0);
        self.zoom = self.bounds_zoom(bounds, padding_px);
        self.last_animation = None;
    }

    fn fly_to(&mut self, center: LatLon, zoom: f64, duration: Duration) {
        self.center = center;
        self.zoom = zoom.clamp(self.min_zoom, self.max_zoom);
        self.last_animation = Some(duration);
    }
}

/// Project to zoom-0 pixel space.
fn project(p: LatLon) -> (f64, f64) {
    let lat = p.lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT).to_radians();
    let x = (p.lon + 180.0) / 360.0 * TILE_SIZE;
    let y = (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / PI) / 2.0 * TILE_SIZE;
    (x, y)
}

fn unproject(x: f64, y: f64) -> LatLon {
    let lon = x / TILE_SIZE * 360.0 - 180.0;
    let n = PI * (1.0 - 2.0 * y / TILE_SIZE);
    let lat = n.sinh().atan().to_degrees();
    LatLon::new(lat, lon)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn starts_at_initial_view() {
        let vp = Viewport::default();
        assert_eq!(vp.center(), INITIAL_CENTER);
        assert!(close(vp.zoom(), INITIAL_ZOOM));
    }

    #[test]
    fn projection_round_trips() {
        for p in [LatLon::new(0.0, 0.0), LatLon::new(45.0, -120.0), LatLon::new(-33.9, 151.2)] {
            let (x, y) = project(p);
            let back = unproject(x, y);
            assert!(close(back.lat, p.lat) && close(back.lon, p.lon), "{p:?} -> {back:?}");
        }
    }

    #[test]
    fn whole_world_fits_at_low_zoom() {
        let vp = Viewport::new(800, 320);
        let world = GeoBounds {
            south: -60.0,
            west: -180.0,
            north: 70.0,
            east: 180.0,
        };
        assert!(vp.bounds_zoom(world, 20) <= 1.0);
    }

    #[test]
    fn single_point_fits_at_max_zoom() {
        let mut vp = Viewport::default();
        let point = GeoBounds {
            south: 10.0,
            west: 20.0,
            north: 10.0,
            east: 20.0,
        };
        vp.fit_bounds(point, 20);
        assert!(close(vp.zoom(), DEFAULT_MAX_ZOOM));
        assert!(close(vp.center().lat, 10.0) && close(vp.center().lon, 20.0));
    }

    #[test]
    fn smaller_regions_zoom_deeper() {
        let vp = Viewport::default();
        let wide = GeoBounds {
            south: 30.0,
            west: -125.0,
            north: 50.0,
            east: -65.0,
        };
        let narrow = GeoBounds {
            south: 37.0,
            west: -123.0,
            north: 38.0,
            east: -122.0,
        };
        assert!(vp.bounds_zoom(narrow, 20) > vp.bounds_zoom(wide, 20));
    }

    #[test]
    fn fly_to_records_animation_and_clamps_zoom() {
        let mut vp = Viewport::default();
        vp.fly_to(LatLon::new(1.0, 2.0), 40.0, Duration::from_millis(800));
        assert!(close(vp.zoom(), DEFAULT_MAX_ZOOM));
        assert_eq!(vp.last_animation(), Some(Duration::from_millis(800)));
        assert_eq!(vp.center(), LatLon::new(1.0, 2.0));
    }
}
