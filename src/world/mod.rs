//! Bounds of the simulated area and the optional hotspot

use rand::Rng;

use crate::core::config::WorldConfig;
use crate::core::types::Vec2;

/// A fixed disk agents may jump to and return from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hotspot {
    pub center: Vec2,
    pub radius: f64,
}

impl Hotspot {
    pub fn new(center: Vec2, radius: f64) -> Self {
        Self { center, radius }
    }

    /// Pick a point inside the disk
    ///
    /// Radius and angle are drawn independently, so points cluster toward
    /// the center. A busy shop is crowded in the middle.
    pub fn sample_point<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec2 {
        let r = rng.gen::<f64>() * self.radius;
        let theta = rng.gen::<f64>() * std::f64::consts::TAU;
        self.center + Vec2::from_angle(theta) * r
    }

    pub fn contains(&self, point: Vec2) -> bool {
        self.center.distance(&point) <= self.radius
    }
}

/// Immutable simulated area `[0, width] x [0, height]`
#[derive(Debug, Clone, PartialEq)]
pub struct World {
    width: f64,
    height: f64,
    hotspot: Option<Hotspot>,
}

impl World {
    pub fn new(width: f64, height: f64, hotspot: Option<Hotspot>) -> Self {
        Self { width, height, hotspot }
    }

    pub fn from_config(config: &WorldConfig) -> Self {
        Self::new(
            config.width,
            config.height,
            config
                .hotspot
                .map(|h| Hotspot::new(Vec2::from(h.center), h.radius)),
        )
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.height
    }

    #[inline]
    pub fn hotspot(&self) -> Option<&Hotspot> {
        self.hotspot.as_ref()
    }

    #[inline]
    pub fn contains(&self, pos: Vec2) -> bool {
        (0.0..=self.width).contains(&pos.x) && (0.0..=self.height).contains(&pos.y)
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width / 2.0, self.height / 2.0)
    }

    /// Uniform point over the whole area
    pub fn sample_point<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec2 {
        Vec2::new(
            rng.gen_range(0.0..=self.width),
            rng.gen_range(0.0..=self.height),
        )
    }
}
