//! Coordinate → place resolution.
//!
//! Sources frequently send bare coordinates. Before fingerprinting, admission
//! resolves them against a table of bounding boxes; the first box containing
//! the point wins. Points outside every box resolve to the fallback place.

use serde::{Deserialize, Serialize};

use crate::fact::{Location, Place};

/// A named rectangle in latitude/longitude space (bounds inclusive).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceBox {
  pub country:      String,
  pub province:     String,
  pub municipality: String,
  /// `[min, max]` latitude.
  pub lat:          [f64; 2],
  /// `[min, max]` longitude.
  pub lon:          [f64; 2],
}

impl PlaceBox {
  fn contains(&self, loc: &Location) -> bool {
    (self.lat[0]..=self.lat[1]).contains(&loc.latitude)
      && (self.lon[0]..=self.lon[1]).contains(&loc.longitude)
  }

  fn place(&self) -> Place {
    Place {
      country:      Some(self.country.clone()),
      province:     Some(self.province.clone()),
      municipality: Some(self.municipality.clone()),
    }
  }
}

#[derive(Debug, Clone)]
pub struct PlaceResolver {
  boxes:    Vec<PlaceBox>,
  fallback: Place,
}

impl PlaceResolver {
  pub fn new(boxes: Vec<PlaceBox>) -> Self {
    Self {
      boxes,
      fallback: Place {
        country:      Some("Argentina".into()),
        province:     None,
        municipality: None,
      },
    }
  }

  /// Resolve `loc` to a place. Invalid coordinates resolve to nothing.
  pub fn resolve(&self, loc: &Location) -> Option<Place> {
    if !loc.is_valid() {
      return None;
    }
    Some(
      self
        .boxes
        .iter()
        .find(|b| b.contains(loc))
        .map(PlaceBox::place)
        .unwrap_or_else(|| self.fallback.clone()),
    )
  }

  /// Fill `loc.place` when the source left it empty.
  pub fn fill(&self, loc: &mut Location) {
    if loc.place.is_none() {
      loc.place = self.resolve(loc);
    }
  }
}

impl Default for PlaceResolver {
  fn default() -> Self {
    Self::new(vec![
      PlaceBox {
        country:      "Argentina".into(),
        province:     "Buenos Aires".into(),
        municipality: "CABA".into(),
        lat:          [-35.0, -34.0],
        lon:          [-59.0, -58.0],
      },
      PlaceBox {
        country:      "Argentina".into(),
        province:     "Río Negro".into(),
        municipality: "General Roca".into(),
        lat:          [-40.0, -38.0],
        lon:          [-64.0, -62.0],
      },
    ])
  }
}
