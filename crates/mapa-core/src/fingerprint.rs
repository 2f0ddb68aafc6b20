//! Content fingerprints used to collapse duplicate reports.
//!
//! A fingerprint is a SHA-256 hash over the normalized title, description,
//! occurrence minute and place of a fact. Case, accents and runs of
//! whitespace never affect it; neither do category, tags or provenance.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use unicode_normalization::{UnicodeNormalization as _, char::is_combining_mark};

use crate::fact::Location;

/// Borrowed view of the fields a fingerprint is computed from.
#[derive(Debug, Clone, Copy)]
pub struct ContentKey<'a> {
  pub title:       &'a str,
  pub description: &'a str,
  pub occurred_at: DateTime<Utc>,
  pub location:    Option<&'a Location>,
}

/// Hex-encoded SHA-256 digest of a fact's [`ContentKey`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
  /// Compute the fingerprint of `key`. Stable across processes and runs.
  pub fn of(key: &ContentKey<'_>) -> Self {
    let mut hasher = Sha256::new();
    hasher.update(fold(key.title).as_bytes());
    hasher.update(b"|");
    hasher.update(fold(key.description).as_bytes());
    hasher.update(b"|");
    hasher.update(key.occurred_at.format("%Y-%m-%dT%H:%M").to_string().as_bytes());
    hasher.update(b"|");
    hasher.update(place_component(key.location).as_bytes());
    Self(hex::encode(hasher.finalize()))
  }

  /// Wrap an already-computed digest, e.g. one read back from storage.
  pub fn from_hex(hex: impl Into<String>) -> Self { Self(hex.into()) }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for Fingerprint {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// Lowercase, strip diacritics and collapse whitespace, so "Inundación" and
/// " inundacion " compare equal.
pub fn fold(s: &str) -> String {
  let stripped: String = s.nfd().filter(|c| !is_combining_mark(*c)).collect();
  stripped
    .split_whitespace()
    .map(str::to_lowercase)
    .collect::<Vec<_>>()
    .join(" ")
}

/// The resolved place when there is one, otherwise the coordinates at
/// ~100 m precision.
fn place_component(location: Option<&Location>) -> String {
  let Some(loc) = location else {
    return String::new();
  };
  match &loc.place {
    Some(place) => [&place.country, &place.province, &place.municipality]
      .iter()
      .map(|level| level.as_deref().map(fold).unwrap_or_default())
      .collect::<Vec<_>>()
      .join("/"),
    None => format!("{:.3},{:.3}", loc.latitude, loc.longitude),
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;
  use crate::fact::Place;

  fn at(min: u32, sec: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, min, sec).unwrap()
  }

  fn key<'a>(
    title: &'a str,
    description: &'a str,
    occurred_at: DateTime<Utc>,
    location: Option<&'a Location>,
  ) -> ContentKey<'a> {
    ContentKey { title, description, occurred_at, location }
  }

  #[test]
  fn recomputing_is_stable() {
    let k = key("Granizo", "Piedras grandes", at(15, 0), None);
    assert_eq!(Fingerprint::of(&k), Fingerprint::of(&k));
    assert_eq!(Fingerprint::of(&k).as_str().len(), 64);
  }

  #[test]
  fn case_and_whitespace_do_not_matter() {
    let a = Fingerprint::of(&key("Granizo", "Piedras grandes", at(15, 0), None));
    let b = Fingerprint::of(&key(
      "  GRANIZO ",
      "piedras   GRANDES",
      at(15, 0),
      None,
    ));
    assert_eq!(a, b);
  }

  #[test]
  fn accents_do_not_matter() {
    let a = Fingerprint::of(&key("Inundación", "Crecida del río", at(15, 0), None));
    let b = Fingerprint::of(&key("INUNDACION", "crecida del rio", at(15, 0), None));
    assert_eq!(a, b);
    assert_eq!(fold("  Ñandú  PÚRPURA "), "nandu purpura");
  }

  #[test]
  fn seconds_are_truncated_to_the_minute() {
    let a = Fingerprint::of(&key("Granizo", "x", at(15, 2), None));
    let b = Fingerprint::of(&key("Granizo", "x", at(15, 59), None));
    let c = Fingerprint::of(&key("Granizo", "x", at(16, 0), None));
    assert_eq!(a, b);
    assert_ne!(a, c);
  }

  #[test]
  fn place_distinguishes_events() {
    let caba = Location {
      latitude:  -34.6,
      longitude: -58.4,
      place:     Some(Place {
        country:      Some("Argentina".into()),
        province:     Some("Buenos Aires".into()),
        municipality: Some("CABA".into()),
      }),
    };
    let roca = Location {
      latitude:  -39.0,
      longitude: -63.0,
      place:     Some(Place {
        country:      Some("Argentina".into()),
        province:     Some("Río Negro".into()),
        municipality: Some("General Roca".into()),
      }),
    };
    let a = Fingerprint::of(&key("Granizo", "x", at(15, 0), Some(&caba)));
    let b = Fingerprint::of(&key("Granizo", "x", at(15, 0), Some(&roca)));
    let c = Fingerprint::of(&key("Granizo", "x", at(15, 0), None));
    assert_ne!(a, b);
    assert_ne!(a, c);
  }

  #[test]
  fn unresolved_coordinates_are_compared_at_three_decimals() {
    let near = |lat: f64| Location { latitude: lat, longitude: -58.4, place: None };
    let (l1, l2, l3) = (near(-34.60001), near(-34.60049), near(-34.61));
    let a = Fingerprint::of(&key("t", "d", at(0, 0), Some(&l1)));
    let b = Fingerprint::of(&key("t", "d", at(0, 0), Some(&l2)));
    let c = Fingerprint::of(&key("t", "d", at(0, 0), Some(&l3)));
    assert_eq!(a, b);
    assert_ne!(a, c);
  }
}
