//! Free-text spam screening for deletion requests.
//!
//! Three independent checks, any of which is decisive:
//!
//! 1. two or more distinct lexicon phrases present;
//! 2. any single character, whitespace included, repeated [`REPEAT_RUN`]
//!    times in a row;
//! 3. a TF-IDF score over the lexicon above [`SCORE_THRESHOLD`].
//!
//! The classifier is built once and shared; it holds no mutable state.

/// Phrases typical of promotional spam in Spanish-language requests.
pub const LEXICON: &[&str] = &[
  "comprar",
  "gratis",
  "dinero",
  "ganar",
  "millones",
  "urgente",
  "oferta",
  "descuento",
  "increíble",
  "increible",
  "ganancias",
  "trabajo desde casa",
  "hacer dinero",
  "riqueza",
  "fortuna",
  "click aquí",
  "click aqui",
  "visita ahora",
  "actúa ya",
  "actua ya",
  "haz clic aquí",
  "suscríbete ahora",
  "promoción limitada",
  "solo hoy",
  "gana dinero rápido",
  "premio gratis",
];

pub const SCORE_THRESHOLD: f64 = 0.3;

/// Length of a same-character run that counts as spam.
pub const REPEAT_RUN: usize = 5;

#[derive(Debug, Clone)]
struct Phrase {
  text:  String,
  words: usize,
  idf:   f64,
}

#[derive(Debug, Clone)]
pub struct SpamClassifier {
  phrases: Vec<Phrase>,
}

impl SpamClassifier {
  /// Build a classifier over `lexicon`, precomputing each phrase's inverse
  /// document frequency as `ln(N / (1 + df))`, where `df` counts the lexicon
  /// entries that contain the phrase.
  pub fn new<I, S>(lexicon: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    let texts: Vec<String> = lexicon
      .into_iter()
      .map(|p| p.as_ref().trim().to_lowercase())
      .filter(|p| !p.is_empty())
      .collect();
    let n = texts.len() as f64;

    let phrases = texts
      .iter()
      .map(|text| {
        let df = texts.iter().filter(|other| other.contains(text.as_str())).count();
        Phrase {
          text:  text.clone(),
          words: text.split_whitespace().count(),
          idf:   (n / (1.0 + df as f64)).ln(),
        }
      })
      .collect();

    Self { phrases }
  }

  pub fn is_spam(&self, text: &str) -> bool {
    if text.trim().is_empty() {
      return false;
    }
    let lowered = text.to_lowercase();

    let distinct = self
      .phrases
      .iter()
      .filter(|p| lowered.contains(p.text.as_str()))
      .count();
    if distinct >= 2 {
      return true;
    }

    has_repeated_run(text, REPEAT_RUN) || self.score(&lowered) > SCORE_THRESHOLD
  }

  /// Sum of `tf × idf` over the lexicon for already-lowercased text.
  fn score(&self, lowered: &str) -> f64 {
    let total_words = lowered.split_whitespace().count();
    if total_words == 0 {
      return 0.0;
    }
    self
      .phrases
      .iter()
      .map(|p| {
        let occurrences = lowered.matches(p.text.as_str()).count();
        let tf = (occurrences * p.words) as f64 / total_words as f64;
        tf * p.idf
      })
      .sum()
  }
}

impl Default for SpamClassifier {
  fn default() -> Self { Self::new(LEXICON) }
}

fn has_repeated_run(text: &str, run: usize) -> bool {
  let mut prev = None;
  let mut len = 0;
  for c in text.chars() {
    if prev == Some(c) {
      len += 1;
    } else {
      prev = Some(c);
      len = 1;
    }
    if len >= run {
      return true;
    }
  }
  false
}
