//! Deletion requests and their resolution.
//!
//! A request is screened on submission: a reason that is too short or looks
//! like spam is stored already rejected, with the reason recorded. Requests
//! that pass wait for a moderator, who resolves them exactly once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, spam::SpamClassifier};

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::AsRefStr,
  strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RequestState {
  Pending,
  Approved,
  Rejected,
}

/// Why a request ended up rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RejectionReason {
  TooShort { min_chars: usize },
  Spam,
  Moderator,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionRequest {
  pub request_id:   Uuid,
  pub fact_id:      Uuid,
  pub reason:       String,
  pub requester:    Option<String>,
  pub state:        RequestState,
  pub spam:         bool,
  pub rejection:    Option<RejectionReason>,
  pub submitted_at: DateTime<Utc>,
  pub resolved_at:  Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDeletionRequest {
  pub fact_id:   Uuid,
  pub reason:    String,
  #[serde(default)]
  pub requester: Option<String>,
}

/// Screening rules applied on submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeletionPolicy {
  pub min_reason_chars: usize,
}

impl Default for DeletionPolicy {
  fn default() -> Self { Self { min_reason_chars: 500 } }
}

impl DeletionPolicy {
  fn long_enough(&self, reason: &str) -> bool {
    reason.trim().chars().count() >= self.min_reason_chars
  }

  /// Screen `input` and build the request to persist. Spam takes precedence
  /// over length as the recorded rejection reason.
  pub fn screen(
    &self,
    input: NewDeletionRequest,
    classifier: &SpamClassifier,
    now: DateTime<Utc>,
  ) -> DeletionRequest {
    let spam = classifier.is_spam(&input.reason);
    let rejection = if spam {
      Some(RejectionReason::Spam)
    } else if !self.long_enough(&input.reason) {
      Some(RejectionReason::TooShort { min_chars: self.min_reason_chars })
    } else {
      None
    };

    let (state, resolved_at) = match rejection {
      Some(_) => (RequestState::Rejected, Some(now)),
      None => (RequestState::Pending, None),
    };

    DeletionRequest {
      request_id: Uuid::new_v4(),
      fact_id: input.fact_id,
      reason: input.reason,
      requester: input.requester,
      state,
      spam,
      rejection,
      submitted_at: now,
      resolved_at,
    }
  }

  pub fn is_valid(&self, request: &DeletionRequest) -> bool {
    !request.spam && self.long_enough(&request.reason)
  }
}

impl DeletionRequest {
  fn resolve(
    &mut self,
    state: RequestState,
    rejection: Option<RejectionReason>,
    now: DateTime<Utc>,
  ) -> Result<()> {
    if self.state != RequestState::Pending {
      return Err(Error::AlreadyResolved(self.request_id));
    }
    self.state = state;
    self.rejection = rejection;
    self.resolved_at = Some(now);
    Ok(())
  }

  /// Approve the request. The caller is responsible for soft-deleting the
  /// target fact.
  pub fn approve(&mut self, now: DateTime<Utc>) -> Result<()> {
    self.resolve(RequestState::Approved, None, now)
  }

  pub fn reject(&mut self, now: DateTime<Utc>) -> Result<()> {
    self.resolve(RequestState::Rejected, Some(RejectionReason::Moderator), now)
  }

  pub fn mark_spam(&mut self, now: DateTime<Utc>) -> Result<()> {
    self.resolve(RequestState::Rejected, Some(RejectionReason::Spam), now)?;
    self.spam = true;
    Ok(())
  }
}
