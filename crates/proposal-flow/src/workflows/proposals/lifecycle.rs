//! Forward-only lifecycle state machine over proposal records.

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::domain::{ProposalRecord, ProposalStatus};

/// Externally triggered lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Operator delivered (or re-delivered) the proposal.
    Sent,
    /// Counterparty opened the proposal link.
    Viewed,
    /// Counterparty submitted a signature.
    Signed,
    /// A payment completion notification arrived.
    PaymentReceived,
}

impl Transition {
    const fn name(self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Viewed => "viewed",
            Self::Signed => "signed",
            Self::PaymentReceived => "payment",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("this proposal has already been signed")]
    AlreadySigned,
    #[error("cannot apply '{transition}' while proposal is '{status}'")]
    InvalidTransition {
        transition: &'static str,
        status: &'static str,
    },
}

/// What a transition actually changed, so callers know whether the record
/// needs a durable write and whether downstream notifications should fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionEffect {
    pub status_advanced: bool,
    pub timestamp_recorded: bool,
}

impl TransitionEffect {
    pub fn changed(self) -> bool {
        self.status_advanced || self.timestamp_recorded
    }
}

/// Applies transitions to a record. Status only ever moves forward in the
/// order draft < sent < viewed < signed < paid; timestamps are set exactly
/// once, by the first occurrence of their transition.
pub struct LifecycleTracker;

impl LifecycleTracker {
    pub fn apply(
        record: &mut ProposalRecord,
        transition: Transition,
        now: DateTime<Utc>,
    ) -> Result<TransitionEffect, LifecycleError> {
        match transition {
            Transition::Sent => Ok(Self::advance_with_stamp(
                record,
                ProposalStatus::Sent,
                now,
                |record| &mut record.sent_at,
            )),
            Transition::Viewed => Ok(Self::advance_with_stamp(
                record,
                ProposalStatus::Viewed,
                now,
                |record| &mut record.viewed_at,
            )),
            Transition::Signed => {
                // Acceptance from draft is tolerated (a view event may never
                // have been recorded separately), but signing twice is not.
                if record.status.rank() >= ProposalStatus::Signed.rank() {
                    return Err(LifecycleError::AlreadySigned);
                }
                Ok(Self::advance_with_stamp(
                    record,
                    ProposalStatus::Signed,
                    now,
                    |record| &mut record.signed_at,
                ))
            }
            Transition::PaymentReceived => {
                if record.status.rank() < ProposalStatus::Signed.rank() {
                    return Err(LifecycleError::InvalidTransition {
                        transition: transition.name(),
                        status: record.status.label(),
                    });
                }
                Ok(Self::advance_with_stamp(
                    record,
                    ProposalStatus::Paid,
                    now,
                    |record| &mut record.paid_at,
                ))
            }
        }
    }

    /// Move status forward to `target` if it is ahead of the current status
    /// and stamp the transition timestamp on first occurrence only.
    fn advance_with_stamp(
        record: &mut ProposalRecord,
        target: ProposalStatus,
        now: DateTime<Utc>,
        timestamp: impl Fn(&mut ProposalRecord) -> &mut Option<DateTime<Utc>>,
    ) -> TransitionEffect {
        let status_advanced = target.rank() > record.status.rank();
        if status_advanced {
            record.status = target;
        }

        let slot = timestamp(record);
        let timestamp_recorded = slot.is_none();
        if timestamp_recorded {
            *slot = Some(now);
        }

        TransitionEffect {
            status_advanced,
            timestamp_recorded,
        }
    }
}
