//! Bounded, cancellable wait for a confirming reply.
//!
//! Destructive operations ask the requester to answer with [`AFFIRMATIVE`].
//! The wait is a `tokio::select!` over the next reply, a deadline and a
//! [`CancellationToken`], so it never holds anything that other operations
//! need.

use crate::domain::{ChannelId, UserId};
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// The reply that confirms, compared case-insensitively after trimming.
pub const AFFIRMATIVE: &str = "yes";

/// How long a confirmation prompt stays open by default.
pub const DEFAULT_CONFIRM_TIMEOUT: Duration = Duration::from_secs(30);

/// A message posted while a confirmation is pending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Who posted it
    pub author: UserId,

    /// Where it was posted
    pub channel: ChannelId,

    /// Raw message text
    pub content: String,
}

impl Reply {
    /// Create a reply
    pub fn new(author: impl Into<UserId>, channel: impl Into<ChannelId>, content: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            channel: channel.into(),
            content: content.into(),
        }
    }
}

/// A stream of replies, in the order they were posted.
///
/// `next_reply` must be cancel-safe: it is raced against a timer.
#[async_trait]
pub trait ReplySource: Send {
    /// The next reply, or `None` once the stream has ended.
    async fn next_reply(&mut self) -> Option<Reply>;
}

#[async_trait]
impl ReplySource for mpsc::Receiver<Reply> {
    async fn next_reply(&mut self) -> Option<Reply> {
        self.recv().await
    }
}

/// How a confirmation wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationOutcome {
    /// The requester answered with the affirmative token
    Confirmed,

    /// The requester answered with anything else
    Declined,

    /// No answer from the requester before the deadline
    TimedOut,

    /// The wait was cancelled or the reply stream ended
    Aborted,
}

/// Whether `content` is the affirmative token.
pub fn is_affirmative(content: &str) -> bool {
    content.trim().eq_ignore_ascii_case(AFFIRMATIVE)
}

/// Wait for `requester` to answer in `channel`.
///
/// Replies from anyone else, or from the requester in another channel, are
/// skipped without extending the deadline.
pub async fn await_confirmation<R>(
    replies: &mut R,
    requester: &UserId,
    channel: &ChannelId,
    timeout: Duration,
    cancel: &CancellationToken,
) -> ConfirmationOutcome
where
    R: ReplySource + ?Sized,
{
    let deadline = tokio::time::sleep(timeout);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                tracing::debug!("Confirmation cancelled");
                return ConfirmationOutcome::Aborted;
            }
            () = &mut deadline => {
                tracing::debug!(timeout_secs = timeout.as_secs(), "Confirmation timed out");
                return ConfirmationOutcome::TimedOut;
            }
            reply = replies.next_reply() => {
                let Some(reply) = reply else {
                    tracing::debug!("Reply stream closed while awaiting confirmation");
                    return ConfirmationOutcome::Aborted;
                };
                if &reply.author != requester || &reply.channel != channel {
                    continue;
                }
                return if is_affirmative(&reply.content) {
                    ConfirmationOutcome::Confirmed
                } else {
                    ConfirmationOutcome::Declined
                };
            }
        }
    }
}
