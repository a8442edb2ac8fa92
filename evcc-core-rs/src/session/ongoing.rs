//! Bounded repeats of a request the SECC is still processing
//!
//! The budget covers every repeat of one logical request and starts when
//! that request was first sent. It is checked before any reissue.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

use super::SessionContext;
use crate::error::SessionError;
use crate::messages::MessageKind;

/// Start or check the ongoing budget after an `Ongoing` answer to `kind`
///
/// Returns the timeout for the reissued request: the request's own timeout,
/// shortened to what is left of the budget. At exactly the bound the budget
/// is not yet exceeded, so the request is reissued with a zero timeout and
/// the driver's response timeout ends the session.
pub fn check(ctx: &mut SessionContext, kind: MessageKind, request_timeout: Duration) -> Result<Duration, SessionError> {
    let now = Instant::now();
    let started = *ctx
        .ongoing_timer
        .get_or_insert(ctx.request_issued_at.unwrap_or(now));
    let elapsed = now.saturating_duration_since(started);
    let budget = ctx.timeouts.ongoing;

    if elapsed > budget {
        warn!("{} still ongoing after {:?} (budget {:?})", kind, elapsed, budget);
        ctx.ongoing_timer = None;
        return Err(SessionError::OngoingTimeout { kind, elapsed });
    }

    let remaining = budget - elapsed;
    debug!("{} ongoing, {:?} of budget left", kind, remaining);
    Ok(request_timeout.min(remaining))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Timeouts;

    fn context(budget: Duration) -> SessionContext {
        let timeouts = Timeouts {
            ongoing: budget,
            ..Timeouts::default()
        };
        SessionContext::new(vec![1; 6], false, timeouts)
    }

    #[tokio::test(start_paused = true)]
    async fn test_budget_backdated_to_first_issue() {
        let mut ctx = context(Duration::from_secs(5));
        ctx.request_sent(false);

        tokio::time::advance(Duration::from_secs(2)).await;
        let timeout = check(&mut ctx, MessageKind::AuthorizationReq, Duration::from_secs(2)).unwrap();
        assert_eq!(timeout, Duration::from_secs(2));
        assert_eq!(ctx.ongoing_timer, ctx.request_issued_at);

        ctx.request_sent(true);
        tokio::time::advance(Duration::from_secs(2)).await;
        let timeout = check(&mut ctx, MessageKind::AuthorizationReq, Duration::from_secs(2)).unwrap();
        assert_eq!(timeout, Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_bound_is_strict() {
        let mut ctx = context(Duration::from_secs(5));
        ctx.request_sent(false);

        // elapsed == budget is not over the bound; nothing is left for the reissue
        tokio::time::advance(Duration::from_secs(5)).await;
        let timeout = check(&mut ctx, MessageKind::AuthorizationReq, Duration::from_secs(2)).unwrap();
        assert_eq!(timeout, Duration::ZERO);
        assert!(ctx.ongoing_timer.is_some());

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(matches!(
            check(&mut ctx, MessageKind::AuthorizationReq, Duration::from_secs(2)),
            Err(SessionError::OngoingTimeout { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_request_restarts_budget() {
        let mut ctx = context(Duration::from_secs(5));
        ctx.request_sent(false);
        tokio::time::advance(Duration::from_secs(4)).await;
        check(&mut ctx, MessageKind::AuthorizationReq, Duration::from_secs(2)).unwrap();

        ctx.request_sent(false);
        assert!(ctx.ongoing_timer.is_none());
        tokio::time::advance(Duration::from_secs(4)).await;
        let timeout = check(&mut ctx, MessageKind::ChargeParameterDiscoveryReq, Duration::from_secs(2)).unwrap();
        assert_eq!(timeout, Duration::from_secs(1));
    }
}
