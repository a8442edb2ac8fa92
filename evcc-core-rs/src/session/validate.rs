//! Inbound message validation

use tracing::warn;

use super::SessionContext;
use crate::error::SessionError;
use crate::messages::{Header, ResponseBody, V2gMessage};

/// Check that `msg` is a `T` for the current session and not a failure
///
/// The session id is only compared once one has been assigned.
pub fn validate<T: ResponseBody>(ctx: &SessionContext, msg: V2gMessage) -> Result<(Header, T), SessionError> {
    let received = msg.kind();
    let V2gMessage { header, body } = msg;

    let res = T::from_body(body).ok_or(SessionError::UnexpectedMessage {
        expected: T::KIND,
        received,
    })?;

    if let Some(expected) = ctx.assigned_session_id() {
        if header.session_id != *expected {
            return Err(SessionError::SessionIdMismatch {
                expected: expected.to_string(),
                received: header.session_id.to_string(),
            });
        }
    }

    let code = res.response_code();
    if code.is_failure() {
        warn!("{} answered with {:?}", T::KIND, code);
        return Err(SessionError::Rejected { kind: T::KIND, code });
    }

    Ok((header, res))
}
