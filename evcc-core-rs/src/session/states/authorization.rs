//! Authorization and charge parameter discovery

use tracing::info;

use crate::error::SessionError;
use crate::messages::{
    AuthorizationReq, AuthorizationRes, ChargeParameterDiscoveryReq, ChargeParameterDiscoveryRes,
    PowerDeliveryReq, ResponseBody, V2gMessage,
};
use crate::session::state::{Collaborators, Outcome, State, Step};
use crate::session::{ongoing, validate, SessionContext};

pub fn authorization(
    ctx: &mut SessionContext,
    co: &mut Collaborators<'_>,
    msg: V2gMessage,
) -> Result<Outcome, SessionError> {
    let (_, res) = validate::<AuthorizationRes>(ctx, msg)?;

    if res.evse_processing.is_finished() {
        ctx.ongoing_timer = None;
        info!("Authorization finished");
        let req = charge_parameter_discovery_req(ctx, co);
        return Ok(Step::new(ctx, State::ChargeParameterDiscovery, req).into_outcome());
    }

    let step = Step::new(ctx, State::Authorization, AuthorizationReq::default());
    let timeout = ongoing::check(ctx, AuthorizationRes::KIND, step.timeout)?;
    Ok(step.repeat(timeout).into_outcome())
}

pub fn charge_parameter_discovery(
    ctx: &mut SessionContext,
    co: &mut Collaborators<'_>,
    msg: V2gMessage,
) -> Result<Outcome, SessionError> {
    let (_, res) = validate::<ChargeParameterDiscoveryRes>(ctx, msg)?;

    if res.evse_processing.is_finished() {
        ctx.ongoing_timer = None;

        let schedules = res.sa_schedule_list.unwrap_or_default();
        let selection = co.ev.process_schedules(&schedules)?;
        ctx.selected_schedule = Some(selection.schedule_id);
        info!(
            "Schedule {} selected out of {} offered",
            selection.schedule_id,
            schedules.len()
        );

        let req = PowerDeliveryReq {
            charge_progress: selection.charge_progress,
            sa_schedule_tuple_id: selection.schedule_id,
            charging_profile: selection.charging_profile,
        };
        return Ok(Step::new(ctx, State::PowerDelivery, req).into_outcome());
    }

    let req = charge_parameter_discovery_req(ctx, co);
    let step = Step::new(ctx, State::ChargeParameterDiscovery, req);
    let timeout = ongoing::check(ctx, ChargeParameterDiscoveryRes::KIND, step.timeout)?;
    Ok(step.repeat(timeout).into_outcome())
}

/// Discovery request from the EV's current charge parameters
pub fn charge_parameter_discovery_req(ctx: &SessionContext, co: &Collaborators<'_>) -> ChargeParameterDiscoveryReq {
    let params = co.ev.charge_params();
    ChargeParameterDiscoveryReq {
        max_entries_sa_schedule_tuple: None,
        requested_energy_transfer_mode: ctx.selected_energy_mode.unwrap_or(params.energy_mode),
        ac_ev_charge_parameter: params.ac_parameters,
        dc_ev_charge_parameter: params.dc_parameters,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::config::Timeouts;
    use crate::messages::{
        Body, ChargeProgress, EnergyTransferMode, EvseProcessing, MessageKind, PMaxScheduleEntry,
        PhysicalValue, ResponseCode, SaScheduleTuple, SessionId, UnitSymbol,
    };
    use crate::session::states::testing::{ev, Harness, SESSION_ID};

    fn authorization_res(processing: EvseProcessing) -> AuthorizationRes {
        AuthorizationRes {
            response_code: ResponseCode::Ok,
            evse_processing: processing,
        }
    }

    fn discovery_res(processing: EvseProcessing) -> ChargeParameterDiscoveryRes {
        ChargeParameterDiscoveryRes {
            response_code: ResponseCode::Ok,
            evse_processing: processing,
            sa_schedule_list: processing.is_finished().then(|| {
                vec![SaScheduleTuple {
                    sa_schedule_tuple_id: 7,
                    p_max_schedule: vec![PMaxScheduleEntry {
                        start: 0,
                        duration: Some(86_400),
                        p_max: PhysicalValue::new(11, 3, UnitSymbol::W),
                    }],
                }]
            }),
            ac_evse_status: None,
            dc_evse_status: None,
        }
    }

    fn harness(authorization: Duration, ongoing: Duration) -> Harness {
        let timeouts = Timeouts {
            authorization,
            ongoing,
            ..Timeouts::default()
        };
        let mut h = Harness::with_timeouts(false, ev(EnergyTransferMode::AcThreePhaseCore, false), timeouts);
        h.ctx.assign_session_id(SessionId(SESSION_ID.to_vec())).unwrap();
        h.ctx.selected_energy_mode = Some(EnergyTransferMode::AcThreePhaseCore);
        h
    }

    #[tokio::test(start_paused = true)]
    async fn test_finished_moves_to_discovery() {
        let mut h = harness(Duration::from_secs(2), Duration::from_secs(60));
        h.ctx.request_sent(false);

        let step = h.step(State::Authorization, authorization_res(EvseProcessing::Finished));

        assert_eq!(step.state, State::ChargeParameterDiscovery);
        assert!(!step.repeat);
        assert!(h.ctx.ongoing_timer.is_none());
        match step.message.body {
            Body::ChargeParameterDiscoveryReq(req) => {
                assert_eq!(req.requested_energy_transfer_mode, EnergyTransferMode::AcThreePhaseCore);
                assert!(req.ac_ev_charge_parameter.is_some());
            }
            other => panic!("Expected ChargeParameterDiscoveryReq, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_ongoing_three_times_exceeds_budget() {
        let mut h = harness(Duration::from_secs(2), Duration::from_secs(5));
        h.ctx.request_sent(false);

        // t = 2s
        tokio::time::advance(Duration::from_secs(2)).await;
        let step = h.step(State::Authorization, authorization_res(EvseProcessing::Ongoing));
        assert_eq!(step.state, State::Authorization);
        assert!(step.repeat);
        assert_eq!(step.timeout, Duration::from_secs(2));
        assert_eq!(step.message.body, Body::AuthorizationReq(AuthorizationReq::default()));
        h.ctx.request_sent(step.repeat);

        // t = 4s: only 1s of budget left
        tokio::time::advance(Duration::from_secs(2)).await;
        let step = h.step(State::Authorization, authorization_res(EvseProcessing::Ongoing));
        assert_eq!(step.timeout, Duration::from_secs(1));
        h.ctx.request_sent(step.repeat);

        // t = 6s: over budget, no fourth request
        tokio::time::advance(Duration::from_secs(2)).await;
        match h.process(State::Authorization, authorization_res(EvseProcessing::Ongoing)) {
            Outcome::Failed(SessionError::OngoingTimeout { kind, elapsed }) => {
                assert_eq!(kind, MessageKind::AuthorizationRes);
                assert_eq!(elapsed, Duration::from_secs(6));
            }
            other => panic!("Expected OngoingTimeout, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_finished_after_budget_accepted() {
        let mut h = harness(Duration::from_secs(2), Duration::from_secs(5));
        h.ctx.request_sent(false);

        tokio::time::advance(Duration::from_secs(4)).await;
        let step = h.step(State::Authorization, authorization_res(EvseProcessing::Ongoing));
        h.ctx.request_sent(step.repeat);

        tokio::time::advance(Duration::from_secs(3)).await;
        let step = h.step(State::Authorization, authorization_res(EvseProcessing::Finished));
        assert_eq!(step.state, State::ChargeParameterDiscovery);
    }

    #[tokio::test(start_paused = true)]
    async fn test_customer_interaction_counts_as_ongoing() {
        let mut h = harness(Duration::from_secs(2), Duration::from_secs(60));
        h.ctx.request_sent(false);

        let step = h.step(
            State::Authorization,
            authorization_res(EvseProcessing::OngoingWaitingForCustomerInteraction),
        );
        assert_eq!(step.state, State::Authorization);
        assert!(step.repeat);
        assert!(h.ctx.ongoing_timer.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_discovery_ongoing_then_finished() {
        let mut h = harness(Duration::from_secs(2), Duration::from_secs(60));
        h.ctx.request_sent(false);

        tokio::time::advance(Duration::from_secs(1)).await;
        let step = h.step(State::ChargeParameterDiscovery, discovery_res(EvseProcessing::Ongoing));
        assert_eq!(step.state, State::ChargeParameterDiscovery);
        assert!(step.repeat);
        assert!(matches!(step.message.body, Body::ChargeParameterDiscoveryReq(_)));
        h.ctx.request_sent(step.repeat);

        let step = h.step(State::ChargeParameterDiscovery, discovery_res(EvseProcessing::Finished));
        assert_eq!(step.state, State::PowerDelivery);
        assert_eq!(h.ctx.selected_schedule, Some(7));
        assert!(h.ctx.ongoing_timer.is_none());
        match step.message.body {
            Body::PowerDeliveryReq(req) => {
                assert_eq!(req.charge_progress, ChargeProgress::Start);
                assert_eq!(req.sa_schedule_tuple_id, 7);
            }
            other => panic!("Expected PowerDeliveryReq, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_discovery_without_schedules_fails() {
        let mut h = harness(Duration::from_secs(2), Duration::from_secs(60));
        let mut res = discovery_res(EvseProcessing::Finished);
        res.sa_schedule_list = None;

        assert!(matches!(
            h.process(State::ChargeParameterDiscovery, res),
            Outcome::Failed(SessionError::EvController(_))
        ));
    }
}
