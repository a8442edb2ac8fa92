//! Power delivery, the AC and DC charging loops, metering receipts and session stop

use tracing::{debug, info, warn};

use super::authorization::charge_parameter_discovery_req;
use crate::error::{SessionError, StopReason};
use crate::messages::{
    ChargeProgress, ChargingSession, ChargingStatusReq, ChargingStatusRes, CurrentDemandRes,
    EvseNotification, MeterInfo, MeteringReceiptReq, MeteringReceiptRes,
    PowerDeliveryReq, PowerDeliveryRes, SessionStopReq, SessionStopRes, V2gMessage,
};
use crate::security::{KeyPath, SignedElement};
use crate::session::state::{Collaborators, Outcome, State, Step};
use crate::session::{validate, ResumeState, SessionContext};

/// Element id of the signed MeteringReceiptReq
const METERING_RECEIPT_REQ_ID: &str = "id1";

pub fn power_delivery(
    ctx: &mut SessionContext,
    co: &mut Collaborators<'_>,
    msg: V2gMessage,
) -> Result<Outcome, SessionError> {
    validate::<PowerDeliveryRes>(ctx, msg)?;

    if let Some(stop) = ctx.charging_session_stop() {
        info!("Stopping session ({:?})", stop);
        let req = SessionStopReq { charging_session: stop };
        return Ok(Step::new(ctx, State::SessionStop, req).into_outcome());
    }

    if ctx.renegotiation_requested {
        ctx.renegotiation_requested = false;
        info!("Renegotiating charge parameters");
        let req = charge_parameter_discovery_req(ctx, co);
        return Ok(Step::new(ctx, State::ChargeParameterDiscovery, req).into_outcome());
    }

    if ctx.energy_mode_is_ac() {
        return Ok(Step::new(ctx, State::ChargingStatus, ChargingStatusReq {}).into_outcome());
    }

    current_demand_step(ctx, co)
}

pub fn charging_status(
    ctx: &mut SessionContext,
    co: &mut Collaborators<'_>,
    msg: V2gMessage,
) -> Result<Outcome, SessionError> {
    let (_, res) = validate::<ChargingStatusRes>(ctx, msg)?;

    let ChargingStatusRes {
        sa_schedule_tuple_id,
        meter_info,
        receipt_required,
        ac_evse_status,
        ..
    } = res;

    loop_transition(
        ctx,
        co,
        LoopStatus {
            receipt_required: receipt_required.unwrap_or(false),
            sa_schedule_tuple_id,
            meter_info,
            notification: ac_evse_status.evse_notification,
        },
        |ctx, _| Ok(Step::new(ctx, State::ChargingStatus, ChargingStatusReq {}).into_outcome()),
    )
}

pub fn current_demand(
    ctx: &mut SessionContext,
    co: &mut Collaborators<'_>,
    msg: V2gMessage,
) -> Result<Outcome, SessionError> {
    let (_, res) = validate::<CurrentDemandRes>(ctx, msg)?;

    let CurrentDemandRes {
        dc_evse_status,
        sa_schedule_tuple_id,
        meter_info,
        receipt_required,
        evse_present_voltage,
        evse_present_current,
        ..
    } = res;
    debug!(
        "DC present {} V / {} A",
        evse_present_voltage.as_f64(),
        evse_present_current.as_f64()
    );

    loop_transition(
        ctx,
        co,
        LoopStatus {
            receipt_required: receipt_required.unwrap_or(false),
            sa_schedule_tuple_id,
            meter_info,
            notification: dc_evse_status.evse_notification,
        },
        current_demand_step,
    )
}

pub fn metering_receipt(
    ctx: &mut SessionContext,
    co: &mut Collaborators<'_>,
    msg: V2gMessage,
) -> Result<Outcome, SessionError> {
    let (_, res) = validate::<MeteringReceiptRes>(ctx, msg)?;

    let notification = res
        .ac_evse_status
        .map(|s| s.evse_notification)
        .or_else(|| res.dc_evse_status.map(|s| s.evse_notification))
        .unwrap_or_default();

    match notification {
        EvseNotification::StopCharging => stop_sequence(ctx, ChargingSession::Terminate),
        EvseNotification::ReNegotiation => renegotiate(ctx),
        EvseNotification::None if ctx.energy_mode_is_ac() => {
            Ok(Step::new(ctx, State::ChargingStatus, ChargingStatusReq {}).into_outcome())
        }
        EvseNotification::None => current_demand_step(ctx, co),
    }
}

pub fn session_stop(ctx: &mut SessionContext, msg: V2gMessage) -> Result<Outcome, SessionError> {
    validate::<SessionStopRes>(ctx, msg)?;

    let stop = ctx.charging_session_stop().unwrap_or(ChargingSession::Terminate);
    let mut reason = match stop {
        ChargingSession::Terminate => StopReason::success("terminated", ctx.peer.clone()),
        ChargingSession::Pause => StopReason::success("paused", ctx.peer.clone()),
    };
    if stop == ChargingSession::Pause {
        reason = reason.with_resume(ResumeState {
            auth_option: ctx.selected_auth_option,
            energy_mode: ctx.selected_energy_mode,
        });
    }

    info!("Session {} {}", ctx.session_id(), reason.reason);
    ctx.stop_reason = Some(reason.clone());
    Ok(Outcome::Terminated(reason))
}

// ============================================================================
// Shared transitions
// ============================================================================

/// What the AC and DC loops read from their status responses
struct LoopStatus {
    receipt_required: bool,
    sa_schedule_tuple_id: u8,
    meter_info: Option<MeterInfo>,
    notification: EvseNotification,
}

fn loop_transition(
    ctx: &mut SessionContext,
    co: &mut Collaborators<'_>,
    status: LoopStatus,
    poll: impl FnOnce(&mut SessionContext, &mut Collaborators<'_>) -> Result<Outcome, SessionError>,
) -> Result<Outcome, SessionError> {
    if status.receipt_required && ctx.is_tls {
        let meter_info = status.meter_info.ok_or_else(|| {
            SessionError::Incompatible("metering receipt required without meter info".into())
        })?;
        return metering_receipt_step(ctx, co, status.sa_schedule_tuple_id, meter_info);
    }

    match status.notification {
        EvseNotification::ReNegotiation => renegotiate(ctx),
        EvseNotification::StopCharging => {
            info!("EVSE requested stop");
            stop_sequence(ctx, ChargingSession::Terminate)
        }
        EvseNotification::None => {
            if co.ev.continue_charging() {
                return poll(ctx, co);
            }
            let stop = if co.ev.wants_pause() {
                ChargingSession::Pause
            } else {
                ChargingSession::Terminate
            };
            info!("EV finished charging");
            stop_sequence(ctx, stop)
        }
    }
}

fn metering_receipt_step(
    ctx: &mut SessionContext,
    co: &mut Collaborators<'_>,
    sa_schedule_tuple_id: u8,
    meter_info: MeterInfo,
) -> Result<Outcome, SessionError> {
    let req = MeteringReceiptReq {
        id: METERING_RECEIPT_REQ_ID.to_string(),
        session_id: ctx.session_id(),
        sa_schedule_tuple_id: Some(sa_schedule_tuple_id),
        meter_info,
    };

    let element = SignedElement::new(METERING_RECEIPT_REQ_ID, &req)
        .map_err(|e| SessionError::crypto("encoding MeteringReceiptReq", e))?;
    let signature = co
        .crypto
        .sign(&[element], KeyPath::ContractLeaf)
        .map_err(|e| SessionError::crypto("signing MeteringReceiptReq", e))?;

    Ok(Step::new(ctx, State::MeteringReceipt, req)
        .signed(signature)
        .into_outcome())
}

/// PowerDelivery(Stop) on the selected schedule; the session stops afterward
fn stop_sequence(ctx: &mut SessionContext, stop: ChargingSession) -> Result<Outcome, SessionError> {
    ctx.request_stop(stop);
    let req = PowerDeliveryReq {
        charge_progress: ChargeProgress::Stop,
        sa_schedule_tuple_id: ctx.selected_schedule()?,
        charging_profile: None,
    };
    Ok(Step::new(ctx, State::PowerDelivery, req).into_outcome())
}

/// PowerDelivery(Renegotiate); the following PowerDeliveryRes restarts discovery
fn renegotiate(ctx: &mut SessionContext) -> Result<Outcome, SessionError> {
    info!("EVSE requested renegotiation");
    ctx.renegotiation_requested = true;
    let req = PowerDeliveryReq {
        charge_progress: ChargeProgress::Renegotiate,
        sa_schedule_tuple_id: ctx.selected_schedule()?,
        charging_profile: None,
    };
    Ok(Step::new(ctx, State::PowerDelivery, req).into_outcome())
}

fn current_demand_step(ctx: &mut SessionContext, co: &mut Collaborators<'_>) -> Result<Outcome, SessionError> {
    let req = co.ev.current_demand_params().inspect_err(|e| {
        warn!("EV can't provide current demand: {}", e);
    })?;
    Ok(Step::new(ctx, State::CurrentDemand, req).into_outcome())
}
