//! Mutable record of one charging session

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::config::Timeouts;
use crate::error::{SessionError, StopReason};
use crate::messages::{AuthOption, ChargingSession, EnergyTransferMode, SelectedService, ServiceId, SessionId};

/// Choices carried over from a paused session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_option: Option<AuthOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy_mode: Option<EnergyTransferMode>,
}

#[derive(Debug, Clone)]
pub struct SessionContext {
    session_id: Option<SessionId>,
    evse_id: Option<String>,
    selected_services: Vec<SelectedService>,
    charging_session_stop: Option<ChargingSession>,

    pub evcc_id: Vec<u8>,
    pub is_tls: bool,
    pub peer: Option<String>,
    pub timeouts: Timeouts,
    pub resume: Option<ResumeState>,

    pub selected_auth_option: Option<AuthOption>,
    pub selected_energy_mode: Option<EnergyTransferMode>,
    /// LIFO of services whose details are still to be requested
    pub service_details_to_request: Vec<ServiceId>,
    pub selected_schedule: Option<u8>,
    pub renegotiation_requested: bool,

    /// Start of the current ongoing budget
    pub ongoing_timer: Option<Instant>,
    /// When the current logical request was first sent
    pub request_issued_at: Option<Instant>,

    pub stop_reason: Option<StopReason>,
}

impl SessionContext {
    pub fn new(evcc_id: Vec<u8>, is_tls: bool, timeouts: Timeouts) -> Self {
        Self {
            session_id: None,
            evse_id: None,
            selected_services: Vec::new(),
            charging_session_stop: None,
            evcc_id,
            is_tls,
            peer: None,
            timeouts,
            resume: None,
            selected_auth_option: None,
            selected_energy_mode: None,
            service_details_to_request: Vec::new(),
            selected_schedule: None,
            renegotiation_requested: false,
            ongoing_timer: None,
            request_issued_at: None,
            stop_reason: None,
        }
    }

    pub fn with_peer(mut self, peer: impl Into<String>) -> Self {
        self.peer = Some(peer.into());
        self
    }

    pub fn with_resume(mut self, resume: Option<ResumeState>) -> Self {
        self.resume = resume;
        self
    }

    /// Session id for outgoing headers; all zeros until assigned
    pub fn session_id(&self) -> SessionId {
        self.session_id.clone().unwrap_or_else(SessionId::unassigned)
    }

    pub fn assigned_session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    pub fn assign_session_id(&mut self, id: SessionId) -> Result<(), SessionError> {
        if self.session_id.is_some() {
            return Err(SessionError::AlreadyAssigned { field: "session_id" });
        }
        self.session_id = Some(id);
        Ok(())
    }

    pub fn evse_id(&self) -> Option<&str> {
        self.evse_id.as_deref()
    }

    pub fn assign_evse_id(&mut self, id: impl Into<String>) -> Result<(), SessionError> {
        if self.evse_id.is_some() {
            return Err(SessionError::AlreadyAssigned { field: "evse_id" });
        }
        self.evse_id = Some(id.into());
        Ok(())
    }

    /// Add a service, ignoring ids that are already selected
    pub fn select_service(&mut self, service: SelectedService) {
        if !self.selected_services.iter().any(|s| s.service_id == service.service_id) {
            self.selected_services.push(service);
        }
    }

    pub fn selected_services(&self) -> &[SelectedService] {
        &self.selected_services
    }

    /// Record how the session is to end; the first request wins
    pub fn request_stop(&mut self, stop: ChargingSession) {
        if self.charging_session_stop.is_none() {
            self.charging_session_stop = Some(stop);
        }
    }

    pub fn charging_session_stop(&self) -> Option<ChargingSession> {
        self.charging_session_stop
    }

    /// Schedule chosen in ChargeParameterDiscovery
    pub fn selected_schedule(&self) -> Result<u8, SessionError> {
        self.selected_schedule
            .ok_or_else(|| SessionError::Incompatible("no SAScheduleTuple selected".into()))
    }

    pub fn energy_mode_is_ac(&self) -> bool {
        self.selected_energy_mode.map(|m| m.is_ac()).unwrap_or(false)
    }

    /// Bookkeeping after a request went out
    ///
    /// A new logical request restarts the issue instant and drops the
    /// ongoing budget; a repeat keeps both.
    pub fn request_sent(&mut self, repeat: bool) {
        if !repeat {
            self.ongoing_timer = None;
            self.request_issued_at = Some(Instant::now());
        }
    }

    /// Time since the current logical request was first sent
    pub fn request_age(&self) -> Duration {
        self.request_issued_at
            .map(|t| Instant::now().saturating_duration_since(t))
            .unwrap_or_default()
    }
}
