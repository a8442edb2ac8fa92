//! Helpers for driving single states in unit tests

use tempfile::TempDir;

use crate::config::{SimulatorConfig, Timeouts};
use crate::ev::SimEvController;
use crate::messages::{Body, EnergyTransferMode, SessionId, V2gMessage};
use crate::security::FilePki;
use crate::session::state::{Collaborators, Outcome, State, Step};
use crate::session::SessionContext;

pub const SESSION_ID: [u8; 8] = [0x0A, 0x0B, 0x0C, 0x0D, 0x01, 0x02, 0x03, 0x04];

pub fn ev(energy_mode: EnergyTransferMode, cert_install_needed: bool) -> SimEvController {
    SimEvController::new(SimulatorConfig {
        energy_mode,
        cert_install_needed,
        charge_loops: 2,
        ..Default::default()
    })
}

pub fn expect_step(outcome: Outcome) -> Step {
    match outcome {
        Outcome::Continue(step) => step,
        other => panic!("Expected Continue, got {:?}", other),
    }
}

/// A context, simulated EV and an empty on-disk PKI
pub struct Harness {
    pub ctx: SessionContext,
    pub ev: SimEvController,
    pub pki: FilePki,
    _dir: TempDir,
}

impl Harness {
    pub fn new(tls: bool, ev: SimEvController) -> Self {
        Self::with_timeouts(tls, ev, Timeouts::default())
    }

    pub fn with_timeouts(tls: bool, ev: SimEvController, timeouts: Timeouts) -> Self {
        let dir = TempDir::new().unwrap();
        Self {
            ctx: SessionContext::new(vec![0x01, 0x02, 0x03, 0x04, 0x05, 0x06], tls, timeouts)
                .with_peer("secc.test"),
            ev,
            pki: FilePki::new(dir.path()),
            _dir: dir,
        }
    }

    /// Past SessionSetup
    pub fn assigned(tls: bool, ev: SimEvController) -> Self {
        let mut h = Self::new(tls, ev);
        h.ctx.assign_session_id(SessionId(SESSION_ID.to_vec())).unwrap();
        h.ctx.assign_evse_id("DE*EK3*E0001").unwrap();
        h
    }

    pub fn process_msg(&mut self, state: State, msg: V2gMessage) -> Outcome {
        let mut co = Collaborators {
            ev: &mut self.ev,
            crypto: &self.pki,
        };
        state.process(&mut self.ctx, &mut co, msg)
    }

    /// Feed `body` under the current session id
    pub fn process(&mut self, state: State, body: impl Into<Body>) -> Outcome {
        let msg = V2gMessage::new(self.ctx.session_id(), body);
        self.process_msg(state, msg)
    }

    pub fn step(&mut self, state: State, body: impl Into<Body>) -> Step {
        expect_step(self.process(state, body))
    }
}
