//! Simulated EV

use std::path::PathBuf;

use tracing::{debug, info};

use super::{ChargeParams, EvController, EvControllerError, ScheduleSelection};
use crate::config::SimulatorConfig;
use crate::messages::{
    AcEvChargeParameter, CertificateChain, ChargeProgress, ChargingProfile, CurrentDemandReq,
    DcEvChargeParameter, DcEvErrorCode, DcEvStatus, EnergyTransferMode, PhysicalValue,
    ProfileEntry, SaScheduleTuple, UnitSymbol,
};
use crate::security::{FilePki, PrivateKey};

/// EV simulator driven by [`SimulatorConfig`]
pub struct SimEvController {
    config: SimulatorConfig,
    pki_dir: Option<PathBuf>,
    loops_done: u32,
    installed_contract: Option<(Vec<u8>, PrivateKey)>,
}

impl SimEvController {
    pub fn new(config: SimulatorConfig) -> Self {
        Self {
            config,
            pki_dir: None,
            loops_done: 0,
            installed_contract: None,
        }
    }

    /// Persist installed contract credentials into a PKI directory
    pub fn with_pki_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.pki_dir = Some(dir.into());
        self
    }

    pub fn loops_done(&self) -> u32 {
        self.loops_done
    }

    /// Contract certificate and key received through certificate installation
    pub fn installed_contract(&self) -> Option<&(Vec<u8>, PrivateKey)> {
        self.installed_contract.as_ref()
    }

    fn dc_status(&self) -> DcEvStatus {
        DcEvStatus {
            ev_ready: true,
            ev_error_code: DcEvErrorCode::NoError,
            ev_ress_soc: self.config.soc,
        }
    }

    fn charging_done(&self) -> bool {
        self.loops_done >= self.config.charge_loops
    }
}

impl EvController for SimEvController {
    fn energy_transfer_mode(&self) -> EnergyTransferMode {
        self.config.energy_mode
    }

    fn is_cert_install_needed(&self) -> bool {
        self.config.cert_install_needed
    }

    fn charge_params(&self) -> ChargeParams {
        let mode = self.config.energy_mode;
        if mode.is_ac() {
            ChargeParams {
                energy_mode: mode,
                ac_parameters: Some(AcEvChargeParameter {
                    departure_time: None,
                    e_amount: PhysicalValue::new(self.config.energy_request, 0, UnitSymbol::Wh),
                    ev_max_voltage: PhysicalValue::new(self.config.max_voltage, 0, UnitSymbol::V),
                    ev_max_current: PhysicalValue::new(self.config.max_current, 0, UnitSymbol::A),
                    ev_min_current: PhysicalValue::new(self.config.min_current, 0, UnitSymbol::A),
                }),
                dc_parameters: None,
            }
        } else {
            ChargeParams {
                energy_mode: mode,
                ac_parameters: None,
                dc_parameters: Some(DcEvChargeParameter {
                    departure_time: None,
                    dc_ev_status: self.dc_status(),
                    ev_maximum_current_limit: PhysicalValue::new(self.config.max_current, 0, UnitSymbol::A),
                    ev_maximum_power_limit: None,
                    ev_maximum_voltage_limit: PhysicalValue::new(self.config.max_voltage, 0, UnitSymbol::V),
                    ev_energy_capacity: None,
                    ev_energy_request: Some(PhysicalValue::new(self.config.energy_request, 0, UnitSymbol::Wh)),
                    full_soc: Some(100),
                    bulk_soc: Some(80),
                }),
            }
        }
    }

    fn process_schedules(&mut self, schedules: &[SaScheduleTuple]) -> Result<ScheduleSelection, EvControllerError> {
        let schedule = schedules.first().ok_or(EvControllerError::NoSchedule)?;

        let profile_entries = schedule
            .p_max_schedule
            .iter()
            .map(|entry| ProfileEntry {
                start: entry.start,
                max_power: entry.p_max,
                max_number_of_phases_in_use: None,
            })
            .collect();

        debug!("Selected schedule {}", schedule.sa_schedule_tuple_id);
        Ok(ScheduleSelection {
            charge_progress: ChargeProgress::Start,
            schedule_id: schedule.sa_schedule_tuple_id,
            charging_profile: Some(ChargingProfile { profile_entries }),
        })
    }

    fn continue_charging(&mut self) -> bool {
        if self.charging_done() {
            return false;
        }
        self.loops_done += 1;
        true
    }

    fn wants_pause(&self) -> bool {
        self.config.pause_when_done
    }

    fn store_contract_cert_and_key(&mut self, chain: &CertificateChain, key: &PrivateKey) -> Result<(), EvControllerError> {
        if let Some(dir) = &self.pki_dir {
            FilePki::new(dir)
                .store_contract(chain, key)
                .map_err(|e| EvControllerError::Storage(e.to_string()))?;
        }
        info!(
            "Contract certificate installed ({} bytes, {} sub-CAs)",
            chain.certificate.len(),
            chain.sub_certificates.len()
        );
        self.installed_contract = Some((chain.certificate.clone(), key.clone()));
        Ok(())
    }

    fn current_demand_params(&mut self) -> Result<CurrentDemandReq, EvControllerError> {
        if self.config.energy_mode.is_ac() {
            return Err(EvControllerError::Unsupported(format!(
                "CurrentDemand in {}",
                self.config.energy_mode
            )));
        }

        Ok(CurrentDemandReq {
            dc_ev_status: self.dc_status(),
            ev_target_current: PhysicalValue::new(self.config.max_current, 0, UnitSymbol::A),
            ev_maximum_voltage_limit: Some(PhysicalValue::new(self.config.max_voltage, 0, UnitSymbol::V)),
            ev_maximum_current_limit: Some(PhysicalValue::new(self.config.max_current, 0, UnitSymbol::A)),
            ev_maximum_power_limit: None,
            bulk_charging_complete: Some(false),
            charging_complete: self.charging_done(),
            remaining_time_to_full_soc: None,
            remaining_time_to_bulk_soc: None,
            ev_target_voltage: PhysicalValue::new(self.config.max_voltage, 0, UnitSymbol::V),
        })
    }
}
