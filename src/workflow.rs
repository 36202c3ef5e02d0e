//! Counter workflows as seen by the audio subsystem.
//!
//! Stands in for the kiosk screens: each operator action maps to one trigger.
//! Scan and phone lookup assign the customer a fresh storage cell first.

use crate::error::Result;
use crate::kernel::event::PlayResult;
use crate::kernel::key::{FixedRole, SemanticKey, CELL_MAX, CELL_MIN};
use crate::kernel::sequence::{Bindings, Trigger};
use crate::kernel::sequencer::{CueSequencer, RunHandle};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Digits the operator types for a phone lookup.
pub const PHONE_DIGITS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    #[error("phone lookup needs exactly {n} digits, got {0:?}", n = PHONE_DIGITS)]
    PhoneDigits(String),
}

pub struct Workflow<R = StdRng> {
    sequencer: Arc<CueSequencer>,
    rng: R,
    current_cell: Option<u16>,
}

impl Workflow<StdRng> {
    pub fn new(sequencer: Arc<CueSequencer>) -> Self {
        Self::with_rng(sequencer, StdRng::from_entropy())
    }
}

impl<R: Rng> Workflow<R> {
    pub fn with_rng(sequencer: Arc<CueSequencer>, rng: R) -> Self {
        Self {
            sequencer,
            rng,
            current_cell: None,
        }
    }

    /// Cell assigned by the most recent scan or phone lookup.
    pub fn current_cell(&self) -> Option<u16> {
        self.current_cell
    }

    /// QR scan on the delivery screen.
    pub fn scan(&mut self) -> RunHandle {
        let cell = self.assign_cell();
        info!("Scan: customer assigned to cell {}", cell);
        self.sequencer.trigger(Trigger::OnScan, &Bindings::with_cell(cell))
    }

    /// Lookup by the last digits of the customer's phone number.
    pub fn phone_search(&mut self, digits: &str) -> std::result::Result<RunHandle, WorkflowError> {
        if digits.chars().count() != PHONE_DIGITS || !digits.chars().all(|c| c.is_ascii_digit()) {
            debug!("Phone lookup rejected: {:?}", digits);
            return Err(WorkflowError::PhoneDigits(digits.to_string()));
        }
        let cell = self.assign_cell();
        info!("Phone lookup *{}: customer assigned to cell {}", digits, cell);
        Ok(self
            .sequencer
            .trigger(Trigger::OnPhoneSearch, &Bindings::with_cell(cell)))
    }

    /// "Issue" button once the customer has their parcels.
    pub fn issue_complete(&mut self) -> RunHandle {
        self.sequencer.trigger(Trigger::OnIssueComplete, &Bindings::new())
    }

    pub fn accept(&mut self) -> RunHandle {
        self.sequencer.trigger(Trigger::OnAccept, &Bindings::new())
    }

    pub fn return_item(&mut self) -> RunHandle {
        self.sequencer.trigger(Trigger::OnReturn, &Bindings::new())
    }

    /// Runs any named sequence, binding the current cell when one is assigned.
    pub fn run_named(&mut self, name: &str) -> Result<RunHandle> {
        let bindings = match self.current_cell {
            Some(cell) => Bindings::with_cell(cell),
            None => Bindings::new(),
        };
        self.sequencer.run_named(name, &bindings)
    }

    pub fn list_mappings(&self) -> Vec<(FixedRole, bool)> {
        self.sequencer.player().registry().list_mappings()
    }

    pub fn cell_coverage(&self) -> usize {
        self.sequencer.player().registry().cell_coverage()
    }

    pub fn preview(&self, key: &SemanticKey) -> PlayResult {
        self.sequencer.preview(key)
    }

    fn assign_cell(&mut self) -> u16 {
        let cell = self.rng.gen_range(CELL_MIN..=CELL_MAX);
        self.current_cell = Some(cell);
        cell
    }
}
