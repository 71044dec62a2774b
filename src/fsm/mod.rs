//! Function-pointer mode table engine.
//!
//! Classic embedded FSM pattern ported to Rust:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  ModeTable                                                      │
//! │  ┌────────────┬───────────┬──────────┬────────────────────────┐ │
//! │  │ SystemMode │ on_enter  │ on_exit  │ synthesize             │ │
//! │  ├────────────┼───────────┼──────────┼────────────────────────┤ │
//! │  │ Stop       │ fn(ctx)   │ -        │ fn(&ctx)->Setpoint     │ │
//! │  │ Cool       │ fn(ctx)   │ -        │ fn(&ctx)->Setpoint     │ │
//! │  │ Heat       │ fn(ctx)   │ -        │ fn(&ctx)->Setpoint     │ │
//! │  │ Regenerate │ fn(ctx)   │ -        │ fn(&ctx)->Setpoint     │ │
//! │  │ Manual     │ fn(ctx)   │ fn(ctx)  │ fn(&ctx)->Setpoint     │ │
//! │  │ Experiment │ fn(ctx)   │ fn(ctx)  │ fn(&ctx)->Setpoint     │ │
//! │  └────────────┴───────────┴──────────┴────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Unlike a self-driving FSM, the next mode is chosen outside the table
//! by the override chain in [`crate::app::resolve`]; the engine only runs
//! the exit/enter hooks on a change and maps the current mode to an
//! [`ActuatorSetpoint`](context::ActuatorSetpoint).

pub mod context;
pub mod states;

use context::{ActuatorSetpoint, ControllerState};
use log::info;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Mode identity
// ---------------------------------------------------------------------------

/// Operating mode of the enclosure.  Exactly one is active.
///
/// The discriminant doubles as the leading digit of the status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum SystemMode {
    Stop = 0,
    Cool = 1,
    Heat = 2,
    Regenerate = 3,
    /// Sticky operator override.
    Manual = 4,
    /// Sticky scripted-experiment override.
    Experiment = 5,
}

impl SystemMode {
    /// Total number of modes, used to size the table array.
    pub const COUNT: usize = 6;

    /// Convert an index back to `SystemMode`.  Asserts in debug builds;
    /// returns `Stop` in release.
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::Stop,
            1 => Self::Cool,
            2 => Self::Heat,
            3 => Self::Regenerate,
            4 => Self::Manual,
            5 => Self::Experiment,
            _ => {
                debug_assert!(false, "invalid mode index: {idx}");
                Self::Stop
            }
        }
    }

    /// Modes that a schedule entry may request.
    pub fn is_schedulable(self) -> bool {
        matches!(self, Self::Stop | Self::Cool | Self::Heat | Self::Regenerate)
    }

    pub fn status_digit(self) -> u8 {
        self as u8
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` and `on_exit` hooks.
pub type ModeActionFn = fn(&mut ControllerState);

/// Per-mode setpoint synthesis.
pub type SynthesizeFn = fn(&ControllerState) -> ActuatorSetpoint;

/// Static descriptor for a single mode.
pub struct ModeDescriptor {
    pub id: SystemMode,
    pub name: &'static str,
    pub on_enter: Option<ModeActionFn>,
    pub on_exit: Option<ModeActionFn>,
    pub synthesize: SynthesizeFn,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct ModeMachine {
    /// Fixed-size table indexed by `SystemMode as usize`.
    table: [ModeDescriptor; SystemMode::COUNT],
    current: usize,
    transitions: u32,
}

impl ModeMachine {
    pub fn new(table: [ModeDescriptor; SystemMode::COUNT], initial: SystemMode) -> Self {
        Self {
            table,
            current: initial as usize,
            transitions: 0,
        }
    }

    /// Run the initial `on_enter`.  Call once after construction.
    pub fn start(&mut self, ctx: &mut ControllerState) {
        info!("MODE: starting in {}", self.table[self.current].name);
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    /// Switch to `next`, running `on_exit` then `on_enter`.  Returns
    /// `false` (and runs nothing) when `next` is already current.
    pub fn transition(&mut self, next: SystemMode, ctx: &mut ControllerState) -> bool {
        let next_idx = next as usize;
        if next_idx == self.current {
            return false;
        }

        info!(
            "MODE: {} -> {}",
            self.table[self.current].name, self.table[next_idx].name
        );

        if let Some(exit) = self.table[self.current].on_exit {
            exit(ctx);
        }
        self.current = next_idx;
        self.transitions = self.transitions.wrapping_add(1);
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
        true
    }

    /// Setpoint the current mode asks for, given `ctx`.
    pub fn synthesize(&self, ctx: &ControllerState) -> ActuatorSetpoint {
        (self.table[self.current].synthesize)(ctx)
    }

    pub fn current_mode(&self) -> SystemMode {
        SystemMode::from_index(self.current)
    }

    pub fn current_name(&self) -> &'static str {
        self.table[self.current].name
    }

    pub fn transition_count(&self) -> u32 {
        self.transitions
    }
}
