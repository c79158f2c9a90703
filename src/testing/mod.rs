//! Headless collaborators for tests and offline simulation.
//!
//! These stand in for a real display and keyboard so that calibration,
//! staircase and trial logic can run frame-by-frame without a window. The CLI
//! uses the same pieces to simulate staircase runs.

pub mod input;
pub mod observer;
pub mod renderer;

pub use input::ScriptedInput;
pub use observer::SimulatedObserver;
pub use renderer::{FrameLog, RecordingRenderer};
