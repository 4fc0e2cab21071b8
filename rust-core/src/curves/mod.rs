//! Window and envelope curve generators

pub mod envelope;
pub mod windows;

pub use envelope::{generate_envelope, EnvelopeType};
pub use windows::{generate_window, WindowType};
