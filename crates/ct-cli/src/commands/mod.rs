//! Command implementations for the casttrace CLI

pub mod inspect;
pub mod instrument;
pub mod verify;

pub use inspect::inspect_command;
pub use instrument::instrument_command;
pub use verify::verify_command;
