//! Domain models for the prescription safety engine.

mod alternative;
mod dosage;
mod interaction;
mod patient;
mod reference;
mod risk;

pub use alternative::*;
pub use dosage::*;
pub use interaction::*;
pub use patient::*;
pub use reference::*;
pub use risk::*;
