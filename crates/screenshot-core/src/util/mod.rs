// Utility modules

pub mod detect;
