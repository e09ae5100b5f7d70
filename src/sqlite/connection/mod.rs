mod dml;
mod lifecycle;
mod select;
mod tx;

pub(crate) use lifecycle::Session;
pub use dml::UpdateOutcome;
pub use lifecycle::Connection;
