pub mod engine;
mod gate;
mod policy;
pub mod store;

pub use engine::{Decision, ThrottleEngine};
pub use gate::builder::ThrottleGateBuilder;
pub use gate::{Denied, Invocation, ThrottleGate};
pub use policy::{Scope, ThrottlePolicy};
