// Sampling scheduler and its assembly from configuration
pub mod agent;
pub mod builder;

// Process lifecycle
pub mod shutdown;

pub use agent::{Agent, AgentState};
pub use builder::AgentBuilder;
