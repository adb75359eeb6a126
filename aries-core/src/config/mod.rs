mod agent;
pub use agent::Agent;

mod tails;
pub use tails::Tails;

mod discovery;
pub use discovery::Discovery;

mod config;
pub use config::AgentConfig;

mod parser;
pub use parser::Parser;

pub mod types;
