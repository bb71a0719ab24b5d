pub mod kernel;

// Entry points most hosts need
pub use kernel::config::KernelConfig;
pub use kernel::reactor::Reactor;
pub use kernel::slots::AgentId;
