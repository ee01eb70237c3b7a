//! Gateway services: the code cache, the execution gateway and the tenant
//! dispatcher that wires them to the ports.

mod cache;
mod dispatch;
mod gateway;

pub use cache::CodeCache;
pub use dispatch::TenantDispatcher;
pub use gateway::ExecutionGateway;
