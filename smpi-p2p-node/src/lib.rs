//! Point-to-point providers.
//!
//! [`TcpP2P`] connects separate processes through a full TCP mesh.
//! [`ThreadP2P`] connects ranks that live as threads of one process.
use log::info;
use smpi_base::{P2PProvider, Result};
use smpi_runtime::Runtime;

mod local;
pub use local::ThreadP2P;
mod tcp;
pub use tcp::TcpP2P;

/// Pick the provider matching the runtime: a TCP mesh for a launched
/// group, a single-member thread provider otherwise.
pub fn connect(runtime: &Runtime) -> Result<Box<dyn P2PProvider>> {
    if runtime.is_distributed() {
        let provider = TcpP2P::connect(runtime)?;
        info!(
            "process {} connected to a group of {}",
            provider.id(),
            provider.size()
        );
        Ok(Box::new(provider))
    } else {
        Ok(Box::new(ThreadP2P::single()))
    }
}
