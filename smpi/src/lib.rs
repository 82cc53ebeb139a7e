//! Safe MPI (SMPI) library.
//!
//! A [`Communicator`] is an explicit handle on a process group. Ranks may be
//! separate processes started by `smpi-exec` or threads of one process
//! created with [`local_group`].
use std::panic;
use std::sync::atomic::{AtomicU32, Ordering};
use std::thread;
use log::debug;
use smpi_p2p_node::ThreadP2P;
use smpi_runtime::Runtime;

pub use smpi_base::{Element, Error, P2PProvider, Result};

mod collective;
mod communicator;
pub use communicator::Communicator;

/// Context ID of the world communicator; thread groups count up from here.
pub(crate) const WORLD_CONTEXT: u32 = 0;
static NEXT_CONTEXT: AtomicU32 = AtomicU32::new(WORLD_CONTEXT + 1);

/// Join the process group described by the launch environment.
pub fn init() -> Result<Communicator> {
    let runtime = Runtime::from_env()?;
    let provider = smpi_p2p_node::connect(&runtime)?;
    Ok(Communicator::with_provider(provider))
}

/// Create the communicators of a group whose ranks are threads of this
/// process, indexed by rank.
pub fn local_group(size: usize) -> Vec<Communicator> {
    let context = NEXT_CONTEXT.fetch_add(1, Ordering::Relaxed);
    debug!("new local group of {} with context {}", size, context);
    ThreadP2P::group(size)
        .into_iter()
        .map(|provider| Communicator::new(Box::new(provider), context))
        .collect()
}

/// Run `f` once per rank of a fresh local group, each on its own thread,
/// and return the results in rank order.
///
/// A panic on any rank is re-raised once all ranks have finished.
pub fn run_local<F, R>(size: usize, f: F) -> Vec<R>
where
    F: Fn(Communicator) -> R + Sync,
    R: Send,
{
    let f = &f;
    thread::scope(|scope| {
        let handles: Vec<_> = local_group(size)
            .into_iter()
            .map(|comm| scope.spawn(move || f(comm)))
            .collect();
        let results: Vec<thread::Result<R>> =
            handles.into_iter().map(|handle| handle.join()).collect();
        results
            .into_iter()
            .map(|res| res.unwrap_or_else(|err| panic::resume_unwind(err)))
            .collect()
    })
}
