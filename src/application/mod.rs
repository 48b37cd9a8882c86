pub mod polling;
pub mod scheduler;

pub use polling::PollingService;
pub use scheduler::Scheduler;
