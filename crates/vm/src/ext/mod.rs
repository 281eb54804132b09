/// Dispatch layers built on [`DispatchLayer`](crate::core::dispatch::DispatchLayer)
pub mod layers;

/// Running batches of executions under a shared deadline
pub mod supervisor;
