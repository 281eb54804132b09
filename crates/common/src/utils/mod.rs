/// String, hex and integer conversion utilities.
pub mod strings;

/// Threading utilities for running batches of work under a shared deadline.
pub mod threading;
