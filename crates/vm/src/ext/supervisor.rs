//! Runs batches of independent executions on worker threads under one deadline.
//!
//! Every execution in a batch shares a single [`AbortFlag`], created fresh for that batch. When
//! the deadline passes, the flag is set and each execution still running ends with
//! [`Error::ExecutionAborted`](crate::Error::ExecutionAborted) at its next check.

use std::{sync::Arc, time::Duration};

use alloy::primitives::{Address, Bytes, U256};
use sleipnir_common::utils::threading::deadline_pool;
use sleipnir_config::{ChainConfig, ExecutionConfig};
use tracing::{debug, warn};

use crate::core::{
    abort::AbortFlag,
    context::ExecutionContext,
    contract::AccountRef,
    dispatch::{CallResult, DefaultDispatcher, FrameDispatcher},
    state::InMemoryState,
};

/// A top-level message call to run against its own state.
#[derive(Clone, Debug)]
pub struct Job {
    /// The state the call runs against
    pub state: InMemoryState,
    /// The account sending the call
    pub caller: Address,
    /// The account being called
    pub to: Address,
    /// Call data
    pub input: Bytes,
    /// Gas supplied to the call
    pub gas: u64,
    /// Value transferred with the call
    pub value: U256,
}

/// What a [`Job`] produced: the call result and the state it left behind.
#[derive(Clone, Debug)]
pub struct JobOutcome {
    /// The result of the top-level call
    pub result: CallResult,
    /// The state after the call
    pub state: InMemoryState,
}

/// Runs [`Job`]s in parallel, aborting whatever is still running once the deadline passes.
#[derive(Clone, Debug)]
pub struct Supervisor {
    chain: ChainConfig,
    config: ExecutionConfig,
    dispatcher: Arc<dyn FrameDispatcher>,
    num_threads: usize,
    deadline: Duration,
}

impl Supervisor {
    /// Creates a supervisor with default configuration, the [`DefaultDispatcher`] and one worker
    /// per available core.
    pub fn new(deadline: Duration) -> Self {
        Self {
            chain: ChainConfig::default(),
            config: ExecutionConfig::default(),
            dispatcher: DefaultDispatcher::shared(),
            num_threads: std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
            deadline,
        }
    }

    /// Sets the chain configuration every job runs with.
    pub fn with_chain(mut self, chain: ChainConfig) -> Self {
        self.chain = chain;
        self
    }

    /// Sets the execution limits every job runs with.
    pub fn with_config(mut self, config: ExecutionConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the dispatcher shared by every job.
    pub fn with_dispatcher(mut self, dispatcher: Arc<dyn FrameDispatcher>) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    /// Sets the number of worker threads.
    pub fn with_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = num_threads.max(1);
        self
    }

    /// Runs `jobs` under a fresh [`AbortFlag`], returning one outcome per job in the same
    /// order.
    pub fn run(&self, jobs: Vec<Job>) -> Vec<JobOutcome> {
        self.run_with_abort(jobs, AbortFlag::new())
    }

    /// Runs `jobs` under `abort`, which the caller may set to stop the batch before the
    /// deadline. The flag is set once the deadline passes, so it should not be reused for
    /// another batch.
    pub fn run_with_abort(&self, jobs: Vec<Job>, abort: AbortFlag) -> Vec<JobOutcome> {
        debug!(
            jobs = jobs.len(),
            threads = self.num_threads,
            deadline = ?self.deadline,
            "starting batch"
        );

        let (chain, config) = (self.chain, self.config);
        let dispatcher = Arc::clone(&self.dispatcher);
        let on_deadline = {
            let abort = abort.clone();
            move || {
                warn!("deadline reached, aborting remaining executions");
                abort.abort();
            }
        };

        deadline_pool(jobs, self.num_threads, self.deadline, on_deadline, move |job: Job| {
            let Job { mut state, caller, to, input, gas, value } = job;
            let result = {
                let mut ctx = ExecutionContext::with_dispatcher(
                    &mut state,
                    chain,
                    config,
                    Arc::clone(&dispatcher),
                    abort.clone(),
                );
                ctx.call(&AccountRef::new(caller), to, input, gas, value)
            };
            JobOutcome { result, state }
        })
    }
}

/// Runs `jobs` with the default configuration, aborting any still running after `deadline`.
pub fn run_with_deadline(jobs: Vec<Job>, deadline: Duration) -> Vec<JobOutcome> {
    Supervisor::new(deadline).run(jobs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{core::state::Account, Error};

    const TARGET: Address = Address::repeat_byte(0x7a);

    fn job(code: &'static [u8]) -> Job {
        let mut state = InMemoryState::new();
        state.insert_account(TARGET, Account::with_code(Bytes::from_static(code)));
        Job {
            state,
            caller: Address::ZERO,
            to: TARGET,
            input: Bytes::new(),
            gas: u64::MAX / 2,
            value: U256::ZERO,
        }
    }

    #[test]
    fn test_results_keep_job_order() {
        // PUSH1 n PUSH1 0x00 MSTORE8 PUSH1 0x01 PUSH1 0x00 RETURN
        let jobs = vec![
            job(&[0x60, 0x01, 0x60, 0x00, 0x53, 0x60, 0x01, 0x60, 0x00, 0xf3]),
            job(&[0x60, 0x02, 0x60, 0x00, 0x53, 0x60, 0x01, 0x60, 0x00, 0xf3]),
        ];

        let outcomes = Supervisor::new(Duration::from_secs(30)).with_threads(2).run(jobs);
        let outputs: Vec<_> = outcomes.iter().map(|o| o.result.output.clone()).collect();
        assert_eq!(outputs, vec![Bytes::from_static(&[0x01]), Bytes::from_static(&[0x02])]);
    }

    #[test]
    fn test_deadline_aborts_infinite_loop() {
        // JUMPDEST PUSH1 0x00 JUMP
        let outcomes =
            run_with_deadline(vec![job(&[0x5b, 0x60, 0x00, 0x56])], Duration::from_millis(50));
        assert_eq!(outcomes[0].result.error, Some(Error::ExecutionAborted));
    }

    #[test]
    fn test_each_batch_gets_a_fresh_flag() {
        let supervisor = Supervisor::new(Duration::from_millis(30));

        // JUMPDEST PUSH1 0x00 JUMP
        let outcomes = supervisor.run(vec![job(&[0x5b, 0x60, 0x00, 0x56])]);
        assert_eq!(outcomes[0].result.error, Some(Error::ExecutionAborted));

        // STOP
        let outcomes = supervisor.run(vec![job(&[0x00])]);
        assert!(outcomes[0].result.is_success(), "{:?}", outcomes[0].result);
    }

    #[test]
    fn test_caller_can_abort_batch() {
        let abort = AbortFlag::new();
        abort.abort();

        // STOP
        let outcomes =
            Supervisor::new(Duration::from_secs(30)).run_with_abort(vec![job(&[0x00])], abort);
        assert_eq!(outcomes[0].result.error, Some(Error::ExecutionAborted));
    }
}
