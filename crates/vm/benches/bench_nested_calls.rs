//! Benchmark for the cost of nested message calls through the frame dispatcher.

use std::sync::Arc;

use alloy::primitives::{Address, Bytes, U256};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use sleipnir_common::utils::strings::decode_hex;
use sleipnir_config::{ChainConfig, ExecutionConfig};
use sleipnir_vm::{
    core::{
        abort::AbortFlag,
        context::ExecutionContext,
        contract::AccountRef,
        dispatch::{DefaultDispatcher, FrameDispatcher},
        state::{Account, InMemoryState},
    },
    ext::layers::TracingLayer,
};

const RECURSIVE: Address = Address::repeat_byte(0x4e);

/// Calls itself `n` times, recording each nested call's outcome in storage.
const RECURSE: &str = "60003580156024576001900360005260006000602060006000305af16001016000515500\
                       5b00";

fn bench_nested_calls(c: &mut Criterion) {
    let mut group = c.benchmark_group("sleipnir_vm");
    let mut genesis = InMemoryState::new();
    genesis.insert_account(
        RECURSIVE,
        Account::with_code(decode_hex(RECURSE).expect("invalid bytecode").into()),
    );
    let calldata = Bytes::from(U256::from(64).to_be_bytes::<32>().to_vec());

    let dispatchers: [(&str, Arc<dyn FrameDispatcher>); 2] = [
        ("nested_calls", DefaultDispatcher::shared()),
        ("nested_calls_traced", Arc::new(TracingLayer::default())),
    ];

    for (name, dispatcher) in dispatchers {
        group.bench_function(BenchmarkId::from_parameter(name), |b| {
            b.iter(|| {
                let mut state = genesis.clone();
                let mut ctx = ExecutionContext::with_dispatcher(
                    &mut state,
                    ChainConfig::default(),
                    ExecutionConfig::default(),
                    Arc::clone(&dispatcher),
                    AbortFlag::new(),
                );
                let result = ctx.call(
                    &AccountRef::new(Address::ZERO),
                    RECURSIVE,
                    calldata.clone(),
                    u64::MAX / 2,
                    U256::ZERO,
                );
                assert!(result.is_success());
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_nested_calls);
criterion_main!(benches);
