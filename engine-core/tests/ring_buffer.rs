use std::path::Path;

use engine_core::prelude::*;
use tempfile::tempdir;

fn config_at(path: &Path, ring_buffer_size: usize, claim_spin_limit: u32) -> EngineConfig {
    EngineConfig {
        ring_buffer_size,
        claim_spin_limit,
        event_log_path: path.to_path_buf(),
        event_log_sync_mode: false,
        batch_size: 1,
        flush_interval_ms: 5,
        event_queue_capacity: 1024,
        shutdown_timeout_ms: 5_000,
        symbols: vec!["X".to_string()],
    }
}

#[test]
fn engine_handle_round_trips_a_command_through_the_ring_buffer() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("events.log");
    let (engine, handle) = Engine::start(config_at(&path, 8, 10_000)).expect("start");

    let order = Order::new_request("X", 1, Side::Buy, OrderType::Limit, 14900, 10, None);
    let result = handle.submit_order(order).expect("submit");
    match result {
        CommandResult::Execution(execution) => {
            assert!(execution.accepted);
            assert_eq!(execution.order.status, OrderStatus::New);
        }
        CommandResult::Cancel(_) => panic!("expected an execution result"),
    }

    engine.shutdown().expect("clean shutdown");
}

#[test]
fn many_sequential_submissions_are_each_assigned_an_increasing_sequence_number() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("events.log");
    let (engine, handle) = Engine::start(config_at(&path, 4, 10_000)).expect("start");

    let mut last_seq = 0;
    for i in 0..50 {
        let order = Order::new_request("X", 1, Side::Buy, OrderType::Limit, 14900 + i, 1, None);
        let result = handle.submit_order(order).expect("submit");
        if let CommandResult::Execution(execution) = result {
            assert!(execution.order.sequence_num > last_seq);
            last_seq = execution.order.sequence_num;
        }
    }

    engine.shutdown().expect("clean shutdown");
}

#[test]
fn concurrent_producers_all_get_distinct_sequence_numbers() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("events.log");
    let (engine, handle) = Engine::start(config_at(&path, 256, 50_000)).expect("start");

    let threads: Vec<_> = (0..8)
        .map(|t| {
            let handle = handle.clone();
            std::thread::spawn(move || {
                let mut seqs = Vec::new();
                for i in 0..25 {
                    let order = Order::new_request(
                        "X",
                        t as u64,
                        Side::Buy,
                        OrderType::Limit,
                        14900 + i,
                        1,
                        None,
                    );
                    if let CommandResult::Execution(execution) =
                        handle.submit_order(order).expect("submit")
                    {
                        seqs.push(execution.order.sequence_num);
                    }
                }
                seqs
            })
        })
        .collect();

    let mut all_seqs: Vec<u64> = threads.into_iter().flat_map(|t| t.join().unwrap()).collect();
    all_seqs.sort_unstable();
    let unique_count = {
        let mut deduped = all_seqs.clone();
        deduped.dedup();
        deduped.len()
    };
    assert_eq!(unique_count, all_seqs.len());
    assert_eq!(all_seqs.len(), 200);

    engine.shutdown().expect("clean shutdown");
}
