//! End-to-end scenarios driving the writer, both readers, and the metadata
//! sidecar the way the channel does across a write/crash/replay cycle.

use std::sync::Arc;
use std::thread;

use tempfile::TempDir;
use weir_core::{Event, EventPointer, LogConfig, RecordBody, TransactionEventRecord};
use weir_log::{factory, random::READ_HANDLE_POOL_CAPACITY};

fn put(txid: u64, woid: u64, payload: &[u8]) -> TransactionEventRecord {
    TransactionEventRecord::put(txid, woid, Event::new(payload.to_vec()))
}

#[test]
fn test_write_commit_replay_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("log-7");
    let writer = factory::new_writer(&path, 7, &LogConfig::default()).unwrap();

    let mut pointers = Vec::new();
    for (woid, payload) in [(100u64, &b"a"[..]), (101, b"bb"), (102, b"ccc")] {
        pointers.push(writer.put(&put(1, woid, payload)).unwrap());
    }
    writer
        .commit(&TransactionEventRecord::commit(1, 103))
        .unwrap();
    writer.close();

    // Random reads at each returned pointer see the original events.
    let reader = factory::random_reader(&path).unwrap();
    assert_eq!(reader.get(pointers[0].offset).unwrap().body(), b"a");
    assert_eq!(reader.get(pointers[1].offset).unwrap().body(), b"bb");
    assert_eq!(reader.get(pointers[2].offset).unwrap().body(), b"ccc");
    reader.close();

    // Sequential replay yields the same frames at the same offsets, then the
    // commit, then end of stream at the sentinel tail.
    let mut replay = factory::sequential_reader(&path).unwrap();
    assert_eq!(replay.log_file_id(), 7);
    for pointer in &pointers {
        let entry = replay.next().unwrap().unwrap();
        assert_eq!(entry.offset, pointer.offset);
        assert!(matches!(entry.record.body, RecordBody::Put(_)));
    }
    let commit = replay.next().unwrap().unwrap();
    assert!(matches!(commit.record.body, RecordBody::Commit));
    assert_eq!(commit.record.write_order_id, 103);
    assert!(replay.next().unwrap().is_none());
}

#[test]
fn test_take_frames_carry_back_pointers() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("log-8");
    let writer = factory::new_writer(&path, 8, &LogConfig::default()).unwrap();

    let pointer = writer.put(&put(5, 200, b"consumed")).unwrap();
    writer
        .take(&TransactionEventRecord::take(6, 201, pointer))
        .unwrap();
    writer
        .commit(&TransactionEventRecord::commit(6, 202))
        .unwrap();
    writer.close();

    let mut replay = factory::sequential_reader(&path).unwrap();
    replay.next().unwrap().unwrap();
    let take = replay.next().unwrap().unwrap();
    match take.record.body {
        RecordBody::Take(back) => assert_eq!(back, pointer),
        other => panic!("expected take, got {other:?}"),
    }
}

#[test]
fn test_checkpoint_fast_forward_and_refusal() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("log-9");
    let writer = factory::new_writer(&path, 9, &LogConfig::default()).unwrap();

    writer.put(&put(1, 40, b"before")).unwrap();
    let checkpoint_position = writer.position();
    writer.put(&put(2, 55, b"after")).unwrap();
    writer
        .commit(&TransactionEventRecord::commit(2, 56))
        .unwrap();
    writer.close();

    let mut meta_writer = factory::metadata_writer(&path).unwrap();
    meta_writer.mark_checkpoint(checkpoint_position, 50).unwrap();

    // Recovering to a checkpoint at or past the sidecar's: fast-forward.
    let mut replay = factory::sequential_reader(&path).unwrap();
    replay.skip_to_last_checkpoint_position(60).unwrap();
    let entry = replay.next().unwrap().unwrap();
    assert_eq!(entry.offset as u64, checkpoint_position);
    assert_eq!(entry.record.write_order_id, 55);

    // Recovering to an older checkpoint: the sidecar is ahead, replay from 0.
    let mut replay = factory::sequential_reader(&path).unwrap();
    replay.skip_to_last_checkpoint_position(40).unwrap();
    let entry = replay.next().unwrap().unwrap();
    assert_eq!(entry.offset, 0);
    assert_eq!(entry.record.write_order_id, 40);
}

#[test]
fn test_checkpoint_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("log-10");
    factory::new_writer(&path, 10, &LogConfig::default())
        .unwrap()
        .close();

    let mut meta_writer = factory::metadata_writer(&path).unwrap();
    meta_writer.mark_checkpoint(100, 50).unwrap();
    drop(meta_writer);

    // A new metadata writer (post-crash) picks up where the last one left
    // off, and refresh reuses the stored offset.
    let mut reopened = factory::metadata_writer(&path).unwrap();
    assert_eq!(reopened.last_checkpoint_offset(), 100);
    assert_eq!(reopened.last_checkpoint_write_order_id(), 50);
    reopened.refresh_checkpoint(58).unwrap();

    let replay = factory::sequential_reader(&path).unwrap();
    assert_eq!(replay.last_checkpoint_offset(), 100);
    assert_eq!(replay.last_checkpoint_write_order_id(), 58);
}

#[test]
fn test_corruption_is_contained() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("log-11");
    let writer = factory::new_writer(&path, 11, &LogConfig::default()).unwrap();

    let first = writer.put(&put(1, 70, b"intact")).unwrap();
    let second = writer.put(&put(1, 71, b"doomed")).unwrap();
    writer
        .commit(&TransactionEventRecord::commit(1, 72))
        .unwrap();
    writer.close();

    let mut contents = std::fs::read(&path).unwrap();
    contents[second.offset as usize] = 0x00;
    std::fs::write(&path, contents).unwrap();

    // Random read at the corrupt offset surfaces the bad byte.
    let reader = factory::random_reader(&path).unwrap();
    assert!(matches!(
        reader.get(second.offset),
        Err(weir_core::WeirError::Corruption { op: 0x00, .. })
    ));
    // The record before it is untouched.
    assert_eq!(reader.get(first.offset).unwrap().body(), b"intact");
    reader.close();

    // Sequential replay stops cleanly at the corruption.
    let mut replay = factory::sequential_reader(&path).unwrap();
    assert_eq!(replay.next().unwrap().unwrap().offset, first.offset);
    assert!(replay.next().unwrap().is_none());
}

#[test]
fn test_concurrent_random_reads_respect_pool_bound() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("log-12");
    let writer = factory::new_writer(&path, 12, &LogConfig::default()).unwrap();

    let mut pointers: Vec<EventPointer> = Vec::new();
    for i in 0..64u64 {
        let payload = format!("event-{i}");
        pointers.push(writer.put(&put(i, 300 + i, payload.as_bytes())).unwrap());
    }
    writer
        .commit(&TransactionEventRecord::commit(99, 400))
        .unwrap();
    writer.close();

    // More readers than the pool holds handles; every read must succeed
    // with at most READ_HANDLE_POOL_CAPACITY descriptors open.
    assert!(pointers.len() > READ_HANDLE_POOL_CAPACITY);
    let reader = Arc::new(factory::random_reader(&path).unwrap());
    let handles: Vec<_> = pointers
        .iter()
        .enumerate()
        .map(|(i, pointer)| {
            let reader = reader.clone();
            let offset = pointer.offset;
            thread::spawn(move || {
                let event = reader.get(offset).unwrap();
                assert_eq!(event.body(), format!("event-{i}").as_bytes());
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    // Close drains cleanly once the storm is over.
    reader.close();
    assert!(matches!(
        reader.get(pointers[0].offset),
        Err(weir_core::WeirError::Closed)
    ));
}

#[test]
fn test_replay_after_writer_restart() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("log-13");

    // First process lifetime: append, commit, and drop the writer without a
    // graceful close (Drop performs the best-effort close).
    {
        let writer = factory::new_writer(&path, 13, &LogConfig::default()).unwrap();
        writer.put(&put(1, 500, b"persisted")).unwrap();
        writer
            .commit(&TransactionEventRecord::commit(1, 501))
            .unwrap();
    }

    // Second lifetime: everything up to the commit is there.
    let mut replay = factory::sequential_reader(&path).unwrap();
    let first = replay.next().unwrap().unwrap();
    match first.record.body {
        RecordBody::Put(event) => assert_eq!(event.body(), b"persisted"),
        other => panic!("expected put, got {other:?}"),
    }
    assert!(matches!(
        replay.next().unwrap().unwrap().record.body,
        RecordBody::Commit
    ));
    assert!(replay.next().unwrap().is_none());
}
