//! Concurrent use of the zone pool.

use std::sync::{Arc, Barrier};
use std::thread;
use zonewal_core::{WalName, ZnsError, ZoneManager};
use zonewal_storage::OpenFlags;
use zonewal_testkit::TempMount;

#[test]
fn at_most_pool_size_acquisitions_succeed() {
    const ZONES: u32 = 3;
    const WALS: usize = 12;

    let mount = TempMount::new(ZONES);
    let zones = Arc::new(ZoneManager::open(mount.path()).unwrap());
    let barrier = Arc::new(Barrier::new(WALS));

    let handles: Vec<_> = (0..WALS)
        .map(|i| {
            let zones = Arc::clone(&zones);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                zones.acquire(&WalName::new(format!("wal-{i}-wal")))
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let mut granted: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    let exhausted = results
        .iter()
        .filter(|r| matches!(r, Err(ZnsError::ResourceExhausted { .. })))
        .count();

    assert_eq!(granted.len(), ZONES as usize);
    assert_eq!(exhausted, WALS - ZONES as usize);
    granted.sort();
    granted.dedup();
    assert_eq!(granted.len(), ZONES as usize);
}

#[test]
fn wal_handles_on_many_threads() {
    const ZONES: u32 = 4;

    let mount = Arc::new(TempMount::new(ZONES));
    let vfs = Arc::new(mount.vfs());

    let handles: Vec<_> = (0..ZONES)
        .map(|i| {
            let mount = Arc::clone(&mount);
            let vfs = Arc::clone(&vfs);
            thread::spawn(move || {
                let path = mount.data_path(&format!("db{i}.db-wal"));
                let mut wal = vfs.open(&path, OpenFlags::default()).unwrap();
                let frame = vec![i as u8; 512];
                for n in 0..8u64 {
                    wal.write(n * 512, &frame).unwrap();
                }
                wal.sync().unwrap();
                wal.zone_path().unwrap().to_path_buf()
            })
        })
        .collect();

    let mut zones: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    zones.sort();
    zones.dedup();
    assert_eq!(zones.len(), ZONES as usize);

    for id in 0..ZONES {
        let contents = mount.zone_contents(id);
        assert_eq!(contents.len(), 4096);
        assert!(contents.iter().all(|b| *b == contents[0]));
    }
    assert_eq!(vfs.zones().stats().free, ZONES as usize);
}

#[test]
fn release_and_acquire_race() {
    let mount = TempMount::new(2);
    let zones = Arc::new(ZoneManager::open(mount.path()).unwrap());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let zones = Arc::clone(&zones);
            thread::spawn(move || {
                let wal = WalName::new(format!("w{i}-wal"));
                for _ in 0..200 {
                    if zones.acquire(&wal).is_ok() {
                        assert_eq!(zones.lookup(&wal), zones.acquire(&wal).ok());
                        assert!(zones.release_wal(&wal));
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let stats = zones.stats();
    assert_eq!(stats.free, 2);
    assert_eq!(stats.allocated, 0);
}
