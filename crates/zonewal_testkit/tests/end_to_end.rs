//! End-to-end scenarios through the ZNS file-system decorator.

use zonewal_core::{WalName, ZnsError, ZoneManager, ZoneState};
use zonewal_storage::OpenFlags;
use zonewal_testkit::TempMount;

#[test]
fn two_zone_pool_walkthrough() {
    let mount = TempMount::new(2);
    let zones = ZoneManager::open(mount.path()).unwrap();

    let db = WalName::new("db-wal");
    let other = WalName::new("other-wal");
    let third = WalName::new("third-wal");

    assert_eq!(zones.acquire(&db).unwrap(), mount.zone_path(0));
    assert_eq!(zones.acquire(&other).unwrap(), mount.zone_path(1));
    assert!(matches!(
        zones.acquire(&third),
        Err(ZnsError::ResourceExhausted { .. })
    ));

    assert!(zones.release_wal(&db));
    assert_eq!(zones.acquire(&third).unwrap(), mount.zone_path(0));
}

#[test]
fn two_zone_pool_walkthrough_through_vfs() {
    let mount = TempMount::new(2);
    let vfs = mount.vfs();

    let db = vfs.open(&mount.data_path("db-wal"), OpenFlags::default()).unwrap();
    let other = vfs
        .open(&mount.data_path("other-wal"), OpenFlags::default())
        .unwrap();
    assert_eq!(db.zone_path().unwrap(), mount.zone_path(0));
    assert_eq!(other.zone_path().unwrap(), mount.zone_path(1));

    let third = vfs.open(&mount.data_path("third-wal"), OpenFlags::default());
    assert!(matches!(third, Err(ZnsError::ResourceExhausted { .. })));

    db.close().unwrap();
    let third = vfs
        .open(&mount.data_path("third-wal"), OpenFlags::default())
        .unwrap();
    assert_eq!(third.zone_path().unwrap(), mount.zone_path(0));
}

#[test]
fn zone_stays_bound_while_any_handle_is_open() {
    let mount = TempMount::new(1);
    let vfs = mount.vfs();
    let main = mount.data_path("main.db-wal");
    let other = mount.data_path("other.db-wal");

    let first = vfs.open(&main, OpenFlags::default()).unwrap();
    let mut second = vfs.open(&main, OpenFlags::default()).unwrap();
    first.close().unwrap();

    let refused = vfs.open(&other, OpenFlags::default());
    assert!(matches!(refused, Err(ZnsError::ResourceExhausted { .. })));

    second.write(0, b"MAIN!").unwrap();
    second.sync().unwrap();
    drop(second);
    assert_eq!(mount.zone_contents(0), b"MAIN!");

    let mut other = vfs.open(&other, OpenFlags::default()).unwrap();
    assert_eq!(other.zone_path().unwrap(), mount.zone_path(0));
    assert_eq!(other.size().unwrap(), 5);
    other.write(5, b"OTHER").unwrap();
    other.sync().unwrap();
    assert_eq!(mount.zone_contents(0), b"MAIN!OTHER");
}

#[test]
fn header_and_frame_flush_in_one_pass() {
    let mount = TempMount::new(1);
    let vfs = mount.vfs();
    let mut wal = vfs
        .open(&mount.data_path("main.db-wal"), OpenFlags::default())
        .unwrap();

    wal.write(0, &[0xAA; 16]).unwrap();
    // A frame may not start past the end of the log.
    assert!(matches!(
        wal.write(32, &[0xBB; 100]),
        Err(ZnsError::WriteGap {
            offset: 32,
            buffered: 16
        })
    ));
    wal.write(16, &[0; 16]).unwrap();
    wal.write(32, &[0xBB; 100]).unwrap();
    assert_eq!(wal.size().unwrap(), 132);

    wal.write(0, &[0xCC; 16]).unwrap();
    assert_eq!(wal.size().unwrap(), 132);
    assert_eq!(mount.zone_len(0), 0);

    assert_eq!(wal.flush().unwrap(), 132);
    let appends = wal.zone_stats().unwrap().appends;
    assert_eq!(appends, 1);

    assert_eq!(wal.flush().unwrap(), 0);
    assert_eq!(wal.zone_stats().unwrap().appends, appends);
    assert_eq!(wal.flushed_size(), Some(132));

    let zone = mount.zone_contents(0);
    assert_eq!(zone.len(), 132);
    assert_eq!(&zone[..16], &[0xCC; 16]);
    assert_eq!(&zone[32..], &[0xBB; 100][..]);
}

#[test]
fn checkpoint_truncate_resets_write_pointer() {
    let mount = TempMount::new(1);
    let vfs = mount.vfs();
    let mut wal = vfs
        .open(&mount.data_path("main.db-wal"), OpenFlags::default())
        .unwrap();

    wal.write(0, &[1; 4096]).unwrap();
    wal.sync().unwrap();
    assert_eq!(mount.zone_len(0), 4096);

    wal.truncate(0).unwrap();
    assert_eq!(wal.size().unwrap(), 0);
    assert_eq!(mount.zone_len(0), 0);
    assert_eq!(wal.zone_stats().unwrap().resets, 1);

    wal.write(0, b"fresh").unwrap();
    wal.sync().unwrap();
    assert_eq!(mount.zone_contents(0), b"fresh");
}

#[test]
fn delete_frees_zone_for_next_wal() {
    let mount = TempMount::new(1);
    let vfs = mount.vfs();
    let path = mount.data_path("a.db-wal");

    let mut wal = vfs.open(&path, OpenFlags::default()).unwrap();
    wal.write(0, b"old log").unwrap();
    wal.sync().unwrap();
    drop(wal);

    // Closing keeps the data; only delete resets.
    assert_eq!(mount.zone_contents(0), b"old log");
    let _reopened = vfs.open(&path, OpenFlags::default()).unwrap();
    vfs.delete(&path, true).unwrap();
    assert_eq!(mount.zone_len(0), 0);

    let next = vfs
        .open(&mount.data_path("b.db-wal"), OpenFlags::default())
        .unwrap();
    assert_eq!(next.size().unwrap(), 0);
    let snapshot = vfs.zones().snapshot();
    assert_eq!(snapshot[0].state, ZoneState::Allocated);
    assert_eq!(snapshot[0].occupant.as_ref().unwrap().as_str(), "b.db-wal");
}

#[test]
fn stale_zone_is_appended_to() {
    let mount = TempMount::new(1);
    mount.seed_zone(0, b"previous run");
    let vfs = mount.vfs();

    let mut wal = vfs
        .open(&mount.data_path("main.db-wal"), OpenFlags::default())
        .unwrap();
    assert_eq!(wal.size().unwrap(), 12);
    wal.write(12, b"+more").unwrap();
    wal.sync().unwrap();
    assert_eq!(mount.zone_contents(0), b"previous run+more");
}

#[test]
fn disabling_zns_restores_pass_through() {
    let mount = TempMount::new(1);
    let vfs = mount.vfs();
    let path = mount.data_path("main.db-wal");

    assert!(vfs.open(&path, OpenFlags::default()).unwrap().is_redirected());
    vfs.use_zns(None).unwrap();

    let mut wal = vfs.open(&path, OpenFlags::default()).unwrap();
    assert!(!wal.is_redirected());
    wal.write(100, b"sparse is fine here").unwrap();
    wal.close().unwrap();
    assert!(path.exists());

    vfs.use_zns(Some(mount.path())).unwrap();
    assert!(vfs.exists(&path).unwrap());
    vfs.delete(&path, false).unwrap();
    assert!(!path.exists());
}

#[test]
fn custom_wal_suffix() {
    let mount = TempMount::new(1);
    let vfs = mount.vfs_with(
        std::sync::Arc::new(zonewal_storage::OsFileSystem::new()),
        zonewal_core::ZnsConfig::new().wal_suffix(".log"),
    );

    let log = vfs
        .open(&mount.data_path("journal.log"), OpenFlags::default())
        .unwrap();
    let wal = vfs
        .open(&mount.data_path("main.db-wal"), OpenFlags::default())
        .unwrap();
    assert!(log.is_redirected());
    assert!(!wal.is_redirected());
}
