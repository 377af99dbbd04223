//! Live update: the outgoing instance saves its state, the successor restores it.

use secret_driver::core::{
    AccessMode, CoreError, DeviceState, Principal, GRANT_REQUEST, O_RDONLY, O_WRONLY,
};
use secret_driver::store::snapshot::{KEY_HANDLES, KEY_OPEN_COUNT, KEY_OWNER};
use secret_driver::store::{
    save_snapshot, MemoryStore, OpenHandle, SavedState, SqliteStore, StateStore, StateStoreExt,
    StoreError, SNAPSHOT_KEYS,
};
use secret_driver::{
    service, DriverConfig, DriverError, Endpoint, GrantHandle, InitKind, InitOutcome, MemoryHost,
    Reply, SecretDriver, EBADF,
};
use tempfile::tempdir;

const WRITER: Endpoint = Endpoint(1);
const READER: Endpoint = Endpoint(2);
const BOB: Principal = Principal::new(1001);

fn host() -> MemoryHost {
    let host = MemoryHost::new();
    host.register(WRITER, Principal::new(1000));
    host.register(READER, BOB);
    host
}

/// Run a write-and-grant session that leaves the writer's handle open.
async fn outgoing(host: &MemoryHost) -> SecretDriver<MemoryHost> {
    let (handle, task) = service::spawn(SecretDriver::new(DriverConfig::default(), host.clone()));
    host.expose(WRITER, GrantHandle(1), b"hello world".to_vec());
    host.expose(WRITER, GrantHandle(2), BOB.to_ne_bytes().to_vec());

    handle.open(WRITER, O_WRONLY).await.unwrap();
    handle.write(WRITER, GrantHandle(1), 11).await.unwrap();
    handle.grant(WRITER, GRANT_REQUEST, GrantHandle(2)).await.unwrap();

    drop(handle);
    task.await.unwrap()
}

async fn save_and_restore<S: StateStore>(store: &S) {
    let host = host();
    let old = outgoing(&host).await;
    old.prepare_live_update(store).await.unwrap();

    let (new, outcome) =
        SecretDriver::init(DriverConfig::default(), host.clone(), InitKind::LiveUpdate, store)
            .await
            .unwrap();

    assert_eq!(
        outcome,
        InitOutcome {
            announce: false,
            restored: true
        }
    );
    assert_eq!(new.state().snapshot(), old.state().snapshot());
    assert_eq!(new.handles(), old.handles());
    assert!(store.keys().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_save_restore_memory() {
    save_and_restore(&MemoryStore::new()).await;
}

#[tokio::test]
async fn test_save_restore_sqlite() {
    save_and_restore(&SqliteStore::open_memory().unwrap()).await;
}

#[tokio::test]
async fn test_session_continues_after_update() {
    let host = host();
    let store = MemoryStore::new();
    outgoing(&host)
        .await
        .prepare_live_update(&store)
        .await
        .unwrap();

    let (new, _) =
        SecretDriver::init(DriverConfig::default(), host.clone(), InitKind::LiveUpdate, &store)
            .await
            .unwrap();
    let (handle, task) = service::spawn(new);

    // The writer's handle from before the update is closed on the new instance.
    assert_eq!(handle.close(WRITER).await.unwrap(), Reply::Ok);
    host.allocate(READER, GrantHandle(3), 32);
    assert_eq!(handle.open(READER, O_RDONLY).await.unwrap(), Reply::Ok);
    assert_eq!(
        handle.read(READER, GrantHandle(3), 32).await.unwrap(),
        Reply::Transferred(11)
    );
    handle.close(READER).await.unwrap();
    assert_eq!(
        &host.region(READER, GrantHandle(3)).unwrap()[..11],
        b"hello world"
    );

    drop(handle);
    assert!(task.await.unwrap().state().is_baseline());
}

#[tokio::test]
async fn test_handles_carried_across_update() {
    let host = host();
    let store = MemoryStore::new();
    outgoing(&host)
        .await
        .prepare_live_update(&store)
        .await
        .unwrap();

    let (new, _) =
        SecretDriver::init(DriverConfig::default(), host.clone(), InitKind::LiveUpdate, &store)
            .await
            .unwrap();
    assert!(new.handles().holds(WRITER, AccessMode::WriteOnly));
    assert!(new.handles().modes(READER).is_empty());

    // The grantee owns the claim but never opened on either instance.
    let (handle, _task) = service::spawn(new);
    assert_eq!(
        handle.close(READER).await.unwrap(),
        Reply::Error { errno: EBADF }
    );
}

#[tokio::test]
async fn test_tampered_handles_rejected() {
    let host = host();
    let store = MemoryStore::new();
    outgoing(&host)
        .await
        .prepare_live_update(&store)
        .await
        .unwrap();
    let moved = vec![OpenHandle {
        holder: READER.0,
        mode: AccessMode::WriteOnly,
    }];
    store.publish_value(KEY_HANDLES, &moved).await.unwrap();

    let result = SecretDriver::init(DriverConfig::default(), host, InitKind::LiveUpdate, &store).await;
    assert!(matches!(
        result,
        Err(DriverError::Store(StoreError::DigestMismatch { .. }))
    ));
}

#[tokio::test]
async fn test_handles_must_match_open_count() {
    let mut state = DeviceState::new();
    state.open(Principal::new(1000), AccessMode::WriteOnly).unwrap();
    let store = MemoryStore::new();
    let saved = SavedState {
        device: state.snapshot(),
        handles: Vec::new(),
    };
    save_snapshot(&store, &saved).await.unwrap();

    let result =
        SecretDriver::init(DriverConfig::default(), host(), InitKind::LiveUpdate, &store).await;
    assert!(matches!(
        result,
        Err(DriverError::Core(CoreError::InvalidSnapshot(_)))
    ));
}

#[tokio::test]
async fn test_snapshot_survives_store_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("live-update.db");
    let host = host();

    let old = outgoing(&host).await;
    {
        let store = SqliteStore::open(&path).unwrap();
        old.prepare_live_update(&store).await.unwrap();
    }

    let store = SqliteStore::open(&path).unwrap();
    let (new, outcome) =
        SecretDriver::init(DriverConfig::default(), host, InitKind::LiveUpdate, &store)
            .await
            .unwrap();
    assert!(outcome.restored);
    assert_eq!(new.state().owner(), Some(BOB));
    assert_eq!(new.state().open_count(), 1);
    assert_eq!(new.prepare().size, 11);
}

#[tokio::test]
async fn test_tampered_snapshot_rejected() {
    let host = host();
    let store = MemoryStore::new();
    outgoing(&host)
        .await
        .prepare_live_update(&store)
        .await
        .unwrap();
    store
        .publish_value(KEY_OWNER, &Some(Principal::new(666)))
        .await
        .unwrap();

    let err = SecretDriver::init(DriverConfig::default(), host, InitKind::LiveUpdate, &store)
        .await
        .err()
        .unwrap();
    assert!(matches!(
        err,
        DriverError::Store(StoreError::DigestMismatch { .. })
    ));
}

#[tokio::test]
async fn test_each_field_is_covered_by_digest() {
    let host = host();
    let store = MemoryStore::new();
    outgoing(&host)
        .await
        .prepare_live_update(&store)
        .await
        .unwrap();
    store.publish_u32(KEY_OPEN_COUNT, 0).await.unwrap();

    let result = SecretDriver::init(DriverConfig::default(), host, InitKind::LiveUpdate, &store).await;
    assert!(matches!(
        result,
        Err(DriverError::Store(StoreError::DigestMismatch { .. }))
    ));
}

#[tokio::test]
async fn test_capacity_change_rejected() {
    let host = host();
    let store = MemoryStore::new();
    outgoing(&host)
        .await
        .prepare_live_update(&store)
        .await
        .unwrap();

    let config = DriverConfig {
        capacity: 64,
        ..DriverConfig::default()
    };
    let result = SecretDriver::init(config, host, InitKind::LiveUpdate, &store).await;
    assert!(matches!(
        result,
        Err(DriverError::Core(CoreError::InvalidSnapshot(_)))
    ));
}

#[tokio::test]
async fn test_restart_ignores_saved_state() {
    let host = host();
    let store = MemoryStore::new();
    outgoing(&host)
        .await
        .prepare_live_update(&store)
        .await
        .unwrap();

    let (driver, outcome) =
        SecretDriver::init(DriverConfig::default(), host, InitKind::Restart, &store)
            .await
            .unwrap();
    assert!(outcome.announce);
    assert!(!outcome.restored);
    assert!(driver.state().is_baseline());
    assert_eq!(store.len(), SNAPSHOT_KEYS.len());
}
