use ml::PolicyParameters;
use rl::{fingerprint, Checkpoint, CheckpointStore, Hyperparameters, TrainError, OBS_SIZE};

fn checkpoint(slot: u64, seed: u64) -> Checkpoint {
    let params = PolicyParameters::new(OBS_SIZE, &[16, 16], 3, -0.5, seed);
    Checkpoint::new(slot, params, Hyperparameters::default(), vec![16, 16], 3, 250, Some(12.5))
}

#[test]
fn store_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = CheckpointStore::open(dir.path().join("ckpt")).unwrap();
    assert!(store.latest().unwrap().is_none());
    assert_eq!(store.next_slot().unwrap(), 0);

    let first = checkpoint(0, 1);
    let second = checkpoint(1, 2);
    store.write(&first).unwrap();
    store.write(&second).unwrap();

    assert_eq!(store.slots().unwrap(), vec![0, 1]);
    assert_eq!(store.next_slot().unwrap(), 2);
    assert_eq!(store.read(0).unwrap(), first);
    assert_eq!(store.latest().unwrap(), Some(second));
}

#[test]
fn slots_are_never_overwritten() {
    let dir = tempfile::tempdir().unwrap();
    let store = CheckpointStore::open(dir.path()).unwrap();
    let original = checkpoint(4, 1);
    store.write(&original).unwrap();

    let err = store.write(&checkpoint(4, 9)).unwrap_err();
    assert!(matches!(err, TrainError::CheckpointExists(_)));
    assert_eq!(store.read(4).unwrap(), original);
}

#[test]
fn tampered_parameters_fail_verification() {
    let mut ckpt = checkpoint(0, 1);
    ckpt.params.actor.b[0] += 1.0;
    let bytes = ckpt.to_bytes().unwrap();
    assert!(matches!(Checkpoint::from_bytes(&bytes), Err(TrainError::Checkpoint(_))));
}

#[test]
fn garbage_is_rejected() {
    assert!(Checkpoint::from_bytes(&[4, 0, 0, 0, 0x40, 1, 2, 3, 4]).is_err());
}

#[test]
fn id_carries_slot_and_fingerprint() {
    let ckpt = checkpoint(12, 1);
    assert_eq!(ckpt.fingerprint, fingerprint(&ckpt.params));
    assert_eq!(ckpt.fingerprint.len(), 64);
    assert!(ckpt.id.starts_with("000012-"));
    assert_ne!(checkpoint(12, 2).fingerprint, ckpt.fingerprint);
    assert!(chrono::DateTime::parse_from_rfc3339(&ckpt.created_at).is_ok());
}
