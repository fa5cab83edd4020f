//! Integration tests for backup, listing, verification and restore.
//!
//! These drive the public engine API against the in-process fake backend in
//! `test_helpers`.


use doublewrap::engine::{restore_time_arg, BackupMode};
use doublewrap::remote::RemoteShell;
use doublewrap::{AppError, AppResult};
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use tempfile::TempDir;
use test_helpers::{destination, engine, engine_name, FakeBackend};
use walkdir::WalkDir;

/// Source tree used by the end-to-end scenario: a single file and a
/// directory holding another file.
struct Sources {
    _dir: TempDir,
    file: PathBuf,
    dir: PathBuf,
    nested: PathBuf,
}

fn sources() -> Sources {
    let tmp = TempDir::new().expect("create temp dir");
    let file = tmp.path().join("A").join("f");
    let dir = tmp.path().join("B");
    let nested = dir.join("g");
    fs::create_dir_all(file.parent().unwrap()).unwrap();
    fs::create_dir_all(&dir).unwrap();
    fs::write(&file, "aaaaaaaaaa").unwrap();
    fs::write(&nested, "bbbbbbbbb").unwrap();
    Sources {
        _dir: tmp,
        file,
        dir,
        nested,
    }
}

fn gpg_options() -> Vec<String> {
    vec!["--gpg-options".to_string(), "--trust-model=always".to_string()]
}

#[test]
fn test_first_backup_full_then_incremental() {
    let remote = TempDir::new().unwrap();
    let src = sources();
    let backend = FakeBackend::new(remote.path());
    let engine = engine(&backend, &[&src.file, &src.dir]);

    assert_eq!(engine.backup(&gpg_options()).unwrap(), BackupMode::Full);
    assert_eq!(engine.backup(&gpg_options()).unwrap(), BackupMode::Incremental);
    assert_eq!(engine.backup(&[]).unwrap(), BackupMode::Incremental);

    let signatures: Vec<String> = backend
        .remote_entries("laptop")
        .into_iter()
        .filter(|e| e.contains("duplicity-full-signatures"))
        .collect();
    assert_eq!(signatures.len(), 1);

    let commands = backend.commands();
    let backups: Vec<&String> = commands.iter().filter(|c| c.starts_with("duplicity ")).collect();
    assert!(backups[0].starts_with("duplicity full "));
    assert!(backups[1].starts_with("duplicity incr "));
    assert!(backups[0].contains("--gpg-options --trust-model=always --include"));
}

#[test]
fn test_ensure_backup_root_twice() {
    let remote = TempDir::new().unwrap();
    let backend = FakeBackend::new(remote.path());
    let shell = RemoteShell::new("ssh", &destination(), backend.clone());

    let before = backend.remote_entries("");
    assert!(!shell.ensure("", "laptop").unwrap());
    assert!(shell.ensure("", "laptop").unwrap());
    let after = backend.remote_entries("");

    assert_eq!(after.len(), before.len() + 1);
    assert!(after.contains(&"laptop".to_string()));
    assert_eq!(
        backend.commands().iter().filter(|c| c.contains(" mkdir ")).count(),
        1
    );
}

#[test]
fn test_missing_remote_parent_is_reported() {
    let remote = TempDir::new().unwrap();
    let backend = FakeBackend::new(remote.path());
    let shell = RemoteShell::new("ssh", &destination(), backend.clone());

    assert!(matches!(
        shell.ensure("no/such/parent", "laptop"),
        Err(AppError::CommandFailed { exit_code: 2, .. })
    ));
}

#[test]
fn test_backup_restore_round_trip() {
    let remote = TempDir::new().unwrap();
    let src = sources();
    let backend = FakeBackend::new(remote.path());
    let engine = engine(&backend, &[&src.file, &src.dir]);
    engine.backup(&[]).unwrap();

    let out = TempDir::new().unwrap();
    let target = out.path().join("restored");
    engine.restore(&target, None, None).unwrap();

    for source in [&src.file, &src.dir] {
        for entry in WalkDir::new(source).into_iter().filter_map(|e| e.ok()) {
            let restored = target.join(engine_name(entry.path()));
            if entry.file_type().is_dir() {
                assert!(restored.is_dir(), "{} missing", restored.display());
            } else {
                assert_eq!(fs::read(entry.path()).unwrap(), fs::read(&restored).unwrap());
            }
        }
    }
}

#[test]
fn test_restore_missing_file_fails() {
    let remote = TempDir::new().unwrap();
    let src = sources();
    let backend = FakeBackend::new(remote.path());
    let engine = engine(&backend, &[&src.file]);
    engine.backup(&[]).unwrap();

    let out = TempDir::new().unwrap();
    match engine.restore(&out.path().join("x"), Some("no/such/file"), None) {
        Err(AppError::CommandFailed { stderr, .. }) => assert!(stderr.contains("not found in archive")),
        other => panic!("Expected CommandFailed, got {:?}", other),
    }
}

#[test]
fn test_end_to_end_scenario() {
    let remote = TempDir::new().unwrap();
    let src = sources();
    let backend = FakeBackend::new(remote.path());
    let engine = engine(&backend, &[&src.file, &src.dir]);

    assert_eq!(engine.backup(&gpg_options()).unwrap(), BackupMode::Full);

    let listed: Vec<String> = engine
        .list_files(None)
        .unwrap()
        .map(|line| line.map(|l| l.split_whitespace().last().unwrap_or_default().to_string()))
        .collect::<AppResult<_>>()
        .unwrap();
    assert!(listed.contains(&engine_name(&src.file)));
    assert!(listed.contains(&engine_name(&src.nested)));

    engine.verify().unwrap();

    let mut f = fs::OpenOptions::new().append(true).open(&src.file).unwrap();
    f.write_all(b"\nmoretext").unwrap();
    drop(f);

    match engine.verify() {
        Err(AppError::CommandFailed { exit_code, stderr, .. }) => {
            assert_eq!(exit_code, 1);
            assert!(stderr.contains("1 differences found"));
        }
        other => panic!("Expected CommandFailed from stale verify, got {:?}", other),
    }

    assert_eq!(engine.backup(&gpg_options()).unwrap(), BackupMode::Incremental);
    engine.verify().unwrap();

    let times = engine.chain_timestamps().unwrap();
    assert_eq!(times, backend.snapshot_times());
    assert_eq!(times.len(), 2);

    let out = TempDir::new().unwrap();
    let first = out.path().join("f_first");
    let second = out.path().join("f_second");
    let file = engine_name(&src.file);
    engine
        .restore(&first, Some(&file), Some(&restore_time_arg(&times[0])))
        .unwrap();
    engine
        .restore(&second, Some(&file), Some(&restore_time_arg(&times[1])))
        .unwrap();

    assert_eq!(fs::read_to_string(&first).unwrap(), "aaaaaaaaaa");
    assert_eq!(fs::read_to_string(&second).unwrap(), "aaaaaaaaaa\nmoretext");

    let dir_out = out.path().join("dir_restored");
    engine
        .restore(&dir_out, Some(&engine_name(&src.dir)), None)
        .unwrap();
    assert_eq!(fs::read_to_string(dir_out.join("g")).unwrap(), "bbbbbbbbb");
}

#[test]
fn test_file_presence_follows_history() {
    let remote = TempDir::new().unwrap();
    let tmp = TempDir::new().unwrap();
    let docs = tmp.path().join("docs");
    let note = docs.join("note.txt");
    fs::create_dir_all(&docs).unwrap();

    let backend = FakeBackend::new(remote.path());
    let engine = engine(&backend, &[&docs]);

    engine.backup(&[]).unwrap();
    fs::write(&note, "here").unwrap();
    engine.backup(&[]).unwrap();
    engine.backup(&[]).unwrap();
    fs::remove_file(&note).unwrap();
    engine.backup(&[]).unwrap();

    let name = engine_name(&note);
    let presence: Vec<bool> = engine
        .chain_timestamps()
        .unwrap()
        .iter()
        .map(|t| engine.file_at_timestamp(&name, t).unwrap())
        .collect();
    assert_eq!(presence, vec![false, true, true, false]);

    let never = engine_name(&docs.join("never.txt"));
    let times = engine.chain_timestamps().unwrap();
    assert!(times
        .iter()
        .all(|t| !engine.file_at_timestamp(&never, t).unwrap()));
}
