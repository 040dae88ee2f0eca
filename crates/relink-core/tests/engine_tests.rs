use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

use relink_core::config::{
    AppConfig, DatabaseConfig, FilesetConfig, PathMapRule, TargetConfig,
};
use relink_core::storage::Database;
use relink_core::{AuditEngine, Mode, SilentReporter, TargetStats};

struct Fixture {
    _tmp: TempDir,
    config: AppConfig,
    db_path: PathBuf,
    source_dir: PathBuf,
}

/// Temp workspace: a `documents` target table, one fileset ledger, a
/// content-store root and a directory of source files.
fn setup() -> Fixture {
    let tmp = tempdir().unwrap();
    let store_root = tmp.path().join("store");
    let source_dir = tmp.path().join("src");
    fs::create_dir_all(&store_root).unwrap();
    fs::create_dir_all(&source_dir).unwrap();

    let db_path = tmp.path().join("audit.db");
    {
        let db = Database::open(db_path.to_str().unwrap()).unwrap();
        db.connection()
            .execute_batch(
                "CREATE TABLE documents (id INTEGER PRIMARY KEY, path TEXT, attachment_id TEXT)",
            )
            .unwrap();
    }

    let config = AppConfig {
        database: DatabaseConfig {
            path: db_path.to_string_lossy().into_owned(),
        },
        owner_user_id: 42,
        results_dir: tmp.path().join("results").to_string_lossy().into_owned(),
        verify_content: false,
        filesets: vec![FilesetConfig {
            id: "docs".to_string(),
            table_name: "fileset_docs".to_string(),
            root: store_root.to_string_lossy().into_owned(),
            subdir: "static".to_string(),
        }],
        targets: vec![TargetConfig {
            table_name: "documents".to_string(),
            path_column: "path".to_string(),
            id_column: "id".to_string(),
            link_column: "attachment_id".to_string(),
            fileset_id: "docs".to_string(),
            only_missing_links: false,
            info_columns: vec![],
        }],
        path_map: vec![],
    };

    Fixture {
        _tmp: tmp,
        config,
        db_path,
        source_dir,
    }
}

fn insert_row(fixture: &Fixture, id: i64, path: Option<&str>, link: Option<&str>) {
    let db = Database::open(fixture.db_path.to_str().unwrap()).unwrap();
    db.connection()
        .execute(
            "INSERT INTO documents (id, path, attachment_id) VALUES (?1, ?2, ?3)",
            rusqlite::params![id, path, link],
        )
        .unwrap();
}

fn write_source(fixture: &Fixture, name: &str, bytes: usize) -> PathBuf {
    let path = fixture.source_dir.join(name);
    fs::write(&path, vec![b'x'; bytes]).unwrap();
    path
}

fn run(fixture: &Fixture, mode: Mode) -> TargetStats {
    let engine = AuditEngine::new(fixture.config.clone());
    let report = engine.run(mode, &SilentReporter).unwrap();
    assert_eq!(report.targets.len(), 1);
    report.targets.into_iter().next().unwrap()
}

fn link_of(fixture: &Fixture, id: i64) -> Option<String> {
    let db = Database::open(fixture.db_path.to_str().unwrap()).unwrap();
    db.connection()
        .query_row(
            "SELECT attachment_id FROM documents WHERE id = ?1",
            rusqlite::params![id],
            |row| row.get(0),
        )
        .unwrap()
}

fn ledger_count(fixture: &Fixture) -> i64 {
    let db = Database::open(fixture.db_path.to_str().unwrap()).unwrap();
    db.connection()
        .query_row("SELECT COUNT(*) FROM fileset_docs", [], |row| row.get(0))
        .unwrap()
}

fn latest_full_path(fixture: &Fixture, link: &str) -> String {
    let db = Database::open(fixture.db_path.to_str().unwrap()).unwrap();
    db.latest_fileset_record("fileset_docs", link)
        .unwrap()
        .unwrap()
        .full_path
}

#[test]
fn test_empty_and_null_paths_counted_not_probed() {
    let fixture = setup();
    insert_row(&fixture, 1, Some(""), Some("some-link"));
    insert_row(&fixture, 2, None, None);
    insert_row(&fixture, 3, Some("   "), None);

    let stats = run(&fixture, Mode::Verify);
    assert_eq!(stats.rows, 3);
    // Empty wins regardless of link or ledger state.
    assert_eq!(stats.empty_path, 3);
    assert_eq!(stats.inconsistent(), 0);
    assert_eq!(stats.consistent, 0);
}

#[test]
fn test_source_missing_wins_over_present_link() {
    let fixture = setup();
    insert_row(
        &fixture,
        1,
        Some("/definitely/not/here.pdf"),
        Some("some-link"),
    );

    let stats = run(&fixture, Mode::Verify);
    assert_eq!(stats.source_missing, 1);
    assert_eq!(stats.ledger_record_missing, 0);
}

#[test]
fn test_outcome_matrix_verify() {
    let fixture = setup();
    let real = write_source(&fixture, "report.pdf", 500);
    insert_row(&fixture, 1, Some(real.to_str().unwrap()), None); // LinkMissing
    insert_row(&fixture, 2, Some("/gone/file.bin"), None); // SourceFileMissing
    insert_row(&fixture, 3, Some(""), None); // EmptyPath
    insert_row(&fixture, 4, Some(real.to_str().unwrap()), Some("dangling")); // LedgerRecordMissing

    let stats = run(&fixture, Mode::Verify);
    assert_eq!(stats.rows, 4);
    assert_eq!(stats.link_missing, 1);
    assert_eq!(stats.source_missing, 1);
    assert_eq!(stats.empty_path, 1);
    assert_eq!(stats.ledger_record_missing, 1);
    assert_eq!(stats.repaired, 0);
}

#[test]
fn test_verify_mode_is_side_effect_free() {
    let fixture = setup();
    let real = write_source(&fixture, "report.pdf", 500);
    insert_row(&fixture, 1, Some(real.to_str().unwrap()), None);
    insert_row(&fixture, 2, Some("/gone/file.bin"), Some("x"));

    let first = run(&fixture, Mode::Verify);
    let second = run(&fixture, Mode::Verify);
    assert_eq!(first.link_missing, second.link_missing);
    assert_eq!(first.source_missing, second.source_missing);
    assert_eq!(ledger_count(&fixture), 0);
    assert_eq!(link_of(&fixture, 1), None);
}

#[test]
fn test_repair_link_missing_converges_to_consistent() {
    let fixture = setup();
    let real = write_source(&fixture, "report.pdf", 500);
    insert_row(&fixture, 7, Some(real.to_str().unwrap()), None);

    let stats = run(&fixture, Mode::Repair);
    assert_eq!(stats.link_missing, 1);
    assert_eq!(stats.repaired, 1);
    assert_eq!(stats.repair_failed, 0);

    let link = link_of(&fixture, 7).expect("link column set by repair");
    let full_path = latest_full_path(&fixture, &link);
    assert!(Path::new(&full_path).is_file());
    assert_eq!(fs::metadata(&full_path).unwrap().len(), 500);

    // The copy lands under <root>/<subdir>/<fileset id>/
    assert!(full_path.contains("static"));
    assert!(full_path.contains(&link));

    let stats = run(&fixture, Mode::Verify);
    assert_eq!(stats.consistent, 1);
    assert_eq!(stats.inconsistent(), 0);
}

#[test]
fn test_size_mismatch_flip_and_append_only_repair() {
    let fixture = setup();
    let real = write_source(&fixture, "report.pdf", 100);
    insert_row(&fixture, 1, Some(real.to_str().unwrap()), None);

    run(&fixture, Mode::Repair);
    assert_eq!(ledger_count(&fixture), 1);
    let old_link = link_of(&fixture, 1).unwrap();

    // Same paths, equal sizes: consistent.
    let stats = run(&fixture, Mode::Verify);
    assert_eq!(stats.consistent, 1);

    // Truncate the stored copy: the outcome flips.
    let stored = latest_full_path(&fixture, &old_link);
    fs::write(&stored, vec![b'x'; 99]).unwrap();
    let stats = run(&fixture, Mode::Verify);
    assert_eq!(stats.size_mismatch, 1);
    assert_eq!(stats.consistent, 0);

    // Repair creates a fresh fileset id and a second ledger record; the
    // old record and its file are never deleted.
    let stats = run(&fixture, Mode::Repair);
    assert_eq!(stats.repaired, 1);
    let new_link = link_of(&fixture, 1).unwrap();
    assert_ne!(new_link, old_link);
    assert_eq!(ledger_count(&fixture), 2);
    assert!(Path::new(&stored).is_file());

    let stats = run(&fixture, Mode::Verify);
    assert_eq!(stats.consistent, 1);
}

#[test]
fn test_stored_copy_missing_is_repairable() {
    let fixture = setup();
    let real = write_source(&fixture, "report.pdf", 100);
    insert_row(&fixture, 1, Some(real.to_str().unwrap()), None);

    run(&fixture, Mode::Repair);
    let link = link_of(&fixture, 1).unwrap();
    let stored = latest_full_path(&fixture, &link);
    fs::remove_file(&stored).unwrap();

    let stats = run(&fixture, Mode::Verify);
    assert_eq!(stats.stored_copy_missing, 1);

    let stats = run(&fixture, Mode::Repair);
    assert_eq!(stats.repaired, 1);
    let stats = run(&fixture, Mode::Verify);
    assert_eq!(stats.consistent, 1);
}

#[test]
fn test_repair_copy_failure_leaves_row_and_ledger_untouched() {
    let fixture = setup();
    let real = write_source(&fixture, "report.pdf", 100);
    insert_row(&fixture, 1, Some(real.to_str().unwrap()), None);

    // A regular file where the store subdirectory belongs makes the
    // copy destination uncreatable. The root itself stays a directory,
    // so preflight passes and the failure surfaces per row.
    let store_dir = fixture.config.filesets[0].store_dir();
    fs::write(&store_dir, b"in the way").unwrap();

    let stats = run(&fixture, Mode::Repair);
    assert_eq!(stats.link_missing, 1);
    assert_eq!(stats.repaired, 0);
    assert_eq!(stats.repair_failed, 1);

    // Failed repair mutates nothing.
    assert_eq!(link_of(&fixture, 1), None);
    assert_eq!(ledger_count(&fixture), 0);

    // The run completes and stays repairable once the store is back.
    fs::remove_file(&store_dir).unwrap();
    let stats = run(&fixture, Mode::Repair);
    assert_eq!(stats.repaired, 1);
    assert_eq!(stats.repair_failed, 0);
}

#[test]
fn test_path_map_applied_before_probe() {
    let mut fixture = setup();
    let real = write_source(&fixture, "report.pdf", 10);
    let real_dir = fixture.source_dir.to_string_lossy().into_owned();
    fixture.config.path_map = vec![PathMapRule {
        from: "/vanished/mount".to_string(),
        to: real_dir,
    }];
    insert_row(&fixture, 1, Some("/vanished/mount/report.pdf"), None);

    let stats = run(&fixture, Mode::Verify);
    // Found through the rewrite, so the discrepancy is the missing
    // link, not a missing source.
    assert_eq!(stats.source_missing, 0);
    assert_eq!(stats.link_missing, 1);

    // Repair must copy from the same normalized path.
    let stats = run(&fixture, Mode::Repair);
    assert_eq!(stats.repaired, 1);
    let link = link_of(&fixture, 1).unwrap();
    assert_eq!(
        fs::metadata(latest_full_path(&fixture, &link)).unwrap().len(),
        fs::metadata(&real).unwrap().len()
    );
}

#[test]
fn test_strict_content_mode_catches_equal_sizes() {
    let mut fixture = setup();
    let real = write_source(&fixture, "report.pdf", 100);
    insert_row(&fixture, 1, Some(real.to_str().unwrap()), None);

    run(&fixture, Mode::Repair);
    let link = link_of(&fixture, 1).unwrap();
    let stored = latest_full_path(&fixture, &link);

    // Same size, different bytes.
    fs::write(&stored, vec![b'y'; 100]).unwrap();

    let stats = run(&fixture, Mode::Verify);
    assert_eq!(stats.consistent, 1, "size-only check cannot see this");

    fixture.config.verify_content = true;
    let stats = run(&fixture, Mode::Verify);
    assert_eq!(stats.size_mismatch, 1);
    assert_eq!(stats.consistent, 0);
}

#[test]
fn test_preflight_rejects_unreachable_store_root() {
    let mut fixture = setup();
    fixture.config.filesets[0].root = fixture
        ._tmp
        .path()
        .join("no_such_root")
        .to_string_lossy()
        .into_owned();

    let engine = AuditEngine::new(fixture.config.clone());
    let result = engine.run(Mode::Verify, &SilentReporter);
    assert!(result.is_err());
}

#[test]
fn test_category_logs_written_per_target() {
    let fixture = setup();
    let real = write_source(&fixture, "report.pdf", 10);
    insert_row(&fixture, 1, Some(real.to_str().unwrap()), None);
    insert_row(&fixture, 2, Some("/gone.bin"), None);

    run(&fixture, Mode::Verify);

    let results = Path::new(&fixture.config.results_dir);
    let suffix = "T-documents_C-path";
    let link_missing = fs::read_to_string(results.join(format!("LinkMissing_{}.log", suffix)))
        .unwrap();
    assert!(link_missing.contains("Link id not set"));
    // Every category log ends with the statistics block.
    assert!(link_missing.contains("Rows selected: 2"));
    let source_missing =
        fs::read_to_string(results.join(format!("SourceMissing_{}.log", suffix))).unwrap();
    assert!(source_missing.contains("/gone.bin"));
}
