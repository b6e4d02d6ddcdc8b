// Integration tests for the migration runner
// Covers ordering, at-most-once application, atomicity, and failure policy

use migrun_core::{ExErrorKind, ExecutionOutcome, FailurePolicy, MigrationScript, RunOptions};
use migrun_store::target::SqliteTarget;
use migrun_store::{run_migrations, verify, MigrationTarget};

const SEED: &str = "CREATE TABLE competitions (id INTEGER PRIMARY KEY, name TEXT NOT NULL, status TEXT);
INSERT INTO competitions (name, status) VALUES ('Spelling Bee', 'Pending');
INSERT INTO competitions (name, status) VALUES ('Chess', 'Pending');
INSERT INTO competitions (name, status) VALUES ('Robotics', 'active');";

const FIX_STATUS: &str = "UPDATE competitions SET status = 'active' WHERE status = 'Pending';";

fn script(name: &str, sql: &str) -> MigrationScript {
    MigrationScript::new(name, sql).unwrap()
}

fn competition_scripts() -> Vec<MigrationScript> {
    vec![
        script("001_seed", SEED),
        script("002_fix_competitions_status", FIX_STATUS),
    ]
}

fn count(target: &SqliteTarget, sql: &str) -> i64 {
    target
        .connection()
        .query_row(sql, [], |row| row.get(0))
        .unwrap()
}

fn applied_names(target: &mut SqliteTarget) -> Vec<String> {
    target
        .applied_migrations()
        .unwrap()
        .into_iter()
        .map(|r| r.name)
        .collect()
}

#[test]
fn test_competitions_status_fix() {
    // Given: an empty database and the seed + status-fix scripts
    let mut target = SqliteTarget::open_in_memory().unwrap();

    // When: the scripts are run
    let report = run_migrations(&mut target, &competition_scripts(), &RunOptions::default()).unwrap();

    // Then: both applied and no Pending rows remain
    assert_eq!(report.summary().applied, 2);
    assert!(!report.has_failures());
    assert_eq!(
        count(&target, "SELECT COUNT(*) FROM competitions WHERE status = 'Pending'"),
        0
    );

    let rows = verify(
        &mut target,
        "SELECT name, status FROM competitions ORDER BY id DESC LIMIT 10",
    )
    .unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(
        rows.column("status").unwrap(),
        vec!["active", "active", "active"]
    );
}

#[test]
fn test_second_run_is_all_already_applied() {
    // Given: a database the scripts were already run against
    let mut target = SqliteTarget::open_in_memory().unwrap();
    let scripts = competition_scripts();
    run_migrations(&mut target, &scripts, &RunOptions::default()).unwrap();
    let before = count(&target, "SELECT COUNT(*) FROM competitions");

    // When: the same scripts are run again
    let report = run_migrations(&mut target, &scripts, &RunOptions::default()).unwrap();

    // Then: nothing executes and the data is unchanged
    assert_eq!(report.summary().already_applied, 2);
    assert_eq!(report.summary().applied, 0);
    for result in report.results() {
        assert!(matches!(
            result.outcome,
            ExecutionOutcome::AlreadyApplied {
                checksum_changed: false,
                ..
            }
        ));
    }
    assert_eq!(count(&target, "SELECT COUNT(*) FROM competitions"), before);
}

#[test]
fn test_results_follow_input_order() {
    let mut target = SqliteTarget::open_in_memory().unwrap();
    let scripts = vec![
        script("b_second", "CREATE TABLE b (id INTEGER);"),
        script("a_first", "CREATE TABLE a (id INTEGER);"),
    ];

    let report = run_migrations(&mut target, &scripts, &RunOptions::default()).unwrap();

    let names: Vec<&str> = report.results().iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["b_second", "a_first"]);
}

#[test]
fn test_order_decides_whether_dependent_script_succeeds() {
    let create = script("create", "CREATE TABLE t (id INTEGER);");
    let insert = script("insert", "INSERT INTO t VALUES (1);");

    // Given A then B: B sees A's effects
    let mut target = SqliteTarget::open_in_memory().unwrap();
    let report = run_migrations(
        &mut target,
        &[create.clone(), insert.clone()],
        &RunOptions::default(),
    )
    .unwrap();
    assert!(!report.has_failures());
    assert_eq!(count(&target, "SELECT COUNT(*) FROM t"), 1);

    // Given B then A: B fails before A exists
    let mut target = SqliteTarget::open_in_memory().unwrap();
    let report = run_migrations(
        &mut target,
        &[insert, create],
        &RunOptions::default(),
    )
    .unwrap();
    assert!(report.outcome_of("insert").unwrap().is_failure());
    assert_eq!(report.outcome_of("create"), Some(&ExecutionOutcome::Skipped));
}

#[test]
fn test_failed_script_is_atomic() {
    // Given: a script whose second statement fails
    let mut target = SqliteTarget::open_in_memory().unwrap();
    let scripts = vec![
        script("001_seed", SEED),
        script(
            "002_partial",
            "UPDATE competitions SET status = 'closed'; INSERT INTO nope VALUES (1);",
        ),
    ];

    // When: the run executes
    let report = run_migrations(&mut target, &scripts, &RunOptions::default()).unwrap();

    // Then: the first statement's update is rolled back and no record exists
    match report.outcome_of("002_partial") {
        Some(ExecutionOutcome::Failed { error }) => {
            assert_eq!(error.kind(), ExErrorKind::SqlExecution);
            assert_eq!(error.migration(), Some("002_partial"));
        }
        other => panic!("expected failure, got {:?}", other),
    }
    assert_eq!(
        count(&target, "SELECT COUNT(*) FROM competitions WHERE status = 'closed'"),
        0
    );
    assert_eq!(applied_names(&mut target), vec!["001_seed"]);
}

#[test]
fn test_stop_on_first_failure_skips_the_rest() {
    let mut target = SqliteTarget::open_in_memory().unwrap();
    let scripts = vec![
        script("001_ok", "CREATE TABLE a (id INTEGER);"),
        script("002_bad", "SELECT * FROM missing;"),
        script("003_ok", "CREATE TABLE c (id INTEGER);"),
        script("004_ok", "CREATE TABLE d (id INTEGER);"),
    ];

    let report = run_migrations(&mut target, &scripts, &RunOptions::default()).unwrap();

    let summary = report.summary();
    assert_eq!(report.results().len(), 4);
    assert_eq!(summary.applied, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.skipped, 2);
    assert_eq!(applied_names(&mut target), vec!["001_ok"]);
}

#[test]
fn test_continue_on_failure_applies_the_rest() {
    let mut target = SqliteTarget::open_in_memory().unwrap();
    let scripts = vec![
        script("001_ok", "CREATE TABLE a (id INTEGER);"),
        script("002_bad", "SELECT * FROM missing;"),
        script("003_ok", "CREATE TABLE c (id INTEGER);"),
    ];
    let options = RunOptions::default().with_policy(FailurePolicy::ContinueOnFailure);

    let report = run_migrations(&mut target, &scripts, &options).unwrap();

    assert_eq!(report.summary().applied, 2);
    assert_eq!(report.summary().failed, 1);
    assert_eq!(applied_names(&mut target), vec!["001_ok", "003_ok"]);
}

#[test]
fn test_failed_script_is_retried_on_next_run() {
    // Given: a run where the second script failed
    let mut target = SqliteTarget::open_in_memory().unwrap();
    let broken = vec![
        script("001_seed", SEED),
        script("002_fix", "UPDATE competitons SET status = 'active';"),
    ];
    run_migrations(&mut target, &broken, &RunOptions::default()).unwrap();

    // When: the fixed script is run under the same name
    let fixed = vec![script("001_seed", SEED), script("002_fix", FIX_STATUS)];
    let report = run_migrations(&mut target, &fixed, &RunOptions::default()).unwrap();

    // Then: only the failed script executes
    assert!(matches!(
        report.outcome_of("001_seed"),
        Some(ExecutionOutcome::AlreadyApplied { .. })
    ));
    assert!(matches!(
        report.outcome_of("002_fix"),
        Some(ExecutionOutcome::Applied { .. })
    ));
}

#[test]
fn test_modified_script_is_flagged_not_rerun() {
    let mut target = SqliteTarget::open_in_memory().unwrap();
    run_migrations(
        &mut target,
        &[script("001_seed", SEED)],
        &RunOptions::default(),
    )
    .unwrap();

    let edited = format!("{}\nINSERT INTO competitions (name) VALUES ('Debate');", SEED);
    let report = run_migrations(
        &mut target,
        &[script("001_seed", &edited)],
        &RunOptions::default(),
    )
    .unwrap();

    assert!(matches!(
        report.outcome_of("001_seed"),
        Some(ExecutionOutcome::AlreadyApplied {
            checksum_changed: true,
            ..
        })
    ));
    assert_eq!(count(&target, "SELECT COUNT(*) FROM competitions"), 3);
}

#[test]
fn test_dry_run_reports_pending_without_writing() {
    // Given: one script already applied
    let mut target = SqliteTarget::open_in_memory().unwrap();
    let scripts = competition_scripts();
    run_migrations(&mut target, &scripts[..1], &RunOptions::default()).unwrap();

    // When: a dry run covers both scripts
    let report = run_migrations(
        &mut target,
        &scripts,
        &RunOptions::default().with_dry_run(true),
    )
    .unwrap();

    // Then: the second is pending and nothing changed
    assert!(matches!(
        report.outcome_of("001_seed"),
        Some(ExecutionOutcome::AlreadyApplied { .. })
    ));
    assert_eq!(
        report.outcome_of("002_fix_competitions_status"),
        Some(&ExecutionOutcome::Pending)
    );
    assert_eq!(applied_names(&mut target), vec!["001_seed"]);
    assert_eq!(
        count(&target, "SELECT COUNT(*) FROM competitions WHERE status = 'Pending'"),
        2
    );
}

#[test]
fn test_dry_run_on_fresh_database_creates_nothing() {
    let mut target = SqliteTarget::open_in_memory().unwrap();

    let report = run_migrations(
        &mut target,
        &competition_scripts(),
        &RunOptions::default().with_dry_run(true),
    )
    .unwrap();

    assert_eq!(report.summary().pending, 2);
    assert!(!target.has_bookkeeping().unwrap());
}

#[test]
fn test_empty_script_list_creates_bookkeeping_only() {
    let mut target = SqliteTarget::open_in_memory().unwrap();

    let report = run_migrations(&mut target, &[], &RunOptions::default()).unwrap();

    assert!(report.results().is_empty());
    assert!(target.has_bookkeeping().unwrap());
}

#[test]
fn test_records_survive_reopen() {
    // Given: a file database migrated by one connection
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.db");
    {
        let mut target = SqliteTarget::open(&path).unwrap();
        run_migrations(&mut target, &competition_scripts(), &RunOptions::default()).unwrap();
    }

    // When: a new connection runs the same scripts
    let mut target = SqliteTarget::open(&path).unwrap();
    let report = run_migrations(&mut target, &competition_scripts(), &RunOptions::default()).unwrap();

    // Then: the records persisted
    assert_eq!(report.summary().already_applied, 2);
}

#[test]
fn test_script_writing_its_own_record_fails() {
    let mut target = SqliteTarget::open_in_memory().unwrap();
    let scripts = vec![script(
        "001_self_record",
        "INSERT INTO migrations_applied (name, applied_at) VALUES ('001_self_record', CURRENT_TIMESTAMP);",
    )];

    let report = run_migrations(&mut target, &scripts, &RunOptions::default()).unwrap();

    // The runner's own record collides on the primary key, so the whole script rolls back
    match report.outcome_of("001_self_record") {
        Some(ExecutionOutcome::Failed { error }) => {
            assert_eq!(error.kind(), ExErrorKind::Bookkeeping);
        }
        other => panic!("expected failure, got {:?}", other),
    }
    assert!(applied_names(&mut target).is_empty());
}

#[test]
fn test_script_ending_the_transaction_is_refused() {
    // Given: a script that commits halfway and then fails
    let mut target = SqliteTarget::open_in_memory().unwrap();
    let scripts = vec![script(
        "001_commits_early",
        "CREATE TABLE early (id INTEGER);\nCOMMIT;\nINSERT INTO missing VALUES (1);",
    )];

    // When: the run executes
    let report = run_migrations(&mut target, &scripts, &RunOptions::default()).unwrap();

    // Then: nothing ran, so the first half did not escape the rollback
    match report.outcome_of("001_commits_early") {
        Some(ExecutionOutcome::Failed { error }) => {
            assert_eq!(error.kind(), ExErrorKind::SqlExecution);
            assert!(error.message().contains("'COMMIT'"));
        }
        other => panic!("expected failure, got {:?}", other),
    }
    assert_eq!(
        count(&target, "SELECT COUNT(*) FROM sqlite_master WHERE name = 'early'"),
        0
    );
    assert!(applied_names(&mut target).is_empty());
}

#[test]
fn test_trigger_body_is_not_transaction_control() {
    let mut target = SqliteTarget::open_in_memory().unwrap();
    let scripts = vec![
        script("001_seed", SEED),
        script(
            "002_status_trigger",
            "CREATE TABLE audit (competition_id INTEGER);
             CREATE TRIGGER audit_status AFTER UPDATE OF status ON competitions
             BEGIN
                 INSERT INTO audit VALUES (new.id);
             END;
             UPDATE competitions SET status = 'active' WHERE status = 'Pending';",
        ),
    ];

    let report = run_migrations(&mut target, &scripts, &RunOptions::default()).unwrap();

    assert_eq!(report.summary().applied, 2);
    assert_eq!(count(&target, "SELECT COUNT(*) FROM audit"), 2);
}
