// End-to-end analysis over the fixture dumps: load, dedupe, filter, diff, save

use taskdump::dump::TaskDump;
use taskdump::error::DumpError;
use taskdump::loader::DumpLoader;
use taskdump::predicate::{FunctionTable, Predicate};

fn fixture(name: &str) -> TaskDump {
    let path = format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name);
    DumpLoader::default().load_file(path).unwrap()
}

#[test]
fn test_load_fixture() {
    let dump = fixture("goroutines.txt");
    assert_eq!(dump.ids(), vec![1, 18, 21, 22, 7, 25]);

    let consumer = dump.get(18).unwrap();
    assert_eq!(consumer.state(), "chan receive");
    assert_eq!(consumer.duration_minutes(), 35);
    assert_eq!(consumer.line_count(), 5);
    assert_eq!(consumer.irregular_lines(), 0);
}

#[test]
fn test_summary_counts_states() {
    let summary = fixture("goroutines.txt").summary();
    assert_eq!(summary.total, 6);
    assert_eq!(summary.states["semacquire"], 3);
    assert_eq!(summary.states["IO wait"], 1);
    assert_eq!(
        summary.to_string(),
        "# of tasks: 6\n\n        IO wait: 1\n   chan receive: 1\n        running: 1\n     semacquire: 3\n\n"
    );
}

#[test]
fn test_dedupe_folds_lock_waiters() {
    let mut dump = fixture("goroutines.txt");
    let report = dump.dedupe();

    assert_eq!(report.to_string(), "dedupped 6, kept 4");
    assert_eq!(dump.ids(), vec![1, 18, 21, 7]);
    assert_eq!(dump.get(21).unwrap().duplicate_ids(), &[21, 22, 25]);

    let mut heavy = dump.copy("dups > 1").unwrap();
    assert_eq!(heavy.ids(), vec![21]);
    heavy.dedupe();
    assert_eq!(heavy.get(21).unwrap().duplicate_ids(), &[21, 22, 25]);
}

#[test]
fn test_filter_pipeline() {
    let mut dump = fixture("goroutines.txt");

    let report = dump.delete(r#"state == "running" || state == "IO wait""#).unwrap();
    assert_eq!((report.removed, report.kept), (2, 4));

    let report = dump
        .keep(r#"duration >= 10 && contains(lower(trace), "mutex")"#)
        .unwrap();
    assert_eq!((report.removed, report.kept), (2, 2));
    assert_eq!(dump.ids(), vec![21, 22]);
}

#[test]
fn test_keep_and_delete_partition_identities() {
    let original = fixture("goroutines.txt");
    let cond = r#"trace =~ "queue|netpoll""#;

    let mut kept = original.clone();
    kept.keep(cond).unwrap();
    let mut deleted = original.clone();
    deleted.delete(cond).unwrap();

    let mut union: Vec<u64> = kept.ids().into_iter().chain(deleted.ids()).collect();
    union.sort_unstable();
    let mut expected = original.ids();
    expected.sort_unstable();
    assert_eq!(union, expected);
    assert_eq!(kept.ids(), vec![18, 7]);
}

#[test]
fn test_arity_error_leaves_dump_unchanged() {
    let mut dump = fixture("goroutines.txt");
    let err = dump.delete(r#"contains(trace)"#).unwrap_err();
    assert!(matches!(err, DumpError::Arity { .. }));
    assert_eq!(dump.len(), 6);
}

#[test]
fn test_compiled_predicate_reuse() {
    let dump = fixture("goroutines.txt");
    let predicate = Predicate::compile("lines > 5", &FunctionTable::builtin()).unwrap();
    let verdicts = dump.evaluate(&predicate).unwrap();
    assert_eq!(verdicts, vec![false, false, true, true, false, true]);
}

#[test]
fn test_diff_between_dumps() {
    let first = fixture("goroutines.txt");
    let later = fixture("goroutines_later.txt");

    let diff = first.diff(&later);
    assert_eq!(diff.left_only.ids(), vec![7, 18, 22, 25]);
    assert_eq!(diff.common.ids(), vec![1, 21]);
    assert_eq!(diff.right_only.ids(), vec![40]);

    // common keeps the later observation of each task
    assert_eq!(diff.common.get(21).unwrap().duration_minutes(), 27);

    // diff outputs are ordinary dumps
    let mut stuck = diff.common.clone();
    stuck.keep("duration > 20").unwrap();
    assert_eq!(stuck.ids(), vec![21]);
}

#[test]
fn test_save_deduped_dump() {
    let mut dump = fixture("goroutines.txt");
    dump.dedupe();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("deduped.txt");
    dump.save(&path).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();

    assert!(text.contains("goroutine ~ [semacquire, ~ minutes]: 3 times: [21 22 25]\n"));
    assert!(text.contains("main.(*Cache).Get(...)\n"));
    assert!(text.contains("goroutine 18 [chan receive, 35 minutes]:\nmain.(*Queue).consume(0xc0000a6000)\n"));

    // a saved dump without groups loads back identically
    let plain = fixture("goroutines.txt");
    let path = dir.path().join("plain.txt");
    plain.save(&path).unwrap();
    let reloaded = DumpLoader::default().load_file(&path).unwrap();
    assert_eq!(reloaded.ids(), plain.ids());
    let fingerprints = |d: &TaskDump| {
        d.iter()
            .map(|t| t.fingerprint().unwrap().to_string())
            .collect::<Vec<_>>()
    };
    assert_eq!(fingerprints(&reloaded), fingerprints(&plain));
}
