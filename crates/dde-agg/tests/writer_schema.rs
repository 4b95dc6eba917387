use dde_agg::{Cell, Fields, MultiTableWriter, OutputTable, RunBatch, TableKind};
use dde_core::DdeError;

fn row(pairs: &[(&str, Cell)]) -> Fields {
    pairs
        .iter()
        .map(|(name, cell)| (name.to_string(), cell.clone()))
        .collect()
}

#[test]
fn identical_schemas_accumulate_rows() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let path = dir.path().join("table.csv");
    let mut table = OutputTable::create("table.csv", &path).expect("create");

    let first = vec![
        row(&[("b", Cell::Int(1)), ("a", Cell::from("x"))]),
        row(&[("a", Cell::from("y")), ("b", Cell::Int(2))]),
    ];
    let second = vec![row(&[("b", Cell::Float(0.5)), ("a", Cell::Missing)])];
    assert_eq!(table.append(&first).expect("first batch"), 2);
    assert_eq!(table.append(&second).expect("second batch"), 1);
    assert_eq!(table.rows_written(), 3);
    assert_eq!(table.schema().expect("locked"), ["a", "b"]);

    let text = std::fs::read_to_string(&path).expect("read table");
    assert_eq!(text, "a,b\nx,1\ny,2\nNONE,0.5\n");
}

#[test]
fn differing_schema_is_rejected_without_writing() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let path = dir.path().join("table.csv");
    let mut table = OutputTable::create("table.csv", &path).expect("create");
    table
        .append(&[row(&[("a", Cell::Int(1))])])
        .expect("first batch");

    let err = table
        .append(&[row(&[("a", Cell::Int(2)), ("c", Cell::Int(3))])])
        .expect_err("schema drift");
    assert!(matches!(err, DdeError::SchemaMismatch(_)));
    assert_eq!(err.info().context["expected"], "a");
    assert_eq!(err.info().context["found"], "a,c");
    assert_eq!(std::fs::read_to_string(&path).expect("read"), "a\n1\n");
}

#[test]
fn delimiters_inside_values_are_quoted() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let path = dir.path().join("quoted.csv");
    let mut table = OutputTable::create("quoted.csv", &path).expect("create");
    table
        .append(&[row(&[("scores", Cell::from("[1,2]")), ("seed", Cell::Int(4))])])
        .expect("append");
    assert_eq!(
        std::fs::read_to_string(&path).expect("read"),
        "scores,seed\n\"[1,2]\",4\n"
    );
}

#[test]
fn creating_a_table_truncates_previous_output() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let path = dir.path().join("stale.csv");
    std::fs::write(&path, "old,content\n1,2\n").expect("seed stale file");
    let table = OutputTable::create("stale.csv", &path).expect("create");
    assert!(table.schema().is_none());
    assert_eq!(std::fs::read_to_string(&path).expect("read"), "");
}

#[test]
fn multi_table_run_is_all_or_nothing() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let mut writer = MultiTableWriter::create(dir.path()).expect("writer");

    let mut first = RunBatch::new();
    first.push(TableKind::Summary, vec![row(&[("SEED", Cell::Int(1))])]);
    first.push(TableKind::Pairwise, vec![row(&[("pop_a", Cell::Int(0))])]);
    writer.append_run(&first).expect("first run");

    let mut second = RunBatch::new();
    second.push(TableKind::Summary, vec![row(&[("SEED", Cell::Int(2))])]);
    second.push(TableKind::Pairwise, vec![row(&[("pop_b", Cell::Int(1))])]);
    let err = writer.append_run(&second).expect_err("pairwise drift");
    assert!(matches!(err, DdeError::SchemaMismatch(_)));

    let summary = writer.table(TableKind::Summary).expect("summary table");
    assert_eq!(summary.rows_written(), 1);
    let text = std::fs::read_to_string(dir.path().join("experiment_summary.csv")).expect("read");
    assert_eq!(text, "SEED\n1\n");
    let names: Vec<String> = writer.summaries().into_iter().map(|t| t.name).collect();
    assert_eq!(names.len(), 5);
}
