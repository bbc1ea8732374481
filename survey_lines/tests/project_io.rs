use assert_fs::prelude::*;
use predicates::prelude::*;
use survey_lines::io::{
    design::read_design_file,
    project::{read_project_json, write_project_json, Project},
    survey::{read_survey_file, ColumnMapping},
};
use survey_lines::MatchOptions;

#[test]
fn project_round_trip_keeps_state() {
    let dir = assert_fs::TempDir::new().unwrap();
    let design = dir.child("plan.txt");
    design
        .write_str("Line X Y\n10A 0 0\n10A 100 0\n11A 0 50\n11A 100 50\n")
        .unwrap();
    let data = dir.child("f1.xyz");
    data.write_str(
        "/ header\nLINE FN DATE TIME X Y Z RALT\n\
         1 101 0 0 5.0 1.0 0 100\n\
         1 102 0 0 6.0 1.0 0 100\n\
         1 103 0 0 7.0 1.0 0 140\n",
    )
    .unwrap();

    let mut project = Project::new("round");
    project
        .add_design_line_file(design.path().to_str().unwrap())
        .unwrap();
    project.add_batch("F1").unwrap();
    project
        .add_data_file("F1", data.path().to_str().unwrap(), &ColumnMapping::flight_log())
        .unwrap();
    project.match_batch("F1", MatchOptions::default()).unwrap();

    let out = dir.child("project.json");
    write_project_json(out.path().to_str().unwrap(), &project).unwrap();
    out.assert(predicate::str::contains("\"FN\": \"000101\""));
    out.assert(predicate::str::contains("\"relatedLines\""));
    out.assert(predicate::str::contains("\"MatchTimes\": 1"));

    let loaded = read_project_json(out.path().to_str().unwrap()).unwrap();
    assert_eq!(loaded.design_lines, project.design_lines);
    assert_eq!(loaded.batches, project.batches);
    assert_eq!(loaded.batches[0].points[2].line_id, "100");
    dir.close().unwrap();
}

#[test]
fn duplicate_design_file_rejected() {
    let dir = assert_fs::TempDir::new().unwrap();
    let design = dir.child("plan.txt");
    design.write_str("Line X Y\n10A 0 0\n10A 1 0\n").unwrap();
    let path = design.path().to_str().unwrap();
    let mut project = Project::new("dup");
    project.add_design_line_file(path).unwrap();
    assert!(project.add_design_line_file(path).is_err());
    assert_eq!(project.design_lines.len(), 1);
    dir.close().unwrap();
}

#[test]
fn malformed_project_is_invalid_data() {
    let dir = assert_fs::TempDir::new().unwrap();
    let bad = dir.child("bad.json");
    bad.write_str("{ not json").unwrap();
    let err = read_project_json(bad.path().to_str().unwrap()).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    dir.close().unwrap();
}

#[test]
fn loaders_read_from_disk() {
    let dir = assert_fs::TempDir::new().unwrap();
    let dat = dir.child("a.dat");
    dat.write_str("skip me\nL1 1 0 0 100\nL1 bad 0 0 100\nL1 3 2 0 100\n")
        .unwrap();
    let pts = read_survey_file(dat.path().to_str().unwrap(), &ColumnMapping::dat().with_skip(1))
        .unwrap();
    assert_eq!(pts.len(), 2);

    let design = dir.child("d.txt");
    design.write_str("hdr\n5B 1 2\n5B 3 4\n").unwrap();
    let file = read_design_file(design.path().to_str().unwrap()).unwrap();
    assert_eq!(file.lines.len(), 1);
    assert!(file.visible);
    assert!(read_design_file(dir.child("missing.txt").path().to_str().unwrap()).is_err());
    dir.close().unwrap();
}
