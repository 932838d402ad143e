mod common;

use std::fs;

use assert_cmd::Command;
use common::{TestWorkspace, fixture_path, protein_groups, read_csv};
use predicates::str::contains;

fn bin() -> Command {
    Command::cargo_bin("omics-harmonize").expect("binary exists")
}

#[test]
fn harmonize_small_rna_with_sample_text_and_mirbase() {
    let ws = TestWorkspace::new();
    let matrix = ws.join("matrix.csv");
    let metadata = ws.join("metadata.csv");
    let report = ws.join("report.json");
    let study = format!("GSE5000={}", fixture_path("small_rna_counts.csv").display());
    let series = format!(
        "GSE5000={}",
        fixture_path("GSE5000_series_matrix.txt").display()
    );

    bin()
        .args(["harmonize", "--mode", "small-rna", "--study", &study])
        .args(["--series-matrix", &series])
        .arg("--final-labels")
        .arg(fixture_path("final_labels.csv"))
        .arg("--mirbase")
        .arg(fixture_path("mature_subset.fa"))
        .arg("--matrix")
        .arg(&matrix)
        .arg("--metadata")
        .arg(&metadata)
        .arg("--report")
        .arg(&report)
        .assert()
        .success();

    let (headers, rows) = read_csv(&matrix);
    assert_eq!(
        headers,
        vec![
            "feature",
            "GSE5000_OC_patient_1",
            "GSE5000_Healthy_donor_2",
            "GSE5000_GSM7003_lane2"
        ]
    );
    let features = rows.iter().map(|r| r[0].as_str()).collect::<Vec<_>>();
    assert_eq!(features, vec!["hsa-mir-16-5p", "hsa-mir-21-5p"]);

    let (meta_headers, meta_rows) = read_csv(&metadata);
    assert_eq!(
        &meta_headers[..7],
        &[
            "global_id",
            "accession",
            "original_sample_id",
            "condition",
            "refined_condition",
            "features_detected",
            "batch"
        ]
    );
    let refined = meta_rows.iter().map(|r| r[4].as_str()).collect::<Vec<_>>();
    assert_eq!(refined, vec!["Ovarian Cancer", "Healthy Control", "Ovarian Cancer"]);

    let report_text = fs::read_to_string(&report).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&report_text).unwrap();
    assert_eq!(parsed["studies"][0]["normalization"], "counts_per_million_log2");
    assert_eq!(parsed["totals"]["samples"], 3);
}

#[test]
fn harmonize_reports_failed_studies_and_continues() {
    let ws = TestWorkspace::new();
    let good = ws.write("proteinGroups.txt", &protein_groups(&["A", "B"], &[120, 130]));
    let bad = ws.write("broken.txt", "Gene names\tScore\nTP53\t1\n");
    let manifest = ws.write(
        "studies.csv",
        "accession,path\nPXD0001,proteinGroups.txt\nPXD0002,broken.txt\n",
    );
    assert!(good.exists() && bad.exists());
    let report = ws.join("report.json");

    bin()
        .args(["harmonize", "--mode", "protein", "--threads", "2"])
        .arg("--manifest")
        .arg(&manifest)
        .arg("--matrix")
        .arg(ws.join("matrix.tsv"))
        .arg("--metadata")
        .arg(ws.join("metadata.csv"))
        .arg("--report")
        .arg(&report)
        .assert()
        .success();

    let parsed: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&report).unwrap()).unwrap();
    assert_eq!(parsed["totals"]["studies_failed"], 1);
    assert_eq!(parsed["studies"][1]["failure_kind"], "schema_resolution");
    let matrix = fs::read_to_string(ws.join("matrix.tsv")).unwrap();
    assert!(matrix.starts_with("feature\tPXD0001_A\tPXD0001_B"));
}

#[test]
fn harmonize_fails_when_nothing_merges() {
    let ws = TestWorkspace::new();
    let bad = ws.write("broken.txt", "X\tY\n1\t2\n");
    bin()
        .args(["harmonize", "--mode", "small-rna"])
        .arg("--study")
        .arg(format!("GSE1={}", bad.display()))
        .arg("--matrix")
        .arg(ws.join("m.csv"))
        .arg("--metadata")
        .arg(ws.join("meta.csv"))
        .assert()
        .failure()
        .stderr(contains("no study produced a harmonized matrix"));
}

#[test]
fn harmonize_rejects_malformed_study_argument() {
    bin()
        .args([
            "harmonize",
            "--mode",
            "protein",
            "--study",
            "no-equals-sign",
            "--matrix",
            "m.csv",
            "--metadata",
            "meta.csv",
        ])
        .assert()
        .failure()
        .stderr(contains("expected ACCESSION=PATH"));
}

#[test]
fn config_threshold_override_is_honoured() {
    let ws = TestWorkspace::new();
    let table = ws.write("proteinGroups.txt", &protein_groups(&["A", "B"], &[30, 10]));
    let config = ws.write("config.yml", "min_detected_features:\n  protein: 20\n");
    let metadata = ws.join("metadata.csv");
    bin()
        .args(["harmonize", "--mode", "protein"])
        .arg("--study")
        .arg(format!("PXD9={}", table.display()))
        .arg("--config")
        .arg(&config)
        .arg("--matrix")
        .arg(ws.join("m.csv"))
        .arg("--metadata")
        .arg(&metadata)
        .assert()
        .success();
    let (_, rows) = read_csv(&metadata);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][0], "PXD9_A");
    assert_eq!(rows[0][5], "30");
}

#[test]
fn refine_rewrites_labels_in_place() {
    let ws = TestWorkspace::new();
    let metadata = ws.write(
        "metadata.csv",
        "global_id,accession,original_sample_id,condition,refined_condition,features_detected,batch\n\
         PXD0009_S1,PXD0009,S1,Case (Unknown Disease),,400,PXD0009\n\
         PXD0009_HC1,PXD0009,HC1,Healthy Control,,380,PXD0009\n",
    );
    bin()
        .args(["refine", "--input"])
        .arg(&metadata)
        .arg("--final-labels")
        .arg(fixture_path("final_labels.csv"))
        .assert()
        .success();
    let (headers, rows) = read_csv(&metadata);
    assert_eq!(headers.last().map(String::as_str), Some("label_source"));
    assert_eq!(rows[0][4], "Sepsis");
    assert_eq!(rows[1][4], "Healthy Control");
}

#[test]
fn inspect_prints_ranked_candidates() {
    let ws = TestWorkspace::new();
    let table = ws.write("GSE77.csv", "Sample ID,miRNA name,S1,S2\nx,miR-1,1,2\n");
    bin()
        .args(["inspect", "--mode", "small-rna", "--input"])
        .arg(&table)
        .assert()
        .success()
        .stdout(contains("GSE77: 1 row(s), identifier 'Sample ID'"))
        .stdout(contains("low"))
        .stdout(contains("miRNA name"))
        .stdout(contains("2 value column(s)"));
}

#[test]
fn balance_prints_control_share() {
    let ws = TestWorkspace::new();
    let metadata = ws.write(
        "metadata.csv",
        "global_id,accession,original_sample_id,condition,refined_condition,features_detected,batch\n\
         A_1,A,1,x,Healthy Control,1,A\n\
         A_2,A,2,x,Sepsis,1,A\n\
         A_3,A,3,x,Sepsis,1,A\n\
         A_4,A,4,x,Sepsis,1,A\n",
    );
    bin()
        .args(["balance", "--metadata"])
        .arg(&metadata)
        .assert()
        .success()
        .stdout(contains("healthy_control"))
        .stdout(contains("25.0"));
}

#[test]
fn config_prints_default_yaml() {
    bin()
        .arg("config")
        .assert()
        .success()
        .stdout(contains("min_detected_features"))
        .stdout(contains("sample_accession_pattern"))
        .stdout(contains("Alzheimer"));
}

#[test]
fn finalize_labels_writes_table() {
    let ws = TestWorkspace::new();
    let out = ws.join("final.csv");
    bin()
        .args(["finalize-labels", "--input"])
        .arg(fixture_path("study_evidence.csv"))
        .arg("--output")
        .arg(&out)
        .assert()
        .success();
    let (_, rows) = read_csv(&out);
    assert_eq!(rows[1], vec!["PXD0010", "Liver Cancer", "description"]);
}

#[test]
fn failed_metadata_write_leaves_no_matrix_behind() {
    let ws = TestWorkspace::new();
    let study = format!("GSE5000={}", fixture_path("small_rna_counts.csv").display());
    let matrix = ws.join("matrix.csv");
    bin()
        .args(["harmonize", "--mode", "small-rna", "--study", &study])
        .arg("--matrix")
        .arg(&matrix)
        .arg("--metadata")
        .arg(ws.join("missing_dir").join("metadata.csv"))
        .assert()
        .failure()
        .stderr(contains("Writing metadata"));
    assert!(!matrix.exists());
    assert!(!ws.join(".partial.matrix.csv").exists());
}
