mod common;

use common::{TestWorkspace, fixture_path, read_csv};
use omics_harmonize::{
    labels::{
        HEALTHY_CONTROL, LabelCascade, LabelEvidence, LabelInputs, LabelRules, SampleResolver,
        SampleSources, StudyLabels, study::finalize_file,
    },
    metadata::SampleRecord,
};
use regex::Regex;

fn fixture_inputs() -> LabelInputs {
    let mut samples = SampleSources::default();
    samples
        .load_series_matrix("GSE5000", &fixture_path("GSE5000_series_matrix.txt"))
        .expect("series matrix loads");
    LabelInputs {
        study_diseases: StudyLabels::load(
            &fixture_path("study_diseases.csv"),
            "Accession",
            "Enriched_Disease",
        )
        .expect("study diseases load"),
        final_labels: StudyLabels::load(
            &fixture_path("final_labels.csv"),
            "Accession",
            "Final_Disease_Label",
        )
        .expect("final labels load"),
        samples,
    }
}

fn resolver() -> SampleResolver {
    SampleResolver::standard(Regex::new(r"GSM\d+").unwrap())
}

#[test]
fn sample_level_text_is_found_by_each_strategy() {
    let rules = LabelRules::default();
    let inputs = fixture_inputs();
    let cascade = LabelCascade::new(&rules, &inputs, resolver());

    let exact = cascade.decide("GSE5000", "OC_patient_1", None);
    assert_eq!(exact.evidence, LabelEvidence::SampleText { strategy: "exact" });
    assert_eq!(exact.refined, "Ovarian Cancer");

    let by_accession = cascade.decide("GSE5000", "GSM7003_lane2", None);
    assert_eq!(
        by_accession.evidence,
        LabelEvidence::SampleText {
            strategy: "accession"
        }
    );
    assert_eq!(by_accession.condition, "Case (Unspecified)");
    assert_eq!(by_accession.refined, "Ovarian Cancer");

    let contained = cascade.decide("GSE5000", "Healthy_donor_2.fastq.gz", None);
    assert_eq!(
        contained.evidence,
        LabelEvidence::SampleText {
            strategy: "containment"
        }
    );
    assert_eq!(contained.refined, HEALTHY_CONTROL);
}

#[test]
fn study_disease_names_case_samples_without_sample_text() {
    let rules = LabelRules::default();
    let inputs = fixture_inputs();
    let cascade = LabelCascade::new(&rules, &inputs, resolver());
    let decision = cascade.decide("PXD0009", "Patient_12", None);
    assert_eq!(decision.condition, "Sepsis");
    assert_eq!(decision.refined, "Sepsis");
    assert_eq!(decision.evidence, LabelEvidence::SampleName);
    assert_eq!(cascade.decide("PXD0009", "HC_4", None).refined, HEALTHY_CONTROL);
}

#[test]
fn refine_with_prior_labels_keeps_specific_conditions() {
    let rules = LabelRules::default();
    let inputs = fixture_inputs();
    let cascade = LabelCascade::new(&rules, &inputs, resolver());
    let mut records = vec![
        SampleRecord::new("PXD0009", "S1", 400),
        SampleRecord::new("PXD0009", "S2", 400),
        SampleRecord::new("PXD0009", "S3", 400),
    ];
    records[0].condition = "Diabetes".into();
    records[1].condition = "Case".into();
    records[2].condition = "Control (age matched)".into();
    let summary = cascade.apply(&mut records, true);
    let refined = records
        .iter()
        .map(|r| r.refined_condition.as_str())
        .collect::<Vec<_>>();
    assert_eq!(refined, vec!["Diabetes", "Sepsis", HEALTHY_CONTROL]);
    assert_eq!(summary.study_substitutions, 1);
    assert_eq!(records[0].label_source, "prior_label/kept");
}

#[test]
fn finalize_labels_prefers_curated_then_text_then_existing() {
    let ws = TestWorkspace::new();
    let out = ws.join("final.csv");
    let labels = finalize_file(
        &fixture_path("study_evidence.csv"),
        &out,
        &LabelRules::default(),
    )
    .unwrap();
    let pairs = labels
        .iter()
        .map(|l| (l.accession.as_str(), l.label.as_str(), l.source.as_str()))
        .collect::<Vec<_>>();
    assert_eq!(
        pairs,
        vec![
            ("PXD0009", "Sepsis", "curated"),
            ("PXD0010", "Liver Cancer", "description"),
            ("GSE5000", "Ovarian Cancer", "title"),
            ("GSE5001", "Unknown", "existing"),
        ]
    );
    let (headers, rows) = read_csv(&out);
    assert_eq!(headers, vec!["Accession", "Final_Disease_Label", "Label_Source"]);
    assert_eq!(rows.len(), 4);
}
