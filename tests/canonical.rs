use omics_harmonize::{
    assay::AssayMode,
    canonical::{Canonicalizer, SMALL_RNA_PREFIX, canonicalize_small_rna},
    mirbase::SequenceIndex,
};
use proptest::prelude::*;

proptest! {
    #[test]
    fn canonicalization_is_deterministic(raw in "\\PC{0,40}") {
        prop_assert_eq!(canonicalize_small_rna(&raw), canonicalize_small_rna(&raw));
    }

    #[test]
    fn canonical_names_are_fixed_points(suffix in "[0-9]{1,3}(-[35]p)?") {
        let canonical = format!("{SMALL_RNA_PREFIX}{suffix}");
        prop_assert_eq!(canonicalize_small_rna(&canonical), canonical.clone());
        let once = canonicalize_small_rna(&format!("hsa-miR-{suffix}"));
        prop_assert_eq!(canonicalize_small_rna(&once), once.clone());
    }

    #[test]
    fn keys_always_carry_the_prefix(raw in "[A-Za-z0-9|_-]{1,30}") {
        let key = canonicalize_small_rna(&raw);
        prop_assert!(key.starts_with(SMALL_RNA_PREFIX));
        prop_assert_eq!(key.to_lowercase(), key);
    }

    #[test]
    fn colon_identifiers_never_yield_keys(left in "[A-Za-z]{1,8}", right in "[0-9]{1,8}") {
        let raw = format!("{left}:{right}");
        prop_assert_eq!(Canonicalizer::new(AssayMode::SmallRna).key(Some(raw.as_str()), None), None);
        prop_assert_eq!(Canonicalizer::new(AssayMode::Protein).key(Some(raw.as_str()), None), None);
    }
}

#[test]
fn documented_examples() {
    assert_eq!(canonicalize_small_rna("hsa-mir-21-5p"), "hsa-mir-21-5p");
    assert_eq!(canonicalize_small_rna("seq|let-7a|extra"), "hsa-mir-let-7a");
}

#[test]
fn sequence_identifiers_resolve_through_mirbase() {
    let index = SequenceIndex::from_fasta(">hsa-miR-16-5p MIMAT0000069\nUAGCAGCACGUAAAUAUUGGCG\n");
    let plain = Canonicalizer::new(AssayMode::SmallRna);
    let with_index = plain.with_sequences(Some(&index));
    let raw = "TAGCAGCACGTAAATATTGGCG";
    assert_eq!(
        with_index.key(Some(raw), None).as_deref(),
        Some("hsa-mir-16-5p")
    );
    assert_eq!(
        plain.key(Some(raw), None).as_deref(),
        Some("hsa-mir-tagcagcacgtaaatattggcg")
    );
}
