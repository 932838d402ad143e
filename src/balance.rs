use std::collections::BTreeMap;

use itertools::Itertools;

use crate::{labels::HEALTHY_CONTROL, metadata::SampleRecord, table::TextTable};

#[derive(Debug, Clone, PartialEq)]
pub struct StudyBalance {
    pub accession: String,
    pub controls: usize,
    pub total: usize,
}

impl StudyBalance {
    pub fn control_percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.controls as f64 / self.total as f64 * 100.0
        }
    }
}

/// Healthy-control share per study, largest study first.
pub fn control_balance(records: &[SampleRecord]) -> Vec<StudyBalance> {
    let mut by_study: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for record in records {
        let entry = by_study.entry(record.accession.as_str()).or_default();
        entry.1 += 1;
        if record.refined_condition == HEALTHY_CONTROL {
            entry.0 += 1;
        }
    }
    by_study
        .into_iter()
        .map(|(accession, (controls, total))| StudyBalance {
            accession: accession.to_string(),
            controls,
            total,
        })
        .sorted_by(|a, b| b.total.cmp(&a.total).then_with(|| a.accession.cmp(&b.accession)))
        .collect()
}

pub fn balance_table(balance: &[StudyBalance]) -> TextTable {
    let mut table = TextTable::new(["accession", "healthy_control", "total", "control_pct"])
        .right_align(&[1, 2, 3]);
    for study in balance {
        table.push_row(vec![
            study.accession.clone(),
            study.controls.to_string(),
            study.total.to_string(),
            format!("{:.1}", study.control_percent()),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(accession: &str, sample: &str, label: &str) -> SampleRecord {
        let mut r = SampleRecord::new(accession, sample, 1);
        r.refined_condition = label.to_string();
        r
    }

    #[test]
    fn counts_controls_and_sorts_by_size() {
        let records = vec![
            record("A", "1", HEALTHY_CONTROL),
            record("B", "1", "Sepsis"),
            record("B", "2", HEALTHY_CONTROL),
            record("B", "3", "Sepsis"),
            record("B", "4", "Sepsis"),
        ];
        let balance = control_balance(&records);
        assert_eq!(balance[0].accession, "B");
        assert_eq!((balance[0].controls, balance[0].total), (1, 4));
        assert_eq!(balance[0].control_percent(), 25.0);
        assert_eq!(balance[1].control_percent(), 100.0);
        let rendered = balance_table(&balance).render();
        assert!(rendered.contains("25.0"));
    }
}
