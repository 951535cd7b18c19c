use crate::types::CitationRecord;
use std::collections::BTreeMap;

/// Separator placed between passages merged into one file group
pub const PASSAGE_DELIMITER: &str = "\n---\n";

/// Group citation records by file identifier.
///
/// The first record seen for a file seeds its group; later records for the same file only
/// contribute their `text`. Output is ordered by file identifier ascending, not by input order.
pub fn consolidate(records: &[CitationRecord]) -> Vec<CitationRecord> {
    let mut grouped: BTreeMap<&str, CitationRecord> = BTreeMap::new();
    for record in records {
        match grouped.get_mut(record.file.as_str()) {
            Some(group) => {
                group.text.push_str(PASSAGE_DELIMITER);
                group.text.push_str(&record.text);
            }
            None => {
                grouped.insert(record.file.as_str(), record.clone());
            }
        }
    }
    grouped.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn empty_input_gives_empty_output() {
        assert!(consolidate(&[]).is_empty());
    }

    #[test]
    fn merges_by_file_and_sorts() {
        let input = vec![
            CitationRecord::new("b.txt", "B1"),
            CitationRecord::new("a.txt", "A1"),
            CitationRecord::new("b.txt", "B2"),
        ];
        assert_eq!(
            consolidate(&input),
            vec![
                CitationRecord::new("a.txt", "A1"),
                CitationRecord::new("b.txt", "B1\n---\nB2"),
            ]
        );
    }

    #[test]
    fn first_record_keeps_its_metadata() {
        let input = vec![
            CitationRecord::new("doc.pdf", "one").title("First").page(2),
            CitationRecord::new("doc.pdf", "two").title("Second").page(9),
        ];
        let out = consolidate(&input);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].title, "First");
        assert_eq!(out[0].page, 2);
        assert_eq!(out[0].text, "one\n---\ntwo");
    }

    fn record_strategy() -> impl Strategy<Value = CitationRecord> {
        ("[a-d]\\.txt", "[a-z ]{0,12}").prop_map(|(file, text)| CitationRecord::new(file, text))
    }

    proptest! {
        #[test]
        fn proptest_output_is_sorted_and_unique(records in prop::collection::vec(record_strategy(), 0..24)) {
            let out = consolidate(&records);
            for pair in out.windows(2) {
                prop_assert!(pair[0].file < pair[1].file);
            }
        }

        #[test]
        fn proptest_consolidation_is_idempotent(records in prop::collection::vec(record_strategy(), 0..24)) {
            let once = consolidate(&records);
            prop_assert_eq!(consolidate(&once), once);
        }

        #[test]
        fn proptest_group_text_keeps_input_order(records in prop::collection::vec(record_strategy(), 0..24)) {
            for group in consolidate(&records) {
                let expected: Vec<&str> = records
                    .iter()
                    .filter(|r| r.file == group.file)
                    .map(|r| r.text.as_str())
                    .collect();
                prop_assert_eq!(group.text, expected.join(PASSAGE_DELIMITER));
            }
        }
    }
}
