use std::collections::BTreeMap;

use super::model::{Level, MetadataTable};

// ---------------------------------------------------------------------------
// Taxonomy queries over a metadata table
// ---------------------------------------------------------------------------

/// Distinct labels at `level`, in first-seen row order.
pub fn list_types(table: &MetadataTable, level: Level) -> Vec<String> {
    let mut types: Vec<String> = Vec::new();
    for record in table.records() {
        if let Some(label) = record.level(level) {
            if !types.iter().any(|t| t == label) {
                types.push(label.to_string());
            }
        }
    }
    types
}

/// First level, scanning 1 through 4, at which `label` occurs.
///
/// `None` means the label is unknown at every level. A label present at
/// several levels resolves to the coarsest one; see [`ambiguous_labels`].
pub fn type_level(table: &MetadataTable, label: &str) -> Option<Level> {
    Level::ALL.into_iter().find(|&level| {
        table
            .records()
            .iter()
            .any(|record| record.level(level) == Some(label))
    })
}

/// Row indices whose label at `level` equals `label`.
pub fn matching_indices(table: &MetadataTable, level: Level, label: &str) -> Vec<usize> {
    table
        .records()
        .iter()
        .enumerate()
        .filter(|(_, record)| record.level(level) == Some(label))
        .map(|(i, _)| i)
        .collect()
}

/// Labels that occur at more than one level, with the levels they occur at.
pub fn ambiguous_labels(table: &MetadataTable) -> BTreeMap<String, Vec<Level>> {
    let mut seen: BTreeMap<String, Vec<Level>> = BTreeMap::new();
    for level in Level::ALL {
        for label in list_types(table, level) {
            seen.entry(label).or_default().push(level);
        }
    }
    seen.retain(|_, levels| levels.len() > 1);
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::SpectrumRecord;

    fn table() -> MetadataTable {
        let mut grass = SpectrumRecord::new("grass", "pervious", "vegetation");
        grass.level_4 = Some("grass".to_string());
        let mut soil = SpectrumRecord::new("soil", "pervious", "bare");
        soil.level_3 = "simulated".to_string();
        let roof = SpectrumRecord::new("roof", "impervious", "urban");
        let oak = SpectrumRecord::new("oak", "pervious", "vegetation");
        MetadataTable::new(vec![grass, soil, roof, oak])
    }

    #[test]
    fn test_list_types_first_seen_order() {
        let t = table();
        assert_eq!(list_types(&t, Level::One), vec!["pervious", "impervious"]);
        assert_eq!(list_types(&t, Level::Two), vec!["vegetation", "bare", "urban"]);
        assert_eq!(list_types(&t, Level::Four), vec!["grass"]);
    }

    #[test]
    fn test_type_level() {
        let t = table();
        assert_eq!(type_level(&t, "vegetation"), Some(Level::Two));
        assert_eq!(type_level(&t, "impervious"), Some(Level::One));
        assert_eq!(type_level(&t, "simulated"), Some(Level::Three));
        assert_eq!(type_level(&t, "grass"), Some(Level::Four));
        assert_eq!(type_level(&t, "537451794.xyz"), None);
    }

    #[test]
    fn test_matching_indices() {
        let t = table();
        assert_eq!(matching_indices(&t, Level::Two, "vegetation"), vec![0, 3]);
        assert!(matching_indices(&t, Level::Two, "burn").is_empty());
    }

    #[test]
    fn test_ambiguous_labels_first_match_wins() {
        let mut t = table().records().to_vec();
        let mut odd = SpectrumRecord::new("odd", "pervious", "npv");
        odd.level_4 = Some("bare".to_string());
        t.push(odd);
        let t = MetadataTable::new(t);

        let ambiguous = ambiguous_labels(&t);
        assert_eq!(ambiguous.get("bare"), Some(&vec![Level::Two, Level::Four]));
        assert_eq!(type_level(&t, "bare"), Some(Level::Two));
        assert!(ambiguous_labels(&table()).is_empty());
    }
}
