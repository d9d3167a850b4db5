//! Flow (Sankey) diagram data from summed triplet counts

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::context::TripletPair;

/// Node colors by leading base, in `A, T, C, G` order
pub const PALETTE: [(u8, &str); 4] = [(b'A', "blue"), (b'T', "yellow"), (b'C', "green"), (b'G', "red")];

/// Color for triplets that start with anything else, e.g. `N`
pub const OTHER_COLOR: &str = "gray";

/// Link and node arrays for a bipartite flow from reference to read triplets.
///
/// Source nodes occupy `0..n_sources` of `labels`/`colors`, target nodes the
/// rest; `targets` already carries that offset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowDiagramData {
    #[serde(rename = "sources")]
    pub source_indices: Vec<usize>,
    #[serde(rename = "targets")]
    pub target_indices: Vec<usize>,
    pub values: Vec<u64>,
    pub labels: Vec<String>,
    pub colors: Vec<String>,
}

pub fn triplet_color(triplet: &str) -> &'static str {
    let first = triplet.bytes().next().map(|b| b.to_ascii_uppercase());
    PALETTE
        .iter()
        .find(|(base, _)| Some(*base) == first)
        .map(|(_, color)| *color)
        .unwrap_or(OTHER_COLOR)
}

/// Assigns dense indices in first-seen order
#[derive(Default)]
struct NodeIndex {
    labels: Vec<String>,
    colors: Vec<String>,
    index: HashMap<String, usize>,
}

impl NodeIndex {
    fn get_or_insert(&mut self, label: &str) -> usize {
        if let Some(&i) = self.index.get(label) {
            return i;
        }
        let i = self.labels.len();
        self.labels.push(label.to_string());
        self.colors.push(triplet_color(label).to_string());
        self.index.insert(label.to_string(), i);
        i
    }
}

/// Build diagram arrays from the fully reduced counts.
///
/// Entries are sorted by (reference, query) so the output is independent of
/// the order in which the reduction produced them.
pub fn format_flow<I>(counts: I) -> FlowDiagramData
where
    I: IntoIterator<Item = (TripletPair, u64)>,
{
    let mut entries: Vec<(TripletPair, u64)> = counts.into_iter().collect();
    entries.sort_unstable_by(|a, b| a.0.cmp(&b.0));

    let mut sources = NodeIndex::default();
    let mut targets = NodeIndex::default();
    let mut data = FlowDiagramData::default();

    for (pair, value) in &entries {
        data.source_indices.push(sources.get_or_insert(&pair.reference));
        data.target_indices.push(targets.get_or_insert(&pair.query));
        data.values.push(*value);
    }

    let offset = sources.labels.len();
    for target in data.target_indices.iter_mut() {
        *target += offset;
    }

    data.labels = sources.labels;
    data.labels.extend(targets.labels);
    data.colors = sources.colors;
    data.colors.extend(targets.colors);
    data
}
