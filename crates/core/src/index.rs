use crate::error::PipelineError;
use crate::models::Neighbor;
use std::collections::BTreeMap;

/// Exhaustive nearest-neighbor index over a fixed set of vectors.
///
/// Rows are stacked in ascending document-id order, so results are
/// reproducible for a given vector set. Distances are squared Euclidean
/// over the raw vectors; ties keep row order (the sort is stable). The
/// scan is O(n²·d) when querying the set against itself, which is the
/// intended regime: small per-user document counts, rebuilt per request.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    dimensions: usize,
    ids: Vec<String>,
    rows: Vec<Vec<f32>>,
}

impl FlatIndex {
    /// Builds the index from an id→vector map. An empty map builds an
    /// empty index; mismatched dimensions are an `IndexBuildFailed`.
    pub fn build(vectors: &BTreeMap<String, Vec<f32>>) -> Result<Self, PipelineError> {
        let dimensions = vectors
            .values()
            .next()
            .map(|vector| vector.len())
            .unwrap_or(0);

        let mut ids = Vec::with_capacity(vectors.len());
        let mut rows = Vec::with_capacity(vectors.len());

        for (document_id, vector) in vectors {
            if vector.len() != dimensions {
                return Err(PipelineError::IndexBuildFailed(format!(
                    "vector for {} has dimension {}, expected {}",
                    document_id,
                    vector.len(),
                    dimensions
                )));
            }
            ids.push(document_id.clone());
            rows.push(vector.clone());
        }

        Ok(Self {
            dimensions,
            ids,
            rows,
        })
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Returns the `min(k, len)` rows closest to `query`, ascending by
    /// squared distance.
    pub fn nearest(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, PipelineError> {
        if query.len() != self.dimensions && !self.is_empty() {
            return Err(PipelineError::IndexBuildFailed(format!(
                "query dimension {} does not match index dimension {}",
                query.len(),
                self.dimensions
            )));
        }

        Ok(self.scan(query, k, None))
    }

    /// Queries the stored set against itself: for every document, its
    /// `min(k, len)` nearest documents. With `include_self` the query row
    /// itself appears, typically first at distance 0, matching the flat
    /// self-query behavior this index replaces; without it the row is
    /// dropped before truncating to k.
    pub fn neighbors_all(&self, k: usize, include_self: bool) -> BTreeMap<String, Vec<Neighbor>> {
        let mut result = BTreeMap::new();

        for (row, document_id) in self.ids.iter().enumerate() {
            let skip = if include_self { None } else { Some(row) };
            result.insert(document_id.clone(), self.scan(&self.rows[row], k, skip));
        }

        result
    }

    fn scan(&self, query: &[f32], k: usize, skip_row: Option<usize>) -> Vec<Neighbor> {
        let mut hits: Vec<(usize, f32)> = self
            .rows
            .iter()
            .enumerate()
            .filter(|(row, _)| Some(*row) != skip_row)
            .map(|(row, stored)| (row, squared_distance(query, stored)))
            .collect();

        hits.sort_by(|left, right| left.1.total_cmp(&right.1));
        hits.truncate(k.min(self.len()));

        hits.into_iter()
            .map(|(row, distance)| Neighbor {
                document_id: self.ids[row].clone(),
                distance,
            })
            .collect()
    }
}

fn squared_distance(left: &[f32], right: &[f32]) -> f32 {
    left.iter()
        .zip(right.iter())
        .map(|(a, b)| {
            let diff = a - b;
            diff * diff
        })
        .sum()
}

/// One-shot search over a vector set, self-matches included: the contract
/// the pipeline exposes. An empty map returns an empty mapping, not an
/// error.
pub fn search_similar(
    vectors: &BTreeMap<String, Vec<f32>>,
    k: usize,
) -> Result<BTreeMap<String, Vec<Neighbor>>, PipelineError> {
    if vectors.is_empty() {
        return Ok(BTreeMap::new());
    }

    let index = FlatIndex::build(vectors)?;
    Ok(index.neighbors_all(k, true))
}

#[cfg(test)]
mod tests {
    use super::{search_similar, FlatIndex};
    use crate::embeddings::{embed_batch, HashingSentenceEmbedder};
    use std::collections::BTreeMap;

    fn sample_vectors() -> BTreeMap<String, Vec<f32>> {
        BTreeMap::from([
            ("a".to_string(), vec![0.0, 0.0]),
            ("b".to_string(), vec![1.0, 0.0]),
            ("c".to_string(), vec![10.0, 10.0]),
        ])
    }

    #[test]
    fn empty_set_returns_empty_mapping() {
        let result = search_similar(&BTreeMap::new(), 5).expect("search");
        assert!(result.is_empty());
    }

    #[test]
    fn k_larger_than_count_returns_count_neighbors() {
        let result = search_similar(&sample_vectors(), 10).expect("search");
        for neighbors in result.values() {
            assert_eq!(neighbors.len(), 3);
        }
    }

    #[test]
    fn k_smaller_than_count_returns_k_neighbors() {
        let result = search_similar(&sample_vectors(), 2).expect("search");
        for neighbors in result.values() {
            assert_eq!(neighbors.len(), 2);
        }
    }

    #[test]
    fn singleton_set_returns_itself_at_distance_zero() {
        let vectors = BTreeMap::from([("only".to_string(), vec![3.0, 4.0])]);
        let result = search_similar(&vectors, 5).expect("search");

        let neighbors = &result["only"];
        assert_eq!(neighbors.len(), 1);
        assert_eq!(neighbors[0].document_id, "only");
        assert_eq!(neighbors[0].distance, 0.0);
    }

    #[test]
    fn neighbor_lists_sort_by_non_decreasing_distance() {
        let result = search_similar(&sample_vectors(), 3).expect("search");

        for neighbors in result.values() {
            for pair in neighbors.windows(2) {
                assert!(pair[0].distance <= pair[1].distance);
            }
        }
    }

    #[test]
    fn self_match_leads_each_list_by_default() {
        let result = search_similar(&sample_vectors(), 3).expect("search");

        for (document_id, neighbors) in &result {
            assert_eq!(&neighbors[0].document_id, document_id);
            assert_eq!(neighbors[0].distance, 0.0);
        }
    }

    #[test]
    fn excluding_self_drops_the_query_row() {
        let index = FlatIndex::build(&sample_vectors()).expect("build");
        let result = index.neighbors_all(2, false);

        for (document_id, neighbors) in &result {
            assert_eq!(neighbors.len(), 2);
            assert!(neighbors
                .iter()
                .all(|neighbor| &neighbor.document_id != document_id));
        }
    }

    #[test]
    fn nearest_ranks_an_external_query_against_all_rows() {
        let index = FlatIndex::build(&sample_vectors()).expect("build");
        let hits = index.nearest(&[0.4, 0.0], 2).expect("nearest");

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].document_id, "a");
        assert_eq!(hits[1].document_id, "b");
    }

    #[test]
    fn nearest_rejects_a_query_of_the_wrong_dimension() {
        let index = FlatIndex::build(&sample_vectors()).expect("build");
        assert!(index.nearest(&[0.4], 2).is_err());
    }

    #[test]
    fn mismatched_dimensions_fail_the_build() {
        let vectors = BTreeMap::from([
            ("a".to_string(), vec![0.0, 0.0]),
            ("b".to_string(), vec![1.0]),
        ]);
        assert!(FlatIndex::build(&vectors).is_err());
    }

    #[test]
    fn search_is_deterministic_for_a_fixed_input() {
        let embedder = HashingSentenceEmbedder::default();
        let texts = BTreeMap::from([
            ("a".to_string(), "the cat sat on the mat".to_string()),
            ("b".to_string(), "the dog sat on the rug".to_string()),
            ("c".to_string(), "quantum entanglement theory".to_string()),
        ]);

        let first = search_similar(&embed_batch(&embedder, &texts).vectors, 3).expect("search");
        let second = search_similar(&embed_batch(&embedder, &texts).vectors, 3).expect("search");
        assert_eq!(first, second);
    }

    #[test]
    fn related_texts_are_mutual_nearest_non_self_neighbors() {
        let embedder = HashingSentenceEmbedder::default();
        let texts = BTreeMap::from([
            ("a".to_string(), "cat sat on mat".to_string()),
            ("b".to_string(), "dog sat on rug".to_string()),
            ("c".to_string(), "quantum entanglement theory".to_string()),
        ]);

        let result =
            search_similar(&embed_batch(&embedder, &texts).vectors, 2).expect("search");

        // k=2 with self included: slot 0 is self, slot 1 the closest other.
        assert_eq!(result["a"][1].document_id, "b");
        assert_eq!(result["b"][1].document_id, "a");
        assert_ne!(result["c"][1].distance, 0.0);
        assert!(result["c"][1].distance > result["a"][1].distance);
    }
}
