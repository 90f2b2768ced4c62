//! Brute-force vector index (C4).
//!
//! Pure Rust implementation that mimics `usearch`'s API shape without binding
//! the native HNSW crate. Good enough for the graph sizes this store targets;
//! the `usearch` dependency stays declared (optional, `usearch-hnsw` feature)
//! for stack parity, but the default code path is this linear scan.

use crate::storage::traits::vector::{SimilarityFunction, VectorHit, VectorIndex, VectorQuery};
use crate::{Error, Result};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

/// A single stored vector plus its tags.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct VectorRecord {
    vector: Vec<f32>,
    tags: HashMap<String, String>,
}

/// Brute-force, pure-Rust vector index.
///
/// This is a linear-scan implementation that mimics `usearch` behavior.
/// For production use with millions of vectors, consider integrating
/// the actual `usearch` crate behind the `usearch-hnsw` feature.
pub struct InMemoryVectorIndex {
    index_path: PathBuf,
    dimensions: usize,
    similarity_function: SimilarityFunction,
    vectors: HashMap<String, VectorRecord>,
    dirty: bool,
}

impl InMemoryVectorIndex {
    /// Default embedding dimensions for `all-MiniLM-L6-v2`.
    pub const DEFAULT_DIMENSIONS: usize = 384;

    /// Creates a new file-backed index.
    #[must_use]
    pub fn new(index_path: impl Into<PathBuf>, dimensions: usize, similarity_function: SimilarityFunction) -> Self {
        Self {
            index_path: index_path.into(),
            dimensions,
            similarity_function,
            vectors: HashMap::new(),
            dirty: false,
        }
    }

    /// Creates an in-memory index (no file persistence).
    #[must_use]
    pub fn in_memory(dimensions: usize, similarity_function: SimilarityFunction) -> Self {
        Self {
            index_path: PathBuf::new(),
            dimensions,
            similarity_function,
            vectors: HashMap::new(),
            dirty: false,
        }
    }

    /// Returns the index path.
    #[must_use]
    pub fn index_path(&self) -> &PathBuf {
        &self.index_path
    }

    /// Loads the index from disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if its
    /// dimensions don't match this index.
    pub fn load(&mut self) -> Result<()> {
        if self.index_path.as_os_str().is_empty() || !self.index_path.exists() {
            return Ok(());
        }

        let content = fs::read_to_string(&self.index_path)
            .map_err(|e| Error::BackendUnavailable(format!("load_index: {e}")))?;

        let data: IndexData = serde_json::from_str(&content)
            .map_err(|e| Error::BackendUnavailable(format!("parse_index: {e}")))?;

        if data.dimensions != self.dimensions {
            return Err(Error::InvalidArgument(format!(
                "index dimensions mismatch: expected {}, got {}",
                self.dimensions, data.dimensions
            )));
        }

        self.vectors = data.vectors;
        self.dirty = false;
        Ok(())
    }

    /// Saves the index to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&mut self) -> Result<()> {
        if self.index_path.as_os_str().is_empty() || !self.dirty {
            return Ok(());
        }

        let data = IndexData {
            dimensions: self.dimensions,
            vectors: self.vectors.clone(),
        };

        let content = serde_json::to_string(&data)
            .map_err(|e| Error::BackendUnavailable(format!("serialize_index: {e}")))?;

        if let Some(parent) = self.index_path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::BackendUnavailable(format!("create_index_dir: {e}")))?;
        }

        fs::write(&self.index_path, content).map_err(|e| Error::BackendUnavailable(format!("write_index: {e}")))?;

        self.dirty = false;
        Ok(())
    }

    fn similarity(&self, a: &[f32], b: &[f32]) -> f32 {
        match self.similarity_function {
            SimilarityFunction::Cosine => Self::cosine_similarity(a, b),
            SimilarityFunction::Euclidean => Self::negative_euclidean_distance(a, b),
        }
    }

    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }

        dot_product / (norm_a * norm_b)
    }

    fn negative_euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
        let sum_sq: f32 = a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum();
        -sum_sq.sqrt()
    }

    fn validate_vector(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimensions {
            return Err(Error::InvalidArgument(format!(
                "vector dimension mismatch: expected {}, got {}",
                self.dimensions,
                vector.len()
            )));
        }
        Ok(())
    }

    fn matches_tag_filters(tags: &HashMap<String, String>, filters: &HashMap<String, String>) -> bool {
        filters.iter().all(|(k, v)| tags.get(k) == Some(v))
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
struct IndexData {
    dimensions: usize,
    vectors: HashMap<String, VectorRecord>,
}

impl VectorIndex for InMemoryVectorIndex {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn similarity_function(&self) -> SimilarityFunction {
        self.similarity_function
    }

    fn add_vector(&mut self, key: &str, vector: &[f32], tags: HashMap<String, String>) -> Result<()> {
        self.validate_vector(vector)?;
        self.vectors.insert(
            key.to_string(),
            VectorRecord {
                vector: vector.to_vec(),
                tags,
            },
        );
        self.dirty = true;
        Ok(())
    }

    fn remove_vector(&mut self, key: &str) -> Result<bool> {
        let removed = self.vectors.remove(key).is_some();
        if removed {
            self.dirty = true;
        }
        Ok(removed)
    }

    fn search(&self, query_vector: &[f32], query: &VectorQuery) -> Result<Vec<VectorHit>> {
        self.validate_vector(query_vector)?;

        let mut scored: Vec<(String, f32, HashMap<String, String>)> = self
            .vectors
            .iter()
            .filter(|(_, record)| Self::matches_tag_filters(&record.tags, &query.tag_filters))
            .map(|(key, record)| {
                let score = self.similarity(query_vector, &record.vector);
                (key.clone(), score, record.tags.clone())
            })
            .collect();

        if let Some(min_similarity) = query.min_similarity {
            scored.retain(|(_, score, _)| *score >= min_similarity);
        }

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal).then_with(|| a.0.cmp(&b.0)));

        let limit = if query.limit == 0 { scored.len() } else { query.limit };
        Ok(scored
            .into_iter()
            .take(limit)
            .map(|(key, similarity, tags)| VectorHit { key, similarity, tags })
            .collect())
    }

    fn count(&self) -> Result<usize> {
        Ok(self.vectors.len())
    }

    fn clear(&mut self) -> Result<()> {
        self.vectors.clear();
        self.dirty = true;
        Ok(())
    }
}

impl Drop for InMemoryVectorIndex {
    fn drop(&mut self) {
        let _ = self.save();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn random_embedding(dimensions: usize) -> Vec<f32> {
        (0..dimensions).map(|i| ((i % 10) as f32) / 10.0).collect()
    }

    fn normalized_embedding(dimensions: usize, seed: f32) -> Vec<f32> {
        let raw: Vec<f32> = (0..dimensions).map(|i| (i as f32 + seed).sin()).collect();
        let norm: f32 = raw.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            raw.into_iter().map(|x| x / norm).collect()
        } else {
            raw
        }
    }

    #[test]
    fn test_add_and_count() {
        let mut index = InMemoryVectorIndex::in_memory(384, SimilarityFunction::Cosine);
        index.add_vector("id1", &random_embedding(384), HashMap::new()).unwrap();
        assert_eq!(index.count().unwrap(), 1);
        index.add_vector("id2", &random_embedding(384), HashMap::new()).unwrap();
        assert_eq!(index.count().unwrap(), 2);
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let mut index = InMemoryVectorIndex::in_memory(384, SimilarityFunction::Cosine);
        let result = index.add_vector("test", &random_embedding(256), HashMap::new());
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_remove() {
        let mut index = InMemoryVectorIndex::in_memory(384, SimilarityFunction::Cosine);
        index.add_vector("test", &random_embedding(384), HashMap::new()).unwrap();
        assert!(index.remove_vector("test").unwrap());
        assert_eq!(index.count().unwrap(), 0);
        assert!(!index.remove_vector("test").unwrap());
    }

    #[test]
    fn test_search_ranks_by_similarity() {
        let mut index = InMemoryVectorIndex::in_memory(384, SimilarityFunction::Cosine);
        for i in 0..5 {
            index
                .add_vector(&format!("id{i}"), &normalized_embedding(384, i as f32), HashMap::new())
                .unwrap();
        }

        let query = normalized_embedding(384, 0.0);
        let results = index.search(&query, &VectorQuery { limit: 3, ..Default::default() }).unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].key, "id0");
        assert!(results[0].similarity > 0.99);
    }

    #[test]
    fn test_search_honors_tag_filter() {
        let mut index = InMemoryVectorIndex::in_memory(384, SimilarityFunction::Cosine);
        index
            .add_vector("alice", &normalized_embedding(384, 1.0), HashMap::from([("entityType".to_string(), "person".to_string())]))
            .unwrap();
        index
            .add_vector("acme", &normalized_embedding(384, 1.0), HashMap::from([("entityType".to_string(), "org".to_string())]))
            .unwrap();

        let query = VectorQuery {
            limit: 10,
            tag_filters: HashMap::from([("entityType".to_string(), "person".to_string())]),
            ..Default::default()
        };
        let results = index.search(&normalized_embedding(384, 1.0), &query).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].key, "alice");
    }

    #[test]
    fn test_search_honors_min_similarity() {
        let mut index = InMemoryVectorIndex::in_memory(3, SimilarityFunction::Cosine);
        index.add_vector("same", &[1.0, 0.0, 0.0], HashMap::new()).unwrap();
        index.add_vector("orthogonal", &[0.0, 1.0, 0.0], HashMap::new()).unwrap();

        let query = VectorQuery {
            limit: 10,
            min_similarity: Some(0.5),
            ..Default::default()
        };
        let results = index.search(&[1.0, 0.0, 0.0], &query).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].key, "same");
    }

    #[test]
    fn test_clear() {
        let mut index = InMemoryVectorIndex::in_memory(384, SimilarityFunction::Cosine);
        for i in 0..3 {
            index.add_vector(&format!("id{i}"), &random_embedding(384), HashMap::new()).unwrap();
        }
        index.clear().unwrap();
        assert_eq!(index.count().unwrap(), 0);
    }

    #[test]
    fn test_euclidean_similarity_orders_by_closeness() {
        let mut index = InMemoryVectorIndex::in_memory(2, SimilarityFunction::Euclidean);
        index.add_vector("near", &[1.0, 1.0], HashMap::new()).unwrap();
        index.add_vector("far", &[10.0, 10.0], HashMap::new()).unwrap();

        let results = index.search(&[1.0, 1.0], &VectorQuery { limit: 2, ..Default::default() }).unwrap();
        assert_eq!(results[0].key, "near");
    }

    #[test]
    fn test_persistence_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let index_path = dir.path().join("test.idx");

        {
            let mut index = InMemoryVectorIndex::new(&index_path, 384, SimilarityFunction::Cosine);
            index.add_vector("persistent", &random_embedding(384), HashMap::new()).unwrap();
            index.save().unwrap();
        }

        {
            let mut index = InMemoryVectorIndex::new(&index_path, 384, SimilarityFunction::Cosine);
            index.load().unwrap();
            assert_eq!(index.count().unwrap(), 1);
        }
    }

    #[test]
    fn test_load_dimension_mismatch() {
        let dir = tempfile::TempDir::new().unwrap();
        let index_path = dir.path().join("test.idx");

        {
            let mut index = InMemoryVectorIndex::new(&index_path, 384, SimilarityFunction::Cosine);
            index.add_vector("test", &random_embedding(384), HashMap::new()).unwrap();
            index.save().unwrap();
        }

        {
            let mut index = InMemoryVectorIndex::new(&index_path, 512, SimilarityFunction::Cosine);
            assert!(index.load().is_err());
        }
    }

    #[test]
    fn test_update_existing_overwrites() {
        let mut index = InMemoryVectorIndex::in_memory(384, SimilarityFunction::Cosine);
        index.add_vector("test", &normalized_embedding(384, 1.0), HashMap::new()).unwrap();
        index.add_vector("test", &normalized_embedding(384, 2.0), HashMap::new()).unwrap();
        assert_eq!(index.count().unwrap(), 1);

        let query = normalized_embedding(384, 2.0);
        let results = index.search(&query, &VectorQuery { limit: 1, ..Default::default() }).unwrap();
        assert!(results[0].similarity > 0.99);
    }
}
