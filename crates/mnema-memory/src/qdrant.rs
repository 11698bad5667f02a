//! Qdrant-backed [`VectorStore`] implementation.

use std::collections::HashMap;

use qdrant_client::Qdrant;
use qdrant_client::qdrant::{
    Condition, CountPointsBuilder, CreateCollectionBuilder, DeletePointsBuilder, Distance, Filter,
    PointStruct, ScoredPoint, SearchPointsBuilder, UpsertPointsBuilder, VectorParamsBuilder,
    value::Kind,
};

use crate::vector_store::{BoxFuture, ScoredVectorPoint, VectorPoint, VectorStore, VectorStoreError};

type QdrantResult<T> = Result<T, Box<qdrant_client::QdrantError>>;

/// Thin wrapper over the [`Qdrant`] client encapsulating the collection
/// operations the note index needs.
#[derive(Clone)]
pub struct QdrantStore {
    client: Qdrant,
}

impl std::fmt::Debug for QdrantStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QdrantStore").finish_non_exhaustive()
    }
}

impl QdrantStore {
    /// Create a new `QdrantStore` connected to the given URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the Qdrant client cannot be created.
    pub fn new(url: &str) -> QdrantResult<Self> {
        let client = Qdrant::from_url(url).build().map_err(Box::new)?;
        Ok(Self { client })
    }

    /// Ensure a collection exists with cosine distance vectors.
    ///
    /// Idempotent: no-op if the collection already exists.
    ///
    /// # Errors
    ///
    /// Returns an error if Qdrant cannot be reached or collection creation fails.
    pub async fn ensure_collection(&self, collection: &str, vector_size: u64) -> QdrantResult<()> {
        if self
            .client
            .collection_exists(collection)
            .await
            .map_err(Box::new)?
        {
            return Ok(());
        }
        self.client
            .create_collection(
                CreateCollectionBuilder::new(collection)
                    .vectors_config(VectorParamsBuilder::new(vector_size, Distance::Cosine)),
            )
            .await
            .map_err(Box::new)?;
        Ok(())
    }

    /// Upsert points into a collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the upsert fails.
    pub async fn upsert(&self, collection: &str, points: Vec<PointStruct>) -> QdrantResult<()> {
        self.client
            .upsert_points(UpsertPointsBuilder::new(collection, points))
            .await
            .map_err(Box::new)?;
        Ok(())
    }

    /// Search for similar vectors, returning scored points with payloads.
    ///
    /// # Errors
    ///
    /// Returns an error if the search fails.
    pub async fn search(
        &self,
        collection: &str,
        vector: Vec<f32>,
        limit: u64,
    ) -> QdrantResult<Vec<ScoredPoint>> {
        let builder = SearchPointsBuilder::new(collection, vector, limit).with_payload(true);
        let results = self.client.search_points(builder).await.map_err(Box::new)?;
        Ok(results.result)
    }

    /// Count points whose payload `field` equals `value`.
    ///
    /// # Errors
    ///
    /// Returns an error if the count fails.
    pub async fn count_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> QdrantResult<u64> {
        let filter = Filter::must([Condition::matches(field, value.to_owned())]);
        let response = self
            .client
            .count(
                CountPointsBuilder::new(collection)
                    .filter(filter)
                    .exact(true),
            )
            .await
            .map_err(Box::new)?;
        Ok(response.result.map_or(0, |r| r.count))
    }

    /// Count all points in a collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the count fails.
    pub async fn count_all(&self, collection: &str) -> QdrantResult<u64> {
        let response = self
            .client
            .count(CountPointsBuilder::new(collection).exact(true))
            .await
            .map_err(Box::new)?;
        Ok(response.result.map_or(0, |r| r.count))
    }

    /// Delete every point whose payload `field` equals `value`, returning how
    /// many points matched.
    ///
    /// # Errors
    ///
    /// Returns an error if the count or deletion fails.
    pub async fn delete_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> QdrantResult<u64> {
        let matched = self.count_by_field(collection, field, value).await?;
        if matched == 0 {
            return Ok(0);
        }
        let filter = Filter::must([Condition::matches(field, value.to_owned())]);
        self.client
            .delete_points(DeletePointsBuilder::new(collection).points(filter))
            .await
            .map_err(Box::new)?;
        Ok(matched)
    }
}

impl VectorStore for QdrantStore {
    fn ensure_collection<'a>(
        &'a self,
        collection: &'a str,
        vector_size: u64,
    ) -> BoxFuture<'a, Result<(), VectorStoreError>> {
        Box::pin(async move {
            self.ensure_collection(collection, vector_size)
                .await
                .map_err(|e| VectorStoreError::Collection(e.to_string()))
        })
    }

    fn upsert<'a>(
        &'a self,
        collection: &'a str,
        points: Vec<VectorPoint>,
    ) -> BoxFuture<'a, Result<(), VectorStoreError>> {
        Box::pin(async move {
            let mut qdrant_points = Vec::with_capacity(points.len());
            for p in points {
                // A point with a dropped payload could never be retired by
                // its source path again, so conversion failures are fatal.
                let payload = convert_payload(p.payload)?;
                qdrant_points.push(PointStruct::new(p.id, p.vector, payload));
            }
            self.upsert(collection, qdrant_points)
                .await
                .map_err(|e| VectorStoreError::Upsert(e.to_string()))
        })
    }

    fn search<'a>(
        &'a self,
        collection: &'a str,
        vector: Vec<f32>,
        limit: u64,
    ) -> BoxFuture<'a, Result<Vec<ScoredVectorPoint>, VectorStoreError>> {
        Box::pin(async move {
            let results = self
                .search(collection, vector, limit)
                .await
                .map_err(|e| VectorStoreError::Search(e.to_string()))?;
            Ok(results.into_iter().map(scored_point_to_vector).collect())
        })
    }

    fn delete_by_field<'a>(
        &'a self,
        collection: &'a str,
        field: &'a str,
        value: &'a str,
    ) -> BoxFuture<'a, Result<u64, VectorStoreError>> {
        Box::pin(async move {
            self.delete_by_field(collection, field, value)
                .await
                .map_err(|e| VectorStoreError::Delete(e.to_string()))
        })
    }

    fn count_all<'a>(&'a self, collection: &'a str) -> BoxFuture<'a, Result<u64, VectorStoreError>> {
        Box::pin(async move {
            self.count_all(collection)
                .await
                .map_err(|e| VectorStoreError::Count(e.to_string()))
        })
    }
}

fn convert_payload(
    payload: HashMap<String, serde_json::Value>,
) -> Result<HashMap<String, qdrant_client::qdrant::Value>, VectorStoreError> {
    serde_json::from_value(serde_json::Value::Object(payload.into_iter().collect()))
        .map_err(|e| VectorStoreError::Upsert(format!("payload conversion: {e}")))
}

fn scored_point_to_vector(point: ScoredPoint) -> ScoredVectorPoint {
    let payload: HashMap<String, serde_json::Value> = point
        .payload
        .into_iter()
        .filter_map(|(k, v)| {
            let json_val = match v.kind? {
                Kind::StringValue(s) => serde_json::Value::String(s),
                Kind::IntegerValue(i) => serde_json::Value::Number(i.into()),
                Kind::DoubleValue(d) => {
                    serde_json::Number::from_f64(d).map(serde_json::Value::Number)?
                }
                Kind::BoolValue(b) => serde_json::Value::Bool(b),
                _ => return None,
            };
            Some((k, json_val))
        })
        .collect();

    let id = match point.id.and_then(|pid| pid.point_id_options) {
        Some(qdrant_client::qdrant::point_id::PointIdOptions::Uuid(u)) => u,
        Some(qdrant_client::qdrant::point_id::PointIdOptions::Num(n)) => n.to_string(),
        None => String::new(),
    };

    ScoredVectorPoint {
        id,
        score: point.score,
        payload,
    }
}
