use super::repo::DeleteResult;
use anyhow::Result;
use mongodb::{
    bson::{self, doc, oid::ObjectId, Document},
    options::{FindOneAndUpdateOptions, ReturnDocument},
    Collection,
};
use serde::Serialize;

/// Persistence shape of an entity `E`.
///
/// Only the writing direction is shared. Documents are also written by other
/// applications, so every repo reads them back with its own lenient rules.
pub trait MongoDocument<E>: Serialize {
    fn from_domain(entity: &E) -> Self;
}

pub fn get_id_filter(oid: &ObjectId) -> Document {
    doc! {
        "_id": oid.clone()
    }
}

fn entity_to_persistence<E, D: MongoDocument<E>>(entity: &E) -> Result<Document> {
    let raw = D::from_domain(entity);
    Ok(bson::to_document(&raw)?)
}

pub async fn insert<E, D: MongoDocument<E>>(
    collection: &Collection<Document>,
    entity: &E,
) -> Result<()> {
    let doc = entity_to_persistence::<E, D>(entity)?;
    collection.insert_one(doc, None).await?;
    Ok(())
}

pub async fn bulk_insert<E, D: MongoDocument<E>>(
    collection: &Collection<Document>,
    entities: &[E],
) -> Result<()> {
    if entities.is_empty() {
        return Ok(());
    }
    let docs = entities
        .iter()
        .map(|e| entity_to_persistence::<E, D>(e))
        .collect::<Result<Vec<_>>>()?;
    collection.insert_many(docs, None).await?;
    Ok(())
}

/// Returns the matched count
pub async fn update_one(
    collection: &Collection<Document>,
    filter: Document,
    update: Document,
) -> Result<u64> {
    let res = collection.update_one(filter, update, None).await?;
    Ok(res.matched_count)
}

/// Like `update_one`, but returns the `projection` of the updated document
pub async fn update_one_returning(
    collection: &Collection<Document>,
    filter: Document,
    update: Document,
    projection: Document,
) -> Result<Option<Document>> {
    let options = FindOneAndUpdateOptions::builder()
        .return_document(ReturnDocument::After)
        .projection(projection)
        .build();
    let updated = collection
        .find_one_and_update(filter, update, options)
        .await?;
    Ok(updated)
}

pub async fn delete_many_by(
    collection: &Collection<Document>,
    filter: Document,
) -> Result<DeleteResult> {
    let res = collection.delete_many(filter, None).await?;
    Ok(DeleteResult {
        deleted_count: res.deleted_count,
    })
}
