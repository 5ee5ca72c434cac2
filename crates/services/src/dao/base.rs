use bson::{Bson, Document};
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use mongodb::{ClientSession, Collection, Database};
use serde::Serialize;
use serde::de::DeserializeOwned;

#[derive(Debug, thiserror::Error)]
pub enum DaoError {
    #[error("duplicate key: {0}")]
    DuplicateKey(String),
    #[error("validation: {0}")]
    Validation(String),
    #[error("store error: {0}")]
    Mongo(mongodb::error::Error),
    #[error("bson encode error: {0}")]
    BsonSer(#[from] bson::ser::Error),
    #[error("bson decode error: {0}")]
    BsonDe(#[from] bson::de::Error),
}

pub type DaoResult<T> = Result<T, DaoError>;

impl From<mongodb::error::Error> for DaoError {
    fn from(e: mongodb::error::Error) -> Self {
        match duplicate_key_message(&e) {
            Some(msg) => DaoError::DuplicateKey(msg),
            None => DaoError::Mongo(e),
        }
    }
}

fn duplicate_key_message(e: &mongodb::error::Error) -> Option<String> {
    use mongodb::error::{ErrorKind, WriteFailure};
    if let ErrorKind::Write(WriteFailure::WriteError(we)) = &*e.kind {
        if we.code == 11000 {
            return Some(we.message.clone());
        }
    }
    None
}

/// Thin typed wrapper around a collection. Session-taking variants are used
/// by the transaction coordinator; the rest run as standalone operations.
pub struct BaseDao<T: Send + Sync> {
    collection: Collection<T>,
}

impl<T> BaseDao<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + Unpin + 'static,
{
    pub fn new(db: &Database, collection: &str) -> Self {
        Self {
            collection: db.collection::<T>(collection),
        }
    }

    pub fn collection(&self) -> &Collection<T> {
        &self.collection
    }

    pub async fn insert_one(&self, doc: &T) -> DaoResult<Bson> {
        let result = self.collection.insert_one(doc).await?;
        Ok(result.inserted_id)
    }

    pub async fn insert_one_session(
        &self,
        doc: &T,
        session: &mut ClientSession,
    ) -> DaoResult<Bson> {
        let result = self.collection.insert_one(doc).session(session).await?;
        Ok(result.inserted_id)
    }

    pub async fn find_one(&self, filter: Document) -> DaoResult<Option<T>> {
        Ok(self.collection.find_one(filter).await?)
    }

    pub async fn find_one_session(
        &self,
        filter: Document,
        session: &mut ClientSession,
    ) -> DaoResult<Option<T>> {
        Ok(self.collection.find_one(filter).session(session).await?)
    }

    pub async fn find_many(
        &self,
        filter: Document,
        sort: Option<Document>,
    ) -> DaoResult<Vec<T>> {
        let mut find = self.collection.find(filter);
        if let Some(sort) = sort {
            find = find.sort(sort);
        }
        let cursor = find.await?;
        Ok(cursor.try_collect().await?)
    }

    /// Lazy, restartable view of the matching documents.
    pub async fn find_stream(
        &self,
        filter: Document,
        sort: Option<Document>,
    ) -> DaoResult<BoxStream<'static, DaoResult<T>>> {
        let mut find = self.collection.find(filter);
        if let Some(sort) = sort {
            find = find.sort(sort);
        }
        let cursor = find.await?;
        Ok(cursor.map_err(DaoError::from).boxed())
    }

    pub async fn update_one(&self, filter: Document, update: Document) -> DaoResult<bool> {
        let result = self.collection.update_one(filter, update).await?;
        Ok(result.modified_count > 0)
    }

    pub async fn update_one_session(
        &self,
        filter: Document,
        update: Document,
        session: &mut ClientSession,
    ) -> DaoResult<bool> {
        let result = self
            .collection
            .update_one(filter, update)
            .session(session)
            .await?;
        Ok(result.modified_count > 0)
    }

    pub async fn upsert_one_session(
        &self,
        filter: Document,
        update: Document,
        session: &mut ClientSession,
    ) -> DaoResult<()> {
        self.collection
            .update_one(filter, update)
            .upsert(true)
            .session(session)
            .await?;
        Ok(())
    }

    pub async fn delete_one_session(
        &self,
        filter: Document,
        session: &mut ClientSession,
    ) -> DaoResult<bool> {
        let result = self.collection.delete_one(filter).session(session).await?;
        Ok(result.deleted_count > 0)
    }

    pub async fn delete_many(&self, filter: Document) -> DaoResult<u64> {
        let result = self.collection.delete_many(filter).await?;
        Ok(result.deleted_count)
    }

    pub async fn count(&self, filter: Document) -> DaoResult<u64> {
        Ok(self.collection.count_documents(filter).await?)
    }
}
