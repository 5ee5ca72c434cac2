use mongodb::{Database, IndexModel, options::IndexOptions};
use tracing::info;

pub async fn ensure_indexes(db: &Database) -> Result<(), mongodb::error::Error> {
    // Rooms (the code itself is `_id`, so no extra unique index needed)
    create_indexes(
        db,
        "rooms",
        vec![
            index(bson::doc! { "visibility": 1, "created_at": -1 }),
            index(bson::doc! { "temporary": 1, "expires_at": 1 }),
            index(bson::doc! { "creator_id": 1 }),
        ],
    )
    .await?;

    // Memberships: one record per (room, user)
    create_indexes(
        db,
        "memberships",
        vec![
            index_unique(bson::doc! { "room_id": 1, "uid": 1 }),
            index(bson::doc! { "uid": 1 }),
            index(bson::doc! { "room_id": 1, "joined_at": 1 }),
        ],
    )
    .await?;

    // Messages
    create_indexes(
        db,
        "room_messages",
        vec![index(bson::doc! { "room_id": 1, "created_at": 1 })],
    )
    .await?;

    info!("All indexes ensured");
    Ok(())
}

fn index(keys: bson::Document) -> IndexModel {
    IndexModel::builder().keys(keys).build()
}

fn index_unique(keys: bson::Document) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(IndexOptions::builder().unique(true).build())
        .build()
}

async fn create_indexes(
    db: &Database,
    collection: &str,
    indexes: Vec<IndexModel>,
) -> Result<(), mongodb::error::Error> {
    let coll = db.collection::<bson::Document>(collection);
    match coll.create_indexes(indexes.clone()).await {
        Ok(_) => {
            info!(collection, "Indexes created");
            Ok(())
        }
        Err(e) => {
            // IndexKeySpecsConflict (code 86): an existing index has the same
            // name but different options. Drop and recreate.
            if let mongodb::error::ErrorKind::Command(ref cmd_err) = *e.kind {
                if cmd_err.code == 86 {
                    tracing::warn!(collection, "Index conflict detected, recreating");
                    coll.drop_indexes().await?;
                    coll.create_indexes(indexes).await?;
                    return Ok(());
                }
            }
            Err(e)
        }
    }
}
