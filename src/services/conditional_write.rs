//! Conditional insert with a declared conflict policy.
//!
//! The reference-data upsert and the snapshot insert-or-skip are the same
//! operation with different conflict resolution, so both go through
//! [`conditional_insert`]. The conflict is resolved by the database
//! (`ON CONFLICT`), never by a read-then-write from here.

use sea_orm::sea_query::OnConflict;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PrimaryKeyTrait};

/// Primary key value type of the entity behind an active model
pub type PrimaryKeyOf<A> =
    <<<A as ActiveModelTrait>::Entity as EntityTrait>::PrimaryKey as PrimaryKeyTrait>::ValueType;

/// What to do when the conflict key already exists
#[derive(Debug, Clone)]
pub enum ConflictPolicy<C> {
    /// Last write wins for the listed columns; everything else is kept
    OverwriteOnConflict { key: Vec<C>, overwrite: Vec<C> },
    /// First write wins; the incoming row is discarded unchanged
    SkipOnConflict { key: Vec<C> },
}

impl<C: ColumnTrait> ConflictPolicy<C> {
    fn on_conflict(self) -> OnConflict {
        match self {
            ConflictPolicy::OverwriteOnConflict { key, overwrite } => {
                OnConflict::columns(key).update_columns(overwrite).to_owned()
            }
            ConflictPolicy::SkipOnConflict { key } => OnConflict::columns(key).do_nothing().to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome<K> {
    /// Row was inserted or overwritten; carries its primary key
    Written(K),
    /// Conflict under `SkipOnConflict`; nothing was written
    Skipped,
}

impl<K> WriteOutcome<K> {
    pub fn is_skipped(&self) -> bool {
        matches!(self, WriteOutcome::Skipped)
    }
}

/// Insert `model`, resolving a key conflict according to `policy`.
pub async fn conditional_insert<A, C>(
    conn: &C,
    model: A,
    policy: ConflictPolicy<<A::Entity as EntityTrait>::Column>,
) -> Result<WriteOutcome<PrimaryKeyOf<A>>, DbErr>
where
    A: ActiveModelTrait + Send,
    C: ConnectionTrait,
{
    let result = <A::Entity as EntityTrait>::insert(model)
        .on_conflict(policy.on_conflict())
        .exec(conn)
        .await;

    match result {
        Ok(inserted) => Ok(WriteOutcome::Written(inserted.last_insert_id)),
        // DO NOTHING swallowed the row
        Err(DbErr::RecordNotInserted) => Ok(WriteOutcome::Skipped),
        Err(e) => Err(e),
    }
}
