//! Cryptocurrency master data upsert

use chrono::{DateTime, Utc};
use sea_orm::{ConnectionTrait, DbErr, Set};

use crate::entities::cryptocurrencies;
use crate::models::observation::RawObservation;
use crate::services::conditional_write::{conditional_insert, ConflictPolicy};

/// Insert or refresh the master row for `observation.id`.
///
/// On first sighting both timestamps are `now`. Later sightings overwrite
/// symbol, name, image and `updated_at`; `created_at` is left alone and no
/// history of earlier names is kept.
pub async fn upsert_cryptocurrency<C>(
    conn: &C,
    observation: &RawObservation,
    now: DateTime<Utc>,
) -> Result<String, DbErr>
where
    C: ConnectionTrait,
{
    let now = now.fixed_offset();
    let model = cryptocurrencies::ActiveModel {
        crypto_id: Set(observation.id.clone()),
        symbol: Set(observation.symbol.clone()),
        name: Set(observation.name.clone()),
        image_url: Set(observation.image.clone()),
        created_at: Set(now),
        updated_at: Set(now),
    };

    conditional_insert(
        conn,
        model,
        ConflictPolicy::OverwriteOnConflict {
            key: vec![cryptocurrencies::Column::CryptoId],
            overwrite: vec![
                cryptocurrencies::Column::Symbol,
                cryptocurrencies::Column::Name,
                cryptocurrencies::Column::ImageUrl,
                cryptocurrencies::Column::UpdatedAt,
            ],
        },
    )
    .await?;

    tracing::debug!("Upserted cryptocurrency {}", observation.id);

    Ok(observation.id.clone())
}
