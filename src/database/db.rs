use std::{collections::HashMap, sync::Arc};

use postgres_types::ToSql;
use tokio_postgres::{Client, NoTls, Row};
use tracing::{debug, error, info, info_span, Instrument, Span};
use tracing_indicatif::span_ext::IndicatifSpanExt;

use crate::{
    database::{
        db_structs::{HistoryRow, PlayerNameRow, RatingRow, VideogameRow},
        error::StoreError,
        store::Store
    },
    model::structures::{
        ids::{PlayerId, SetId, VideogameId},
        player::Player,
        videogame_scope::VideogameScope
    },
    utils::progress_utils::track_span
};

const SCHEMA: &str = include_str!("schema.sql");

#[derive(Clone)]
pub struct DbClient {
    client: Arc<Client>
}

impl DbClient {
    // Connect to the database and return a DbClient instance
    pub async fn connect(connection_str: &str) -> Result<Self, StoreError> {
        let (client, connection) = tokio_postgres::connect(connection_str, NoTls).await?;

        // Spawn the connection object to run in the background
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!("connection error: {}", e);
            }
        });

        Ok(DbClient {
            client: Arc::new(client)
        })
    }

    /// Creates any missing tables.
    pub async fn apply_schema(&self) -> Result<(), StoreError> {
        self.client.batch_execute(SCHEMA).await?;
        info!("Schema applied");
        Ok(())
    }

    fn player_from_row(row: &Row) -> Player {
        Player {
            id: PlayerId(row.get("player_id")),
            rating: row.get("rating"),
            deviation: row.get("rd"),
            volatility: row.get("vol"),
            appearances: row.get::<_, i32>("appearances").max(0) as u32
        }
    }
}

impl Store for DbClient {
    async fn load_ratings(&self, game_id: VideogameId) -> Result<Vec<Player>, StoreError> {
        let rows = self
            .client
            .query(
                "SELECT player_id, rating, rd, vol, appearances FROM ranking \
                WHERE game_id = $1 ORDER BY ranking, player_id",
                &[&game_id.0]
            )
            .await?;

        debug!("Loaded {} ratings for game {}", rows.len(), game_id);
        Ok(rows.iter().map(Self::player_from_row).collect())
    }

    async fn load_names(&self) -> Result<HashMap<PlayerId, String>, StoreError> {
        let rows = self.client.query("SELECT player_id, name FROM player_table", &[]).await?;

        Ok(rows
            .iter()
            .map(|row| (PlayerId(row.get("player_id")), row.get("name")))
            .collect())
    }

    async fn load_videogames(&self) -> Result<VideogameScope, StoreError> {
        let rows = self.client.query("SELECT id, name FROM videogame_mapping", &[]).await?;

        Ok(VideogameScope::new(
            rows.iter()
                .map(|row| (VideogameId(row.get("id")), row.get("name")))
                .collect()
        ))
    }

    async fn upsert_ratings(&self, rows: &[RatingRow]) -> Result<(), StoreError> {
        let statement = self
            .client
            .prepare(
                "INSERT INTO ranking (player_id, game_id, name, rating, rd, vol, ranking, appearances) \
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
                ON CONFLICT (player_id, game_id) DO UPDATE SET \
                name = EXCLUDED.name, rating = EXCLUDED.rating, rd = EXCLUDED.rd, vol = EXCLUDED.vol, \
                ranking = EXCLUDED.ranking, appearances = EXCLUDED.appearances"
            )
            .await?;

        let span = info_span!("upsert_ratings", rows = rows.len());
        track_span(&span, rows.len() as u64, "Saving ratings");

        async {
            for row in rows {
                let rank = row.rank as i32;
                let appearances = row.appearances as i32;
                let values: &[&(dyn ToSql + Sync)] = &[
                    &row.player_id.0,
                    &row.game_id.0,
                    &row.name,
                    &row.rating,
                    &row.deviation,
                    &row.volatility,
                    &rank,
                    &appearances
                ];

                self.client.execute(&statement, values).await?;
                Span::current().pb_inc(1);
            }

            Ok::<(), StoreError>(())
        }
        .instrument(span)
        .await
    }

    async fn upsert_player_names(&self, rows: &[PlayerNameRow]) -> Result<(), StoreError> {
        let statement = self
            .client
            .prepare(
                "INSERT INTO player_table (player_id, name) VALUES ($1, $2) \
                ON CONFLICT (player_id) DO UPDATE SET name = EXCLUDED.name"
            )
            .await?;

        for row in rows {
            self.client.execute(&statement, &[&row.player_id.0, &row.name]).await?;
        }

        Ok(())
    }

    async fn upsert_videogames(&self, rows: &[VideogameRow]) -> Result<(), StoreError> {
        let statement = self
            .client
            .prepare(
                "INSERT INTO videogame_mapping (id, name) VALUES ($1, $2) \
                ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name"
            )
            .await?;

        for row in rows {
            self.client.execute(&statement, &[&row.id.0, &row.name]).await?;
        }

        Ok(())
    }

    async fn get_watermark(&self, key: &str) -> Result<Option<i64>, StoreError> {
        let row = self
            .client
            .query_opt("SELECT timestamp FROM last_updated WHERE last_updated = $1", &[&key])
            .await?;

        Ok(row.map(|r| r.get("timestamp")))
    }

    async fn set_watermark(&self, key: &str, timestamp: i64) -> Result<(), StoreError> {
        self.client
            .execute(
                "INSERT INTO last_updated (last_updated, timestamp) VALUES ($1, $2) \
                ON CONFLICT (last_updated) DO UPDATE SET timestamp = EXCLUDED.timestamp",
                &[&key, &timestamp]
            )
            .await?;

        info!("Watermark {} set to {}", key, timestamp);
        Ok(())
    }

    async fn record_match_history(&self, rows: &[HistoryRow]) -> Result<(), StoreError> {
        let statement = self
            .client
            .prepare(
                "INSERT INTO history (set_id, event_slug, winner_id, loser_id, played_at) \
                VALUES ($1, $2, $3, $4, $5)"
            )
            .await?;

        for row in rows {
            let values: &[&(dyn ToSql + Sync)] = &[
                &row.set_id.0,
                &row.event_slug,
                &row.winner_id.0,
                &row.loser_id.0,
                &row.occurred_at
            ];

            self.client.execute(&statement, values).await?;
        }

        Ok(())
    }

    async fn seen_set_ids(&self, event_slug: &str) -> Result<Vec<SetId>, StoreError> {
        let rows = self
            .client
            .query(
                "SELECT DISTINCT set_id FROM history WHERE event_slug = $1 AND set_id IS NOT NULL",
                &[&event_slug]
            )
            .await?;

        Ok(rows.iter().map(|row| SetId(row.get("set_id"))).collect())
    }
}
