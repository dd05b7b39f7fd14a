use std::collections::{BTreeMap, HashMap};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    api::{error::ApiError, query::plan, retry::Clock, transport::Transport, StartggClient},
    database::{
        db_structs::{HistoryRow, PlayerNameRow, RatingRow, VideogameRow},
        error::StoreError,
        store::Store
    },
    model::{
        extractor::MatchExtractor,
        rating_engine::RatingEngine,
        rating_tracker::RatingTracker,
        structures::{
            event::EventEntrants,
            ids::{EventId, PlayerId, VideogameId}
        }
    },
    processor::context::RunContext
};

#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("tournament {slug}: {source}")]
    Api {
        slug: String,
        #[source]
        source: ApiError
    },

    #[error("tournament {slug}: {source}")]
    Store {
        slug: String,
        #[source]
        source: StoreError
    }
}

impl ProcessingError {
    pub fn slug(&self) -> &str {
        match self {
            ProcessingError::Api { slug, .. } | ProcessingError::Store { slug, .. } => slug
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessOptions {
    /// Only events of games already in the videogame scope are processed
    pub saved_games: bool,
    /// Compute everything, write nothing
    pub dry_run: bool
}

/// Counts for one processed tournament
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TournamentReport {
    pub slug: String,
    pub events: usize,
    pub skipped_events: usize,
    pub matches: usize,
    pub discarded_sets: usize,
    pub dropped_matches: usize,
    pub players_rated: usize,
    pub new_players: usize,
    pub new_games: usize
}

/// Everything a tournament changes, kept apart from the run until it
/// has been fully processed and persisted.
#[derive(Debug, Default)]
struct Scratch {
    books: HashMap<VideogameId, RatingTracker>,
    new_names: HashMap<PlayerId, String>,
    new_games: BTreeMap<VideogameId, String>,
    history: Vec<HistoryRow>,
    report: TournamentReport
}

pub struct TournamentProcessor<'a, T: Transport, C: Clock, S: Store> {
    client: &'a StartggClient<T, C>,
    store: &'a S,
    engine: RatingEngine,
    options: ProcessOptions
}

impl<'a, T: Transport, C: Clock, S: Store> TournamentProcessor<'a, T, C, S> {
    pub fn new(client: &'a StartggClient<T, C>, store: &'a S, options: ProcessOptions) -> Self {
        TournamentProcessor {
            client,
            store,
            engine: RatingEngine::default(),
            options
        }
    }

    pub fn with_engine(mut self, engine: RatingEngine) -> Self {
        self.engine = engine;
        self
    }

    /// # Tournament processing
    ///
    /// 1. Fetch the tournament's events and keep those with a videogame
    ///    (in saved-games mode, only games already in scope)
    /// 2. Fetch every event's entrants in width-bounded batches
    /// 3. Per event: register entrants, fetch their sets sub-batch by
    ///    sub-batch, then apply the event as one rating period
    /// 4. Persist ratings, names, new videogames and the history trail
    /// 5. Commit the tournament's books, names and seen sets into `ctx`
    ///
    /// Any error before step 5 leaves `ctx` exactly as it was.
    pub async fn process(&self, ctx: &mut RunContext, slug: &str) -> Result<TournamentReport, ProcessingError> {
        ctx.seen.begin();

        let result = match self.build(ctx, slug).await {
            Ok(scratch) => self.persist(ctx, &scratch).await.map(|_| scratch),
            Err(e) => Err(e)
        };

        let scratch = match result {
            Ok(scratch) => scratch,
            Err(e) => {
                ctx.seen.rollback();
                return Err(e);
            }
        };

        ctx.seen.commit();
        for (game_id, name) in &scratch.new_games {
            ctx.scope.observe(*game_id, name);
        }
        ctx.commit(scratch.books.into_values(), scratch.new_names);

        info!(
            "Processed {}: {} events, {} matches, {} players rated",
            slug, scratch.report.events, scratch.report.matches, scratch.report.players_rated
        );

        Ok(scratch.report)
    }

    async fn build(&self, ctx: &mut RunContext, slug: &str) -> Result<Scratch, ProcessingError> {
        let mut scratch = Scratch::default();
        scratch.report.slug = slug.to_string();

        let events = self.client.fetch_tournament_events(slug).await.map_err(api_error(slug))?;

        let wanted: Vec<EventId> = events
            .iter()
            .filter(|e| match e.videogame_id() {
                Some(game_id) => !self.options.saved_games || ctx.scope.contains(game_id),
                None => false
            })
            .map(|e| e.id)
            .collect();
        scratch.report.skipped_events = events.len() - wanted.len();

        if wanted.is_empty() {
            info!("No events to process in {}", slug);
            return Ok(scratch);
        }

        for (event_id, event) in self.client.fetch_event_entrants(&wanted).await.map_err(api_error(slug))? {
            let Some(event) = event else {
                warn!("Event {} in {} returned no data, skipping", event_id, slug);
                scratch.report.skipped_events += 1;
                continue;
            };

            let Some((game_id, game_name)) = event.videogame.clone() else {
                scratch.report.skipped_events += 1;
                continue;
            };

            if !ctx.scope.contains(game_id) {
                if self.options.saved_games {
                    scratch.report.skipped_events += 1;
                    continue;
                }

                scratch.new_games.entry(game_id).or_insert(game_name);
            }

            self.process_event(ctx, &mut scratch, slug, game_id, event).await?;
        }

        scratch.report.new_games = scratch.new_games.len();
        scratch.report.new_players = scratch.new_names.len();

        Ok(scratch)
    }

    async fn process_event(
        &self,
        ctx: &mut RunContext,
        scratch: &mut Scratch,
        slug: &str,
        game_id: VideogameId,
        event: EventEntrants
    ) -> Result<(), ProcessingError> {
        if !scratch.books.contains_key(&game_id) {
            let book = match ctx.book(game_id) {
                Some(book) => book.clone(),
                None => {
                    let players = self.store.load_ratings(game_id).await.map_err(store_error(slug))?;
                    RatingTracker::from_players(game_id, players)
                }
            };
            scratch.books.insert(game_id, book);
        }

        let recorded = self.store.seen_set_ids(&event.slug).await.map_err(store_error(slug))?;
        let revisit = !recorded.is_empty();
        if revisit {
            debug!("{} sets of {} already recorded", recorded.len(), event.slug);
            ctx.seen.extend(recorded);
        }

        let Some(book) = scratch.books.get_mut(&game_id) else {
            return Ok(());
        };

        let mut extractor = if revisit {
            MatchExtractor::revisit(&event.slug, event.occurred_at, &event.entrants, book)
        } else {
            MatchExtractor::new(&event.slug, event.occurred_at, &event.entrants, book)
        };
        let batches = plan(&extractor.entrant_ids(), self.client.config().entrant_batch_width);

        for (i, batch) in batches.iter().enumerate() {
            let listings = self.client.fetch_entrant_sets(batch).await.map_err(api_error(slug))?;
            let added = extractor.ingest(listings, &mut ctx.seen);
            debug!("Batch {}/{} of {}: {} matches", i + 1, batches.len(), event.slug, added);
        }

        let discarded = extractor.discarded();
        let (matches, new_players) = extractor.finish();
        let summary = self.engine.apply_period(book, &matches);

        scratch
            .new_names
            .extend(new_players.into_iter().filter(|(_, name)| !name.is_empty()));
        scratch.history.extend(matches.iter().map(HistoryRow::from));

        let report = &mut scratch.report;
        report.events += 1;
        report.matches += matches.len();
        report.discarded_sets += discarded;
        report.dropped_matches += summary.dropped;
        report.players_rated += summary.changes.len();

        info!(
            "Event {} ({} entrants): {} matches, {} sets discarded",
            event.slug,
            event.entrants.len(),
            matches.len(),
            discarded
        );

        Ok(())
    }

    async fn persist(&self, ctx: &RunContext, scratch: &Scratch) -> Result<(), ProcessingError> {
        let slug = scratch.report.slug.as_str();
        let name_of = |id: PlayerId| scratch.new_names.get(&id).map(String::as_str).or_else(|| ctx.name(id));

        let rating_tables: Vec<Vec<RatingRow>> = scratch
            .books
            .values()
            .map(|book| RatingRow::ranked_rows(book, name_of))
            .collect();
        let names: Vec<PlayerNameRow> = scratch
            .new_names
            .iter()
            .map(|(id, name)| PlayerNameRow {
                player_id: *id,
                name: name.clone()
            })
            .collect();
        let games: Vec<VideogameRow> = scratch
            .new_games
            .iter()
            .map(|(id, name)| VideogameRow {
                id: *id,
                name: name.clone()
            })
            .collect();

        if self.options.dry_run {
            info!(
                "Dry run: would upsert {} ratings over {} games, {} names, {} videogames and {} history rows for {}",
                rating_tables.iter().map(Vec::len).sum::<usize>(),
                rating_tables.len(),
                names.len(),
                games.len(),
                scratch.history.len(),
                slug
            );
            return Ok(());
        }

        for rows in &rating_tables {
            self.store.upsert_ratings(rows).await.map_err(store_error(slug))?;
        }
        if !names.is_empty() {
            self.store.upsert_player_names(&names).await.map_err(store_error(slug))?;
        }
        if !games.is_empty() {
            self.store.upsert_videogames(&games).await.map_err(store_error(slug))?;
        }
        if !scratch.history.is_empty() {
            if let Err(e) = self.store.record_match_history(&scratch.history).await {
                warn!("Failed to record match history for {}: {}", slug, e);
            }
        }

        Ok(())
    }
}

fn api_error(slug: &str) -> impl Fn(ApiError) -> ProcessingError + '_ {
    move |source| ProcessingError::Api {
        slug: slug.to_string(),
        source
    }
}

fn store_error(slug: &str) -> impl Fn(StoreError) -> ProcessingError + '_ {
    move |source| ProcessingError::Store {
        slug: slug.to_string(),
        source
    }
}
