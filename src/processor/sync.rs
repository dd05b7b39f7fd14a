use thiserror::Error;
use tracing::{error, info, info_span, warn, Instrument, Span};
use tracing_indicatif::span_ext::IndicatifSpanExt;
use uuid::Uuid;

use crate::{
    api::{error::ApiError, query::TournamentFilter, retry::Clock, transport::Transport, StartggClient},
    database::{error::StoreError, store::Store},
    model::{
        rating_engine::RatingEngine,
        structures::{sort_field::SortField, tournament::TournamentSummary, watermark::WatermarkTracker}
    },
    processor::{
        context::RunContext,
        tournament::{ProcessOptions, ProcessingError, TournamentProcessor, TournamentReport}
    },
    utils::progress_utils::track_span
};

pub const DEFAULT_WATERMARK_KEY: &str = "tournaments_endAt";

/// What to do when a tournament fails during a bulk run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop the run at the first failure
    #[default]
    Abort,
    /// Log and skip failures; the run stops once `max_failures` is reached
    Continue { max_failures: usize }
}

#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub country: Option<String>,
    pub state: Option<String>,
    /// Lower bound on tournament dates; the stored watermark when `None`
    pub after: Option<i64>,
    pub before: Option<i64>,
    pub per_page: u32,
    pub sort: SortField,
    /// Fetch every page first, then process in ascending `sort` order
    pub sort_ascending: bool,
    pub watermark_key: String,
    pub failure_policy: FailurePolicy,
    pub saved_games: bool,
    pub dry_run: bool
}

impl Default for SyncOptions {
    fn default() -> Self {
        SyncOptions {
            country: None,
            state: None,
            after: None,
            before: None,
            per_page: 50,
            sort: SortField::default(),
            sort_ascending: false,
            watermark_key: DEFAULT_WATERMARK_KEY.to_string(),
            failure_policy: FailurePolicy::default(),
            saved_games: true,
            dry_run: false
        }
    }
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Tournament(#[from] ProcessingError),

    #[error("tournament search failed: {0}")]
    Search(#[source] ApiError),

    #[error("{failures} tournaments failed (maximum {max}); last failure: {last}")]
    TooManyFailures {
        failures: usize,
        max: usize,
        last: ProcessingError
    },

    #[error(transparent)]
    Store(#[from] StoreError)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub run_id: Uuid,
    pub pages: u32,
    pub tournaments_found: usize,
    pub processed: Vec<TournamentReport>,
    /// Slugs of tournaments skipped after a failure
    pub failed: Vec<String>,
    pub watermark_before: Option<i64>,
    pub watermark_after: Option<i64>,
    pub dry_run: bool
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SyncState {
    FetchingPage(u32),
    Done
}

struct RunState {
    tracker: WatermarkTracker,
    report: SyncReport
}

pub struct SyncController<'a, T: Transport, C: Clock, S: Store> {
    client: &'a StartggClient<T, C>,
    store: &'a S,
    options: SyncOptions,
    engine: RatingEngine
}

impl<'a, T: Transport, C: Clock, S: Store> SyncController<'a, T, C, S> {
    pub fn new(client: &'a StartggClient<T, C>, store: &'a S, options: SyncOptions) -> Self {
        SyncController {
            client,
            store,
            options,
            engine: RatingEngine::default()
        }
    }

    pub fn with_engine(mut self, engine: RatingEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// # Incremental sync
    ///
    /// 1. Load the videogame scope, known player names and the stored
    ///    watermark
    /// 2. Page through tournament search from the watermark (or `after`),
    ///    filtered by region and by the scope's videogames
    /// 3. Process every tournament with a slug, one at a time
    /// 4. Once every page is done, persist the watermark as the latest
    ///    `endAt` among tournaments that processed successfully
    ///
    /// An aborted run never writes the watermark.
    pub async fn run(&self) -> Result<SyncReport, SyncError> {
        let scope = self.store.load_videogames().await?;
        let names = self.store.load_names().await?;
        let stored = self.store.get_watermark(&self.options.watermark_key).await?;

        let mut ctx = RunContext::new(names, scope);
        let span = info_span!("sync", run_id = %ctx.run_id);

        self.run_with(&mut ctx, stored).instrument(span).await
    }

    async fn run_with(&self, ctx: &mut RunContext, stored: Option<i64>) -> Result<SyncReport, SyncError> {
        let filter = TournamentFilter {
            country: self.options.country.clone(),
            state: self.options.state.clone(),
            videogame_ids: ctx.scope.ids(),
            after: self.options.after.or(stored),
            before: self.options.before,
            sort: self.options.sort
        };

        info!(
            "Starting sync {} (after {:?}, before {:?}, {} videogames{})",
            ctx.run_id,
            filter.after,
            filter.before,
            filter.videogame_ids.len(),
            if self.options.dry_run { ", dry run" } else { "" }
        );

        let processor = TournamentProcessor::new(
            self.client,
            self.store,
            ProcessOptions {
                saved_games: self.options.saved_games,
                dry_run: self.options.dry_run
            }
        )
        .with_engine(self.engine);

        let mut run = RunState {
            tracker: WatermarkTracker::new(stored.unwrap_or(0)),
            report: SyncReport {
                run_id: ctx.run_id,
                watermark_before: stored,
                dry_run: self.options.dry_run,
                ..SyncReport::default()
            }
        };

        let mut buffered = Vec::new();
        let mut state = SyncState::FetchingPage(1);

        while let SyncState::FetchingPage(page) = state {
            let result = self
                .client
                .search_tournaments(&filter, page, self.options.per_page)
                .await
                .map_err(SyncError::Search)?;
            run.report.pages += 1;

            state = if page < result.total_pages && !result.nodes.is_empty() {
                SyncState::FetchingPage(page + 1)
            } else {
                SyncState::Done
            };

            let tournaments: Vec<TournamentSummary> =
                result.nodes.into_iter().filter(|t| !t.slug.is_empty()).collect();
            run.report.tournaments_found += tournaments.len();

            info!("Page {}/{}: {} tournaments", page, result.total_pages, tournaments.len());

            if self.options.sort_ascending {
                buffered.extend(tournaments);
            } else {
                self.process_page(&processor, ctx, &mut run, page, tournaments).await?;
            }
        }

        if self.options.sort_ascending {
            sort_ascending(&mut buffered, self.options.sort);
            self.process_page(&processor, ctx, &mut run, 0, buffered).await?;
        }

        self.finish(run).await
    }

    async fn process_page(
        &self,
        processor: &TournamentProcessor<'_, T, C, S>,
        ctx: &mut RunContext,
        run: &mut RunState,
        page: u32,
        tournaments: Vec<TournamentSummary>
    ) -> Result<(), SyncError> {
        let span = info_span!("page", page);
        track_span(&span, tournaments.len() as u64, "Processing tournaments");

        async {
            for tournament in tournaments {
                match processor.process(ctx, &tournament.slug).await {
                    Ok(report) => {
                        run.tracker.record_success(tournament.end_at);
                        run.report.processed.push(report);
                    }
                    Err(e) => self.on_failure(run, e)?
                }

                Span::current().pb_inc(1);
            }

            Ok::<(), SyncError>(())
        }
        .instrument(span)
        .await
    }

    fn on_failure(&self, run: &mut RunState, e: ProcessingError) -> Result<(), SyncError> {
        match self.options.failure_policy {
            FailurePolicy::Abort => {
                error!("Aborting run: {}", e);
                Err(SyncError::Tournament(e))
            }
            FailurePolicy::Continue { max_failures } => {
                run.report.failed.push(e.slug().to_string());
                let failures = run.report.failed.len();

                if failures >= max_failures {
                    error!("Aborting run after {} failures: {}", failures, e);
                    return Err(SyncError::TooManyFailures {
                        failures,
                        max: max_failures,
                        last: e
                    });
                }

                warn!("Skipping tournament ({}/{} failures): {}", failures, max_failures, e);
                Ok(())
            }
        }
    }

    async fn finish(&self, run: RunState) -> Result<SyncReport, SyncError> {
        let RunState { tracker, mut report } = run;
        let key = &self.options.watermark_key;

        if tracker.advanced() {
            report.watermark_after = Some(tracker.next());

            if self.options.dry_run {
                info!("Dry run: would set watermark {} to {}", key, tracker.next());
            } else {
                self.store.set_watermark(key, tracker.next()).await?;
            }
        } else {
            report.watermark_after = report.watermark_before;
            info!("Watermark {} unchanged", key);
        }

        info!(
            "Sync {} done: {} pages, {} tournaments processed, {} failed",
            report.run_id,
            report.pages,
            report.processed.len(),
            report.failed.len()
        );

        Ok(report)
    }
}

/// Stable ascending sort on `field`; tournaments without a value go last.
pub fn sort_ascending(tournaments: &mut [TournamentSummary], field: SortField) {
    tournaments.sort_by_key(|t| {
        let value = field.value(t);
        (value.is_none(), value)
    });
}
