pub mod api_structs;
pub mod config;
pub mod error;
pub mod query;
pub mod retry;
pub mod transport;

use serde_json::Value;
use tracing::{debug, info};

use crate::{
    api::{
        api_structs::{GraphQlResponse, TournamentEventsData, TournamentSearchData},
        config::ApiConfig,
        error::ApiError,
        query::{
            plan, tournament_events_request, AliasedQuery, BatchQuery, BatchWidth, EntrantSetsQuery,
            EventEntrantsQuery, TournamentFilter
        },
        retry::{Clock, RetryPolicy, TokioClock},
        transport::{GraphQlRequest, HttpTransport, Transport}
    },
    model::structures::{
        bracket_set::BracketSet,
        event::{EventEntrants, EventSummary},
        ids::{EntrantId, EventId},
        tournament::TournamentSummary
    }
};

/// One page of tournament search results
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TournamentPage {
    pub total_pages: u32,
    pub nodes: Vec<TournamentSummary>
}

/// start.gg GraphQL client. Every request goes through the retry policy.
pub struct StartggClient<T: Transport = HttpTransport, C: Clock = TokioClock> {
    transport: T,
    clock: C,
    policy: RetryPolicy,
    config: ApiConfig
}

impl StartggClient {
    pub fn from_config(config: ApiConfig) -> Result<StartggClient, ApiError> {
        let transport = HttpTransport::new(&config)?;
        Ok(StartggClient::new(config, transport, TokioClock))
    }
}

impl<T: Transport, C: Clock> StartggClient<T, C> {
    pub fn new(config: ApiConfig, transport: T, clock: C) -> StartggClient<T, C> {
        StartggClient {
            transport,
            clock,
            policy: RetryPolicy::with_max_retries(config.max_retries),
            config
        }
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Sends one request and returns its `data`. GraphQL errors in a 2xx
    /// response are returned as [`ApiError::GraphQl`] without retrying.
    pub async fn execute(&self, request: &GraphQlRequest) -> Result<Value, ApiError> {
        let body = self.policy.run(&self.clock, || self.transport.post(request)).await?;
        let response: GraphQlResponse = serde_json::from_str(&body)?;

        if let Some(errors) = response.errors.filter(|e| !e.is_empty()) {
            return Err(ApiError::GraphQl {
                messages: errors.into_iter().map(|e| e.message).collect()
            });
        }

        response.data.ok_or_else(|| ApiError::MissingData("data".to_string()))
    }

    pub async fn fetch_tournament_events(&self, slug: &str) -> Result<Vec<EventSummary>, ApiError> {
        let data = self.execute(&tournament_events_request(slug)).await?;
        let tournament = serde_json::from_value::<TournamentEventsData>(data)?
            .tournament
            .ok_or_else(|| ApiError::MissingData(format!("tournament {slug}")))?;

        debug!("Tournament {} has {} events", slug, tournament.events.len());

        Ok(tournament.events.into_iter().map(EventSummary::from).collect())
    }

    /// Fetches every page of entrants for each event. Events the platform
    /// returns as null come back as `None`, in input order.
    pub async fn fetch_event_entrants(&self, ids: &[EventId]) -> Result<Vec<(EventId, Option<EventEntrants>)>, ApiError> {
        let pages = self
            .fetch_batched::<EventEntrantsQuery>(ids, self.config.event_batch_width, self.config.entrant_page_size)
            .await?;

        Ok(pages
            .into_iter()
            .map(|(id, nodes)| {
                let mut nodes = nodes.into_iter();
                let event = nodes.next().map(|first| {
                    let mut event = first.into_event_entrants();
                    for node in nodes {
                        event.entrants.extend(node.entrants());
                    }
                    event
                });

                (id, event)
            })
            .collect())
    }

    /// Fetches every page of sets for each entrant, most recent first as
    /// the platform lists them. A null entrant yields an empty listing.
    pub async fn fetch_entrant_sets(&self, ids: &[EntrantId]) -> Result<Vec<(EntrantId, Vec<BracketSet>)>, ApiError> {
        let pages = self
            .fetch_batched::<EntrantSetsQuery>(ids, self.config.entrant_batch_width, self.config.set_page_size)
            .await?;

        Ok(pages
            .into_iter()
            .map(|(id, nodes)| (id, nodes.iter().flat_map(|n| n.sets()).collect()))
            .collect())
    }

    pub async fn search_tournaments(
        &self,
        filter: &TournamentFilter,
        page: u32,
        per_page: u32
    ) -> Result<TournamentPage, ApiError> {
        let data = self.execute(&filter.request(page, per_page)).await?;
        let Some(connection) = serde_json::from_value::<TournamentSearchData>(data)?.tournaments else {
            return Ok(TournamentPage::default());
        };

        let page_result = TournamentPage {
            total_pages: connection.total_pages(),
            nodes: connection.nodes.into_iter().map(TournamentSummary::from).collect()
        };

        info!(
            "Received tournaments page {}/{} ({} nodes)",
            page,
            page_result.total_pages,
            page_result.nodes.len()
        );

        Ok(page_result)
    }

    /// Splits `ids` into width-bounded chunks and pages each chunk until
    /// every id in it reports no further pages. Only ids with pages left
    /// are carried into the next request.
    async fn fetch_batched<Q: AliasedQuery>(
        &self,
        ids: &[Q::Id],
        width: BatchWidth,
        per_page: u32
    ) -> Result<Vec<(Q::Id, Vec<Q::Node>)>, ApiError> {
        let mut results = Vec::with_capacity(ids.len());

        for chunk in plan(ids, width) {
            let mut collected: Vec<(Q::Id, Vec<Q::Node>)> = chunk.iter().map(|id| (*id, Vec::new())).collect();
            let mut pending: Vec<usize> = (0..chunk.len()).collect();
            let mut page = 1;

            while !pending.is_empty() {
                let batch = BatchQuery::<Q>::new(pending.iter().map(|&i| chunk[i]).collect(), width, page, per_page)?;
                debug!("{} page {} for {} ids", Q::OPERATION, page, batch.ids().len());

                let data = self.execute(&batch.request()).await?;
                let mut remaining = Vec::new();

                for (&slot, (_, node)) in pending.iter().zip(batch.demultiplex(&data)?) {
                    let Some(node) = node else {
                        continue;
                    };

                    if Q::total_pages(&node) > page {
                        remaining.push(slot);
                    }
                    collected[slot].1.push(node);
                }

                pending = remaining;
                page += 1;
            }

            results.extend(collected);
        }

        Ok(results)
    }
}
