use std::{
    collections::{HashSet, VecDeque},
    sync::Mutex,
    time::Duration
};

use serde_json::{json, Map, Value};

use crate::{
    api::{
        retry::Clock,
        transport::{GraphQlRequest, RawResponse, Transport, TransportError}
    },
    model::{
        constants::DEFAULT_VOLATILITY,
        structures::{
            bracket_set::BracketSet,
            entrant::Entrant,
            ids::{EntrantId, PlayerId, SetId},
            match_result::Match,
            player::Player
        }
    }
};

pub fn generate_player(id: i64, rating: f64, deviation: f64) -> Player {
    Player {
        id: PlayerId(id),
        rating,
        deviation,
        volatility: DEFAULT_VOLATILITY,
        appearances: 0
    }
}

pub fn generate_match(set_id: &str, winner: i64, loser: i64) -> Match {
    Match {
        set_id: SetId::from(set_id),
        winner: PlayerId(winner),
        loser: PlayerId(loser),
        event_slug: "tournament/test/event/test".to_string(),
        occurred_at: None
    }
}

pub fn generate_entrant(entrant_id: i64, player: Option<i64>, name: &str) -> Entrant {
    Entrant {
        id: EntrantId(entrant_id),
        player: player.map(PlayerId),
        name: Some(name.to_string())
    }
}

pub fn generate_set(id: &str, winner: Option<i64>, a: Option<i64>, b: Option<i64>) -> BracketSet {
    BracketSet::new(id, winner.map(EntrantId), vec![a.map(EntrantId), b.map(EntrantId)])
}

/// Records requested sleeps instead of sleeping.
#[derive(Debug, Default)]
pub struct RecordingClock {
    sleeps: Mutex<Vec<Duration>>
}

impl RecordingClock {
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl Clock for RecordingClock {
    async fn sleep(&self, duration: Duration) {
        if let Ok(mut sleeps) = self.sleeps.lock() {
            sleeps.push(duration);
        }
    }
}

/// Replays a fixed list of outcomes, one per request.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<RawResponse, TransportError>>>,
    requests: Mutex<Vec<GraphQlRequest>>
}

impl ScriptedTransport {
    pub fn new(responses: Vec<Result<RawResponse, TransportError>>) -> ScriptedTransport {
        ScriptedTransport {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new())
        }
    }

    pub fn requests(&self) -> Vec<GraphQlRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl Transport for ScriptedTransport {
    async fn post(&self, request: &GraphQlRequest) -> Result<RawResponse, TransportError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        self.responses
            .lock()
            .ok()
            .and_then(|mut r| r.pop_front())
            .unwrap_or_else(|| Err(TransportError::Other("script exhausted".to_string())))
    }
}

#[derive(Debug, Clone)]
pub struct FakeEntrant {
    pub id: i64,
    /// Player id and gamer tag
    pub player: Option<(i64, String)>
}

#[derive(Debug, Clone)]
pub struct FakeSet {
    pub id: String,
    pub winner: Option<i64>,
    pub slots: Vec<Option<i64>>
}

#[derive(Debug, Clone)]
pub struct FakeEvent {
    pub id: i64,
    pub slug: String,
    pub start_at: Option<i64>,
    pub videogame: Option<(i64, String)>,
    pub entrants: Vec<FakeEntrant>,
    /// In the order they were played
    pub sets: Vec<FakeSet>
}

#[derive(Debug, Clone)]
pub struct FakeTournament {
    pub slug: String,
    pub start_at: Option<i64>,
    pub end_at: Option<i64>,
    pub events: Vec<FakeEvent>
}

/// An in-process start.gg answering the queries this crate sends, with
/// real aliasing and pagination.
#[derive(Debug, Default)]
pub struct FakeStartgg {
    pub tournaments: Vec<FakeTournament>,
    /// Tournament slugs whose event query answers with a GraphQL error
    pub failing: HashSet<String>,
    requests: Mutex<Vec<GraphQlRequest>>
}

impl FakeStartgg {
    pub fn new(tournaments: Vec<FakeTournament>) -> FakeStartgg {
        FakeStartgg {
            tournaments,
            ..FakeStartgg::default()
        }
    }

    pub fn failing(mut self, slug: &str) -> FakeStartgg {
        self.failing.insert(slug.to_string());
        self
    }

    pub fn requests(&self) -> Vec<GraphQlRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Number of requests sent with the given operation name.
    pub fn count(&self, operation: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.operation_name() == Some(operation))
            .count()
    }

    fn events(&self) -> impl Iterator<Item = &FakeEvent> {
        self.tournaments.iter().flat_map(|t| t.events.iter())
    }

    fn respond(&self, request: &GraphQlRequest) -> Value {
        let vars = &request.variables;
        let page = vars["page"].as_u64().unwrap_or(1).max(1) as usize;
        let per_page = vars["perPage"].as_u64().unwrap_or(50).max(1) as usize;

        match request.operation_name() {
            Some("TournamentSearch") => {
                let nodes: Vec<Value> = page_of(&self.tournaments, page, per_page)
                    .iter()
                    .map(|t| json!({ "name": t.slug, "slug": t.slug, "startAt": t.start_at, "endAt": t.end_at }))
                    .collect();

                json!({ "data": { "tournaments": {
                    "pageInfo": { "totalPages": total_pages(self.tournaments.len(), per_page) },
                    "nodes": nodes
                } } })
            }
            Some("TournamentEvents") => {
                let slug = vars["slug"].as_str().unwrap_or_default();
                if self.failing.contains(slug) {
                    return json!({ "errors": [{ "message": format!("tournament {slug} is broken") }] });
                }

                let Some(tournament) = self.tournaments.iter().find(|t| t.slug == slug) else {
                    return json!({ "data": { "tournament": null } });
                };

                let events: Vec<Value> = tournament
                    .events
                    .iter()
                    .map(|e| json!({ "id": e.id, "slug": e.slug, "videogame": videogame(e) }))
                    .collect();

                json!({ "data": { "tournament": { "name": slug, "events": events } } })
            }
            Some("EventEntrants") => self.aliased(vars, |id| {
                let event = self.events().find(|e| e.id == id)?;
                let nodes: Vec<Value> = page_of(&event.entrants, page, per_page)
                    .iter()
                    .map(|entrant| {
                        let player = entrant
                            .player
                            .as_ref()
                            .map(|(id, tag)| json!({ "id": id, "gamerTag": tag }));
                        json!({ "id": entrant.id, "participants": [{ "player": player }] })
                    })
                    .collect();

                Some(json!({
                    "id": event.id,
                    "slug": event.slug,
                    "startAt": event.start_at,
                    "videogame": videogame(event),
                    "entrants": {
                        "pageInfo": { "totalPages": total_pages(event.entrants.len(), per_page) },
                        "nodes": nodes
                    }
                }))
            }),
            Some("EntrantSets") => self.aliased(vars, |id| {
                let event = self.events().find(|e| e.entrants.iter().any(|en| en.id == id))?;
                // Most recent first, as the platform lists them
                let listing: Vec<&FakeSet> = event
                    .sets
                    .iter()
                    .rev()
                    .filter(|s| s.slots.contains(&Some(id)))
                    .collect();
                let nodes: Vec<Value> = page_of(&listing, page, per_page)
                    .iter()
                    .map(|s| {
                        let slots: Vec<Value> = s
                            .slots
                            .iter()
                            .map(|slot| json!({ "entrant": slot.map(|e| json!({ "id": e })) }))
                            .collect();
                        json!({ "id": s.id, "winnerId": s.winner, "slots": slots })
                    })
                    .collect();

                Some(json!({
                    "id": id,
                    "paginatedSets": {
                        "pageInfo": { "totalPages": total_pages(listing.len(), per_page) },
                        "nodes": nodes
                    }
                }))
            }),
            _ => json!({ "errors": [{ "message": "unknown operation" }] })
        }
    }

    fn aliased(&self, vars: &Value, node: impl Fn(i64) -> Option<Value>) -> Value {
        let mut data = Map::new();
        let mut i = 0;
        while let Some(id) = vars.get(format!("id{i}")).and_then(Value::as_i64) {
            data.insert(format!("E{i}"), node(id).unwrap_or(Value::Null));
            i += 1;
        }

        json!({ "data": data })
    }
}

impl Transport for FakeStartgg {
    async fn post(&self, request: &GraphQlRequest) -> Result<RawResponse, TransportError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        Ok(RawResponse::ok(self.respond(request).to_string()))
    }
}

fn videogame(event: &FakeEvent) -> Value {
    event
        .videogame
        .as_ref()
        .map_or(Value::Null, |(id, name)| json!({ "id": id, "name": name, "displayName": name }))
}

fn total_pages(len: usize, per_page: usize) -> usize {
    len.div_ceil(per_page).max(1)
}

fn page_of<T>(items: &[T], page: usize, per_page: usize) -> &[T] {
    let start = ((page - 1) * per_page).min(items.len());
    let end = (start + per_page).min(items.len());
    &items[start..end]
}

/// A round robin among `players`, one set per pair, the lower index
/// always winning. Entrant ids are `event_id * 100 + index`.
pub fn round_robin_event(id: i64, slug: &str, videogame: (i64, &str), players: &[(i64, &str)]) -> FakeEvent {
    let entrants: Vec<FakeEntrant> = players
        .iter()
        .enumerate()
        .map(|(i, (pid, tag))| FakeEntrant {
            id: id * 100 + i as i64,
            player: Some((*pid, tag.to_string()))
        })
        .collect();

    let mut sets = Vec::new();
    for a in 0..entrants.len() {
        for b in a + 1..entrants.len() {
            sets.push(FakeSet {
                id: format!("{}-{}-{}", id, a, b),
                winner: Some(entrants[a].id),
                slots: vec![Some(entrants[a].id), Some(entrants[b].id)]
            });
        }
    }

    FakeEvent {
        id,
        slug: slug.to_string(),
        start_at: Some(1_700_000_000),
        videogame: Some((videogame.0, videogame.1.to_string())),
        entrants,
        sets
    }
}
