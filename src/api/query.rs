use std::{
    fmt::{Debug, Display},
    marker::PhantomData
};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Map, Value};

use crate::{
    api::{
        api_structs::{EntrantSetsNode, EventNode},
        error::ApiError,
        transport::GraphQlRequest
    },
    model::structures::{
        ids::{EntrantId, EventId, VideogameId},
        sort_field::SortField
    }
};

pub const MAX_BATCH_WIDTH: usize = 150;

/// Number of ids multiplexed into one request, always within `1..=150`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchWidth(usize);

impl BatchWidth {
    pub const EVENTS: BatchWidth = BatchWidth(10);
    pub const ENTRANTS: BatchWidth = BatchWidth(25);

    pub fn new(width: usize) -> Result<BatchWidth, ApiError> {
        if width == 0 || width > MAX_BATCH_WIDTH {
            return Err(ApiError::InvalidBatchWidth {
                width,
                max: MAX_BATCH_WIDTH
            });
        }

        Ok(BatchWidth(width))
    }

    pub fn get(self) -> usize {
        self.0
    }
}

/// A root field that can be queried many times in one request under
/// `E0..En` aliases, each bound to its own `$id{i}` variable.
pub trait AliasedQuery {
    const OPERATION: &'static str;
    const ROOT_FIELD: &'static str;
    /// Selection set for one alias. May reference `$page` and `$perPage`.
    const SELECTION: &'static str;

    type Id: Copy + Display + Serialize + Debug;
    type Node: DeserializeOwned;

    fn total_pages(node: &Self::Node) -> u32;
}

/// `event(id:)` with one page of entrants
#[derive(Debug, Clone, Copy)]
pub struct EventEntrantsQuery;

impl AliasedQuery for EventEntrantsQuery {
    const OPERATION: &'static str = "EventEntrants";
    const ROOT_FIELD: &'static str = "event";
    const SELECTION: &'static str = r#"
    id
    slug
    startAt
    videogame { id name displayName }
    entrants(query: { page: $page, perPage: $perPage }) {
      pageInfo { totalPages }
      nodes {
        id
        participants { player { id gamerTag } }
      }
    }"#;

    type Id = EventId;
    type Node = EventNode;

    fn total_pages(node: &EventNode) -> u32 {
        node.total_pages()
    }
}

/// `entrant(id:)` with one page of sets
#[derive(Debug, Clone, Copy)]
pub struct EntrantSetsQuery;

impl AliasedQuery for EntrantSetsQuery {
    const OPERATION: &'static str = "EntrantSets";
    const ROOT_FIELD: &'static str = "entrant";
    const SELECTION: &'static str = r#"
    id
    paginatedSets(page: $page, perPage: $perPage) {
      pageInfo { totalPages }
      nodes {
        id
        winnerId
        slots { entrant { id } }
      }
    }"#;

    type Id = EntrantId;
    type Node = EntrantSetsNode;

    fn total_pages(node: &EntrantSetsNode) -> u32 {
        node.total_pages()
    }
}

/// One multiplexed request. Construction fails if more ids are given than
/// the width allows, so an oversized query can never be sent.
#[derive(Debug, Clone)]
pub struct BatchQuery<Q: AliasedQuery> {
    ids: Vec<Q::Id>,
    page: u32,
    per_page: u32,
    query: PhantomData<Q>
}

pub fn alias(index: usize) -> String {
    format!("E{index}")
}

impl<Q: AliasedQuery> BatchQuery<Q> {
    pub fn new(ids: Vec<Q::Id>, width: BatchWidth, page: u32, per_page: u32) -> Result<BatchQuery<Q>, ApiError> {
        if ids.len() > width.get() {
            return Err(ApiError::BatchTooWide {
                len: ids.len(),
                width: width.get()
            });
        }

        Ok(BatchQuery {
            ids,
            page,
            per_page,
            query: PhantomData
        })
    }

    pub fn ids(&self) -> &[Q::Id] {
        &self.ids
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn query_text(&self) -> String {
        let mut text = format!("query {}(", Q::OPERATION);
        for i in 0..self.ids.len() {
            text.push_str(&format!("$id{i}: ID!, "));
        }
        text.push_str("$page: Int!, $perPage: Int!) {\n");

        for i in 0..self.ids.len() {
            text.push_str(&format!(
                "  {}: {}(id: $id{i}) {{{}\n  }}\n",
                alias(i),
                Q::ROOT_FIELD,
                Q::SELECTION
            ));
        }

        text.push('}');
        text
    }

    pub fn variables(&self) -> Value {
        let mut variables = Map::new();
        for (i, id) in self.ids.iter().enumerate() {
            variables.insert(format!("id{i}"), json!(id));
        }
        variables.insert("page".to_string(), Value::from(self.page));
        variables.insert("perPage".to_string(), Value::from(self.per_page));

        Value::Object(variables)
    }

    pub fn request(&self) -> GraphQlRequest {
        GraphQlRequest {
            query: self.query_text(),
            variables: self.variables()
        }
    }

    /// Pairs every requested id with its alias' node. A null or missing
    /// alias yields `None` for that id only.
    pub fn demultiplex(&self, data: &Value) -> Result<Vec<(Q::Id, Option<Q::Node>)>, ApiError> {
        self.ids
            .iter()
            .enumerate()
            .map(|(i, id)| {
                let node = match data.get(alias(i)) {
                    None | Some(Value::Null) => None,
                    Some(value) => Some(serde_json::from_value(value.clone())?)
                };

                Ok((*id, node))
            })
            .collect()
    }
}

pub const TOURNAMENT_EVENTS: &str = r#"query TournamentEvents($slug: String!) {
  tournament(slug: $slug) {
    name
    events {
      id
      slug
      videogame { id name displayName }
    }
  }
}"#;

pub const TOURNAMENT_SEARCH: &str = r#"query TournamentSearch($country: String, $state: String, $videogameIds: [ID], $afterDate: Timestamp, $beforeDate: Timestamp, $page: Int, $perPage: Int, $sort: TournamentPaginationSort) {
  tournaments(query: {
    filter: { countryCode: $country, addrState: $state, videogameIds: $videogameIds, afterDate: $afterDate, beforeDate: $beforeDate }
    sort: $sort
    page: $page
    perPage: $perPage
  }) {
    pageInfo { totalPages }
    nodes {
      name
      slug
      startAt
      endAt
      eventRegistrationClosesAt
      updatedAt
    }
  }
}"#;

/// Search criteria for tournament discovery. Timestamps are unix seconds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TournamentFilter {
    pub country: Option<String>,
    pub state: Option<String>,
    /// Empty means no game restriction
    pub videogame_ids: Vec<VideogameId>,
    pub after: Option<i64>,
    pub before: Option<i64>,
    pub sort: SortField
}

impl TournamentFilter {
    pub fn request(&self, page: u32, per_page: u32) -> GraphQlRequest {
        let videogame_ids = if self.videogame_ids.is_empty() {
            Value::Null
        } else {
            self.videogame_ids.iter().map(|id| Value::from(id.to_string())).collect()
        };

        GraphQlRequest {
            query: TOURNAMENT_SEARCH.to_string(),
            variables: json!({
                "country": self.country,
                "state": self.state,
                "videogameIds": videogame_ids,
                "afterDate": self.after,
                "beforeDate": self.before,
                "page": page,
                "perPage": per_page,
                "sort": self.sort.to_string()
            })
        }
    }
}

pub fn tournament_events_request(slug: &str) -> GraphQlRequest {
    GraphQlRequest {
        query: TOURNAMENT_EVENTS.to_string(),
        variables: json!({ "slug": slug })
    }
}

/// Splits `ids` into consecutive chunks of at most `width`, keeping order.
pub fn plan<I: Copy>(ids: &[I], width: BatchWidth) -> Vec<Vec<I>> {
    ids.chunks(width.get()).map(<[I]>::to_vec).collect()
}
