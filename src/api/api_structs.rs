use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::model::structures::{
    bracket_set::BracketSet,
    entrant::Entrant,
    event::{EventEntrants, EventSummary},
    ids::{EntrantId, EventId, PlayerId, SetId, VideogameId},
    tournament::TournamentSummary
};

/// Top-level GraphQL envelope. `data` stays untyped until the caller knows
/// which aliases to look for.
#[derive(Debug, Deserialize)]
pub struct GraphQlResponse {
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub errors: Option<Vec<GraphQlError>>
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlError {
    pub message: String
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    #[serde(default)]
    pub total_pages: Option<u32>
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = "T: Deserialize<'de>"))]
pub struct Connection<T> {
    #[serde(default)]
    pub page_info: Option<PageInfo>,
    #[serde(default = "Vec::new", deserialize_with = "nullable_vec")]
    pub nodes: Vec<T>
}

impl<T> Connection<T> {
    /// Pages reported by the platform, at least one.
    pub fn total_pages(&self) -> u32 {
        self.page_info
            .as_ref()
            .and_then(|p| p.total_pages)
            .unwrap_or(1)
            .max(1)
    }
}

fn nullable_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideogameNode {
    pub id: VideogameId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>
}

impl VideogameNode {
    pub fn label(&self) -> String {
        self.display_name
            .clone()
            .or_else(|| self.name.clone())
            .unwrap_or_else(|| "Unknown".to_string())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerNode {
    pub id: PlayerId,
    #[serde(default)]
    pub gamer_tag: Option<String>
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParticipantNode {
    #[serde(default)]
    pub player: Option<PlayerNode>
}

#[derive(Debug, Clone, Deserialize)]
pub struct EntrantNode {
    pub id: EntrantId,
    #[serde(default = "Vec::new", deserialize_with = "nullable_vec")]
    pub participants: Vec<ParticipantNode>
}

impl EntrantNode {
    /// Entrants resolve through their first participant.
    pub fn to_entrant(&self) -> Entrant {
        let player = self.participants.first().and_then(|p| p.player.as_ref());

        Entrant {
            id: self.id,
            player: player.map(|p| p.id),
            name: player.and_then(|p| p.gamer_tag.clone())
        }
    }
}

/// One aliased `event(id:)` result carrying a page of entrants
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventNode {
    pub id: EventId,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub start_at: Option<i64>,
    #[serde(default)]
    pub videogame: Option<VideogameNode>,
    #[serde(default)]
    pub entrants: Option<Connection<EntrantNode>>
}

impl EventNode {
    pub fn total_pages(&self) -> u32 {
        self.entrants.as_ref().map_or(1, Connection::total_pages)
    }

    /// Starts an accumulator from the first page.
    pub fn into_event_entrants(self) -> EventEntrants {
        let mut event = EventEntrants {
            id: self.id,
            slug: self.slug.unwrap_or_else(|| self.id.to_string()),
            occurred_at: self.start_at.and_then(timestamp),
            videogame: self.videogame.map(|v| (v.id, v.label())),
            entrants: Vec::new()
        };

        if let Some(entrants) = self.entrants {
            event.entrants.extend(entrants.nodes.iter().map(EntrantNode::to_entrant));
        }

        event
    }

    pub fn entrants(&self) -> Vec<Entrant> {
        self.entrants
            .as_ref()
            .map(|c| c.nodes.iter().map(EntrantNode::to_entrant).collect())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlotEntrantNode {
    pub id: EntrantId
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlotNode {
    #[serde(default)]
    pub entrant: Option<SlotEntrantNode>
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetNode {
    pub id: SetId,
    #[serde(default)]
    pub winner_id: Option<EntrantId>,
    #[serde(default = "Vec::new", deserialize_with = "nullable_vec")]
    pub slots: Vec<SlotNode>
}

impl SetNode {
    pub fn to_bracket_set(&self) -> BracketSet {
        BracketSet::new(
            self.id.clone(),
            self.winner_id,
            self.slots.iter().map(|s| s.entrant.as_ref().map(|e| e.id)).collect()
        )
    }
}

/// One aliased `entrant(id:)` result carrying a page of sets
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntrantSetsNode {
    pub id: EntrantId,
    #[serde(default)]
    pub paginated_sets: Option<Connection<SetNode>>
}

impl EntrantSetsNode {
    pub fn total_pages(&self) -> u32 {
        self.paginated_sets.as_ref().map_or(1, Connection::total_pages)
    }

    pub fn sets(&self) -> Vec<BracketSet> {
        self.paginated_sets
            .as_ref()
            .map(|c| c.nodes.iter().map(SetNode::to_bracket_set).collect())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TournamentEventNode {
    pub id: EventId,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub videogame: Option<VideogameNode>
}

impl From<TournamentEventNode> for EventSummary {
    fn from(node: TournamentEventNode) -> Self {
        EventSummary {
            id: node.id,
            slug: node.slug,
            videogame: node.videogame.map(|v| (v.id, v.label()))
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TournamentEventsNode {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "Vec::new", deserialize_with = "nullable_vec")]
    pub events: Vec<TournamentEventNode>
}

#[derive(Debug, Clone, Deserialize)]
pub struct TournamentEventsData {
    #[serde(default)]
    pub tournament: Option<TournamentEventsNode>
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TournamentNode {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub start_at: Option<i64>,
    #[serde(default)]
    pub end_at: Option<i64>,
    #[serde(default)]
    pub event_registration_closes_at: Option<i64>,
    #[serde(default)]
    pub updated_at: Option<i64>
}

impl From<TournamentNode> for TournamentSummary {
    fn from(node: TournamentNode) -> Self {
        TournamentSummary {
            name: node.name,
            slug: node.slug.unwrap_or_default(),
            start_at: node.start_at,
            end_at: node.end_at,
            registration_closes_at: node.event_registration_closes_at,
            updated_at: node.updated_at
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TournamentSearchData {
    #[serde(default)]
    pub tournaments: Option<Connection<TournamentNode>>
}

pub fn timestamp(seconds: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(seconds, 0)
}
