use strum_macros::{Display, EnumIter, EnumString};

use crate::model::structures::tournament::TournamentSummary;

/// `TournamentPaginationSort` values accepted by tournament search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, EnumIter)]
#[strum(serialize_all = "camelCase")]
pub enum SortField {
    StartAt,
    #[default]
    EndAt,
    EventRegistrationClosesAt,
    ComputedUpdatedAt
}

impl SortField {
    pub fn value(&self, tournament: &TournamentSummary) -> Option<i64> {
        match self {
            SortField::StartAt => tournament.start_at,
            SortField::EndAt => tournament.end_at,
            SortField::EventRegistrationClosesAt => tournament.registration_closes_at,
            SortField::ComputedUpdatedAt => tournament.updated_at
        }
    }
}
