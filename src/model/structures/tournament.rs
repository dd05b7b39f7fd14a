/// One node of a tournament search page. Timestamps are unix seconds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TournamentSummary {
    pub name: Option<String>,
    pub slug: String,
    pub start_at: Option<i64>,
    pub end_at: Option<i64>,
    pub registration_closes_at: Option<i64>,
    pub updated_at: Option<i64>
}

impl TournamentSummary {
    pub fn new(slug: &str, end_at: Option<i64>) -> TournamentSummary {
        TournamentSummary {
            slug: slug.to_string(),
            end_at,
            ..TournamentSummary::default()
        }
    }
}
