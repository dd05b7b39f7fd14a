use crate::model::structures::ids::{EntrantId, SetId};

/// A best-of-N contest as listed for one entrant. Slots hold `None` for
/// byes and for slots whose entrant has not been decided.
#[derive(Debug, Clone, PartialEq)]
pub struct BracketSet {
    pub id: SetId,
    pub winner: Option<EntrantId>,
    pub slots: Vec<Option<EntrantId>>
}

impl BracketSet {
    pub fn new(id: impl Into<SetId>, winner: Option<EntrantId>, slots: Vec<Option<EntrantId>>) -> BracketSet {
        BracketSet {
            id: id.into(),
            winner,
            slots
        }
    }

    /// The two participant slots, if the set has exactly two.
    pub fn pair(&self) -> Option<(Option<EntrantId>, Option<EntrantId>)> {
        match self.slots.as_slice() {
            [a, b] => Some((*a, *b)),
            _ => None
        }
    }
}
