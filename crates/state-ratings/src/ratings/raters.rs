use super::domain::{Rater, RaterId};

/// The fixed set of household members allowed to rate.
#[derive(Debug, Clone)]
pub struct RaterDirectory {
    raters: Vec<Rater>,
}

impl RaterDirectory {
    pub fn new(raters: Vec<Rater>) -> Self {
        Self { raters }
    }

    /// `primary` ("You") and `secondary` ("Partner").
    pub fn household() -> Self {
        Self::new(vec![
            Rater {
                id: RaterId::from("primary"),
                username: "primary".to_string(),
                label: "You".to_string(),
            },
            Rater {
                id: RaterId::from("secondary"),
                username: "secondary".to_string(),
                label: "Partner".to_string(),
            },
        ])
    }

    pub fn list(&self) -> &[Rater] {
        &self.raters
    }

    pub fn get(&self, id: &RaterId) -> Option<&Rater> {
        self.raters.iter().find(|rater| &rater.id == id)
    }

    pub fn by_username(&self, username: &str) -> Option<&Rater> {
        self.raters
            .iter()
            .find(|rater| rater.username.eq_ignore_ascii_case(username.trim()))
    }

    pub fn contains(&self, id: &RaterId) -> bool {
        self.get(id).is_some()
    }

    /// The first two raters, used as the default agreement pair.
    pub fn default_pair(&self) -> Option<(&Rater, &Rater)> {
        match self.raters.as_slice() {
            [first, second, ..] => Some((first, second)),
            _ => None,
        }
    }
}
