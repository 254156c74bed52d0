use serde::{Deserialize, Serialize};

/// Whether the player can currently see a body, judged by the time at which
/// the light now arriving left it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Visibility {
    /// The light from the body's creation has not arrived yet.
    #[default]
    Pending,
    Visible,
    /// The light from the body's death has arrived; the world removes it.
    Retired,
}

impl Visibility {
    pub fn classify(seen_time: f64, start_time: f64, death_time: f64) -> Self {
        if seen_time > death_time {
            Self::Retired
        } else if seen_time > start_time {
            Self::Visible
        } else {
            Self::Pending
        }
    }
}
