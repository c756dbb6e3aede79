use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use validator::Validate;

use crate::models::domain::{CandidateProfile, RequesterObjective, RequesterProfile};

/// Request to rank a requester's network against their objective
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MatchRequest {
    #[validate(nested)]
    pub user_profile: RequesterProfile,
    #[validate(nested)]
    pub user_objective: RequesterObjective,
    #[serde(default)]
    #[validate(nested)]
    pub network_profiles: Vec<CandidateProfile>,
}

impl MatchRequest {
    /// First candidate id that appears more than once, if any
    pub fn duplicate_candidate_id(&self) -> Option<&str> {
        let mut seen = HashSet::with_capacity(self.network_profiles.len());
        self.network_profiles
            .iter()
            .map(|c| c.profile_id.as_str())
            .find(|id| !seen.insert(*id))
    }
}
