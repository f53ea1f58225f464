use super::Counter;
use crate::store::reactions::ReactionRecord;
use std::collections::{HashMap, HashSet};

/// Reaction totals credited to each monitored role, descending.
///
/// Every user's full reaction count is added to every monitored role they
/// currently hold, so a user in two monitored roles contributes their whole
/// total to both. Membership is resolved by the caller at query time; users
/// with no membership entry contribute nothing.
pub fn rank_role_totals(
    reactions: &[ReactionRecord],
    rank_roles: &[String],
    memberships: &HashMap<String, HashSet<String>>,
) -> Vec<(String, u64)> {
    let mut per_user = Counter::new();
    for reaction in reactions {
        per_user.add(&reaction.user_id);
    }

    let mut totals: Vec<(String, u64)> = rank_roles
        .iter()
        .map(|role_id| (role_id.clone(), 0u64))
        .collect();
    for (user_id, count) in per_user.iter() {
        let Some(held) = memberships.get(user_id) else {
            continue;
        };
        for (role_id, total) in totals.iter_mut() {
            if held.contains(role_id) {
                *total += count;
            }
        }
    }
    totals.sort_by(|a, b| b.1.cmp(&a.1));
    totals
}
