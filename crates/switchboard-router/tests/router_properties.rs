//! Property-based tests for routing and decomposition
//!
//! Routing is a pure function of the query and the store, so its guarantees
//! are checked over generated queries and agent sets.

use proptest::prelude::*;
use switchboard_router::{
    AgentDescriptor, AgentRole, AgentStore, FALLBACK_REASON, Router, decompose,
};

fn role_strategy() -> impl Strategy<Value = AgentRole> {
    prop::sample::select(AgentRole::ALL.to_vec())
}

// Keywords no role default can occur in
fn unique_keyword_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("zq[0-9]{4,8}").unwrap()
}

fn query_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z0-9 +*/?,.]{0,60}").unwrap()
}

fn store_strategy() -> impl Strategy<Value = AgentStore> {
    prop::collection::vec(role_strategy(), 1..8).prop_map(|roles| {
        roles
            .into_iter()
            .enumerate()
            .map(|(i, role)| {
                AgentDescriptor::new(format!("agent-{i}"), format!("http://agent-{i}"), role)
            })
            .collect()
    })
}

proptest! {
    /// Property: a decision always names an agent that is in the store
    #[test]
    fn prop_decision_names_stored_agent(store in store_strategy(), query in query_strategy()) {
        let decision = Router::default().route(&query, &store).unwrap();
        prop_assert!(store.get(decision.agent_name()).is_some());
    }

    /// Property: routing the same query twice gives the same agent
    #[test]
    fn prop_routing_is_deterministic(store in store_strategy(), query in query_strategy()) {
        let router = Router::default();
        let first = router.route(&query, &store).unwrap();
        let second = router.route(&query, &store).unwrap();
        prop_assert_eq!(first.agent_name(), second.agent_name());
        prop_assert_eq!(first.score, second.score);
    }

    /// Property: the score is the number of matched keywords and the best rank
    #[test]
    fn prop_score_is_best_rank(store in store_strategy(), query in query_strategy()) {
        let router = Router::default();
        let decision = router.route(&query, &store).unwrap();
        let best = router.rank(&query, &store).into_iter().map(|(_, s)| s).max().unwrap_or(0);

        prop_assert_eq!(decision.score, decision.matched.len());
        prop_assert_eq!(decision.score, best);
        prop_assert_eq!(decision.is_fallback, best == 0);
        if decision.is_fallback {
            prop_assert_eq!(decision.reason.as_str(), FALLBACK_REASON);
        }
    }

    /// Property: an empty or blank query always goes to the fallback agent
    #[test]
    fn prop_blank_query_falls_back(store in store_strategy(), spaces in 0usize..5) {
        let decision = Router::default().route(&" ".repeat(spaces), &store).unwrap();
        prop_assert!(decision.is_fallback);
        prop_assert_eq!(decision.score, 0);
    }

    /// Property: a keyword held by exactly one agent routes to that agent
    #[test]
    fn prop_unique_keyword_wins(
        store in store_strategy(),
        keyword in unique_keyword_strategy(),
        position in any::<prop::sample::Index>(),
    ) {
        let names = store.names();
        let owner = position.get(&names).clone();

        let mut store = store;
        let original = store.get(&owner).unwrap().as_ref().clone();
        store.upsert(original.with_keywords([keyword.as_str()]));

        let decision = Router::default().route(&keyword.to_uppercase(), &store).unwrap();
        prop_assert_eq!(decision.agent_name(), owner.as_str());
        prop_assert!(!decision.is_fallback);
        prop_assert_eq!(decision.matched, vec![keyword]);
    }

    /// Property: ties go to the agent registered first
    #[test]
    fn prop_tie_goes_to_first_registered(
        role in role_strategy(),
        keyword in unique_keyword_strategy(),
        count in 2usize..6,
    ) {
        let store: AgentStore = (0..count)
            .map(|i| {
                AgentDescriptor::new(format!("twin-{i}"), format!("http://twin-{i}"), role)
                    .with_keywords([keyword.as_str()])
            })
            .collect();

        for _ in 0..3 {
            let decision = Router::default().route(&keyword, &store).unwrap();
            prop_assert_eq!(decision.agent_name(), "twin-0");
        }
    }

    /// Property: sub-queries are non-empty pieces of the original query
    #[test]
    fn prop_sub_queries_come_from_query(query in query_strategy()) {
        let subs = decompose(&query);
        prop_assert!(!subs.is_empty());
        if subs.len() > 1 {
            for sub in &subs {
                prop_assert!(!sub.text.is_empty());
                prop_assert!(query.contains(&sub.text));
                prop_assert!(sub.category.is_some());
            }
        } else {
            prop_assert_eq!(subs[0].text.as_str(), query.trim());
        }
    }
}
