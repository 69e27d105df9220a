// tests/ranking.rs
use vista_aggregator::ranking::{rank, ProviderWeights};
use vista_aggregator::types::{CandidateResult, Provider};

fn candidate(provider: Provider, id: &str) -> CandidateResult {
    CandidateResult::new(provider, id, format!("https://cdn.example.com/{id}.jpg"))
}

#[test]
fn scores_are_monotonically_non_increasing() {
    let weights = ProviderWeights::default_seed();
    let pool = vec![
        candidate(Provider::StockSecondary, "b1"),
        candidate(Provider::MapData, "m1"),
        candidate(Provider::ImageSearch, "i1"),
        candidate(Provider::Community, "c1"),
        candidate(Provider::ImageSearch, "i2"),
        candidate(Provider::StockPrimary, "a1"),
    ];
    let ranked = rank(pool, &weights);

    for pair in ranked.windows(2) {
        assert!(
            pair[0].priority_score >= pair[1].priority_score,
            "{} before {}",
            pair[0].priority_score,
            pair[1].priority_score
        );
    }
}

#[test]
fn ties_keep_discovery_order_never_random() {
    let weights = ProviderWeights::default_seed();
    let pool: Vec<CandidateResult> = (0..20)
        .map(|i| candidate(Provider::Community, &format!("c{i}")))
        .collect();
    let ranked = rank(pool, &weights);
    let ids: Vec<String> = ranked.iter().map(|r| r.candidate.id.clone()).collect();
    let expected: Vec<String> = (0..20).map(|i| format!("c{i}")).collect();
    assert_eq!(ids, expected);
}

#[test]
fn config_override_reorders_providers() {
    let weights: ProviderWeights = serde_json::from_str(
        r#"{"default_weight": 10, "weights": {"stock-primary": 95, "image-search": 40}}"#,
    )
    .unwrap();
    let ranked = rank(
        vec![
            candidate(Provider::ImageSearch, "i1"),
            candidate(Provider::StockPrimary, "a1"),
        ],
        &weights,
    );
    assert_eq!(ranked[0].candidate.id, "a1");
    assert_eq!(ranked[0].priority_score, 95);
    assert_eq!(ranked[1].priority_score, 40);
}
