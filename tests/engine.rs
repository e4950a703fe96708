use parlay_engine::snapshot::{CorrelationTable, MarginalTable, PairCorrelation};
use parlay_engine::types::{
    Direction, DistFamily, EvaluateRequest, GameContext, Leg, LegKind, Marginal,
};
use parlay_engine::{EngineConfig, Evaluator};

fn prop_leg(subject: &str, stat: &str, line: f64, direction: Direction, odds: i32) -> Leg {
    Leg {
        kind: LegKind::PlayerProp,
        subject_id: subject.to_string(),
        stat_kind: Some(stat.to_string()),
        line,
        direction,
        odds_american: odds,
    }
}

fn marginal(subject: &str, stat: &str, mean: f64, stddev: f64) -> Marginal {
    Marginal {
        subject_id: subject.to_string(),
        stat_kind: stat.to_string(),
        dist_family: DistFamily::Normal,
        params: vec![],
        mean,
        stddev,
        sample_size: 120,
    }
}

fn two_leg_tables(rho: f64) -> (MarginalTable, CorrelationTable) {
    let marginals = MarginalTable::from_marginals(vec![
        marginal("qb1", "passing_yards", 265.0, 45.0),
        marginal("wr1", "receiving_yards", 75.0, 22.0),
    ]);
    let correlations = CorrelationTable::from_entries(vec![PairCorrelation {
        subject_a: "qb1".to_string(),
        stat_a: "passing_yards".to_string(),
        subject_b: "wr1".to_string(),
        stat_b: "receiving_yards".to_string(),
        rho,
    }]);
    (marginals, correlations)
}

fn two_leg_request(seed: u64) -> EvaluateRequest {
    EvaluateRequest {
        game_context: GameContext {
            spread: Some(-6.5),
            total: Some(45.0),
            ..Default::default()
        },
        legs: vec![
            prop_leg("qb1", "passing_yards", 265.5, Direction::Over, -110),
            prop_leg("wr1", "receiving_yards", 70.5, Direction::Over, -110),
        ],
        seed: Some(seed),
        sample_count: Some(10_000),
    }
}

#[test]
fn same_seed_is_reproducible() {
    let evaluator = Evaluator::new(EngineConfig::default());
    let (marginals, correlations) = two_leg_tables(0.4);
    let req = two_leg_request(42);
    let a = evaluator.evaluate(&req, &marginals, &correlations).unwrap();
    let b = evaluator.evaluate(&req, &marginals, &correlations).unwrap();
    assert_eq!(a.true_probability.to_bits(), b.true_probability.to_bits());
    assert_eq!(a.ev_pct.to_bits(), b.ev_pct.to_bits());
    assert_eq!(a.simulation_meta.seed, 42);

    let other = EvaluateRequest {
        seed: Some(43),
        ..req
    };
    let c = evaluator.evaluate(&other, &marginals, &correlations).unwrap();
    assert_ne!(a.true_probability.to_bits(), c.true_probability.to_bits());
}

#[test]
fn correlation_lift_is_monotone() {
    let evaluator = Evaluator::new(EngineConfig::default());
    let mut last = 0.0_f64;
    for rho in [0.0, 0.3, 0.6, 0.9] {
        let (marginals, correlations) = two_leg_tables(rho);
        let eval = evaluator
            .evaluate(&two_leg_request(42), &marginals, &correlations)
            .unwrap();
        assert!(
            eval.true_probability + 0.01 >= last,
            "lift decreased at rho={rho}: {} < {last}",
            eval.true_probability
        );
        last = eval.true_probability;
    }
}

#[test]
fn recommended_implies_positive_ev_and_kelly_bound() {
    let evaluator = Evaluator::new(EngineConfig::default());
    for (rho, odds) in [(0.0, 110), (0.5, -110), (0.65, 250), (0.3, -250)] {
        let (marginals, correlations) = two_leg_tables(rho);
        let mut req = two_leg_request(42);
        for leg in &mut req.legs {
            leg.odds_american = odds;
        }
        let eval = evaluator.evaluate(&req, &marginals, &correlations).unwrap();
        if eval.recommended {
            assert!(eval.ev_pct > 0.0);
        }
        assert!(eval.kelly_fraction >= 0.0 && eval.kelly_fraction <= 0.25);
        assert!(eval.true_probability >= 0.0 && eval.true_probability <= 1.0);
        assert!(eval.confidence_interval[0] <= eval.confidence_interval[1]);
    }
}

#[test]
fn too_many_legs_is_rejected() {
    let evaluator = Evaluator::new(EngineConfig::default());
    let legs: Vec<Leg> = (0..7)
        .map(|i| prop_leg(&format!("p{i}"), "receiving_yards", 50.0, Direction::Over, -110))
        .collect();
    let req = EvaluateRequest {
        game_context: GameContext::default(),
        legs,
        seed: None,
        sample_count: None,
    };
    let err = evaluator
        .evaluate(&req, &MarginalTable::default(), &CorrelationTable::default())
        .unwrap_err();
    assert_eq!(err.wire_code(), "TOO_MANY_LEGS");
}

#[test]
fn forbidden_odds_are_rejected() {
    let evaluator = Evaluator::new(EngineConfig::default());
    let (marginals, correlations) = two_leg_tables(0.0);
    let mut req = two_leg_request(1);
    req.legs[0].odds_american = 50;
    let err = evaluator.evaluate(&req, &marginals, &correlations).unwrap_err();
    assert_eq!(err.wire_code(), "INVALID_LEG");
}

#[test]
fn missing_marginal_rejects_the_request() {
    let evaluator = Evaluator::new(EngineConfig::default());
    let req = two_leg_request(1);
    let err = evaluator
        .evaluate(&req, &MarginalTable::default(), &CorrelationTable::default())
        .unwrap_err();
    assert_eq!(err.wire_code(), "MARGINAL_MISSING");
}

#[test]
fn sentiment_shifts_the_posterior_within_bounds() {
    let evaluator = Evaluator::new(EngineConfig::default());
    let (marginals, correlations) = two_leg_tables(0.0);

    let mut bullish = two_leg_request(42);
    bullish.game_context.sentiment = Some(1.0);
    let mut bearish = two_leg_request(42);
    bearish.game_context.sentiment = Some(0.0);
    let neutral = two_leg_request(42);

    let p_neutral = evaluator
        .evaluate(&neutral, &marginals, &correlations)
        .unwrap()
        .true_probability;
    let p_bullish = evaluator
        .evaluate(&bullish, &marginals, &correlations)
        .unwrap()
        .true_probability;
    let p_bearish = evaluator
        .evaluate(&bearish, &marginals, &correlations)
        .unwrap()
        .true_probability;

    assert!((p_bullish - (p_neutral + 0.10)).abs() < 1e-9);
    assert!((p_bearish - (p_neutral - 0.10)).abs() < 1e-9);
}

#[test]
fn injury_lowers_a_correlated_over_parlay() {
    let evaluator = Evaluator::new(EngineConfig::default());
    let (marginals, correlations) = two_leg_tables(0.6);

    let healthy = two_leg_request(42);
    let mut hurt = two_leg_request(42);
    hurt.game_context.injuries = vec![parlay_engine::types::InjuryReport {
        player_id: "qb1".to_string(),
        status: parlay_engine::types::InjuryStatus::Doubtful,
        impact: 0.6,
    }];

    let p_healthy = evaluator
        .evaluate(&healthy, &marginals, &correlations)
        .unwrap();
    let p_hurt = evaluator.evaluate(&hurt, &marginals, &correlations).unwrap();
    assert!(p_hurt.true_probability < p_healthy.true_probability);
    assert!(p_hurt
        .explanation
        .factors
        .iter()
        .any(|f| f.name == "Injury: qb1"));
}

#[test]
fn wire_schema_is_stable() {
    let evaluator = Evaluator::new(EngineConfig::default());
    let (marginals, correlations) = two_leg_tables(0.4);
    let eval = evaluator
        .evaluate(&two_leg_request(42), &marginals, &correlations)
        .unwrap();
    let json = serde_json::to_value(&eval).unwrap();

    for key in [
        "recommended",
        "true_probability",
        "implied_probability",
        "confidence_interval",
        "fair_odds_american",
        "sportsbook_odds_american",
        "ev_pct",
        "correlation_multiplier",
        "tail_risk_factor",
        "kelly_fraction",
        "explanation",
        "simulation_meta",
    ] {
        assert!(json.get(key).is_some(), "missing wire key {key}");
    }
    let explanation = &json["explanation"];
    for key in ["regime", "regime_reasoning", "factors", "imputed_pairs"] {
        assert!(explanation.get(key).is_some(), "missing explanation key {key}");
    }
    let meta = &json["simulation_meta"];
    for key in ["ms", "n_samples", "nu", "warmed_up", "seed"] {
        assert!(meta.get(key).is_some(), "missing meta key {key}");
    }
    // error_code stays off the wire on healthy responses.
    assert!(json.get("error_code").is_none());
}
