use match_logic::{
    builtin_strategies, find_builtin, run_match, run_tournament, Arena, ArenaConfig, ArenaError,
    Move, PayoffMatrix, SandboxLimits, Strategy, TournamentResult,
};

fn builtin(id: &str) -> Strategy {
    find_builtin(id).unwrap()
}

#[test]
fn test_always_cooperate_vs_always_defect() {
    let result = run_match(&builtin("always-cooperate"), &builtin("always-defect"), 10);

    assert_eq!(result.total_score_a, 0);
    assert_eq!(result.total_score_b, 50);
    assert_eq!(result.metrics.cooperation_rate_a, 1.0);
    assert_eq!(result.metrics.cooperation_rate_b, 0.0);
}

#[test]
fn test_tit_for_tat_vs_always_defect() {
    let result = run_match(&builtin("tit-for-tat"), &builtin("always-defect"), 5);

    let moves_a: Vec<Move> = result.rounds.iter().map(|r| r.move_a).collect();
    let moves_b: Vec<Move> = result.rounds.iter().map(|r| r.move_b).collect();
    assert_eq!(
        moves_a,
        vec![Move::Cooperate, Move::Defect, Move::Defect, Move::Defect, Move::Defect]
    );
    assert!(moves_b.iter().all(|m| *m == Move::Defect));
    assert_eq!((result.total_score_a, result.total_score_b), (4, 9));
}

#[test]
fn test_user_strategy_in_tournament() {
    let mut strategies = vec![builtin("tit-for-tat"), builtin("always-defect"), builtin("grim-trigger")];
    strategies.push(Strategy::new(
        "forgiver",
        "Forgiver",
        "// Defect once after two defections in the last three rounds
         const recent = context.opponentHistory.slice(-3);
         return recent.count('D') >= 2 ? 'D' : 'C';",
    ));

    let result = run_tournament(&strategies, 25).unwrap();
    assert_eq!(result.matches.len(), 10);
    assert!(result.matches.iter().all(|m| m.rounds.len() == 25));
    for entry in &result.entries {
        assert_eq!(entry.matches_played, 4);
    }
}

#[test]
fn test_broken_strategy_only_hurts_itself() {
    let strategies = vec![
        builtin("tit-for-tat"),
        Strategy::new("broken", "Broken", "return context.nothing.here;"),
        Strategy::new("loops", "Loops", "for (;;) {}"),
    ];
    let result = run_tournament(&strategies, 10).unwrap();

    let broken = result.entry("broken").unwrap();
    let loops = result.entry("loops").unwrap();
    assert_eq!(broken.cooperation_rate, 0.0);
    assert_eq!(loops.cooperation_rate, 0.0);
    assert_eq!(result.matches.len(), 6);
}

#[test]
fn test_validation_errors() {
    assert_eq!(
        run_tournament(&[builtin("random")], 5).unwrap_err(),
        ArenaError::NotEnoughStrategies(1)
    );
    assert_eq!(
        run_tournament(&builtin_strategies(), 0).unwrap_err(),
        ArenaError::InvalidRoundCount
    );
}

#[test]
fn test_result_json_round_trips_through_display_shape() {
    let strategies = vec![builtin("pavlov"), builtin("bully")];
    let result = run_tournament(&strategies, 4).unwrap();

    let json = serde_json::to_string(&result).unwrap();
    assert!(json.contains("\"strategyId\""));
    assert!(json.contains("\"cooperationRateA\""));
    let back: TournamentResult = serde_json::from_str(&json).unwrap();
    assert_eq!(back.entries, result.entries);
}

#[test]
fn test_strategy_json_from_editor() {
    let json = r##"{"id": "mine", "name": "Mine", "code": "return 'C';", "color": "#123456"}"##;
    let strategy: Strategy = serde_json::from_str(json).unwrap();
    assert!(!strategy.is_built_in);
    let result = run_match(&strategy, &builtin("always-cooperate"), 3);
    assert_eq!(result.total_score_a, 9);
}

#[test]
fn test_configured_arena() {
    let config = ArenaConfig::from_json_str(
        r#"{"seed": 3, "payoff": {"CC": [2,2], "CD": [0,3], "DC": [3,0], "DD": [1,1]}}"#,
    )
    .unwrap();
    let arena = Arena::from_config(&config);
    let result = arena.run_match(&builtin("always-defect"), &builtin("always-cooperate"), 4);
    assert_eq!(result.total_score_a, 12);

    let custom = Arena::new(PayoffMatrix::STANDARD, SandboxLimits::default().with_fuel(10), 0);
    // Ten steps are not enough to walk the history
    let heavy = Strategy::new(
        "heavy",
        "Heavy",
        "let n = 0; for (let i = 0; i < 100; i++) { n += i; } return 'C';",
    );
    let result = custom.run_match(&heavy, &builtin("always-cooperate"), 2);
    assert!(result.rounds.iter().all(|r| r.move_a == Move::Defect));
}

#[test]
fn test_negative_payoffs_accumulate() {
    let config = ArenaConfig::from_json_str(
        r#"{"payoff": {"CC": [2,2], "CD": [-3,4], "DC": [4,-3], "DD": [-1,-1]}}"#,
    )
    .unwrap();
    let arena = Arena::from_config(&config);
    let result = arena.run_match(&builtin("always-defect"), &builtin("always-defect"), 5);
    assert_eq!((result.total_score_a, result.total_score_b), (-5, -5));

    let result = arena.run_match(&builtin("always-cooperate"), &builtin("always-defect"), 3);
    assert_eq!((result.total_score_a, result.total_score_b), (-9, 12));
}

