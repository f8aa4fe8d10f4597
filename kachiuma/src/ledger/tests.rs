use super::*;

fn row(race_id: &str, bet_type: &str, selection: &str, amount: &str, popularity: &str) -> RawPayoutRow {
    RawPayoutRow {
        race_id: RaceId::from(race_id),
        bet_type: bet_type.into(),
        selection: selection.into(),
        amount: amount.into(),
        popularity: popularity.into(),
    }
}

fn sample_rows() -> Vec<RawPayoutRow> {
    vec![
        row("202305021211", "単勝", "4", "1,230", "5"),
        row("202305021211", "複勝", "4br2br7", "250br140br600", "5br1br9"),
        row("202305021211", "馬連", "2-4", "1,870", "6"),
        row("202305021211", "馬単", "4→2", "4,020", "14"),
        row("202305021211", "ワイド", "2-4br4-7br2-7", "540br2,210br1,050", "5br28br12"),
        row("202305021211", "三連複", "2-4-7", "12,460", "41"),
        row("202305021211", "三連単", "4→2→7", "98,310", "302"),
    ]
}

#[test]
fn explodes_place_and_wide() {
    let ledger = PayoutLedger::from_rows(&sample_rows()).unwrap();
    let race_id = RaceId::from("202305021211");
    assert_eq!(1, ledger.num_races());
    assert_eq!(11, ledger.num_lines());

    let place = ledger.get(&race_id, BetType::Place);
    assert_eq!(3, place.len());
    assert_eq!(
        vec![
            (0, Selection::from(vec![4]), 250.0, 5),
            (1, Selection::from(vec![2]), 140.0, 1),
            (2, Selection::from(vec![7]), 600.0, 9)
        ],
        place
            .iter()
            .map(|line| (line.index, line.selection.clone(), line.amount, line.popularity))
            .collect::<Vec<_>>()
    );

    let wide = ledger.get(&race_id, BetType::Wide);
    assert_eq!(
        vec![
            (Selection::from(vec![2, 4]), 540.0),
            (Selection::from(vec![4, 7]), 2210.0),
            (Selection::from(vec![2, 7]), 1050.0)
        ],
        wide.iter()
            .map(|line| (line.selection.clone(), line.amount))
            .collect::<Vec<_>>()
    );
}

#[test]
fn strips_thousands_separators() {
    let ledger = PayoutLedger::from_rows(&sample_rows()).unwrap();
    let race_id = RaceId::from("202305021211");
    assert_eq!(1230.0, ledger.get(&race_id, BetType::Win)[0].amount);
    assert_eq!(98310.0, ledger.get(&race_id, BetType::TrioExacta)[0].amount);
    assert_eq!(302, ledger.get(&race_id, BetType::TrioExacta)[0].popularity);
}

#[test]
fn finishing_order_from_trio_exacta() {
    let ledger = PayoutLedger::from_rows(&sample_rows()).unwrap();
    assert_eq!(
        Some(&Selection::from(vec![4, 2, 7])),
        ledger.finishing_order(&RaceId::from("202305021211"))
    );
    assert_eq!(None, ledger.finishing_order(&RaceId::from("202305021212")));
}

#[test]
fn missing_payouts_are_empty() {
    let rows = vec![
        row("202305021201", "単勝", "3", "150", "1"),
        row("202305021201", "複勝", "3br8", "110br230", "1br4"),
    ];
    let ledger = PayoutLedger::from_rows(&rows).unwrap();
    let race_id = RaceId::from("202305021201");
    assert!(ledger.get(&race_id, BetType::TrioExacta).is_empty());
    assert!(ledger.get(&RaceId::from("unknown"), BetType::Win).is_empty());
    assert_eq!(2, ledger.get(&race_id, BetType::Place).len());
}

#[test]
fn newline_separated_values() {
    let rows = vec![row("r1", "Place", "4\n2\n7", "250\n140\n600", "5\n1\n9")];
    let ledger = PayoutLedger::from_rows(&rows).unwrap();
    assert_eq!(3, ledger.get(&RaceId::from("r1"), BetType::Place).len());
}

#[test]
fn malformed_amount_is_fatal() {
    let rows = vec![row("r1", "単勝", "4", "1,2x0", "5")];
    let err = PayoutLedger::from_rows(&rows).unwrap_err();
    assert!(matches!(err, LedgerError::MalformedAmount { .. }), "{err:?}");
    assert_eq!("race r1: malformed Win payout amount '1,2x0'", err.to_string());
}

#[test]
fn non_finite_or_negative_amount_is_fatal() {
    for amount in ["NaN", "inf", "-150", "1e400"] {
        let rows = vec![row("r1", "単勝", "4", amount, "5")];
        let err = PayoutLedger::from_rows(&rows).unwrap_err();
        assert!(
            matches!(&err, LedgerError::MalformedAmount { value, .. } if value == amount),
            "{amount}: {err:?}"
        );
    }
}

#[test]
fn malformed_popularity_is_fatal() {
    let rows = vec![row("r1", "単勝", "4", "1,230", "")];
    let err = PayoutLedger::from_rows(&rows).unwrap_err();
    assert!(matches!(err, LedgerError::MalformedPopularity { .. }), "{err:?}");
}

#[test]
fn malformed_selection_is_fatal() {
    let rows = vec![row("r1", "馬単", "4-2", "4,020", "14")];
    let err = PayoutLedger::from_rows(&rows).unwrap_err();
    assert_eq!(
        "race r1: invalid horse number '4-2' in selection '4-2'",
        err.to_string()
    );
}

#[test]
fn unknown_bet_type_is_fatal() {
    let rows = vec![row("r1", "枠連", "1-2", "500", "3")];
    let err = PayoutLedger::from_rows(&rows).unwrap_err();
    assert!(matches!(err, LedgerError::UnknownBetType { .. }), "{err:?}");
}

#[test]
fn misaligned_values_are_fatal() {
    let rows = vec![row("r1", "複勝", "4br2br7", "250br140", "5br1br9")];
    let err = PayoutLedger::from_rows(&rows).unwrap_err();
    assert_eq!(
        "race r1: Place row has 3 selection(s), 2 amount(s) and 3 popularity value(s)",
        err.to_string()
    );
}

#[test]
fn too_many_lines() {
    let rows = vec![
        row("r1", "単勝", "4", "1,230", "5"),
        row("r1", "単勝", "2", "880", "3"),
    ];
    let err = PayoutLedger::from_rows(&rows).unwrap_err();
    assert!(
        matches!(
            err,
            LedgerError::TooManyLines {
                lines: 2,
                multiplicity: 1,
                ..
            }
        ),
        "{err:?}"
    );

    let rows = vec![row("r1", "複勝", "1br2br3br4", "1br2br3br4", "1br2br3br4")];
    assert!(matches!(
        PayoutLedger::from_rows(&rows).unwrap_err(),
        LedgerError::TooManyLines { lines: 4, .. }
    ));
}

#[test]
fn insert_checks_arity() {
    let mut ledger = PayoutLedger::default();
    let err = ledger
        .insert(PayoutLine {
            race_id: RaceId::from("r1"),
            bet_type: BetType::Quinella,
            index: 0,
            selection: Selection::from(vec![1, 2, 3]),
            amount: 500.0,
            popularity: 1,
        })
        .unwrap_err();
    assert_eq!(
        "race r1: Quinella selection '1-2-3' names 3 horse(s), expected 2",
        err.to_string()
    );
}

#[test]
fn deserialises_source_column_names() {
    let json = r#"[{"race_id": "r1", "betting": "単勝", "horse_number": "4", "money": "1,230", "popular": "5"}]"#;
    let rows: Vec<RawPayoutRow> = serde_json::from_str(json).unwrap();
    assert_eq!(row("r1", "単勝", "4", "1,230", "5"), rows[0]);
}
