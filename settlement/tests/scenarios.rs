//! End-to-end scenarios for balance computation and settlement planning

use group_settlement::{
    netting::apply_transfers, splits::equal_split, BalanceCalculator, Balance, Config, Error,
    Expense, GroupSnapshot, Member, MemberId, MemberRole, SettlementEngine, SettlementPlanner,
    MalformedSplitPolicy, Split, UnknownMemberPolicy,
};
use rust_decimal::Decimal;

fn dollars(amount: i64) -> Decimal {
    Decimal::new(amount, 0)
}

fn roster(ids: &[&str]) -> Vec<Member> {
    ids.iter().map(|id| Member::new(*id, format!("Member {}", id))).collect()
}

fn balance(id: &str, amount: Decimal) -> Balance {
    Balance {
        member_id: MemberId::new(id),
        display_name: id.to_string(),
        net_amount: amount,
    }
}

#[test]
fn test_one_creditor_settles_two_debtors() {
    let balances = vec![
        balance("A", dollars(300)),
        balance("B", dollars(-100)),
        balance("C", dollars(-200)),
    ];

    let transfers = SettlementPlanner::default().plan_settlements(&balances);

    let routes: Vec<_> = transfers
        .iter()
        .map(|t| (t.from_member_id.as_str(), t.to_member_id.as_str(), t.amount))
        .collect();
    assert_eq!(routes, vec![("C", "A", dollars(200)), ("B", "A", dollars(100))]);

    let after = apply_transfers(&balances, &transfers);
    assert!(after.iter().all(|b| b.net_amount == Decimal::ZERO));
}

#[test]
fn test_even_three_way_split() {
    let expense = Expense::new(
        "exp-1",
        "A",
        dollars(90),
        vec![
            Split::new("A", dollars(30)),
            Split::new("B", dollars(30)),
            Split::new("C", dollars(30)),
        ],
    );

    let sheet = BalanceCalculator::default()
        .compute_balances(&roster(&["A", "B", "C"]), &[expense])
        .unwrap();

    assert_eq!(sheet.net_amount(&MemberId::new("A")), dollars(60));
    assert_eq!(sheet.net_amount(&MemberId::new("B")), dollars(-30));
    assert_eq!(sheet.net_amount(&MemberId::new("C")), dollars(-30));
}

#[test]
fn test_split_for_unknown_member_is_dropped() {
    let expense = Expense::new(
        "exp-1",
        "A",
        dollars(90),
        vec![
            Split::new("A", dollars(30)),
            Split::new("B", dollars(30)),
            Split::new("X", dollars(30)),
        ],
    );

    let sheet = BalanceCalculator::default()
        .compute_balances(&roster(&["A", "B", "C"]), &[expense])
        .unwrap();

    assert_eq!(sheet.net_amount(&MemberId::new("A")), dollars(60));
    assert_eq!(sheet.net_amount(&MemberId::new("B")), dollars(-30));
    assert_eq!(sheet.net_amount(&MemberId::new("C")), Decimal::ZERO);

    assert_eq!(sheet.unknown_members.len(), 1);
    assert_eq!(sheet.unknown_members[0].member_id, MemberId::new("X"));
    assert_eq!(sheet.unknown_members[0].role, MemberRole::Split);

    // Roster is incomplete, so the zero-sum invariant does not hold here
    assert_eq!(sheet.net_total(), dollars(30));
}

#[test]
fn test_strict_deployment_rejects_unknown_member() {
    let config = Config {
        unknown_member_policy: UnknownMemberPolicy::Reject,
        ..Default::default()
    };
    let expense = Expense::new("exp-1", "A", dollars(90), vec![Split::new("X", dollars(90))]);

    let result = BalanceCalculator::new(&config).compute_balances(&roster(&["A"]), &[expense]);
    assert!(matches!(result, Err(Error::UnknownGroupMember { .. })));
}

#[test]
fn test_no_expenses() {
    let sheet = BalanceCalculator::default()
        .compute_balances(&roster(&["A", "B", "C"]), &[])
        .unwrap();

    assert_eq!(sheet.len(), 3);
    assert!(sheet.to_vec().iter().all(|b| b.net_amount == Decimal::ZERO));
    assert!(SettlementPlanner::default()
        .plan_settlements(&sheet.to_vec())
        .is_empty());
}

#[test]
fn test_stored_group_snapshot() {
    // Splits arrive the way the persistence layer stores them: a JSON blob
    let json = r#"{
        "id": "g-42",
        "members": [
            {"id": "u1", "name": "Ana"},
            {"id": "u2", "name": "Ben"},
            {"id": "u3", "name": "Cy"}
        ],
        "expenses": [
            {
                "id": "e1",
                "paid_by": "u1",
                "amount": 120,
                "split_data": "[{\"user_id\":\"u1\",\"amount\":40},{\"user_id\":\"u2\",\"amount\":40},{\"user_id\":\"u3\",\"amount\":40}]"
            },
            {
                "id": "e2",
                "paid_by": "u2",
                "amount": "30.00",
                "split_data": [{"user_id": "u3", "amount": "30.00"}]
            }
        ],
        "settlements": [
            {"from_user": "u3", "to_user": "u1", "amount": 10}
        ]
    }"#;

    let snapshot: GroupSnapshot = serde_json::from_str(json).unwrap();
    let engine = SettlementEngine::new(Config::default()).unwrap();
    let summary = engine.summarize(&snapshot).unwrap();

    // u1: +120 - 40 + 10 = +70, u2: -40 + 30 = -10, u3: -40 - 30 + 10 = -60
    let nets: Vec<_> = summary.balances.iter().map(|b| b.net_amount).collect();
    assert_eq!(nets, vec![dollars(70), dollars(-10), dollars(-60)]);

    assert_eq!(summary.settlements.len(), 2);
    assert_eq!(summary.settlements[0].from_name, "Cy");
    assert_eq!(summary.settlements[0].to_name, "Ana");
    assert_eq!(summary.settlements[0].amount, dollars(60));
    assert_eq!(summary.settlements[1].from_name, "Ben");
    assert_eq!(summary.settlements[1].amount, dollars(10));

    let rendered = serde_json::to_value(&summary).unwrap();
    assert_eq!(rendered["group_id"], "g-42");
    assert_eq!(rendered["settlements"][0]["from_member_id"], "u3");
}

#[test]
fn test_malformed_stored_splits_name_the_expense() {
    let snapshot = GroupSnapshot {
        group_id: "g-1".to_string(),
        members: roster(&["A", "B"]),
        expenses: vec![Expense::with_raw_splits("e-bad", "A", dollars(10), "[{\"user_id\": 5}]")],
        payments: vec![],
    };

    let engine = SettlementEngine::new(Config::default()).unwrap();
    match engine.summarize(&snapshot) {
        Err(Error::MalformedSplitData { expense_id, .. }) => assert_eq!(expense_id, "e-bad"),
        other => panic!("expected MalformedSplitData, got {:?}", other),
    }
}

const INLINE_BAD_SPLITS: &str = r#"{
    "id": "g-7",
    "members": [{"id": "a", "name": "Ana"}, {"id": "b", "name": "Ben"}],
    "expenses": [
        {"id": "e-ok", "paid_by": "a", "amount": 20, "split_data": [{"user_id": "b", "amount": 20}]},
        {"id": "e-bad", "paid_by": "b", "amount": 10, "split_data": [{"user_id": "a", "amount": "abc"}]}
    ]
}"#;

#[test]
fn test_inline_bad_splits_rejected_with_expense_id() {
    let snapshot: GroupSnapshot = serde_json::from_str(INLINE_BAD_SPLITS).unwrap();
    let engine = SettlementEngine::new(Config::default()).unwrap();

    match engine.summarize(&snapshot) {
        Err(Error::MalformedSplitData { expense_id, .. }) => assert_eq!(expense_id, "e-bad"),
        other => panic!("expected MalformedSplitData, got {:?}", other),
    }
}

#[test]
fn test_inline_bad_splits_skipped_when_configured() {
    let snapshot: GroupSnapshot = serde_json::from_str(INLINE_BAD_SPLITS).unwrap();
    let engine = SettlementEngine::new(Config {
        malformed_split_policy: MalformedSplitPolicy::Skip,
        ..Default::default()
    })
    .unwrap();

    let summary = engine.summarize(&snapshot).unwrap();

    assert_eq!(summary.skipped_expenses, vec!["e-bad".to_string()]);
    assert_eq!(summary.stats.expense_count, 1);
    assert_eq!(summary.settlements.len(), 1);
    assert_eq!(summary.settlements[0].from_member_id, MemberId::new("b"));
    assert_eq!(summary.settlements[0].amount, dollars(20));
}

#[test]
fn test_equal_split_expense_settles_to_the_cent() {
    let members = roster(&["A", "B", "C"]);
    let ids: Vec<MemberId> = members.iter().map(|m| m.id.clone()).collect();
    let splits = equal_split(dollars(100), &ids, 2).unwrap();
    let expense = Expense::new("exp-1", "B", dollars(100), splits);

    let sheet = BalanceCalculator::default()
        .compute_balances(&members, &[expense])
        .unwrap();
    assert_eq!(sheet.net_total(), Decimal::ZERO);

    // A carries the leftover cent: owes 33.34, C owes 33.33
    assert_eq!(sheet.net_amount(&MemberId::new("A")), Decimal::new(-3334, 2));
    assert_eq!(sheet.net_amount(&MemberId::new("C")), Decimal::new(-3333, 2));

    let transfers = SettlementPlanner::default().plan_settlements(&sheet.to_vec());
    assert_eq!(transfers.len(), 2);
    assert_eq!(transfers[0].from_member_id, MemberId::new("A"));
}

#[test]
fn test_independent_groups_in_parallel() {
    let engine = SettlementEngine::new(Config::default()).unwrap();
    let groups: Vec<GroupSnapshot> = (0..8)
        .map(|g| GroupSnapshot {
            group_id: format!("g-{}", g),
            members: roster(&["A", "B"]),
            expenses: vec![Expense::new(
                "lunch",
                "A",
                dollars(10 + g),
                vec![Split::new("B", dollars(10 + g))],
            )],
            payments: vec![],
        })
        .collect();

    let amounts: Vec<Decimal> = std::thread::scope(|scope| {
        let handles: Vec<_> = groups
            .iter()
            .map(|group| {
                let engine = &engine;
                scope.spawn(move || engine.settlements(group).unwrap()[0].amount)
            })
            .collect();

        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let expected: Vec<Decimal> = (0..8).map(|g| dollars(10 + g)).collect();
    assert_eq!(amounts, expected);
}
