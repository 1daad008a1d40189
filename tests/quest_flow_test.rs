//! Integration tests for quest generation, progress and claiming

mod common;

use rust_decimal_macros::dec;

use questline::{
    actions, ActivityEvent, ClaimOutcome, GamificationEvent, NotEligibleReason, QuestState,
    QuestType, StartOutcome, UserId,
};

fn list_item(user: &UserId) -> ActivityEvent {
    ActivityEvent::new(user.clone(), actions::ITEM_LISTED, 1)
}

#[test]
fn test_three_listings_complete_and_auto_claim_daily_quest() {
    let t = common::engine();
    let user = UserId::from("alice");
    t.register_user(&user).unwrap();
    t.run_maintenance().unwrap();

    let daily: Vec<_> = t
        .get_active_quests(&user)
        .unwrap()
        .into_iter()
        .filter(|q| q.quest_type == QuestType::Daily)
        .collect();
    assert_eq!(daily.len(), 1);
    let quest_id = daily[0].quest_id.clone();

    t.emit_activity(list_item(&user)).unwrap();
    t.emit_activity(list_item(&user)).unwrap();
    let report = t.emit_activity(list_item(&user)).unwrap();
    assert_eq!(report.quests_progressed, 1);
    assert!(report
        .events
        .iter()
        .any(|e| matches!(e, GamificationEvent::QuestClaimed { quest_id: id, .. } if *id == quest_id)));

    let stats = t.get_user_statistics(&user).unwrap();
    assert_eq!(stats.token_balance, dec!(10));
    assert_eq!(stats.xp, 50);

    // Auto-claimed already; a manual claim pays nothing
    assert_eq!(
        t.claim_quest_reward(&user, &quest_id).unwrap(),
        ClaimOutcome::NotEligible(NotEligibleReason::AlreadyClaimed)
    );
    assert_eq!(t.get_user_statistics(&user).unwrap().token_balance, dec!(10));

    let completed = t.get_completed_quests(&user).unwrap();
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].state, QuestState::Claimed);
    assert_eq!(completed[0].progress, 3);
}

#[test]
fn test_progress_delta_is_clamped_to_target() {
    let t = common::engine();
    let user = UserId::from("bob");
    t.register_user(&user).unwrap();
    t.run_maintenance().unwrap();

    let weekly = t
        .get_active_quests(&user)
        .unwrap()
        .into_iter()
        .find(|q| q.quest_type == QuestType::Weekly)
        .unwrap();

    let update = t
        .record_progress(&user, &weekly.quest_id, 50, actions::ITEM_SOLD)
        .unwrap()
        .unwrap();
    assert_eq!(update.progress, update.target_value);
    assert!(update.completed);

    assert!(t
        .record_progress(&user, &weekly.quest_id, 1, actions::ITEM_SOLD)
        .unwrap()
        .is_none());
}

#[test]
fn test_manual_claim_pays_exactly_once_without_auto_claim() {
    let t = common::build(common::test_catalog(), |c| c.quests.auto_claim = false);
    let user = UserId::from("carol");
    t.register_user(&user).unwrap();
    t.run_maintenance().unwrap();

    let quest_id = t
        .get_active_quests(&user)
        .unwrap()
        .into_iter()
        .find(|q| q.quest_type == QuestType::Daily)
        .unwrap()
        .quest_id;

    for _ in 0..3 {
        t.emit_activity(list_item(&user)).unwrap();
    }
    assert_eq!(t.get_user_statistics(&user).unwrap().token_balance, dec!(0));
    assert_eq!(
        t.get_completed_quests(&user).unwrap()[0].state,
        QuestState::Completed
    );

    assert!(t.claim_quest_reward(&user, &quest_id).unwrap().is_claimed());
    assert!(!t.claim_quest_reward(&user, &quest_id).unwrap().is_claimed());
    assert_eq!(t.get_user_statistics(&user).unwrap().token_balance, dec!(10));
}

#[test]
fn test_start_quest_reports_duplicates_and_caps() {
    let t = common::build(common::test_catalog(), |c| c.quests.special_count = 2);
    let user = UserId::from("dave");

    // Generate without assigning: dave is not registered yet
    t.generate_quests(QuestType::Special).unwrap();
    let available = t.get_available_quests(&user).unwrap();
    assert_eq!(available.len(), 1, "only one special template exists");

    let id = available[0].quest_id.clone();
    assert_eq!(t.start_quest(&user, &id).unwrap(), StartOutcome::Started);
    assert_eq!(t.start_quest(&user, &id).unwrap(), StartOutcome::AlreadyStarted);
    assert!(t.get_available_quests(&user).unwrap().is_empty());
}

#[test]
fn test_expired_quests_stop_accepting_progress() {
    let t = common::engine();
    let user = UserId::from("erin");
    t.register_user(&user).unwrap();
    t.run_maintenance().unwrap();

    // Tuesday: Monday's daily quest is over
    t.clock().advance(chrono::Duration::days(1));
    let report = t.emit_activity(list_item(&user)).unwrap();
    assert_eq!(report.quests_progressed, 0);

    let swept = t.run_maintenance().unwrap();
    assert_eq!(swept.quests_expired, 1);
    assert_eq!(swept.quests_generated, 1);
}
