//! Quest progress, completion and reward claims

use tracing::{debug, info};

use super::{load_assignment, require_quest, LIVE};
use crate::db::to_millis;
use crate::domain::{
    actions, ActivityEvent, ClaimOutcome, GamificationEvent, NotEligibleReason, ProgressUpdate, UserId,
};
use crate::error::Result;
use crate::gamification::{achievements, ledger, Session};

/// Add `delta` to one quest instance, completing it at the target.
///
/// Progress is clamped to `target_value`. Returns `None` when nothing
/// changed: the quest is not held, already complete or no longer live.
pub fn record_progress(
    s: &mut Session<'_>,
    user_id: &UserId,
    quest_id: &str,
    delta: u32,
    action_type: &str,
) -> Result<Option<ProgressUpdate>> {
    let quest = require_quest(s.conn, quest_id)?;
    let Some(assignment) = load_assignment(s.conn, user_id, quest_id)? else {
        return Ok(None);
    };
    if delta == 0 || assignment.completed || !quest.is_live(s.now) {
        return Ok(None);
    }

    let progress = assignment
        .progress
        .saturating_add(delta)
        .min(quest.target_value);
    let completed = progress >= quest.target_value;
    let now = to_millis(s.now);
    s.conn.execute(
        r#"
        UPDATE user_quests
        SET current_progress = ?1, is_completed = ?2,
            completed_at = CASE WHEN ?2 THEN ?3 ELSE completed_at END
        WHERE user_id = ?4 AND quest_id = ?5
        "#,
        (progress, completed, now, user_id, quest_id),
    )?;
    debug!(
        "{} progressed '{}' by {} via {}: {}/{}",
        user_id, quest.title, delta, action_type, progress, quest.target_value
    );

    let mut update = ProgressUpdate {
        quest_id: quest_id.to_string(),
        progress,
        target_value: quest.target_value,
        completed,
        claimed: None,
    };
    if !completed {
        return Ok(Some(update));
    }

    info!("{} completed quest '{}'", user_id, quest.title);
    s.emit(GamificationEvent::QuestCompleted {
        quest_id: quest_id.to_string(),
        title: quest.title.clone(),
    });
    if s.config.quests.auto_claim {
        if let ClaimOutcome::Claimed(reward) = claim(s, user_id, quest_id)? {
            update.claimed = Some(reward);
        }
    }
    achievements::check_and_unlock(s, user_id, actions::QUEST_COMPLETED)?;
    Ok(Some(update))
}

/// Fan an activity out to every live quest the user holds whose triggers
/// match its action type and category.
pub fn trigger_by_action(s: &mut Session<'_>, event: &ActivityEvent) -> Result<Vec<ProgressUpdate>> {
    let sql = format!(
        "SELECT DISTINCT uq.quest_id, uq.assigned_at FROM user_quests uq \
         JOIN quests q ON q.id = uq.quest_id \
         JOIN quest_triggers t ON t.quest_id = q.id \
         WHERE uq.user_id = ?1 AND uq.is_completed = 0 AND {LIVE} \
           AND t.action_type = ?3 AND (t.category IS NULL OR t.category = ?4) \
         ORDER BY uq.assigned_at, uq.quest_id"
    );
    let quest_ids = {
        let mut stmt = s.conn.prepare(&sql)?;
        stmt.query_map(
            (&event.user_id, to_millis(s.now), &event.action_type, &event.category),
            |r| r.get::<_, String>(0),
        )?
        .collect::<rusqlite::Result<Vec<_>>>()?
    };

    let mut updates = Vec::new();
    for quest_id in quest_ids {
        if let Some(update) = record_progress(s, &event.user_id, &quest_id, event.value, &event.action_type)? {
            updates.push(update);
        }
    }
    Ok(updates)
}

/// Pay out a completed quest exactly once
pub fn claim(s: &mut Session<'_>, user_id: &UserId, quest_id: &str) -> Result<ClaimOutcome> {
    let quest = require_quest(s.conn, quest_id)?;
    let Some(assignment) = load_assignment(s.conn, user_id, quest_id)? else {
        return Ok(ClaimOutcome::NotEligible(NotEligibleReason::NotAssigned));
    };
    if assignment.claimed {
        return Ok(ClaimOutcome::NotEligible(NotEligibleReason::AlreadyClaimed));
    }
    if !assignment.completed {
        return Ok(ClaimOutcome::NotEligible(NotEligibleReason::NotCompleted));
    }

    let marked = s.conn.execute(
        r#"
        UPDATE user_quests SET date_claimed = ?1
        WHERE user_id = ?2 AND quest_id = ?3 AND date_claimed IS NULL
        "#,
        (to_millis(s.now), user_id, quest_id),
    )?;
    if marked == 0 {
        return Ok(ClaimOutcome::NotEligible(NotEligibleReason::AlreadyClaimed));
    }

    if !quest.reward.is_zero() {
        ledger::award_reward(s, user_id, quest.reward, &format!("quest:{}", quest_id))?;
    }
    info!(
        "{} claimed '{}': {} tokens, {} XP",
        user_id, quest.title, quest.reward.tokens, quest.reward.xp
    );
    s.emit(GamificationEvent::QuestClaimed {
        quest_id: quest_id.to_string(),
        reward: quest.reward,
    });
    Ok(ClaimOutcome::Claimed(quest.reward))
}
