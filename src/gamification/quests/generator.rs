//! Periodic quest generation from catalog templates

use std::collections::{BTreeMap, HashSet};

use rusqlite::Connection;
use tracing::{debug, info};
use uuid::Uuid;

use super::LIVE;
use crate::catalog::QuestTemplate;
use crate::db::to_millis;
use crate::domain::QuestType;
use crate::error::Result;
use crate::gamification::Session;
use crate::period::{period_ordinal, quest_period};

/// Pick `need` templates, one per category before any category repeats.
///
/// `rotation` shifts both the category order and the order inside each
/// category so consecutive periods surface different templates.
pub fn select_templates<'a>(candidates: &[&'a QuestTemplate], need: usize, rotation: u64) -> Vec<&'a QuestTemplate> {
    let mut by_category: BTreeMap<&str, Vec<&'a QuestTemplate>> = BTreeMap::new();
    for template in candidates {
        by_category
            .entry(template.category.as_str())
            .or_default()
            .push(template);
    }

    let mut groups: Vec<Vec<&'a QuestTemplate>> = by_category.into_values().collect();
    if groups.is_empty() {
        return Vec::new();
    }
    let shift = (rotation % groups.len() as u64) as usize;
    groups.rotate_left(shift);
    for group in &mut groups {
        let shift = (rotation % group.len() as u64) as usize;
        group.rotate_left(shift);
    }

    let mut picked = Vec::with_capacity(need);
    let deepest = groups.iter().map(Vec::len).max().unwrap_or(0);
    'rounds: for round in 0..deepest {
        for group in &groups {
            if picked.len() >= need {
                break 'rounds;
            }
            if let Some(template) = group.get(round) {
                picked.push(*template);
            }
        }
    }
    picked
}

/// Template keys of live quests of one type
fn live_templates(conn: &Connection, quest_type: QuestType, now: i64) -> Result<HashSet<String>> {
    let sql = format!("SELECT q.template_key FROM quests q WHERE q.quest_type = ?1 AND {LIVE}");
    let mut stmt = conn.prepare(&sql)?;
    let keys = stmt
        .query_map((quest_type, now), |r| r.get(0))?
        .collect::<rusqlite::Result<HashSet<String>>>()?;
    Ok(keys)
}

/// Live quests of one type, counted per instance
fn live_count(conn: &Connection, quest_type: QuestType, now: i64) -> Result<usize> {
    let sql = format!("SELECT COUNT(*) FROM quests q WHERE q.quest_type = ?1 AND {LIVE}");
    let count: i64 = conn.query_row(&sql, (quest_type, now), |r| r.get(0))?;
    Ok(count as usize)
}

fn instantiate(s: &Session<'_>, template: &QuestTemplate) -> Result<String> {
    let id = Uuid::new_v4().to_string();
    let (start, end) = quest_period(
        template.quest_type,
        s.now,
        s.config.quests.special_duration_days,
    );
    s.conn.execute(
        r#"
        INSERT INTO quests (id, template_key, title, description, quest_type, difficulty, category,
                            target_value, token_reward, xp_reward, start_date, end_date,
                            is_active, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, 1, ?13)
        "#,
        (
            &id,
            &template.key,
            &template.title,
            &template.description,
            template.quest_type,
            template.difficulty,
            &template.category,
            template.target_value,
            template.reward.tokens.normalize().to_string(),
            template.reward.xp as i64,
            to_millis(start),
            to_millis(end),
            to_millis(s.now),
        ),
    )?;
    for trigger in &template.triggers {
        s.conn.execute(
            "INSERT INTO quest_triggers (quest_id, action_type, category) VALUES (?1, ?2, ?3)",
            (&id, &trigger.action_type, &trigger.category),
        )?;
    }
    Ok(id)
}

/// Top up the live quests of one type to the configured count.
///
/// Does nothing when enough quests are live already. Templates already
/// live are not duplicated. Returns the ids of the new quests.
pub fn generate(s: &mut Session<'_>, quest_type: QuestType) -> Result<Vec<String>> {
    let now = to_millis(s.now);
    let wanted = s.config.quests.count_for(quest_type) as usize;
    let live = live_count(s.conn, quest_type, now)?;
    if live >= wanted {
        debug!("{} live {} quests, nothing to generate", live, quest_type);
        return Ok(Vec::new());
    }

    let taken = live_templates(s.conn, quest_type, now)?;
    let candidates: Vec<&QuestTemplate> = s
        .catalog
        .templates_for(quest_type)
        .filter(|t| !taken.contains(&t.key))
        .collect();
    let chosen = select_templates(&candidates, wanted - live, period_ordinal(quest_type, s.now));

    let mut ids = Vec::with_capacity(chosen.len());
    for template in chosen {
        ids.push(instantiate(s, template)?);
    }
    if !ids.is_empty() {
        info!("Generated {} {} quests", ids.len(), quest_type);
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TriggerDef;
    use crate::domain::{Difficulty, Reward};
    use crate::gamification::quests::tests::Fixture;
    use chrono::Duration;

    fn template(key: &str, category: &str) -> QuestTemplate {
        QuestTemplate {
            key: key.into(),
            title: key.into(),
            description: String::new(),
            quest_type: QuestType::Daily,
            difficulty: Difficulty::Easy,
            category: category.into(),
            target_value: 1,
            reward: Reward::default(),
            triggers: vec![TriggerDef {
                action_type: "item_listed".into(),
                category: None,
            }],
        }
    }

    #[test]
    fn test_one_per_category_before_repeating() {
        let pool = [
            template("a1", "selling"),
            template("a2", "selling"),
            template("a3", "selling"),
            template("b1", "community"),
            template("c1", "trading"),
        ];
        let refs: Vec<&QuestTemplate> = pool.iter().collect();

        let picked = select_templates(&refs, 3, 0);
        let mut categories: Vec<&str> = picked.iter().map(|t| t.category.as_str()).collect();
        categories.sort_unstable();
        assert_eq!(categories, vec!["community", "selling", "trading"]);

        let picked = select_templates(&refs, 5, 0);
        assert_eq!(picked.len(), 5);
    }

    #[test]
    fn test_rotation_changes_pick() {
        let pool = [template("a1", "selling"), template("a2", "selling")];
        let refs: Vec<&QuestTemplate> = pool.iter().collect();
        let first = select_templates(&refs, 1, 0)[0].key.clone();
        let second = select_templates(&refs, 1, 1)[0].key.clone();
        assert_ne!(first, second);
    }

    #[test]
    fn test_generate_skips_when_enough_live() {
        let fx = Fixture::new();
        fx.run(|s| {
            let ids = generate(s, QuestType::Daily).unwrap();
            assert_eq!(ids.len(), 3);
            assert!(generate(s, QuestType::Daily).unwrap().is_empty());

            let keys = live_templates(s.conn, QuestType::Daily, to_millis(s.now)).unwrap();
            assert_eq!(keys.len(), 3);
        });
    }

    #[test]
    fn test_generated_quests_are_period_bound() {
        let fx = Fixture::new();
        fx.run(|s| {
            let ids = generate(s, QuestType::Weekly).unwrap();
            let quest = crate::gamification::quests::require_quest(s.conn, &ids[0]).unwrap();
            // 2024-03-06 is a Wednesday; the week started on Monday the 4th
            let end = quest.end_date.unwrap();
            assert_eq!(end - quest.start_date, Duration::days(7));
            assert_eq!(quest.start_date.format("%Y-%m-%d").to_string(), "2024-03-04");
        });
    }
}
