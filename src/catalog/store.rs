//! Seeding reference tables from the catalog

use rusqlite::Connection;

use super::Catalog;
use crate::error::Result;

impl Catalog {
    /// Upsert every definition into the reference tables.
    ///
    /// Rows are never deleted: user state keeps referring to retired
    /// definitions after a catalog change.
    pub fn seed(&self, conn: &Connection) -> Result<()> {
        let mut level_stmt = conn.prepare(
            r#"
            INSERT INTO levels (level_number, xp_required, title) VALUES (?1, ?2, ?3)
            ON CONFLICT(level_number) DO UPDATE SET xp_required = ?2, title = ?3
            "#,
        )?;
        for level in &self.levels {
            level_stmt.execute((level.level_number, level.xp_required as i64, &level.title))?;
        }

        let mut streak_stmt = conn.prepare(
            r#"
            INSERT INTO streak_types (key, name, unit, milestone_interval, definition)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(key) DO UPDATE SET
                name = ?2, unit = ?3, milestone_interval = ?4, definition = ?5
            "#,
        )?;
        for streak in &self.streak_types {
            streak_stmt.execute((
                &streak.key,
                &streak.name,
                streak.unit,
                streak.milestone_interval,
                serde_json::to_string(streak)?,
            ))?;
        }

        let mut template_stmt = conn.prepare(
            r#"
            INSERT INTO quest_templates (key, quest_type, category, definition)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(key) DO UPDATE SET quest_type = ?2, category = ?3, definition = ?4
            "#,
        )?;
        for template in &self.quest_templates {
            template_stmt.execute((
                &template.key,
                template.quest_type,
                &template.category,
                serde_json::to_string(template)?,
            ))?;
        }

        let mut achievement_stmt = conn.prepare(
            r#"
            INSERT INTO achievements (key, criteria_type, criteria_value, rarity, is_secret, definition)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(key) DO UPDATE SET
                criteria_type = ?2, criteria_value = ?3, rarity = ?4, is_secret = ?5, definition = ?6
            "#,
        )?;
        for achievement in &self.achievements {
            achievement_stmt.execute((
                &achievement.key,
                &achievement.criteria_type,
                achievement.criteria_value,
                achievement.rarity,
                achievement.is_secret,
                serde_json::to_string(achievement)?,
            ))?;
        }

        tracing::debug!(
            "Seeded catalog: {} levels, {} streak types, {} quest templates, {} achievements",
            self.levels.len(),
            self.streak_types.len(),
            self.quest_templates.len(),
            self.achievements.len()
        );
        Ok(())
    }
}
