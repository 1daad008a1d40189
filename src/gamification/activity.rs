//! Activity log: the history achievement counters read from

use super::Session;
use crate::db::to_millis;
use crate::domain::ActivityEvent;
use crate::error::Result;
use crate::period::day_bucket;

/// Append an emitted activity to the log
pub fn record(s: &Session<'_>, event: &ActivityEvent) -> Result<i64> {
    let payload = event
        .payload
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    s.conn.execute(
        r#"
        INSERT INTO activity_log (user_id, action_type, value, category, payload, created_at, day_bucket)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
        (
            &event.user_id,
            &event.action_type,
            event.value,
            &event.category,
            payload,
            to_millis(s.now),
            day_bucket(s.now),
        ),
    )?;
    Ok(s.conn.last_insert_rowid())
}
