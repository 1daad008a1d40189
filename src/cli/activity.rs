//! check-in and activity commands

use anyhow::Result;

use questline::{ActivityEvent, Engine, UserId};

use super::print_json;

pub fn check_in_command(engine: &Engine, user: &str) -> Result<()> {
    let outcome = engine.check_in(&UserId::from(user))?;
    print_json(&outcome)
}

pub fn activity_command(
    engine: &Engine,
    user: &str,
    action: &str,
    value: u32,
    category: Option<String>,
) -> Result<()> {
    let mut event = ActivityEvent::new(user, action, value);
    if let Some(category) = category {
        event = event.with_category(category);
    }
    let report = engine.emit_activity(event)?;
    print_json(&report)
}
