//! achievements and stats commands

use anyhow::Result;
use serde::Serialize;

use questline::{Engine, StreakView, UserId, UserStatistics};

use super::print_json;

pub fn achievements_command(engine: &Engine, user: &str, stats: bool) -> Result<()> {
    let user = UserId::from(user);
    if stats {
        print_json(&engine.get_achievement_stats(&user)?)
    } else {
        print_json(&engine.get_achievements(&user)?)
    }
}

#[derive(Serialize)]
struct Profile {
    #[serde(flatten)]
    statistics: UserStatistics,
    streaks: Vec<StreakView>,
}

pub fn stats_command(engine: &Engine, user: &str) -> Result<()> {
    let user = UserId::from(user);
    let profile = Profile {
        statistics: engine.get_user_statistics(&user)?,
        streaks: engine.streaks(&user)?,
    };
    print_json(&profile)
}
