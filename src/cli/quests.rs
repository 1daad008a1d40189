//! quests, start and claim commands

use anyhow::Result;
use clap::ValueEnum;

use questline::{Engine, UserId};

use super::print_json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum QuestList {
    Active,
    Completed,
    Available,
}

pub fn list_command(engine: &Engine, user: &str, view: QuestList) -> Result<()> {
    let user = UserId::from(user);
    let quests = match view {
        QuestList::Active => engine.get_active_quests(&user)?,
        QuestList::Completed => engine.get_completed_quests(&user)?,
        QuestList::Available => engine.get_available_quests(&user)?,
    };
    print_json(&quests)
}

pub fn start_command(engine: &Engine, user: &str, quest_id: &str) -> Result<()> {
    let outcome = engine.start_quest(&UserId::from(user), quest_id)?;
    print_json(&outcome)
}

pub fn claim_command(engine: &Engine, user: &str, quest_id: &str) -> Result<()> {
    let outcome = engine.claim_quest_reward(&UserId::from(user), quest_id)?;
    print_json(&outcome)
}
