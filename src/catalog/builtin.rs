//! Built-in reference data

use once_cell::sync::Lazy;
use rust_decimal::Decimal;

use super::{
    AchievementDef, Catalog, CriteriaParams, LevelDef, QuestTemplate, StreakTypeDef, TriggerDef,
};
use crate::domain::{actions, Difficulty, QuestType, Rarity, Reward, StreakUnit};

pub static BUILTIN: Lazy<Catalog> = Lazy::new(|| Catalog {
    levels: levels(),
    streak_types: streak_types(),
    quest_templates: quest_templates(),
    achievements: achievements(),
});

fn reward(tokens: i64, xp: u64) -> Reward {
    Reward::new(Decimal::from(tokens), xp)
}

fn levels() -> Vec<LevelDef> {
    const TABLE: &[(u64, &str)] = &[
        (0, "Newcomer"),
        (100, "Browser"),
        (250, "Bargain Hunter"),
        (450, "Bargain Hunter"),
        (700, "Trader"),
        (1000, "Trader"),
        (1400, "Merchant"),
        (1900, "Merchant"),
        (2500, "Merchant"),
        (3200, "Dealer"),
        (4000, "Dealer"),
        (5000, "Dealer"),
        (6200, "Broker"),
        (7600, "Broker"),
        (9200, "Broker"),
        (11000, "Tycoon"),
        (13000, "Tycoon"),
        (15500, "Mogul"),
        (18500, "Mogul"),
        (22000, "Market Legend"),
    ];

    TABLE
        .iter()
        .enumerate()
        .map(|(i, (xp, title))| LevelDef {
            level_number: i as u32 + 1,
            xp_required: *xp,
            title: title.to_string(),
        })
        .collect()
}

fn streak_types() -> Vec<StreakTypeDef> {
    vec![
        StreakTypeDef {
            key: "daily_check_in".into(),
            name: "Daily Check-in".into(),
            unit: StreakUnit::Days,
            trigger_actions: vec![actions::CHECK_IN.into()],
            milestone_interval: 7,
            base_reward: reward(2, 5),
            milestone_reward: reward(10, 25),
        },
        StreakTypeDef {
            key: "weekly_seller".into(),
            name: "Weekly Seller".into(),
            unit: StreakUnit::Weeks,
            trigger_actions: vec![actions::ITEM_LISTED.into()],
            milestone_interval: 4,
            base_reward: reward(5, 20),
            milestone_reward: reward(25, 100),
        },
        StreakTypeDef {
            key: "listing_run".into(),
            name: "Listing Run".into(),
            unit: StreakUnit::Items,
            trigger_actions: vec![actions::ITEM_LISTED.into()],
            milestone_interval: 10,
            base_reward: reward(0, 2),
            milestone_reward: reward(5, 20),
        },
        StreakTypeDef {
            key: "trade_run".into(),
            name: "Trade Run".into(),
            unit: StreakUnit::Transactions,
            trigger_actions: vec![actions::TRANSACTION_COMPLETED.into()],
            milestone_interval: 5,
            base_reward: reward(1, 5),
            milestone_reward: reward(10, 50),
        },
    ]
}

#[allow(clippy::too_many_arguments)]
fn template(
    key: &str,
    title: &str,
    description: &str,
    quest_type: QuestType,
    difficulty: Difficulty,
    category: &str,
    target_value: u32,
    reward: Reward,
    triggers: &[(&str, Option<&str>)],
) -> QuestTemplate {
    QuestTemplate {
        key: key.into(),
        title: title.into(),
        description: description.into(),
        quest_type,
        difficulty,
        category: category.into(),
        target_value,
        reward,
        triggers: triggers
            .iter()
            .map(|(action, category)| TriggerDef {
                action_type: action.to_string(),
                category: category.map(str::to_string),
            })
            .collect(),
    }
}

fn quest_templates() -> Vec<QuestTemplate> {
    use Difficulty::*;
    use QuestType::*;

    vec![
        // === DAILY ===
        template("daily_list_items", "List 3 items", "Put three new items up for sale", Daily, Easy, "selling", 3, reward(10, 50), &[(actions::ITEM_LISTED, None)]),
        template("daily_make_sale", "Make a sale", "Sell any item", Daily, Medium, "selling", 1, reward(15, 60), &[(actions::ITEM_SOLD, None)]),
        template("daily_post", "Share something", "Create a community post", Daily, Easy, "community", 1, reward(5, 25), &[(actions::POST_CREATED, None)]),
        template("daily_comments", "Join the conversation", "Leave three comments", Daily, Easy, "community", 3, reward(8, 30), &[(actions::COMMENT_CREATED, None)]),
        template("daily_reactions", "Spread the love", "React to five posts", Daily, Easy, "engagement", 5, reward(5, 20), &[(actions::REACTION_GIVEN, None)]),
        template("daily_show_up", "Show up", "Check in today", Daily, Easy, "engagement", 1, reward(3, 10), &[(actions::CHECK_IN, None)]),
        template("daily_trade", "Close a deal", "Complete a transaction", Daily, Medium, "trading", 1, reward(12, 50), &[(actions::TRANSACTION_COMPLETED, None)]),
        // === WEEKLY ===
        template("weekly_stock_up", "Stock the shelves", "List fifteen items this week", Weekly, Medium, "selling", 15, reward(50, 200), &[(actions::ITEM_LISTED, None)]),
        template("weekly_sales", "Weekly seller", "Sell five items this week", Weekly, Hard, "selling", 5, reward(80, 300), &[(actions::ITEM_SOLD, None)]),
        template("weekly_helpful", "Helping hand", "Have three comments marked helpful", Weekly, Medium, "community", 3, reward(40, 150), &[(actions::COMMENT_MARKED_HELPFUL, None)]),
        template("weekly_posts", "Regular voice", "Create five posts this week", Weekly, Medium, "community", 5, reward(35, 140), &[(actions::POST_CREATED, None)]),
        template("weekly_trades", "Market mover", "Complete five transactions", Weekly, Hard, "trading", 5, reward(75, 300), &[(actions::TRANSACTION_COMPLETED, None)]),
        template("weekly_check_ins", "Every day counts", "Check in on five days", Weekly, Medium, "engagement", 5, reward(30, 120), &[(actions::CHECK_IN, None)]),
        // === SPECIAL ===
        template("special_gadget_fair", "Gadget fair", "List ten electronics items", Special, Hard, "selling", 10, reward(150, 500), &[(actions::ITEM_LISTED, Some("electronics"))]),
        template("special_fashion_week", "Fashion week", "List ten fashion items", Special, Hard, "selling", 10, reward(150, 500), &[(actions::ITEM_LISTED, Some("fashion"))]),
        template("special_spotlight", "Community spotlight", "Write twenty posts or comments", Special, Hard, "community", 20, reward(120, 400), &[(actions::POST_CREATED, None), (actions::COMMENT_CREATED, None)]),
    ]
}

#[allow(clippy::too_many_arguments)]
fn achievement(
    key: &str,
    name: &str,
    description: &str,
    category: &str,
    criteria_type: &str,
    criteria_value: u32,
    params: CriteriaParams,
    reward: Reward,
    rarity: Rarity,
) -> AchievementDef {
    AchievementDef {
        key: key.into(),
        name: name.into(),
        description: description.into(),
        category: category.into(),
        criteria_type: criteria_type.into(),
        criteria_value,
        rarity,
        is_secret: false,
        params,
        reward,
    }
}

fn action(action: &str) -> CriteriaParams {
    CriteriaParams {
        action: Some(action.into()),
        ..Default::default()
    }
}

fn action_in(action: &str, category: &str) -> CriteriaParams {
    CriteriaParams {
        action: Some(action.into()),
        category: Some(category.into()),
        ..Default::default()
    }
}

fn streak(key: &str) -> CriteriaParams {
    CriteriaParams {
        streak_type: Some(key.into()),
        ..Default::default()
    }
}

fn achievements() -> Vec<AchievementDef> {
    use Rarity::*;

    let none = CriteriaParams::default;
    let hard = CriteriaParams {
        difficulty: Some(Difficulty::Hard),
        ..Default::default()
    };

    let mut list = vec![
        // === SELLING ===
        achievement("first_listing", "Open for Business", "List your first item", "selling", "activity_count", 1, action(actions::ITEM_LISTED), reward(5, 10), Common),
        achievement("ten_listings", "Shopkeeper", "List 10 items", "selling", "activity_count", 10, action(actions::ITEM_LISTED), reward(20, 50), Uncommon),
        achievement("fifty_listings", "Warehouse", "List 50 items", "selling", "activity_count", 50, action(actions::ITEM_LISTED), reward(100, 250), Rare),
        achievement("electronics_master", "Gadget Guru", "List 10 electronics items", "mastery", "activity_count", 10, action_in(actions::ITEM_LISTED, "electronics"), reward(50, 150), Rare),
        achievement("fashion_master", "Trendsetter", "List 10 fashion items", "mastery", "activity_count", 10, action_in(actions::ITEM_LISTED, "fashion"), reward(50, 150), Rare),
        // === COMMUNITY ===
        achievement("first_post", "Hello World", "Create your first post", "community", "activity_count", 1, action(actions::POST_CREATED), reward(5, 10), Common),
        achievement("ten_posts", "Storyteller", "Create 10 posts", "community", "activity_count", 10, action(actions::POST_CREATED), reward(25, 60), Uncommon),
        achievement("helpful_five", "Good Samaritan", "Have 5 comments marked helpful", "community", "activity_count", 5, action(actions::COMMENT_MARKED_HELPFUL), reward(30, 80), Uncommon),
        achievement("reactions_25", "Cheerleader", "Give 25 reactions", "community", "activity_count", 25, action(actions::REACTION_GIVEN), reward(10, 40), Common),
        // === TRADING ===
        achievement("first_trade", "Handshake", "Complete your first transaction", "trading", "activity_count", 1, action(actions::TRANSACTION_COMPLETED), reward(10, 20), Common),
        achievement("ten_trades", "Deal Maker", "Complete 10 transactions", "trading", "activity_count", 10, action(actions::TRANSACTION_COMPLETED), reward(50, 150), Rare),
        // === STREAKS ===
        achievement("check_in_7", "On Fire", "Reach a 7-day check-in streak", "streaks", "streak_length", 7, streak("daily_check_in"), reward(20, 70), Uncommon),
        achievement("check_in_30", "Unstoppable", "Reach a 30-day check-in streak", "streaks", "streak_length", 30, streak("daily_check_in"), reward(100, 300), Epic),
        // === QUESTS ===
        achievement("first_quest", "Adventurer", "Complete your first quest", "quests", "quests_completed", 1, none(), reward(5, 15), Common),
        achievement("ten_quests", "Questing Knight", "Complete 10 quests", "quests", "quests_completed", 10, none(), reward(40, 120), Rare),
        achievement("hard_quests_5", "Glutton for Punishment", "Complete 5 hard quests", "quests", "quests_completed", 5, hard, reward(60, 200), Epic),
        // === LEVELS ===
        achievement("level_5", "Rising Star", "Reach level 5", "levels", "level_reached", 5, none(), reward(25, 0), Uncommon),
        achievement("level_10", "Established", "Reach level 10", "levels", "level_reached", 10, none(), reward(75, 0), Epic),
    ];

    // === SECRET ===
    let mut secrets = vec![
        achievement("polymath", "Polymath", "List items in 5 different categories", "secret", "distinct_categories", 5, action(actions::ITEM_LISTED), reward(40, 120), Epic),
        achievement("reaction_storm", "Reaction Storm", "Give 250 reactions", "secret", "activity_count", 250, action(actions::REACTION_GIVEN), reward(100, 300), Legendary),
    ];
    for secret in &mut secrets {
        secret.is_secret = true;
    }
    list.append(&mut secrets);
    list
}
