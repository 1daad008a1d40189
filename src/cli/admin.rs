//! admin subcommands: direct ledger access

use anyhow::Result;
use clap::Subcommand;
use rust_decimal::Decimal;

use questline::{Engine, UserId};

use super::print_json;

#[derive(Subcommand)]
pub enum AdminCommand {
    /// Award tokens and/or XP
    Award {
        user: String,
        #[arg(long, default_value = "0")]
        tokens: Decimal,
        #[arg(long, default_value_t = 0)]
        xp: u64,
        #[arg(long, default_value = "admin award")]
        reason: String,
    },

    /// Deduct tokens
    Deduct {
        user: String,
        amount: Decimal,
        #[arg(long, default_value = "admin deduction")]
        reason: String,
    },

    /// Overwrite balance and XP
    Set {
        user: String,
        #[arg(long)]
        tokens: Decimal,
        #[arg(long)]
        xp: u64,
        #[arg(long, default_value = "admin adjustment")]
        reason: String,
    },

    /// Recompute balance and XP from the journal
    Reconcile { user: String },

    /// Show journal entries, newest first
    History {
        user: String,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Re-lock an unlocked achievement
    ResetAchievement { user: String, key: String },
}

pub fn admin_command(engine: &Engine, command: AdminCommand) -> Result<()> {
    match command {
        AdminCommand::Award {
            user,
            tokens,
            xp,
            reason,
        } => {
            let user = UserId::from(user);
            let change = if xp == 0 {
                engine.award_tokens(&user, tokens, &reason)?;
                None
            } else {
                engine.award_tokens_and_xp(&user, tokens, xp, &reason)?
            };
            if let Some(change) = change {
                print_json(&change)?;
            }
            print_json(&engine.get_user_statistics(&user)?)
        }
        AdminCommand::Deduct {
            user,
            amount,
            reason,
        } => print_json(&engine.deduct_tokens(&UserId::from(user), amount, &reason)?),
        AdminCommand::Set {
            user,
            tokens,
            xp,
            reason,
        } => {
            let user = UserId::from(user);
            engine.set_absolute(&user, tokens, xp, &reason)?;
            print_json(&engine.get_user_statistics(&user)?)
        }
        AdminCommand::Reconcile { user } => print_json(&engine.reconcile(&UserId::from(user))?),
        AdminCommand::History { user, limit } => {
            print_json(&engine.ledger_history(&UserId::from(user), limit)?)
        }
        AdminCommand::ResetAchievement { user, key } => {
            print_json(&engine.reset_achievement(&UserId::from(user), &key)?)
        }
    }
}
