//! Card commands - list, show, add, update and remove credit cards

use anyhow::{bail, Result};
use clap::Subcommand;
use colored::Colorize;
use dialoguer::{Confirm, Input};

use cardvault_core::domain::validation::{
    format_card_number, format_expiry, validate_all, validate_card_holder, validate_card_number,
    validate_cvv, validate_expiry_date,
};
use cardvault_core::{CardPatch, CardQuery, Entity, LogEvent, NewCard};

use super::{get_context, get_logger, log_event, print_json};
use crate::output;

#[derive(Subcommand)]
pub enum CardCommands {
    /// List cards, newest first
    List {
        /// Only cards owned by this user ID
        #[arg(long)]
        user: Option<String>,
        /// Include each card's owner
        #[arg(long)]
        owners: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a single card
    Show {
        /// Card ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a card (prompts for any field not given)
    Add {
        #[arg(long)]
        number: Option<String>,
        #[arg(long)]
        holder: Option<String>,
        /// Expiry date (MM/YY)
        #[arg(long)]
        expiry: Option<String>,
        #[arg(long)]
        cvv: Option<String>,
        /// Owner user ID
        #[arg(long)]
        user: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Update fields of a card
    Update {
        /// Card ID
        id: String,
        #[arg(long)]
        number: Option<String>,
        #[arg(long)]
        holder: Option<String>,
        /// Expiry date (MM/YY)
        #[arg(long)]
        expiry: Option<String>,
        #[arg(long)]
        cvv: Option<String>,
        /// Move the card to this user ID
        #[arg(long, conflicts_with = "no_user")]
        user: Option<String>,
        /// Detach the card from its owner
        #[arg(long)]
        no_user: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a card
    Remove {
        /// Card ID
        id: String,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub async fn run(command: CardCommands) -> Result<()> {
    match command {
        CardCommands::List { user, owners, json } => run_list(user, owners, json).await,
        CardCommands::Show { id, json } => run_show(&id, json).await,
        CardCommands::Add {
            number,
            holder,
            expiry,
            cvv,
            user,
            json,
        } => {
            let card = NewCard {
                card_number: number,
                card_holder: holder,
                expiry_date: expiry,
                cvv,
                user_id: user,
            };
            run_add(card, json).await
        }
        CardCommands::Update {
            id,
            number,
            holder,
            expiry,
            cvv,
            user,
            no_user,
            json,
        } => {
            let patch = CardPatch {
                card_number: number,
                card_holder: holder,
                expiry_date: expiry,
                cvv,
                user_id: if no_user { Some(None) } else { user.map(Some) },
            };
            run_update(&id, patch, json).await
        }
        CardCommands::Remove { id, force, json } => run_remove(&id, force, json).await,
    }
}

async fn run_list(user: Option<String>, owners: bool, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let query = CardQuery {
        user_id: user,
        include_owner: owners,
    };
    let cards = ctx.store.list_cards(&query).await?;

    if json {
        return print_json(&cards);
    }
    if cards.is_empty() {
        println!("No cards found.");
        return Ok(());
    }

    println!("{}", output::card_table(&cards));
    println!("{}", format!("{} card(s)", cards.len()).dimmed());
    Ok(())
}

async fn run_show(id: &str, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let card = ctx.store.get_card(id, true).await?;

    if json {
        return print_json(&card);
    }
    println!("{}", output::card_detail(&card));
    Ok(())
}

/// Ask for a value until `validate` accepts it
fn prompt(label: &str, validate: fn(&str) -> String) -> Result<String> {
    let value = Input::<String>::new()
        .with_prompt(label)
        .validate_with(|input: &String| -> std::result::Result<(), String> {
            match validate(input) {
                message if message.is_empty() => Ok(()),
                message => Err(message),
            }
        })
        .interact_text()?;
    Ok(value)
}

/// Normalize entered values the way the form fields do
fn normalize(card: &mut NewCard) {
    if let Some(number) = card.card_number.as_mut() {
        *number = format_card_number(number).replace(' ', "");
    }
    if let Some(expiry) = card.expiry_date.as_mut() {
        *expiry = format_expiry(expiry);
    }
}

async fn run_add(mut card: NewCard, json: bool) -> Result<()> {
    if !json {
        if card.card_number.is_none() {
            card.card_number = Some(prompt("Card number", validate_card_number)?);
        }
        if card.card_holder.is_none() {
            card.card_holder = Some(prompt("Card holder", validate_card_holder)?);
        }
        if card.expiry_date.is_none() {
            card.expiry_date = Some(prompt("Expiry (MM/YY)", validate_expiry_date)?);
        }
        if card.cvv.is_none() {
            card.cvv = Some(prompt("CVV", validate_cvv)?);
        }
    }

    let report = validate_all(
        card.card_number.as_deref().unwrap_or_default(),
        card.card_holder.as_deref().unwrap_or_default(),
        card.expiry_date.as_deref().unwrap_or_default(),
        card.cvv.as_deref().unwrap_or_default(),
    );
    if report.has_errors() {
        if json {
            print_json(&report)?;
        } else {
            for (field, message) in report.errors() {
                output::error(&format!("{}: {}", field, message));
            }
        }
        bail!("Card not saved, fix the fields above");
    }
    normalize(&mut card);

    let ctx = get_context()?;
    let logger = get_logger();
    let created = match ctx.store.create_card(card).await {
        Ok(created) => created,
        Err(e) => {
            log_event(
                &logger,
                LogEvent::new("card_create_failed")
                    .with_entity(Entity::Card)
                    .with_command("card add")
                    .with_error(e.to_string()),
            );
            return Err(e.into());
        }
    };
    log_event(
        &logger,
        LogEvent::new("card_create")
            .with_record(Entity::Card, &created.card.id)
            .with_command("card add"),
    );

    if json {
        return print_json(&created);
    }
    output::success(&format!("Card {} added", created.card.masked_number()));
    println!("  ID: {}", created.card.id);
    Ok(())
}

/// Check only the fields being changed
fn validate_patch(patch: &CardPatch) -> Vec<(&'static str, String)> {
    let checks: [(&'static str, &Option<String>, fn(&str) -> String); 4] = [
        ("cardNumber", &patch.card_number, validate_card_number),
        ("cardHolder", &patch.card_holder, validate_card_holder),
        ("expiryDate", &patch.expiry_date, validate_expiry_date),
        ("cvv", &patch.cvv, validate_cvv),
    ];
    checks
        .into_iter()
        .filter_map(|(field, value, validate)| {
            let message = validate(value.as_deref()?);
            (!message.is_empty()).then_some((field, message))
        })
        .collect()
}

async fn run_update(id: &str, mut patch: CardPatch, json: bool) -> Result<()> {
    if patch.is_empty() {
        bail!("Nothing to update, pass at least one field");
    }
    let problems = validate_patch(&patch);
    if !problems.is_empty() {
        for (field, message) in &problems {
            output::error(&format!("{}: {}", field, message));
        }
        bail!("Card not updated, fix the fields above");
    }
    if let Some(number) = patch.card_number.as_mut() {
        *number = number.split_whitespace().collect();
    }

    let ctx = get_context()?;
    let logger = get_logger();
    let result = ctx.store.update_card(id, patch).await;
    let event = match &result {
        Ok(_) => LogEvent::new("card_update").with_record(Entity::Card, id),
        Err(e) => LogEvent::new("card_update_failed")
            .with_record(Entity::Card, id)
            .with_error(e.to_string()),
    };
    log_event(&logger, event.with_command("card update"));
    let updated = result?;

    if json {
        return print_json(&updated);
    }
    output::success("Card updated");
    println!("{}", output::card_detail(&updated));
    Ok(())
}

async fn run_remove(id: &str, force: bool, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let card = ctx.store.get_card(id, false).await?;

    if !force && !json {
        println!(
            "\n{}",
            format!(
                "This will delete card {} ({}).",
                card.card.masked_number(),
                card.card.card_holder
            )
            .yellow()
        );
        if !Confirm::new()
            .with_prompt("Are you sure?")
            .default(false)
            .interact()?
        {
            println!("{}", "Cancelled".dimmed());
            return Ok(());
        }
    }

    let deleted = ctx.store.delete_card(id).await?;
    log_event(
        &get_logger(),
        LogEvent::new("card_delete")
            .with_record(Entity::Card, id)
            .with_command("card remove"),
    );

    if json {
        return print_json(&deleted);
    }
    output::success(&deleted.message);
    Ok(())
}
