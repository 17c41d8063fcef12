//! User commands - manage card owners

use anyhow::{bail, Result};
use clap::Subcommand;
use colored::Colorize;
use dialoguer::{Confirm, Input};

use cardvault_core::{Entity, LogEvent, NewUser, UserPatch};

use super::{get_context, get_logger, log_event, print_json};
use crate::output;

#[derive(Subcommand)]
pub enum UserCommands {
    /// List users, newest first
    List {
        /// Include each user's cards
        #[arg(long)]
        cards: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a user and their cards
    Show {
        /// User ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a user
    Add {
        /// Email address (prompted if omitted)
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        name: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Update a user's email or name
    Update {
        /// User ID
        id: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long, conflicts_with = "no_name")]
        name: Option<String>,
        /// Clear the name
        #[arg(long)]
        no_name: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a user together with all their cards
    Remove {
        /// User ID
        id: String,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub async fn run(command: UserCommands) -> Result<()> {
    match command {
        UserCommands::List { cards, json } => run_list(cards, json).await,
        UserCommands::Show { id, json } => run_show(&id, json).await,
        UserCommands::Add { email, name, json } => run_add(email, name, json).await,
        UserCommands::Update {
            id,
            email,
            name,
            no_name,
            json,
        } => {
            let patch = UserPatch {
                email,
                name: if no_name { Some(None) } else { name.map(Some) },
            };
            run_update(&id, patch, json).await
        }
        UserCommands::Remove { id, force, json } => run_remove(&id, force, json).await,
    }
}

async fn run_list(cards: bool, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let users = ctx.store.list_users(cards).await?;

    if json {
        return print_json(&users);
    }
    if users.is_empty() {
        println!("No users found.");
        return Ok(());
    }
    println!("{}", output::user_table(&users));
    Ok(())
}

async fn run_show(id: &str, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let user = ctx.store.get_user(id, true).await?;

    if json {
        return print_json(&user);
    }

    println!("{}", output::user_detail(&user));
    match user.credit_cards.as_deref() {
        Some(cards) if !cards.is_empty() => {
            println!();
            println!("{}", "Cards".bold());
            println!("{}", output::owned_cards(cards));
        }
        _ => println!("{}", "No cards".dimmed()),
    }
    Ok(())
}

async fn run_add(email: Option<String>, name: Option<String>, json: bool) -> Result<()> {
    let email = match email {
        Some(email) => email,
        None if json => bail!("--email is required with --json"),
        None => Input::<String>::new().with_prompt("Email").interact_text()?,
    };

    let ctx = get_context()?;
    let logger = get_logger();
    let result = ctx.store.create_user(NewUser::new(email, name)).await;
    let event = match &result {
        Ok(created) => LogEvent::new("user_create").with_record(Entity::User, &created.user.id),
        Err(e) => LogEvent::new("user_create_failed")
            .with_entity(Entity::User)
            .with_error(e.to_string()),
    };
    log_event(&logger, event.with_command("user add"));
    let created = result?;

    if json {
        return print_json(&created);
    }
    output::success(&format!("User {} added", created.user.email));
    println!("  ID: {}", created.user.id);
    Ok(())
}

async fn run_update(id: &str, patch: UserPatch, json: bool) -> Result<()> {
    if patch.email.is_none() && patch.name.is_none() {
        bail!("Nothing to update, pass --email, --name or --no-name");
    }

    let ctx = get_context()?;
    let logger = get_logger();
    let result = ctx.store.update_user(id, patch).await;
    let event = match &result {
        Ok(_) => LogEvent::new("user_update").with_record(Entity::User, id),
        Err(e) => LogEvent::new("user_update_failed")
            .with_record(Entity::User, id)
            .with_error(e.to_string()),
    };
    log_event(&logger, event.with_command("user update"));
    let updated = result?;

    if json {
        return print_json(&updated);
    }
    output::success("User updated");
    println!("{}", output::user_detail(&updated));
    Ok(())
}

async fn run_remove(id: &str, force: bool, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let user = ctx.store.get_user(id, true).await?;

    if !force && !json {
        let cards = user.credit_cards.as_ref().map_or(0, Vec::len);
        println!(
            "\n{}",
            format!("This will delete {} and their {} card(s).", user.user.email, cards).yellow()
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

    let deleted = ctx.store.delete_user(id).await?;
    log_event(
        &get_logger(),
        LogEvent::new("user_delete")
            .with_record(Entity::User, id)
            .with_command("user remove"),
    );

    if json {
        return print_json(&deleted);
    }
    output::success(&deleted.message);
    Ok(())
}
