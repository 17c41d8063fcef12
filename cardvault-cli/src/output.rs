//! Output formatting utilities

use cardvault_core::domain::validation::mask_card_number;
use cardvault_core::{CardDetails, CreditCard, User, UserDetails};
use chrono::{DateTime, Local, Utc};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, ContentArrangement, Table};

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg.green());
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{}", msg.red());
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn format_time(time: &DateTime<Utc>) -> String {
    time.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

fn owner_label(owner: Option<&User>, user_id: Option<&str>) -> String {
    match (owner, user_id) {
        (Some(user), _) => user.email.clone(),
        (None, Some(id)) => id.to_string(),
        (None, None) => "-".dimmed().to_string(),
    }
}

/// Card table with masked numbers; the CVV is never shown
pub fn card_table(cards: &[CardDetails]) -> Table {
    let mut table = create_table();
    table.set_header(vec!["ID", "Number", "Holder", "Expiry", "Owner", "Created"]);
    for details in cards {
        let card = &details.card;
        let owner = details.user.as_ref().and_then(Option::as_ref);
        table.add_row(vec![
            card.id.clone(),
            mask_card_number(&card.card_number),
            card.card_holder.clone(),
            card.expiry_date.clone(),
            owner_label(owner, card.user_id.as_deref()),
            format_time(&card.created_at),
        ]);
    }
    table
}

pub fn user_table(users: &[UserDetails]) -> Table {
    let mut table = create_table();
    let with_cards = users.iter().any(|u| u.credit_cards.is_some());
    let mut header = vec!["ID", "Email", "Name", "Created"];
    if with_cards {
        header.push("Cards");
    }
    table.set_header(header);

    for details in users {
        let user = &details.user;
        let mut row = vec![
            user.id.clone(),
            user.email.clone(),
            user.name.clone().unwrap_or_default(),
            format_time(&user.created_at),
        ];
        if with_cards {
            let count = details.credit_cards.as_ref().map_or(0, Vec::len);
            row.push(count.to_string());
        }
        table.add_row(row);
    }
    table
}

/// Key/value view of one card
pub fn card_detail(details: &CardDetails) -> Table {
    let card = &details.card;
    let mut table = create_table();
    table.add_row(vec!["ID", card.id.as_str()]);
    table.add_row(vec!["Number".to_string(), card.masked_number()]);
    table.add_row(vec!["Holder", card.card_holder.as_str()]);
    table.add_row(vec!["Expiry", card.expiry_date.as_str()]);
    let owner = details.user.as_ref().and_then(Option::as_ref);
    table.add_row(vec![
        "Owner".to_string(),
        owner_label(owner, card.user_id.as_deref()),
    ]);
    table.add_row(vec!["Created".to_string(), format_time(&card.created_at)]);
    table.add_row(vec!["Updated".to_string(), format_time(&card.updated_at)]);
    table
}

pub fn user_detail(details: &UserDetails) -> Table {
    let user = &details.user;
    let mut table = create_table();
    table.add_row(vec!["ID", user.id.as_str()]);
    table.add_row(vec!["Email", user.email.as_str()]);
    table.add_row(vec!["Name", user.name.as_deref().unwrap_or("-")]);
    table.add_row(vec!["Created".to_string(), format_time(&user.created_at)]);
    table.add_row(vec!["Updated".to_string(), format_time(&user.updated_at)]);
    table
}

/// Compact list of a user's cards for `user show`
pub fn owned_cards(cards: &[CreditCard]) -> Table {
    let mut table = create_table();
    table.set_header(vec!["ID", "Number", "Holder", "Expiry"]);
    for card in cards {
        table.add_row(vec![
            card.id.clone(),
            card.masked_number(),
            card.card_holder.clone(),
            card.expiry_date.clone(),
        ]);
    }
    table
}
