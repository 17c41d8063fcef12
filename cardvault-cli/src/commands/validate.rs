//! Validate command - check card fields without saving anything

use anyhow::{bail, Result};
use colored::Colorize;

use cardvault_core::domain::validation::{mask_card_number, validate_all};

use super::print_json;

pub fn run(number: &str, holder: &str, expiry: &str, cvv: &str, json: bool) -> Result<()> {
    let report = validate_all(number, holder, expiry, cvv);

    if json {
        print_json(&serde_json::json!({
            "valid": !report.has_errors(),
            "errors": report,
        }))?;
    } else {
        let fields = [
            ("cardNumber", mask_card_number(number)),
            ("cardHolder", holder.to_string()),
            ("expiryDate", expiry.to_string()),
            ("cvv", "*".repeat(cvv.chars().count())),
        ];
        let errors: Vec<_> = report.errors().collect();
        for (field, shown) in &fields {
            match errors.iter().find(|(name, _)| name == field) {
                Some((_, message)) => {
                    println!("  {} {:<11} {}", "✗".red(), field, message.red())
                }
                None => println!("  {} {:<11} {}", "✓".green(), field, shown.dimmed()),
            }
        }
    }

    if report.has_errors() {
        bail!("Card details are invalid");
    }
    Ok(())
}
