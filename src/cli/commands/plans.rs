//! Plans command implementation

use crate::plan::{all_plans, TokenPolicy};
use anyhow::Result;

/// Print the plan catalog
pub fn run_plans_command(json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(all_plans())?);
        return Ok(());
    }

    println!(
        "{:<18} {:>4} {:>9} {:>10} {:>9} {:>9}",
        "PLAN", "RANK", "PRODUCTS", "LANGUAGES", "TOKENS", "PRICE"
    );
    for plan in all_plans() {
        let tokens = match plan.token_policy {
            TokenPolicy::None => "-",
            TokenPolicy::Metered => "metered",
            TokenPolicy::Included => "included",
        };
        println!(
            "{:<18} {:>4} {:>9} {:>10} {:>9} {:>9}",
            plan.key,
            plan.rank,
            plan.product_limit,
            plan.language_limit,
            tokens,
            format!("${:.2}", plan.price_usd)
        );
    }
    Ok(())
}
