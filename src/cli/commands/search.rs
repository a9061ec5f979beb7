use crate::config::Config;
use crate::state::SharedState;

pub async fn cmd_search(config: Config, query: &str) -> anyhow::Result<()> {
    println!("Searching for: {query}");

    let state = SharedState::new(config)?;
    let results = state.upstream.search(query).await?;

    if results.is_empty() {
        println!("No dramas found matching '{query}'");
        return Ok(());
    }

    println!();
    println!("Search Results:");
    println!("{:-<60}", "");

    for item in &results {
        println!("• {} (ID: {})", item.name, item.id);
        if !item.labels.is_empty() {
            println!("  Labels: {}", item.labels.join(", "));
        }
        println!();
    }

    Ok(())
}
