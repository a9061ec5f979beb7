use crate::api::EpisodePayload;
use crate::config::Config;
use crate::state::SharedState;

pub async fn cmd_resolve(config: Config, id: &str, episode: Option<&str>) -> anyhow::Result<()> {
    let state = SharedState::new(config)?;
    let resolution = state.resolver.resolve(id, episode).await?;

    let payload = EpisodePayload::from(&resolution);
    println!("{}", serde_json::to_string_pretty(&payload)?);

    if resolution.selected().is_none() {
        eprintln!("⚠ Title {id} has no episodes");
    }

    Ok(())
}
