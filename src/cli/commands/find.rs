use crate::config::Config;
use crate::models::{GoalInfo, GoalLink};
use anyhow::Context;
use std::path::Path;
use tokio_util::sync::CancellationToken;

fn print_link(goal: &GoalInfo, link: Option<&GoalLink>) {
    let label = format!(
        "{} vs {} {}'",
        goal.home_team, goal.away_team, goal.minute
    );
    match link {
        Some(link) => {
            println!("• {label}");
            println!("  Replay: {}", link.url);
            println!("  Post:   {}", link.post_url);
            println!("  Title:  {}", link.title);
        }
        None => println!("• {label}: no replay found"),
    }
}

pub async fn cmd_find(config: &Config, goal: GoalInfo) -> anyhow::Result<()> {
    let resolver = crate::build_resolver(config)?;

    let link = resolver
        .resolve_within(&goal, config.resolver.resolve_timeout())
        .await?;

    print_link(&goal, link.as_ref());
    Ok(())
}

pub async fn cmd_batch(config: &Config, path: &Path) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read goals file: {}", path.display()))?;
    let goals: Vec<GoalInfo> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse goals file: {}", path.display()))?;

    let resolver = crate::build_resolver(config)?;

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let links = resolver.resolve_many(&goals, &cancel).await;

    println!("Found {} replay(s) for {} goal(s)", links.len(), goals.len());
    println!("{:-<60}", "");
    for goal in &goals {
        print_link(goal, links.get(&goal.key()));
    }

    Ok(())
}
