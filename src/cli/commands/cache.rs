use crate::config::Config;
use crate::models::GoalLinkKey;

pub fn cmd_lookup(config: &Config, match_id: i64, minute: u32) -> anyhow::Result<()> {
    let cache = crate::open_cache(config)?;
    let key = GoalLinkKey::new(match_id, minute);

    match cache.get(key) {
        Some(link) if link.is_not_found() => {
            println!("{key}: searched recently, no replay found");
        }
        Some(link) => {
            println!("{key}: {}", link.url);
            println!("  {}", link.title);
        }
        None => println!("{key}: not cached"),
    }

    Ok(())
}

pub fn cmd_links(config: &Config, match_id: i64) -> anyhow::Result<()> {
    let cache = crate::open_cache(config)?;
    let links = cache.get_all(match_id);

    if links.is_empty() {
        println!("No cached replays for match {match_id}");
        return Ok(());
    }

    println!("Replays for match {match_id}:");
    println!("{:-<60}", "");
    for link in links {
        println!("• {}' {}", link.minute, link.url);
        println!("  {}", link.title);
        println!("  fetched {}", link.fetched_at.format("%Y-%m-%d %H:%M UTC"));
    }

    Ok(())
}

pub fn cmd_clean(config: &Config) -> anyhow::Result<()> {
    let cache = crate::open_cache(config)?;
    let removed = cache.clean_expired()?;
    println!("Removed {removed} expired entr{}", if removed == 1 { "y" } else { "ies" });
    Ok(())
}

pub fn cmd_clear(config: &Config) -> anyhow::Result<()> {
    let cache = crate::open_cache(config)?;
    let count = cache.len();
    cache.clear()?;
    println!("Cleared {count} cached entr{}", if count == 1 { "y" } else { "ies" });
    Ok(())
}
