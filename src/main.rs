use anyhow::{Context, Result, anyhow};
use dotenv::dotenv;

use leekstreak::*;

const USAGE: &str = "\
Usage: leekstreak [command]

  run                                   Update every user on schedule (default)
  track <user id> <username> [tz]       Start tracking a user
  update <user id>                      Pull new submissions and update the streak
  resync <user id> [tz]                 Recompute the streak from recent submissions
  rebuild <user id>                     Recompute the streak from stored submissions
  reconcile                             Repair every user's streak history
  timezone <user id> <tz>               Change a user's timezone
  streak <user id>                      Show a user's current streak
  reset <user id>                       Reset a user's streak";

#[tokio::main]
async fn main() -> Result<()> {
    // Begin logger
    env_logger::init();

    dotenv().ok();
    let config = config::Config::from_env()?;

    // Initialize database
    let db = lcdb::Database::open(&config.database_path)
        .with_context(|| format!("Could not open database at {}", config.database_path))?;

    let client = lcapi::client::LeetcodeClient::new(&config)?;
    let service = streak::StreakService::new(client, db, &config);

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let args = args.iter().map(String::as_str).collect::<Vec<_>>();

    match args.as_slice() {
        [] | ["run"] => {
            log::info!("Starting scheduled streak updates every {} hours.",
                config.update_interval_hours);
            schedule::run_forever(&service, config.update_interval_hours).await;
        }
        ["track", user_id, username, timezone @ ..] => {
            let user = models::User::new(user_id, username, timezone.first().copied());
            if !service.track_user(&user)? {
                log::warn!("User {user_id} is already being tracked.");
            }
            println!("{}", service.user(user_id)?);
        }
        ["update", user_id] => {
            let update = service.update_streak(user_id).await?;
            println!("{}", serde_json::to_string_pretty(&update)?);
        }
        ["resync", user_id, timezone @ ..] => {
            let update = service.resync_streak(user_id, timezone.first().copied()).await?;
            println!("{}", serde_json::to_string_pretty(&update)?);
        }
        ["rebuild", user_id] => {
            println!("{}", service.rebuild_streak(user_id).await?);
        }
        ["reconcile"] => {
            let summary = service.reconcile_all_histories()?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        ["timezone", user_id, timezone] => {
            service.set_timezone(user_id, timezone).await?;
            println!("{}", service.user(user_id)?);
        }
        ["streak", user_id] => {
            println!("{}", service.streak(user_id)?);
        }
        ["reset", user_id] => {
            service.reset_streak(user_id).await?;
        }
        _ => return Err(anyhow!("{USAGE}")),
    }

    Ok(())
}
