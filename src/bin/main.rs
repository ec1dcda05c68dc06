use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

use post_ops::api::{self, AppState};
use post_ops::cli::{
    build_daily_routine, build_posting_worker, open_store, Cli, Commands,
};
use post_ops::config::Config;
use post_ops::oauth::OAuthClient;
use post_ops::scheduler::Scheduler;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    post_ops::init();
    info!("post-ops v{}", post_ops::VERSION);

    let mut config = Config::from_env();
    if let Some(path) = &cli.config {
        config = Config::from_file(path)?;
    }

    match cli.command {
        Commands::RunOnce { agent_id, date } => {
            let store = open_store(&config).await?;
            let routine = build_daily_routine(store, config)?;
            let base_date = date.unwrap_or_else(|| Utc::now().date_naive());
            let outcome = routine.run(agent_id, base_date).await?;
            println!("{}", serde_json::to_string(&outcome)?);
        }
        Commands::Scheduler { once, once_posts } => {
            let store = open_store(&config).await?;
            let routine = Arc::new(build_daily_routine(store.clone(), config.clone())?);
            let posting = Arc::new(build_posting_worker(store.clone(), config.clone()));
            let scheduler = Scheduler::new(store, config, routine, posting);

            if once {
                for line in scheduler
                    .run_all_agents(Utc::now().date_naive())
                    .await?
                {
                    println!("{line}");
                }
            } else if once_posts {
                for line in scheduler.run_posting_once(Utc::now()).await? {
                    println!("{line}");
                }
            } else {
                scheduler.run().await?;
            }
        }
        Commands::Serve => {
            let store = open_store(&config).await?;
            let oauth_client = OAuthClient::new(config.oauth.clone());
            let state = Arc::new(AppState {
                store,
                config,
                oauth_client,
            });
            api::serve(state).await?;
        }
    }

    Ok(())
}
