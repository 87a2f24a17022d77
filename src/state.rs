use crate::{
    config::Config,
    github::{GithubApi, GithubClient},
    guards::limit_guard::Cooldown,
    store::{DataRepo, DataStore, GithubStore, MemoryStore},
};

/// Shared by every request through Rocket's managed state.
pub struct AppState {
    pub store: Box<dyn DataStore>,
    pub github: Box<dyn GithubApi>,
    pub cooldown: Cooldown,
    pub config: Config,
}

impl AppState {
    pub fn new(config: Config, store: Box<dyn DataStore>, github: Box<dyn GithubApi>) -> Self {
        AppState {
            store,
            github,
            cooldown: Cooldown::default(),
            config,
        }
    }

    /// Wires the real GitHub adapters, or an in-memory store when no data repository is set.
    pub fn live(config: Config) -> Self {
        let store: Box<dyn DataStore> = match &config.data_repo {
            Some(repo) => {
                tracing::info!(repo = %repo.repo, branch = %repo.branch, "using GitHub data repository");
                Box::new(GithubStore::new(&config.api_url, repo))
            }
            None => {
                tracing::warn!("DATA_REPO not set, data is kept in memory and lost on restart");
                Box::new(MemoryStore::new())
            }
        };
        let github = Box::new(GithubClient::new(&config));
        AppState::new(config, store, github)
    }

    pub fn repo(&self) -> DataRepo<'_> {
        DataRepo::new(self.store.as_ref())
    }
}
