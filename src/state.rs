use std::sync::Arc;

use crate::analysis::repo::{AnalysisStore, PgAnalysisStore};
use crate::auth::repo::{PgUserStore, UserStore};
use crate::config::AppConfig;
use crate::db;
use crate::mailer::{self, Mailer};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserStore>,
    pub analyses: Arc<dyn AnalysisStore>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let pool = db::connect(&config).await?;
        db::migrate(&pool).await?;

        let users = Arc::new(PgUserStore::new(pool.clone())) as Arc<dyn UserStore>;
        let analyses = Arc::new(PgAnalysisStore::new(pool)) as Arc<dyn AnalysisStore>;
        let mailer = mailer::from_config(&config.email);

        Ok(Self::from_parts(config, users, analyses, mailer))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        users: Arc<dyn UserStore>,
        analyses: Arc<dyn AnalysisStore>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            config,
            users,
            analyses,
            mailer,
        }
    }
}
