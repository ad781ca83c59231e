// src/config.rs

use std::{env, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    common::i18n::I18nStore,
    db::{BinRepository, WarehouseRepository},
    services::{bin_service::BinService, warehouse_service::WarehouseService},
};

// Configuração lida do ambiente (.env em desenvolvimento)
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub db_max_connections: u32,
    pub db_acquire_timeout: Duration,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL deve ser definida")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET deve ser definido")?;
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let db_max_connections = match env::var("DB_MAX_CONNECTIONS") {
            Ok(raw) => raw.parse().context("DB_MAX_CONNECTIONS deve ser um número")?,
            Err(_) => 5,
        };
        let acquire_secs: u64 = match env::var("DB_ACQUIRE_TIMEOUT_SECS") {
            Ok(raw) => raw.parse().context("DB_ACQUIRE_TIMEOUT_SECS deve ser um número")?,
            Err(_) => 3,
        };

        Ok(Self {
            database_url,
            jwt_secret,
            bind_addr,
            db_max_connections,
            db_acquire_timeout: Duration::from_secs(acquire_secs),
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub jwt_secret: String,
    pub i18n_store: Arc<I18nStore>,
    pub warehouse_service: WarehouseService,
    pub bin_service: BinService,
}

impl AppState {
    pub async fn new(settings: &Settings) -> anyhow::Result<Self> {
        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(settings.db_max_connections)
            .acquire_timeout(settings.db_acquire_timeout)
            .connect(&settings.database_url)
            .await
            .context("Falha ao conectar ao banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        Self::with_pool(db_pool, settings.jwt_secret.clone())
    }

    // Monta o gráfico de dependências a partir de uma pool pronta
    // (nos testes a pool é "lazy" e nunca chega a conectar).
    pub fn with_pool(db_pool: PgPool, jwt_secret: String) -> anyhow::Result<Self> {
        let i18n_store = Arc::new(I18nStore::load()?);

        let warehouse_repo = WarehouseRepository::new(db_pool.clone());
        let bin_repo = BinRepository::new(db_pool.clone());

        let warehouse_service = WarehouseService::new(warehouse_repo.clone(), db_pool.clone());
        let bin_service = BinService::new(bin_repo, warehouse_repo, db_pool.clone());

        Ok(Self {
            db_pool,
            jwt_secret,
            i18n_store,
            warehouse_service,
            bin_service,
        })
    }
}
