//! AppBuilder - アプリケーションの構築とワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast 設計）
//! - ports の差し替え（テストでは Clock / Enhancer / Fetcher を注入）

use std::sync::Arc;

use tracing::info;

use super::manager::TaskManager;
use super::reaper_loop::{ReaperHandle, ReaperLoop};
use super::worker_loop::{WorkerDeps, WorkerPool};
use crate::config::ServiceConfig;
use crate::impls::{HttpFetcher, InMemoryWorkQueue, LanczosUpscaler};
use crate::ports::{
    Clock, Enhancer, FetchError, IdGenerator, ImageFetcher, SystemClock, UlidGenerator, WorkQueue,
};
use crate::store::TaskStore;

/// AppBuilder はアプリケーションを構築
///
/// # 使用例
/// ```ignore
/// let app = AppBuilder::new(ServiceConfig::default())
///     .enhancer(Arc::new(MyModel::load()?))
///     .build()?;
/// let running = app.start();
/// ```
///
/// 差し替えなかった ports は既定の実装になる:
/// SystemClock, LanczosUpscaler, HttpFetcher, InMemoryWorkQueue, UlidGenerator
pub struct AppBuilder {
    config: ServiceConfig,
    clock: Option<Arc<dyn Clock>>,
    enhancer: Option<Arc<dyn Enhancer>>,
    fetcher: Option<Arc<dyn ImageFetcher>>,
    queue: Option<Arc<dyn WorkQueue>>,
    ids: Option<Arc<dyn IdGenerator>>,
}

/// BuildError はアプリケーション構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("worker count must be at least 1")]
    InvalidWorkerCount,

    #[error("{0} must be greater than zero")]
    InvalidInterval(&'static str),

    #[error("could not initialise the image fetcher: {0}")]
    Fetcher(#[from] FetchError),
}

impl AppBuilder {
    pub fn new(config: ServiceConfig) -> Self {
        Self {
            config,
            clock: None,
            enhancer: None,
            fetcher: None,
            queue: None,
            ids: None,
        }
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn enhancer(mut self, enhancer: Arc<dyn Enhancer>) -> Self {
        self.enhancer = Some(enhancer);
        self
    }

    pub fn fetcher(mut self, fetcher: Arc<dyn ImageFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// A custom queue replaces `queue_capacity` handling entirely.
    pub fn queue(mut self, queue: Arc<dyn WorkQueue>) -> Self {
        self.queue = Some(queue);
        self
    }

    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    /// # 検証
    /// - workers >= 1
    /// - poll_interval / reaper_interval > 0
    pub fn build(self) -> Result<App, BuildError> {
        let config = self.config;
        if config.workers == 0 {
            return Err(BuildError::InvalidWorkerCount);
        }
        if config.poll_interval().is_zero() {
            return Err(BuildError::InvalidInterval("poll_interval_ms"));
        }
        if config.reaper_interval().is_zero() {
            return Err(BuildError::InvalidInterval("reaper_interval_secs"));
        }

        let clock: Arc<dyn Clock> = match self.clock {
            Some(clock) => clock,
            None => Arc::new(SystemClock),
        };
        let enhancer: Arc<dyn Enhancer> = match self.enhancer {
            Some(enhancer) => enhancer,
            None => {
                let upscaler = LanczosUpscaler::new(config.upscale_factor);
                info!(factor = upscaler.factor(), "using the default upscaler");
                Arc::new(upscaler)
            }
        };
        let fetcher: Arc<dyn ImageFetcher> = match self.fetcher {
            Some(fetcher) => fetcher,
            None => Arc::new(HttpFetcher::new(config.fetch_timeout(), config.max_fetch_bytes)?),
        };
        let queue: Arc<dyn WorkQueue> = match self.queue {
            Some(queue) => queue,
            None => Arc::new(InMemoryWorkQueue::with_capacity(config.queue_capacity)),
        };
        let ids: Arc<dyn IdGenerator> = match self.ids {
            Some(ids) => ids,
            None => Arc::new(UlidGenerator::new(clock.clone())),
        };

        let store = Arc::new(TaskStore::new(clock));
        let manager = Arc::new(TaskManager::new(
            store.clone(),
            queue.clone(),
            ids,
            config.workers,
            enhancer.name(),
        ));

        Ok(App {
            manager,
            deps: WorkerDeps {
                store,
                queue,
                enhancer,
                fetcher,
                poll_interval: config.poll_interval(),
            },
            config,
        })
    }
}

/// Wired but not yet running. Tasks can be submitted before `start`; they
/// wait in the queue.
pub struct App {
    manager: Arc<TaskManager>,
    deps: WorkerDeps,
    config: ServiceConfig,
}

impl App {
    pub fn manager(&self) -> &Arc<TaskManager> {
        &self.manager
    }

    /// Spawn the worker pool and the reaper. Must be called inside a tokio runtime.
    pub fn start(self) -> RunningApp {
        let workers = WorkerPool::spawn(self.config.workers, self.deps.clone());
        let reaper = ReaperLoop::new(
            self.deps.store.clone(),
            self.config.reaper_interval(),
            self.config.retention_policy(),
        )
        .spawn();

        info!(
            workers = self.config.workers,
            queue_capacity = ?self.config.queue_capacity,
            "task manager running"
        );
        RunningApp {
            manager: self.manager,
            workers,
            reaper,
        }
    }
}

pub struct RunningApp {
    manager: Arc<TaskManager>,
    workers: WorkerPool,
    reaper: ReaperHandle,
}

impl RunningApp {
    pub fn manager(&self) -> &Arc<TaskManager> {
        &self.manager
    }

    /// Stop taking tasks, let in-flight ones finish, then stop the reaper.
    pub async fn shutdown(self) {
        self.workers.shutdown_and_join().await;
        self.reaper.shutdown().await;
        info!("task manager stopped");
    }
}
