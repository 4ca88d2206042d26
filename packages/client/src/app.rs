//! Application shell.

use std::sync::Arc;

use tokio::task::JoinHandle;
use unihub_shared::time::{Clock, SystemClock};
use url::Url;

use crate::{
    chat::ChatPanel,
    endpoint::{EndpointResolver, LOCAL_DEV_WS_PORT, TokenStore},
    error::ClientError,
    manager::ConnectionManager,
    store::{AppContext, MemberProfile},
    transport::{Connector, WsConnector},
};

/// Everything the shell needs to start
pub struct AppOptions {
    /// Explicit realtime endpoint; derived from `page_origin` when absent
    pub ws_url: Option<String>,
    /// `None` runs headless: no realtime connection is made
    pub page_origin: Option<Url>,
    pub dev_port: u16,
    pub tokens: Arc<dyn TokenStore>,
    pub connector: Arc<dyn Connector>,
    pub clock: Arc<dyn Clock>,
}

impl AppOptions {
    pub fn new(page_origin: Option<Url>, tokens: Arc<dyn TokenStore>) -> Self {
        Self {
            ws_url: None,
            page_origin,
            dev_port: LOCAL_DEV_WS_PORT,
            tokens,
            connector: Arc::new(WsConnector),
            clock: Arc::new(SystemClock),
        }
    }
}

pub struct App {
    ctx: AppContext,
    manager: ConnectionManager,
    task: JoinHandle<()>,
    tokens: Arc<dyn TokenStore>,
}

impl App {
    /// Spawn the connection manager and make the first connection attempt.
    pub async fn start(options: AppOptions) -> Self {
        let ctx = AppContext::new();
        let resolver = EndpointResolver::new(
            options.ws_url,
            options.page_origin,
            Arc::clone(&options.tokens),
        )
        .with_dev_port(options.dev_port);
        let (manager, task) = ConnectionManager::spawn(
            ctx.clone(),
            options.connector,
            resolver,
            options.clock,
        );
        manager.connect().await;
        tracing::info!("Application started");

        Self {
            ctx,
            manager,
            task,
            tokens: options.tokens,
        }
    }

    pub fn context(&self) -> &AppContext {
        &self.ctx
    }

    pub fn manager(&self) -> &ConnectionManager {
        &self.manager
    }

    pub fn mount_chat(&self) -> ChatPanel {
        ChatPanel::mount(self.ctx.clone(), &self.manager)
    }

    /// Sign in: persist the token, publish the profile and reconnect so the
    /// endpoint sees the new credential.
    pub async fn login(
        &self,
        profile: MemberProfile,
        token: Option<&str>,
    ) -> Result<(), ClientError> {
        if let Some(token) = token {
            self.tokens.save_token(token)?;
        }
        tracing::info!("Signed in as {}", profile.nickname);
        self.ctx.current_user.set(Some(profile));
        self.manager.teardown().await;
        self.manager.connect().await;
        Ok(())
    }

    /// Sign out: forget the token and profile and drop the connection.
    pub async fn logout(&self) -> Result<(), ClientError> {
        self.ctx.current_user.set(None);
        self.manager.teardown().await;
        self.tokens.clear_token()?;
        tracing::info!("Signed out");
        Ok(())
    }

    pub async fn shutdown(self) {
        self.manager.shutdown().await;
        if let Err(e) = self.task.await {
            tracing::error!("Connection manager task failed: {}", e);
        }
        tracing::info!("Application stopped");
    }
}
