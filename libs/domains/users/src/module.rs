//! Wiring of the users domain: services, buses, background worker and the
//! state shared by the HTTP handlers.

use axum::Router;
use axum::extract::FromRef;
use axum_helpers::JwtAuth;
use messaging::{LocalWorker, WorkerConfig};
use std::sync::Arc;
use tracing::info;

use crate::application::commands::*;
use crate::application::queries::AdminUserList;
use crate::application::{CommandBus, CommandHandler, CommandProcessor, QueryBus};
use crate::auth::CredentialResolver;
use crate::config::SecurityConfig;
use crate::error::UserResult;
use crate::events::{EventPublisher, EventSubscriber, LoggingEventSubscriber};
use crate::handlers;
use crate::mailer::{LoggingMailer, Mailer};
use crate::notifications::{LoggingNotifier, UpdateNotifier, UserUpdatePublisher};
use crate::repository::Repositories;
use crate::security::{
    Argon2PasswordHasher, Clock, PasswordHasher, RandomHexTokenGenerator, SystemClock,
    TokenGenerator,
};
use crate::services::{
    AuthTokenService, AuthUserService, ResetPasswordService, UserCommandService,
    UserQueryService, WebAuthService,
};

/// Everything the domain needs from the outside. Capabilities default to
/// the production implementations.
pub struct UsersDeps {
    pub repositories: Repositories,
    pub jwt: Arc<JwtAuth>,
    pub security: SecurityConfig,
    pub hasher: Arc<dyn PasswordHasher>,
    pub generator: Arc<dyn TokenGenerator>,
    pub clock: Arc<dyn Clock>,
    pub mailer: Arc<dyn Mailer>,
    pub notifier: Arc<dyn UpdateNotifier>,
    pub subscribers: Vec<Arc<dyn EventSubscriber>>,
}

impl UsersDeps {
    pub fn new(repositories: Repositories, jwt: JwtAuth, security: SecurityConfig) -> Self {
        Self {
            repositories,
            jwt: Arc::new(jwt),
            security,
            hasher: Arc::new(Argon2PasswordHasher),
            generator: Arc::new(RandomHexTokenGenerator),
            clock: Arc::new(SystemClock),
            mailer: Arc::new(LoggingMailer),
            notifier: Arc::new(LoggingNotifier),
            subscribers: vec![Arc::new(LoggingEventSubscriber)],
        }
    }

    pub fn with_hasher(mut self, hasher: Arc<dyn PasswordHasher>) -> Self {
        self.hasher = hasher;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_mailer(mut self, mailer: Arc<dyn Mailer>) -> Self {
        self.mailer = mailer;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn UpdateNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_subscriber(mut self, subscriber: Arc<dyn EventSubscriber>) -> Self {
        self.subscribers.push(subscriber);
        self
    }
}

/// State shared by the users routes.
#[derive(Clone)]
pub struct UsersState {
    pub commands: Arc<CommandBus>,
    pub queries: Arc<QueryBus>,
    pub resolver: Arc<CredentialResolver>,
}

impl FromRef<UsersState> for Arc<CredentialResolver> {
    fn from_ref(state: &UsersState) -> Self {
        state.resolver.clone()
    }
}

pub struct UsersModule {
    state: UsersState,
    worker: LocalWorker,
}

impl UsersModule {
    /// Builds the services and buses and starts the reset-password worker.
    /// Must run inside a tokio runtime.
    pub fn build(deps: UsersDeps) -> UserResult<Self> {
        let UsersDeps {
            repositories,
            jwt,
            security,
            hasher,
            generator,
            clock,
            mailer,
            notifier,
            subscribers,
        } = deps;

        let events = EventPublisher::new(subscribers, clock.clone());
        let updates = UserUpdatePublisher::new(notifier);

        let tokens = AuthTokenService::new(
            repositories.auth_tokens.clone(),
            generator.clone(),
            clock.clone(),
            security.auth_token_ttl,
        );
        let user_commands = UserCommandService::new(
            repositories.users.clone(),
            hasher.clone(),
            clock.clone(),
            events.clone(),
            updates.clone(),
        );
        let auth = AuthUserService::new(
            repositories.users.clone(),
            tokens.clone(),
            hasher.clone(),
            clock.clone(),
            events,
            updates.clone(),
            user_commands.clone(),
        );
        let reset = ResetPasswordService::new(
            repositories.users.clone(),
            repositories.reset_tokens.clone(),
            generator.clone(),
            hasher,
            clock.clone(),
            mailer,
            security.reset_token_ttl,
            security.mail_from.clone(),
        );
        let web = WebAuthService::new(
            auth.clone(),
            repositories.users.clone(),
            repositories.refresh_tokens.clone(),
            jwt.clone(),
            generator,
            clock.clone(),
            security.refresh_token_ttl,
        );

        let auth = Arc::new(auth);
        let user_commands = Arc::new(user_commands);
        let reset = Arc::new(reset);
        let web = Arc::new(web);

        let mut commands = CommandBus::new();
        commands.register::<RegisterUser>(auth.clone())?;
        commands.register::<RegisterWebUser>(auth.clone())?;
        commands.register::<LoginUser>(auth.clone())?;
        commands.register::<LogoutToken>(auth.clone())?;
        commands.register::<SignOutUser>(auth.clone())?;
        commands.register::<ChangePassword>(auth.clone())?;
        commands.register::<DeleteAccount>(auth)?;
        commands.register::<UpdateProfile>(user_commands.clone())?;
        commands.register::<AdminCreateUser>(user_commands.clone())?;
        commands.register::<AdminUpdateUser>(user_commands.clone())?;
        commands.register::<AdminSoftDeleteUser>(user_commands.clone())?;
        commands.register::<AdminRestoreUser>(user_commands.clone())?;
        commands.register::<AdminForceDeleteUser>(user_commands)?;
        commands.register::<ResetPassword>(reset.clone())?;
        commands.register::<WebLoginCheck>(web.clone())?;
        commands.register::<RefreshWebToken>(web.clone())?;
        commands.register::<WebLogout>(web)?;
        commands.register::<PublishUpdate>(Arc::new(updates))?;

        let reset_handler: Arc<dyn CommandHandler<RequestPasswordReset>> = reset;
        commands.register::<RequestPasswordReset>(reset_handler.clone())?;
        let (reset_queue, worker) = LocalWorker::spawn(
            WorkerConfig::new("reset_password").with_capacity(security.reset_queue_capacity),
            CommandProcessor::new(reset_handler, "reset_password_processor"),
        );
        commands.route_async(reset_queue);

        let mut queries = QueryBus::new();
        queries.register::<AdminUserList>(Arc::new(UserQueryService::new(
            repositories.users.clone(),
        )))?;

        let resolver = CredentialResolver::new(jwt, repositories.users, tokens, clock);

        info!("Users module initialized");
        Ok(Self {
            state: UsersState {
                commands: Arc::new(commands),
                queries: Arc::new(queries),
                resolver: Arc::new(resolver),
            },
            worker,
        })
    }

    pub fn state(&self) -> UsersState {
        self.state.clone()
    }

    /// Routes nested under `/api`.
    pub fn api_router(&self) -> Router {
        handlers::api_router(self.state.clone())
    }

    /// Routes mounted at the root.
    pub fn home_router(&self) -> Router {
        handlers::home_router()
    }

    /// Drains queued reset requests, then stops the worker.
    pub async fn shutdown(self) {
        self.worker.shutdown().await;
    }
}
