//! One handler per use case. Handlers are thin: they unpack the command and
//! call the owning service.

use async_trait::async_trait;

use super::bus::{CommandHandler, QueryHandler};
use super::commands::*;
use super::queries::AdminUserList;
use crate::error::UserResult;
use crate::models::{TokenPairResponse, UserListResponse};
use crate::notifications::UserUpdatePublisher;
use crate::services::{
    AuthUserService, ResetPasswordService, UserCommandService, UserQueryService, WebAuthService,
};
use crate::user::User;

#[async_trait]
impl CommandHandler<RegisterUser> for AuthUserService {
    async fn handle(&self, command: RegisterUser) -> UserResult<(User, String)> {
        self.register(command.request).await
    }
}

#[async_trait]
impl CommandHandler<RegisterWebUser> for AuthUserService {
    async fn handle(&self, command: RegisterWebUser) -> UserResult<User> {
        self.register_web(command.request).await
    }
}

#[async_trait]
impl CommandHandler<LoginUser> for AuthUserService {
    async fn handle(&self, command: LoginUser) -> UserResult<(User, String)> {
        self.login(&command.email, &command.password, command.device_name)
            .await
    }
}

#[async_trait]
impl CommandHandler<LogoutToken> for AuthUserService {
    async fn handle(&self, command: LogoutToken) -> UserResult<User> {
        self.logout(command.token_id).await
    }
}

#[async_trait]
impl CommandHandler<SignOutUser> for AuthUserService {
    async fn handle(&self, command: SignOutUser) -> UserResult<User> {
        self.sign_out(command.user_id).await
    }
}

#[async_trait]
impl CommandHandler<ChangePassword> for AuthUserService {
    async fn handle(&self, command: ChangePassword) -> UserResult<User> {
        self.change_password(command.user_id, command.request).await
    }
}

#[async_trait]
impl CommandHandler<DeleteAccount> for AuthUserService {
    async fn handle(&self, command: DeleteAccount) -> UserResult<()> {
        self.delete_account(command.user_id, &command.password).await
    }
}

#[async_trait]
impl CommandHandler<UpdateProfile> for UserCommandService {
    async fn handle(&self, command: UpdateProfile) -> UserResult<User> {
        self.update_profile(command.user_id, command.request).await
    }
}

#[async_trait]
impl CommandHandler<AdminCreateUser> for UserCommandService {
    async fn handle(&self, command: AdminCreateUser) -> UserResult<User> {
        self.create(command.request, &command.causer).await
    }
}

#[async_trait]
impl CommandHandler<AdminUpdateUser> for UserCommandService {
    async fn handle(&self, command: AdminUpdateUser) -> UserResult<User> {
        self.admin_update(command.id, command.request, &command.causer)
            .await
    }
}

#[async_trait]
impl CommandHandler<AdminSoftDeleteUser> for UserCommandService {
    async fn handle(&self, command: AdminSoftDeleteUser) -> UserResult<User> {
        self.soft_delete(command.id, &command.causer).await
    }
}

#[async_trait]
impl CommandHandler<AdminRestoreUser> for UserCommandService {
    async fn handle(&self, command: AdminRestoreUser) -> UserResult<User> {
        self.restore(command.id, &command.causer).await
    }
}

#[async_trait]
impl CommandHandler<AdminForceDeleteUser> for UserCommandService {
    async fn handle(&self, command: AdminForceDeleteUser) -> UserResult<()> {
        self.force_delete(command.id, &command.causer).await
    }
}

#[async_trait]
impl CommandHandler<RequestPasswordReset> for ResetPasswordService {
    async fn handle(&self, command: RequestPasswordReset) -> UserResult<()> {
        self.generate_reset_password_token(&command.email).await
    }
}

#[async_trait]
impl CommandHandler<ResetPassword> for ResetPasswordService {
    async fn handle(&self, command: ResetPassword) -> UserResult<User> {
        self.reset_password(command.request).await
    }
}

#[async_trait]
impl CommandHandler<WebLoginCheck> for WebAuthService {
    async fn handle(&self, command: WebLoginCheck) -> UserResult<TokenPairResponse> {
        self.login_check(&command.email, &command.password).await
    }
}

#[async_trait]
impl CommandHandler<RefreshWebToken> for WebAuthService {
    async fn handle(&self, command: RefreshWebToken) -> UserResult<TokenPairResponse> {
        self.refresh(&command.refresh_token).await
    }
}

#[async_trait]
impl CommandHandler<WebLogout> for WebAuthService {
    async fn handle(&self, command: WebLogout) -> UserResult<u64> {
        self.logout(&command.user).await
    }
}

#[async_trait]
impl CommandHandler<PublishUpdate> for UserUpdatePublisher {
    async fn handle(&self, command: PublishUpdate) -> UserResult<()> {
        self.publish(command.topic, command.payload).await;
        Ok(())
    }
}

#[async_trait]
impl QueryHandler<AdminUserList> for UserQueryService {
    async fn handle(&self, query: AdminUserList) -> UserResult<UserListResponse> {
        self.list(
            query.page,
            query.limit,
            &query.order_by,
            &query.order_type,
            query.with_deleted,
        )
        .await
    }
}
