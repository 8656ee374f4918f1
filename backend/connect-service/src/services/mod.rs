pub mod accounts;
pub mod hosted_auth;
pub mod mailer;
pub mod oauth;

pub use accounts::Registration;
pub use hosted_auth::{HostedAuthError, HostedAuthProvider, HostedUser, StackAuthClient};
pub use mailer::{Mailer, SmtpMailer};
pub use oauth::{GoogleOAuthProvider, OAuthError, OAuthProvider, OAuthUserInfo};
