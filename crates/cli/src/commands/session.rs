//! Session commands.

use sss_client::{AppError, Result};
use sss_client::identity::ProviderState;

use super::{Context, print_line};

/// Show the active identity without creating one.
pub async fn whoami(ctx: &Context, email: Option<&str>) -> Result<()> {
    ctx.sign_in(email).await?;
    let snapshot = ctx.session.snapshot();

    let Some(uid) = snapshot.uid() else {
        print_line("Not signed in");
        return Ok(());
    };

    let kind = match &snapshot.provider {
        ProviderState::SignedIn(_) => "account",
        ProviderState::Initializing | ProviderState::SignedOut => "guest",
    };
    print_line(&format!("uid: {uid}"));
    print_line(&format!("type: {kind}"));
    if let Some(name) = snapshot.display_name() {
        print_line(&format!("name: {name}"));
    }
    if let Some(email) = snapshot.provider.user().and_then(|user| user.email.as_ref()) {
        print_line(&format!("email: {email}"));
    }
    Ok(())
}

/// Create an account with the global `--email`.
pub async fn sign_up(ctx: &Context, email: Option<&str>, name: &str) -> Result<()> {
    let email = email.ok_or_else(|| AppError::BadRequest("sign-up needs --email".to_string()))?;
    let password = super::read_password()?;

    let user = ctx.session.sign_up(email, &password, name).await?;
    print_line(&format!("Created account {}", user.uid));
    Ok(())
}

/// Start a fresh guest session, replacing any stored one.
pub fn guest(ctx: &Context) -> Result<()> {
    let guest = ctx.session.continue_as_guest()?;
    print_line(&format!("Guest session {}", guest.id));
    Ok(())
}

/// Sign out and forget the stored guest session.
pub async fn sign_out(ctx: &Context) -> Result<()> {
    ctx.session.sign_out().await?;
    print_line("Signed out");
    Ok(())
}
