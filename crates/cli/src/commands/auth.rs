//! Session commands.

use duka_client::Storefront;
use duka_client::api::{LoginRequest, RegisterRequest};
use duka_core::Email;

use super::CliError;

/// Sign in and persist the session.
pub async fn login(shop: &Storefront, email: &str, password: String) -> Result<(), CliError> {
    let request = LoginRequest {
        email: Email::parse(email)?,
        password,
    };
    shop.session().login(request).await?;
    greet(shop);
    Ok(())
}

/// Create an account; the backend signs it in.
pub async fn register(
    shop: &Storefront,
    email: &str,
    password: String,
    full_name: String,
) -> Result<(), CliError> {
    let request = RegisterRequest {
        email: Email::parse(email)?,
        password,
        full_name,
    };
    shop.session().register(request).await?;
    greet(shop);
    Ok(())
}

/// Sign out. Does nothing when already signed out.
pub fn logout(shop: &Storefront) {
    let was_signed_in = shop.session().is_authenticated();
    shop.session().logout();
    if was_signed_in {
        println!("Signed out.");
    } else {
        println!("Not signed in.");
    }
}

/// Show the signed-in account after re-validating the token.
pub async fn whoami(shop: &Storefront) -> Result<(), CliError> {
    if !shop.session().is_authenticated() {
        println!("Not signed in.");
        return Ok(());
    }

    shop.session().refresh_identity().await?;

    if let Some(identity) = shop.session().identity() {
        println!("[{}] {}", shop.session().display_initials(), identity.full_name);
        println!("email: {}", identity.email);
        println!("role:  {}", identity.role);
        println!("id:    {}", identity.id);
    }
    Ok(())
}

fn greet(shop: &Storefront) {
    if let Some(identity) = shop.session().identity() {
        println!("Signed in as {} ({}).", identity.full_name, identity.role);
    }
}
