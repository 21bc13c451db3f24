use justnotes_core::auth::page::CONFIRMATION_NOTICE;
use justnotes_core::events::spawn_observer;
use justnotes_core::{
    AuthPage, AuthService, Credentials, DomainEvent, EventBus, Route, SignUpCredentials,
    TracingAnalytics,
};

use crate::auth::ProfileAuth;
use crate::cli::AuthCommands;
use crate::commands::common::resolve_client_config;
use crate::error::CliError;

pub async fn run_auth(command: AuthCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    let (profile_name, config) = resolve_client_config(global_profile)?;
    let auth = ProfileAuth::for_profile(&profile_name, &config)?;
    let events = EventBus::new();
    let observer = spawn_observer(&events, TracingAnalytics);

    let result = run_auth_command(command, &profile_name, &auth, &events).await;

    // Closing the bus lets the observer drain before the process exits.
    drop(events);
    let _ = observer.await;
    result
}

async fn run_auth_command(
    command: AuthCommands,
    profile_name: &str,
    auth: &ProfileAuth,
    events: &EventBus,
) -> Result<(), CliError> {
    match command {
        AuthCommands::Login { email, password } => {
            require_configured(auth, profile_name)?;
            let page = AuthPage::new(events.clone());
            let route = page.sign_in(auth, &Credentials::new(email, password)).await;
            report_route(&page, route, profile_name, auth).await
        }
        AuthCommands::Signup {
            email,
            password,
            confirm_password,
        } => {
            require_configured(auth, profile_name)?;
            let confirm_password = confirm_password.unwrap_or_else(|| password.clone());
            let page = AuthPage::new(events.clone());
            let route = page
                .sign_up(
                    auth,
                    &SignUpCredentials::new(email, password, confirm_password),
                )
                .await;
            report_route(&page, route, profile_name, auth).await
        }
        AuthCommands::Status => {
            match auth.current_session().await? {
                Some(session) => {
                    let email_label = session.user.email.as_deref().unwrap_or("(no email)");
                    println!(
                        "Profile '{}' is signed in as {} (expires_at={})",
                        profile_name, email_label, session.expires_at
                    );
                }
                None => println!("Profile '{profile_name}' is not signed in."),
            }
            Ok(())
        }
        AuthCommands::Logout => {
            if let Err(error) = auth.logout().await {
                tracing::warn!("Remote sign-out for profile '{}' failed: {}", profile_name, error);
            }
            events.emit(DomainEvent::UserLoggedOut);
            println!("Signed out profile '{profile_name}'");
            Ok(())
        }
    }
}

fn require_configured(auth: &ProfileAuth, profile_name: &str) -> Result<(), CliError> {
    if auth.is_configured() {
        Ok(())
    } else {
        Err(CliError::Config(format!(
            "Profile '{profile_name}' is missing Supabase auth config. Run `justnotes config init --supabase-url <URL> --supabase-anon-key <KEY>`."
        )))
    }
}

async fn report_route(
    page: &AuthPage,
    route: Option<Route>,
    profile_name: &str,
    auth: &ProfileAuth,
) -> Result<(), CliError> {
    let state = page.state();
    match route {
        Some(Route::Notes) => {
            let email = auth
                .current_session()
                .await?
                .and_then(|session| session.user.email)
                .unwrap_or_else(|| "(no email)".to_string());
            println!("Signed in profile '{profile_name}' as {email}");
            Ok(())
        }
        Some(Route::SignIn | Route::SignUp) => {
            println!("{}", state.notice.as_deref().unwrap_or(CONFIRMATION_NOTICE));
            Ok(())
        }
        None => Err(CliError::Operation(
            state
                .error
                .unwrap_or_else(|| "Authentication failed".to_string()),
        )),
    }
}
