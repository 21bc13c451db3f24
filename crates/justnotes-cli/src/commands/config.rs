use justnotes_core::ClientConfig;

use crate::cli::ConfigCommands;
use crate::commands::common::resolve_client_config;
use crate::config_profiles::{CliProfile, CliProfilesConfig};
use crate::error::CliError;

pub fn run_config(command: ConfigCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            api_base_url,
            supabase_url,
            supabase_anon_key,
            autosave_ms,
            no_activate,
        } => {
            let explicit = ClientConfig {
                api_base_url,
                supabase_url,
                supabase_anon_key,
                autosave_quiet_period_ms: autosave_ms,
            };
            run_config_init(global_profile, explicit, no_activate)
        }
        ConfigCommands::Show => run_config_show(global_profile),
    }
}

pub fn run_config_init(
    profile_name: Option<&str>,
    explicit: ClientConfig,
    no_activate: bool,
) -> Result<(), CliError> {
    let mut config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(profile_name);
    let existing = config
        .profile(&profile_name)
        .map(CliProfile::client_config)
        .unwrap_or_default();

    let merged = merge_profile_values(existing, ClientConfig::from_env()?, explicit);
    merged.validate()?;
    *config.profile_mut_or_default(&profile_name) = CliProfile::from(merged.clone());

    if !no_activate {
        config.active_profile = Some(profile_name.clone());
    }

    let path = config.save().map_err(CliError::Config)?;
    println!(
        "Profile '{}' initialized at {}",
        profile_name,
        path.display()
    );

    let missing_fields = missing_fields(&merged);
    if missing_fields.is_empty() {
        println!(
            "Profile '{profile_name}' is ready. Run `justnotes auth login --email <email> --password <password>`."
        );
    } else {
        println!(
            "Profile '{}' is missing: {}",
            profile_name,
            missing_fields.join(", ")
        );
    }

    Ok(())
}

fn run_config_show(global_profile: Option<&str>) -> Result<(), CliError> {
    let (profile_name, config) = resolve_client_config(global_profile)?;
    println!("Profile: {profile_name}");
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

/// Stored values, overridden by the environment, overridden by flags.
pub fn merge_profile_values(
    existing: ClientConfig,
    from_env: ClientConfig,
    explicit: ClientConfig,
) -> ClientConfig {
    existing.merge(from_env).merge(explicit)
}

pub fn missing_fields(config: &ClientConfig) -> Vec<&'static str> {
    let mut missing = Vec::new();
    if config.api_base_url.is_none() {
        missing.push("api_base_url");
    }
    if config.supabase_url.is_none() {
        missing.push("supabase_url");
    }
    if config.supabase_anon_key.is_none() {
        missing.push("supabase_anon_key");
    }
    missing
}
