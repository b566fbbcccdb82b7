use color_eyre::Result;
use dialoguer::Confirm;

/// Prompt for a secret without echoing it
pub fn prompt_secret(prompt: &str) -> Result<String> {
    let value = rpassword::prompt_password(prompt)
        .map_err(|e| color_eyre::eyre::eyre!("Failed to read input: {}", e))?;
    Ok(value.trim().to_string())
}

/// Prompt for yes/no with a default
pub fn prompt_yes_no(prompt: &str, default: bool) -> Result<bool> {
    Confirm::new()
        .with_prompt(prompt)
        .default(default)
        .interact()
        .map_err(|e| color_eyre::eyre::eyre!("Failed to read confirmation: {}", e))
}
