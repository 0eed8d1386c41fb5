//! `ragweave config`: configuration inspection commands.

use ragweave_config::AppConfig;

pub async fn show() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    println!("{}", config.to_toml());
    Ok(())
}

pub async fn path() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", AppConfig::config_path().display());
    Ok(())
}

#[cfg(test)]
mod tests {
    #[test]
    fn config_path_is_valid() {
        let path = ragweave_config::AppConfig::config_path();
        assert!(path.to_str().unwrap().ends_with("config.toml"));
        assert!(path.parent().unwrap().ends_with(".ragweave"));
    }
}
