//! Service configuration
//!
//! Defaults are usable for local development. A TOML file may override any
//! of them, and a handful of environment variables override the file.
use crate::constituency::{Constituency, StaticConstituencyLookup};
use crate::error::ConfigError;
use crate::listing::{Facet, FacetResolver};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const CONFIG_PATH_VAR: &str = "PETITIONS_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub environment: String,
    pub bind_address: String,
    pub database_path: PathBuf,
    /// Absolute site root used for redirects, without a trailing slash.
    pub base_url: String,
    pub mail_from: String,
    pub public_facets: Vec<String>,
    pub per_page: usize,
    pub backfill_batch_size: usize,
    pub constituencies: Vec<ConstituencyEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstituencyEntry {
    pub postcode: String,
    pub id: String,
    pub name: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            bind_address: "127.0.0.1:3000".to_string(),
            database_path: PathBuf::from("db/petitions"),
            base_url: "http://localhost:3000".to_string(),
            mail_from: "no-reply@petition.parliament.uk".to_string(),
            public_facets: ["all", "open", "closed", "rejected"]
                .map(String::from)
                .to_vec(),
            per_page: 50,
            backfill_batch_size: 1000,
            constituencies: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Loads `path`, or the file named by `PETITIONS_CONFIG`, or defaults when
    /// neither is given, then applies environment overrides and validates.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| env::var_os(CONFIG_PATH_VAR).map(PathBuf::from));

        let mut config = match path {
            Some(path) => {
                debug!(path = %path.display(), "loading configuration file");
                let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
                    path: path.display().to_string(),
                    source,
                })?;
                Self::from_toml(&contents)?
            }
            None => Self::default(),
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(environment) = env::var("PETITIONS_ENV") {
            self.environment = environment;
        }
        if let Ok(bind) = env::var("PETITIONS_BIND") {
            self.bind_address = bind;
        }
        if let Some(path) = env::var_os("PETITIONS_DATABASE_PATH") {
            self.database_path = PathBuf::from(path);
        }
        if let Ok(base_url) = env::var("PETITIONS_BASE_URL") {
            self.base_url = base_url;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let facets = self.facets()?;
        if !facets.contains(&Facet::All) {
            return Err(ConfigError::Invalid(
                "public_facets must include \"all\"".to_string(),
            ));
        }
        if self.per_page == 0 {
            return Err(ConfigError::Invalid("per_page must be positive".to_string()));
        }
        if self.backfill_batch_size == 0 {
            return Err(ConfigError::Invalid(
                "backfill_batch_size must be positive".to_string(),
            ));
        }
        if self.base_url.ends_with('/') {
            return Err(ConfigError::Invalid(
                "base_url must not end with '/'".to_string(),
            ));
        }
        self.bind_address
            .parse::<std::net::SocketAddr>()
            .map_err(|err| ConfigError::Invalid(format!("bind_address: {err}")))?;
        Ok(())
    }

    pub fn facets(&self) -> Result<Vec<Facet>, ConfigError> {
        self.public_facets
            .iter()
            .map(|name| {
                name.parse::<Facet>()
                    .map_err(|err| ConfigError::Invalid(format!("public_facets: {err}")))
            })
            .collect()
    }

    pub fn facet_resolver(&self) -> Result<FacetResolver, ConfigError> {
        Ok(FacetResolver::new(self.facets()?))
    }

    pub fn constituency_lookup(&self) -> StaticConstituencyLookup {
        self.constituencies
            .iter()
            .fold(StaticConstituencyLookup::new(), |lookup, entry| {
                lookup.with_postcode(
                    &entry.postcode,
                    Constituency::new(entry.id.clone(), entry.name.clone()),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        AppConfig::default().validate().unwrap();
    }

    #[test]
    fn parses_partial_toml() {
        let config = AppConfig::from_toml(
            r#"
            base_url = "https://petition.parliament.uk"
            public_facets = ["all", "open"]

            [[constituencies]]
            postcode = "SE3 4LL"
            id = "54321"
            name = "North Creatorshire"
            "#,
        )
        .unwrap();

        assert_eq!(config.base_url, "https://petition.parliament.uk");
        assert_eq!(config.facets().unwrap(), vec![Facet::All, Facet::Open]);
        assert_eq!(config.per_page, AppConfig::default().per_page);
        assert_eq!(config.constituency_lookup().len(), 1);
    }

    #[test]
    fn rejects_whitelist_without_all() {
        let config = AppConfig {
            public_facets: vec!["open".into()],
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_unknown_facets() {
        let config = AppConfig {
            public_facets: vec!["all".into(), "awaiting_monkey".into()],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
