use std::{env, fs, path::Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::skill::SkillDescriptor;

pub const DEFAULT_TOKEN_SERVICE_URL: &str = "https://token.botframework.com";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("invalid url for {field}: {value}")]
    InvalidUrl {
        field: String,
        value: String,
        #[source]
        source: url::ParseError,
    },
    #[error("duplicate skill id {0}")]
    DuplicateSkill(String),
    #[error("failed to read skills manifest {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse skills manifest")]
    Parse(#[source] serde_yaml_bw::Error),
}

/// Root bot settings shared by every skill dialog it hosts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillHostConfig {
    pub bot_id: String,
    pub skill_host_endpoint: String,
    #[serde(default = "default_token_service_url")]
    pub token_service_url: String,
    #[serde(default)]
    pub skills: Vec<SkillDescriptor>,
}

#[derive(Debug, Deserialize)]
struct SkillsManifest {
    #[serde(default)]
    skills: Vec<SkillDescriptor>,
}

fn default_token_service_url() -> String {
    DEFAULT_TOKEN_SERVICE_URL.to_string()
}

impl SkillHostConfig {
    /// Reads `SKILL_HOST_BOT_ID`, `SKILL_HOST_ENDPOINT`, `TOKEN_SERVICE_URL` and
    /// the optional `SKILLS_MANIFEST` YAML file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let bot_id = non_empty("SKILL_HOST_BOT_ID").ok_or(ConfigError::Missing("SKILL_HOST_BOT_ID"))?;
        let skill_host_endpoint =
            non_empty("SKILL_HOST_ENDPOINT").ok_or(ConfigError::Missing("SKILL_HOST_ENDPOINT"))?;
        let token_service_url =
            non_empty("TOKEN_SERVICE_URL").unwrap_or_else(default_token_service_url);
        let skills = match non_empty("SKILLS_MANIFEST") {
            Some(path) => load_manifest(Path::new(&path))?,
            None => Vec::new(),
        };

        let config = Self {
            bot_id,
            skill_host_endpoint,
            token_service_url,
            skills,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml_bw::from_str(raw).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn skill(&self, id: &str) -> Option<&SkillDescriptor> {
        self.skills.iter().find(|skill| skill.id == id)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        check_url("skillHostEndpoint", &self.skill_host_endpoint)?;
        check_url("tokenServiceUrl", &self.token_service_url)?;
        for (idx, skill) in self.skills.iter().enumerate() {
            check_url(&format!("skills.{}.skillEndpoint", skill.id), &skill.skill_endpoint)?;
            if self.skills[..idx].iter().any(|other| other.id == skill.id) {
                return Err(ConfigError::DuplicateSkill(skill.id.clone()));
            }
        }
        Ok(())
    }
}

fn check_url(field: &str, value: &str) -> Result<(), ConfigError> {
    Url::parse(value)
        .map(|_| ())
        .map_err(|source| ConfigError::InvalidUrl {
            field: field.to_string(),
            value: value.to_string(),
            source,
        })
}

fn load_manifest(path: &Path) -> Result<Vec<SkillDescriptor>, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let manifest: SkillsManifest = serde_yaml_bw::from_str(&raw).map_err(ConfigError::Parse)?;
    Ok(manifest.skills)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const MANIFEST: &str = r#"
skills:
  - id: travel
    appId: 00000000-0000-0000-0000-000000000001
    skillEndpoint: https://travel.example/api/messages
  - id: calendar
    appId: 00000000-0000-0000-0000-000000000002
    skillEndpoint: https://calendar.example/api/messages
"#;

    fn lookup(vars: HashMap<&'static str, String>) -> impl Fn(&str) -> Option<String> {
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn reads_required_values_and_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("skills.yaml");
        fs::write(&manifest, MANIFEST).unwrap();

        let config = SkillHostConfig::from_lookup(lookup(HashMap::from([
            ("SKILL_HOST_BOT_ID", "root-app".to_string()),
            ("SKILL_HOST_ENDPOINT", "https://root.example/api/skills".to_string()),
            ("SKILLS_MANIFEST", manifest.display().to_string()),
        ])))
        .unwrap();

        assert_eq!(config.bot_id, "root-app");
        assert_eq!(config.token_service_url, DEFAULT_TOKEN_SERVICE_URL);
        assert_eq!(config.skills.len(), 2);
        assert_eq!(
            config.skill("calendar").unwrap().skill_endpoint,
            "https://calendar.example/api/messages"
        );
        assert!(config.skill("weather").is_none());
    }

    #[test]
    fn missing_bot_id_is_reported() {
        let err = SkillHostConfig::from_lookup(lookup(HashMap::from([(
            "SKILL_HOST_ENDPOINT",
            "https://root.example/api/skills".to_string(),
        )])))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Missing("SKILL_HOST_BOT_ID")));
    }

    #[test]
    fn invalid_endpoint_is_rejected() {
        let err = SkillHostConfig::from_lookup(lookup(HashMap::from([
            ("SKILL_HOST_BOT_ID", "root-app".to_string()),
            ("SKILL_HOST_ENDPOINT", "not a url".to_string()),
        ])))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUrl { .. }), "{err}");
    }

    #[test]
    fn yaml_config_rejects_duplicate_skills() {
        let raw = r#"
botId: root-app
skillHostEndpoint: https://root.example/api/skills
skills:
  - id: travel
    appId: a
    skillEndpoint: https://travel.example/api/messages
  - id: travel
    appId: b
    skillEndpoint: https://travel2.example/api/messages
"#;
        let err = SkillHostConfig::from_yaml_str(raw).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateSkill(id) if id == "travel"));
    }
}
