use std::fs;
use std::path::Path;

use jolt_compiler_frontend::LowerOptions;
use serde::Deserialize;

const DOTFILE_NAME: &str = ".jolt";

#[derive(Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Dotfile {
    #[serde(default)]
    pub lowering: LoweringConfig,
}

impl Dotfile {
    /// Reads the `.jolt` file in `dir`, falling back to the defaults when there is none.
    pub fn load_or_default(dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        match fs::read_to_string(dir.as_ref().join(DOTFILE_NAME)) {
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(err.into()),
            Ok(content) => Ok(toml::from_str(&content)?),
        }
    }

    pub fn into_options(self) -> LowerOptions {
        self.lowering.into()
    }
}

/// The `[lowering]` table, every key is optional.
#[derive(Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct LoweringConfig {
    pub enable_assertions: Option<bool>,
    pub class_metadata: Option<bool>,
    pub max_suggestions: Option<usize>,
}

impl From<LoweringConfig> for LowerOptions {
    fn from(config: LoweringConfig) -> Self {
        LowerOptions::builder()
            .maybe_enable_assertions(config.enable_assertions)
            .maybe_class_metadata(config.class_metadata)
            .maybe_max_suggestions(config.max_suggestions)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;

    use super::*;

    #[test]
    fn parse_lowering_table() {
        let content = r#"
            [lowering]
            enable-assertions = true
            max-suggestions = 3
        "#;

        let dotfile: Dotfile = toml::from_str(content).unwrap();
        assert_eq!(
            dotfile,
            Dotfile {
                lowering: LoweringConfig {
                    enable_assertions: Some(true),
                    max_suggestions: Some(3),
                    ..Default::default()
                },
            }
        );

        let options = dotfile.into_options();
        assert!(options.enable_assertions());
        assert!(options.class_metadata());
        assert_eq!(options.max_suggestions(), 3);
    }

    #[test]
    fn empty_dotfile_uses_defaults() {
        let dotfile: Dotfile = toml::from_str("").unwrap();
        assert_eq!(dotfile.into_options(), LowerOptions::default());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let content = r#"
            [lowering]
            class-metadata = false
            inline-everything = true
        "#;

        let err = toml::from_str::<Dotfile>(content).unwrap_err();
        assert!(err.to_string().contains("inline-everything"));
    }

    #[test]
    fn missing_dotfile_is_not_an_error() {
        let dotfile = Dotfile::load_or_default(env!("CARGO_MANIFEST_DIR")).unwrap();
        assert_eq!(dotfile, Dotfile::default());
    }
}
