use std::env;
use std::ffi::OsString;
use std::path::PathBuf;

pub const ASSET_DIR_VAR: &str = "TERRANOVA_ASSET_DIR";

#[derive(Clone, Debug, PartialEq)]
pub struct EditorConfig {
    /// Where texture and model prompts start, and what the prototype scan walks
    pub asset_dir: PathBuf,
    pub initial_project: Option<PathBuf>,
}

impl EditorConfig {
    pub fn from_env() -> Self {
        Self::resolve(env::var_os(ASSET_DIR_VAR), env::args_os().nth(1), dirs::home_dir())
    }

    fn resolve(
        asset_dir: Option<OsString>,
        project_arg: Option<OsString>,
        home: Option<PathBuf>,
    ) -> Self {
        let asset_dir = asset_dir
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from)
            .or(home)
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            asset_dir,
            initial_project: project_arg.map(PathBuf::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_dir_prefers_override_then_home() {
        let config = EditorConfig::resolve(
            Some("/srv/assets".into()),
            None,
            Some("/home/user".into()),
        );
        assert_eq!(config.asset_dir, PathBuf::from("/srv/assets"));

        let config = EditorConfig::resolve(Some("".into()), None, Some("/home/user".into()));
        assert_eq!(config.asset_dir, PathBuf::from("/home/user"));

        let config = EditorConfig::resolve(None, None, None);
        assert_eq!(config.asset_dir, PathBuf::from("."));
    }

    #[test]
    fn home_fallback_is_the_user_home() {
        let config = EditorConfig::resolve(None, None, dirs::home_dir());
        let expected = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        assert_eq!(config.asset_dir, expected);
    }

    #[test]
    fn first_argument_is_the_project() {
        let config = EditorConfig::resolve(None, Some("world.json".into()), None);
        assert_eq!(config.initial_project, Some(PathBuf::from("world.json")));
    }
}
