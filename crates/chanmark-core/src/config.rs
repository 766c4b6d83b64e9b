use std::{
    env, fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{
    access::AccessPolicy,
    errors::Error,
    marker::{MarkerTable, DEFAULT_MARKER},
    Result,
};

pub const DEFAULT_MARK_EMOJI: &str = "🟣";
pub const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";
pub const GITHUB_LINK: &str = "https://github.com/glizzykingdreko/discord-to-do-tickets";

/// Typed configuration, read from the environment (and `.env`).
#[derive(Clone, Debug)]
pub struct Config {
    // Discord
    pub discord_token: String,
    pub discord_api_base: String,

    // Markers
    pub mark_emoji: String,
    pub extra_markers: Vec<(String, String)>,

    // Access
    pub allowed_role_ids: Vec<u64>,
    pub allowed_user_ids: Vec<u64>,
    pub admin_only: bool,
    pub command_cooldown: Duration,

    // Files
    pub env_file: PathBuf,
    pub assets_dir: PathBuf,
    pub log_dir: Option<PathBuf>,
}

impl Config {
    /// Load `.env` (never overriding variables already set), then read the environment.
    pub fn load() -> Result<Self> {
        let env_file = env::var_os("ENV_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(".env"));
        load_dotenv_if_present(&env_file);

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string());

        let discord_token = get("DISCORD_TOKEN").unwrap_or_default();
        if discord_token.is_empty() {
            return Err(Error::Config(
                "DISCORD_TOKEN environment variable is required".to_string(),
            ));
        }

        let discord_api_base = get("DISCORD_API_BASE")
            .and_then(non_empty)
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();

        let mark_emoji = get("MARK_EMOJI")
            .and_then(non_empty)
            .unwrap_or_else(|| DEFAULT_MARK_EMOJI.to_string());
        let extra_markers = parse_markers(get("MARKERS"));

        let allowed_role_ids = parse_csv_u64(get("ALLOWED_ROLE_IDS"));
        let allowed_user_ids = parse_csv_u64(get("ALLOWED_USER_IDS"));
        let admin_only = get("ADMIN_ONLY").map(|s| parse_bool(&s)).unwrap_or(false);
        let command_cooldown = Duration::from_secs(
            get("COMMAND_COOLDOWN_SECS")
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(5),
        );

        let env_file = PathBuf::from(get("ENV_FILE").and_then(non_empty).unwrap_or(".env".into()));
        let assets_dir =
            PathBuf::from(get("ASSETS_DIR").and_then(non_empty).unwrap_or("assets".into()));
        // Unset means the working directory; set-but-empty disables file logging.
        let log_dir = match get("LOG_DIR") {
            None => Some(PathBuf::from(".")),
            Some(s) if s.is_empty() => None,
            Some(s) => Some(PathBuf::from(s)),
        };

        Ok(Self {
            discord_token,
            discord_api_base,
            mark_emoji,
            extra_markers,
            allowed_role_ids,
            allowed_user_ids,
            admin_only,
            command_cooldown,
            env_file,
            assets_dir,
            log_dir,
        })
    }

    pub fn marker_table(&self) -> MarkerTable {
        MarkerTable::new(&self.mark_emoji, &self.extra_markers)
    }

    pub fn access_policy(&self) -> AccessPolicy {
        AccessPolicy::new(
            self.admin_only,
            &self.allowed_role_ids,
            &self.allowed_user_ids,
        )
    }

    pub fn profile_picture_path(&self) -> PathBuf {
        self.assets_dir.join("profile_picture.png")
    }
}

/// Persist the current emoji of `marker` into the env file.
///
/// `mark` is stored as `MARK_EMOJI`; every other marker lives in `MARKERS`.
pub fn persist_marker(path: &Path, markers: &MarkerTable, marker: &str) -> Result<()> {
    if marker == DEFAULT_MARKER {
        let Some(m) = markers.get(DEFAULT_MARKER) else {
            return Ok(());
        };
        return persist_env_var(path, "MARK_EMOJI", &m.emoji);
    }
    persist_env_var(path, "MARKERS", &markers.extras_env_value())
}

/// Set `key` in a dotenv file, replacing an existing assignment or appending one.
/// Comments and unrelated lines are kept as they are.
pub fn persist_env_var(path: &Path, key: &str, value: &str) -> Result<()> {
    if key.is_empty() || key.contains('=') || key.contains(char::is_whitespace) {
        return Err(Error::EnvFile {
            path: path.to_path_buf(),
            reason: format!("invalid key {key:?}"),
        });
    }

    let contents = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e.into()),
    };

    let assignment = format!("{key}={}", quote_env_value(value));
    let mut replaced = false;
    let mut lines: Vec<String> = Vec::new();
    for raw in contents.lines() {
        if dotenv_key(raw) == Some(key) {
            if !replaced {
                lines.push(assignment.clone());
                replaced = true;
            }
            continue;
        }
        lines.push(raw.to_string());
    }
    if !replaced {
        lines.push(assignment);
    }

    let mut out = lines.join("\n");
    out.push('\n');
    fs::write(path, out)?;
    Ok(())
}

fn quote_env_value(value: &str) -> String {
    let needs_quotes = value.is_empty()
        || value.contains(char::is_whitespace)
        || value.contains('#')
        || value.contains('\'')
        || value.contains('"');
    if !needs_quotes {
        return value.to_string();
    }
    if value.contains('"') {
        format!("'{value}'")
    } else {
        format!("\"{value}\"")
    }
}

fn dotenv_key(raw: &str) -> Option<&str> {
    let line = raw.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let (k, _) = line.split_once('=')?;
    let key = k.trim().trim_start_matches("export ").trim();
    if key.is_empty() {
        None
    } else {
        Some(key)
    }
}

/// Parse dotenv contents into `(key, value)` pairs, stripping optional quotes.
pub fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in contents.lines() {
        let Some(key) = dotenv_key(raw) else {
            continue;
        };
        let Some((_, v)) = raw.split_once('=') else {
            continue;
        };

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }
        out.push((key.to_string(), val));
    }
    out
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_bool(s: &str) -> bool {
    matches!(
        s.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn parse_csv_u64(v: Option<String>) -> Vec<u64> {
    v.unwrap_or_default()
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<u64>().ok())
        .collect()
}

/// `name=emoji,name=emoji`; names are lowercased, malformed pairs skipped.
fn parse_markers(v: Option<String>) -> Vec<(String, String)> {
    v.unwrap_or_default()
        .split(',')
        .filter_map(|pair| {
            let (name, emoji) = pair.split_once('=')?;
            let name = name.trim().to_lowercase();
            let emoji = emoji.trim().to_string();
            if name.is_empty() || emoji.is_empty() {
                return None;
            }
            Some((name, emoji))
        })
        .collect()
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn cfg_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|k| map.get(k).cloned())
    }

    fn tmp_file(prefix: &str) -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        std::env::temp_dir().join(format!(
            "chanmark-{prefix}-{}-{nanos}.env",
            std::process::id()
        ))
    }

    #[test]
    fn token_is_required() {
        let err = cfg_from(&[("DISCORD_TOKEN", "  ")]).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn defaults_apply() {
        let cfg = cfg_from(&[("DISCORD_TOKEN", "abc")]).unwrap();
        assert_eq!(cfg.mark_emoji, DEFAULT_MARK_EMOJI);
        assert_eq!(cfg.discord_api_base, DEFAULT_API_BASE);
        assert!(cfg.extra_markers.is_empty());
        assert!(!cfg.admin_only);
        assert_eq!(cfg.command_cooldown, Duration::from_secs(5));
        assert_eq!(cfg.env_file, PathBuf::from(".env"));
        assert_eq!(cfg.log_dir, Some(PathBuf::from(".")));
        assert_eq!(
            cfg.profile_picture_path(),
            PathBuf::from("assets/profile_picture.png")
        );
    }

    #[test]
    fn parses_lists_flags_and_markers() {
        let cfg = cfg_from(&[
            ("DISCORD_TOKEN", "abc"),
            ("ALLOWED_ROLE_IDS", "1, 2,x,,3"),
            ("ALLOWED_USER_IDS", "42"),
            ("ADMIN_ONLY", "TRUE"),
            ("MARKERS", "Done=✅, todo = 📝, broken, =⭐"),
            ("LOG_DIR", ""),
            ("DISCORD_API_BASE", "http://localhost:9000/api/"),
        ])
        .unwrap();

        assert_eq!(cfg.allowed_role_ids, vec![1, 2, 3]);
        assert_eq!(cfg.allowed_user_ids, vec![42]);
        assert!(cfg.admin_only);
        assert_eq!(
            cfg.extra_markers,
            vec![
                ("done".to_string(), "✅".to_string()),
                ("todo".to_string(), "📝".to_string())
            ]
        );
        assert_eq!(cfg.log_dir, None);
        assert_eq!(cfg.discord_api_base, "http://localhost:9000/api");

        let names: Vec<String> = cfg.marker_table().iter().map(|m| m.name.clone()).collect();
        assert_eq!(names, vec!["mark", "done", "todo"]);
    }

    #[test]
    fn dotenv_parsing_strips_quotes_and_comments() {
        let parsed = parse_dotenv("# comment\nA=1\nB = \"two words\"\n\nexport C='x'\nbad line\n");
        assert_eq!(
            parsed,
            vec![
                ("A".to_string(), "1".to_string()),
                ("B".to_string(), "two words".to_string()),
                ("C".to_string(), "x".to_string()),
            ]
        );
    }

    #[test]
    fn persist_replaces_existing_key_and_keeps_other_lines() {
        let path = tmp_file("replace");
        fs::write(&path, "# settings\nDISCORD_TOKEN=abc\nMARK_EMOJI=🟣\nADMIN_ONLY=false\n").unwrap();

        persist_env_var(&path, "MARK_EMOJI", "✅").unwrap();

        let out = fs::read_to_string(&path).unwrap();
        assert_eq!(
            out,
            "# settings\nDISCORD_TOKEN=abc\nMARK_EMOJI=✅\nADMIN_ONLY=false\n"
        );
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn persist_appends_and_creates_missing_file() {
        let path = tmp_file("append");
        let _ = fs::remove_file(&path);

        persist_env_var(&path, "MARK_EMOJI", "a b").unwrap();
        persist_env_var(&path, "MARKERS", "done=✅").unwrap();

        let out = fs::read_to_string(&path).unwrap();
        assert_eq!(out, "MARK_EMOJI=\"a b\"\nMARKERS=done=✅\n");
        assert_eq!(
            parse_dotenv(&out),
            vec![
                ("MARK_EMOJI".to_string(), "a b".to_string()),
                ("MARKERS".to_string(), "done=✅".to_string()),
            ]
        );
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn persist_marker_routes_to_the_right_key() {
        let path = tmp_file("marker");
        let mut markers = MarkerTable::new("🟣", &[("done".to_string(), "✅".to_string())]);
        markers.set_emoji("done", "✔️").unwrap();
        markers.set_emoji("mark", "⭐").unwrap();

        persist_marker(&path, &markers, "done").unwrap();
        persist_marker(&path, &markers, "mark").unwrap();

        let out = fs::read_to_string(&path).unwrap();
        assert_eq!(out, "MARKERS=done=✔️\nMARK_EMOJI=⭐\n");
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn saved_markers_reload_unchanged() {
        let cfg = cfg_from(&[("DISCORD_TOKEN", "abc"), ("MARKERS", "done=✅,todo=📝")]).unwrap();
        let mut markers = cfg.marker_table();
        markers.set_emoji("done", "a=b").unwrap();
        assert!(markers.set_emoji("todo", "🔴,x").is_err());

        let saved = markers.extras_env_value();
        let reloaded = cfg_from(&[("DISCORD_TOKEN", "abc"), ("MARKERS", saved.as_str())]).unwrap();
        assert_eq!(reloaded.marker_table(), markers);
    }

    #[test]
    fn persist_rejects_bad_keys() {
        let path = tmp_file("badkey");
        assert!(matches!(
            persist_env_var(&path, "A B", "x"),
            Err(Error::EnvFile { .. })
        ));
    }
}
