use std::collections::BTreeMap;
use std::path::Path;

use regex::Regex;
use serde_json::Value;

use super::Detector;
use crate::config::{Config, DatabaseConfig};
use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::utils::io;

/// Built-in detectors in probe order.
pub fn builtin_detectors() -> Vec<Box<dyn Detector>> {
    vec![
        Box::new(DotenvDetector),
        Box::new(WordPressDetector),
        Box::new(JsonDetector),
        Box::new(TomlDetector),
    ]
}

fn pattern(source: &str) -> Result<Regex> {
    Regex::new(source).map_err(|e| Error::internal_unexpected(e.to_string()))
}

fn unparseable(file: &Path, problem: &str) -> Error {
    Error::config_invalid_value("file", Some(file.display().to_string()), problem)
}

/// `.env` files: `DB_*` variables or a `DATABASE_URL`.
pub struct DotenvDetector;

impl DotenvDetector {
    fn parse_vars(content: &str) -> BTreeMap<String, String> {
        content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(|line| {
                let line = line.strip_prefix("export ").unwrap_or(line);
                let (key, value) = line.split_once('=')?;
                let value = value.trim();
                let value = value
                    .strip_prefix('"')
                    .and_then(|v| v.strip_suffix('"'))
                    .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
                    .unwrap_or(value);
                Some((key.trim().to_string(), value.to_string()))
            })
            .collect()
    }

    fn from_url(url: &str) -> Result<Option<DatabaseConfig>> {
        let re = pattern(
            r"^(?P<kind>[a-z0-9+]+)://(?:(?P<user>[^:@/]*)(?::(?P<pass>[^@/]*))?@)?(?P<host>[^:/]+)(?::(?P<port>\d+))?/(?P<name>[^?]+)",
        )?;

        Ok(re.captures(url).map(|caps| DatabaseConfig {
            kind: caps["kind"].to_string(),
            host: caps["host"].to_string(),
            port: caps.name("port").and_then(|p| p.as_str().parse().ok()),
            name: caps["name"].to_string(),
            username: caps.name("user").map(|m| m.as_str().to_string()).unwrap_or_default(),
            password: caps.name("pass").map(|m| m.as_str().to_string()).unwrap_or_default(),
        }))
    }
}

impl Detector for DotenvDetector {
    fn name(&self) -> &str {
        "dotenv"
    }

    fn most_likely_path(&self) -> &str {
        ".env"
    }

    fn potential_paths(&self) -> Vec<String> {
        vec![
            "current/.env".to_string(),
            "shared/.env".to_string(),
            "app/.env".to_string(),
        ]
    }

    fn create_config(&self, _environment: &Environment, file: &Path) -> Result<Config> {
        let vars = Self::parse_vars(&io::read_file(file, "read .env")?);

        if let Some(url) = vars.get("DATABASE_URL") {
            if let Some(database) = Self::from_url(url)? {
                return Ok(Config::new(self.name()).with_database(database));
            }
        }

        let get = |keys: &[&str]| keys.iter().find_map(|k| vars.get(*k).cloned());
        let name = get(&["DB_DATABASE", "DB_NAME"])
            .filter(|n| !n.is_empty())
            .ok_or_else(|| unparseable(file, "no DB_DATABASE or DATABASE_URL"))?;

        let database = DatabaseConfig {
            kind: get(&["DB_CONNECTION"]).unwrap_or_else(|| "mysql".to_string()),
            host: get(&["DB_HOST"]).unwrap_or_else(|| "localhost".to_string()),
            port: get(&["DB_PORT"]).and_then(|p| p.parse().ok()),
            name,
            username: get(&["DB_USERNAME", "DB_USER"]).unwrap_or_default(),
            password: get(&["DB_PASSWORD"]).unwrap_or_default(),
        };

        let mut config = Config::new(self.name()).with_database(database);
        if let Some(app_env) = vars.get("APP_ENV") {
            config = config.with_attribute("app_env", app_env.clone());
        }
        Ok(config)
    }
}

/// `wp-config.php` `define()` constants.
pub struct WordPressDetector;

impl Detector for WordPressDetector {
    fn name(&self) -> &str {
        "wordpress"
    }

    fn most_likely_path(&self) -> &str {
        "wp-config.php"
    }

    fn potential_paths(&self) -> Vec<String> {
        vec![
            "public_html/wp-config.php".to_string(),
            "htdocs/wp-config.php".to_string(),
            "current/wp-config.php".to_string(),
        ]
    }

    fn create_config(&self, _environment: &Environment, file: &Path) -> Result<Config> {
        let content = io::read_file(file, "read wp-config.php")?;
        let define = pattern(
            r#"define\(\s*['"](DB_NAME|DB_USER|DB_PASSWORD|DB_HOST)['"]\s*,\s*['"]([^'"]*)['"]\s*\)"#,
        )?;

        let constants: BTreeMap<String, String> = define
            .captures_iter(&content)
            .map(|caps| (caps[1].to_string(), caps[2].to_string()))
            .collect();

        let name = constants
            .get("DB_NAME")
            .filter(|n| !n.is_empty())
            .cloned()
            .ok_or_else(|| unparseable(file, "no DB_NAME define"))?;

        let raw_host = constants
            .get("DB_HOST")
            .cloned()
            .unwrap_or_else(|| "localhost".to_string());
        let (host, port) = match raw_host.split_once(':') {
            Some((host, port)) => (host.to_string(), port.parse().ok()),
            None => (raw_host, None),
        };

        let mut config = Config::new(self.name()).with_database(DatabaseConfig {
            kind: "mysql".to_string(),
            host,
            port,
            name,
            username: constants.get("DB_USER").cloned().unwrap_or_default(),
            password: constants.get("DB_PASSWORD").cloned().unwrap_or_default(),
        });

        let prefix = pattern(r#"\$table_prefix\s*=\s*['"]([^'"]+)['"]"#)?;
        if let Some(caps) = prefix.captures(&content) {
            config = config.with_attribute("table_prefix", &caps[1]);
        }

        Ok(config)
    }
}

/// Pick the section named after the environment when present, otherwise the
/// document root, and read one database from it.
fn database_from_document(document: &Value, environment: &Environment, file: &Path) -> Result<DatabaseConfig> {
    let section = document.get(environment.name()).unwrap_or(document);
    let section = section.get("database").filter(|v| v.is_object()).unwrap_or(section);

    serde_json::from_value(section.clone()).map_err(|e| unparseable(file, &e.to_string()))
}

/// `config/database.json`.
pub struct JsonDetector;

impl Detector for JsonDetector {
    fn name(&self) -> &str {
        "json"
    }

    fn most_likely_path(&self) -> &str {
        "config/database.json"
    }

    fn potential_paths(&self) -> Vec<String> {
        vec!["current/config/database.json".to_string()]
    }

    fn create_config(&self, environment: &Environment, file: &Path) -> Result<Config> {
        let content = io::read_file(file, "read database.json")?;
        let document: Value =
            serde_json::from_str(&content).map_err(|e| unparseable(file, &e.to_string()))?;

        Ok(Config::new(self.name()).with_database(database_from_document(&document, environment, file)?))
    }
}

/// `config/database.toml`.
pub struct TomlDetector;

impl Detector for TomlDetector {
    fn name(&self) -> &str {
        "toml"
    }

    fn most_likely_path(&self) -> &str {
        "config/database.toml"
    }

    fn potential_paths(&self) -> Vec<String> {
        vec!["current/config/database.toml".to_string()]
    }

    fn create_config(&self, environment: &Environment, file: &Path) -> Result<Config> {
        let content = io::read_file(file, "read database.toml")?;
        let document: Value = toml::from_str(&content).map_err(|e| unparseable(file, &e.to_string()))?;

        Ok(Config::new(self.name()).with_database(database_from_document(&document, environment, file)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(content: &str) -> tempfile::NamedTempFile {
        let file = tempfile::NamedTempFile::new().unwrap();
        fs::write(file.path(), content).unwrap();
        file
    }

    #[test]
    fn builtin_order_is_stable() {
        let names: Vec<_> = builtin_detectors().iter().map(|d| d.name().to_string()).collect();
        assert_eq!(names, vec!["dotenv", "wordpress", "json", "toml"]);
    }

    #[test]
    fn dotenv_reads_db_variables() {
        let file = write(
            "APP_ENV=production\n# comment\nDB_CONNECTION=pgsql\nDB_HOST=db.internal\nDB_PORT=5432\nDB_DATABASE=\"shop\"\nDB_USERNAME=app\nexport DB_PASSWORD='p@ss'\n",
        );

        let config = DotenvDetector
            .create_config(&Environment::new("production"), file.path())
            .unwrap();

        let db = &config.databases[0];
        assert_eq!(db.kind, "pgsql");
        assert_eq!(db.port, Some(5432));
        assert_eq!(db.name, "shop");
        assert_eq!(db.password, "p@ss");
        assert_eq!(config.attributes["app_env"], "production");
    }

    #[test]
    fn dotenv_prefers_database_url() {
        let file = write("DATABASE_URL=postgres://app:secret@db:6432/shop\nDB_DATABASE=ignored\n");

        let config = DotenvDetector
            .create_config(&Environment::new("staging"), file.path())
            .unwrap();

        let db = &config.databases[0];
        assert_eq!(db.kind, "postgres");
        assert_eq!(db.host, "db");
        assert_eq!(db.port, Some(6432));
        assert_eq!(db.username, "app");
        assert_eq!(db.name, "shop");
    }

    #[test]
    fn dotenv_without_database_is_rejected() {
        let file = write("APP_KEY=base64:abc\n");
        assert!(DotenvDetector
            .create_config(&Environment::new("staging"), file.path())
            .is_err());
    }

    #[test]
    fn wordpress_reads_defines_and_port() {
        let file = write(
            "<?php\ndefine( 'DB_NAME', 'wp_shop' );\ndefine('DB_USER', \"wp\");\ndefine('DB_PASSWORD', 'pw');\ndefine('DB_HOST', 'mysql.internal:3307');\n$table_prefix = 'shop_';\n",
        );

        let config = WordPressDetector
            .create_config(&Environment::new("production"), file.path())
            .unwrap();

        let db = &config.databases[0];
        assert_eq!(db.name, "wp_shop");
        assert_eq!(db.username, "wp");
        assert_eq!(db.host, "mysql.internal");
        assert_eq!(db.port, Some(3307));
        assert_eq!(config.attributes["table_prefix"], "shop_");
    }

    #[test]
    fn json_uses_environment_section() {
        let file = write(
            r#"{"staging":{"adapter":"postgres","host":"stage-db","database":"shop_stage","user":"app"},
                "production":{"adapter":"postgres","host":"prod-db","database":"shop","user":"app"}}"#,
        );

        let config = JsonDetector
            .create_config(&Environment::new("production"), file.path())
            .unwrap();

        assert_eq!(config.databases[0].host, "prod-db");
        assert_eq!(config.databases[0].name, "shop");
    }

    #[test]
    fn toml_reads_database_table() {
        let file = write("[database]\nkind = \"mysql\"\nhost = \"db\"\nport = 3306\nname = \"shop\"\nusername = \"app\"\n");

        let config = TomlDetector
            .create_config(&Environment::new("production"), file.path())
            .unwrap();

        assert_eq!(config.databases[0].port, Some(3306));
        assert_eq!(config.databases[0].name, "shop");
    }

    #[test]
    fn malformed_json_is_rejected() {
        let file = write("{not json");
        assert!(JsonDetector
            .create_config(&Environment::new("production"), file.path())
            .is_err());
    }
}
