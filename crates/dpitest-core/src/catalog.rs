//! Probe target catalog
//!
//! Line-oriented `key="value"` entries grouped under `### section` headers.
//! A value prefixed `PING:` denotes a ping-only target; `CODE:<status>:`
//! carries an expected-HTTP-code override; anything else is a plain URL.
//! Invalid entries are skipped and recorded at load time instead of blowing
//! up deep inside the probe loop.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::model::{Endpoint, Mode, ProbeTarget, TargetCategory};

/// Section-to-category mapping used while parsing
#[derive(Debug, Clone)]
pub struct CatalogOptions {
    /// Section names whose targets are critical-A (case-insensitive)
    pub critical_a_sections: Vec<String>,
    /// Section names whose targets are critical-B (case-insensitive)
    pub critical_b_sections: Vec<String>,
}

impl Default for CatalogOptions {
    fn default() -> Self {
        Self {
            critical_a_sections: vec!["discord".to_string()],
            critical_b_sections: vec!["youtube".to_string()],
        }
    }
}

impl CatalogOptions {
    fn category_for(&self, section: &str) -> TargetCategory {
        let section = section.to_lowercase();
        if self.critical_a_sections.iter().any(|s| s.to_lowercase() == section) {
            TargetCategory::CriticalA
        } else if self.critical_b_sections.iter().any(|s| s.to_lowercase() == section) {
            TargetCategory::CriticalB
        } else {
            TargetCategory::Other
        }
    }
}

/// Parsed target list with a record of everything that was skipped
#[derive(Debug, Clone)]
pub struct TargetCatalog {
    /// Valid targets in file order
    pub targets: Vec<ProbeTarget>,
    /// Skipped lines: (1-based line number, reason)
    pub skipped: Vec<(usize, String)>,
    path: PathBuf,
}

impl TargetCatalog {
    /// Load and parse the catalog file
    pub fn load(path: impl AsRef<Path>, options: &CatalogOptions) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::config_io(path.display().to_string(), e.to_string()))?;
        let catalog = Self::parse(&content, options, path);
        if catalog.targets.is_empty() {
            return Err(Error::catalog(
                path.display().to_string(),
                0,
                "catalog contains no valid targets",
            ));
        }
        debug!(
            count = catalog.targets.len(),
            skipped = catalog.skipped.len(),
            path = %path.display(),
            "Loaded target catalog"
        );
        Ok(catalog)
    }

    /// Parse catalog text; never fails, invalid lines are recorded in `skipped`
    pub fn parse(content: &str, options: &CatalogOptions, path: &Path) -> Self {
        let mut targets: Vec<ProbeTarget> = Vec::new();
        let mut skipped = Vec::new();
        let mut category = TargetCategory::Other;

        for (idx, raw) in content.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') && !line.starts_with("###") {
                continue;
            }
            if let Some(section) = line.strip_prefix("###") {
                category = options.category_for(section.trim());
                continue;
            }

            match parse_entry(line, category) {
                Ok(target) => {
                    if targets.iter().any(|t| t.name == target.name) {
                        warn!(line = line_no, name = %target.name, "Duplicate target name, keeping first");
                        skipped.push((line_no, format!("duplicate target name '{}'", target.name)));
                    } else {
                        targets.push(target);
                    }
                }
                Err(reason) => {
                    warn!(line = line_no, path = %path.display(), reason, "Skipping invalid catalog line");
                    skipped.push((line_no, reason));
                }
            }
        }

        Self {
            targets,
            skipped,
            path: path.to_path_buf(),
        }
    }

    /// Path the catalog was loaded from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Targets in scope for the given mode
    ///
    /// `Full` probes everything; the single-service modes drop the other
    /// critical section but keep non-critical targets for the success rate.
    pub fn targets_for(&self, mode: Mode) -> Vec<ProbeTarget> {
        self.targets
            .iter()
            .filter(|t| match mode {
                Mode::Full => true,
                Mode::Messaging => t.category != TargetCategory::CriticalB,
                Mode::Video => t.category != TargetCategory::CriticalA,
            })
            .cloned()
            .collect()
    }
}

fn parse_entry(line: &str, category: TargetCategory) -> std::result::Result<ProbeTarget, String> {
    let (key, value) = line
        .split_once('=')
        .ok_or_else(|| "expected key=\"value\"".to_string())?;
    let key = key.trim();
    if key.is_empty() {
        return Err("empty key".to_string());
    }
    let value = value.trim();
    let value = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .ok_or_else(|| "value must be double-quoted".to_string())?;
    if value.is_empty() {
        return Err("empty value".to_string());
    }

    let endpoint = if let Some(host) = value.strip_prefix("PING:") {
        if host.is_empty() {
            return Err("PING: prefix with no host".to_string());
        }
        Endpoint::ping(host)
    } else if let Some(rest) = value.strip_prefix("CODE:") {
        let (code, url) = rest
            .split_once(':')
            .ok_or_else(|| "CODE: prefix must be CODE:<status>:<url>".to_string())?;
        let code: u16 = code
            .parse()
            .map_err(|_| format!("invalid status code '{code}'"))?;
        if !(100..=599).contains(&code) {
            return Err(format!("status code {code} out of range"));
        }
        Endpoint::url(url, Some(code))
    } else {
        if !value.starts_with("http://") && !value.starts_with("https://") {
            return Err(format!("'{value}' is not a URL (expected http(s)://)"));
        }
        Endpoint::url(value, None)
    };

    Ok(ProbeTarget {
        name: key.to_string(),
        endpoint,
        category,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
### Discord
discord_web="https://discord.com"
discord_voice="PING:discord.gg"

### YouTube
youtube_gen="CODE:204:https://www.youtube.com/generate_204"
youtube_web="https://www.youtube.com"

### Misc
wiki="https://www.wikipedia.org"
broken line without equals
bad_code="CODE:banana:https://x.org"
"#;

    fn parse_sample() -> TargetCatalog {
        TargetCatalog::parse(SAMPLE, &CatalogOptions::default(), Path::new("targets.txt"))
    }

    #[test]
    fn test_sections_map_to_categories() {
        let catalog = parse_sample();
        let by_name = |n: &str| catalog.targets.iter().find(|t| t.name == n).unwrap();
        assert_eq!(by_name("discord_web").category, TargetCategory::CriticalA);
        assert_eq!(by_name("youtube_web").category, TargetCategory::CriticalB);
        assert_eq!(by_name("wiki").category, TargetCategory::Other);
    }

    #[test]
    fn test_ping_prefix() {
        let catalog = parse_sample();
        let voice = catalog.targets.iter().find(|t| t.name == "discord_voice").unwrap();
        assert!(voice.is_ping_only());
        assert_eq!(voice.endpoint.host(), "discord.gg");
    }

    #[test]
    fn test_code_override() {
        let catalog = parse_sample();
        let gen = catalog.targets.iter().find(|t| t.name == "youtube_gen").unwrap();
        match &gen.endpoint {
            Endpoint::Url { expect, host, .. } => {
                assert_eq!(*expect, Some(204));
                assert_eq!(host, "www.youtube.com");
            }
            _ => panic!("expected URL endpoint"),
        }
    }

    #[test]
    fn test_invalid_lines_recorded() {
        let catalog = parse_sample();
        assert_eq!(catalog.skipped.len(), 2);
        assert_eq!(catalog.targets.len(), 5);
    }

    #[test]
    fn test_mode_filtering() {
        let catalog = parse_sample();
        let messaging = catalog.targets_for(Mode::Messaging);
        assert!(messaging.iter().all(|t| t.category != TargetCategory::CriticalB));
        assert!(messaging.iter().any(|t| t.category == TargetCategory::Other));
        assert_eq!(catalog.targets_for(Mode::Full).len(), 5);
    }

    #[test]
    fn test_duplicate_names_skipped() {
        let content = "a=\"https://x.org\"\na=\"https://y.org\"\n";
        let catalog =
            TargetCatalog::parse(content, &CatalogOptions::default(), Path::new("t.txt"));
        assert_eq!(catalog.targets.len(), 1);
        assert_eq!(catalog.skipped.len(), 1);
    }

    #[test]
    fn test_load_empty_catalog_is_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("targets.txt");
        std::fs::write(&path, "# nothing here\n").unwrap();
        assert!(TargetCatalog::load(&path, &CatalogOptions::default()).is_err());
    }
}
