// Maps a model name to the job script that launches its worker.

use log::warn;
use std::path::PathBuf;

use crate::Error;

/// Locates the job submission script for a model.
///
/// Scripts are named `<prefix><model_name><suffix>`; a model without a
/// dedicated script falls back to the default script shared by all models.
pub struct JobScriptLocator {
    script_dir: PathBuf,
    default_name: String,
    prefix: String,
    suffix: String,
}

impl JobScriptLocator {
    pub fn new(script_dir: PathBuf, default_name: String, prefix: String, suffix: String) -> Self {
        Self {
            script_dir,
            default_name,
            prefix,
            suffix,
        }
    }

    /// The default script, used when enumerating models before any specific
    /// model name is known.
    pub fn default_script(&self) -> PathBuf {
        self.script_dir.join(&self.default_name)
    }

    fn model_specific_script(&self, model_name: &str) -> PathBuf {
        self.script_dir
            .join(format!("{}{model_name}{}", self.prefix, self.suffix))
    }

    /// Select the script for `model_name`: the model-specific script if
    /// present, otherwise the default.
    ///
    /// # Errors
    /// Returns [`Error::ScriptMissing`] if neither script exists.
    pub fn select_script(&self, model_name: &str) -> Result<PathBuf, Error> {
        let specific = self.model_specific_script(model_name);
        if specific.exists() {
            return Ok(specific);
        }

        let default = self.default_script();
        if default.exists() {
            return Ok(default);
        }

        Err(Error::ScriptMissing(model_name.to_string(), default))
    }

    /// Warn about model-specific scripts in `script_dir` that do not match
    /// any name in `known_models`. Catches typos in operator-authored
    /// scripts; purely diagnostic.
    pub fn warn_unmatched_scripts(&self, known_models: &[String]) {
        let Ok(entries) = std::fs::read_dir(&self.script_dir) else {
            return;
        };

        for entry in entries.flatten() {
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };

            let Some(model_name) = extract_model_name(&name, &self.prefix, &self.suffix) else {
                continue;
            };

            if !known_models.iter().any(|known| known == &model_name) {
                warn!(
                    "Job script '{}' does not match any known model name (parsed model name '{model_name}').",
                    entry.path().display()
                );
            }
        }
    }
}

fn extract_model_name(file_name: &str, prefix: &str, suffix: &str) -> Option<String> {
    if file_name == prefix {
        return None;
    }

    let without_prefix = file_name.strip_prefix(prefix)?;
    let model_name = without_prefix.strip_suffix(suffix)?;

    if model_name.is_empty() {
        None
    } else {
        Some(model_name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use assert_fs::TempDir;

    #[test]
    fn prefers_model_specific_script() {
        let temp = TempDir::new().unwrap();
        temp.child("run-forward.sh").write_str("#!/bin/sh").unwrap();
        temp.child("run-default.sh").write_str("#!/bin/sh").unwrap();

        let dir = temp.path().to_path_buf();
        let locator = JobScriptLocator::new(
            dir.clone(),
            "run-default.sh".into(),
            "run-".into(),
            ".sh".into(),
        );

        assert_eq!(
            locator.select_script("forward").unwrap(),
            dir.join("run-forward.sh")
        );
    }

    #[test]
    fn falls_back_to_default() {
        let temp = TempDir::new().unwrap();
        temp.child("run-default.sh").write_str("#!/bin/sh").unwrap();

        let dir = temp.path().to_path_buf();
        let locator = JobScriptLocator::new(
            dir.clone(),
            "run-default.sh".into(),
            "run-".into(),
            ".sh".into(),
        );

        assert_eq!(
            locator.select_script("forward").unwrap(),
            dir.join("run-default.sh")
        );
    }

    #[test]
    fn missing_script_is_an_error() {
        let temp = TempDir::new().unwrap();
        let locator = JobScriptLocator::new(
            temp.path().to_path_buf(),
            "run-default.sh".into(),
            "run-".into(),
            ".sh".into(),
        );

        assert!(matches!(
            locator.select_script("forward"),
            Err(Error::ScriptMissing(name, _)) if name == "forward"
        ));
    }

    #[test]
    fn extracts_model_name_from_script_file_name() {
        assert_eq!(
            extract_model_name("run-forward.sh", "run-", ".sh"),
            Some("forward".to_string())
        );
        assert_eq!(extract_model_name("run-default.sh", "run-", ".sh"), Some("default".to_string()));
        assert_eq!(extract_model_name("unrelated.txt", "run-", ".sh"), None);
    }
}
