//! Localized user-facing message lookup.
//!
//! Result messages shown to operators are resolved through a per-language
//! string table (English and French, matching the platform UI). A missing
//! key degrades to a bracketed `[key]` placeholder; message lookup must
//! never fail an execution.

/// English message table.
const MESSAGES_EN: &[(&str, &str)] = &[
    ("execution.success", "The extraction was processed successfully."),
    ("error.settings.none", "No settings are defined for this task."),
    ("error.settings.serviceurl.missing", "The service URL is not defined."),
    (
        "error.settings.serviceurl.invalid",
        "The service URL is invalid or points at a restricted host.",
    ),
    ("error.settings.auth.missing", "No credentials are defined for the service."),
    ("error.settings.mode.invalid", "The execution mode is invalid."),
    ("error.payload.failed", "The request payload could not be built."),
    ("error.submit.failed", "The request could not be submitted to the service."),
    ("error.response.nourl", "The service response contains no download URL."),
    ("error.poll.timeout", "The remote job did not complete in time."),
    ("error.poll.jobfailed", "The remote job reported a failure."),
    ("error.download.failed", "The result file could not be downloaded."),
    ("error.download.toolarge", "The result file exceeds the allowed size."),
    ("error.process.failed", "The extraction failed: {0}"),
    ("error.cancelled", "The extraction was cancelled."),
];

/// French message table.
const MESSAGES_FR: &[(&str, &str)] = &[
    ("execution.success", "L'extraction a été traitée avec succès."),
    ("error.settings.none", "Aucun paramètre n'est défini pour cette tâche."),
    ("error.settings.serviceurl.missing", "L'URL du service n'est pas définie."),
    (
        "error.settings.serviceurl.invalid",
        "L'URL du service est invalide ou pointe vers un hôte restreint.",
    ),
    ("error.settings.auth.missing", "Aucune authentification n'est définie pour le service."),
    ("error.settings.mode.invalid", "Le mode d'exécution est invalide."),
    ("error.payload.failed", "Le contenu de la requête n'a pas pu être construit."),
    ("error.submit.failed", "La requête n'a pas pu être soumise au service."),
    ("error.response.nourl", "La réponse du service ne contient pas d'URL de téléchargement."),
    ("error.poll.timeout", "Le traitement distant n'a pas abouti dans le délai imparti."),
    ("error.poll.jobfailed", "Le traitement distant a signalé une erreur."),
    ("error.download.failed", "Le fichier de résultat n'a pas pu être téléchargé."),
    ("error.download.toolarge", "Le fichier de résultat dépasse la taille autorisée."),
    ("error.process.failed", "L'extraction a échoué : {0}"),
    ("error.cancelled", "L'extraction a été annulée."),
];

/// Message table for one user-interface language.
#[derive(Debug, Clone)]
pub struct LocalizedMessages {
    table: &'static [(&'static str, &'static str)],
}

impl LocalizedMessages {
    /// Creates a lookup for the given language tag. Unknown languages fall
    /// back to English.
    pub fn new(lang: &str) -> Self {
        let table = match lang.to_ascii_lowercase().as_str() {
            "fr" => MESSAGES_FR,
            _ => MESSAGES_EN,
        };
        Self { table }
    }

    /// Resolves `key`, or returns `[key]` when it is unknown.
    pub fn get(&self, key: &str) -> String {
        self.table
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| (*v).to_string())
            .unwrap_or_else(|| format!("[{}]", key))
    }

    /// Resolves `key` and substitutes `{0}`, `{1}`, … with `args`.
    pub fn format(&self, key: &str, args: &[&str]) -> String {
        let mut message = self.get(key);
        for (index, arg) in args.iter().enumerate() {
            message = message.replace(&format!("{{{}}}", index), arg);
        }
        message
    }
}

impl Default for LocalizedMessages {
    fn default() -> Self {
        Self::new("en")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_english_lookup() {
        let messages = LocalizedMessages::new("en");
        assert_eq!(
            messages.get("execution.success"),
            "The extraction was processed successfully."
        );
    }

    #[test]
    fn test_french_lookup() {
        let messages = LocalizedMessages::new("fr");
        assert_eq!(
            messages.get("execution.success"),
            "L'extraction a été traitée avec succès."
        );
    }

    #[test]
    fn test_unknown_language_falls_back_to_english() {
        let messages = LocalizedMessages::new("de");
        assert_eq!(
            messages.get("error.settings.none"),
            "No settings are defined for this task."
        );
    }

    #[test]
    fn test_missing_key_yields_placeholder() {
        let messages = LocalizedMessages::default();
        assert_eq!(messages.get("no.such.key"), "[no.such.key]");
    }

    #[test]
    fn test_format_substitution() {
        let messages = LocalizedMessages::new("en");
        assert_eq!(
            messages.format("error.process.failed", &["connection reset"]),
            "The extraction failed: connection reset"
        );
    }

    #[test]
    fn test_every_english_key_has_a_french_entry() {
        for (key, _) in MESSAGES_EN {
            assert!(
                MESSAGES_FR.iter().any(|(k, _)| k == key),
                "missing French translation for {}",
                key
            );
        }
    }
}
