//! Internationalization (i18n) support
//!
//! Built-in translations for the page chrome, and the chrono locale used for
//! month names. Unknown language tags fall back to Brazilian Portuguese.

use serde::Serialize;

/// Supported display languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    PtBr,
    En,
}

impl Locale {
    /// Parse a language tag such as `pt-BR`, `pt_br` or `en-US`
    pub fn from_tag(tag: &str) -> Self {
        let primary = tag
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        match primary.as_str() {
            "en" => Locale::En,
            "pt" => Locale::PtBr,
            _ => {
                tracing::debug!("No translations for {:?}, using pt-BR", tag);
                Locale::PtBr
            }
        }
    }

    /// Value for the `lang` attribute
    pub fn tag(&self) -> &'static str {
        match self {
            Locale::PtBr => "pt-BR",
            Locale::En => "en",
        }
    }

    /// Locale used by chrono for month and day names
    pub fn chrono(&self) -> chrono::Locale {
        match self {
            Locale::PtBr => chrono::Locale::pt_BR,
            Locale::En => chrono::Locale::en_US,
        }
    }

    pub fn messages(&self) -> Messages {
        match self {
            Locale::PtBr => Messages {
                load_more: "Carregar mais posts",
                loading: "Carregando...",
                load_failed: "Não foi possível carregar mais posts",
                unpublished: "Não publicado",
                minutes: "min",
                not_found: "Post não encontrado",
            },
            Locale::En => Messages {
                load_more: "Load more posts",
                loading: "Loading...",
                load_failed: "Could not load more posts",
                unpublished: "Unpublished",
                minutes: "min",
                not_found: "Post not found",
            },
        }
    }
}

/// Interface strings, inserted into every template context
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Messages {
    pub load_more: &'static str,
    pub loading: &'static str,
    pub load_failed: &'static str,
    pub unpublished: &'static str,
    pub minutes: &'static str,
    pub not_found: &'static str,
}
