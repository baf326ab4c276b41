//! Internationalization (i18n) module
//!
//! Picks the CLI language from the system locale. Supports English and
//! Chinese Simplified; strings live in `locales/*.yml`.
//! Note: Log messages remain in English for consistency.

use std::sync::OnceLock;
use tracing::debug;

/// Supported languages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    English,
    ChineseSimplified,
}

impl Language {
    /// Map a BCP 47 tag or POSIX locale such as `zh_CN.UTF-8`
    pub fn from_locale(locale: &str) -> Self {
        let locale = locale.to_lowercase();
        if locale.starts_with("zh") || locale.contains("hans") {
            Language::ChineseSimplified
        } else {
            Language::English
        }
    }

    /// Locale key used by the translation files
    pub fn code(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::ChineseSimplified => "zh-CN",
        }
    }
}

/// Global language instance
static LANGUAGE: OnceLock<Language> = OnceLock::new();

/// Initialize and get the current language based on system locale
pub fn get_language() -> Language {
    *LANGUAGE.get_or_init(detect_language)
}

fn detect_language() -> Language {
    let locale = sys_locale::get_locale()
        .or_else(|| std::env::var("LC_ALL").ok())
        .or_else(|| std::env::var("LANG").ok())
        .unwrap_or_default();
    Language::from_locale(&locale)
}

/// Select the translation set for the current system locale
pub fn init_locale() {
    let language = get_language();
    rust_i18n::set_locale(language.code());
    debug!(locale = language.code(), "Locale initialized");
}
