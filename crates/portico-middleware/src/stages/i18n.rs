//! Locale negotiation middleware.
//!
//! Parses `Accept-Language`, matches it against the configured locale
//! list, and stores the winner under [`LOCALE_KEY`]. A language tag
//! matches a configured locale exactly or by primary subtag, so
//! `en-US` selects `en`. No acceptable match falls back to the default
//! locale.

use portico_core::{BoxFuture, Context, Handler};
use portico_config::I18nConfig;

/// The context store key holding the negotiated locale as a `String`.
pub const LOCALE_KEY: &str = "locale";

/// Middleware that negotiates the request locale.
#[derive(Debug, Clone)]
pub struct I18nLocale {
    config: I18nConfig,
}

impl I18nLocale {
    /// Creates a locale stage from its config section.
    #[must_use]
    pub fn new(config: I18nConfig) -> Self {
        Self { config }
    }

    fn negotiate(&self, accept_language: Option<&str>) -> String {
        let Some(accept_language) = accept_language else {
            return self.config.default_locale.clone();
        };

        for (tag, _quality) in parse_accept_language(accept_language) {
            if let Some(locale) = self.match_locale(&tag) {
                return locale;
            }
        }
        self.config.default_locale.clone()
    }

    fn match_locale(&self, tag: &str) -> Option<String> {
        let tag = tag.to_ascii_lowercase();
        let primary = tag.split('-').next().unwrap_or(&tag).to_string();
        self.config
            .locales
            .iter()
            .find(|locale| {
                let locale = locale.to_ascii_lowercase();
                locale == tag || locale == primary
            })
            .cloned()
    }
}

/// Splits an `Accept-Language` value into (tag, quality) pairs sorted by
/// descending quality. Tags with `q=0` are dropped.
fn parse_accept_language(value: &str) -> Vec<(String, f32)> {
    let mut tags: Vec<(String, f32)> = value
        .split(',')
        .filter_map(|part| {
            let part = part.trim();
            if part.is_empty() {
                return None;
            }
            let mut pieces = part.split(';');
            let tag = pieces.next()?.trim().to_string();
            let quality = pieces
                .find_map(|p| p.trim().strip_prefix("q=").map(str::trim).map(str::parse::<f32>))
                .and_then(Result::ok)
                .unwrap_or(1.0)
                .clamp(0.0, 1.0);
            (quality > 0.0).then_some((tag, quality))
        })
        .collect();

    tags.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    tags
}

impl Handler for I18nLocale {
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let locale = self.negotiate(ctx.request_header("accept-language"));
            ctx.set(LOCALE_KEY, locale);
            ctx.next().await;
        })
    }
}
