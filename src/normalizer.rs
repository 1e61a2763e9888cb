//! Canonical forms of lead identifiers.
//!
//! Everything here is total: missing or malformed input comes back as `None`
//! (or an empty string for free text) and simply drops out of scoring.

use crate::models::{DuplicateCheckInput, ExistingLead};
use regex::Regex;
use std::borrow::Cow;
use std::fmt;
use std::sync::LazyLock;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;
use url::Url;

/// Digits in a normalized CNPJ.
pub const CNPJ_LENGTH: usize = 14;

/// Characters that separate words rather than carry meaning ("Acme-Realty").
const WORD_SEPARATORS: [char; 5] = ['-', '/', '\\', '_', '|'];

/// Dotted DNS name, lower-case ASCII (IDNs arrive here already punycoded).
static HOST_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?(?:\.[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?)+$",
    )
    .expect("host pattern is valid")
});

/// Normalize free text for comparison.
///
/// Lower-cases, strips diacritics ("Razão" → "razao"), drops punctuation,
/// turns separators into spaces, collapses whitespace and trims.
///
/// ```
/// use rust_lead_dedup::normalizer::normalize_text;
///
/// assert_eq!(normalize_text("  Padaria  São-José, Ltda. "), "padaria sao jose ltda");
/// ```
pub fn normalize_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_space = false;

    for ch in raw.to_lowercase().nfd() {
        if is_combining_mark(ch) {
            continue;
        }
        if ch.is_alphanumeric() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(ch);
        } else if ch.is_whitespace() || WORD_SEPARATORS.contains(&ch) {
            pending_space = true;
        }
    }

    out
}

/// Like [`normalize_text`], but blank results become `None`.
pub fn normalize_optional_text(raw: Option<&str>) -> Option<String> {
    raw.map(normalize_text).filter(|text| !text.is_empty())
}

/// A CNPJ reduced to its 14 digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cnpj(String);

impl Cnpj {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cnpj {
    /// Formats as `XX.XXX.XXX/XXXX-XX`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = &self.0;
        write!(
            f,
            "{}.{}.{}/{}-{}",
            &d[0..2],
            &d[2..5],
            &d[5..8],
            &d[8..12],
            &d[12..14]
        )
    }
}

/// Strip everything but digits; anything other than 14 digits is no CNPJ.
pub fn normalize_cnpj(raw: &str) -> Option<Cnpj> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    (digits.len() == CNPJ_LENGTH).then_some(Cnpj(digits))
}

/// Render a CNPJ as `XX.XXX.XXX/XXXX-XX`, or return the input untouched when
/// it does not hold 14 digits.
pub fn format_cnpj(raw: &str) -> String {
    match normalize_cnpj(raw) {
        Some(cnpj) => cnpj.to_string(),
        None => raw.to_string(),
    }
}

/// Domain of an email address, lower-cased.
///
/// ```
/// use rust_lead_dedup::normalizer::extract_email_domain;
///
/// assert_eq!(extract_email_domain("Contato@Acme.com.br").as_deref(), Some("acme.com.br"));
/// assert_eq!(extract_email_domain("no-at-sign"), None);
/// ```
pub fn extract_email_domain(raw: &str) -> Option<String> {
    let (_, domain) = raw.trim().rsplit_once('@')?;
    if domain.is_empty() || domain.contains(['/', '?', '#', ':']) {
        return None;
    }
    canonical_host(&format!("http://{domain}"))
}

/// Host of a website with protocol, `www.`, port, path and query removed.
///
/// ```
/// use rust_lead_dedup::normalizer::extract_website_domain;
///
/// assert_eq!(
///     extract_website_domain("https://www.Example.com/path?q=1").as_deref(),
///     Some("example.com")
/// );
/// ```
pub fn extract_website_domain(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let with_scheme = if trimmed.contains("://") {
        Cow::Borrowed(trimmed)
    } else {
        Cow::Owned(format!("http://{trimmed}"))
    };
    let mut host = canonical_host(&with_scheme)?;
    // "www.com" stays as is
    while let Some(rest) = host.strip_prefix("www.") {
        if !HOST_REGEX.is_match(rest) {
            break;
        }
        host = rest.to_string();
    }
    Some(host)
}

fn canonical_host(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    // `domain()` is None for IP literals
    let host = parsed.domain()?.trim_end_matches('.').to_ascii_lowercase();
    HOST_REGEX.is_match(&host).then_some(host)
}

/// Comparable form of a lead: every optional field is either a canonical
/// value or absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedLead {
    pub legal_name: String,
    pub trade_name: Option<String>,
    pub cnpj: Option<Cnpj>,
    pub email_domain: Option<String>,
    pub website_domain: Option<String>,
}

impl NormalizedLead {
    pub fn from_input(input: &DuplicateCheckInput) -> Self {
        Self::from_fields(
            &input.legal_name,
            input.trade_name.as_deref(),
            input.cnpj.as_deref(),
            input.email.as_deref(),
            input.website.as_deref(),
        )
    }

    pub fn from_existing(lead: &ExistingLead) -> Self {
        Self::from_fields(
            &lead.legal_name,
            lead.trade_name.as_deref(),
            lead.cnpj.as_deref(),
            lead.email.as_deref(),
            lead.website.as_deref(),
        )
    }

    fn from_fields(
        legal_name: &str,
        trade_name: Option<&str>,
        cnpj: Option<&str>,
        email: Option<&str>,
        website: Option<&str>,
    ) -> Self {
        Self {
            legal_name: normalize_text(legal_name),
            trade_name: normalize_optional_text(trade_name),
            cnpj: cnpj.and_then(normalize_cnpj),
            email_domain: email.and_then(extract_email_domain),
            website_domain: website.and_then(extract_website_domain),
        }
    }
}
