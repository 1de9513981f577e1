//! Command parsing - turns mention text into a directive

use crate::model::{Directive, DirectiveKind, Language};

/// Words that introduce a language clause (`in german`, `auf deutsch`)
const LANGUAGE_MARKERS: &[&str] = &["in", "auf"];

/// Single-token directive keywords, English first, then German
const KEYWORDS: &[(&str, DirectiveKind)] = &[
    ("help", DirectiveKind::Help),
    ("auto", DirectiveKind::Auto),
    ("ocr", DirectiveKind::Ocr),
    ("describe", DirectiveKind::Describe),
    ("caption", DirectiveKind::Describe),
    ("alt_text", DirectiveKind::AltText),
    ("alttext", DirectiveKind::AltText),
    ("alt-text", DirectiveKind::AltText),
    ("hilfe", DirectiveKind::Help),
    ("beschreiben", DirectiveKind::Describe),
    ("beschreibe", DirectiveKind::Describe),
    ("text", DirectiveKind::Ocr),
];

/// Language names accepted in place of a tag
const LANGUAGE_ALIASES: &[(&str, &str)] = &[
    ("english", "en"),
    ("englisch", "en"),
    ("german", "de"),
    ("deutsch", "de"),
    ("french", "fr"),
    ("francais", "fr"),
    ("français", "fr"),
    ("spanish", "es"),
    ("espanol", "es"),
    ("español", "es"),
    ("italian", "it"),
    ("italiano", "it"),
    ("portuguese", "pt"),
    ("portugues", "pt"),
    ("português", "pt"),
    ("brazilian", "pt-br"),
    ("dutch", "nl"),
    ("nederlands", "nl"),
    ("japanese", "ja"),
    ("chinese", "zh"),
    ("mandarin", "zh"),
    ("korean", "ko"),
    ("russian", "ru"),
    ("arabic", "ar"),
    ("hindi", "hi"),
    ("polish", "pl"),
    ("polski", "pl"),
    ("swedish", "sv"),
    ("turkish", "tr"),
    ("ukrainian", "uk"),
    ("greek", "el"),
    ("hebrew", "he"),
    ("czech", "cs"),
    ("danish", "da"),
    ("finnish", "fi"),
    ("norwegian", "no"),
    ("indonesian", "id"),
    ("vietnamese", "vi"),
    ("thai", "th"),
    ("catalan", "ca"),
    ("welsh", "cy"),
    ("irish", "ga"),
];

/// ISO 639-1 codes
const ISO_639_1: &[&str] = &[
    "aa", "ab", "ae", "af", "ak", "am", "an", "ar", "as", "av", "ay", "az", "ba", "be", "bg", "bh",
    "bi", "bm", "bn", "bo", "br", "bs", "ca", "ce", "ch", "co", "cr", "cs", "cu", "cv", "cy", "da",
    "de", "dv", "dz", "ee", "el", "en", "eo", "es", "et", "eu", "fa", "ff", "fi", "fj", "fo", "fr",
    "fy", "ga", "gd", "gl", "gn", "gu", "gv", "ha", "he", "hi", "ho", "hr", "ht", "hu", "hy", "hz",
    "ia", "id", "ie", "ig", "ii", "ik", "io", "is", "it", "iu", "ja", "jv", "ka", "kg", "ki", "kj",
    "kk", "kl", "km", "kn", "ko", "kr", "ks", "ku", "kv", "kw", "ky", "la", "lb", "lg", "li", "ln",
    "lo", "lt", "lu", "lv", "mg", "mh", "mi", "mk", "ml", "mn", "mr", "ms", "mt", "my", "na", "nb",
    "nd", "ne", "ng", "nl", "nn", "no", "nr", "nv", "ny", "oc", "oj", "om", "or", "os", "pa", "pi",
    "pl", "ps", "pt", "qu", "rm", "rn", "ro", "ru", "rw", "sa", "sc", "sd", "se", "sg", "si", "sk",
    "sl", "sm", "sn", "so", "sq", "sr", "ss", "st", "su", "sv", "sw", "ta", "te", "tg", "th", "ti",
    "tk", "tl", "tn", "to", "tr", "ts", "tt", "tw", "ty", "ug", "uk", "ur", "uz", "ve", "vi", "vo",
    "wa", "wo", "xh", "yi", "yo", "za", "zh", "zu",
];

/// Codes that double as everyday English words; only accepted by name
const AMBIGUOUS_CODES: &[&str] = &[
    "am", "an", "as", "be", "he", "is", "it", "my", "no", "or", "so", "to",
];

/// Parse the text following the bot mention. Never fails: empty text means
/// auto, unrecognized text means help.
pub fn parse_directive(text: &str, default_language: &Language) -> Directive {
    let tokens = normalize(text);
    if tokens.is_empty() {
        return Directive::auto(default_language.clone());
    }

    let mut kinds = Vec::new();
    let mut language = None;
    let mut i = 0;

    while i < tokens.len() {
        let token = tokens[i].as_str();
        let next = tokens.get(i + 1).map(String::as_str);

        if LANGUAGE_MARKERS.contains(&token) {
            if let Some(lang) = next.and_then(resolve_language) {
                language = Some(lang);
                i += 2;
                continue;
            }
        }

        if token == "alt" && next == Some("text") {
            kinds.push(DirectiveKind::AltText);
            i += 2;
            continue;
        }

        if let Some((_, kind)) = KEYWORDS.iter().find(|(word, _)| *word == token) {
            kinds.push(*kind);
        }
        i += 1;
    }

    let has_language_clause = language.is_some();
    let language = language.unwrap_or_else(|| default_language.clone());

    if kinds.is_empty() && !has_language_clause {
        tracing::debug!(text = %text, "No directive recognized, falling back to help");
        return Directive::help(language);
    }

    Directive::new(kinds, language)
}

/// Resolve a token to a language: strict tag syntax first, then names
pub fn resolve_language(token: &str) -> Option<Language> {
    parse_language_tag(token).or_else(|| {
        LANGUAGE_ALIASES
            .iter()
            .find(|(name, _)| *name == token)
            .map(|(_, tag)| Language::new(tag))
    })
}

/// Accepts `xx`, `xx-yyyy`, `xx-rr`, `xx-999` and `xx-yyyy-rr` with a known primary subtag
fn parse_language_tag(token: &str) -> Option<Language> {
    let mut parts = token.split(['-', '_']);
    let primary = parts.next()?;
    if !ISO_639_1.contains(&primary) || AMBIGUOUS_CODES.contains(&primary) {
        return None;
    }

    let mut seen_region = false;
    let mut seen_script = false;
    for part in parts {
        let is_script = part.len() == 4 && part.chars().all(|c| c.is_ascii_alphabetic());
        let is_region = (part.len() == 2 && part.chars().all(|c| c.is_ascii_alphabetic()))
            || (part.len() == 3 && part.chars().all(|c| c.is_ascii_digit()));
        if is_script && !seen_script && !seen_region {
            seen_script = true;
        } else if is_region && !seen_region {
            seen_region = true;
        } else {
            return None;
        }
    }

    Some(Language::new(token))
}

/// Lower-case, drop other mentions and links, strip punctuation, split on whitespace
fn normalize(text: &str) -> Vec<String> {
    text.split_whitespace()
        .filter(|word| !word.starts_with('@'))
        .filter(|word| {
            let lower = word.to_lowercase();
            !(lower.starts_with("http://") || lower.starts_with("https://"))
        })
        .flat_map(|word| {
            word.to_lowercase()
                .chars()
                .map(|c| {
                    if c.is_alphanumeric() || c == '-' || c == '_' {
                        c
                    } else {
                        ' '
                    }
                })
                .collect::<String>()
                .split_whitespace()
                .map(|t| t.trim_matches('-').to_string())
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
        })
        .collect()
}
