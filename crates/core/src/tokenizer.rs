/// Default cap on the number of tokens kept per label
pub const DEFAULT_MAX_SEQ_LENGTH: usize = 16;

/// Minimum token length after trailing digits are stripped
pub const MIN_TOKEN_LENGTH: usize = 3;

/// Engines that append a trailing classifier segment (`Worm:Win32/Silly.Gaa`),
/// compared against the normalized engine name.
const LAST_DOT_REMOVE_ENGINES: &[&str] = &[
    "avast",
    "avira",
    "comodo",
    "esetnod32",
    "fortinet",
    "gdata",
    "jiangmin",
    "kaspersky",
    "microsoft",
    "nanoantivirus",
    "norman",
    "sophos",
    "trendmicro",
    "trendmicrohousecall",
    "avg",
    "alibaba",
];

/// Separators whose last occurrence starts a suffix, applied in this order
const LAST_REMOVE_DELIMITERS: [char; 3] = ['@', '#', '!'];

/// Keep only ASCII letters and digits, lowercased (`ESET-NOD32` -> `esetnod32`)
pub fn normalize_engine_name(engine: &str) -> String {
    engine
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Drop non-printable characters and surrounding whitespace
pub fn clean_label(label: &str) -> String {
    let printable: String = label
        .chars()
        .filter(|c| c.is_ascii_graphic() || c.is_ascii_whitespace() || *c == '\x0b')
        .collect();
    printable.trim().to_string()
}

/// Strip engine-specific and separator-delimited suffixes.
///
/// `engine` must already be normalized.
pub fn remove_suffixes<'a>(engine: &str, label: &'a str) -> &'a str {
    let mut label = label;
    if LAST_DOT_REMOVE_ENGINES.contains(&engine) {
        label = before_last(label, '.');
    }
    for sep in LAST_REMOVE_DELIMITERS {
        label = before_last(label, sep);
    }
    label
}

fn before_last(text: &str, sep: char) -> &str {
    text.rsplit_once(sep).map_or(text, |(head, _)| head)
}

/// Splits raw detection labels into normalized tokens.
///
/// Tokens are lowercase, at least [`MIN_TOKEN_LENGTH`] long after trailing
/// digits are stripped, never purely numeric and never repeated. Malformed
/// input simply yields fewer tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tokenizer {
    max_seq_length: usize,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SEQ_LENGTH)
    }
}

impl Tokenizer {
    pub fn new(max_seq_length: usize) -> Self {
        Self { max_seq_length }
    }

    pub fn max_seq_length(&self) -> usize {
        self.max_seq_length
    }

    pub fn tokenize(&self, engine: &str, label: &str) -> Vec<String> {
        let engine = normalize_engine_name(engine);
        let label = clean_label(label);
        let label = remove_suffixes(&engine, &label);

        let mut tokens: Vec<String> = Vec::new();
        for candidate in label.split(|c: char| !c.is_ascii_alphanumeric()) {
            if tokens.len() >= self.max_seq_length {
                break;
            }
            if !candidate.is_empty() && candidate.bytes().all(|b| b.is_ascii_digit()) {
                continue;
            }
            let stripped = candidate.trim_end_matches(|c: char| c.is_ascii_digit());
            if stripped.len() < MIN_TOKEN_LENGTH {
                continue;
            }
            let token = stripped.to_ascii_lowercase();
            if !tokens.contains(&token) {
                tokens.push(token);
            }
        }
        tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tokenize(engine: &str, label: &str) -> Vec<String> {
        Tokenizer::default().tokenize(engine, label)
    }

    #[test]
    fn drops_engine_specific_last_segment() {
        assert_eq!(
            tokenize("Microsoft", "Worm:Win32/Silly.Gaa"),
            vec!["worm", "win", "silly"]
        );
        assert_eq!(
            tokenize("ESET-NOD32", "a variant of Win32/Kryptik.HQWG"),
            vec!["variant", "win", "kryptik"]
        );
    }

    #[test]
    fn keeps_mixed_alphanumeric_tokens() {
        assert_eq!(
            tokenize("default", "Worm:Win32/Silly_12a23b"),
            vec!["worm", "win", "silly", "12a23b"]
        );
    }

    #[test]
    fn strips_separator_suffixes() {
        assert_eq!(
            tokenize("Rising", "Trojan.Emotet!8.B95 (TFE:3:8TNkkv9OZTL)"),
            vec!["trojan", "emotet"]
        );
        assert_eq!(
            tokenize("default", "Trojan.Agent@abc.def#x"),
            vec!["trojan", "agent"]
        );
    }

    #[test]
    fn dedupes_keeping_first_occurrence() {
        assert_eq!(
            tokenize("default", "Trojan.Emotet.trojan"),
            vec!["trojan", "emotet"]
        );
    }

    #[test]
    fn rejects_short_and_numeric_tokens() {
        let tokens = tokenize("default", "W32/AB12.123456.Zbot77");
        assert_eq!(tokens, vec!["zbot"]);
        for token in &tokens {
            assert!(token.len() >= MIN_TOKEN_LENGTH);
            assert!(!token.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn drops_non_printable_characters() {
        assert_eq!(
            tokenize("default", "\u{7f}Troj\u{e9}an.Ransom\u{0}"),
            vec!["trojan", "ransom"]
        );
    }

    #[test]
    fn caps_token_count() {
        let tokenizer = Tokenizer::new(2);
        assert_eq!(
            tokenizer.tokenize("default", "one.two.three.four"),
            vec!["one", "two"]
        );
    }

    #[test]
    fn never_fails_on_garbage() {
        assert!(tokenize("", "").is_empty());
        assert!(tokenize("default", "!!!...///").is_empty());
        assert!(tokenize("default", "12345").is_empty());
    }

    #[test]
    fn normalizes_engine_names() {
        assert_eq!(normalize_engine_name("TrendMicro-HouseCall"), "trendmicrohousecall");
        assert_eq!(normalize_engine_name("F-Secure"), "fsecure");
    }
}
