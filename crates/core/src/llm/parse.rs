/// Splits free-text model output into ticker tokens.
///
/// Newlines, backticks and quotes are removed, tokens are split on commas, trimmed and
/// uppercased. Empty tokens are dropped; order and duplicates are kept as emitted.
pub fn parse_tickers(text: &str) -> Vec<String> {
    let cleaned: String = text
        .chars()
        .filter(|c| !matches!(c, '\n' | '\r' | '`' | '"' | '\''))
        .collect();

    cleaned
        .split(',')
        .map(|t| t.trim().to_uppercase())
        .filter(|t| !t.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_comma_separated_reply() {
        assert_eq!(
            parse_tickers("AAPL, MSFT,\n`TTD`"),
            vec!["AAPL", "MSFT", "TTD"]
        );
    }

    #[test]
    fn empty_inputs_yield_nothing() {
        assert!(parse_tickers("").is_empty());
        assert!(parse_tickers(",, ,").is_empty());
        assert!(parse_tickers("\n``\n").is_empty());
    }

    #[test]
    fn keeps_duplicates_and_order() {
        assert_eq!(
            parse_tickers("\"nvda\", 'amd', nvda"),
            vec!["NVDA", "AMD", "NVDA"]
        );
    }

    #[test]
    fn strips_code_fences() {
        assert_eq!(parse_tickers("```\nCRM, NOW\n```"), vec!["CRM", "NOW"]);
    }
}
