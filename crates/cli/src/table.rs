use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, CellAlignment, Color, ContentArrangement, Table};
use dipscan_core::domain::result::ScoredResult;
use dipscan_core::pipeline::SkippedTicker;

const HEADERS: [&str; 10] = [
    "Ticker", "Name", "Sector", "Price", "P/E", "From high", "RSI (14)", "Vol ratio", "Score", "Tag",
];

/// Renders the ranked table; rows holding the top score are highlighted.
pub fn render_results(results: &[ScoredResult]) -> Table {
    let top = results.iter().map(|r| r.score).max();

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(HEADERS);

    for r in results {
        let mut score = Cell::new(r.score).set_alignment(CellAlignment::Right);
        if Some(r.score) == top && r.score > 0 {
            score = score.fg(Color::Green);
        }
        table.add_row(vec![
            Cell::new(&r.ticker),
            Cell::new(&r.name),
            Cell::new(&r.sector),
            Cell::new(format!("{:.2}", r.price)).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.2}", r.valuation_ratio)).set_alignment(CellAlignment::Right),
            Cell::new(&r.drawdown).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.1}", r.rsi)).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.2}", r.volume_ratio)).set_alignment(CellAlignment::Right),
            score,
            Cell::new(&r.tag),
        ]);
    }
    table
}

pub fn skipped_summary(skipped: &[SkippedTicker]) -> Option<String> {
    if skipped.is_empty() {
        return None;
    }
    let parts: Vec<String> = skipped
        .iter()
        .map(|s| format!("{} ({})", s.raw.trim(), s.reason.as_str()))
        .collect();
    Some(format!("Skipped {}: {}", skipped.len(), parts.join(", ")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dipscan_core::pipeline::SkipReason;

    fn row(ticker: &str, score: u8) -> ScoredResult {
        ScoredResult {
            ticker: ticker.into(),
            name: format!("{ticker} Inc"),
            sector: "Technology".into(),
            price: 10.0,
            valuation_ratio: 12.5,
            drawdown: "-20.0%".into(),
            rsi: 31.2,
            volume_ratio: 1.1,
            score,
            tag: "Worth watching".into(),
        }
    }

    #[test]
    fn renders_one_line_per_result() {
        let table = render_results(&[row("AAA", 100), row("BBB", 40)]);
        assert_eq!(table.row_iter().count(), 2);
        let text = table.to_string();
        assert!(text.contains("AAA"));
        assert!(text.contains("-20.0%"));
    }

    #[test]
    fn summarizes_skips() {
        assert_eq!(skipped_summary(&[]), None);
        let s = skipped_summary(&[
            SkippedTicker {
                raw: "XYZ".into(),
                reason: SkipReason::NoPrice,
            },
            SkippedTicker {
                raw: "CALM".into(),
                reason: SkipReason::Suppressed,
            },
        ])
        .unwrap();
        assert_eq!(s, "Skipped 2: XYZ (price unavailable), CALM (no signal)");
    }
}
