use crate::domain::result::ScoredResult;
use anyhow::Context;
use std::io::{Read, Write};
use std::path::Path;

/// Writes the ranked table as UTF-8 CSV, header first, rows in the given order.
pub fn write_csv<W: Write>(results: &[ScoredResult], writer: W) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    if results.is_empty() {
        wtr.write_record(HEADER)
            .context("failed to write CSV header")?;
    }
    for row in results {
        wtr.serialize(row)
            .with_context(|| format!("failed to write CSV row for {}", row.ticker))?;
    }
    wtr.flush().context("failed to flush CSV output")?;
    Ok(())
}

pub fn read_csv<R: Read>(reader: R) -> anyhow::Result<Vec<ScoredResult>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut out = Vec::new();
    for (idx, row) in rdr.deserialize::<ScoredResult>().enumerate() {
        out.push(row.with_context(|| format!("invalid CSV row {}", idx + 1))?);
    }
    Ok(out)
}

pub fn export_csv(results: &[ScoredResult], path: &Path) -> anyhow::Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    write_csv(results, file)?;
    tracing::info!(path = %path.display(), rows = results.len(), "exported results");
    Ok(())
}

/// Serde only emits the header with the first row, so an empty table writes it by hand.
const HEADER: [&str; 10] = [
    "ticker",
    "name",
    "sector",
    "price",
    "valuation_ratio",
    "drawdown",
    "rsi",
    "volume_ratio",
    "score",
    "tag",
];

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<ScoredResult> {
        vec![
            ScoredResult {
                ticker: "BRK-B".into(),
                name: "Berkshire Hathaway Inc. \"B\"".into(),
                sector: "Financial Services".into(),
                price: 412.37,
                valuation_ratio: 0.0,
                drawdown: "-16.2%".into(),
                rsi: 38.4,
                volume_ratio: 1.73,
                score: 80,
                tag: "Worth watching (oversold, volume spike)".into(),
            },
            ScoredResult {
                ticker: "TTD".into(),
                name: "The Trade Desk, Inc.".into(),
                sector: "Unknown".into(),
                price: 61.2,
                valuation_ratio: 24.91,
                drawdown: "-3.0%".into(),
                rsi: 44.0,
                volume_ratio: 0.87,
                score: 30,
                tag: "Use caution (undervalued)".into(),
            },
        ]
    }

    #[test]
    fn round_trips_all_fields() {
        let rows = sample();
        let mut buf = Vec::new();
        write_csv(&rows, &mut buf).unwrap();
        let text = String::from_utf8(buf.clone()).unwrap();
        assert!(text.starts_with(
            "ticker,name,sector,price,valuation_ratio,drawdown,rsi,volume_ratio,score,tag\n"
        ));
        assert_eq!(read_csv(buf.as_slice()).unwrap(), rows);
    }

    #[test]
    fn empty_table_still_has_header() {
        let mut buf = Vec::new();
        write_csv(&[], &mut buf).unwrap();
        let text = String::from_utf8(buf.clone()).unwrap();
        assert_eq!(text.trim_end(), HEADER.join(","));
        assert!(read_csv(buf.as_slice()).unwrap().is_empty());
    }
}
