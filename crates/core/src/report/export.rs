use crate::domain::cost::{CostRecord, ReportArtifact};
use anyhow::Context;
use chrono::NaiveDate;
use csv::Writer;

pub const HEADER: [&str; 3] = ["Date", "Service", "Amount"];

const KEY_STEM: &str = "cost_report_";
const KEY_EXTENSION: &str = "csv";

/// `[prefix/]cost_report_YYYY-MM-DD.csv`. Same-day runs share a key and overwrite each other.
pub fn artifact_key(prefix: Option<&str>, report_date: NaiveDate) -> String {
    let file_name = format!(
        "{KEY_STEM}{}.{KEY_EXTENSION}",
        report_date.format("%Y-%m-%d")
    );
    match prefix.map(|p| p.trim_matches('/')).filter(|p| !p.is_empty()) {
        Some(p) => format!("{p}/{file_name}"),
        None => file_name,
    }
}

pub fn serialize_csv(records: &[CostRecord]) -> anyhow::Result<String> {
    let mut wtr = Writer::from_writer(vec![]);
    wtr.write_record(HEADER)
        .context("failed to write CSV header")?;

    for r in records {
        wtr.write_record([
            r.date.format("%Y-%m-%d").to_string(),
            r.service.clone(),
            r.amount.to_string(),
        ])
        .context("failed to write CSV row")?;
    }

    let data = wtr
        .into_inner()
        .map_err(|e| anyhow::anyhow!("CSV writer error: {e}"))?;
    String::from_utf8(data).context("CSV output is not UTF-8")
}

pub fn build_artifact(
    prefix: Option<&str>,
    report_date: NaiveDate,
    records: &[CostRecord],
) -> anyhow::Result<ReportArtifact> {
    Ok(ReportArtifact {
        key: artifact_key(prefix, report_date),
        body: serialize_csv(records)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, d).unwrap()
    }

    #[test]
    fn key_is_date_derived_and_stable() {
        assert_eq!(artifact_key(None, date(9)), "cost_report_2026-01-09.csv");
        assert_eq!(artifact_key(None, date(9)), artifact_key(None, date(9)));
        assert_eq!(
            artifact_key(Some("/reports/daily/"), date(9)),
            "reports/daily/cost_report_2026-01-09.csv"
        );
        assert_eq!(artifact_key(Some(""), date(9)), "cost_report_2026-01-09.csv");
    }

    #[test]
    fn empty_records_yield_header_only() {
        let out = serialize_csv(&[]).unwrap();
        assert_eq!(out, "Date,Service,Amount\n");
    }

    #[test]
    fn rows_follow_header_in_order() {
        let records = vec![
            CostRecord {
                date: date(1),
                service: "Amazon Elastic Compute Cloud - Compute".to_string(),
                amount: dec!(12.3400000001),
            },
            CostRecord {
                date: date(2),
                service: "AWS Key Management Service".to_string(),
                amount: dec!(0),
            },
        ];

        let out = serialize_csv(&records).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "Date,Service,Amount");
        assert_eq!(
            lines[1],
            "2026-01-01,Amazon Elastic Compute Cloud - Compute,12.3400000001"
        );
        assert_eq!(lines[2], "2026-01-02,AWS Key Management Service,0");
    }

    #[test]
    fn service_names_with_commas_round_trip() {
        let records = vec![CostRecord {
            date: date(3),
            service: "Tax, Support".to_string(),
            amount: dec!(1.5),
        }];

        let out = serialize_csv(&records).unwrap();
        let mut reader = csv::Reader::from_reader(out.as_bytes());
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.iter().collect::<Vec<_>>(), HEADER);

        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][1], "Tax, Support");
        assert_eq!(&rows[0][2], "1.5");
    }
}
