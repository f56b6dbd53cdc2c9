use crate::domain::cost::{AlertBatch, ArtifactLocation};
use rust_decimal::{Decimal, RoundingStrategy};
use std::fmt::Write;

pub const REPORT_SUBJECT: &str = "AWS Cost Report Generated";
pub const ALERT_SUBJECT: &str = "AWS High-Cost Service Alert";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub subject: &'static str,
    pub message: String,
}

pub fn report_notice(location: &ArtifactLocation, window_days: u32) -> Notification {
    Notification {
        subject: REPORT_SUBJECT,
        message: format!(
            "The AWS cost report for the last {window_days} days has been successfully generated and saved to S3: {location}"
        ),
    }
}

/// One line per flagged record: `- <service> on <date>: $<amount>`.
pub fn high_cost_alert(batch: &AlertBatch) -> Notification {
    let mut message = format!(
        "⚠️ High Cost Alert for AWS Services (>${}):\n",
        money(batch.threshold)
    );
    for r in &batch.records {
        let _ = writeln!(message, "- {} on {}: ${}", r.service, r.date, money(r.amount));
    }

    Notification {
        subject: ALERT_SUBJECT,
        message,
    }
}

pub fn money(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("{rounded:.2}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cost::CostRecord;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    #[test]
    fn money_formats_two_places() {
        assert_eq!(money(dec!(55)), "55.00");
        assert_eq!(money(dec!(55.00)), "55.00");
        assert_eq!(money(dec!(2.005)), "2.01");
        assert_eq!(money(dec!(0.1234)), "0.12");
        assert_eq!(money(dec!(1234.5)), "1234.50");
    }

    #[test]
    fn report_notice_references_location() {
        let loc = ArtifactLocation {
            bucket: "billing-reports".to_string(),
            key: "cost_report_2026-01-08.csv".to_string(),
        };
        let n = report_notice(&loc, 7);
        assert_eq!(n.subject, REPORT_SUBJECT);
        assert!(n.message.contains("last 7 days"));
        assert!(n
            .message
            .ends_with("s3://billing-reports/cost_report_2026-01-08.csv"));
    }

    #[test]
    fn alert_lists_each_record() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 7).unwrap();
        let batch = AlertBatch {
            threshold: dec!(50),
            records: vec![
                CostRecord {
                    date,
                    service: "Amazon Relational Database Service".to_string(),
                    amount: dec!(55.004),
                },
                CostRecord {
                    date,
                    service: "Amazon EC2".to_string(),
                    amount: dec!(120.5),
                },
            ],
        };

        let n = high_cost_alert(&batch);
        assert_eq!(n.subject, ALERT_SUBJECT);
        let lines: Vec<&str> = n.message.lines().collect();
        assert_eq!(lines[0], "⚠️ High Cost Alert for AWS Services (>$50.00):");
        assert_eq!(
            lines[1],
            "- Amazon Relational Database Service on 2026-01-07: $55.00"
        );
        assert_eq!(lines[2], "- Amazon EC2 on 2026-01-07: $120.50");
    }
}
