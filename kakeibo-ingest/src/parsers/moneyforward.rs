//! MoneyForward ME CSV export parser
//!
//! Expected header (column order varies between export versions, so columns are
//! located by name):
//!   計算対象,日付,内容,金額（円）,保有金融機関,大項目,中項目,メモ,振替,ID
//!
//! Rows with a malformed date or amount are dropped and reported; they never abort
//! the file.

use std::io::Read;

use chrono::NaiveDate;
use csv::StringRecord;
use kakeibo_core::TransactionRecord;
use regex::Regex;
use tracing::{debug, warn};

use crate::error::{IngestError, RowError};
use crate::types::{DroppedRow, ParseOutcome};

const DATE_FORMAT: &str = "%Y/%m/%d";

/// Header names used to locate each field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnNames {
    pub date: String,
    pub amount: String,
    pub major: String,
    pub minor: String,
    pub memo: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            date: "日付".to_string(),
            amount: "金額（円）".to_string(),
            major: "大項目".to_string(),
            minor: "中項目".to_string(),
            memo: "内容".to_string(),
        }
    }
}

/// Resolved column positions. Only date and amount are mandatory.
#[derive(Debug, Clone, Copy)]
struct ColumnIndex {
    date: usize,
    amount: usize,
    major: Option<usize>,
    minor: Option<usize>,
    memo: Option<usize>,
}

impl ColumnIndex {
    fn locate(headers: &StringRecord, names: &ColumnNames) -> Result<Self, IngestError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim_start_matches('\u{feff}').trim() == name)
        };
        let required = |name: &str| find(name).ok_or_else(|| IngestError::MissingColumn(name.to_string()));

        Ok(Self {
            date: required(&names.date)?,
            amount: required(&names.amount)?,
            major: find(&names.major),
            minor: find(&names.minor),
            memo: find(&names.memo),
        })
    }
}

/// Parse an export into transaction records.
///
/// Blank or absent category cells become the unclassified sentinel.
pub fn parse_moneyforward_csv<R: Read>(
    reader: R,
    columns: &ColumnNames,
) -> Result<ParseOutcome, IngestError> {
    let amount_re = Regex::new(r"^[+-]?(?:\d{1,3}(?:,\d{3})+|\d+)(?:\.\d+)?$")?;

    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(true)
        .from_reader(reader);

    let index = ColumnIndex::locate(rdr.headers()?, columns)?;
    debug!(?index, "located export columns");

    let mut out = ParseOutcome::default();

    for (i, result) in rdr.records().enumerate() {
        let fallback_line = i as u64 + 2;
        let parsed = match result {
            Ok(record) => {
                let line = record.position().map_or(fallback_line, |p| p.line());
                (line, parse_row(&record, &index, &amount_re))
            }
            // A failing source is fatal; only rows the reader cannot decode are dropped.
            Err(e) if matches!(e.kind(), csv::ErrorKind::Io(_)) => return Err(IngestError::Csv(e)),
            Err(e) => {
                let line = e.position().map_or(fallback_line, |p| p.line());
                (line, Err(RowError::Unreadable(e.to_string())))
            }
        };

        match parsed {
            (_, Ok(txn)) => out.records.push(txn),
            (line, Err(reason)) => {
                warn!(line, %reason, "dropping row");
                out.dropped.push(DroppedRow { line, reason });
            }
        }
    }

    Ok(out)
}

fn parse_row(
    record: &StringRecord,
    index: &ColumnIndex,
    amount_re: &Regex,
) -> Result<TransactionRecord, RowError> {
    let cell = |i: Option<usize>| i.and_then(|i| record.get(i)).unwrap_or("").trim();

    let date_raw = cell(Some(index.date));
    let date = NaiveDate::parse_from_str(date_raw, DATE_FORMAT)
        .map_err(|_| RowError::MalformedDate(date_raw.to_string()))?;

    let amount_raw = cell(Some(index.amount));
    let amount = parse_amount(amount_raw, amount_re)?;

    Ok(TransactionRecord::new(
        date,
        amount,
        cell(index.major),
        cell(index.minor),
        cell(index.memo),
    ))
}

fn parse_amount(raw: &str, amount_re: &Regex) -> Result<f64, RowError> {
    if !amount_re.is_match(raw) {
        return Err(RowError::MalformedAmount(raw.to_string()));
    }
    raw.replace(',', "")
        .parse::<f64>()
        .map_err(|_| RowError::MalformedAmount(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use kakeibo_core::UNCLASSIFIED;

    const HEADER: &str = "計算対象,日付,内容,金額（円）,保有金融機関,大項目,中項目,メモ,振替,ID";

    fn parse(body: &str) -> ParseOutcome {
        let text = format!("{HEADER}\n{body}");
        parse_moneyforward_csv(text.as_bytes(), &ColumnNames::default()).unwrap()
    }

    #[test]
    fn test_parses_basic_rows() {
        let out = parse(
            "1,2024/04/01,給与 株式会社ACME,1000,みずほ銀行,収入,給与,,0,a1\n\
             1,2024/04/03,サイゼリヤ,-300,楽天カード,食費,外食,,0,a2\n",
        );
        assert_eq!(out.records.len(), 2);
        assert_eq!(out.dropped_count(), 0);

        let first = &out.records[0];
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2024, 4, 1).unwrap());
        assert_eq!(first.amount, 1000.0);
        assert_eq!(first.major_category, "収入");
        assert_eq!(first.minor_category, "給与");
        assert!(first.memo.contains("ACME"));

        assert_eq!(out.records[1].amount, -300.0);
    }

    #[test]
    fn test_malformed_amount_is_dropped_not_fatal() {
        let out = parse(
            "1,2024/04/01,給与,1000,銀行,収入,給与,,0,a1\n\
             1,2024/04/02,謎,abc,銀行,食費,外食,,0,a2\n\
             1,2024/04/03,ランチ,-300,銀行,食費,外食,,0,a3\n",
        );
        assert_eq!(out.records.len(), 2);
        assert_eq!(out.dropped_count(), 1);
        assert_eq!(out.dropped[0].line, 3);
        assert_eq!(out.dropped[0].reason, RowError::MalformedAmount("abc".to_string()));
    }

    #[test]
    fn test_malformed_date_is_dropped() {
        let out = parse("1,2024-04-01,ランチ,-300,銀行,食費,外食,,0,a1\n");
        assert!(out.records.is_empty());
        assert_eq!(
            out.dropped[0].reason,
            RowError::MalformedDate("2024-04-01".to_string())
        );
    }

    #[test]
    fn test_rejects_non_numeric_float_spellings() {
        for bad in ["NaN", "inf", "", "1.2.3", "12,34"] {
            let out = parse(&format!("1,2024/04/01,x,{bad},銀行,食費,外食,,0,a1\n"));
            assert_eq!(out.dropped_count(), 1, "expected `{bad}` to be rejected");
        }
    }

    #[test]
    fn test_thousands_grouping_and_decimals() {
        let out = parse(
            "1,2024/04/01,家賃,\"-85,000\",銀行,住まい,家賃,,0,a1\n\
             1,2024/04/02,利息,0.5,銀行,収入,,,0,a2\n",
        );
        assert_eq!(out.records[0].amount, -85000.0);
        assert_eq!(out.records[1].amount, 0.5);
    }

    #[test]
    fn test_blank_categories_become_unclassified() {
        let out = parse("1,2024/04/01,コンビニ,-150,銀行,,,,0,a1\n");
        let r = &out.records[0];
        assert_eq!(r.major_category, UNCLASSIFIED);
        assert_eq!(r.minor_category, UNCLASSIFIED);
        assert!(r.needs_resolution());
    }

    #[test]
    fn test_columns_located_by_header_not_position() {
        let text = "\u{feff}金額（円）,内容,日付\n-500,書店,2024/05/10\n";
        let out = parse_moneyforward_csv(text.as_bytes(), &ColumnNames::default()).unwrap();
        assert_eq!(out.records.len(), 1);
        let r = &out.records[0];
        assert_eq!(r.amount, -500.0);
        assert_eq!(r.memo, "書店");
        assert_eq!(r.major_category, UNCLASSIFIED);
    }

    #[test]
    fn test_missing_amount_column_is_fatal() {
        let text = "日付,内容\n2024/05/10,書店\n";
        let err = parse_moneyforward_csv(text.as_bytes(), &ColumnNames::default()).unwrap_err();
        assert!(matches!(err, IngestError::MissingColumn(ref c) if c == "金額（円）"));
    }

    /// Yields `data` once, then fails every later read.
    struct FailingReader {
        data: Vec<u8>,
        served: bool,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.served {
                return Err(std::io::Error::other("disk read error"));
            }
            self.served = true;
            let n = self.data.len().min(buf.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            Ok(n)
        }
    }

    #[test]
    fn test_undecodable_row_is_dropped_and_parsing_continues() {
        let mut bytes = format!("{HEADER}\n1,2024/04/01,a,-100,銀行,食費,外食,,0,a1\n1,2024/04/02,").into_bytes();
        bytes.extend_from_slice(&[0xff, 0xfe]);
        bytes.extend_from_slice("x,-200,銀行,食費,外食,,0,a2\n1,2024/04/03,c,-300,銀行,食費,外食,,0,a3\n".as_bytes());

        let out = parse_moneyforward_csv(&bytes[..], &ColumnNames::default()).unwrap();
        let memos: Vec<_> = out.records.iter().map(|r| r.memo.as_str()).collect();
        assert_eq!(memos, vec!["a", "c"]);
        assert_eq!(out.dropped_count(), 1);
        assert_eq!(out.dropped[0].line, 3);
        assert!(matches!(out.dropped[0].reason, RowError::Unreadable(_)));
    }

    #[test]
    fn test_source_read_failure_is_fatal() {
        let reader = FailingReader {
            data: format!("{HEADER}\n1,2024/04/01,a,-100,銀行,食費,外食,,0,a1\n").into_bytes(),
            served: false,
        };
        let err = parse_moneyforward_csv(reader, &ColumnNames::default()).unwrap_err();
        match err {
            IngestError::Csv(e) => assert!(matches!(e.kind(), csv::ErrorKind::Io(_))),
            other => panic!("expected an I/O error, got {other:?}"),
        }
    }

    #[test]
    fn test_input_order_is_preserved() {
        let out = parse(
            "1,2024/04/09,c,-3,銀行,食費,外食,,0,a1\n\
             1,2024/04/01,a,-1,銀行,食費,外食,,0,a2\n\
             1,2024/04/05,b,-2,銀行,食費,外食,,0,a3\n",
        );
        let memos: Vec<_> = out.records.iter().map(|r| r.memo.as_str()).collect();
        assert_eq!(memos, vec!["c", "a", "b"]);
    }
}
