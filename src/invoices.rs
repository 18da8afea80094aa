use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::{IvyError, Result};
use crate::models::TransactionRecord;
use crate::normalizer::parse_date;

// ---------------------------------------------------------------------------
// Collaborator contracts
// ---------------------------------------------------------------------------

/// What the retriever needs to locate one invoice document.
#[derive(Debug, Clone)]
pub struct InvoiceRequest {
    /// Merchant domain or URL that issued the invoice.
    pub locator: String,
    pub date: NaiveDate,
    pub amount: Decimal,
    pub reference: String,
}

/// Structured fields pulled out of a downloaded document.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExtractedInvoice {
    /// `YYYY-MM-DD`.
    pub invoice_date: String,
    pub invoice_amount: Decimal,
    pub invoice_number: String,
    pub invoice_currency: String,
}

/// Finds and downloads one invoice document, or fails with NotFound.
pub trait InvoiceRetriever {
    fn fetch(&self, request: &InvoiceRequest) -> Result<PathBuf>;
}

/// Extracts structured fields from a downloaded document.
pub trait InvoiceExtractor {
    fn extract(&self, file: &Path) -> Result<ExtractedInvoice>;
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 1 }
    }
}

/// Retry a fetch up to the caller's bound. NotFound is a definitive answer
/// and is never retried; only collaborator failures are.
pub fn fetch_with_retry(
    retriever: &dyn InvoiceRetriever,
    request: &InvoiceRequest,
    policy: RetryPolicy,
) -> Result<PathBuf> {
    let mut last_err = None;
    for _ in 0..policy.max_attempts {
        match retriever.fetch(request) {
            Ok(path) => return Ok(path),
            Err(err @ IvyError::NotFound(_)) => return Err(err),
            Err(err) => last_err = Some(err),
        }
    }
    Err(last_err.unwrap_or_else(|| {
        IvyError::Other("retry policy allows zero attempts".to_string())
    }))
}

// ---------------------------------------------------------------------------
// Subprocess implementations
// ---------------------------------------------------------------------------

/// Runs a command, enforcing the caller's timeout. The child is killed when
/// the deadline passes; a timeout is a collaborator failure, never a
/// validation error.
fn run_with_timeout(cmd: &mut Command, timeout: Duration, service: &str) -> Result<String> {
    let collab = |message: String| IvyError::Collaborator {
        service: service.to_string(),
        message,
    };

    cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
    let mut child = cmd.spawn().map_err(|e| collab(format!("failed to start: {e}")))?;
    let deadline = Instant::now() + timeout;

    loop {
        match child.try_wait().map_err(|e| collab(e.to_string()))? {
            Some(status) => {
                let mut stdout = String::new();
                if let Some(mut out) = child.stdout.take() {
                    let _ = out.read_to_string(&mut stdout);
                }
                if !status.success() {
                    let mut stderr = String::new();
                    if let Some(mut err) = child.stderr.take() {
                        let _ = err.read_to_string(&mut stderr);
                    }
                    return Err(collab(format!(
                        "exited with {status}: {}",
                        stderr.trim()
                    )));
                }
                return Ok(stdout);
            }
            None => {
                if Instant::now() >= deadline {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(collab(format!("timed out after {timeout:?}")));
                }
                std::thread::sleep(Duration::from_millis(10));
            }
        }
    }
}

/// Shells out to an external retrieval agent. Contract: the command gets
/// locator, date, amount and reference appended as arguments and prints the
/// downloaded file path on stdout. Empty output with a zero exit means the
/// invoice does not exist.
pub struct CommandRetriever {
    pub program: String,
    pub args: Vec<String>,
    pub timeout: Duration,
}

impl InvoiceRetriever for CommandRetriever {
    fn fetch(&self, request: &InvoiceRequest) -> Result<PathBuf> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg(&request.locator)
            .arg(request.date.format("%Y-%m-%d").to_string())
            .arg(request.amount.to_string())
            .arg(&request.reference);
        let stdout = run_with_timeout(&mut cmd, self.timeout, "invoice retriever")?;
        let path = stdout.trim();
        if path.is_empty() {
            return Err(IvyError::NotFound(format!(
                "invoice for reference {}",
                request.reference
            )));
        }
        Ok(PathBuf::from(path))
    }
}

/// Shells out to an external extraction service. Contract: the command gets
/// the file path appended and prints a JSON object with invoice_date,
/// invoice_amount, invoice_number and invoice_currency on stdout.
pub struct CommandExtractor {
    pub program: String,
    pub args: Vec<String>,
    pub timeout: Duration,
}

impl InvoiceExtractor for CommandExtractor {
    fn extract(&self, file: &Path) -> Result<ExtractedInvoice> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).arg(file);
        let stdout = run_with_timeout(&mut cmd, self.timeout, "invoice extractor")?;
        serde_json::from_str(stdout.trim()).map_err(|e| IvyError::Collaborator {
            service: "invoice extractor".to_string(),
            message: format!("extraction failed: {e}"),
        })
    }
}

// ---------------------------------------------------------------------------
// Verification against the ledger
// ---------------------------------------------------------------------------

/// Cross-check extracted fields against the matched transaction record.
/// Returns one message per mismatch; empty means the document agrees with
/// the ledger.
pub fn verify_extraction(
    record: &TransactionRecord,
    extracted: &ExtractedInvoice,
) -> Vec<String> {
    let mut mismatches = Vec::new();

    match (record.date, parse_date(&extracted.invoice_date)) {
        (Some(expected), Some(actual)) if expected != actual => {
            mismatches.push(format!("date: ledger {expected}, invoice {actual}"));
        }
        (_, None) => {
            mismatches.push(format!(
                "date: invoice carries unparsable {:?}",
                extracted.invoice_date
            ));
        }
        _ => {}
    }

    // Invoice totals are unsigned; the ledger keeps expenses negative.
    if let Some(amount) = record.amount {
        if amount.abs() != extracted.invoice_amount.abs() {
            mismatches.push(format!(
                "amount: ledger {}, invoice {}",
                amount.abs(),
                extracted.invoice_amount.abs()
            ));
        }
    }

    if let Some(currency) = &record.currency {
        if !currency.eq_ignore_ascii_case(&extracted.invoice_currency) {
            mismatches.push(format!(
                "currency: ledger {currency}, invoice {}",
                extracted.invoice_currency
            ));
        }
    }

    mismatches
}

/// Build the retrieval request for a record. The record must carry the
/// fields the retriever matches on.
pub fn request_for_record(record: &TransactionRecord, locator: &str) -> Result<InvoiceRequest> {
    let date = record.date.ok_or_else(|| {
        IvyError::Other(format!("record {} has no date", record.transaction_id))
    })?;
    let amount = record.amount.ok_or_else(|| {
        IvyError::Other(format!("record {} has no amount", record.transaction_id))
    })?;
    let reference = record.reference.clone().ok_or_else(|| {
        IvyError::Other(format!("record {} has no reference", record.transaction_id))
    })?;
    Ok(InvoiceRequest {
        locator: locator.to_string(),
        date,
        amount,
        reference,
    })
}

/// Full collaborator round: retrieve (with the caller's retry bound),
/// extract, verify.
pub fn download_and_verify(
    retriever: &dyn InvoiceRetriever,
    extractor: &dyn InvoiceExtractor,
    record: &TransactionRecord,
    locator: &str,
    policy: RetryPolicy,
) -> Result<(PathBuf, ExtractedInvoice, Vec<String>)> {
    let request = request_for_record(record, locator)?;
    let file = fetch_with_retry(retriever, &request, policy)?;
    let extracted = extractor.extract(&file)?;
    let mismatches = verify_extraction(record, &extracted);
    Ok((file, extracted, mismatches))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use std::cell::Cell;

    fn record(date: &str, amount: Decimal, currency: &str) -> TransactionRecord {
        let date = parse_date(date);
        TransactionRecord {
            transaction_id: "TX001".to_string(),
            date,
            amount: Some(amount),
            description: Some("Consulting payment".to_string()),
            reference: Some("STRIPE-4821".to_string()),
            category: Some("Services".to_string()),
            currency: Some(currency.to_string()),
            counterparty: Some("ClientA".to_string()),
            provider: Some("Stripe".to_string()),
            transaction_type: crate::normalizer::derive_type(Some(amount)),
            month_year: crate::normalizer::derive_month_year(date),
            is_provider_invoice: true,
            is_invalid: false,
            created_at: Utc::now(),
        }
    }

    struct FlakyRetriever {
        calls: Cell<u32>,
        succeed_on: u32,
    }

    impl InvoiceRetriever for FlakyRetriever {
        fn fetch(&self, _request: &InvoiceRequest) -> Result<PathBuf> {
            let call = self.calls.get() + 1;
            self.calls.set(call);
            if call >= self.succeed_on {
                Ok(PathBuf::from("/tmp/invoice.pdf"))
            } else {
                Err(IvyError::Collaborator {
                    service: "test".to_string(),
                    message: "transient".to_string(),
                })
            }
        }
    }

    struct MissingRetriever {
        calls: Cell<u32>,
    }

    impl InvoiceRetriever for MissingRetriever {
        fn fetch(&self, request: &InvoiceRequest) -> Result<PathBuf> {
            self.calls.set(self.calls.get() + 1);
            Err(IvyError::NotFound(format!(
                "invoice for reference {}",
                request.reference
            )))
        }
    }

    fn request() -> InvoiceRequest {
        InvoiceRequest {
            locator: "example.com".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(),
            amount: dec!(99.00),
            reference: "STRIPE-4821".to_string(),
        }
    }

    #[test]
    fn test_retry_until_bound() {
        let retriever = FlakyRetriever {
            calls: Cell::new(0),
            succeed_on: 3,
        };
        let path = fetch_with_retry(&retriever, &request(), RetryPolicy { max_attempts: 3 });
        assert!(path.is_ok());
        assert_eq!(retriever.calls.get(), 3);
    }

    #[test]
    fn test_retry_bound_is_respected() {
        let retriever = FlakyRetriever {
            calls: Cell::new(0),
            succeed_on: 5,
        };
        let err = fetch_with_retry(&retriever, &request(), RetryPolicy { max_attempts: 2 })
            .unwrap_err();
        assert_eq!(retriever.calls.get(), 2);
        assert!(matches!(err, IvyError::Collaborator { .. }));
    }

    #[test]
    fn test_not_found_is_never_retried() {
        let retriever = MissingRetriever { calls: Cell::new(0) };
        let err = fetch_with_retry(&retriever, &request(), RetryPolicy { max_attempts: 5 })
            .unwrap_err();
        assert_eq!(retriever.calls.get(), 1);
        assert!(matches!(err, IvyError::NotFound(_)));
    }

    #[test]
    fn test_verify_extraction_agrees() {
        let record = record("2024-05-02", dec!(-99.00), "USD");
        let extracted = ExtractedInvoice {
            invoice_date: "2024-05-02".to_string(),
            invoice_amount: dec!(99.00),
            invoice_number: "4821".to_string(),
            invoice_currency: "usd".to_string(),
        };
        assert!(verify_extraction(&record, &extracted).is_empty());
    }

    #[test]
    fn test_verify_extraction_reports_mismatches() {
        let record = record("2024-05-02", dec!(99.00), "USD");
        let extracted = ExtractedInvoice {
            invoice_date: "2024-05-03".to_string(),
            invoice_amount: dec!(98.00),
            invoice_number: "4821".to_string(),
            invoice_currency: "EUR".to_string(),
        };
        let mismatches = verify_extraction(&record, &extracted);
        assert_eq!(mismatches.len(), 3);
        assert!(mismatches[0].contains("date"));
        assert!(mismatches[1].contains("amount"));
        assert!(mismatches[2].contains("currency"));
    }

    #[test]
    fn test_request_for_record_requires_match_fields() {
        let mut r = record("2024-05-02", dec!(99.00), "USD");
        r.reference = None;
        assert!(request_for_record(&r, "example.com").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_command_retriever_returns_path() {
        let retriever = CommandRetriever {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), "echo /tmp/invoice.pdf # $0 $1 $2 $3".to_string()],
            timeout: Duration::from_secs(5),
        };
        let path = retriever.fetch(&request()).unwrap();
        assert_eq!(path, PathBuf::from("/tmp/invoice.pdf"));
    }

    #[cfg(unix)]
    #[test]
    fn test_command_retriever_empty_output_is_not_found() {
        let retriever = CommandRetriever {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), "true".to_string()],
            timeout: Duration::from_secs(5),
        };
        let err = retriever.fetch(&request()).unwrap_err();
        assert!(matches!(err, IvyError::NotFound(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_command_failure_is_collaborator_error() {
        let retriever = CommandRetriever {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), "echo boom >&2; exit 7".to_string()],
            timeout: Duration::from_secs(5),
        };
        let err = retriever.fetch(&request()).unwrap_err();
        match err {
            IvyError::Collaborator { service, message } => {
                assert_eq!(service, "invoice retriever");
                assert!(message.contains("boom"));
            }
            other => panic!("expected Collaborator, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_kills_and_reports() {
        let retriever = CommandRetriever {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), "sleep 10".to_string()],
            timeout: Duration::from_millis(100),
        };
        let err = retriever.fetch(&request()).unwrap_err();
        match err {
            IvyError::Collaborator { message, .. } => assert!(message.contains("timed out")),
            other => panic!("expected Collaborator, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_command_extractor_parses_json() {
        let json = r#"{"invoice_date":"2024-05-02","invoice_amount":99.0,"invoice_number":"4821","invoice_currency":"USD"}"#;
        let extractor = CommandExtractor {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), format!("echo '{json}'")],
            timeout: Duration::from_secs(5),
        };
        let extracted = extractor.extract(Path::new("/tmp/invoice.pdf")).unwrap();
        assert_eq!(extracted.invoice_number, "4821");
        assert_eq!(extracted.invoice_amount, dec!(99.0));
    }

    #[cfg(unix)]
    #[test]
    fn test_command_extractor_bad_output_is_collaborator_error() {
        let extractor = CommandExtractor {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), "echo not-json".to_string()],
            timeout: Duration::from_secs(5),
        };
        let err = extractor.extract(Path::new("/tmp/invoice.pdf")).unwrap_err();
        match err {
            IvyError::Collaborator { message, .. } => {
                assert!(message.contains("extraction failed"));
            }
            other => panic!("expected Collaborator, got {other:?}"),
        }
    }
}
