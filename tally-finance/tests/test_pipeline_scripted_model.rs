use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tally_core::{
    Category, Direction, ExtractionFailure, MemoryStore, PipelineError, ProcessedStatement,
    StatementListing, StatementStore, MANUAL_ENTRY_FILE_NAME,
};
use tally_finance::{
    insights, GenerateRequest, GenerateResponse, ModelClient, ModelTransport, Pipeline, RetryPolicy,
};
use tally_ingest::extract::PageText;
use tally_ingest::{PageSource, PdfConfig, TextExtractor};

/// Replays canned responses in order and records every request it sees.
#[derive(Default)]
struct ScriptedTransport {
    script: Mutex<VecDeque<Result<String, String>>>,
    calls: AtomicU32,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    fn new(script: Vec<Result<&str, &str>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(
                script
                    .into_iter()
                    .map(|r| r.map(str::to_string).map_err(str::to_string))
                    .collect(),
            ),
            ..Self::default()
        })
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    fn last_prompt(&self) -> String {
        self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl ModelTransport for ScriptedTransport {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts
            .lock()
            .unwrap()
            .push(request.contents[0].parts[0].text.clone());
        match self.script.lock().unwrap().pop_front() {
            Some(Ok(text)) => Ok(GenerateResponse::from_text(text)),
            Some(Err(e)) => Err(anyhow!(e)),
            None => bail!("script exhausted"),
        }
    }
}

/// Store whose writes always fail
struct BrokenStore;

impl StatementStore for BrokenStore {
    fn save(&self, _: &ProcessedStatement) -> Result<String> {
        bail!("disk full")
    }
    fn get(&self, _: &str) -> Result<Option<ProcessedStatement>> {
        Ok(None)
    }
    fn list(&self) -> Result<Vec<StatementListing>> {
        Ok(Vec::new())
    }
    fn delete(&self, _: &str) -> Result<bool> {
        Ok(false)
    }
    fn clear(&self) -> Result<usize> {
        Ok(0)
    }
}

/// Hands back fixed page texts regardless of the bytes
struct FixedPages(Vec<&'static str>);

impl PageSource for FixedPages {
    fn page_texts(&self, _: &[u8], _: Option<usize>) -> Result<Vec<PageText>, String> {
        Ok(self.0.iter().map(|p| Ok(p.to_string())).collect())
    }

    fn backend_name(&self) -> &str {
        "fixed"
    }
}

/// A decoder that blows up on every document.
struct PanickingPages;

impl PageSource for PanickingPages {
    fn page_texts(&self, _: &[u8], _: Option<usize>) -> Result<Vec<PageText>, String> {
        panic!("corrupt xref table");
    }

    fn backend_name(&self) -> &str {
        "panicking"
    }
}

const TWO_TXNS: &str = r#"[
    {"date":"2024-01-05","description":"ALDI Sued","amount":42.5,"type":"Money Out","category":"Groceries"},
    {"date":"2024-01-31","description":"ACME Salary","amount":2500,"type":"Money In","category":"Salary/Income"}
]"#;

const CSV_STATEMENT: &str = "Date,Description,Amount\n\
05/01/2024,ALDI Sued,-42.50\n\
31/01/2024,ACME Salary,2500.00\n";

fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::ZERO,
        max_jitter: Duration::ZERO,
    }
}

fn pipeline_with(transport: Arc<ScriptedTransport>, store: Arc<dyn StatementStore>) -> Pipeline {
    Pipeline::new(PdfConfig::default(), ModelClient::new(transport, fast_policy()), store).unwrap()
}

#[tokio::test]
async fn test_csv_statement_is_categorized_and_stored() {
    let transport = ScriptedTransport::new(vec![Ok(TWO_TXNS)]);
    let store = Arc::new(MemoryStore::new());
    let pipeline = pipeline_with(transport.clone(), store.clone());

    let doc = Pipeline::accept(Some("text/csv"), "january.csv", CSV_STATEMENT.as_bytes().to_vec()).unwrap();
    let stmt = pipeline.process(&doc).await.unwrap();

    assert_eq!(transport.calls(), 1);
    assert!(transport.last_prompt().starts_with("Process this CSV bank statement:\n\n"));
    assert!(!transport.last_prompt().contains("[TRANSACTION]"));

    assert_eq!(stmt.account_holder, "CSV_Statement_User");
    assert_eq!(stmt.from_date, "2024-01-05");
    assert_eq!(stmt.to_date, "2024-01-31");
    assert!(stmt.id.starts_with("csv_statement_user_20240105_to_20240131_"));
    assert!(stmt.id.ends_with(&stmt.timestamp));
    assert_eq!(stmt.file_name, "january.csv");
    assert_eq!(stmt.raw_text, CSV_STATEMENT);

    assert_eq!(stmt.transactions.len(), 2);
    assert_eq!(stmt.transactions[0].amount_string(), "-€42.50");
    assert_eq!(stmt.transactions[1].direction(), Direction::MoneyIn);
    assert_eq!(stmt.transactions[1].category, Category::SalaryIncome);

    let stored = store.get(&stmt.id).unwrap().unwrap();
    assert_eq!(stored, stmt);
    assert_eq!(store.list().unwrap().len(), 1);
}

#[tokio::test]
async fn test_pdf_text_is_annotated_before_the_call() {
    let transport = ScriptedTransport::new(vec![Ok(TWO_TXNS)]);
    let extractor = TextExtractor::with_source(
        PdfConfig::default(),
        Box::new(FixedPages(vec![
            "Account Holder: Jane Doe",
            "Statement period: 01.01.2024 to 31.01.2024",
            "05.01.2024   ALDI   Sued   42,50",
        ])),
    );
    let store = Arc::new(MemoryStore::new());
    let pipeline = Pipeline::with_extractor(
        extractor,
        ModelClient::new(transport.clone(), fast_policy()),
        store,
    )
    .unwrap();

    let doc = Pipeline::accept(Some("application/pdf"), "jan.pdf", b"%PDF-1.4".to_vec()).unwrap();
    let stmt = pipeline.process(&doc).await.unwrap();

    let prompt = transport.last_prompt();
    assert!(prompt.starts_with("Process this bank statement:\n\n"));
    assert!(prompt.contains("[TRANSACTION] 05.01.2024 ALDI Sued 42,50"));

    assert_eq!(stmt.account_holder, "Jane Doe");
    assert_eq!(stmt.from_date, "2024-01-01");
    assert_eq!(stmt.to_date, "2024-01-31");
    assert!(!stmt.raw_text.contains("[TRANSACTION]"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_pdf_extraction_runs_on_multi_thread_runtime() {
    let transport = ScriptedTransport::new(vec![Ok(TWO_TXNS)]);
    let extractor = TextExtractor::with_source(
        PdfConfig::default(),
        Box::new(FixedPages(vec!["Account Holder: Jane Doe", "05.01.2024 ALDI Sued 42,50"])),
    );
    let pipeline = Pipeline::with_extractor(
        extractor,
        ModelClient::new(transport.clone(), fast_policy()),
        Arc::new(MemoryStore::new()),
    )
    .unwrap();

    let doc = Pipeline::accept(Some("application/pdf"), "jan.pdf", b"%PDF-1.4".to_vec()).unwrap();
    let stmt = pipeline.process(&doc).await.unwrap();

    assert_eq!(stmt.account_holder, "Jane Doe");
    assert_eq!(stmt.file_name, "jan.pdf");
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn test_decoder_panic_is_an_extraction_failure() {
    let transport = ScriptedTransport::new(vec![Ok(TWO_TXNS)]);
    let extractor = TextExtractor::with_source(PdfConfig::default(), Box::new(PanickingPages));
    let pipeline = Pipeline::with_extractor(
        extractor,
        ModelClient::new(transport.clone(), fast_policy()),
        Arc::new(MemoryStore::new()),
    )
    .unwrap();

    let doc = Pipeline::accept(None, "broken.pdf", b"%PDF".to_vec()).unwrap();
    let err = pipeline.process(&doc).await.unwrap_err();

    assert!(matches!(err, PipelineError::Extraction(ExtractionFailure::ReadError(_))));
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn test_unsupported_upload_never_reaches_the_model() {
    let transport = ScriptedTransport::new(vec![Ok(TWO_TXNS)]);
    let _pipeline = pipeline_with(transport.clone(), Arc::new(MemoryStore::new()));

    let err = Pipeline::accept(Some("image/png"), "receipt.png", vec![0x89, 0x50]).unwrap_err();
    assert!(matches!(err, PipelineError::UnsupportedFileType { ref file_name } if file_name == "receipt.png"));
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn test_empty_pdf_fails_extraction_without_a_call() {
    let transport = ScriptedTransport::new(vec![Ok(TWO_TXNS)]);
    let extractor = TextExtractor::with_source(PdfConfig::default(), Box::new(FixedPages(vec!["   ", ""])));
    let pipeline = Pipeline::with_extractor(
        extractor,
        ModelClient::new(transport.clone(), fast_policy()),
        Arc::new(MemoryStore::new()),
    )
    .unwrap();

    let doc = Pipeline::accept(None, "scan.pdf", b"%PDF".to_vec()).unwrap();
    let err = pipeline.process(&doc).await.unwrap_err();

    assert!(matches!(err, PipelineError::Extraction(ExtractionFailure::EmptyDocument)));
    assert!(err.user_message().contains("manually"));
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn test_malformed_response_is_not_retried() {
    let transport = ScriptedTransport::new(vec![Ok("Sure! Here are your transactions."), Ok(TWO_TXNS)]);
    let store = Arc::new(MemoryStore::new());
    let pipeline = pipeline_with(transport.clone(), store.clone());

    let doc = Pipeline::accept(Some("text/csv"), "a.csv", CSV_STATEMENT.as_bytes().to_vec()).unwrap();
    let err = pipeline.process(&doc).await.unwrap_err();

    assert!(matches!(err, PipelineError::MalformedModelResponse(_)));
    assert_eq!(transport.calls(), 1);
    assert!(store.list().unwrap().is_empty());
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let transport = ScriptedTransport::new(vec![Err("503 overloaded"), Err("timeout"), Ok(TWO_TXNS)]);
    let pipeline = pipeline_with(transport.clone(), Arc::new(MemoryStore::new()));

    let stmt = pipeline.process_text("05/01/2024 ALDI Sued 42,50").await.unwrap();
    assert_eq!(transport.calls(), 3);
    assert_eq!(stmt.file_name, MANUAL_ENTRY_FILE_NAME);
    assert_eq!(stmt.transactions.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_exhaustion_reports_last_error_after_default_backoff() {
    let transport = ScriptedTransport::new(vec![
        Err("e1"),
        Err("e2"),
        Err("e3"),
        Err("e4"),
        Err("quota exceeded"),
    ]);
    let client = ModelClient::new(transport.clone(), RetryPolicy::default());
    let pipeline = Pipeline::new(PdfConfig::default(), client, Arc::new(MemoryStore::new())).unwrap();

    let started = tokio::time::Instant::now();
    let err = pipeline.process_text("05/01/2024 ALDI 42,50").await.unwrap_err();
    let waited = started.elapsed();

    assert_eq!(transport.calls(), 5);
    match &err {
        PipelineError::RemoteCallExhausted { attempts, message } => {
            assert_eq!(*attempts, 5);
            assert!(message.contains("quota exceeded"), "{message}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.user_message().starts_with("Error processing transactions:"));
    assert!(waited >= Duration::from_secs(15) && waited <= Duration::from_secs(19), "{waited:?}");
}

#[tokio::test]
async fn test_zero_attempt_policy_is_not_attempted() {
    let transport = ScriptedTransport::new(vec![Ok(TWO_TXNS)]);
    let policy = RetryPolicy {
        max_attempts: 0,
        ..fast_policy()
    };
    let pipeline = Pipeline::new(
        PdfConfig::default(),
        ModelClient::new(transport.clone(), policy),
        Arc::new(MemoryStore::new()),
    )
    .unwrap();

    let err = pipeline.process_text("anything").await.unwrap_err();
    assert!(matches!(err, PipelineError::NotAttempted));
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn test_store_failure_is_a_persistence_error() {
    let transport = ScriptedTransport::new(vec![Ok(TWO_TXNS)]);
    let pipeline = pipeline_with(transport.clone(), Arc::new(BrokenStore));

    let err = pipeline.process_text("05/01/2024 ALDI 42,50").await.unwrap_err();
    match err {
        PipelineError::PersistenceFailure(msg) => assert!(msg.contains("disk full")),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn test_blank_manual_entry_is_empty_document() {
    let transport = ScriptedTransport::new(vec![]);
    let pipeline = pipeline_with(transport.clone(), Arc::new(MemoryStore::new()));

    let err = pipeline.process_text(" \n\t ").await.unwrap_err();
    assert!(matches!(err, PipelineError::Extraction(ExtractionFailure::EmptyDocument)));
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn test_report_and_explain_fall_back_on_empty_text() {
    let transport = ScriptedTransport::new(vec![Ok(TWO_TXNS), Ok("   "), Ok("")]);
    let client = ModelClient::new(transport.clone(), fast_policy());
    let pipeline = Pipeline::new(PdfConfig::default(), client.clone(), Arc::new(MemoryStore::new())).unwrap();
    let stmt = pipeline.process_text("05/01/2024 ALDI 42,50").await.unwrap();

    let report = insights::report(&client, &stmt.transactions).await.unwrap();
    assert_eq!(report, insights::EMPTY_REPORT);
    assert!(transport.last_prompt().contains("2024-01-05 | ALDI Sued | -€42.50 | Category: Groceries"));

    let explanation = insights::explain(&client, &stmt.transactions[0]).await.unwrap();
    assert_eq!(explanation, insights::EMPTY_EXPLANATION);

    assert!(insights::report(&client, &[]).await.is_err());
    assert_eq!(transport.calls(), 3);
}
